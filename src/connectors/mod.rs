//! Pluggable transport and connector adapters.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{future::Future, pin::Pin, sync::Arc};

use anyhow::Result;

use crate::hosts::host::Host;

pub mod cli_connector;
pub mod platform;
pub mod transport;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A live interactive session with a device, abstracting over the
/// underlying SSH/TELNET transport. Implementations drive a read-until-
/// prompt loop so callers can treat `interact` as a synchronous
/// request/response even though the wire protocol is a raw character
/// stream.
pub trait Transport: Send + Sync {
    /// Sends `command` followed by a newline and returns everything read
    /// back up to (and including) the next shell prompt.
    fn interact<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<String>>;

    /// The most recently observed shell prompt, stripped of its trailing
    /// `#`/`>` privilege marker.
    fn prompt(&self) -> String;

    fn close<'a>(&'a self) -> BoxFuture<'a, Result<()>>;
}

/// An adapter providing `connect`/`disconnect` for one transport family. The
/// CLI connector (§4.5) is the only implementation this crate ships; the
/// trait exists so additional connector kinds (e.g. a structured
/// programmability API) can be added without touching the engine.
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    /// Drives a pending Connection through its full credential-ordered
    /// attempt sequence to a terminal (connected or failed) state. Must not
    /// panic on any single credential/address failure.
    fn connect<'a>(&'a self, host: Arc<Host>) -> BoxFuture<'a, ()>;

    fn disconnect<'a>(&'a self, host: Arc<Host>) -> BoxFuture<'a, ()>;
}
