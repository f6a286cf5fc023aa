//! Concrete `Transport` backends.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::Result;

use crate::{cfg::enums::TransportKind, connectors::Transport};

pub mod ssh;
pub mod telnet;

/// Opens a session of the requested transport kind against `addr:port` and
/// authenticates with `username`/`password`, returning a live `Transport`
/// once the shell prompt has been observed.
pub async fn open(
    kind: TransportKind,
    addr: &str,
    port: u16,
    username: &str,
    password: &str,
    timeout: Duration,
) -> Result<Arc<dyn Transport>> {
    match kind {
        TransportKind::Ssh => {
            let t = ssh::SshTransport::connect(addr, port, username, password, timeout).await?;
            Ok(Arc::new(t))
        },
        TransportKind::Telnet => {
            let t =
                telnet::TelnetTransport::connect(addr, port, username, password, timeout).await?;
            Ok(Arc::new(t))
        },
    }
}

/// Shared "read until the shell prompt reappears" heuristic: a prompt is the
/// trailing non-whitespace run of the last line ending in `#`, `>`, or `$`.
pub(crate) fn find_prompt_in(buf: &str) -> Option<String> {
    let last_line = buf.lines().last()?;
    let trimmed = last_line.trim_end();
    if trimmed.ends_with(['#', '>', '$']) {
        Some(trimmed.to_string())
    } else {
        None
    }
}
