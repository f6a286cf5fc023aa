//! Module dispatcher: the pluggable pipeline stages that run once the host
//! population is ready. Ships two built-in modules (`crawl` and `cmd`); see
//! `crawl` for how `crawl`/`neighbors` share one implementation.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::{
    cfg::{cli::Cli, config::EngineSettings, logger::TARGET_CORE},
    connectors::BoxFuture,
    creds::Credential,
    hosts::registry::HostRegistry,
};

pub mod cmd;
pub mod crawl;

/// The fixed set of built-in modules a `-m` token may name. Dynamic loading
/// of arbitrary module paths is deliberately descoped (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleName {
    Crawl,
    Neighbors,
    Cmd,
}

impl ModuleName {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "crawl" => Some(ModuleName::Crawl),
            "neighbors" => Some(ModuleName::Neighbors),
            "cmd" => Some(ModuleName::Cmd),
            _ => None,
        }
    }
}

/// The namespace object handed to every module's `load`/`run` hook: the
/// Host Registry, the credential store, the parsed options, and the list of
/// modules the user requested, in load order.
pub struct Context {
    pub registry: Arc<HostRegistry>,
    pub credentials: Arc<[Credential]>,
    pub options: Arc<Cli>,
    pub settings: Arc<EngineSettings>,
    pub modules: Vec<ModuleName>,
}

/// One pipeline stage. `load` validates module-specific input before any
/// connection attempt is made; `run` does the module's real work once the
/// initial host population has settled.
pub trait Module: Send + Sync {
    fn name(&self) -> ModuleName;

    fn load<'a>(&'a self, _ctx: &'a Context) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<()>>;
}

/// Resolves the `-m` tokens into module instances in the order requested,
/// with the crawl/neighbors overlap resolved per DESIGN.md: if both are
/// requested, `crawl` wins and `neighbors` is dropped with a warning.
pub fn resolve_modules(tokens: &[String]) -> Vec<Box<dyn Module>> {
    let mut names: Vec<ModuleName> = Vec::new();
    for tok in tokens {
        match ModuleName::parse(tok) {
            Some(n) => names.push(n),
            None => warn!(target: TARGET_CORE, module = %tok, "unknown module name, skipping"),
        }
    }

    let has_crawl = names.contains(&ModuleName::Crawl);
    let has_neighbors = names.contains(&ModuleName::Neighbors);
    if has_crawl && has_neighbors {
        warn!(target: TARGET_CORE, "both crawl and neighbors modules requested, running crawl only");
        names.retain(|n| *n != ModuleName::Neighbors);
    }

    names
        .into_iter()
        .map(|n| -> Box<dyn Module> {
            match n {
                ModuleName::Crawl => Box::new(crawl::CrawlModule { recursive: true }),
                ModuleName::Neighbors => Box::new(crawl::CrawlModule { recursive: false }),
                ModuleName::Cmd => Box::new(cmd::CmdModule),
            }
        })
        .collect()
}

/// Runs every module's `load` hook in order, then (after the caller has
/// connected the initial host population) every module's `run` hook in
/// order.
pub async fn run_load_hooks(modules: &[Box<dyn Module>], ctx: &Context) -> Result<()> {
    for m in modules {
        m.load(ctx).await?;
    }
    Ok(())
}

pub async fn run_modules(modules: &[Box<dyn Module>], ctx: &Context) -> Result<()> {
    for m in modules {
        m.run(ctx).await?;
    }
    Ok(())
}
