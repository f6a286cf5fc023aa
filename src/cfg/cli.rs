// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use crate::cfg::enums::{DumpFormat, TransportKind};

pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);

    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(p)
    };

    let canon = abs
        .canonicalize()
        .with_context(|| format!("failed to canonicalize path {abs:?}"))?;

    Ok(canon)
}

/// Concurrent multi-device shell-automation engine for network infrastructure.
#[derive(Parser, Debug, Clone)]
#[command(name = "netshell", version, about)]
pub struct Cli {
    /// Target addresses: literal expressions or paths to YAML/JSON files.
    pub addresses: Vec<String>,

    /// Credential expression or file, may be repeated.
    #[arg(short = 'c', long = "credential")]
    pub credentials: Vec<String>,

    /// Built-in module to run, may be repeated; order is preserved.
    #[arg(short = 'm', long = "module")]
    pub modules: Vec<String>,

    /// Additional log file destinations, may be repeated.
    #[arg(short = 'l', long = "logfile")]
    pub logfiles: Vec<String>,

    /// Increase logging verbosity; may be repeated up to 6 times.
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Dump every host's collected info bag to stdout once the run completes.
    #[arg(short = 'j', long = "dump-hostinfo")]
    pub dump_hostinfo: bool,

    /// Format used for the host-info dump.
    #[arg(long = "dump-format", default_value = "json")]
    pub dump_format: DumpFormat,

    /// Per-attempt connect timeout, in seconds.
    #[arg(short = 'T', long = "timeout")]
    pub timeout: Option<u64>,

    /// Transport family to drive CLI sessions with.
    #[arg(long = "transport", default_value = "ssh")]
    pub transport: TransportKind,

    /// Optional engine settings file (YAML).
    #[arg(long = "config")]
    pub config: Option<String>,

    /// Neighbor filter expression or file, may be repeated (crawl/neighbors
    /// modules only).
    #[arg(short = 'F', long = "filter")]
    pub filter: Vec<String>,

    /// Maximum crawl BFS depth (crawl module only); unset means unbounded.
    #[arg(short = 'M', long = "max-hops")]
    pub max_hops: Option<u32>,

    /// Only crawl CDP neighbors.
    #[arg(long = "crawl-cdp-only")]
    pub crawl_cdp_only: bool,

    /// Only crawl LLDP neighbors.
    #[arg(long = "crawl-lldp-only")]
    pub crawl_lldp_only: bool,

    /// Command to run against every ready host, may be repeated (cmd module
    /// only). A leading `config:` prefix wraps the command in config mode.
    #[arg(short = 'C', long = "command")]
    pub command: Vec<String>,

    /// Shared output file every host's command output is appended to, may be
    /// repeated (cmd module only).
    #[arg(short = 'O', long = "output-file")]
    pub output_file: Vec<String>,

    /// Per-host output file template, may be repeated (cmd module only).
    /// `{hostname}`, `{address}` and `{type}` are substituted per host.
    #[arg(short = 'P', long = "per-host-output-file")]
    pub per_host_output_file: Vec<String>,
}
