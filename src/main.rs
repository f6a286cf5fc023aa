// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use clap::Parser;
use netshell::{cfg::cli::Cli, cfg::logger::init_logger, engine};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logger(cli.verbose, &cli.logfiles)?;
    engine::run(cli).await
}
