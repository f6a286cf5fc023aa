//! Top-level wiring: turns a parsed `Cli` into a running engine instance.
//! This is the one place that knows how every component fits together; the
//! CLI front end (`main.rs`) is a thin shell around `Engine::run`.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::info;

use crate::{
    cfg::{
        cli::{Cli, resolve_config_path},
        config::EngineSettings,
        enums::DumpFormat,
        logger::TARGET_CORE,
    },
    connectors::{
        Connector,
        cli_connector::{CliConnector, DefaultTransportOpener},
    },
    creds::CredentialStore,
    hosts::registry::HostRegistry,
    modules::{self, Context},
};

/// Resolves `EngineSettings` for a run: the `--config` file if given,
/// falling back to defaults, with CLI flags (`--timeout`, `--transport`)
/// overriding the file.
fn resolve_settings(cli: &Cli) -> Result<EngineSettings> {
    let mut settings = match &cli.config {
        Some(path) => {
            let canon = resolve_config_path(path)?;
            EngineSettings::load_from_file(canon)?
        },
        None => EngineSettings::default(),
    };
    if let Some(timeout) = cli.timeout {
        settings.connect_timeout = Duration::from_secs(timeout);
    }
    settings.transport = cli.transport;
    Ok(settings)
}

/// Runs one full engine pass: connect, dispatch modules, optionally dump
/// host info, then disconnect. Returns `Ok(())` on graceful shutdown,
/// including a user interrupt during a `WorkerPool::block`.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = Arc::new(resolve_settings(&cli)?);
    let credentials: Arc<[_]> = CredentialStore::parse(&cli.credentials).credentials.into();

    let connectors: Vec<Arc<dyn Connector>> = vec![Arc::new(CliConnector {
        credentials: credentials.clone(),
        transport_kind: settings.transport,
        timeout: settings.connect_timeout,
        opener: Arc::new(DefaultTransportOpener),
    })];

    let registry = Arc::new(HostRegistry::new(connectors, settings.worker_pool_size));
    let modules = modules::resolve_modules(&cli.modules);

    let ctx = Context {
        registry: registry.clone(),
        credentials,
        options: Arc::new(cli.clone()),
        settings: settings.clone(),
        modules: modules.iter().map(|m| m.name()).collect(),
    };

    modules::run_load_hooks(&modules, &ctx).await?;

    info!(target: TARGET_CORE, addresses = cli.addresses.len(), "connecting initial host population");
    registry.load(&cli.addresses).await;
    info!(target: TARGET_CORE, ready = registry.ready_hosts().len(), total = registry.len(), "initial connection pass complete");

    modules::run_modules(&modules, &ctx).await?;

    if cli.dump_hostinfo {
        dump_host_info(&registry, cli.dump_format)?;
    }

    registry.disconnect_all().await;
    Ok(())
}

fn dump_host_info(registry: &HostRegistry, format: DumpFormat) -> Result<()> {
    let mut out = serde_json::Map::new();
    for host in registry.hosts() {
        let key = host
            .hostname()
            .unwrap_or_else(|| host.record.address.first().unwrap_or("unknown").to_string());
        #[allow(clippy::unwrap_used)]
        let info = serde_json::Value::Object(host.info.lock().unwrap().clone());
        out.insert(key, info);
    }
    let value = serde_json::Value::Object(out);
    match format {
        DumpFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        DumpFormat::Yaml => println!("{}", serde_yaml::to_string(&value)?),
    }
    Ok(())
}
