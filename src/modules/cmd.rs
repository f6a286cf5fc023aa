//! Ad-hoc command execution against every ready host (§4.9A). Supplements
//! the distilled spec with a feature the original tool shipped
//! (`modules/cmd.py`) that the distillation dropped.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tokio::{
    fs::OpenOptions,
    io::AsyncWriteExt,
    sync::Mutex as AsyncMutex,
};
use tracing::{info, warn};

use crate::{
    cfg::logger::TARGET_MODULES,
    connectors::BoxFuture,
    hosts::host::Host,
    modules::{Context, Module, ModuleName},
    pool::WorkerPool,
};

pub struct CmdModule;

/// One command's outcome against one host.
struct CommandOutput {
    command: String,
    output: Result<String, String>,
}

impl Module for CmdModule {
    fn name(&self) -> ModuleName {
        ModuleName::Cmd
    }

    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if ctx.options.command.is_empty() {
                return Ok(());
            }
            let hosts = ctx.registry.ready_hosts();
            info!(target: TARGET_MODULES, count = hosts.len(), "cmd module starting");

            let commands: Arc<[String]> = ctx.options.command.clone().into();
            let shared_outputs: Arc<[String]> = ctx.options.output_file.clone().into();
            let per_host_templates: Arc<[String]> = ctx.options.per_host_output_file.clone().into();
            // Shared output files are appended to from multiple host workers
            // concurrently; serialize writers so lines from different hosts
            // don't interleave mid-line.
            let shared_writer = Arc::new(AsyncMutex::new(()));

            let mut pool = WorkerPool::new(ctx.settings.worker_pool_size, move |host: Arc<Host>, _handle| {
                let commands = commands.clone();
                let shared_outputs = shared_outputs.clone();
                let per_host_templates = per_host_templates.clone();
                let shared_writer = shared_writer.clone();
                async move {
                    let results = run_commands_on_host(&host, &commands).await;
                    store_cmd_output(&host, &results);

                    let rendered = render_block(&host, &results);
                    for path in shared_outputs.iter() {
                        let _guard = shared_writer.lock().await;
                        if let Err(e) = append_to_file(path, &rendered).await {
                            warn!(target: TARGET_MODULES, %path, error = %e, "failed to append cmd output");
                        }
                    }
                    for template in per_host_templates.iter() {
                        let path = substitute_template(template, &host);
                        if let Err(e) = append_to_file(&path, &rendered).await {
                            warn!(target: TARGET_MODULES, path = %path, error = %e, "failed to write per-host cmd output");
                        }
                    }
                }
            });
            for h in hosts {
                pool.submit(h);
            }
            pool.block(true).await;
            Ok(())
        })
    }
}

async fn run_commands_on_host(host: &Host, commands: &[String]) -> Vec<CommandOutput> {
    let Some(session) = host.connections.get("cli").and_then(|c| c.session.clone()) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(commands.len());
    for raw in commands {
        let (command, _config_mode) = strip_config_prefix(raw);
        let result = session.interact(command).await.map_err(|e| e.to_string());
        out.push(CommandOutput {
            command: command.to_string(),
            output: result,
        });
    }
    out
}

/// Recognizes the `config:` prefix (§4.9A). Config-mode enter/exit is a
/// `Transport` responsibility this crate does not implement; the flag is
/// returned so callers could act on it once a platform-specific hook
/// exists.
fn strip_config_prefix(command: &str) -> (&str, bool) {
    match command.strip_prefix("config:") {
        Some(rest) => (rest, true),
        None => (command, false),
    }
}

fn store_cmd_output(host: &Host, results: &[CommandOutput]) {
    let arr: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            let mut m = serde_json::Map::new();
            m.insert("command".to_string(), serde_json::Value::String(r.command.clone()));
            match &r.output {
                Ok(text) => {
                    m.insert("output".to_string(), serde_json::Value::String(text.clone()));
                },
                Err(e) => {
                    m.insert("error".to_string(), serde_json::Value::String(e.clone()));
                },
            }
            serde_json::Value::Object(m)
        })
        .collect();
    #[allow(clippy::unwrap_used)]
    host.info.lock().unwrap().insert("cmd_output".to_string(), serde_json::Value::Array(arr));
}

fn render_block(host: &Host, results: &[CommandOutput]) -> String {
    let label = host.hostname().unwrap_or_else(|| {
        host.record.address.first().unwrap_or("unknown").to_string()
    });
    let mut s = format!("==== {label} ====\n");
    for r in results {
        s.push_str(&format!("$ {}\n", r.command));
        match &r.output {
            Ok(text) => s.push_str(text),
            Err(e) => s.push_str(&format!("ERROR: {e}\n")),
        }
        s.push('\n');
    }
    s
}

fn substitute_template(template: &str, host: &Host) -> String {
    let hostname = host.hostname().unwrap_or_default();
    let address = host.record.address.first().unwrap_or_default().to_string();
    let device_type = host.device_type().unwrap_or_default();
    template
        .replace("{hostname}", &hostname)
        .replace("{address}", &address)
        .replace("{type}", &device_type)
}

async fn append_to_file(path: &str, contents: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open {path}"))?;
    file.write_all(contents.as_bytes())
        .await
        .with_context(|| format!("failed to write {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_prefix_is_stripped_and_flagged() {
        let (cmd, is_config) = strip_config_prefix("config:interface gi0/1");
        assert_eq!(cmd, "interface gi0/1");
        assert!(is_config);
    }

    #[test]
    fn plain_command_is_unflagged() {
        let (cmd, is_config) = strip_config_prefix("show version");
        assert_eq!(cmd, "show version");
        assert!(!is_config);
    }

    #[test]
    fn template_substitutes_known_placeholders() {
        let registry = crate::hosts::registry::HostRegistry::new(Vec::new(), 1);
        let host = registry
            .add(crate::hosts::address::AddressRecord {
                address: crate::hosts::address::AddressValue::Single("10.0.0.1".to_string()),
                port: None,
                device_type: Some("cisco_ios".to_string()),
            })
            .expect("new host");
        host.set_hostname("sw1");
        let out = substitute_template("{hostname}-{address}-{type}.log", &host);
        assert_eq!(out, "sw1-10.0.0.1-cisco_ios.log");
    }
}
