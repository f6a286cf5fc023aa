//! The recursive neighbor-crawl fixed point (§4.8), shared between the
//! `crawl` (recursive) and `neighbors` (single-pass) module names.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    cfg::logger::TARGET_MODULES,
    connectors::BoxFuture,
    hosts::{
        address::{AddressRecord, AddressValue},
        host::Host,
    },
    modules::{Context, Module, ModuleName},
    neighbors::{
        filter::Filter,
        handlers::{HandlerRegistry, NeighborExtract},
        model::NeighborRecord,
    },
    pool::WorkerPool,
};

/// A brief grace period before re-submitting a host whose Connections are
/// still being actively driven by a connector worker, so the crawl pool
/// doesn't busy-spin on hosts that haven't finished connecting yet.
const REQUEUE_GRACE: Duration = Duration::from_millis(50);

pub struct CrawlModule {
    pub recursive: bool,
}

impl Module for CrawlModule {
    fn name(&self) -> ModuleName {
        if self.recursive { ModuleName::Crawl } else { ModuleName::Neighbors }
    }

    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let filter = crate::neighbors::filter::build_filters(&ctx.options.filter);
            let opts = CrawlOptions {
                filter,
                max_hops: ctx.options.max_hops,
                want_lldp: !ctx.options.crawl_cdp_only,
                want_cdp: !ctx.options.crawl_lldp_only,
                recursive: self.recursive,
            };
            walk(&ctx.registry, &opts, ctx.settings.crawl_pool_size).await;
            Ok(())
        })
    }
}

pub struct CrawlOptions {
    pub filter: Filter,
    pub max_hops: Option<u32>,
    pub want_lldp: bool,
    pub want_cdp: bool,
    pub recursive: bool,
}

/// Runs the extract/materialize/filter/inject pipeline over `registry`'s
/// current ready-host population. In recursive mode, newly-injected hosts
/// are fed back into the same pool until it quiesces; in single-pass mode
/// the pipeline runs once over the initial population and never injects.
pub async fn walk(registry: &Arc<crate::hosts::registry::HostRegistry>, opts: &CrawlOptions, pool_size: usize) {
    let handlers = Arc::new(HandlerRegistry::builtin());
    let initial = registry.ready_hosts();
    info!(target: TARGET_MODULES, count = initial.len(), recursive = opts.recursive, "starting crawl");

    let registry = registry.clone();
    let recursive = opts.recursive;
    let want_lldp = opts.want_lldp;
    let want_cdp = opts.want_cdp;
    let max_hops = opts.max_hops;
    // `Filter` isn't `Sync`-bound in the worker closure signature below
    // without an `Arc`; regexes are cheap to share this way.
    let filter = Arc::new(opts.filter.clone());

    let mut pool = WorkerPool::new(pool_size, move |host: Arc<Host>, handle| {
        let registry = registry.clone();
        let handlers = handlers.clone();
        let filter = filter.clone();
        async move {
            if !host.all_idle() {
                tokio::time::sleep(REQUEUE_GRACE).await;
                handle.submit(host);
                return;
            }
            let Some(device_type) = host.device_type() else {
                return;
            };
            let Some(entry) = handlers.lookup(&device_type) else {
                return;
            };

            let mut transport = None;
            for connector_name in entry.handlers.keys() {
                let Some(conn) = host.connections.get(*connector_name) else { continue };
                if conn.failed {
                    return;
                }
                if !(conn.connected && conn.idle) {
                    drop(conn);
                    tokio::time::sleep(REQUEUE_GRACE).await;
                    handle.submit(host);
                    return;
                }
                transport = conn.session.clone().map(|t| (*connector_name, t));
                break;
            }
            let Some((connector_name, transport)) = transport else { return };
            let Some(handler_fn) = entry.handlers.get(connector_name) else { return };

            let extract = match handler_fn(transport.as_ref(), want_lldp, want_cdp).await {
                Ok(e) => e,
                Err(e) => {
                    warn!(target: TARGET_MODULES, error = %e, "neighbor extraction failed");
                    return;
                },
            };
            store_neighbors_json(&host, &extract);

            let hop = host.hop();
            for neighbor in extract.lldp.iter().chain(extract.cdp.iter()) {
                if !filter.passes(neighbor) || neighbor.addresses.is_empty() {
                    continue;
                }
                let record = AddressRecord {
                    address: AddressValue::Alternates(neighbor.addresses.clone()),
                    port: None,
                    device_type: None,
                };
                if let Some(new_host) = registry.add(record) {
                    new_host.set_hop(hop + 1);
                    let within_budget = max_hops.is_none_or(|max| new_host.hop() <= max);
                    if recursive && within_budget {
                        handle.submit(new_host);
                    }
                }
            }
        }
    });

    for h in initial {
        pool.submit(h);
    }
    pool.block(true).await;
    info!(target: TARGET_MODULES, total = registry.len(), "crawl converged");
}

fn store_neighbors_json(host: &Host, extract: &NeighborExtract) {
    let to_arr = |v: &[NeighborRecord]| serde_json::Value::Array(v.iter().map(NeighborRecord::to_json).collect());
    let mut map = serde_json::Map::new();
    map.insert("lldp".to_string(), to_arr(&extract.lldp));
    map.insert("cdp".to_string(), to_arr(&extract.cdp));
    #[allow(clippy::unwrap_used)]
    host.info.lock().unwrap().insert("neighbors".to_string(), serde_json::Value::Object(map));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        connectors::{Connector, Transport},
        hosts::registry::HostRegistry,
    };

    struct InstantConnector;
    impl Connector for InstantConnector {
        fn name(&self) -> &str {
            "cli"
        }

        fn connect<'a>(&'a self, host: Arc<Host>) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                host.set_device_type("cisco_ios");
                if let Some(mut c) = host.connections.get_mut("cli") {
                    c.connected = true;
                    c.idle = true;
                }
            })
        }

        fn disconnect<'a>(&'a self, host: Arc<Host>) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                if let Some(mut c) = host.connections.get_mut("cli") {
                    c.connected = false;
                }
            })
        }
    }

    #[tokio::test]
    async fn crawl_with_no_handler_match_does_not_hang() {
        let registry = Arc::new(HostRegistry::new(vec![Arc::new(InstantConnector)], 2));
        registry.load(&["host1".to_string()]).await;
        let opts = CrawlOptions {
            filter: Filter::default(),
            max_hops: None,
            want_lldp: true,
            want_cdp: true,
            recursive: true,
        };
        // No live Transport session is attached by InstantConnector, so the
        // per-handler-connector gate drops the host instead of hanging.
        walk(&registry, &opts, 2).await;
        assert_eq!(registry.len(), 1);
    }

    const SAMPLE_LLDP: &str = "\
------------------------------------------------
Local Intf: Gi0/1
Chassis id: aaaa.bbbb.cccc
Port id: Gi0/24
Port Description: uplink to core
System Name: core-sw1.example.net
System Description:
Cisco IOS Software, C3750
Time remaining: 98 seconds
System Capabilities: B, R
Management Address: 10.0.0.1
------------------------------------------------
Total entries displayed: 1
";

    /// Reports one fixed LLDP neighbor on every interaction, standing in for
    /// a device whose neighbor table never changes between crawl passes.
    struct FixedNeighborTransport;

    impl Transport for FixedNeighborTransport {
        fn interact<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<String>> {
            let command = command.to_string();
            Box::pin(async move {
                if command.contains("lldp") {
                    Ok(SAMPLE_LLDP.to_string())
                } else {
                    Ok(String::new())
                }
            })
        }

        fn prompt(&self) -> String {
            "switch1#".to_string()
        }

        fn close<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct NeighborConnector;
    impl Connector for NeighborConnector {
        fn name(&self) -> &str {
            "cli"
        }

        fn connect<'a>(&'a self, host: Arc<Host>) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                host.set_device_type("cisco_ios");
                if let Some(mut c) = host.connections.get_mut("cli") {
                    c.connected = true;
                    c.idle = true;
                    c.session = Some(Arc::new(FixedNeighborTransport) as Arc<dyn Transport>);
                }
            })
        }

        fn disconnect<'a>(&'a self, host: Arc<Host>) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                if let Some(mut c) = host.connections.get_mut("cli") {
                    c.connected = false;
                }
            })
        }
    }

    // Property 2 (§8): running the orchestrator again with no intervening
    // state change enqueues no new hosts, because the neighbor the second
    // pass discovers is the exact address record already registered.
    #[tokio::test]
    async fn idempotent_crawl_second_pass_adds_no_new_hosts() {
        let registry = Arc::new(HostRegistry::new(vec![Arc::new(NeighborConnector)], 2));
        registry.load(&["host1".to_string()]).await;

        let opts = CrawlOptions {
            filter: Filter::default(),
            max_hops: None,
            want_lldp: true,
            want_cdp: false,
            recursive: true,
        };
        walk(&registry, &opts, 2).await;
        let after_first_pass = registry.len();
        assert_eq!(after_first_pass, 2, "original host plus the one discovered neighbor");

        let opts_again = CrawlOptions {
            filter: Filter::default(),
            max_hops: None,
            want_lldp: true,
            want_cdp: false,
            recursive: true,
        };
        walk(&registry, &opts_again, 2).await;
        assert_eq!(registry.len(), after_first_pass);
    }
}
