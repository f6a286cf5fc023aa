// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex as StdMutex},
};

use tokio::sync::Mutex as TokioMutex;
use tracing::info;

use crate::{
    cfg::logger::TARGET_CORE,
    connectors::Connector,
    hosts::{
        address::{AddressRecord, parse_addresses},
        host::Host,
    },
    pool::{PoolHandle, WorkerPool},
};

/// Canonical store of hosts and their per-connector connection objects.
/// Enforces deduplication on the full address record and drives the
/// connect/disconnect work queues for every registered connector.
pub struct HostRegistry {
    hosts: StdMutex<Vec<Arc<Host>>>,
    attempts: StdMutex<HashSet<AddressRecord>>,
    connector_names: Vec<String>,
    connectors: HashMap<String, Arc<dyn Connector>>,
    connect_handles: HashMap<String, PoolHandle<Arc<Host>>>,
    connect_pools: HashMap<String, TokioMutex<WorkerPool<Arc<Host>>>>,
    pool_size: usize,
}

impl HostRegistry {
    pub fn new(connectors: Vec<Arc<dyn Connector>>, pool_size: usize) -> Self {
        let mut connect_pools = HashMap::new();
        let mut connect_handles = HashMap::new();
        let mut connector_map = HashMap::new();
        let mut connector_names = Vec::new();

        for c in connectors {
            let name = c.name().to_string();
            connector_names.push(name.clone());
            let worker_connector = c.clone();
            let pool = WorkerPool::new(pool_size, move |host: Arc<Host>, _handle| {
                let worker_connector = worker_connector.clone();
                async move {
                    worker_connector.connect(host).await;
                }
            });
            connect_handles.insert(name.clone(), pool.handle());
            connect_pools.insert(name.clone(), TokioMutex::new(pool));
            connector_map.insert(name, c);
        }

        HostRegistry {
            hosts: StdMutex::new(Vec::new()),
            attempts: StdMutex::new(HashSet::new()),
            connector_names,
            connectors: connector_map,
            connect_handles,
            connect_pools,
            pool_size,
        }
    }

    /// Registers `record` as a new Host and submits it to every connector's
    /// connect pool, unless an identical record was already presented, in
    /// which case this is a no-op and `None` is returned.
    pub fn add(&self, record: AddressRecord) -> Option<Arc<Host>> {
        #[allow(clippy::unwrap_used)]
        let mut attempts = self.attempts.lock().unwrap();
        if !attempts.insert(record.clone()) {
            return None;
        }
        drop(attempts);

        let host = Arc::new(Host::new(record, &self.connector_names));
        #[allow(clippy::unwrap_used)]
        self.hosts.lock().unwrap().push(host.clone());

        for name in &self.connector_names {
            if let Some(handle) = self.connect_handles.get(name) {
                handle.submit(host.clone());
            }
        }

        Some(host)
    }

    /// Parses `addresses`, adds every resulting record, then blocks until
    /// every initial host's connections have reached a terminal state.
    pub async fn load(&self, addresses: &[String]) {
        let records = parse_addresses(addresses);
        let added = records.len();
        for r in records {
            self.add(r);
        }
        info!(target: TARGET_CORE, added, "loaded address expressions");
        for name in &self.connector_names {
            if let Some(pool) = self.connect_pools.get(name) {
                pool.lock().await.block(false).await;
            }
        }
    }

    pub fn hosts(&self) -> Vec<Arc<Host>> {
        #[allow(clippy::unwrap_used)]
        self.hosts.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        #[allow(clippy::unwrap_used)]
        self.hosts.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ready_hosts(&self) -> Vec<Arc<Host>> {
        self.hosts()
            .into_iter()
            .filter(|h| h.is_ready())
            .collect()
    }

    /// Submits every currently connected Host to a fresh, per-connector
    /// disconnect pool and blocks until all have been closed.
    pub async fn disconnect_all(&self) {
        let hosts = self.hosts();
        for name in &self.connector_names {
            let Some(connector) = self.connectors.get(name).cloned() else {
                continue;
            };
            let mut pool = WorkerPool::new(self.pool_size, move |host: Arc<Host>, _handle| {
                let connector = connector.clone();
                async move {
                    connector.disconnect(host).await;
                }
            });
            for h in &hosts {
                let is_connected = h.connections.get(name).map(|c| c.connected).unwrap_or(false);
                if is_connected {
                    pool.submit(h.clone());
                }
            }
            pool.block(true).await;
        }
        info!(target: TARGET_CORE, "all connectors disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosts::host::Connection as HostConnection;

    struct NoopConnector;
    impl Connector for NoopConnector {
        fn name(&self) -> &str {
            "cli"
        }

        fn connect<'a>(&'a self, host: Arc<Host>) -> crate::connectors::BoxFuture<'a, ()> {
            Box::pin(async move {
                if let Some(mut c) = host.connections.get_mut("cli") {
                    c.connected = true;
                    c.idle = true;
                }
            })
        }

        fn disconnect<'a>(&'a self, host: Arc<Host>) -> crate::connectors::BoxFuture<'a, ()> {
            Box::pin(async move {
                if let Some(mut c) = host.connections.get_mut("cli") {
                    c.connected = false;
                    c.idle = true;
                }
            })
        }
    }

    #[tokio::test]
    async fn duplicate_address_records_are_rejected() {
        let registry = HostRegistry::new(vec![Arc::new(NoopConnector)], 2);
        registry.load(&["host1".to_string(), "host1".to_string()]).await;
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn load_waits_for_every_host_to_become_ready() {
        let registry = HostRegistry::new(vec![Arc::new(NoopConnector)], 2);
        registry.load(&["host1".to_string(), "host2".to_string()]).await;
        assert_eq!(registry.ready_hosts().len(), 2);
    }

    #[tokio::test]
    async fn disconnect_all_clears_connected_flag() {
        let registry = HostRegistry::new(vec![Arc::new(NoopConnector)], 2);
        registry.load(&["host1".to_string()]).await;
        registry.disconnect_all().await;
        let hosts = registry.hosts();
        let conn: std::collections::HashMap<_, _> =
            hosts[0].connections.iter().map(|e| (e.key().clone(), e.connected)).collect();
        assert_eq!(conn.get("cli"), Some(&false));
        let _ = HostConnection::new("cli", hosts[0].record.clone());
    }
}
