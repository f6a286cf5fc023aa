// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU32, Ordering},
};

use dashmap::DashMap;

use crate::{connectors::Transport, hosts::address::AddressRecord};

/// One connector's session state for a Host. Mirrors the original tool's
/// per-host/per-connector connection object: `connected`/`failed`/`idle` are
/// tracked as independent flags rather than folded into a single state enum
/// because the Connector drives `idle` down and back up around every
/// credential attempt while `connected`/`failed` only ever latch once.
pub struct Connection {
    pub connector: String,
    pub address: AddressRecord,
    pub connected: bool,
    pub failed: bool,
    pub idle: bool,
    pub session: Option<Arc<dyn Transport>>,
}

impl Connection {
    pub fn new(connector: impl Into<String>, address: AddressRecord) -> Self {
        Connection {
            connector: connector.into(),
            address,
            connected: false,
            failed: false,
            idle: true,
            session: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.idle && self.connected
    }
}

/// A target host plus its per-connector Connections. Identity is
/// `record`, which is also what the Host Registry dedups on.
pub struct Host {
    pub record: AddressRecord,
    pub connections: DashMap<String, Connection>,
    hostname: Mutex<Option<String>>,
    device_type: Mutex<Option<String>>,
    pub info: Mutex<serde_json::Map<String, serde_json::Value>>,
    hop: AtomicU32,
}

impl Host {
    pub fn new(record: AddressRecord, connector_names: &[String]) -> Self {
        let connections = DashMap::new();
        for name in connector_names {
            connections.insert(name.clone(), Connection::new(name.clone(), record.clone()));
        }
        let device_type = record.device_type.clone();
        Host {
            record,
            connections,
            hostname: Mutex::new(None),
            device_type: Mutex::new(device_type),
            info: Mutex::new(serde_json::Map::new()),
            hop: AtomicU32::new(0),
        }
    }

    pub fn hop(&self) -> u32 {
        self.hop.load(Ordering::SeqCst)
    }

    pub fn set_hop(&self, hop: u32) {
        self.hop.store(hop, Ordering::SeqCst);
    }

    pub fn device_type(&self) -> Option<String> {
        #[allow(clippy::unwrap_used)]
        self.device_type.lock().unwrap().clone()
    }

    pub fn set_device_type(&self, t: impl Into<String>) {
        #[allow(clippy::unwrap_used)]
        let mut guard = self.device_type.lock().unwrap();
        if guard.is_none() {
            *guard = Some(t.into());
        }
    }

    pub fn hostname(&self) -> Option<String> {
        #[allow(clippy::unwrap_used)]
        self.hostname.lock().unwrap().clone()
    }

    pub fn set_hostname(&self, h: impl Into<String>) {
        #[allow(clippy::unwrap_used)]
        *self.hostname.lock().unwrap() = Some(h.into());
    }

    /// Ready iff at least one Connection is connected and every Connection
    /// is idle.
    pub fn is_ready(&self) -> bool {
        let mut any_connected = false;
        for entry in self.connections.iter() {
            if !entry.idle {
                return false;
            }
            any_connected |= entry.connected;
        }
        any_connected
    }

    pub fn all_idle(&self) -> bool {
        self.connections.iter().all(|c| c.idle)
    }
}
