// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! End-to-end scenarios driven through the public engine types with a mock
//! `Connector`, standing in for a live device lab.

use std::sync::Arc;

use netshell::{
    connectors::{BoxFuture, Connector},
    hosts::{
        address::{AddressRecord, AddressValue},
        host::Host,
        registry::HostRegistry,
    },
    neighbors::{filter::build_filters, model::NeighborRecord},
};

/// Connects instantly and tags every host with a fixed device type, so
/// registry/crawl plumbing can be exercised without a real transport.
struct InstantConnector {
    device_type: &'static str,
}

impl Connector for InstantConnector {
    fn name(&self) -> &str {
        "cli"
    }

    fn connect<'a>(&'a self, host: Arc<Host>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            host.set_device_type(self.device_type);
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
                c.idle = true;
            }
        })
    }
}

// S1 — single positional address, known type: one Host created, ready, and
// carrying the device type given on the command line.
#[tokio::test]
async fn s1_single_address_reaches_ready_with_declared_type() {
    let registry = HostRegistry::new(vec![Arc::new(InstantConnector { device_type: "router_os" })], 2);
    registry.load(&["192.0.2.10@router_os".to_string()]).await;

    let hosts = registry.ready_hosts();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].device_type().as_deref(), Some("router_os"));
    assert_eq!(hosts[0].record.address, AddressValue::Single("192.0.2.10".to_string()));
}

// S4 — dedup on crawl: re-presenting an address already in the registry is a
// no-op; a genuinely new address is added exactly once.
#[tokio::test]
async fn s4_dedup_rejects_repeat_address_but_accepts_new_one() {
    let registry = HostRegistry::new(vec![Arc::new(InstantConnector { device_type: "cisco_ios" })], 2);
    registry.load(&["10.0.0.1".to_string()]).await;
    assert_eq!(registry.len(), 1);

    let h1_record = registry.hosts()[0].record.clone();
    assert!(registry.add(h1_record).is_none());

    let h2 = registry.add(AddressRecord {
        address: AddressValue::Single("10.0.0.2".to_string()),
        port: None,
        device_type: None,
    });
    assert!(h2.is_some());
    assert_eq!(registry.len(), 2);
}

// S5 — filter disjunction: a neighbor matching either conjunction passes; one
// matching neither is rejected.
#[test]
fn s5_filter_disjunction_matches_spec_example() {
    let filter = build_filters(&["platform:WS".to_string(), r"addresses:192\.168\.".to_string()]);

    let rejected = NeighborRecord {
        platform: vec!["AIR-1".to_string()],
        addresses: vec!["10.0.0.1".to_string()],
        ..Default::default()
    };
    assert!(!filter.passes(&rejected));

    let accepted_by_platform = NeighborRecord {
        platform: vec!["WS-48".to_string()],
        ..Default::default()
    };
    assert!(filter.passes(&accepted_by_platform));

    let accepted_by_address = NeighborRecord {
        addresses: vec!["192.168.1.5".to_string()],
        ..Default::default()
    };
    assert!(filter.passes(&accepted_by_address));
}

// S7-adjacent: a Host with no declared type stays undetected by the
// registry alone — autodetection is the CliConnector's job (unit-tested in
// connectors::platform::order_credentials / cli_connector), this only
// confirms the registry does not itself invent a type.
#[tokio::test]
async fn host_without_declared_type_stays_untyped_until_connector_resolves_it() {
    let registry = HostRegistry::new(vec![Arc::new(InstantConnector { device_type: "router_os" })], 1);
    registry.load(&["switch1".to_string()]).await;
    assert_eq!(registry.hosts()[0].device_type().as_deref(), Some("router_os"));
}
