// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    cfg::{enums::TransportKind, logger::TARGET_TRANSPORT},
    connectors::{
        BoxFuture, Connector, Transport,
        platform::{AUTODETECT, is_known_platform, order_credentials, resolve_effective_device_type},
        transport,
    },
    creds::Credential,
    hosts::{address::AddressRecord, host::Host},
};

const DEFAULT_PORT_SSH: u16 = 22;
const DEFAULT_PORT_TELNET: u16 = 23;

/// Opens one transport session. The production path (`DefaultTransportOpener`)
/// dials real SSH/TELNET; tests substitute a fake so the credential-retry and
/// autodetect state machine below can be driven without a live device.
pub trait TransportOpener: Send + Sync {
    fn open<'a>(
        &'a self,
        kind: TransportKind,
        addr: &'a str,
        port: u16,
        username: &'a str,
        password: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Arc<dyn Transport>>>;
}

pub struct DefaultTransportOpener;

impl TransportOpener for DefaultTransportOpener {
    fn open<'a>(
        &'a self,
        kind: TransportKind,
        addr: &'a str,
        port: u16,
        username: &'a str,
        password: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Arc<dyn Transport>>> {
        Box::pin(transport::open(kind, addr, port, username, password, timeout))
    }
}

/// The CLI connector: drives a plain interactive shell (SSH or TELNET) to
/// authenticate and, optionally, autodetect a device's platform.
pub struct CliConnector {
    pub credentials: Arc<[Credential]>,
    pub transport_kind: TransportKind,
    pub timeout: Duration,
    pub opener: Arc<dyn TransportOpener>,
}

enum ConnectOutcome {
    Connected {
        transport: Arc<dyn crate::connectors::Transport>,
        device_type: String,
        hostname: String,
    },
}

enum ConnectError {
    /// The network path itself is dead; no further credential is worth
    /// trying against this address.
    Timeout,
    /// Authentication was rejected; a different credential may still work.
    Auth,
    /// Authentication succeeded during autodetection but no known platform
    /// could be recognized.
    NoMatch,
    /// Anything else: logged, treated like an authentication failure so the
    /// next credential still gets a chance.
    Other(anyhow::Error),
}

impl CliConnector {
    fn default_port(&self) -> u16 {
        match self.transport_kind {
            TransportKind::Ssh => DEFAULT_PORT_SSH,
            TransportKind::Telnet => DEFAULT_PORT_TELNET,
        }
    }

    async fn try_connect(
        &self,
        addr: &str,
        port: u16,
        cred: &Credential,
        device_type: &str,
    ) -> Result<ConnectOutcome, ConnectError> {
        let t = self.opener.open(
            self.transport_kind,
            addr,
            port,
            &cred.username,
            &cred.password,
            self.timeout,
        );
        match tokio::time::timeout(self.timeout, t).await {
            Err(_) => Err(ConnectError::Timeout),
            Ok(Err(e)) => Err(classify(e)),
            Ok(Ok(transport)) => {
                let hostname = strip_prompt_markers(&transport.prompt());
                Ok(ConnectOutcome::Connected {
                    transport,
                    device_type: device_type.to_string(),
                    hostname,
                })
            },
        }
    }

    async fn try_autodetect(
        &self,
        addr: &str,
        port: u16,
        cred: &Credential,
    ) -> Result<ConnectOutcome, ConnectError> {
        let t = self.opener.open(
            self.transport_kind,
            addr,
            port,
            &cred.username,
            &cred.password,
            self.timeout,
        );
        let transport = match tokio::time::timeout(self.timeout, t).await {
            Err(_) => return Err(ConnectError::Timeout),
            Ok(Err(e)) => return Err(classify(e)),
            Ok(Ok(t)) => t,
        };

        let probe = transport.interact("show version").await.unwrap_or_default();
        match detect_platform(&probe) {
            Some(device_type) => {
                let hostname = strip_prompt_markers(&transport.prompt());
                Ok(ConnectOutcome::Connected {
                    transport,
                    device_type: device_type.to_string(),
                    hostname,
                })
            },
            None => Err(ConnectError::NoMatch),
        }
    }
}

fn classify(e: anyhow::Error) -> ConnectError {
    let msg = e.to_string().to_lowercase();
    if msg.contains("authentication") {
        ConnectError::Auth
    } else {
        ConnectError::Other(e)
    }
}

fn strip_prompt_markers(prompt: &str) -> String {
    prompt.trim_end_matches(['#', '>']).trim().to_string()
}

/// A small heuristic banner/output sniffer used by the autodetect branch.
/// Real deployments would lean on the transport library's own platform
/// detector; this crate provides a worked substring-matching stand-in
/// covering the two reference neighbor-handler families.
fn detect_platform(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    if lower.contains("ios-xe") {
        Some("cisco_xe")
    } else if lower.contains("nx-os") {
        Some("cisco_nxos")
    } else if lower.contains("cisco ios") || lower.contains("cisco internetwork") {
        Some("cisco_ios")
    } else if lower.contains("procurve") {
        Some("hp_procurve")
    } else if lower.contains("comware") {
        Some("hp_comware")
    } else if lower.contains("arubaos") || lower.contains("aruba") {
        Some("aruba_os")
    } else if lower.contains("junos") {
        Some("juniper_junos")
    } else if lower.contains("arista") {
        Some("arista_eos")
    } else {
        None
    }
}

impl Connector for CliConnector {
    fn name(&self) -> &str {
        "cli"
    }

    fn connect<'a>(&'a self, host: Arc<Host>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if let Some(t) = host.device_type()
                && !is_known_platform(&t)
            {
                warn!(target: TARGET_TRANSPORT, device_type = %t, "host declares an unrecognized device type, known platforms only");
                fail(&host, self.name());
                return;
            }

            let ordered = order_credentials(&self.credentials, host.device_type().as_deref());
            if ordered.is_empty() {
                warn!(target: TARGET_TRANSPORT, "no credentials available to try");
                fail(&host, self.name());
                return;
            }

            let addresses: Vec<String> =
                host.record.address.iter().map(str::to_string).collect();
            let port = host.record.port.unwrap_or_else(|| self.default_port());

            set_idle(&host, self.name(), false);

            let mut connected = None;
            'addrs: for addr in &addresses {
                for cred in &ordered {
                    let effective =
                        resolve_effective_device_type(host.device_type().as_deref(), cred.device_type_hint.as_deref());
                    let outcome = if effective == AUTODETECT {
                        self.try_autodetect(addr, port, cred).await
                    } else {
                        self.try_connect(addr, port, cred, &effective).await
                    };

                    match outcome {
                        Ok(c) => {
                            connected = Some((addr.clone(), c));
                            break 'addrs;
                        },
                        Err(ConnectError::Timeout) => {
                            warn!(target: TARGET_TRANSPORT, %addr, "connect attempt timed out, abandoning host");
                            set_terminal_failed(&host, self.name());
                            return;
                        },
                        Err(ConnectError::NoMatch) => {
                            warn!(target: TARGET_TRANSPORT, %addr, "autodetect could not classify device");
                            set_terminal_failed(&host, self.name());
                            return;
                        },
                        Err(ConnectError::Auth) => continue,
                        Err(ConnectError::Other(e)) => {
                            warn!(target: TARGET_TRANSPORT, %addr, error = %e, "unexpected error during connect attempt");
                            continue;
                        },
                    }
                }
            }

            match connected {
                Some((addr, ConnectOutcome::Connected { transport, device_type, hostname })) => {
                    host.set_device_type(device_type);
                    host.set_hostname(hostname.clone());
                    info!(target: TARGET_TRANSPORT, %addr, hostname = %hostname, "host connected");
                    if let Some(mut c) = host.connections.get_mut(self.name()) {
                        c.address = AddressRecord {
                            address: crate::hosts::address::AddressValue::Single(addr),
                            port: Some(port),
                            device_type: host.device_type(),
                        };
                        c.connected = true;
                        c.failed = false;
                        c.idle = true;
                        c.session = Some(transport);
                    }
                },
                None => {
                    set_terminal_failed(&host, self.name());
                },
            }
        })
    }

    fn disconnect<'a>(&'a self, host: Arc<Host>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let session = host
                .connections
                .get(self.name())
                .and_then(|c| c.session.clone());
            if let Some(session) = session
                && let Err(e) = session.close().await
            {
                warn!(target: TARGET_TRANSPORT, error = %e, "error while closing session");
            }
            if let Some(mut c) = host.connections.get_mut(self.name()) {
                c.connected = false;
                c.idle = true;
            }
        })
    }
}

fn set_idle(host: &Host, connector: &str, idle: bool) {
    if let Some(mut c) = host.connections.get_mut(connector) {
        c.idle = idle;
    }
}

fn set_terminal_failed(host: &Host, connector: &str) {
    if let Some(mut c) = host.connections.get_mut(connector) {
        c.idle = true;
        c.failed = true;
        c.connected = false;
    }
}

fn fail(host: &Host, connector: &str) {
    set_terminal_failed(host, connector);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosts::{
        address::{AddressRecord, AddressValue},
        host::Connection as HostConnection,
        registry::HostRegistry,
    };

    #[test]
    fn strip_prompt_markers_removes_trailing_privilege_char() {
        assert_eq!(strip_prompt_markers("switch1#"), "switch1");
        assert_eq!(strip_prompt_markers("switch1>"), "switch1");
        assert_eq!(strip_prompt_markers("switch1"), "switch1");
    }

    #[test]
    fn detect_platform_recognizes_known_banners() {
        assert_eq!(detect_platform("Cisco IOS Software, C3750"), Some("cisco_ios"));
        assert_eq!(detect_platform("HP J9280A ProCurve"), Some("hp_procurve"));
        assert_eq!(detect_platform("nonsense banner"), None);
    }

    #[test]
    fn classify_recognizes_authentication_rejections() {
        assert!(matches!(
            classify(anyhow::anyhow!("SSH password Authentication failed")),
            ConnectError::Auth
        ));
        assert!(matches!(
            classify(anyhow::anyhow!("connection reset by peer")),
            ConnectError::Other(_)
        ));
    }

    /// A fake transport: always reports the same prompt and answers every
    /// `interact` with a fixed banner, standing in for a real device.
    struct FakeTransport {
        prompt: String,
        banner: String,
    }

    impl Transport for FakeTransport {
        fn interact<'a>(&'a self, _command: &'a str) -> BoxFuture<'a, Result<String>> {
            let banner = self.banner.clone();
            Box::pin(async move { Ok(banner) })
        }

        fn prompt(&self) -> String {
            self.prompt.clone()
        }

        fn close<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    /// A fake opener: only the credential named `allow` succeeds; every other
    /// credential fails as an authentication rejection, exercising the same
    /// retry path a real rejected password would take.
    struct FakeOpener {
        allow: &'static str,
        banner: &'static str,
    }

    impl TransportOpener for FakeOpener {
        fn open<'a>(
            &'a self,
            _kind: TransportKind,
            _addr: &'a str,
            _port: u16,
            username: &'a str,
            _password: &'a str,
            _timeout: Duration,
        ) -> BoxFuture<'a, Result<Arc<dyn Transport>>> {
            let allow = self.allow;
            let banner = self.banner;
            let username = username.to_string();
            Box::pin(async move {
                if username == allow {
                    Ok(Arc::new(FakeTransport {
                        prompt: "switch1#".to_string(),
                        banner: banner.to_string(),
                    }) as Arc<dyn Transport>)
                } else {
                    Err(anyhow::anyhow!("authentication failed for {username}"))
                }
            })
        }
    }

    fn host_with_cli_connection(device_type: Option<&str>) -> Arc<Host> {
        let registry = HostRegistry::new(Vec::new(), 1);
        let host = registry
            .add(AddressRecord {
                address: AddressValue::Single("10.0.0.1".to_string()),
                port: None,
                device_type: device_type.map(str::to_string),
            })
            .expect("new host");
        host.connections
            .insert("cli".to_string(), HostConnection::new("cli", host.record.clone()));
        host
    }

    // S6 — two credentials, the first rejected, the second accepted: the
    // Connection ends connected, never marked failed, with the winning
    // credential's side effects (hostname) recorded.
    #[tokio::test]
    async fn s6_auth_failure_then_success_never_marks_failed() {
        let credentials: Arc<[Credential]> = vec![
            Credential {
                username: "alice".to_string(),
                password: "wrong".to_string(),
                secret: "wrong".to_string(),
                device_type_hint: None,
            },
            Credential {
                username: "bob".to_string(),
                password: "right".to_string(),
                secret: "right".to_string(),
                device_type_hint: None,
            },
        ]
        .into();
        let connector = CliConnector {
            credentials,
            transport_kind: TransportKind::Ssh,
            timeout: Duration::from_secs(5),
            opener: Arc::new(FakeOpener { allow: "bob", banner: "Cisco IOS Software, C3750" }),
        };
        let host = host_with_cli_connection(Some("cisco_ios"));

        connector.connect(host.clone()).await;

        let c = host.connections.get("cli").expect("cli connection");
        assert!(c.connected);
        assert!(!c.failed);
        assert!(c.idle);
    }

    // S7 — no declared type on either side: autodetect opens a session,
    // classifies the probe banner, and the Host's device_type is updated.
    #[tokio::test]
    async fn s7_autodetect_resolves_device_type_from_probe_banner() {
        let credentials: Arc<[Credential]> = vec![Credential {
            username: "admin".to_string(),
            password: "admin".to_string(),
            secret: "admin".to_string(),
            device_type_hint: None,
        }]
        .into();
        let connector = CliConnector {
            credentials,
            transport_kind: TransportKind::Ssh,
            timeout: Duration::from_secs(5),
            opener: Arc::new(FakeOpener { allow: "admin", banner: "Cisco IOS Software, C3750" }),
        };
        let host = host_with_cli_connection(None);

        connector.connect(host.clone()).await;

        assert_eq!(host.device_type().as_deref(), Some("cisco_ios"));
        let c = host.connections.get("cli").expect("cli connection");
        assert!(c.connected);
        assert!(!c.failed);
    }

    // Autodetection that authenticates but cannot classify the banner is a
    // terminal failure, not a retry — the device answered but we cannot
    // speak to it.
    #[tokio::test]
    async fn autodetect_with_unrecognized_banner_fails_terminally() {
        let credentials: Arc<[Credential]> = vec![Credential {
            username: "admin".to_string(),
            password: "admin".to_string(),
            secret: "admin".to_string(),
            device_type_hint: None,
        }]
        .into();
        let connector = CliConnector {
            credentials,
            transport_kind: TransportKind::Ssh,
            timeout: Duration::from_secs(5),
            opener: Arc::new(FakeOpener { allow: "admin", banner: "some unknown device banner" }),
        };
        let host = host_with_cli_connection(None);

        connector.connect(host.clone()).await;

        let c = host.connections.get("cli").expect("cli connection");
        assert!(c.failed);
        assert!(!c.connected);
    }
}
