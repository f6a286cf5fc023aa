// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    io::{Read, Write},
    net::TcpStream,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use anyhow::{Context, Result, bail};

use crate::connectors::{BoxFuture, Transport, transport::find_prompt_in};

struct SshInner {
    // `_session` keeps the underlying `ssh2::Session` alive; `ssh2::Channel`
    // holds its own handle into the session internally, but dropping the
    // session out from under a live channel is still undefined behavior per
    // the ssh2 docs, so the two are kept together.
    _session: ssh2::Session,
    channel: ssh2::Channel,
    last_prompt: String,
}

/// A CLI session driven over SSH via the blocking `ssh2` crate. Every
/// operation is dispatched to `tokio::task::spawn_blocking` since `ssh2`
/// offers no async API.
pub struct SshTransport {
    inner: Arc<StdMutex<SshInner>>,
}

impl SshTransport {
    pub async fn connect(
        addr: &str,
        port: u16,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let addr = addr.to_string();
        let username = username.to_string();
        let password = password.to_string();

        let inner = tokio::task::spawn_blocking(move || -> Result<SshInner> {
            let tcp = TcpStream::connect_timeout(
                &format!("{addr}:{port}")
                    .parse()
                    .with_context(|| format!("invalid address {addr}:{port}"))?,
                timeout,
            )
            .with_context(|| format!("TCP connect to {addr}:{port} failed"))?;
            tcp.set_read_timeout(Some(timeout))?;

            let mut session = ssh2::Session::new().context("failed to create SSH session")?;
            session.set_tcp_stream(tcp);
            session.handshake().context("SSH handshake failed")?;
            session
                .userauth_password(&username, &password)
                .context("SSH password authentication failed")?;
            if !session.authenticated() {
                bail!("SSH authentication did not succeed");
            }

            let mut channel = session.channel_session().context("failed to open channel")?;
            channel
                .request_pty("vt100", None, None)
                .context("failed to request pty")?;
            channel.shell().context("failed to start shell")?;

            let mut buf = String::new();
            let prompt = read_until_prompt(&mut channel, &mut buf)?;

            Ok(SshInner {
                _session: session,
                channel,
                last_prompt: prompt,
            })
        })
        .await
        .context("ssh connect task panicked")??;

        Ok(SshTransport {
            inner: Arc::new(StdMutex::new(inner)),
        })
    }
}

fn read_until_prompt(channel: &mut ssh2::Channel, acc: &mut String) -> Result<String> {
    let mut chunk = [0u8; 4096];
    loop {
        match channel.read(&mut chunk) {
            Ok(0) => bail!("SSH channel closed before a prompt was observed"),
            Ok(n) => {
                acc.push_str(&String::from_utf8_lossy(&chunk[..n]));
                if let Some(p) = find_prompt_in(acc) {
                    return Ok(p);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e).context("SSH channel read failed"),
        }
    }
}

impl Transport for SshTransport {
    fn interact<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<String>> {
        let inner = self.inner.clone();
        let command = command.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || -> Result<String> {
                #[allow(clippy::unwrap_used)]
                let mut guard = inner.lock().unwrap();
                writeln!(guard.channel, "{command}").context("failed to write SSH command")?;
                let mut buf = String::new();
                let prompt = read_until_prompt(&mut guard.channel, &mut buf)?;
                guard.last_prompt = prompt;
                Ok(buf)
            })
            .await
            .context("ssh interact task panicked")?
        })
    }

    fn prompt(&self) -> String {
        #[allow(clippy::unwrap_used)]
        self.inner.lock().unwrap().last_prompt.clone()
    }

    fn close<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || -> Result<()> {
                #[allow(clippy::unwrap_used)]
                let mut guard = inner.lock().unwrap();
                let _ = guard.channel.send_eof();
                let _ = guard.channel.close();
                Ok(())
            })
            .await
            .context("ssh close task panicked")?
        })
    }
}
