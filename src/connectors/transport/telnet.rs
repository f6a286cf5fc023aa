// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::Mutex,
    time::timeout,
};

use crate::connectors::{BoxFuture, Transport, transport::find_prompt_in};

const IAC: u8 = 0xFF;
const DO: u8 = 0xFD;
const DONT: u8 = 0xFE;
const WILL: u8 = 0xFB;
const WONT: u8 = 0xFC;

/// A CLI session driven over a raw TELNET (RFC 854) connection. This
/// transport never negotiates an optional feature: every `DO`/`WILL` offer
/// from the remote end is refused (`WONT`/`DONT`), which is sufficient to
/// drive a plain line-mode CLI shell without a full option-negotiation
/// state machine.
pub struct TelnetTransport {
    stream: Mutex<TcpStream>,
    last_prompt: Mutex<String>,
    timeout: Duration,
}

impl TelnetTransport {
    pub async fn connect(
        addr: &str,
        port: u16,
        username: &str,
        password: &str,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let mut stream = timeout(connect_timeout, TcpStream::connect((addr, port)))
            .await
            .with_context(|| format!("TCP connect to {addr}:{port} timed out"))?
            .with_context(|| format!("TCP connect to {addr}:{port} failed"))?;

        let mut buf = String::new();
        read_until(&mut stream, &mut buf, connect_timeout, |b| {
            b.to_lowercase().contains("login:") || b.to_lowercase().contains("username:")
        })
        .await?;
        stream
            .write_all(format!("{username}\n").as_bytes())
            .await?;

        buf.clear();
        read_until(&mut stream, &mut buf, connect_timeout, |b| {
            b.to_lowercase().contains("password:")
        })
        .await?;
        stream
            .write_all(format!("{password}\n").as_bytes())
            .await?;

        buf.clear();
        let prompt = read_until(&mut stream, &mut buf, connect_timeout, |b| {
            find_prompt_in(b).is_some()
        })
        .await?;

        Ok(TelnetTransport {
            stream: Mutex::new(stream),
            last_prompt: Mutex::new(prompt),
            timeout: connect_timeout,
        })
    }
}

/// Reads from `stream`, stripping/answering telnet IAC sequences, until
/// `done` reports the accumulated clean text satisfies the caller, or the
/// timeout elapses. Returns the clean text accumulated so far.
async fn read_until(
    stream: &mut TcpStream,
    acc: &mut String,
    budget: Duration,
    done: impl Fn(&str) -> bool,
) -> Result<String> {
    let mut raw = [0u8; 4096];
    loop {
        if done(acc) {
            return Ok(acc.clone());
        }
        let n = timeout(budget, stream.read(&mut raw))
            .await
            .context("telnet read timed out")?
            .context("telnet read failed")?;
        if n == 0 {
            bail!("telnet connection closed before expected text was observed");
        }
        let clean = strip_iac(stream, &raw[..n]).await?;
        acc.push_str(&String::from_utf8_lossy(&clean));
    }
}

/// Strips IAC command sequences from `data`, replying to every `DO`/`WILL`
/// option offer with a refusal, and returns the remaining plain text bytes.
async fn strip_iac(stream: &mut TcpStream, data: &[u8]) -> Result<Vec<u8>> {
    let mut clean = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == IAC && i + 2 < data.len() {
            let (cmd, opt) = (data[i + 1], data[i + 2]);
            let reply = match cmd {
                DO => Some([IAC, WONT, opt]),
                WILL => Some([IAC, DONT, opt]),
                DONT | WONT => None,
                _ => None,
            };
            if let Some(reply) = reply {
                stream.write_all(&reply).await.context("telnet IAC reply failed")?;
            }
            i += 3;
        } else {
            clean.push(data[i]);
            i += 1;
        }
    }
    Ok(clean)
}

impl Transport for TelnetTransport {
    fn interact<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let mut stream = self.stream.lock().await;
            stream
                .write_all(format!("{command}\n").as_bytes())
                .await
                .context("telnet write failed")?;
            let mut buf = String::new();
            let out = read_until(&mut stream, &mut buf, self.timeout, |b| {
                find_prompt_in(b).is_some()
            })
            .await?;
            if let Some(p) = find_prompt_in(&out) {
                *self.last_prompt.lock().await = p;
            }
            Ok(out)
        })
    }

    fn prompt(&self) -> String {
        self.last_prompt
            .try_lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    fn close<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut stream = self.stream.lock().await;
            let _ = stream.shutdown().await;
            Ok(())
        })
    }
}
