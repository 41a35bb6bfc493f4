// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection pooling for the persistent TCP transport.
//!
//! A box accepts one TCP command session at a time, so every device
//! wired to the same box has to share one connection. The pool maps a
//! device host to that single shared connection, creates it lazily on
//! first use and replaces it in place when the box drops it.
//!
//! Entries are keyed by host alone. Two descriptors pointing at
//! different outputs of one box, or even at different ports, still
//! share the physical link.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use bwise_lib::protocol::{ConnectionPool, TcpClient};
//! use bwise_lib::types::DeviceAddress;
//!
//! let pool = Arc::new(ConnectionPool::new());
//! let address = DeviceAddress::new("10.0.0.5", 5001, 5002);
//! let client = TcpClient::new(Arc::clone(&pool), address);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::CommandResponse;
use super::connection::{TcpConfig, TcpConnection, millis};
use crate::command::Command;
use crate::error::ProtocolError;
use crate::types::DeviceAddress;

/// Shared pool of per-host TCP connections.
///
/// The pool is an explicit object: construct one and hand it (behind an
/// `Arc`) to every [`TcpClient`](super::TcpClient) that should share
/// connections. Callers queued on the same host are served strictly one
/// request/response exchange at a time.
#[derive(Debug)]
pub struct ConnectionPool {
    connections: Mutex<HashMap<String, Arc<Mutex<PooledConnection>>>>,
    config: TcpConfig,
}

impl ConnectionPool {
    /// Creates a pool with the default TCP timings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TcpConfig::default())
    }

    /// Creates a pool whose connections use the given TCP timings.
    #[must_use]
    pub fn with_config(config: TcpConfig) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Returns the TCP timings connections of this pool use.
    #[must_use]
    pub const fn config(&self) -> TcpConfig {
        self.config
    }

    /// Returns the entry for the host of `address`, creating it if
    /// this is the first device on that box.
    ///
    /// Creating an entry performs no I/O; the connection is dialed on
    /// first use and redialed transparently after the box drops it.
    pub(crate) async fn acquire(&self, address: &DeviceAddress) -> Arc<Mutex<PooledConnection>> {
        let mut connections = self.connections.lock().await;
        if let Some(entry) = connections.get(&address.host) {
            tracing::debug!(host = %address.host, "Reusing pooled connection");
            return Arc::clone(entry);
        }

        tracing::debug!(
            host = %address.host,
            tcp_port = address.tcp_port,
            "Registering pooled connection"
        );
        let entry = Arc::new(Mutex::new(PooledConnection::new(
            address.host.clone(),
            address.tcp_port,
            self.config,
        )));
        connections.insert(address.host.clone(), Arc::clone(&entry));
        entry
    }

    /// Returns the number of hosts with a registered connection.
    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

/// One shared connection slot for a single box.
///
/// `stream` is `None` until the first exchange and again after the
/// connection died; the next exchange redials.
#[derive(Debug)]
pub(crate) struct PooledConnection {
    host: String,
    port: u16,
    config: TcpConfig,
    stream: Option<TcpConnection>,
}

impl PooledConnection {
    fn new(host: String, port: u16, config: TcpConfig) -> Self {
        Self {
            host,
            port,
            config,
            stream: None,
        }
    }

    /// Sends one command and waits for its `bwr:` response.
    ///
    /// Any failure marks the connection dead so the next exchange
    /// starts from a fresh dial.
    pub(crate) async fn exchange(
        &mut self,
        command: &Command,
    ) -> Result<CommandResponse, ProtocolError> {
        let result = self.exchange_inner(command).await;
        if let Err(e) = &result {
            if self.stream.take().is_some() {
                tracing::info!(host = %self.host, error = %e, "Dropping failed pooled connection");
            }
        }
        result
    }

    async fn exchange_inner(
        &mut self,
        command: &Command,
    ) -> Result<CommandResponse, ProtocolError> {
        let response_timeout = self.config.response_timeout();
        self.ensure_connected().await?;
        let Some(conn) = self.stream.as_mut() else {
            return Err(ProtocolError::ConnectionClosed);
        };

        let line = command.encode();
        tracing::debug!(peer = %conn.peer(), command = %line, "Sending TCP command");
        conn.write_line(&line).await?;

        timeout(response_timeout, Self::read_response(conn))
            .await
            .map_err(|_| ProtocolError::Timeout(millis(response_timeout)))?
    }

    /// Dials the box if there is no usable connection, probing an
    /// existing one for remote close and stale bytes first.
    async fn ensure_connected(&mut self) -> Result<(), ProtocolError> {
        if let Some(conn) = &mut self.stream {
            match conn.probe() {
                Ok(_) => return Ok(()),
                Err(e) => {
                    tracing::info!(
                        peer = %conn.peer(),
                        error = %e,
                        "Pooled connection is dead, reconnecting"
                    );
                    self.stream = None;
                }
            }
        }

        let conn = TcpConnection::connect(&self.host, self.port, self.config).await?;
        tracing::info!(peer = %conn.peer(), "Opened pooled connection");
        self.stream = Some(conn);
        Ok(())
    }

    /// Reads until a `bwr:` line arrives, discarding unsolicited lines.
    ///
    /// A connection that closes with an unterminated `bwr:` line in the
    /// buffer still counts as answered.
    async fn read_response(conn: &mut TcpConnection) -> Result<CommandResponse, ProtocolError> {
        let mut buf = BytesMut::with_capacity(1024);
        loop {
            match conn.read_chunk(&mut buf).await {
                Ok(_) => {
                    while let Some(line) = next_line(&mut buf) {
                        if let Some(response) = CommandResponse::from_line(&line) {
                            tracing::debug!(peer = %conn.peer(), body = %response.body(), "Received TCP response");
                            return Ok(response);
                        }
                        tracing::debug!(peer = %conn.peer(), line = %line, "Discarding unsolicited line");
                    }
                }
                Err(ProtocolError::ConnectionClosed) => {
                    if let Some(response) = CommandResponse::from_chunk(&buf) {
                        return Ok(response);
                    }
                    return Err(ProtocolError::ConnectionClosed);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Splits the next complete line off the front of `buf`, without its
/// terminator. Returns `None` while the buffer holds only a partial
/// line.
fn next_line(buf: &mut BytesMut) -> Option<String> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    let line = buf.split_to(pos + 1);
    Some(String::from_utf8_lossy(&line).trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_are_keyed_by_host_alone() {
        let pool = ConnectionPool::new();
        let first = pool
            .acquire(&DeviceAddress::new("10.0.0.5", 5001, 5002))
            .await;
        let second = pool
            .acquire(&DeviceAddress::new("10.0.0.5", 6001, 6002))
            .await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.connection_count().await, 1);
    }

    #[tokio::test]
    async fn distinct_hosts_get_distinct_entries() {
        let pool = ConnectionPool::new();
        pool.acquire(&DeviceAddress::new("10.0.0.5", 5001, 5002))
            .await;
        pool.acquire(&DeviceAddress::new("10.0.0.6", 5001, 5002))
            .await;
        assert_eq!(pool.connection_count().await, 2);
    }

    #[test]
    fn next_line_splits_complete_lines() {
        let mut buf = BytesMut::from(&b"first\r\nbwr:ad:1:0:1:2:3:\r\npartial"[..]);
        assert_eq!(next_line(&mut buf).as_deref(), Some("first"));
        assert_eq!(next_line(&mut buf).as_deref(), Some("bwr:ad:1:0:1:2:3:"));
        assert_eq!(next_line(&mut buf), None);
        assert_eq!(&buf[..], b"partial");
    }

    #[test]
    fn next_line_handles_bare_newlines() {
        let mut buf = BytesMut::from(&b"one\ntwo\n"[..]);
        assert_eq!(next_line(&mut buf).as_deref(), Some("one"));
        assert_eq!(next_line(&mut buf).as_deref(), Some("two"));
        assert_eq!(next_line(&mut buf), None);
    }
}
