// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TCP clients for the BitWise command protocol.
//!
//! [`TcpClient`] is the normal choice: it exchanges commands over the
//! shared per-host connection owned by a [`ConnectionPool`], so many
//! devices on one box queue onto one session. [`OneShotTcpClient`]
//! dials a fresh connection per exchange and tears it down with the
//! courtesy `bwc:tcpclose:` command, which suits boxes that are shared
//! with other controllers and must not be held open.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;

use super::connection::{TcpConfig, TcpConnection};
use super::pool::ConnectionPool;
use super::{CommandResponse, Protocol};
use crate::command::Command;
use crate::error::ProtocolError;
use crate::types::DeviceAddress;

/// Request/response client over a pooled persistent connection.
///
/// Create one per device descriptor; clients sharing a pool queue onto
/// the same physical connection.
#[derive(Debug)]
pub struct TcpClient {
    pool: Arc<ConnectionPool>,
    address: DeviceAddress,
}

impl TcpClient {
    /// Creates a client that exchanges commands through `pool`.
    #[must_use]
    pub fn new(pool: Arc<ConnectionPool>, address: DeviceAddress) -> Self {
        Self { pool, address }
    }

    /// Returns the address this client talks to.
    #[must_use]
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }
}

#[async_trait]
impl Protocol for TcpClient {
    async fn send_command(&self, command: &Command) -> Result<CommandResponse, ProtocolError> {
        let entry = self.pool.acquire(&self.address).await;
        let mut conn = entry.lock().await;
        conn.exchange(command).await
    }
}

/// Request/response client that uses one connection per exchange.
///
/// After a successful exchange the box is asked to close the session
/// with `bwc:tcpclose:`; the command is not answered and a failure to
/// deliver it does not fail the exchange.
#[derive(Debug)]
pub struct OneShotTcpClient {
    address: DeviceAddress,
    config: TcpConfig,
}

impl OneShotTcpClient {
    /// Creates a client with the default TCP timings.
    #[must_use]
    pub fn new(address: DeviceAddress) -> Self {
        Self::with_config(address, TcpConfig::default())
    }

    /// Creates a client with explicit TCP timings.
    #[must_use]
    pub const fn with_config(address: DeviceAddress, config: TcpConfig) -> Self {
        Self { address, config }
    }

    /// Returns the address this client talks to.
    #[must_use]
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }
}

#[async_trait]
impl Protocol for OneShotTcpClient {
    async fn send_command(&self, command: &Command) -> Result<CommandResponse, ProtocolError> {
        let mut conn =
            TcpConnection::connect(&self.address.host, self.address.tcp_port, self.config).await?;

        let line = command.encode();
        tracing::debug!(peer = %conn.peer(), command = %line, "Sending one-shot TCP command");
        conn.write_line(&line).await?;

        let mut buf = BytesMut::with_capacity(1024);
        conn.read_chunk(&mut buf).await?;

        // A one-shot exchange owns the whole session, so the first
        // chunk must be the response. Anything else is a firmware or
        // wiring problem, not routable noise.
        let Some(response) = CommandResponse::from_chunk(&buf) else {
            let text = String::from_utf8_lossy(&buf).trim_end().to_string();
            return Err(ProtocolError::UnexpectedResponse(text));
        };
        tracing::debug!(peer = %conn.peer(), body = %response.body(), "Received one-shot TCP response");

        if let Err(e) = conn.write_line(&Command::tcp_close().encode()).await {
            tracing::debug!(peer = %conn.peer(), error = %e, "Courtesy close not delivered");
        }
        if let Err(e) = conn.shutdown().await {
            tracing::debug!(peer = %conn.peer(), error = %e, "Shutdown after exchange failed");
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_expose_their_address() {
        let address = DeviceAddress::new("10.0.0.5", 5001, 5002);
        let pool = Arc::new(ConnectionPool::new());
        let pooled = TcpClient::new(pool, address.clone());
        assert_eq!(pooled.address(), &address);

        let one_shot = OneShotTcpClient::new(address.clone());
        assert_eq!(one_shot.address(), &address);
    }
}
