// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw TCP transport to a box.
//!
//! Wraps a [`tokio::net::TcpStream`] with the behavior every TCP-based
//! client here needs: resolved and time-bounded dialing, `TCP_NODELAY`,
//! keep-alive probing so half-dead links are noticed, bounded reads and
//! an explicit liveness probe used by the pool before reusing an idle
//! connection.

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;

use crate::error::ProtocolError;

/// Most stale bytes drained in one liveness probe before giving up and
/// letting the line scanner deal with the rest.
const MAX_STALE_DRAIN: usize = 8 * 1024;

/// Timing configuration for TCP exchanges.
///
/// The defaults match the supported hardware: boxes answer within a few
/// hundred milliseconds when healthy and go silent rather than slow
/// when they misbehave.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bwise_lib::protocol::TcpConfig;
///
/// let config = TcpConfig::new().with_response_timeout(Duration::from_secs(2));
/// assert_eq!(config.response_timeout(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpConfig {
    connect_timeout: Duration,
    read_timeout: Duration,
    response_timeout: Duration,
    keepalive_time: Duration,
}

impl TcpConfig {
    /// Default bound on establishing a connection.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default bound on a single read while a response is pending.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);
    /// Default bound on a whole command/response exchange.
    pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default keep-alive probe delay.
    pub const DEFAULT_KEEPALIVE_TIME: Duration = Duration::from_secs(5);

    /// Creates a configuration with the default timings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            response_timeout: Self::DEFAULT_RESPONSE_TIMEOUT,
            keepalive_time: Self::DEFAULT_KEEPALIVE_TIME,
        }
    }

    /// Sets the bound on establishing a connection.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the bound on a single read while a response is pending.
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the bound on a whole command/response exchange.
    #[must_use]
    pub const fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the keep-alive probe delay.
    #[must_use]
    pub const fn with_keepalive_time(mut self, time: Duration) -> Self {
        self.keepalive_time = time;
        self
    }

    /// Returns the bound on establishing a connection.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the bound on a single read while a response is pending.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the bound on a whole command/response exchange.
    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Returns the keep-alive probe delay.
    #[must_use]
    pub const fn keepalive_time(&self) -> Duration {
        self.keepalive_time
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A live TCP connection to one box.
#[derive(Debug)]
pub(crate) struct TcpConnection {
    stream: TcpStream,
    peer: String,
    config: TcpConfig,
}

impl TcpConnection {
    /// Resolves the peer and dials it within the configured bound.
    pub(crate) async fn connect(
        host: &str,
        port: u16,
        config: TcpConfig,
    ) -> Result<Self, ProtocolError> {
        let peer = format!("{host}:{port}");
        let addr = lookup_host(&peer)
            .await
            .map_err(|e| ProtocolError::InvalidAddress(format!("{peer}: {e}")))?
            .next()
            .ok_or_else(|| ProtocolError::InvalidAddress(peer.clone()))?;

        let stream = timeout(config.connect_timeout(), TcpStream::connect(addr))
            .await
            .map_err(|_| ProtocolError::ConnectionFailed(format!("{peer}: connect timed out")))?
            .map_err(|e| ProtocolError::ConnectionFailed(format!("{peer}: {e}")))?;

        stream.set_nodelay(true)?;
        let keepalive = TcpKeepalive::new().with_time(config.keepalive_time());
        SockRef::from(&stream).set_tcp_keepalive(&keepalive)?;

        tracing::debug!(peer = %peer, "TCP connection established");
        Ok(Self {
            stream,
            peer,
            config,
        })
    }

    /// Returns the `host:port` string this connection talks to.
    pub(crate) fn peer(&self) -> &str {
        &self.peer
    }

    /// Writes one CRLF-terminated command line.
    pub(crate) async fn write_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Reads the next chunk into `buf`, bounded by the idle read
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ConnectionClosed`] when the box has
    /// closed the stream and [`ProtocolError::Timeout`] when it stays
    /// silent for the whole idle window.
    pub(crate) async fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<usize, ProtocolError> {
        let read_timeout = self.config.read_timeout();
        let n = timeout(read_timeout, self.stream.read_buf(buf))
            .await
            .map_err(|_| ProtocolError::Timeout(millis(read_timeout)))??;
        if n == 0 {
            return Err(ProtocolError::ConnectionClosed);
        }
        Ok(n)
    }

    /// Checks whether the box is still on the other end, draining any
    /// unsolicited bytes it sent since the last exchange.
    ///
    /// Returns the number of stale bytes discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ConnectionClosed`] if the remote end
    /// has gone away.
    pub(crate) fn probe(&mut self) -> Result<usize, ProtocolError> {
        let mut drained = 0;
        let mut scratch = [0u8; 512];
        while drained < MAX_STALE_DRAIN {
            match self.stream.try_read(&mut scratch) {
                Ok(0) => return Err(ProtocolError::ConnectionClosed),
                Ok(n) => drained += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        if drained > 0 {
            tracing::debug!(peer = %self.peer, bytes = drained, "Drained stale bytes before reuse");
        }
        Ok(drained)
    }

    /// Gracefully shuts down the write half.
    pub(crate) async fn shutdown(&mut self) -> Result<(), ProtocolError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Converts a duration into the whole milliseconds reported by timeout
/// errors.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
