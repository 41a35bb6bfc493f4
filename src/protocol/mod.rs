// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Protocol implementations for communicating with BitWise boxes.
//!
//! This module provides the TCP, UDP and HTTP transports for sending
//! commands and receiving responses.
//!
//! # Clients
//!
//! - [`TcpClient`]: request/response over a pooled persistent TCP
//!   connection
//! - [`OneShotTcpClient`]: one connection per exchange, with the
//!   courtesy `bwc:tcpclose:` teardown
//! - [`HttpClient`]: request/response through the box's XML-over-HTTP
//!   endpoint
//! - [`UdpClient`]: fire-and-forget datagrams, used for relay triggers
//!   where latency matters more than confirmation
//!
//! # Connection Pooling
//!
//! Boxes drop overlapping TCP sessions, so all devices wired to one box
//! must share a single connection. [`ConnectionPool`] owns those shared
//! connections, keyed by host; construct one pool per process (or per
//! composition root) and hand it to every [`TcpClient`].

use async_trait::async_trait;

mod connection;
#[cfg(feature = "http")]
mod http;
mod pool;
mod tcp;
mod udp;

pub use connection::TcpConfig;
#[cfg(feature = "http")]
pub use http::{HttpClient, HttpConfig};
pub use pool::ConnectionPool;
pub use tcp::{OneShotTcpClient, TcpClient};
pub use udp::UdpClient;

use crate::command::Command;
use crate::error::{ParseError, ProtocolError};
use crate::response::{RESPONSE_PREFIX, SensorReading};

/// Response from a BitWise command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// The raw `bwr:` response line, without its CRLF terminator.
    body: String,
}

impl CommandResponse {
    /// Creates a new command response with the given body.
    #[must_use]
    pub fn new(body: String) -> Self {
        Self { body }
    }

    /// Returns the raw response line.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Accepts a received line as a response if it carries the `bwr:`
    /// prefix.
    ///
    /// Anything else on the stream is unsolicited noise and yields
    /// `None`.
    #[must_use]
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if line.starts_with(RESPONSE_PREFIX) {
            Some(Self::new(line.to_string()))
        } else {
            None
        }
    }

    /// Accepts a received chunk as a response if it decodes as UTF-8
    /// text carrying the `bwr:` prefix.
    #[must_use]
    pub fn from_chunk(chunk: &[u8]) -> Option<Self> {
        std::str::from_utf8(chunk).ok().and_then(Self::from_line)
    }

    /// Parses the response as a sensor measurement triple.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not carry the seven fields of
    /// a sensor response or a measurement field is not numeric.
    pub fn reading(&self) -> Result<SensorReading, ParseError> {
        SensorReading::parse(&self.body)
    }
}

/// Trait for transports that can exchange a command for a response.
///
/// Implemented by [`TcpClient`], [`OneShotTcpClient`] and
/// [`HttpClient`]. The send-only [`UdpClient`] is deliberately not an
/// implementor: it never observes a response.
#[async_trait]
pub trait Protocol: Send + Sync {
    /// Sends a command to the box and returns the matched response.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the command cannot be delivered or no
    /// response arrives before the transport's deadline.
    async fn send_command(&self, command: &Command) -> Result<CommandResponse, ProtocolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_line_accepts_response() {
        let response = CommandResponse::from_line("bwr:ad:3:0:10:0:160:\r\n").unwrap();
        assert_eq!(response.body(), "bwr:ad:3:0:10:0:160:");
    }

    #[test]
    fn from_line_rejects_noise() {
        assert!(CommandResponse::from_line("garbage").is_none());
        assert!(CommandResponse::from_line("").is_none());
        assert!(CommandResponse::from_line("NAK:bad-output").is_none());
    }

    #[test]
    fn from_line_rejects_indented_prefix() {
        assert!(CommandResponse::from_line("  bwr:ad:3:0:1:2:3:").is_none());
    }

    #[test]
    fn from_chunk_rejects_invalid_utf8() {
        assert!(CommandResponse::from_chunk(&[0xff, 0xfe, 0xfd]).is_none());
    }

    #[test]
    fn from_chunk_accepts_response_bytes() {
        let response = CommandResponse::from_chunk(b"bwr:ad:1:0:5:0:7:\r\n").unwrap();
        assert_eq!(response.reading().unwrap().max, 7);
    }
}
