// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `BWise` library.
//!
//! This module provides the error hierarchy for failures across the
//! library: transport and protocol communication on one side, response
//! decoding on the other.

use thiserror::Error;

/// The main error type for this library.
///
/// This enum encompasses all possible errors that can occur when
/// interacting with BitWise Controls boxes.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during transport or protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while decoding a response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Errors related to transport and protocol communication (TCP/UDP/HTTP).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The XML envelope around an HTTP response could not be decoded.
    #[cfg(feature = "http")]
    #[error("invalid response envelope: {0}")]
    Envelope(#[from] quick_xml::DeError),

    /// Connection to the device failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The device closed the connection before a response arrived.
    #[error("connection closed by device")]
    ConnectionClosed,

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid or unresolvable device address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The device rejected the command with a NAK message.
    #[error("command rejected by device: {0}")]
    Nak(String),

    /// A single-shot exchange produced content that is not a response.
    #[error("unexpected response from device: {0}")]
    UnexpectedResponse(String),

    /// Socket I/O failed mid-exchange.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to decoding `bwr:` response lines.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The response carries fewer fields than the command requires.
    #[error("response has {actual} fields, expected at least {expected}")]
    TooShort {
        /// Number of fields the response must carry.
        expected: usize,
        /// Number of fields actually present.
        actual: usize,
    },

    /// Failed to parse a specific field value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
