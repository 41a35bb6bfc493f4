// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP protocol implementation for BitWise boxes.
//!
//! The box exposes its command channel as
//! `GET /bwc.xml?bwc=<urlencoded command>`, answering with a small XML
//! envelope:
//!
//! ```text
//! <response><bwr>bwr:ad:3:0:10:0:160:</bwr></response>
//! ```
//!
//! A rejected command carries a `NAK:`-prefixed value in the same slot
//! instead of a `bwr:` line.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::command::Command;
use crate::error::ProtocolError;
use crate::protocol::{CommandResponse, Protocol};
use crate::response::NAK_PREFIX;

/// Configuration for a box reached over HTTP.
///
/// HTTP is stateless here: each command is an independent request, so
/// there is no pooling and no connection lifecycle to configure beyond
/// the request timeout.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bwise_lib::protocol::HttpConfig;
///
/// let config = HttpConfig::new("10.0.0.5")
///     .with_port(8080)
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.base_url(), "http://10.0.0.5:8080");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    host: String,
    port: u16,
    timeout: Duration,
}

impl HttpConfig {
    /// Default HTTP port of the box.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a new HTTP configuration for the specified host.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL from this configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.port == Self::DEFAULT_PORT {
            format!("http://{}", self.host)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    /// Creates an [`HttpClient`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be
    /// created.
    pub fn into_client(self) -> Result<HttpClient, ProtocolError> {
        let base_url = self.base_url();
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ProtocolError::Http)?;
        Ok(HttpClient { base_url, client })
    }
}

/// HTTP client for the box's `/bwc.xml` command endpoint.
///
/// # Examples
///
/// ```no_run
/// use bwise_lib::command::Command;
/// use bwise_lib::protocol::{HttpClient, Protocol};
/// use bwise_lib::types::OutputIndex;
///
/// # async fn example() -> bwise_lib::Result<()> {
/// let client = HttpClient::new("10.0.0.5")?;
/// let response = client
///     .send_command(&Command::sensor_query(OutputIndex::new(3)))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client for the specified host.
    ///
    /// The host may carry an explicit `:port` suffix or a full
    /// `http://` prefix; a bare host talks to port 80.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be
    /// created.
    pub fn new(host: impl Into<String>) -> Result<Self, ProtocolError> {
        let host = host.into();
        let base_url = if host.starts_with("http://") {
            host
        } else {
            format!("http://{host}")
        };

        let client = Client::builder()
            .timeout(HttpConfig::DEFAULT_TIMEOUT)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(Self { base_url, client })
    }

    /// Returns the base URL of the box.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the URL for a command.
    fn build_url(&self, command: &Command) -> String {
        let encoded = urlencoding::encode(&command.encode()).into_owned();
        format!("{}/bwc.xml?bwc={encoded}", self.base_url)
    }
}

#[async_trait]
impl Protocol for HttpClient {
    async fn send_command(&self, command: &Command) -> Result<CommandResponse, ProtocolError> {
        let url = self.build_url(command);
        tracing::debug!(url = %url, "Sending HTTP command");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        if !response.status().is_success() {
            return Err(ProtocolError::ConnectionFailed(format!(
                "HTTP {} - {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response.text().await.map_err(ProtocolError::Http)?;
        tracing::debug!(body = %body, "Received HTTP response");

        unwrap_envelope(&body)
    }
}

/// XML envelope the box wraps every HTTP response in.
#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    bwr: String,
}

/// Extracts and validates the response line from the XML envelope.
fn unwrap_envelope(body: &str) -> Result<CommandResponse, ProtocolError> {
    let envelope: ResponseEnvelope = quick_xml::de::from_str(body)?;
    if envelope.bwr.starts_with(NAK_PREFIX) {
        return Err(ProtocolError::Nak(envelope.bwr));
    }
    CommandResponse::from_line(&envelope.bwr)
        .ok_or(ProtocolError::UnexpectedResponse(envelope.bwr))
}
