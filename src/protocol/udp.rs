// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fire-and-forget UDP transport.
//!
//! Relay triggers care about latency, not confirmation: the box
//! executes a pulse command received over UDP without answering. The
//! client therefore only reports that the datagram left this host;
//! delivery and execution are unverified by design.

use tokio::net::{UdpSocket, lookup_host};

use crate::command::Command;
use crate::error::ProtocolError;
use crate::types::DeviceAddress;

/// Send-only client for the box's UDP command port.
///
/// Not a [`Protocol`](super::Protocol) implementor: there is never a
/// response to return.
#[derive(Debug, Clone)]
pub struct UdpClient {
    address: DeviceAddress,
}

impl UdpClient {
    /// Creates a client sending to the UDP port of `address`.
    #[must_use]
    pub const fn new(address: DeviceAddress) -> Self {
        Self { address }
    }

    /// Returns the address this client sends to.
    #[must_use]
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// Sends one CRLF-terminated command datagram.
    ///
    /// Returns the number of bytes handed to the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not resolve or the socket
    /// refuses the send. A lost datagram is not detectable.
    pub async fn send(&self, command: &Command) -> Result<usize, ProtocolError> {
        let target = format!("{}:{}", self.address.host, self.address.udp_port);
        let addr = lookup_host(&target)
            .await
            .map_err(|e| ProtocolError::InvalidAddress(format!("{target}: {e}")))?
            .next()
            .ok_or_else(|| ProtocolError::InvalidAddress(target.clone()))?;

        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(addr).await?;

        let datagram = format!("{}\r\n", command.encode());
        let sent = socket.send(datagram.as_bytes()).await?;
        tracing::debug!(peer = %target, bytes = sent, command = %command, "Sent UDP command");
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutputIndex, PulseTicks};

    #[tokio::test]
    async fn send_delivers_crlf_terminated_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let client = UdpClient::new(DeviceAddress::new("127.0.0.1", 5001, port));
        let command = Command::pulse(OutputIndex::new(2), PulseTicks::default());
        let sent = client.send(&command).await.unwrap();

        let mut buf = [0u8; 64];
        let (received, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..received], b"bwc:set:pulse:2:2:50:\r\n");
        assert_eq!(sent, received);
    }

    #[tokio::test]
    async fn send_rejects_unresolvable_host() {
        let client = UdpClient::new(DeviceAddress::new("", 5001, 5002));
        let command = Command::tcp_close();
        let result = client.send(&command).await;
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }
}
