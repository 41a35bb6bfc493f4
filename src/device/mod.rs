// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level device abstraction for mechanisms wired to a BitWise box.
//!
//! A [`Device`] pairs one descriptor (box address, output, threshold)
//! with a query transport and a trigger path, and exposes the door
//! semantics on top: observed state, debounced target state and the
//! relay pulse that moves the door.
//!
//! # Transports
//!
//! ## Pooled TCP
//!
//! The usual deployment: queries go over the shared per-host TCP
//! connection, triggers over UDP.
//!
//! ```no_run
//! use std::sync::Arc;
//! use bwise_lib::protocol::ConnectionPool;
//! use bwise_lib::types::{DeviceAddress, DeviceDescriptor, OutputIndex};
//! use bwise_lib::Device;
//!
//! # async fn example() -> bwise_lib::Result<()> {
//! let pool = Arc::new(ConnectionPool::new());
//! let descriptor = DeviceDescriptor::new(
//!     "Garage Door",
//!     DeviceAddress::new("10.0.0.5", 5001, 5002),
//!     OutputIndex::new(3),
//! );
//!
//! let device = Device::tcp(&pool, descriptor).build();
//! if device.door_state().await?.is_open() {
//!     device.close().await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## HTTP
//!
//! For boxes only reachable through their web endpoint. Queries are
//! independent HTTP requests; triggers still default to UDP.
//!
//! ```no_run
//! use bwise_lib::types::{DeviceAddress, DeviceDescriptor, OutputIndex};
//! use bwise_lib::Device;
//!
//! # async fn example() -> bwise_lib::Result<()> {
//! let descriptor = DeviceDescriptor::new(
//!     "Shop Door",
//!     DeviceAddress::new("10.0.0.6", 5001, 5002),
//!     OutputIndex::new(1),
//! );
//!
//! let device = Device::http(descriptor).build()?;
//! device.pulse().await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "http")]
mod http_builder;
mod tcp_builder;

#[cfg(feature = "http")]
pub use http_builder::HttpDeviceBuilder;
pub use tcp_builder::TcpDeviceBuilder;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::command::Command;
use crate::error::Error;
#[cfg(feature = "http")]
use crate::protocol::{HttpClient, HttpConfig};
use crate::protocol::{CommandResponse, ConnectionPool, Protocol, TcpClient, UdpClient};
use crate::response::SensorReading;
use crate::state::DoorState;
use crate::types::{DeviceDescriptor, PulseTicks};

/// How long after construction the target state is reconciled with the
/// first real reading.
const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// The path a relay pulse takes to the box.
#[derive(Debug)]
pub(crate) enum TriggerPath {
    /// Fire-and-forget datagram, lowest latency, no confirmation.
    Udp(UdpClient),
    /// Round trip over the query transport, confirmed by a `bwr:` line.
    Acknowledged,
}

/// One mechanism on a BitWise box, seen as a door.
///
/// The type parameter `P` is the query transport: [`TcpClient`] for the
/// pooled persistent connection or [`HttpClient`] for the web endpoint.
/// Construction goes through [`Device::tcp`] or [`Device::http`].
///
/// The target state starts out `Closed` and is silently reconciled with
/// the first observed reading shortly after construction, so a restart
/// next to an open door does not pretend the door was commanded shut.
#[derive(Debug)]
pub struct Device<P: Protocol> {
    protocol: Arc<P>,
    descriptor: DeviceDescriptor,
    pulse_ticks: PulseTicks,
    trigger: TriggerPath,
    target: Arc<RwLock<DoorState>>,
}

impl<P: Protocol> Device<P> {
    /// Creates a device over an already-configured transport.
    pub(crate) fn new(
        protocol: P,
        descriptor: DeviceDescriptor,
        trigger: TriggerPath,
        pulse_ticks: PulseTicks,
    ) -> Self {
        Self {
            protocol: Arc::new(protocol),
            descriptor,
            pulse_ticks,
            trigger,
            target: Arc::new(RwLock::new(DoorState::Closed)),
        }
    }

    /// Returns the descriptor this device was built from.
    #[must_use]
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// Returns the device name, for logging.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Sends a command over the query transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn send_command(&self, command: &Command) -> Result<CommandResponse, Error> {
        self.protocol
            .send_command(command)
            .await
            .map_err(Error::Protocol)
    }

    /// Queries the raw analog reading of this device's output.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the response does not
    /// carry a numeric measurement triple.
    pub async fn sensor_reading(&self) -> Result<SensorReading, Error> {
        read_sensor(self.protocol.as_ref(), &self.descriptor).await
    }

    /// Queries the box and interprets the reading as a door position.
    ///
    /// Always performs a fresh query; the state is never answered from
    /// a cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn door_state(&self) -> Result<DoorState, Error> {
        read_door_state(self.protocol.as_ref(), &self.descriptor).await
    }

    /// Returns the last commanded target state.
    #[must_use]
    pub fn target_state(&self) -> DoorState {
        *self.target.read()
    }

    /// Whether an obstruction is detected. The hardware has no
    /// obstruction sensor, so this is always `false`.
    // Uses &self for method call syntax consistency, even though the
    // answer is constant.
    #[allow(clippy::unused_self)]
    #[must_use]
    pub fn obstruction_detected(&self) -> bool {
        false
    }

    /// Pulses the relay, unconditionally.
    ///
    /// This is the momentary-switch operation: the door opener toggles
    /// direction on every pulse, so callers that care about direction
    /// should use [`set_target_state`](Self::set_target_state) instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the pulse cannot be delivered. Over UDP that
    /// only covers local send failures; execution is unconfirmed.
    pub async fn pulse(&self) -> Result<(), Error> {
        let command = Command::pulse(self.descriptor.output, self.pulse_ticks);
        match &self.trigger {
            TriggerPath::Udp(udp) => {
                let sent = udp.send(&command).await.map_err(Error::Protocol)?;
                tracing::debug!(device = %self.descriptor.name, bytes = sent, "Pulse sent over UDP");
            }
            TriggerPath::Acknowledged => {
                let response = self.send_command(&command).await?;
                tracing::debug!(
                    device = %self.descriptor.name,
                    body = %response.body(),
                    "Pulse acknowledged"
                );
            }
        }
        Ok(())
    }

    /// Moves the door toward `target`, pulsing only when necessary.
    ///
    /// The observed state is re-queried first; a door already in the
    /// requested state gets no pulse, because the relay can only toggle
    /// and a redundant pulse would move the door the wrong way.
    ///
    /// # Errors
    ///
    /// Returns an error if the state query or the pulse fails. The
    /// target state is only updated after a successful operation.
    pub async fn set_target_state(&self, target: DoorState) -> Result<(), Error> {
        let observed = self.door_state().await?;
        if observed == target {
            tracing::debug!(
                device = %self.descriptor.name,
                target = %target,
                "Door already in requested state, skipping pulse"
            );
            *self.target.write() = target;
            return Ok(());
        }

        self.pulse().await?;
        *self.target.write() = target;
        tracing::info!(device = %self.descriptor.name, target = %target, "Door commanded");
        Ok(())
    }

    /// Commands the door open. Equivalent to
    /// `set_target_state(DoorState::Open)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state query or the pulse fails.
    pub async fn open(&self) -> Result<(), Error> {
        self.set_target_state(DoorState::Open).await
    }

    /// Commands the door closed. Equivalent to
    /// `set_target_state(DoorState::Closed)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state query or the pulse fails.
    pub async fn close(&self) -> Result<(), Error> {
        self.set_target_state(DoorState::Closed).await
    }
}

impl<P: Protocol + 'static> Device<P> {
    /// Spawns the task that aligns the target state with the first
    /// observed reading after the startup settle window.
    ///
    /// Best effort: a failed query leaves the default in place and the
    /// next successful set-operation takes over.
    pub(crate) fn start_target_reconcile(&self) {
        let protocol = Arc::clone(&self.protocol);
        let descriptor = self.descriptor.clone();
        let target = Arc::clone(&self.target);
        tokio::spawn(async move {
            tokio::time::sleep(SETTLE_DELAY).await;
            match read_door_state(protocol.as_ref(), &descriptor).await {
                Ok(observed) => {
                    *target.write() = observed;
                    tracing::info!(
                        device = %descriptor.name,
                        state = %observed,
                        "Target state reconciled with observed state"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        device = %descriptor.name,
                        error = %e,
                        "Could not reconcile initial target state"
                    );
                }
            }
        });
    }
}

/// Queries and parses the sensor reading for `descriptor`.
async fn read_sensor<P: Protocol + ?Sized>(
    protocol: &P,
    descriptor: &DeviceDescriptor,
) -> Result<SensorReading, Error> {
    let command = Command::sensor_query(descriptor.output);
    let response = protocol
        .send_command(&command)
        .await
        .map_err(Error::Protocol)?;
    let reading = response.reading().map_err(Error::Parse)?;
    tracing::debug!(
        device = %descriptor.name,
        current = reading.current,
        min = reading.min,
        max = reading.max,
        "Sensor reading"
    );
    Ok(reading)
}

/// Queries the box and interprets the reading for `descriptor`.
async fn read_door_state<P: Protocol + ?Sized>(
    protocol: &P,
    descriptor: &DeviceDescriptor,
) -> Result<DoorState, Error> {
    let reading = read_sensor(protocol, descriptor).await?;
    Ok(DoorState::from_reading(reading, descriptor.open_threshold))
}

// ========== TCP Device Entry Point ==========

impl Device<TcpClient> {
    /// Creates a builder for a device queried over the pooled TCP
    /// transport.
    ///
    /// All devices sharing a box must be built against the same pool.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use bwise_lib::protocol::ConnectionPool;
    /// use bwise_lib::types::{DeviceAddress, DeviceDescriptor, OutputIndex};
    /// use bwise_lib::Device;
    ///
    /// let pool = Arc::new(ConnectionPool::new());
    /// let descriptor = DeviceDescriptor::new(
    ///     "Garage Door",
    ///     DeviceAddress::new("10.0.0.5", 5001, 5002),
    ///     OutputIndex::new(3),
    /// );
    /// let builder = Device::tcp(&pool, descriptor);
    /// ```
    #[must_use]
    pub fn tcp(pool: &Arc<ConnectionPool>, descriptor: DeviceDescriptor) -> TcpDeviceBuilder {
        TcpDeviceBuilder::new(Arc::clone(pool), descriptor)
    }
}

// ========== HTTP Device Entry Point ==========

#[cfg(feature = "http")]
impl Device<HttpClient> {
    /// Creates a builder for a device queried over HTTP.
    ///
    /// Talks to port 80 on the descriptor's host; use
    /// [`Device::http_config`] for a nonstandard port or timeout.
    #[must_use]
    pub fn http(descriptor: DeviceDescriptor) -> HttpDeviceBuilder {
        let config = HttpConfig::new(descriptor.address.host.clone());
        HttpDeviceBuilder::new(descriptor, config)
    }

    /// Creates a builder for a device queried over HTTP with an
    /// explicit configuration.
    #[must_use]
    pub fn http_config(descriptor: DeviceDescriptor, config: HttpConfig) -> HttpDeviceBuilder {
        HttpDeviceBuilder::new(descriptor, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeviceAddress, OutputIndex};

    fn descriptor() -> DeviceDescriptor {
        DeviceDescriptor::new(
            "Garage Door",
            DeviceAddress::new("127.0.0.1", 59998, 59997),
            OutputIndex::new(3),
        )
    }

    #[tokio::test]
    async fn target_state_defaults_to_closed() {
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, descriptor()).build();
        assert_eq!(device.target_state(), DoorState::Closed);
    }

    #[tokio::test]
    async fn obstruction_is_never_detected() {
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, descriptor()).build();
        assert!(!device.obstruction_detected());
    }

    #[tokio::test]
    async fn device_exposes_descriptor() {
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, descriptor()).build();
        assert_eq!(device.name(), "Garage Door");
        assert_eq!(device.descriptor().output, OutputIndex::new(3));
    }
}
