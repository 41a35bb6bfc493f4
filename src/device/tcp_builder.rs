// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TCP device builder.

use std::sync::Arc;

use crate::device::{Device, TriggerPath};
use crate::protocol::{ConnectionPool, TcpClient, UdpClient};
use crate::types::{DeviceDescriptor, PulseTicks};

/// Builder for devices queried over the pooled TCP transport.
///
/// Created via [`Device::tcp`]. Triggers default to fire-and-forget
/// UDP; call [`with_acknowledged_trigger`](Self::with_acknowledged_trigger)
/// to pulse over the TCP session instead and wait for the box's
/// acknowledgment.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use bwise_lib::protocol::ConnectionPool;
/// use bwise_lib::types::{DeviceAddress, DeviceDescriptor, OutputIndex, PulseTicks};
/// use bwise_lib::Device;
///
/// # async fn example() {
/// let pool = Arc::new(ConnectionPool::new());
/// let descriptor = DeviceDescriptor::new(
///     "Garage Door",
///     DeviceAddress::new("10.0.0.5", 5001, 5002),
///     OutputIndex::new(3),
/// );
///
/// let device = Device::tcp(&pool, descriptor)
///     .with_pulse_ticks(PulseTicks::new(75))
///     .build();
/// # }
/// ```
#[derive(Debug)]
pub struct TcpDeviceBuilder {
    pool: Arc<ConnectionPool>,
    descriptor: DeviceDescriptor,
    pulse_ticks: PulseTicks,
    acknowledged_trigger: bool,
}

impl TcpDeviceBuilder {
    /// Creates a new builder against the given pool.
    pub(crate) fn new(pool: Arc<ConnectionPool>, descriptor: DeviceDescriptor) -> Self {
        Self {
            pool,
            descriptor,
            pulse_ticks: PulseTicks::default(),
            acknowledged_trigger: false,
        }
    }

    /// Sets the relay pulse duration.
    #[must_use]
    pub const fn with_pulse_ticks(mut self, ticks: PulseTicks) -> Self {
        self.pulse_ticks = ticks;
        self
    }

    /// Routes pulses over the pooled TCP session instead of UDP.
    ///
    /// The pulse then waits for the box's `bwr:` acknowledgment and
    /// reports delivery failures, at the cost of latency.
    #[must_use]
    pub const fn with_acknowledged_trigger(mut self) -> Self {
        self.acknowledged_trigger = true;
        self
    }

    /// Builds the device and starts its startup reconciliation task.
    ///
    /// No I/O happens here; the pooled connection is dialed on the
    /// first exchange. Must be called from within a Tokio runtime.
    #[must_use]
    pub fn build(self) -> Device<TcpClient> {
        let client = TcpClient::new(self.pool, self.descriptor.address.clone());
        let trigger = if self.acknowledged_trigger {
            TriggerPath::Acknowledged
        } else {
            TriggerPath::Udp(UdpClient::new(self.descriptor.address.clone()))
        };

        let device = Device::new(client, self.descriptor, trigger, self.pulse_ticks);
        device.start_target_reconcile();
        device
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
    async fn builder_defaults_to_udp_trigger() {
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, descriptor()).build();
        assert!(matches!(device.trigger, TriggerPath::Udp(_)));
        assert_eq!(device.pulse_ticks, PulseTicks::default());
    }

    #[tokio::test]
    async fn builder_options_are_applied() {
        let pool = Arc::new(ConnectionPool::new());
        let device = Device::tcp(&pool, descriptor())
            .with_pulse_ticks(PulseTicks::new(75))
            .with_acknowledged_trigger()
            .build();
        assert!(matches!(device.trigger, TriggerPath::Acknowledged));
        assert_eq!(device.pulse_ticks, PulseTicks::new(75));
    }
}
