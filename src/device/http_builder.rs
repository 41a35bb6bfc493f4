// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP device builder.

use crate::device::{Device, TriggerPath};
use crate::error::Error;
use crate::protocol::{HttpClient, HttpConfig, UdpClient};
use crate::types::{DeviceDescriptor, PulseTicks};

/// Builder for devices queried over HTTP.
///
/// Created via [`Device::http`] (port 80 on the descriptor's host) or
/// [`Device::http_config`] (explicit port and timeout). Triggers
/// default to fire-and-forget UDP; call
/// [`with_acknowledged_trigger`](Self::with_acknowledged_trigger) to
/// pulse through the HTTP endpoint instead.
///
/// # Examples
///
/// ```no_run
/// use bwise_lib::types::{DeviceAddress, DeviceDescriptor, OutputIndex};
/// use bwise_lib::Device;
///
/// # async fn example() -> bwise_lib::Result<()> {
/// let descriptor = DeviceDescriptor::new(
///     "Shop Door",
///     DeviceAddress::new("10.0.0.6", 5001, 5002),
///     OutputIndex::new(1),
/// );
///
/// let device = Device::http(descriptor)
///     .with_acknowledged_trigger()
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpDeviceBuilder {
    descriptor: DeviceDescriptor,
    config: HttpConfig,
    pulse_ticks: PulseTicks,
    acknowledged_trigger: bool,
}

impl HttpDeviceBuilder {
    /// Creates a new builder with the given HTTP configuration.
    pub(crate) fn new(descriptor: DeviceDescriptor, config: HttpConfig) -> Self {
        Self {
            descriptor,
            config,
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

    /// Routes pulses through the HTTP endpoint instead of UDP.
    ///
    /// The pulse then waits for the box's acknowledgment inside the
    /// XML envelope and reports rejections, at the cost of latency.
    #[must_use]
    pub const fn with_acknowledged_trigger(mut self) -> Self {
        self.acknowledged_trigger = true;
        self
    }

    /// Builds the device and starts its startup reconciliation task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn build(self) -> Result<Device<HttpClient>, Error> {
        let client = self.config.into_client().map_err(Error::Protocol)?;
        let trigger = if self.acknowledged_trigger {
            TriggerPath::Acknowledged
        } else {
            TriggerPath::Udp(UdpClient::new(self.descriptor.address.clone()))
        };

        let device = Device::new(client, self.descriptor, trigger, self.pulse_ticks);
        device.start_target_reconcile();
        Ok(device)
    }
}
