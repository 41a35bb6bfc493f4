// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for addressing BitWise Controls boxes.
//!
//! This module provides the device descriptor handed in by the host
//! application together with the small newtypes used throughout the
//! command vocabulary: output indices, pulse durations and the analog
//! threshold that separates an open door from a closed one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a relay output or analog input on the box.
///
/// Outputs are small 0-based integers; the valid range depends on the
/// box model and is not checked here.
///
/// # Examples
///
/// ```
/// use bwise_lib::types::OutputIndex;
///
/// let output = OutputIndex::new(3);
/// assert_eq!(output.value(), 3);
/// assert_eq!(output.to_string(), "3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputIndex(u8);

impl OutputIndex {
    /// Creates a new output index.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Returns the numeric value of the index.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for OutputIndex {
    fn from(index: u8) -> Self {
        Self(index)
    }
}

impl fmt::Display for OutputIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Duration of a relay pulse, in device ticks.
///
/// The unit is defined by the box firmware; the conventional value for
/// actuating a door opener is 50 ticks.
///
/// # Examples
///
/// ```
/// use bwise_lib::types::PulseTicks;
///
/// assert_eq!(PulseTicks::default().value(), 50);
/// assert_eq!(PulseTicks::new(100).value(), 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PulseTicks(u16);

impl PulseTicks {
    /// The conventional pulse duration for door actuation.
    pub const DEFAULT: Self = Self(50);

    /// Creates a pulse duration from a raw tick count.
    #[must_use]
    pub const fn new(ticks: u16) -> Self {
        Self(ticks)
    }

    /// Returns the tick count.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.0
    }
}

impl Default for PulseTicks {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for PulseTicks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Analog threshold separating an open door from a closed one.
///
/// A sensor reading whose maximum value is greater than or equal to the
/// threshold means the door is open; the boundary itself counts as open.
///
/// # Examples
///
/// ```
/// use bwise_lib::types::Threshold;
///
/// assert_eq!(Threshold::default().value(), 200);
/// assert_eq!(Threshold::new(150).value(), 150);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Threshold(u16);

impl Threshold {
    /// The calibration default for the supported hardware.
    pub const DEFAULT: Self = Self(200);

    /// Creates a threshold from a raw analog value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the raw analog value.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network address of a box.
///
/// TCP and UDP use their respective ports; the HTTP transport talks to
/// port 80 on `host` unless the host string itself carries a `:port`
/// suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    /// Hostname or IP address of the box.
    pub host: String,
    /// Port for the persistent TCP command channel.
    pub tcp_port: u16,
    /// Port for fire-and-forget UDP commands.
    pub udp_port: u16,
}

impl DeviceAddress {
    /// Creates a new device address.
    pub fn new(host: impl Into<String>, tcp_port: u16, udp_port: u16) -> Self {
        Self {
            host: host.into(),
            tcp_port,
            udp_port,
        }
    }
}

/// Static description of one controlled mechanism on a box.
///
/// Descriptors are immutable for the lifetime of a device instance and
/// are usually deserialized from the host application's configuration.
/// A missing `open_threshold` falls back to the calibration default of
/// 200.
///
/// # Examples
///
/// ```
/// use bwise_lib::types::{DeviceAddress, DeviceDescriptor, OutputIndex, Threshold};
///
/// let descriptor = DeviceDescriptor::new(
///     "Garage Door",
///     DeviceAddress::new("10.0.0.5", 5001, 5002),
///     OutputIndex::new(3),
/// );
/// assert_eq!(descriptor.open_threshold, Threshold::DEFAULT);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Human-readable device name, used for logging only.
    pub name: String,
    /// Network address of the box the mechanism is wired to.
    pub address: DeviceAddress,
    /// Output the mechanism's sensor and relay are attached to.
    pub output: OutputIndex,
    /// Analog threshold for the open/closed decision.
    #[serde(default)]
    pub open_threshold: Threshold,
}

impl DeviceDescriptor {
    /// Creates a descriptor with the default open threshold.
    pub fn new(name: impl Into<String>, address: DeviceAddress, output: OutputIndex) -> Self {
        Self {
            name: name.into(),
            address,
            output,
            open_threshold: Threshold::DEFAULT,
        }
    }

    /// Replaces the open threshold with a device-specific calibration.
    #[must_use]
    pub const fn with_open_threshold(mut self, threshold: Threshold) -> Self {
        self.open_threshold = threshold;
        self
    }
}
