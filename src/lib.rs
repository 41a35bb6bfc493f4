// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `BWise` Lib - A Rust library to control BitWise Controls relay boxes.
//!
//! This library provides async APIs to drive mechanisms wired to a
//! BitWise box, typically garage doors and momentary switches, over the
//! box's `bwc:`/`bwr:` text protocol via TCP, UDP and HTTP.
//!
//! # Supported Features
//!
//! - **Door state**: Analog sensor queries interpreted against a
//!   calibration threshold, plus a debounced target state
//! - **Relay triggers**: Fire-and-forget UDP pulses or acknowledged
//!   pulses over the query transport
//! - **Connection pooling**: One shared TCP session per box, with
//!   transparent reconnection and stale-data draining
//! - **HTTP transport**: The box's `/bwc.xml` endpoint, including NAK
//!   rejection handling
//!
//! # Quick Start
//!
//! ## Pooled TCP Device
//!
//! ```no_run
//! use std::sync::Arc;
//! use bwise_lib::protocol::ConnectionPool;
//! use bwise_lib::types::{DeviceAddress, DeviceDescriptor, OutputIndex};
//! use bwise_lib::{Device, DoorState};
//!
//! #[tokio::main]
//! async fn main() -> bwise_lib::Result<()> {
//!     // One pool per process; devices on the same box share a session.
//!     let pool = Arc::new(ConnectionPool::new());
//!
//!     let descriptor = DeviceDescriptor::new(
//!         "Garage Door",
//!         DeviceAddress::new("10.0.0.5", 5001, 5002),
//!         OutputIndex::new(3),
//!     );
//!     let device = Device::tcp(&pool, descriptor).build();
//!
//!     if device.door_state().await? == DoorState::Closed {
//!         device.open().await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## HTTP Device
//!
//! ```no_run
//! use bwise_lib::types::{DeviceAddress, DeviceDescriptor, OutputIndex};
//! use bwise_lib::Device;
//!
//! #[tokio::main]
//! async fn main() -> bwise_lib::Result<()> {
//!     let descriptor = DeviceDescriptor::new(
//!         "Wall Button",
//!         DeviceAddress::new("10.0.0.6", 5001, 5002),
//!         OutputIndex::new(1),
//!     );
//!     let device = Device::http(descriptor).build()?;
//!
//!     // Momentary-switch semantics: every pulse toggles the relay.
//!     device.pulse().await?;
//!     Ok(())
//! }
//! ```

pub mod command;
mod device;
pub mod error;
pub mod protocol;
pub mod response;
pub mod state;
pub mod types;

pub use command::Command;
#[cfg(feature = "http")]
pub use device::HttpDeviceBuilder;
pub use device::{Device, TcpDeviceBuilder};
pub use error::{Error, ParseError, ProtocolError, Result};
#[cfg(feature = "http")]
pub use protocol::{HttpClient, HttpConfig};
pub use protocol::{
    CommandResponse, ConnectionPool, OneShotTcpClient, Protocol, TcpClient, TcpConfig, UdpClient,
};
pub use response::SensorReading;
pub use state::DoorState;
pub use types::{DeviceAddress, DeviceDescriptor, OutputIndex, PulseTicks, Threshold};
