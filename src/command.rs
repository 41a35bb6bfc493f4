// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BitWise command definitions.
//!
//! This module provides the typed vocabulary of `bwc:` commands the
//! library sends to a box. The vocabulary is closed and every argument
//! is numeric, so commands render to the wire without any escaping.
//!
//! # Available Commands
//!
//! | Command | Purpose | Wire form |
//! |---------|---------|-----------|
//! | [`Command::SensorQuery`] | Read an analog input | `bwc:get:ad:<output>:` |
//! | [`Command::Pulse`] | Pulse a relay output | `bwc:set:pulse:2:<output>:<ticks>:` |
//! | [`Command::TcpClose`] | Courtesy teardown of a TCP session | `bwc:tcpclose:` |
//!
//! # Wire Format
//!
//! A command is a colon-joined sequence of verb, subject and arguments
//! with a trailing colon. The TCP and UDP transports append CRLF; the
//! HTTP transport URL-encodes the rendered command instead.
//!
//! # Examples
//!
//! ```
//! use bwise_lib::command::Command;
//! use bwise_lib::types::{OutputIndex, PulseTicks};
//!
//! let query = Command::sensor_query(OutputIndex::new(3));
//! assert_eq!(query.encode(), "bwc:get:ad:3:");
//!
//! let pulse = Command::pulse(OutputIndex::new(2), PulseTicks::default());
//! assert_eq!(pulse.encode(), "bwc:set:pulse:2:2:50:");
//! ```

use std::fmt;

use crate::types::{OutputIndex, PulseTicks};

/// Prefix carried by every command line.
pub const COMMAND_PREFIX: &str = "bwc:";

/// A command understood by a BitWise Controls box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Reads the analog input attached to an output.
    SensorQuery {
        /// Output whose analog input is queried.
        output: OutputIndex,
    },

    /// Pulses a relay output for a number of device ticks.
    ///
    /// The constant `2` in the wire form is the relay output type of
    /// the supported box family.
    Pulse {
        /// Relay output to pulse.
        output: OutputIndex,
        /// Pulse duration in device ticks.
        ticks: PulseTicks,
    },

    /// Asks the box to close the current TCP session.
    ///
    /// Sent by the single-shot TCP client after a successful exchange;
    /// the box does not answer it.
    TcpClose,
}

impl Command {
    /// Creates a sensor query for the given output.
    #[must_use]
    pub const fn sensor_query(output: OutputIndex) -> Self {
        Self::SensorQuery { output }
    }

    /// Creates a relay pulse for the given output and duration.
    #[must_use]
    pub const fn pulse(output: OutputIndex, ticks: PulseTicks) -> Self {
        Self::Pulse { output, ticks }
    }

    /// Creates the courtesy session-close command.
    #[must_use]
    pub const fn tcp_close() -> Self {
        Self::TcpClose
    }

    /// Renders the command into its wire form, without a terminator.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::SensorQuery { output } => format!("{COMMAND_PREFIX}get:ad:{output}:"),
            Self::Pulse { output, ticks } => {
                format!("{COMMAND_PREFIX}set:pulse:2:{output}:{ticks}:")
            }
            Self::TcpClose => format!("{COMMAND_PREFIX}tcpclose:"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}
