// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logical door state derived from analog sensor readings.
//!
//! The box reports a raw measurement triple, not a position. The door
//! sensor pulls the analog input high while the door is open, so the
//! maximum value seen since the last query decides the state: at or
//! above the threshold the door counts as open, strictly below as
//! closed. Using the maximum rather than the instantaneous value keeps
//! a door that bounced during the polling interval visible as open.

use std::fmt;

use crate::response::SensorReading;
use crate::types::Threshold;

/// Position of the door, as far as the sensor can tell.
///
/// Also used for the commanded target state; a door only ever moves
/// toward `Open` or `Closed`.
///
/// # Examples
///
/// ```
/// use bwise_lib::response::SensorReading;
/// use bwise_lib::state::DoorState;
/// use bwise_lib::types::Threshold;
///
/// let reading = SensorReading::parse("bwr:ad:3:0:10:0:160:").unwrap();
/// let state = DoorState::from_reading(reading, Threshold::new(150));
/// assert_eq!(state, DoorState::Open);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorState {
    /// The sensor saw the door off its closed position.
    Open,
    /// The sensor saw the door closed for the whole interval.
    Closed,
}

impl DoorState {
    /// Interprets a sensor reading against the open threshold.
    ///
    /// The boundary counts as open.
    #[must_use]
    pub fn from_reading(reading: SensorReading, threshold: Threshold) -> Self {
        if reading.max >= i64::from(threshold.value()) {
            Self::Open
        } else {
            Self::Closed
        }
    }

    /// Returns the lowercase name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    /// Returns `true` for [`DoorState::Open`].
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(max: i64) -> SensorReading {
        SensorReading {
            current: 0,
            min: 0,
            max,
        }
    }

    #[test]
    fn boundary_counts_as_open() {
        assert_eq!(
            DoorState::from_reading(reading(200), Threshold::default()),
            DoorState::Open
        );
        assert_eq!(
            DoorState::from_reading(reading(199), Threshold::default()),
            DoorState::Closed
        );
    }

    #[test]
    fn custom_threshold() {
        let threshold = Threshold::new(150);
        assert_eq!(
            DoorState::from_reading(reading(160), threshold),
            DoorState::Open
        );
        assert_eq!(
            DoorState::from_reading(reading(150), threshold),
            DoorState::Open
        );
        assert_eq!(
            DoorState::from_reading(reading(149), threshold),
            DoorState::Closed
        );
    }

    #[test]
    fn negative_reading_is_closed() {
        assert_eq!(
            DoorState::from_reading(reading(-1), Threshold::default()),
            DoorState::Closed
        );
    }

    #[test]
    fn wire_line_to_door_state() {
        let reading = SensorReading::parse("bwr:ad:3:0:10:0:160:").unwrap();
        assert_eq!(
            DoorState::from_reading(reading, Threshold::new(150)),
            DoorState::Open
        );
        assert_eq!(
            DoorState::from_reading(reading, Threshold::default()),
            DoorState::Closed
        );
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(DoorState::Open.to_string(), "open");
        assert_eq!(DoorState::Closed.to_string(), "closed");
    }
}
