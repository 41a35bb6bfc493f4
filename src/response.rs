// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response parsing for BitWise `bwr:` lines.
//!
//! A box answers commands with colon-joined text lines prefixed `bwr:`.
//! For an analog sensor query the line echoes the command subject and
//! then carries the measurement triple:
//!
//! ```text
//! bwr:ad:<output>:<status>:<current>:<min>:<max>:
//! ```
//!
//! Fields 0 through 3 are echo and status fields this library ignores;
//! fields 4 through 6 are the current value and the minimum and maximum
//! seen since the previous query.

use crate::error::ParseError;

/// Prefix carried by every response line.
pub const RESPONSE_PREFIX: &str = "bwr:";

/// Prefix the box uses to reject a command over HTTP.
pub const NAK_PREFIX: &str = "NAK:";

/// Number of colon-separated fields a sensor response must carry.
const SENSOR_FIELDS: usize = 7;

/// One analog measurement triple from a sensor query.
///
/// # Examples
///
/// ```
/// use bwise_lib::response::SensorReading;
///
/// let reading = SensorReading::parse("bwr:ad:3:0:10:0:160:").unwrap();
/// assert_eq!(reading.current, 10);
/// assert_eq!(reading.min, 0);
/// assert_eq!(reading.max, 160);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorReading {
    /// Value at the moment the query was answered.
    pub current: i64,
    /// Lowest value observed since the previous query.
    pub min: i64,
    /// Highest value observed since the previous query.
    pub max: i64,
}

impl SensorReading {
    /// Parses the measurement triple out of a sensor response line.
    ///
    /// Trailing fields beyond the triple are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::TooShort`] if the line carries fewer than
    /// seven fields and [`ParseError::InvalidValue`] if a measurement
    /// field is not a decimal integer.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = line.trim_end().split(':').collect();
        if fields.len() < SENSOR_FIELDS {
            return Err(ParseError::TooShort {
                expected: SENSOR_FIELDS,
                actual: fields.len(),
            });
        }
        Ok(Self {
            current: parse_field(fields[4], "current")?,
            min: parse_field(fields[5], "min")?,
            max: parse_field(fields[6], "max")?,
        })
    }
}

fn parse_field(raw: &str, field: &str) -> Result<i64, ParseError> {
    raw.parse().map_err(|e: std::num::ParseIntError| {
        ParseError::InvalidValue {
            field: field.to_string(),
            message: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sensor_triple() {
        let reading = SensorReading::parse("bwr:ad:3:0:10:0:160:").unwrap();
        assert_eq!(
            reading,
            SensorReading {
                current: 10,
                min: 0,
                max: 160,
            }
        );
    }

    #[test]
    fn parses_with_crlf_terminator() {
        let reading = SensorReading::parse("bwr:ad:2:0:199:0:200:\r\n").unwrap();
        assert_eq!(reading.max, 200);
    }

    #[test]
    fn ignores_trailing_fields() {
        let reading = SensorReading::parse("bwr:ad:3:0:10:0:160:77:extra:").unwrap();
        assert_eq!(reading.max, 160);
    }

    #[test]
    fn accepts_negative_values() {
        let reading = SensorReading::parse("bwr:ad:0:0:-5:-10:12:").unwrap();
        assert_eq!(reading.current, -5);
        assert_eq!(reading.min, -10);
    }

    #[test]
    fn rejects_short_line() {
        let err = SensorReading::parse("bwr:ad:3:").unwrap_err();
        assert!(matches!(
            err,
            ParseError::TooShort {
                expected: 7,
                actual: 4,
            }
        ));
    }

    #[test]
    fn rejects_non_numeric_field() {
        let err = SensorReading::parse("bwr:ad:3:0:10:0:high:").unwrap_err();
        match err {
            ParseError::InvalidValue { field, .. } => assert_eq!(field, "max"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
