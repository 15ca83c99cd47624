//! Scalar conversions used when turning raw records into features:
//! IPv4 packing and lenient timestamp parsing.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::net::Ipv4Addr;

/// Naive formats tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Pack a dotted-quad IPv4 address into its big-endian `u32` value.
///
/// ```
/// use fraud_detection_service::convert::ip_to_int;
/// assert_eq!(ip_to_int("192.168.1.1").unwrap(), 3_232_235_777);
/// ```
pub fn ip_to_int(ip: &str) -> Result<u32> {
    let addr: Ipv4Addr = ip
        .trim()
        .parse()
        .map_err(|_| Error::invalid_input(format!("malformed IPv4 address `{ip}`")))?;
    Ok(u32::from(addr))
}

/// Inverse of [`ip_to_int`].
pub fn int_to_ip(value: u32) -> String {
    Ipv4Addr::from(value).to_string()
}

/// Parse a timestamp into a wall-clock `NaiveDateTime`.
///
/// Offset-carrying RFC 3339 values keep their local wall-clock time, so the
/// hour of `2015-04-18T02:47:11+05:00` is 2. A bare date parses as midnight.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Error::invalid_input(format!("unparsable timestamp `{raw}`")))
}
