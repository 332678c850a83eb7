//! The MessagePack timestamp extension (type id `-1`).
//!
//! Three payload layouts exist; the packer always uses the shortest one that
//! represents the value exactly:
//!
//! | layout        | payload                                  |
//! |---------------|------------------------------------------|
//! | timestamp 32  | `seconds: u32`                           |
//! | timestamp 64  | `nanos: u30` `seconds: u34` in one `u64` |
//! | timestamp 96  | `nanos: u32` `seconds: i64`              |

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::MsgPackError;

const NANOS_PER_SECOND: u32 = 1_000_000_000;
const SECONDS_34_BIT_MASK: u64 = 0x0000_0003_ffff_ffff;

/// Seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    seconds: i64,
    nanos: u32,
}

impl Timestamp {
    /// Creates a timestamp, carrying whole seconds out of `nanos`.
    pub fn new(seconds: i64, nanos: u32) -> Self {
        let carry = (nanos / NANOS_PER_SECOND) as i64;
        Self {
            seconds: seconds.saturating_add(carry),
            nanos: nanos % NANOS_PER_SECOND,
        }
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Always below one second.
    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Encodes the shortest payload layout for this timestamp.
    pub fn to_ext_payload(&self) -> Vec<u8> {
        if self.seconds >= 0 && (self.seconds as u64) >> 34 == 0 {
            let seconds = self.seconds as u64;
            if self.nanos == 0 && seconds <= u32::MAX as u64 {
                return (seconds as u32).to_be_bytes().to_vec();
            }
            let data64 = ((self.nanos as u64) << 34) | seconds;
            return data64.to_be_bytes().to_vec();
        }
        let mut out = Vec::with_capacity(12);
        out.extend_from_slice(&self.nanos.to_be_bytes());
        out.extend_from_slice(&self.seconds.to_be_bytes());
        out
    }

    /// Decodes any of the three payload layouts.
    pub fn from_ext_payload(data: &[u8]) -> Result<Self, MsgPackError> {
        let invalid = || MsgPackError::InvalidTimestamp { len: data.len() };
        let ts = match data.len() {
            4 => {
                let seconds = u32::from_be_bytes(data.try_into().map_err(|_| invalid())?);
                Timestamp::from_seconds(seconds as i64)
            }
            8 => {
                let data64 = u64::from_be_bytes(data.try_into().map_err(|_| invalid())?);
                Timestamp {
                    seconds: (data64 & SECONDS_34_BIT_MASK) as i64,
                    nanos: (data64 >> 34) as u32,
                }
            }
            12 => {
                let nanos = u32::from_be_bytes(data[..4].try_into().map_err(|_| invalid())?);
                let seconds = i64::from_be_bytes(data[4..].try_into().map_err(|_| invalid())?);
                Timestamp { seconds, nanos }
            }
            _ => return Err(invalid()),
        };
        if ts.nanos >= NANOS_PER_SECOND {
            return Err(invalid());
        }
        Ok(ts)
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos)
    }

    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos() % NANOS_PER_SECOND,
        }
    }

    /// Canonical RFC 3339 UTC rendering, e.g. `2024-05-01T12:30:00.250Z`.
    ///
    /// Timestamps outside the calendar range fall back to `@seconds.nanos`.
    pub fn to_rfc3339(&self) -> String {
        match self.to_datetime() {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            None => format!("@{}.{:09}", self.seconds, self.nanos),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}
