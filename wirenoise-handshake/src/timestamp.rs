//! TAI64N timestamps carried as the message 1 payload.
//!
//! See <https://cr.yp.to/libtai/tai64.html>. The 12-byte encoding is an
//! 8-byte big-endian label (seconds since the Unix epoch plus 2^62)
//! followed by 4 big-endian bytes of nanoseconds. The responder's session
//! layer rejects any timestamp that is not strictly after the last one seen
//! from the same peer; [`Timestamp`] is totally ordered for that check.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;

/// Encoded TAI64N length in bytes.
pub const TIMESTAMP_LEN: usize = 12;

/// TAI64 label of the Unix epoch (2^62).
const TAI64_EPOCH: u64 = 1 << 62;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// A decoded TAI64N timestamp.
///
/// Ordering compares the label first and nanoseconds second, which matches
/// wall-clock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    label: u64,
    nanos: u32,
}

impl Timestamp {
    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Convert a `SystemTime`. Times before the epoch are floored to the
    /// previous whole second.
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => {
                let secs = i64::try_from(since.as_secs()).unwrap_or(i64::MAX);
                Self::from_unix(secs, since.subsec_nanos())
            }
            Err(err) => {
                let before = err.duration();
                let secs = i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
                match before.subsec_nanos() {
                    0 => Self::from_unix(-secs, 0),
                    nanos => Self::from_unix(-secs - 1, NANOS_PER_SEC - nanos),
                }
            }
        }
    }

    /// Build from signed Unix seconds and a nanosecond offset.
    ///
    /// Nanoseconds of a full second or more carry into `secs`.
    pub fn from_unix(secs: i64, nanos: u32) -> Self {
        let carry = i64::from(nanos / NANOS_PER_SEC);
        Self {
            label: TAI64_EPOCH.saturating_add_signed(secs.saturating_add(carry)),
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    /// The 8-byte TAI64 label (Unix seconds plus 2^62).
    pub fn label(&self) -> u64 {
        self.label
    }

    /// Nanoseconds within the second.
    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Encode as 12 bytes: big-endian label then big-endian nanoseconds.
    pub fn encode(&self) -> [u8; TIMESTAMP_LEN] {
        let mut out = [0u8; TIMESTAMP_LEN];
        out[..8].copy_from_slice(&self.label.to_be_bytes());
        out[8..].copy_from_slice(&self.nanos.to_be_bytes());
        out
    }

    /// Decode a 12-byte TAI64N value.
    ///
    /// Fails with [`Error::BadMessage`] on a wrong length and
    /// [`Error::BadTimestamp`] if the nanosecond field is out of range.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: &[u8; TIMESTAMP_LEN] = bytes.try_into().map_err(|_| Error::BadMessage)?;

        let mut label = [0u8; 8];
        label.copy_from_slice(&bytes[..8]);
        let mut nanos = [0u8; 4];
        nanos.copy_from_slice(&bytes[8..]);

        let nanos = u32::from_be_bytes(nanos);
        if nanos >= NANOS_PER_SEC {
            return Err(Error::BadTimestamp);
        }
        Ok(Self {
            label: u64::from_be_bytes(label),
            nanos,
        })
    }

    /// Whether `self` is strictly later than `other`.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self > other
    }
}
