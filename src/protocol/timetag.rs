//! NTP-style timetag carried by bundles and `t` arguments.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch.
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// 64-bit fixed point timestamp: upper 32 bits seconds since 1900, lower 32 bits fraction.
///
/// The value is stored and transmitted as-is; nothing in this crate schedules
/// work by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timetag(pub u64);

impl Timetag {
    /// The special value meaning "execute immediately".
    pub const IMMEDIATELY: Timetag = Timetag(1);

    /// Build from whole seconds and a 1/2^32 fraction.
    pub fn from_parts(seconds: u32, fraction: u32) -> Self {
        Self(((seconds as u64) << 32) | fraction as u64)
    }

    /// Whole seconds since 1900-01-01.
    #[inline]
    pub fn seconds(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Fractional part in units of 1/2^32 seconds.
    #[inline]
    pub fn fraction(&self) -> u32 {
        self.0 as u32
    }

    /// Convert a wall clock time. Times before 1970 saturate to the Unix epoch.
    pub fn from_system_time(time: SystemTime) -> Self {
        let since_unix = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        let seconds = since_unix.as_secs() + NTP_UNIX_OFFSET;
        let fraction = ((since_unix.subsec_nanos() as u64) << 32) / 1_000_000_000;
        Self::from_parts(seconds as u32, fraction as u32)
    }

    /// Convert back to wall clock time. Values before 1970 map to the Unix epoch.
    pub fn to_system_time(&self) -> SystemTime {
        let seconds = (self.seconds() as u64).saturating_sub(NTP_UNIX_OFFSET);
        let nanos = ((self.fraction() as u64) * 1_000_000_000) >> 32;
        UNIX_EPOCH + Duration::new(seconds, nanos as u32)
    }
}

impl From<u64> for Timetag {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Timetag> for u64 {
    fn from(value: Timetag) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts() {
        let tag = Timetag::from_parts(0x0102_0304, 0x0506_0708);
        assert_eq!(tag.0, 0x0102_0304_0506_0708);
        assert_eq!(tag.seconds(), 0x0102_0304);
        assert_eq!(tag.fraction(), 0x0506_0708);
    }

    #[test]
    fn test_immediately() {
        assert_eq!(Timetag::IMMEDIATELY.seconds(), 0);
        assert_eq!(Timetag::IMMEDIATELY.fraction(), 1);
    }

    #[test]
    fn test_unix_epoch_maps_to_ntp_offset() {
        let tag = Timetag::from_system_time(UNIX_EPOCH);
        assert_eq!(tag.seconds() as u64, NTP_UNIX_OFFSET);
        assert_eq!(tag.fraction(), 0);
        assert_eq!(tag.to_system_time(), UNIX_EPOCH);
    }

    #[test]
    fn test_system_time_conversion_keeps_millisecond_precision() {
        let time = UNIX_EPOCH + Duration::from_millis(1_700_000_000_250);
        let back = Timetag::from_system_time(time).to_system_time();
        let drift = back
            .duration_since(time)
            .unwrap_or_else(|e| e.duration());
        assert!(drift < Duration::from_micros(1));
    }
}
