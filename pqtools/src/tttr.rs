//! Running state shared by a record decoder across one stream

use crate::{Error, Result};

/// Time-tagged time-resolved stream context.
///
/// `origin` counts ticks (T2) or sync pulses (T3) contributed by overflow
/// records so far. It only ever grows within a stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Tttr {
    /// Channel reported for sync events in T2 streams
    pub sync_channel: u32,
    pub origin: u64,
    /// Number of overflow records seen
    pub overflows: u64,
    /// Ticks (or pulses) added to `origin` per counter wrap
    pub overflow_increment: u64,
    /// Hz
    pub sync_rate: u32,
    /// Seconds per tick
    pub resolution_float: f64,
    /// Picoseconds per tick, truncated
    pub resolution_int: u64,
}

impl Tttr {
    pub fn new(
        sync_channel: u32,
        overflow_increment: u64,
        sync_rate: u32,
        resolution_float: f64,
    ) -> Self {
        Tttr {
            sync_channel,
            origin: 0,
            overflows: 0,
            overflow_increment,
            sync_rate,
            resolution_float,
            resolution_int: resolution_int(resolution_float),
        }
    }

    /// Account for one overflow record worth `wraps` counter wraps.
    #[inline]
    pub fn overflow(&mut self, wraps: u64) {
        self.overflows += 1;
        self.origin = self
            .origin
            .saturating_add(wraps.saturating_mul(self.overflow_increment));
    }

    /// Absolute position of a raw counter value
    #[inline]
    pub fn absolute(&self, raw: u64) -> u64 {
        self.origin.saturating_add(raw)
    }

    pub fn resolution_ps(&self) -> f64 {
        self.resolution_float * crate::PS_PER_S
    }

    /// Fail unless the sync rate can be used to convert pulses to time.
    pub fn require_sync_rate(&self) -> Result<()> {
        if self.sync_rate == 0 {
            return Err(Error::Options(String::from(
                "conversion to t2 requires a positive sync rate",
            )));
        }
        Ok(())
    }

    /// Time in picoseconds of the start of sync pulse `pulse`:
    /// `floor(pulse * 1e12 / sync_rate)`, computed exactly.
    ///
    /// Callers check [`Tttr::require_sync_rate`] first; a zero rate maps
    /// every pulse to `u64::MAX`.
    #[inline]
    pub fn pulse_to_time(&self, pulse: u64) -> u64 {
        if self.sync_rate == 0 {
            return u64::MAX;
        }
        let ps = pulse as u128 * 1_000_000_000_000u128 / self.sync_rate as u128;
        u64::try_from(ps).unwrap_or(u64::MAX)
    }
}

/// Whole picoseconds per tick: `floor(|seconds * 1e12|)`, never rounded.
pub fn resolution_int(seconds: f64) -> u64 {
    (seconds * crate::PS_PER_S).abs().floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_accumulates_running_sum() {
        let mut tttr = Tttr::new(0, 1024, 0, 1e-12);
        let mut seen = vec![tttr.origin];
        for f in [1, 2] {
            tttr.overflow(f);
            seen.push(tttr.origin);
        }
        assert_eq!(seen, vec![0, 1024, 3072]);
        assert_eq!(tttr.overflows, 2);
    }

    #[test]
    fn resolution_truncates() {
        assert_eq!(resolution_int(4e-12), 4);
        assert_eq!(resolution_int(36.6e-12), 36);
        assert_eq!(resolution_int(-8e-12), 8);
        assert_eq!(resolution_int(0.5e-12), 0);
    }

    #[test]
    fn resolution_in_picoseconds() {
        let tttr = Tttr::new(0, 0, 0, 36.6e-12);
        assert!((tttr.resolution_ps() - 36.6).abs() < 1e-9);
        assert_eq!(tttr.resolution_int, 36);
    }

    #[test]
    fn pulse_conversion_is_exact() {
        let tttr = Tttr::new(0, 0, 1_000_000, 1e-12);
        assert_eq!(tttr.pulse_to_time(4), 4_000_000);
        let tttr = Tttr::new(0, 0, 3, 1e-12);
        // 1e12 / 3 = 333333333333.33..
        assert_eq!(tttr.pulse_to_time(1), 333_333_333_333);
        assert_eq!(tttr.pulse_to_time(3), 1_000_000_000_000);
        for _ in 0..3 {
            assert_eq!(tttr.pulse_to_time(u32::MAX as u64), tttr.pulse_to_time(u32::MAX as u64));
        }
    }

    #[test]
    fn zero_sync_rate_is_rejected() {
        let tttr = Tttr::new(0, 0, 0, 1e-12);
        assert!(matches!(tttr.require_sync_rate(), Err(Error::Options(_))));
    }
}
