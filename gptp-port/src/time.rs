//! Time representation used throughout the port engine.
//!
//! Timestamps are nanoseconds-since-epoch rather than [`std::time::Instant`]
//! so that they can be subtracted (PHY compensation), compared across the
//! wire, and carry the `PDELAY_PENDING_TIMESTAMP` sentinel from spec §6.

use core::ops::{Add, Sub};

/// A point in time, expressed in nanoseconds. Negative values only occur
/// transiently while subtracting PHY compensation close to the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    /// Sentinel written into an outbound PdelayReq's timestamp field before
    /// it has actually been timestamped by the transport.
    pub const PDELAY_PENDING: Timestamp = Timestamp(i64::MAX);

    pub fn from_nanos(nanos: i64) -> Self {
        Timestamp(nanos)
    }

    pub fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn is_pending(self) -> bool {
        self == Self::PDELAY_PENDING
    }
}

impl Add<core::time::Duration> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: core::time::Duration) -> Timestamp {
        Timestamp(self.0 + rhs.as_nanos() as i64)
    }
}

impl Sub<core::time::Duration> for Timestamp {
    type Output = Timestamp;
    fn sub(self, rhs: core::time::Duration) -> Timestamp {
        Timestamp(self.0 - rhs.as_nanos() as i64)
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = i64;
    fn sub(self, rhs: Timestamp) -> i64 {
        self.0 - rhs.0
    }
}

/// Minimum schedulable timer duration (spec §5, §8): all timer arm calls are
/// clamped up to at least this value. 4 ms, matching the boundary scenario
/// in spec §8 ("log_min_mean_pdelay_req_interval = -8 => floored to 4 ms").
pub const EVENT_TIMER_GRANULARITY: core::time::Duration = core::time::Duration::from_millis(4);

/// Clamp a requested timer duration up to [`EVENT_TIMER_GRANULARITY`].
pub fn clamp_to_granularity(duration: core::time::Duration) -> core::time::Duration {
    duration.max(EVENT_TIMER_GRANULARITY)
}

/// A log2-seconds message interval, as carried in PortDS (logSyncInterval,
/// logAnnounceInterval, logMinMeanPdelayReqInterval).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogInterval(i8);

impl LogInterval {
    pub const fn from_log_2(log_2: i8) -> Self {
        Self(log_2)
    }

    pub fn as_log_2(self) -> i8 {
        self.0
    }

    /// Duration represented by this interval, before granularity clamping.
    pub fn as_duration(self) -> core::time::Duration {
        if self.0 >= 0 {
            core::time::Duration::from_secs(1u64 << self.0)
        } else {
            let denom = 1u64 << (-self.0 as u32);
            core::time::Duration::from_nanos(1_000_000_000 / denom)
        }
    }

    /// Duration clamped to [`EVENT_TIMER_GRANULARITY`], as used whenever an
    /// interval is turned into a timer arm call (spec §4.3, §8).
    pub fn as_clamped_duration(self) -> core::time::Duration {
        clamp_to_granularity(self.as_duration())
    }
}

impl From<i8> for LogInterval {
    fn from(value: i8) -> Self {
        Self::from_log_2(value)
    }
}

/// A requested interval as carried in a Signalling message (spec §4.7): a
/// concrete log2 value, or a request to leave the interval unchanged, or a
/// request to stop sending the associated message entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalRequest {
    Literal(LogInterval),
    NoChange,
    NoSend,
}

impl IntervalRequest {
    pub fn literal(log_2: i8) -> Self {
        IntervalRequest::Literal(LogInterval::from_log_2(log_2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_durations() {
        assert_eq!(
            LogInterval::from_log_2(0).as_duration(),
            core::time::Duration::from_secs(1)
        );
        assert_eq!(
            LogInterval::from_log_2(-3).as_duration(),
            core::time::Duration::from_millis(125)
        );
        assert_eq!(
            LogInterval::from_log_2(-5).as_duration(),
            core::time::Duration::from_micros(31250)
        );
        assert_eq!(
            LogInterval::from_log_2(4).as_duration(),
            core::time::Duration::from_secs(16)
        );
    }

    #[test]
    fn granularity_floor() {
        // -8 => 2^-8 s ~= 3.9 microseconds, far below the 4ms granularity.
        let requested = LogInterval::from_log_2(-8).as_duration();
        assert!(requested < EVENT_TIMER_GRANULARITY);
        assert_eq!(clamp_to_granularity(requested), EVENT_TIMER_GRANULARITY);
    }

    #[test]
    fn pdelay_pending_is_not_a_real_timestamp() {
        assert!(Timestamp::PDELAY_PENDING.is_pending());
        assert!(!Timestamp::ZERO.is_pending());
    }
}
