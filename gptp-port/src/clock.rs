//! The system clock / servo collaborator (spec §6), owned outside the core.

use crate::identity::ClockIdentity;
use crate::time::Timestamp;

/// Unknown-grandmaster sentinel values (spec §6, used by `becomeSlave` when
/// `externalPortConfiguration` is enabled).
pub const UNKNOWN_CLOCK_CLASS: u8 = 248;
pub const UNKNOWN_CLOCK_ACCURACY: u8 = 0xFE;
pub const UNKNOWN_OFFSET_SCALED_LOG_VARIANCE: u16 = 0x4100;

/// `clockQuality` as carried in Announce messages and the grandmaster fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockQuality {
    pub clock_class: u8,
    pub clock_accuracy: u8,
    pub offset_scaled_log_variance: u16,
}

impl ClockQuality {
    pub const UNKNOWN: ClockQuality = ClockQuality {
        clock_class: UNKNOWN_CLOCK_CLASS,
        clock_accuracy: UNKNOWN_CLOCK_ACCURACY,
        offset_scaled_log_variance: UNKNOWN_OFFSET_SCALED_LOG_VARIANCE,
    };
}

/// The rate-ratio/origin information a FollowUp message attaches to the
/// Sync it completes. Opaque to the port: it is fetched from the clock,
/// carried unmodified through the message, and consumed by the peer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowUpInfo {
    pub rate_ratio: f64,
    pub gm_time_base_indicator: u16,
}

impl Default for FollowUpInfo {
    fn default() -> Self {
        Self {
            rate_ratio: 1.0,
            gm_time_base_indicator: 0,
        }
    }
}

/// The system clock / servo: owns grandmaster state and syntonization.
/// Implementations are expected to be internally synchronized, since the
/// port calls into a shared instance from multiple worker threads.
pub trait Clock: Send + Sync {
    fn clock_identity(&self) -> ClockIdentity;
    fn priority1(&self) -> u8;
    fn priority2(&self) -> u8;
    fn clock_quality(&self) -> ClockQuality;

    fn set_grandmaster_clock_identity(&self, identity: ClockIdentity);
    fn set_grandmaster_priority1(&self, priority1: u8);
    fn set_grandmaster_priority2(&self, priority2: u8);
    fn set_grandmaster_clock_quality(&self, quality: ClockQuality);

    fn fup_info(&self) -> FollowUpInfo;
    fn update_fup_info(&self);
    fn new_syntonization_set_point(&self);

    fn system_time(&self) -> Timestamp;
}
