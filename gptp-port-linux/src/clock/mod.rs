//! The Linux system clock collaborator (`gptp_port::Clock`).
//!
//! Unlike the port engine's own mutable state, the grandmaster fields here
//! are written from the external best-master-clock process while being
//! read from worker threads that build Announce/Sync content, so they sit
//! behind a single `Mutex` rather than being owned by a single thread.

use std::sync::Mutex;
use std::time::SystemTime;

use gptp_port::clock::{ClockQuality, FollowUpInfo};
use gptp_port::identity::ClockIdentity;
use gptp_port::time::Timestamp;

struct GrandmasterState {
    grandmaster_identity: ClockIdentity,
    grandmaster_priority1: u8,
    grandmaster_priority2: u8,
    grandmaster_clock_quality: ClockQuality,
    fup_info: FollowUpInfo,
}

pub struct LinuxClock {
    clock_identity: ClockIdentity,
    priority1: u8,
    priority2: u8,
    clock_quality: ClockQuality,
    state: Mutex<GrandmasterState>,
}

impl LinuxClock {
    pub fn new(clock_identity: ClockIdentity, priority1: u8, priority2: u8) -> Self {
        Self {
            clock_identity,
            priority1,
            priority2,
            clock_quality: ClockQuality::UNKNOWN,
            state: Mutex::new(GrandmasterState {
                grandmaster_identity: clock_identity,
                grandmaster_priority1: priority1,
                grandmaster_priority2: priority2,
                grandmaster_clock_quality: ClockQuality::UNKNOWN,
                fup_info: FollowUpInfo::default(),
            }),
        }
    }

    /// Derive a clock identity from an interface's MAC address (EUI-64).
    pub fn from_mac_address(mac: [u8; 6], priority1: u8, priority2: u8) -> Self {
        Self::new(ClockIdentity::from_mac_address(mac), priority1, priority2)
    }
}

impl gptp_port::Clock for LinuxClock {
    fn clock_identity(&self) -> ClockIdentity {
        self.clock_identity
    }

    fn priority1(&self) -> u8 {
        self.priority1
    }

    fn priority2(&self) -> u8 {
        self.priority2
    }

    fn clock_quality(&self) -> ClockQuality {
        self.clock_quality
    }

    fn set_grandmaster_clock_identity(&self, identity: ClockIdentity) {
        self.state.lock().unwrap().grandmaster_identity = identity;
    }

    fn set_grandmaster_priority1(&self, priority1: u8) {
        self.state.lock().unwrap().grandmaster_priority1 = priority1;
    }

    fn set_grandmaster_priority2(&self, priority2: u8) {
        self.state.lock().unwrap().grandmaster_priority2 = priority2;
    }

    fn set_grandmaster_clock_quality(&self, quality: ClockQuality) {
        self.state.lock().unwrap().grandmaster_clock_quality = quality;
    }

    fn fup_info(&self) -> FollowUpInfo {
        self.state.lock().unwrap().fup_info
    }

    fn update_fup_info(&self) {
        // Rate ratio tracking against the grandmaster is the servo's job;
        // this port engine only carries whatever the servo last computed.
        log::trace!("fup_info update requested; servo integration not wired up");
    }

    fn new_syntonization_set_point(&self) {
        log::debug!("syntonization set point reset");
    }

    fn system_time(&self) -> Timestamp {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp::from_nanos(now.as_nanos() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gptp_port::Clock as _;

    #[test]
    fn derives_identity_from_mac() {
        let clock = LinuxClock::from_mac_address([0x02, 0x11, 0x22, 0x33, 0x44, 0x55], 128, 128);
        assert_eq!(
            clock.clock_identity(),
            ClockIdentity::from_mac_address([0x02, 0x11, 0x22, 0x33, 0x44, 0x55])
        );
    }

    #[test]
    fn grandmaster_fields_are_mutable_through_shared_reference() {
        let clock = LinuxClock::new(ClockIdentity::UNKNOWN, 128, 128);
        clock.set_grandmaster_priority1(1);
        assert_eq!(clock.state.lock().unwrap().grandmaster_priority1, 1);
    }

    #[test]
    fn system_time_is_monotonic_increasing_across_calls() {
        let clock = LinuxClock::new(ClockIdentity::UNKNOWN, 128, 128);
        let first = clock.system_time();
        let second = clock.system_time();
        assert!(second >= first);
    }
}
