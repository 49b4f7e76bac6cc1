//! Automotive test-status AP message (spec §4.7), sent to
//! `TEST_STATUS_MULTICAST` whenever station state changes in test mode.

use crate::automotive::StationState;
use crate::identity::PortIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestStatusMessage {
    pub source_port_identity: PortIdentity,
    pub station_state: StationState,
}

impl TestStatusMessage {
    pub fn new(source_port_identity: PortIdentity, station_state: StationState) -> Self {
        Self {
            source_port_identity,
            station_state,
        }
    }

    fn station_state_byte(self) -> u8 {
        match self.station_state {
            StationState::Reserved => 0,
            StationState::EthernetReady => 1,
            StationState::AvbSync => 2,
        }
    }

    pub fn content_size() -> usize {
        1
    }

    pub fn serialize_content(&self, buf: &mut [u8]) -> Option<usize> {
        let size = Self::content_size();
        let slot = buf.get_mut(0..size)?;
        slot[0] = self.station_state_byte();
        Some(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ClockIdentity;

    #[test]
    fn serializes_station_state() {
        let msg = TestStatusMessage::new(
            PortIdentity::new(ClockIdentity([0; 8]), 1),
            StationState::AvbSync,
        );
        let mut buf = [0u8; 1];
        assert_eq!(msg.serialize_content(&mut buf), Some(1));
        assert_eq!(buf[0], 2);
    }
}
