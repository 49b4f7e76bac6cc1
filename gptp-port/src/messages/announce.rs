//! Announce message (spec §4.4 `becomeMaster`'s `startAnnounce`).
//!
//! The best-master-clock algorithm that consumes Announce content is an
//! external collaborator (spec §1); the port only needs to build and
//! recognize Announce frames, not run BMCA over them.

use super::{Header, WireFormatError};
use crate::clock::ClockQuality;
use crate::identity::ClockIdentity;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnounceMessage {
    pub header: Header,
    pub grandmaster_identity: ClockIdentity,
    pub grandmaster_priority1: u8,
    pub grandmaster_priority2: u8,
    pub grandmaster_clock_quality: ClockQuality,
    pub steps_removed: u16,
}

impl AnnounceMessage {
    pub const fn content_size() -> usize {
        8 + 1 + 1 + 4 + 2
    }

    pub fn serialize_content(&self, buf: &mut [u8]) -> Result<usize, WireFormatError> {
        if buf.len() < Self::content_size() {
            return Err(WireFormatError::BufferTooShort);
        }
        buf[0..8].copy_from_slice(&self.grandmaster_identity.0);
        buf[8] = self.grandmaster_priority1;
        buf[9] = self.grandmaster_priority2;
        buf[10] = self.grandmaster_clock_quality.clock_class;
        buf[11] = self.grandmaster_clock_quality.clock_accuracy;
        buf[12..14].copy_from_slice(
            &self
                .grandmaster_clock_quality
                .offset_scaled_log_variance
                .to_be_bytes(),
        );
        buf[14..16].copy_from_slice(&self.steps_removed.to_be_bytes());
        Ok(Self::content_size())
    }

    pub fn deserialize_content(header: Header, buf: &[u8]) -> Result<Self, WireFormatError> {
        if buf.len() < Self::content_size() {
            return Err(WireFormatError::BufferTooShort);
        }
        let mut identity = [0u8; 8];
        identity.copy_from_slice(&buf[0..8]);
        Ok(AnnounceMessage {
            header,
            grandmaster_identity: ClockIdentity(identity),
            grandmaster_priority1: buf[8],
            grandmaster_priority2: buf[9],
            grandmaster_clock_quality: ClockQuality {
                clock_class: buf[10],
                clock_accuracy: buf[11],
                offset_scaled_log_variance: u16::from_be_bytes([buf[12], buf[13]]),
            },
            steps_removed: u16::from_be_bytes([buf[14], buf[15]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::PortIdentity;
    use crate::messages::MessageType;

    #[test]
    fn unknown_grandmaster_quality_round_trips() {
        let header = Header {
            message_type: MessageType::Announce,
            source_port_identity: PortIdentity::new(ClockIdentity([2; 8]), 1),
            sequence_id: 1,
            log_message_interval: 0,
        };
        let msg = AnnounceMessage {
            header,
            grandmaster_identity: ClockIdentity::UNKNOWN,
            grandmaster_priority1: 0,
            grandmaster_priority2: 0,
            grandmaster_clock_quality: ClockQuality::UNKNOWN,
            steps_removed: 0,
        };
        let mut buf = [0u8; AnnounceMessage::content_size()];
        msg.serialize_content(&mut buf).unwrap();
        let decoded = AnnounceMessage::deserialize_content(header, &buf).unwrap();
        assert_eq!(decoded.grandmaster_clock_quality.clock_class, 248);
        assert_eq!(decoded.grandmaster_clock_quality.clock_accuracy, 0xFE);
        assert_eq!(
            decoded.grandmaster_clock_quality.offset_scaled_log_variance,
            0x4100
        );
    }
}
