//! Message types and the small wire-format codec used to exercise them.
//!
//! Full byte-level PTP/802.1AS codecs are an external collaborator (spec
//! §6); this module implements a self-consistent minimal codec so the core
//! crate is runnable and testable end to end, following the teacher's
//! `content_size`/`serialize_content`/`deserialize_content` idiom.

pub mod announce;
pub mod pdelay;
pub mod signaling;
pub mod sync;
pub mod test_status;

pub use announce::AnnounceMessage;
pub use pdelay::{PdelayReqMessage, PdelayRespFollowUpMessage, PdelayRespMessage};
pub use signaling::SignalingMessage;
pub use sync::{FollowUpMessage, SyncMessage};
pub use test_status::TestStatusMessage;

use crate::identity::PortIdentity;
use thiserror::Error;

/// EtherType used for gPTP frames (802.1AS over raw Ethernet, spec §1
/// Non-goals exclude UDP/IP transport).
pub const ETHERTYPE_GPTP: u16 = 0x88F7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireFormatError {
    #[error("buffer too short to hold message content")]
    BufferTooShort,
    #[error("unrecognized message type byte {0:#x}")]
    UnknownMessageType(u8),
}

/// PTP message type byte, as carried in the first byte of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Sync,
    PdelayReq,
    PdelayResp,
    FollowUp,
    PdelayRespFollowUp,
    Announce,
    Signaling,
}

impl MessageType {
    pub fn to_byte(self) -> u8 {
        match self {
            MessageType::Sync => 0x0,
            MessageType::PdelayReq => 0x2,
            MessageType::PdelayResp => 0x3,
            MessageType::FollowUp => 0x8,
            MessageType::PdelayRespFollowUp => 0xA,
            MessageType::Announce => 0xB,
            MessageType::Signaling => 0xC,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, WireFormatError> {
        Ok(match byte {
            0x0 => MessageType::Sync,
            0x2 => MessageType::PdelayReq,
            0x3 => MessageType::PdelayResp,
            0x8 => MessageType::FollowUp,
            0xA => MessageType::PdelayRespFollowUp,
            0xB => MessageType::Announce,
            0xC => MessageType::Signaling,
            other => return Err(WireFormatError::UnknownMessageType(other)),
        })
    }

    /// Whether this message type is an *event* message: one whose
    /// transmission/reception is hardware-timestamped (spec §4.6).
    pub fn is_event(self) -> bool {
        matches!(self, MessageType::Sync | MessageType::PdelayReq | MessageType::PdelayResp)
    }
}

/// Identifies one in-flight message for timestamper lookups: the message
/// type plus its sequence id (spec §6, `getMessageId()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId {
    pub message_type: MessageType,
    pub sequence_id: u16,
}

/// Common fields present on every message's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub message_type: MessageType,
    pub source_port_identity: PortIdentity,
    pub sequence_id: u16,
    pub log_message_interval: i8,
}

impl Header {
    pub const WIRE_SIZE: usize = 1 + 8 + 2 + 2 + 1;

    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, WireFormatError> {
        if buf.len() < Self::WIRE_SIZE {
            return Err(WireFormatError::BufferTooShort);
        }
        buf[0] = self.message_type.to_byte();
        buf[1..9].copy_from_slice(&self.source_port_identity.clock_identity.0);
        buf[9..11].copy_from_slice(&self.source_port_identity.port_number.to_be_bytes());
        buf[11..13].copy_from_slice(&self.sequence_id.to_be_bytes());
        buf[13] = self.log_message_interval as u8;
        Ok(Self::WIRE_SIZE)
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, WireFormatError> {
        if buf.len() < Self::WIRE_SIZE {
            return Err(WireFormatError::BufferTooShort);
        }
        let message_type = MessageType::from_byte(buf[0])?;
        let mut clock_identity = [0u8; 8];
        clock_identity.copy_from_slice(&buf[1..9]);
        let port_number = u16::from_be_bytes([buf[9], buf[10]]);
        let sequence_id = u16::from_be_bytes([buf[11], buf[12]]);
        let log_message_interval = buf[13] as i8;
        Ok(Header {
            message_type,
            source_port_identity: PortIdentity::new(
                crate::identity::ClockIdentity(clock_identity),
                port_number,
            ),
            sequence_id,
            log_message_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ClockIdentity;

    #[test]
    fn header_round_trip() {
        let header = Header {
            message_type: MessageType::PdelayReq,
            source_port_identity: PortIdentity::new(ClockIdentity([1, 2, 3, 4, 5, 6, 7, 8]), 1),
            sequence_id: 42,
            log_message_interval: 0x7F,
        };
        let mut buf = [0u8; Header::WIRE_SIZE];
        assert_eq!(header.serialize(&mut buf).unwrap(), Header::WIRE_SIZE);
        assert_eq!(Header::deserialize(&buf).unwrap(), header);
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        assert_eq!(
            MessageType::from_byte(0xFF),
            Err(WireFormatError::UnknownMessageType(0xFF))
        );
    }

    #[test]
    fn event_messages_are_timestamped() {
        assert!(MessageType::Sync.is_event());
        assert!(MessageType::PdelayReq.is_event());
        assert!(MessageType::PdelayResp.is_event());
        assert!(!MessageType::FollowUp.is_event());
        assert!(!MessageType::Announce.is_event());
    }
}
