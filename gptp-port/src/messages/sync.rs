//! Sync / FollowUp message bodies (spec §4.4).

use super::{Header, WireFormatError};
use crate::clock::FollowUpInfo;
use crate::time::Timestamp;

/// A Sync message. The origin timestamp is the hardware/system TX
/// timestamp captured when the frame left the port; in two-step operation
/// this is conveyed precisely by the following [`FollowUpMessage`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncMessage {
    pub header: Header,
    pub origin_timestamp: Timestamp,
}

impl SyncMessage {
    pub const fn content_size() -> usize {
        8
    }

    pub fn serialize_content(&self, buf: &mut [u8]) -> Result<usize, WireFormatError> {
        if buf.len() < Self::content_size() {
            return Err(WireFormatError::BufferTooShort);
        }
        buf[0..8].copy_from_slice(&self.origin_timestamp.as_nanos().to_be_bytes());
        Ok(Self::content_size())
    }

    pub fn deserialize_content(header: Header, buf: &[u8]) -> Result<Self, WireFormatError> {
        if buf.len() < Self::content_size() {
            return Err(WireFormatError::BufferTooShort);
        }
        let mut nanos = [0u8; 8];
        nanos.copy_from_slice(&buf[0..8]);
        Ok(SyncMessage {
            header,
            origin_timestamp: Timestamp::from_nanos(i64::from_be_bytes(nanos)),
        })
    }
}

/// Completes a two-step Sync with the precise TX timestamp and the clock's
/// rate-ratio information (spec §4.2, SYNC_INTERVAL_TIMEOUT_EXPIRES).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowUpMessage {
    pub header: Header,
    pub precise_origin_timestamp: Timestamp,
    pub follow_up_info: FollowUpInfo,
}

impl FollowUpMessage {
    pub const fn content_size() -> usize {
        8 + 8 + 2
    }

    pub fn serialize_content(&self, buf: &mut [u8]) -> Result<usize, WireFormatError> {
        if buf.len() < Self::content_size() {
            return Err(WireFormatError::BufferTooShort);
        }
        buf[0..8].copy_from_slice(&self.precise_origin_timestamp.as_nanos().to_be_bytes());
        buf[8..16].copy_from_slice(&self.follow_up_info.rate_ratio.to_be_bytes());
        buf[16..18].copy_from_slice(&self.follow_up_info.gm_time_base_indicator.to_be_bytes());
        Ok(Self::content_size())
    }

    pub fn deserialize_content(header: Header, buf: &[u8]) -> Result<Self, WireFormatError> {
        if buf.len() < Self::content_size() {
            return Err(WireFormatError::BufferTooShort);
        }
        let mut nanos = [0u8; 8];
        nanos.copy_from_slice(&buf[0..8]);
        let mut rate_ratio = [0u8; 8];
        rate_ratio.copy_from_slice(&buf[8..16]);
        let gm_time_base_indicator = u16::from_be_bytes([buf[16], buf[17]]);
        Ok(FollowUpMessage {
            header,
            precise_origin_timestamp: Timestamp::from_nanos(i64::from_be_bytes(nanos)),
            follow_up_info: FollowUpInfo {
                rate_ratio: f64::from_be_bytes(rate_ratio),
                gm_time_base_indicator,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ClockIdentity, PortIdentity};
    use crate::messages::MessageType;

    fn header(message_type: MessageType) -> Header {
        Header {
            message_type,
            source_port_identity: PortIdentity::new(ClockIdentity([3; 8]), 1),
            sequence_id: 5,
            log_message_interval: -3,
        }
    }

    #[test]
    fn sync_and_follow_up_round_trip_and_share_sequence_id() {
        let sync = SyncMessage {
            header: header(MessageType::Sync),
            origin_timestamp: Timestamp::from_nanos(1_000),
        };
        let mut buf = [0u8; SyncMessage::content_size()];
        sync.serialize_content(&mut buf).unwrap();
        assert_eq!(SyncMessage::deserialize_content(sync.header, &buf).unwrap(), sync);

        let follow_up = FollowUpMessage {
            header: Header {
                message_type: MessageType::FollowUp,
                ..sync.header
            },
            precise_origin_timestamp: sync.origin_timestamp,
            follow_up_info: FollowUpInfo::default(),
        };
        assert_eq!(follow_up.header.sequence_id, sync.header.sequence_id);
        assert_eq!(follow_up.precise_origin_timestamp, sync.origin_timestamp);
    }
}
