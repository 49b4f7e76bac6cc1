//! Pdelay request/response/follow-up message bodies (spec §4.3).

use super::{Header, WireFormatError};
use crate::identity::PortIdentity;
use crate::time::Timestamp;

/// A peer-delay request. `origin_timestamp` carries
/// [`Timestamp::PDELAY_PENDING`] until the transport reports the real TX
/// timestamp back (spec §4.2, PDELAY_INTERVAL_TIMEOUT_EXPIRES).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdelayReqMessage {
    pub header: Header,
    pub origin_timestamp: Timestamp,
}

impl PdelayReqMessage {
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
        Ok(PdelayReqMessage {
            header,
            origin_timestamp: Timestamp::from_nanos(i64::from_be_bytes(nanos)),
        })
    }
}

/// A peer-delay response, sent in reply to a [`PdelayReqMessage`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdelayRespMessage {
    pub header: Header,
    pub request_receipt_timestamp: Timestamp,
    pub requesting_port_identity: PortIdentity,
}

impl PdelayRespMessage {
    pub const fn content_size() -> usize {
        8 + 10
    }

    pub fn serialize_content(&self, buf: &mut [u8]) -> Result<usize, WireFormatError> {
        if buf.len() < Self::content_size() {
            return Err(WireFormatError::BufferTooShort);
        }
        buf[0..8].copy_from_slice(&self.request_receipt_timestamp.as_nanos().to_be_bytes());
        buf[8..16].copy_from_slice(&self.requesting_port_identity.clock_identity.0);
        buf[16..18].copy_from_slice(&self.requesting_port_identity.port_number.to_be_bytes());
        Ok(Self::content_size())
    }

    pub fn deserialize_content(header: Header, buf: &[u8]) -> Result<Self, WireFormatError> {
        if buf.len() < Self::content_size() {
            return Err(WireFormatError::BufferTooShort);
        }
        let mut nanos = [0u8; 8];
        nanos.copy_from_slice(&buf[0..8]);
        let mut clock_identity = [0u8; 8];
        clock_identity.copy_from_slice(&buf[8..16]);
        let port_number = u16::from_be_bytes([buf[16], buf[17]]);
        Ok(PdelayRespMessage {
            header,
            request_receipt_timestamp: Timestamp::from_nanos(i64::from_be_bytes(nanos)),
            requesting_port_identity: PortIdentity::new(
                crate::identity::ClockIdentity(clock_identity),
                port_number,
            ),
        })
    }
}

/// Completes a [`PdelayRespMessage`] with the responder's TX timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdelayRespFollowUpMessage {
    pub header: Header,
    pub response_origin_timestamp: Timestamp,
    pub requesting_port_identity: PortIdentity,
}

impl PdelayRespFollowUpMessage {
    pub const fn content_size() -> usize {
        8 + 10
    }

    pub fn serialize_content(&self, buf: &mut [u8]) -> Result<usize, WireFormatError> {
        if buf.len() < Self::content_size() {
            return Err(WireFormatError::BufferTooShort);
        }
        buf[0..8].copy_from_slice(&self.response_origin_timestamp.as_nanos().to_be_bytes());
        buf[8..16].copy_from_slice(&self.requesting_port_identity.clock_identity.0);
        buf[16..18].copy_from_slice(&self.requesting_port_identity.port_number.to_be_bytes());
        Ok(Self::content_size())
    }

    pub fn deserialize_content(header: Header, buf: &[u8]) -> Result<Self, WireFormatError> {
        if buf.len() < Self::content_size() {
            return Err(WireFormatError::BufferTooShort);
        }
        let mut nanos = [0u8; 8];
        nanos.copy_from_slice(&buf[0..8]);
        let mut clock_identity = [0u8; 8];
        clock_identity.copy_from_slice(&buf[8..16]);
        let port_number = u16::from_be_bytes([buf[16], buf[17]]);
        Ok(PdelayRespFollowUpMessage {
            header,
            response_origin_timestamp: Timestamp::from_nanos(i64::from_be_bytes(nanos)),
            requesting_port_identity: PortIdentity::new(
                crate::identity::ClockIdentity(clock_identity),
                port_number,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ClockIdentity;
    use crate::messages::MessageType;

    fn header(message_type: MessageType) -> Header {
        Header {
            message_type,
            source_port_identity: PortIdentity::new(ClockIdentity([9; 8]), 1),
            sequence_id: 7,
            log_message_interval: 0,
        }
    }

    #[test]
    fn pdelay_req_pending_timestamp_round_trips() {
        let msg = PdelayReqMessage {
            header: header(MessageType::PdelayReq),
            origin_timestamp: Timestamp::PDELAY_PENDING,
        };
        let mut buf = [0u8; PdelayReqMessage::content_size()];
        msg.serialize_content(&mut buf).unwrap();
        let decoded = PdelayReqMessage::deserialize_content(msg.header, &buf).unwrap();
        assert!(decoded.origin_timestamp.is_pending());
        assert_eq!(decoded, msg);
    }

    #[test]
    fn pdelay_resp_round_trip() {
        let msg = PdelayRespMessage {
            header: header(MessageType::PdelayResp),
            request_receipt_timestamp: Timestamp::from_nanos(123_456_789),
            requesting_port_identity: PortIdentity::new(ClockIdentity([1; 8]), 2),
        };
        let mut buf = [0u8; PdelayRespMessage::content_size()];
        msg.serialize_content(&mut buf).unwrap();
        assert_eq!(PdelayRespMessage::deserialize_content(msg.header, &buf).unwrap(), msg);
    }
}
