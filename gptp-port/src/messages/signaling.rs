//! Signalling messages (spec §4.2 boot sequence, §4.4
//! `startSyncRateIntervalTimer`, §4.7 automotive overlay).

use super::{Header, WireFormatError};
use crate::time::IntervalRequest;
use arrayvec::ArrayVec;

/// Maximum number of raw TLV bytes carried on a signalling message beyond
/// the three interval requests. Unused by the automotive overlay today but
/// kept, matching the teacher's `SignalingMessage`, as the extension point
/// future TLVs (e.g. path trace) would occupy.
const MAX_TLV_BYTES: usize = 64;

/// A Signalling message requesting new message intervals from the peer
/// (spec §4.7): each of pdelay/sync/announce is either a literal log2
/// value, `NoChange`, or `NoSend`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalingMessage {
    pub header: Header,
    pub pdelay_interval: IntervalRequest,
    pub sync_interval: IntervalRequest,
    pub announce_interval: IntervalRequest,
    pub tlv: ArrayVec<u8, MAX_TLV_BYTES>,
}

impl SignalingMessage {
    pub fn new(
        header: Header,
        pdelay_interval: IntervalRequest,
        sync_interval: IntervalRequest,
        announce_interval: IntervalRequest,
    ) -> Self {
        Self {
            header,
            pdelay_interval,
            sync_interval,
            announce_interval,
            tlv: ArrayVec::new(),
        }
    }

    fn encode_interval(interval: IntervalRequest) -> i8 {
        match interval {
            IntervalRequest::Literal(log_interval) => log_interval.as_log_2(),
            IntervalRequest::NoChange => 0x7E,
            IntervalRequest::NoSend => 0x7F,
        }
    }

    fn decode_interval(byte: i8) -> IntervalRequest {
        match byte {
            0x7E => IntervalRequest::NoChange,
            0x7F => IntervalRequest::NoSend,
            literal => IntervalRequest::literal(literal),
        }
    }

    pub const fn content_size() -> usize {
        3
    }

    pub fn serialize_content(&self, buf: &mut [u8]) -> Result<usize, WireFormatError> {
        if buf.len() < Self::content_size() {
            return Err(WireFormatError::BufferTooShort);
        }
        buf[0] = Self::encode_interval(self.pdelay_interval) as u8;
        buf[1] = Self::encode_interval(self.sync_interval) as u8;
        buf[2] = Self::encode_interval(self.announce_interval) as u8;
        Ok(Self::content_size())
    }

    pub fn deserialize_content(header: Header, buf: &[u8]) -> Result<Self, WireFormatError> {
        if buf.len() < Self::content_size() {
            return Err(WireFormatError::BufferTooShort);
        }
        Ok(SignalingMessage::new(
            header,
            Self::decode_interval(buf[0] as i8),
            Self::decode_interval(buf[1] as i8),
            Self::decode_interval(buf[2] as i8),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ClockIdentity, PortIdentity};
    use crate::messages::MessageType;

    fn header() -> Header {
        Header {
            message_type: MessageType::Signaling,
            source_port_identity: PortIdentity::new(ClockIdentity([4; 8]), 1),
            sequence_id: 0,
            log_message_interval: 0x7F,
        }
    }

    #[test]
    fn boot_signalling_round_trips() {
        // The boot-time signalling frame from spec §8 scenario 2: pdelay and
        // announce suppressed, sync requested at -3.
        let msg = SignalingMessage::new(
            header(),
            IntervalRequest::NoSend,
            IntervalRequest::literal(-3),
            IntervalRequest::NoSend,
        );
        let mut buf = [0u8; SignalingMessage::content_size()];
        msg.serialize_content(&mut buf).unwrap();
        let decoded = SignalingMessage::deserialize_content(msg.header, &buf).unwrap();
        assert_eq!(decoded.pdelay_interval, IntervalRequest::NoSend);
        assert_eq!(decoded.sync_interval, IntervalRequest::literal(-3));
        assert_eq!(decoded.announce_interval, IntervalRequest::NoSend);
    }
}
