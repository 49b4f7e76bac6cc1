//! Pdelay machine: request/response/follow-up handling and asCapable
//! evaluation (spec §4.3).

use super::{Port, PDELAY_AS_CAPABLE_THRESHOLD};
use crate::clock::Clock;
use crate::identity::LinkLayerAddress;
use crate::messages::{
    Header, MessageType, PdelayReqMessage, PdelayRespFollowUpMessage, PdelayRespMessage,
};
use crate::scheduler::{Event, EventTimerScheduler};
use crate::time::{clamp_to_granularity, EVENT_TIMER_GRANULARITY};
use crate::time::{IntervalRequest, Timestamp};
use crate::timestamper::HardwareTimestamper;
use crate::transport::{MulticastType, Transport};
use std::time::Duration;

/// Interval used for the first Pdelay request after (re)starting, before
/// the negotiated/operational interval takes over (spec §4.3).
const INITIAL_PDELAY_INTERVAL: Duration = Duration::from_millis(32);

/// Cooldown applied by the `PeerMisbehaving` error kind (spec §7) before
/// `PDELAY_RESP_PEER_MISBEHAVING_TIMEOUT_EXPIRES` auto-restarts Pdelay.
const PEER_MISBEHAVING_COOLDOWN: Duration = Duration::from_secs(2);

impl<T: Transport + 'static, C: Clock + 'static, H: HardwareTimestamper + 'static, S: EventTimerScheduler + 'static>
    Port<T, C, H, S>
{
    pub(crate) fn start_pdelay(&self) {
        let mut state = self.state.lock().unwrap();
        if state.pdelay_halted {
            return;
        }

        if state.force_as_capable {
            if state.log_min_mean_pdelay_req_interval != IntervalRequest::NoSend {
                let interval = match state.log_min_mean_pdelay_req_interval {
                    IntervalRequest::Literal(log_interval) => log_interval.as_clamped_duration(),
                    _ => EVENT_TIMER_GRANULARITY,
                };
                state.pdelay_started = true;
                drop(state);
                self.start_pdelay_interval_timer(interval);
            }
        } else {
            state.pdelay_started = true;
            state.as_capable = false;
            state.as_capable_evaluated = false;
            drop(state);
            self.start_pdelay_interval_timer(INITIAL_PDELAY_INTERVAL);
        }
    }

    pub(crate) fn stop_pdelay(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.pdelay_halted = true;
            state.pdelay_started = false;
        }
        self.scheduler.delete_event_timer(Event::PdelayIntervalTimeoutExpires);
    }

    /// Arm the Pdelay interval timer, deleting any existing one first
    /// (spec §4.3 `startPDelayIntervalTimer`).
    pub(crate) fn start_pdelay_interval_timer(&self, wait_time: Duration) {
        let _guard = self.pdelay_interval_timer_lock.lock().unwrap();
        self.scheduler.delete_event_timer(Event::PdelayIntervalTimeoutExpires);
        self.scheduler
            .add_event_timer(Event::PdelayIntervalTimeoutExpires, clamp_to_granularity(wait_time));
    }

    /// Build and send a fresh PdelayReq (spec §4.2
    /// `PDELAY_INTERVAL_TIMEOUT_EXPIRES`).
    pub(crate) fn emit_pdelay_req(&self) {
        let sequence_id = {
            let mut state = self.state.lock().unwrap();
            let id = state.pdelay_sequence_id;
            state.pdelay_sequence_id = state.pdelay_sequence_id.wrapping_add(1);
            id
        };

        let header = Header {
            message_type: MessageType::PdelayReq,
            source_port_identity: self.port_identity,
            sequence_id,
            log_message_interval: 0x7F,
        };
        let mut req = PdelayReqMessage {
            header,
            origin_timestamp: Timestamp::PDELAY_PENDING,
        };

        {
            let mut slots = self.pdelay_slots.lock().unwrap();
            slots.last_pdelay_req.set(req);
        }

        let mut buf = [0u8; Header::WIRE_SIZE + 8];
        let header_len = match header.serialize(&mut buf) {
            Ok(len) => len,
            Err(_) => return,
        };
        if req.serialize_content(&mut buf[header_len..]).is_err() {
            return;
        }

        if self
            .send_event_port(&buf, MulticastType::Pdelay, None)
            .is_ok()
        {
            if let Some((tx_ts, _)) = self.get_tx_timestamp(
                crate::messages::MessageId {
                    message_type: MessageType::PdelayReq,
                    sequence_id,
                },
                true,
            ) {
                req.origin_timestamp = tx_ts;
                let mut slots = self.pdelay_slots.lock().unwrap();
                slots.last_pdelay_req.set(req);
            }
        }

        let interval = match self.state.lock().unwrap().log_min_mean_pdelay_req_interval {
            IntervalRequest::Literal(log_interval) => log_interval.as_clamped_duration(),
            _ => EVENT_TIMER_GRANULARITY,
        };
        self.scheduler.add_event_timer(
            Event::PdelayRespReceiptTimeoutExpires,
            clamp_to_granularity(interval * self.descriptor.pdelay_resp_receipt_timeout_multiplier as u32),
        );
    }

    pub(crate) fn handle_pdelay_req(&self, req: PdelayReqMessage, remote: LinkLayerAddress, rx_timestamp: Timestamp) {
        self.address_map.insert(req.header.source_port_identity, remote);

        let resp_header = Header {
            message_type: MessageType::PdelayResp,
            source_port_identity: self.port_identity,
            sequence_id: req.header.sequence_id,
            log_message_interval: 0x7F,
        };
        let resp = PdelayRespMessage {
            header: resp_header,
            request_receipt_timestamp: rx_timestamp,
            requesting_port_identity: req.header.source_port_identity,
        };

        let mut buf = [0u8; Header::WIRE_SIZE + 18];
        let header_len = match resp_header.serialize(&mut buf) {
            Ok(len) => len,
            Err(_) => return,
        };
        if resp.serialize_content(&mut buf[header_len..]).is_err() {
            return;
        }
        let dest = req.header.source_port_identity;
        if self
            .send_event_port(&buf, MulticastType::None, Some(dest))
            .is_err()
        {
            return;
        }

        let tx_timestamp = match self.get_tx_timestamp(
            crate::messages::MessageId {
                message_type: MessageType::PdelayResp,
                sequence_id: req.header.sequence_id,
            },
            true,
        ) {
            Some((ts, _)) => ts,
            None => return,
        };

        let fwup_header = Header {
            message_type: MessageType::PdelayRespFollowUp,
            source_port_identity: self.port_identity,
            sequence_id: req.header.sequence_id,
            log_message_interval: 0x7F,
        };
        let fwup = PdelayRespFollowUpMessage {
            header: fwup_header,
            response_origin_timestamp: tx_timestamp,
            requesting_port_identity: req.header.source_port_identity,
        };
        let mut fwup_buf = [0u8; Header::WIRE_SIZE + 18];
        let header_len = match fwup_header.serialize(&mut fwup_buf) {
            Ok(len) => len,
            Err(_) => return,
        };
        if fwup.serialize_content(&mut fwup_buf[header_len..]).is_err() {
            return;
        }
        let _ = self.send_general_port(&fwup_buf, MulticastType::None, Some(dest));
    }

    pub(crate) fn handle_pdelay_resp(&self, resp: PdelayRespMessage, rx_timestamp: Timestamp) {
        let matches_outstanding = {
            let slots = self.pdelay_slots.lock().unwrap();
            slots
                .last_pdelay_req
                .get()
                .map(|req| req.header.sequence_id == resp.header.sequence_id)
                .unwrap_or(false)
        };

        let mut state = self.state.lock().unwrap();
        if !matches_outstanding {
            state.duplicate_resp_counter += 1;
            state.last_invalid_seqid = Some(resp.header.sequence_id);
            drop(state);
            self.stop_pdelay();
            self.scheduler.add_event_timer(
                Event::PdelayRespPeerMisbehavingTimeoutExpires,
                clamp_to_granularity(PEER_MISBEHAVING_COOLDOWN),
            );
            return;
        }

        state.pdelay_count += 1;
        if !state.as_capable_evaluated && state.pdelay_count >= PDELAY_AS_CAPABLE_THRESHOLD {
            state.as_capable = true;
            state.as_capable_evaluated = true;
        }
        drop(state);

        let mut slots = self.pdelay_slots.lock().unwrap();
        slots.last_pdelay_resp_rx_timestamp = rx_timestamp;
        slots.last_pdelay_resp.set(resp);
    }

    pub(crate) fn handle_pdelay_resp_follow_up(&self, fwup: PdelayRespFollowUpMessage) {
        {
            let mut slots = self.pdelay_slots.lock().unwrap();
            slots.last_pdelay_resp_fwup.set(fwup);
        }
        self.arc().process_event(Event::PdelayDeferredProcessing);
    }

    /// Compute the peer propagation delay from the completed
    /// request/response/follow-up triple (spec §4.2
    /// `PDELAY_DEFERRED_PROCESSING`).
    pub(crate) fn compute_peer_delay(&self) -> Option<i64> {
        let slots = self.pdelay_slots.lock().unwrap();
        let t1 = slots.last_pdelay_req.get()?.origin_timestamp;
        let t2 = slots.last_pdelay_resp.get()?.request_receipt_timestamp;
        let t3 = slots.last_pdelay_resp_fwup.get()?.response_origin_timestamp;
        let t4 = slots.last_pdelay_resp_rx_timestamp;
        if t1.is_pending() {
            return None;
        }
        Some(((t4 - t1) - (t3 - t2)) / 2)
    }
}
