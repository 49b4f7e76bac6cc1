//! Sync/Announce machine: master/slave role transitions, the Sync+FollowUp
//! send path, and the automotive sync-rate negotiation timer (spec §4.4).

use super::{Port, PortState};
use crate::automotive::{decrement_avb_sync_state, StationState};
use crate::clock::Clock;
use crate::messages::{AnnounceMessage, FollowUpMessage, Header, MessageId, MessageType, SyncMessage, TestStatusMessage};
use crate::scheduler::{Event, EventTimerScheduler};
use crate::time::clamp_to_granularity;
use crate::timestamper::HardwareTimestamper;
use crate::transport::{MulticastType, Transport};
use std::time::Duration;

const INITIAL_SYNC_INTERVAL: Duration = Duration::from_millis(16);
const SYNC_RATE_TIMEOUT_MASTER: Duration = Duration::from_secs(8);
const SYNC_RATE_TIMEOUT_SLAVE: Duration = Duration::from_secs(4);

impl<T: Transport + 'static, C: Clock + 'static, H: HardwareTimestamper + 'static, S: EventTimerScheduler + 'static>
    Port<T, C, H, S>
{
    /// Externally callable so a BMCA layer can report its election
    /// decision after a `StateChange`/receipt-timeout event comes back
    /// `Disposition::Unhandled` (spec §4.2, §1 "BMCA (external)").
    pub fn become_master(&self, announce_flag: bool) {
        let transmit_announce = self.descriptor.transmit_announce;
        let should_announce = {
            let mut state = self.state.lock().unwrap();
            state.port_state = PortState::Master;
            if transmit_announce {
                self.scheduler.delete_event_timer(Event::AnnounceReceiptTimeoutExpires);
            }
            self.scheduler.delete_event_timer(Event::SyncReceiptTimeoutExpires);

            if self.descriptor.external_port_configuration && state.static_port_state == PortState::Master {
                self.clock.set_grandmaster_clock_identity(self.clock.clock_identity());
                self.clock.set_grandmaster_priority1(self.clock.priority1());
                self.clock.set_grandmaster_priority2(self.clock.priority2());
                self.clock.set_grandmaster_clock_quality(self.clock.clock_quality());
            }

            announce_flag && transmit_announce
        };

        if should_announce {
            self.start_announce();
        }

        self.scheduler
            .add_event_timer(Event::SyncIntervalTimeoutExpires, clamp_to_granularity(INITIAL_SYNC_INTERVAL));
        self.clock.update_fup_info();
    }

    /// Externally callable counterpart to [`Self::become_master`].
    pub fn become_slave(&self, restart_syntonization: bool) {
        self.scheduler.delete_event_timer(Event::SyncIntervalTimeoutExpires);

        let arm_receipt_timer = {
            let mut state = self.state.lock().unwrap();
            state.port_state = PortState::Slave;

            if !self.descriptor.external_port_configuration {
                true
            } else {
                self.clock.set_grandmaster_clock_identity(crate::identity::ClockIdentity::UNKNOWN);
                self.clock.set_grandmaster_priority1(0);
                self.clock.set_grandmaster_priority2(0);
                self.clock.set_grandmaster_clock_quality(crate::clock::ClockQuality::UNKNOWN);
                false
            }
        };

        if arm_receipt_timer {
            let interval = self.state.lock().unwrap().log_announce_interval;
            self.scheduler.add_event_timer(
                Event::AnnounceReceiptTimeoutExpires,
                clamp_to_granularity(
                    interval.as_duration() * self.descriptor.announce_receipt_timeout_multiplier as u32,
                ),
            );
        }

        if restart_syntonization {
            self.clock.new_syntonization_set_point();
        }
        self.clock.update_fup_info();
    }

    /// A minimal, concrete Announce transmission: the content the BMCA
    /// would otherwise control (grandmaster selection, steps removed) is
    /// taken directly from the local clock, since BMCA itself is an
    /// external collaborator (spec §1).
    fn start_announce(&self) {
        let header = Header {
            message_type: MessageType::Announce,
            source_port_identity: self.port_identity,
            sequence_id: 0,
            log_message_interval: self.state.lock().unwrap().log_announce_interval.as_log_2(),
        };
        let announce = AnnounceMessage {
            header,
            grandmaster_identity: self.clock.clock_identity(),
            grandmaster_priority1: self.clock.priority1(),
            grandmaster_priority2: self.clock.priority2(),
            grandmaster_clock_quality: self.clock.clock_quality(),
            steps_removed: 0,
        };
        let mut buf = [0u8; Header::WIRE_SIZE + 16];
        if let Ok(header_len) = header.serialize(&mut buf) {
            if announce.serialize_content(&mut buf[header_len..]).is_ok() {
                let _ = self.send_general_port(&buf, MulticastType::Other, None);
            }
        }
    }

    pub(crate) fn emit_sync(&self) {
        let sequence_id = {
            let mut state = self.state.lock().unwrap();
            let id = state.sync_count as u16;
            state.sync_count += 1;
            id
        };

        let header = Header {
            message_type: MessageType::Sync,
            source_port_identity: self.port_identity,
            sequence_id,
            log_message_interval: self.state.lock().unwrap().log_sync_interval.as_log_2(),
        };
        let sync = SyncMessage {
            header,
            origin_timestamp: crate::time::Timestamp::PDELAY_PENDING,
        };
        let mut buf = [0u8; Header::WIRE_SIZE + 8];
        let header_len = match header.serialize(&mut buf) {
            Ok(len) => len,
            Err(_) => return,
        };
        if sync.serialize_content(&mut buf[header_len..]).is_err() {
            return;
        }

        if self.send_event_port(&buf, MulticastType::Other, None).is_err() {
            return;
        }

        if self.descriptor.automotive_station_states {
            let became_avb_sync = {
                let mut state = self.state.lock().unwrap();
                if state.port_state != PortState::Master {
                    false
                } else {
                    state.avb_sync_state = decrement_avb_sync_state(state.avb_sync_state);
                    if state.avb_sync_state == 0 {
                        state.station_state = StationState::AvbSync;
                        true
                    } else {
                        false
                    }
                }
            };
            if became_avb_sync {
                self.emit_test_status();
            }
        }

        let message_id = MessageId {
            message_type: MessageType::Sync,
            sequence_id,
        };
        let (tx_ts, _) = match self.get_tx_timestamp(message_id, true) {
            Some(pair) => pair,
            None => return,
        };

        let follow_up_header = Header {
            message_type: MessageType::FollowUp,
            source_port_identity: self.port_identity,
            sequence_id,
            log_message_interval: header.log_message_interval,
        };
        let follow_up = FollowUpMessage {
            header: follow_up_header,
            precise_origin_timestamp: tx_ts,
            follow_up_info: self.clock.fup_info(),
        };
        let mut fup_buf = [0u8; Header::WIRE_SIZE + 18];
        if let Ok(header_len) = follow_up_header.serialize(&mut fup_buf) {
            if follow_up.serialize_content(&mut fup_buf[header_len..]).is_ok() {
                let _ = self.send_general_port(&fup_buf, MulticastType::Other, None);
            }
        }
    }

    pub(crate) fn handle_sync(&self, sync: SyncMessage) {
        let mut slot = self.last_sync.lock().unwrap();
        slot.set(sync);
    }

    pub(crate) fn handle_follow_up(&self, follow_up: FollowUpMessage) {
        let matched = {
            let mut slot = self.last_sync.lock().unwrap();
            let matches = slot
                .get()
                .map(|sync| sync.header.sequence_id == follow_up.header.sequence_id)
                .unwrap_or(false);
            if matches {
                slot.take();
            }
            matches
        };
        if matched {
            self.sync_done();
        }
    }

    /// Invoked after a successful slave-side Sync+FollowUp pairing (spec
    /// §4.4 `syncDone`).
    pub(crate) fn sync_done(&self) {
        let is_slave_automotive = self.descriptor.automotive_station_states
            && self.state.lock().unwrap().port_state == PortState::Slave;

        if is_slave_automotive {
            let became_avb_sync = {
                let mut state = self.state.lock().unwrap();
                state.avb_sync_state = decrement_avb_sync_state(state.avb_sync_state);
                if state.avb_sync_state == 0 {
                    state.station_state = StationState::AvbSync;
                    true
                } else {
                    false
                }
            };
            if became_avb_sync && self.descriptor.test_mode {
                self.emit_test_status();
            }
        }

        let should_start_rate_timer = {
            let state = self.state.lock().unwrap();
            self.descriptor.negotiate_automotive_sync_rate
                && state.log_sync_interval != self.resolved.oper_log_sync_interval
                && !state.sync_rate_interval_timer_started
        };
        if should_start_rate_timer {
            self.start_sync_rate_interval_timer();
        }

        let should_start_pdelay = {
            let state = self.state.lock().unwrap();
            !state.pdelay_started && state.link_up
        };
        if should_start_pdelay {
            self.start_pdelay();
        }
    }

    /// Automotive-only: negotiate a faster sync rate, then fall back to
    /// the operational interval (spec §4.4
    /// `startSyncRateIntervalTimer`/§4.2 `SYNC_RATE_INTERVAL_TIMEOUT_EXPIRED`).
    pub(crate) fn start_sync_rate_interval_timer(&self) {
        let is_master = {
            let mut state = self.state.lock().unwrap();
            state.sync_rate_interval_timer_started = true;
            state.port_state == PortState::Master
        };
        let delay = if is_master {
            SYNC_RATE_TIMEOUT_MASTER
        } else {
            SYNC_RATE_TIMEOUT_SLAVE
        };
        self.scheduler
            .add_event_timer(Event::SyncRateIntervalTimeoutExpired, clamp_to_granularity(delay));
    }

    pub(crate) fn emit_test_status(&self) {
        if !self.descriptor.test_mode {
            return;
        }
        let station_state = self.state.lock().unwrap().station_state;
        let msg = TestStatusMessage::new(self.port_identity, station_state);
        let mut buf = [0u8; 1];
        if msg.serialize_content(&mut buf).is_some() {
            let _ = self.send_general_port(&buf, MulticastType::TestStatus, None);
        }
    }
}
