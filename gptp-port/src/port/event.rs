//! The event dispatcher: `processEvent` (spec §4.2).
//!
//! Single entry point. All transitions are atomic from the caller's
//! perspective; the external scheduler guarantees at most one event per
//! port is ever in flight, so the dispatcher itself needs no top-level
//! lock beyond the per-concern locks already on [`super::Port`].

use super::{Port, PortState};
use crate::automotive::{initial_avb_sync_state, StationState};
use crate::clock::Clock;
use crate::scheduler::{Event, EventTimerScheduler};
use crate::time::{clamp_to_granularity, IntervalRequest};
use crate::timestamper::HardwareTimestamper;
use crate::transport::Transport;
use log::{debug, trace, warn};
use std::sync::Arc;

/// Whether the dispatcher handled an event itself, or it should propagate
/// to an external layer (the BMCA, spec §4.2 `STATE_CHANGE_EVENT` and
/// receipt-timeout handling under `externalPortConfiguration`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Handled,
    Unhandled,
}

impl<T: Transport + 'static, C: Clock + 'static, H: HardwareTimestamper + 'static, S: EventTimerScheduler + 'static>
    Port<T, C, H, S>
{
    /// Dispatch one protocol event. See spec §4.2 for the full semantics
    /// of each arm.
    pub fn process_event(self: &Arc<Self>, event: Event) -> Disposition {
        trace!(target: "gptp_port", "processEvent({event:?})");
        match event {
            Event::PowerUp | Event::Initialize => self.on_power_up(),
            Event::StateChange => self.on_state_change(),
            Event::LinkUp => self.on_link_up(),
            Event::LinkDown => self.on_link_down(),
            Event::AnnounceReceiptTimeoutExpires => self.on_announce_receipt_timeout(),
            Event::SyncReceiptTimeoutExpires => self.on_sync_receipt_timeout(),
            Event::PdelayIntervalTimeoutExpires => self.on_pdelay_interval_timeout(),
            Event::SyncIntervalTimeoutExpires => self.on_sync_interval_timeout(),
            Event::FaultDetected => self.on_fault_detected(),
            Event::PdelayDeferredProcessing => self.on_pdelay_deferred_processing(),
            Event::PdelayRespReceiptTimeoutExpires => self.on_pdelay_resp_receipt_timeout(),
            Event::PdelayRespPeerMisbehavingTimeoutExpires => self.on_pdelay_resp_peer_misbehaving_timeout(),
            Event::SyncRateIntervalTimeoutExpired => self.on_sync_rate_interval_timeout(),
        }
    }

    fn on_power_up(self: &Arc<Self>) -> Disposition {
        let link_up = self.state.lock().unwrap().link_up;
        if link_up {
            self.start_pdelay();
        }

        {
            let mut ready = self.port_ready.0.lock().unwrap();
            *ready = false;
        }
        self.spawn_workers();
        {
            let (ready_lock, ready_cvar) = &self.port_ready;
            let mut ready = ready_lock.lock().unwrap();
            while !*ready {
                ready = ready_cvar.wait(ready).unwrap();
            }
        }

        if self.descriptor.automotive_station_states {
            self.state.lock().unwrap().station_state = StationState::EthernetReady;
        }
        if self.descriptor.test_mode {
            self.emit_test_status();
        }

        let boot_as_slave = self.descriptor.external_port_configuration
            && self.descriptor.negotiate_automotive_sync_rate
            && self.state.lock().unwrap().static_port_state == PortState::Slave;
        if boot_as_slave {
            self.emit_boot_signalling();
            let interval = self.state.lock().unwrap().log_sync_interval;
            self.scheduler.add_event_timer(
                Event::SyncReceiptTimeoutExpires,
                clamp_to_granularity(interval.as_duration() * self.descriptor.sync_receipt_timeout_multiplier as u32),
            );
        }

        Disposition::Handled
    }

    /// The boot-time signalling frame from spec §4.2/§4.7 and scenario 2
    /// in spec §8: suppress peer Pdelay/Announce, negotiate the sync rate.
    fn emit_boot_signalling(&self) {
        use crate::messages::{Header, MessageType, SignalingMessage};

        let sync_interval = self.state.lock().unwrap().log_sync_interval;
        let header = Header {
            message_type: MessageType::Signaling,
            source_port_identity: self.port_identity,
            sequence_id: 0,
            log_message_interval: 0x7F,
        };
        let signal = SignalingMessage::new(
            header,
            IntervalRequest::NoSend,
            IntervalRequest::Literal(sync_interval),
            IntervalRequest::NoSend,
        );
        let mut buf = [0u8; crate::messages::Header::WIRE_SIZE + 3];
        if let Ok(header_len) = header.serialize(&mut buf) {
            if signal.serialize_content(&mut buf[header_len..]).is_ok() {
                let _ = self.send_general_port(&buf, crate::transport::MulticastType::Other, None);
            }
        }
    }

    fn on_state_change(&self) -> Disposition {
        if self.descriptor.external_port_configuration {
            Disposition::Handled
        } else {
            Disposition::Unhandled
        }
    }

    fn on_link_up(self: &Arc<Self>) -> Disposition {
        self.stop_pdelay();
        {
            let mut state = self.state.lock().unwrap();
            state.pdelay_halted = false;
            state.link_up = true;
        }
        self.start_pdelay();

        let (priority1_is_255, port_state) = (self.clock.priority1() == 255, self.state.lock().unwrap().port_state);
        if priority1_is_255 || port_state == PortState::Slave {
            self.become_slave(true);
        } else if port_state == PortState::Master {
            self.become_master(true);
        } else {
            let announce_interval = self.state.lock().unwrap().log_announce_interval;
            self.scheduler.add_event_timer(
                Event::AnnounceReceiptTimeoutExpires,
                clamp_to_granularity(
                    announce_interval.as_duration() * self.descriptor.announce_receipt_timeout_multiplier as u32,
                ),
            );
        }

        if self.descriptor.automotive_station_states {
            let is_master = self.state.lock().unwrap().port_state == PortState::Master;
            let mut state = self.state.lock().unwrap();
            state.station_state = StationState::EthernetReady;
            state.avb_sync_state = initial_avb_sync_state(is_master);
        }
        if self.descriptor.test_mode {
            self.emit_test_status();
        }

        {
            let mut state = self.state.lock().unwrap();
            state.log_sync_interval = self.resolved.initial_log_sync_interval;
            state.log_min_mean_pdelay_req_interval = self.resolved.initial_log_pdelay_req_interval;
            state.log_announce_interval = crate::time::LogInterval::from_log_2(0);
        }

        let slave_automotive_rate = self.descriptor.negotiate_automotive_sync_rate
            && self.state.lock().unwrap().port_state == PortState::Slave;
        if slave_automotive_rate {
            self.emit_boot_signalling();
            let interval = self.state.lock().unwrap().log_sync_interval;
            self.scheduler.add_event_timer(
                Event::SyncReceiptTimeoutExpires,
                clamp_to_granularity(interval.as_duration() * self.descriptor.sync_receipt_timeout_multiplier as u32),
            );
        }

        {
            let mut state = self.state.lock().unwrap();
            state.pdelay_count = 0;
            state.sync_count = 0;
            if self.descriptor.test_mode {
                state.link_up_count += 1;
            }
        }

        if let Some(hw) = &self.timestamper {
            hw.reset();
        }

        Disposition::Handled
    }

    fn on_link_down(&self) -> Disposition {
        self.stop_pdelay();
        let mut state = self.state.lock().unwrap();
        state.link_up = false;
        if !state.force_as_capable {
            state.as_capable = false;
        }
        if self.descriptor.test_mode {
            state.link_down_count += 1;
        }
        Disposition::Handled
    }

    fn on_announce_receipt_timeout(&self) -> Disposition {
        if !self.descriptor.external_port_configuration {
            return Disposition::Unhandled;
        }
        // Under externalPortConfiguration this is a silent no-op: BMCA's
        // announce-receipt-driven re-election is suppressed (spec §4.2).
        Disposition::Handled
    }

    fn on_sync_receipt_timeout(&self) -> Disposition {
        if !self.descriptor.external_port_configuration {
            return Disposition::Unhandled;
        }
        debug!(target: "gptp_port", "sync-receipt timeout under externalPortConfiguration, re-arming");
        let interval = self.state.lock().unwrap().log_sync_interval;
        self.scheduler.add_event_timer(
            Event::SyncReceiptTimeoutExpires,
            clamp_to_granularity(interval.as_duration() * self.descriptor.sync_receipt_timeout_multiplier as u32),
        );
        Disposition::Handled
    }

    fn on_pdelay_interval_timeout(&self) -> Disposition {
        self.emit_pdelay_req();

        let interval = match self.state.lock().unwrap().log_min_mean_pdelay_req_interval {
            IntervalRequest::Literal(log_interval) => log_interval.as_clamped_duration(),
            _ => crate::time::EVENT_TIMER_GRANULARITY,
        };
        self.start_pdelay_interval_timer(interval);
        Disposition::Handled
    }

    fn on_sync_interval_timeout(&self) -> Disposition {
        self.emit_sync();
        Disposition::Handled
    }

    fn on_fault_detected(&self) -> Disposition {
        let mut state = self.state.lock().unwrap();
        if !state.force_as_capable {
            state.as_capable = false;
        }
        Disposition::Handled
    }

    fn on_pdelay_deferred_processing(&self) -> Disposition {
        let mut slots = self.pdelay_slots.lock().unwrap();
        if slots.last_pdelay_resp_fwup.is_empty() {
            panic!("PDELAY_DEFERRED_PROCESSING with no pending PdelayRespFollowUp");
        }
        drop(slots);

        if let Some(peer_delay_nanos) = self.compute_peer_delay() {
            debug!(target: "gptp_port", "peer delay = {peer_delay_nanos} ns");
        }

        slots = self.pdelay_slots.lock().unwrap();
        slots.last_pdelay_resp_fwup.take();
        Disposition::Handled
    }

    fn on_pdelay_resp_receipt_timeout(&self) -> Disposition {
        let mut state = self.state.lock().unwrap();
        if !state.force_as_capable {
            warn!(target: "gptp_port", "pdelay response receipt timeout, clearing asCapable");
            state.as_capable = false;
        }
        state.pdelay_count = 0;
        Disposition::Handled
    }

    fn on_pdelay_resp_peer_misbehaving_timeout(&self) -> Disposition {
        let should_restart = {
            let mut state = self.state.lock().unwrap();
            state.pdelay_halted = false;
            !matches!(state.port_state, PortState::Slave | PortState::Master)
        };
        if should_restart {
            self.start_pdelay();
        }
        Disposition::Handled
    }

    fn on_sync_rate_interval_timeout(&self) -> Disposition {
        let (sync_changed, pdelay_changed, is_slave) = {
            let mut state = self.state.lock().unwrap();
            state.sync_rate_interval_timer_started = false;

            let sync_changed = state.log_sync_interval != self.resolved.oper_log_sync_interval;
            state.log_sync_interval = self.resolved.oper_log_sync_interval;

            let target_pdelay = IntervalRequest::Literal(self.resolved.oper_log_pdelay_req_interval);
            let pdelay_changed = state.log_min_mean_pdelay_req_interval != target_pdelay;
            state.log_min_mean_pdelay_req_interval = target_pdelay;

            (sync_changed, pdelay_changed, state.port_state == PortState::Slave)
        };

        if (sync_changed || pdelay_changed) && is_slave {
            self.emit_sync_rate_signalling(pdelay_changed);
            let interval = self.state.lock().unwrap().log_sync_interval;
            self.scheduler.add_event_timer(
                Event::SyncReceiptTimeoutExpires,
                clamp_to_granularity(interval.as_duration() * self.descriptor.sync_receipt_timeout_multiplier as u32),
            );
        }
        Disposition::Handled
    }

    fn emit_sync_rate_signalling(&self, include_pdelay: bool) {
        use crate::messages::{Header, MessageType, SignalingMessage};

        let sync_interval = self.resolved.oper_log_sync_interval;
        let pdelay_request = if self.descriptor.negotiate_automotive_sync_rate {
            IntervalRequest::NoChange
        } else if include_pdelay {
            IntervalRequest::Literal(self.resolved.oper_log_pdelay_req_interval)
        } else {
            IntervalRequest::NoChange
        };

        let header = Header {
            message_type: MessageType::Signaling,
            source_port_identity: self.port_identity,
            sequence_id: 1,
            log_message_interval: 0x7F,
        };
        let signal = SignalingMessage::new(
            header,
            pdelay_request,
            IntervalRequest::Literal(sync_interval),
            IntervalRequest::NoChange,
        );
        let mut buf = [0u8; crate::messages::Header::WIRE_SIZE + 3];
        if let Ok(header_len) = header.serialize(&mut buf) {
            if signal.serialize_content(&mut buf[header_len..]).is_ok() {
                let _ = self.send_general_port(&buf, crate::transport::MulticastType::Other, None);
            }
        }
    }
}
