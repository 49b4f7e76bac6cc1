//! Port construction descriptor and the defaults applied from it (spec
//! §4.1).

use crate::identity::PortIdentity;
use crate::time::{IntervalRequest, LogInterval};

/// Carries everything [`crate::port::Port::new`] needs besides its
/// collaborator handles: link-up hint, log interval defaults, automotive
/// flags (spec §4.1).
#[derive(Debug, Clone)]
pub struct PortInitDescriptor {
    pub port_identity: PortIdentity,
    pub initial_link_up: bool,

    pub initial_log_pdelay_req_interval: Option<IntervalRequest>,
    pub oper_log_pdelay_req_interval: Option<LogInterval>,
    pub initial_log_sync_interval: Option<LogInterval>,
    pub oper_log_sync_interval: Option<LogInterval>,
    pub log_announce_interval: LogInterval,

    pub announce_receipt_timeout_multiplier: u8,
    pub sync_receipt_timeout_multiplier: u8,
    pub pdelay_resp_receipt_timeout_multiplier: u8,

    pub force_as_capable: bool,
    pub external_port_configuration: bool,
    pub static_port_state_master: bool,
    pub transmit_announce: bool,
    pub automotive_station_states: bool,
    pub negotiate_automotive_sync_rate: bool,
    pub test_mode: bool,
}

impl Default for PortInitDescriptor {
    fn default() -> Self {
        Self {
            port_identity: PortIdentity::new(crate::identity::ClockIdentity::UNKNOWN, 1),
            initial_link_up: false,
            initial_log_pdelay_req_interval: None,
            oper_log_pdelay_req_interval: None,
            initial_log_sync_interval: None,
            oper_log_sync_interval: None,
            log_announce_interval: LogInterval::from_log_2(1),
            announce_receipt_timeout_multiplier: 3,
            sync_receipt_timeout_multiplier: 3,
            pdelay_resp_receipt_timeout_multiplier: 3,
            force_as_capable: false,
            external_port_configuration: false,
            static_port_state_master: false,
            transmit_announce: true,
            automotive_station_states: false,
            negotiate_automotive_sync_rate: false,
            test_mode: false,
        }
    }
}

/// Resolved defaults, computed once at construction time (spec §4.1).
pub struct ResolvedIntervals {
    pub initial_log_sync_interval: LogInterval,
    pub initial_log_pdelay_req_interval: IntervalRequest,
    pub oper_log_pdelay_req_interval: LogInterval,
    pub oper_log_sync_interval: LogInterval,
}

impl ResolvedIntervals {
    pub fn from_descriptor(descriptor: &PortInitDescriptor) -> Self {
        let initial_log_sync_interval = descriptor.initial_log_sync_interval.unwrap_or_else(|| {
            if descriptor.negotiate_automotive_sync_rate {
                LogInterval::from_log_2(-5)
            } else {
                LogInterval::from_log_2(-3)
            }
        });

        let initial_log_pdelay_req_interval = descriptor
            .initial_log_pdelay_req_interval
            .unwrap_or(IntervalRequest::literal(0));

        let oper_log_pdelay_req_interval = descriptor
            .oper_log_pdelay_req_interval
            .unwrap_or(LogInterval::from_log_2(0));

        let oper_log_sync_interval = descriptor
            .oper_log_sync_interval
            .unwrap_or(LogInterval::from_log_2(0));

        Self {
            initial_log_sync_interval,
            initial_log_pdelay_req_interval,
            oper_log_pdelay_req_interval,
            oper_log_sync_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automotive_sync_rate_negotiation_defaults_sync_to_31_25ms() {
        let descriptor = PortInitDescriptor {
            negotiate_automotive_sync_rate: true,
            ..Default::default()
        };
        let resolved = ResolvedIntervals::from_descriptor(&descriptor);
        assert_eq!(resolved.initial_log_sync_interval.as_log_2(), -5);
    }

    #[test]
    fn non_automotive_defaults_sync_to_125ms() {
        let descriptor = PortInitDescriptor::default();
        let resolved = ResolvedIntervals::from_descriptor(&descriptor);
        assert_eq!(resolved.initial_log_sync_interval.as_log_2(), -3);
    }

    #[test]
    fn unset_pdelay_and_oper_intervals_default_to_one_second() {
        let descriptor = PortInitDescriptor::default();
        let resolved = ResolvedIntervals::from_descriptor(&descriptor);
        assert_eq!(
            resolved.initial_log_pdelay_req_interval,
            IntervalRequest::literal(0)
        );
        assert_eq!(resolved.oper_log_pdelay_req_interval.as_log_2(), 0);
        assert_eq!(resolved.oper_log_sync_interval.as_log_2(), 0);
    }
}
