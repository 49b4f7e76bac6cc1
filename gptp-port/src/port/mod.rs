//! The Ethernet port object and its lifecycle (spec §4.1).

mod event;
mod pdelay;
mod sync;
mod timestamping;
mod transport_glue;

pub use event::Disposition;

use crate::address_map::AddressMap;
use crate::automotive::StationState;
use crate::clock::Clock;
use crate::config::{PortInitDescriptor, ResolvedIntervals};
use crate::identity::PortIdentity;
use crate::messages::{FollowUpMessage, PdelayReqMessage, PdelayRespFollowUpMessage, PdelayRespMessage, SyncMessage};
use crate::pending::PendingSlot;
use crate::scheduler::EventTimerScheduler;
use crate::time::{IntervalRequest, LogInterval};
use crate::timestamper::HardwareTimestamper;
use crate::transport::Transport;
use std::sync::{Arc, Condvar, Mutex, OnceLock, Weak};

/// `portState` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Disabled,
    Initializing,
    Faulty,
    Listening,
    PreMaster,
    Master,
    Passive,
    Uncalibrated,
    Slave,
}

/// The three Pdelay message slots, guarded together by `last_pdelay_lock`
/// (spec §3, §4.1: "guards the three Pdelay slots against concurrent
/// RX/timer mutation").
#[derive(Default)]
pub(crate) struct PdelaySlots {
    pub last_pdelay_req: PendingSlot<PdelayReqMessage>,
    pub last_pdelay_resp: PendingSlot<PdelayRespMessage>,
    pub last_pdelay_resp_fwup: PendingSlot<PdelayRespFollowUpMessage>,
    /// Our RX timestamp for `last_pdelay_resp` (t4), carried alongside the
    /// slot rather than inside the wire message itself.
    pub last_pdelay_resp_rx_timestamp: crate::time::Timestamp,
}

/// Everything else that mutates during the port's lifetime, serialized by
/// the scheduler's single-event-in-flight-per-port guarantee (spec §5).
/// Consolidated into one lock rather than the field-level granularity of
/// the original: the scheduler already ensures only one dispatcher call is
/// active at a time, so one coarse lock covers the remaining bookkeeping
/// without losing any ordering guarantee the spec requires.
pub(crate) struct MutableState {
    pub link_up: bool,
    pub as_capable: bool,
    pub as_capable_evaluated: bool,
    pub force_as_capable: bool,
    pub port_state: PortState,
    pub static_port_state: PortState,

    pub pdelay_sequence_id: u16,
    pub sync_count: u32,
    pub pdelay_count: u32,
    pub duplicate_resp_counter: u32,
    pub last_invalid_seqid: Option<u16>,
    pub link_up_count: u32,
    pub link_down_count: u32,

    pub log_sync_interval: LogInterval,
    pub log_announce_interval: LogInterval,
    pub log_min_mean_pdelay_req_interval: IntervalRequest,

    pub pdelay_started: bool,
    pub pdelay_halted: bool,
    pub sync_rate_interval_timer_started: bool,

    pub avb_sync_state: u8,
    pub station_state: StationState,
}

/// One Ethernet interface's gPTP port engine (spec §4.1).
pub struct Port<T: Transport, C: Clock, H: HardwareTimestamper, S: EventTimerScheduler> {
    pub(crate) port_identity: PortIdentity,
    pub(crate) descriptor: PortInitDescriptor,
    pub(crate) resolved: ResolvedIntervals,

    pub(crate) transport: Arc<T>,
    pub(crate) clock: Arc<C>,
    pub(crate) timestamper: Option<Arc<H>>,
    pub(crate) scheduler: Arc<S>,

    pub(crate) address_map: AddressMap,
    pub(crate) state: Mutex<MutableState>,
    pub(crate) pdelay_slots: Mutex<PdelaySlots>,
    pub(crate) last_sync: Mutex<PendingSlot<SyncMessage>>,
    #[allow(dead_code)]
    pub(crate) last_follow_up: Mutex<PendingSlot<FollowUpMessage>>,
    pub(crate) port_tx_lock: Mutex<()>,
    pub(crate) pdelay_interval_timer_lock: Mutex<()>,
    pub(crate) port_ready: (Mutex<bool>, Condvar),

    /// Lets a `&self` method reached from the receiver thread (there is no
    /// `Arc<Self>` in scope by the time a decoded message reaches a
    /// handler) re-enter `process_event`, which needs to hand itself to
    /// `spawn_workers` as an `Arc`.
    self_weak: OnceLock<Weak<Self>>,
}

/// Peer-delay exchanges required before `asCapable` is asserted (spec
/// §4.3: "implementation-specific threshold", resolved here per the Open
/// Question in spec §9(b)).
pub const PDELAY_AS_CAPABLE_THRESHOLD: u32 = 2;

impl<T: Transport + 'static, C: Clock + 'static, H: HardwareTimestamper + 'static, S: EventTimerScheduler + 'static>
    Port<T, C, H, S>
{
    pub fn new(
        descriptor: PortInitDescriptor,
        transport: Arc<T>,
        clock: Arc<C>,
        timestamper: Option<Arc<H>>,
        scheduler: Arc<S>,
    ) -> Arc<Self> {
        let resolved = ResolvedIntervals::from_descriptor(&descriptor);
        let port_identity = descriptor.port_identity;
        let static_port_state = if descriptor.static_port_state_master {
            PortState::Master
        } else {
            PortState::Slave
        };

        let state = MutableState {
            link_up: descriptor.initial_link_up,
            as_capable: descriptor.force_as_capable,
            as_capable_evaluated: false,
            force_as_capable: descriptor.force_as_capable,
            port_state: PortState::Initializing,
            static_port_state,
            pdelay_sequence_id: 0,
            sync_count: 0,
            pdelay_count: 0,
            duplicate_resp_counter: 0,
            last_invalid_seqid: None,
            link_up_count: 0,
            link_down_count: 0,
            log_sync_interval: resolved.initial_log_sync_interval,
            log_announce_interval: descriptor.log_announce_interval,
            log_min_mean_pdelay_req_interval: resolved.initial_log_pdelay_req_interval,
            pdelay_started: false,
            pdelay_halted: false,
            sync_rate_interval_timer_started: false,
            avb_sync_state: 0,
            station_state: StationState::Reserved,
        };

        let port = Arc::new(Self {
            port_identity,
            descriptor,
            resolved,
            transport,
            clock,
            timestamper,
            scheduler,
            address_map: AddressMap::new(),
            state: Mutex::new(state),
            pdelay_slots: Mutex::new(PdelaySlots::default()),
            last_sync: Mutex::new(PendingSlot::empty()),
            last_follow_up: Mutex::new(PendingSlot::empty()),
            port_tx_lock: Mutex::new(()),
            pdelay_interval_timer_lock: Mutex::new(()),
            port_ready: (Mutex::new(false), Condvar::new()),
            self_weak: OnceLock::new(),
        });

        let _ = port.self_weak.set(Arc::downgrade(&port));
        port
    }

    /// Recover an `Arc<Self>` from a `&self` call site (spec §4.5 message
    /// handlers run on the receiver thread with no `Arc` in scope).
    pub(crate) fn arc(&self) -> Arc<Self> {
        self.self_weak
            .get()
            .and_then(Weak::upgrade)
            .expect("self_weak is set by Port::new before any other method runs")
    }

    pub fn port_identity(&self) -> PortIdentity {
        self.port_identity
    }

    pub fn link_up(&self) -> bool {
        self.state.lock().unwrap().link_up
    }

    pub fn as_capable(&self) -> bool {
        self.state.lock().unwrap().as_capable
    }

    pub fn port_state(&self) -> PortState {
        self.state.lock().unwrap().port_state
    }

    pub fn station_state(&self) -> StationState {
        self.state.lock().unwrap().station_state
    }

    pub fn link_up_count(&self) -> u32 {
        self.state.lock().unwrap().link_up_count
    }

    pub fn link_down_count(&self) -> u32 {
        self.state.lock().unwrap().link_down_count
    }

    pub fn duplicate_resp_counter(&self) -> u32 {
        self.state.lock().unwrap().duplicate_resp_counter
    }

    pub fn pdelay_count(&self) -> u32 {
        self.state.lock().unwrap().pdelay_count
    }

    /// A no-op recovery hook, matching `EtherPort::recoverPort` in the
    /// original: a placeholder higher-level recovery logic can call into.
    pub fn recover_port(&self) {}
}
