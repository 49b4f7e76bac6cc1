//! The hardware timestamper collaborator (spec §4.6, §6).

use crate::identity::PortIdentity;
use crate::messages::MessageId;
use crate::time::Timestamp;

/// A hardware (or software-emulated) timestamper attached to the
/// interface. Optional in the sense that a port can run with a fallback
/// that synthesizes timestamps from the system clock (spec §4.6).
pub trait HardwareTimestamper: Send + Sync {
    /// Retrieve the TX timestamp for a previously sent event message.
    /// `last` indicates this is the final retry in a retrieval sequence.
    /// Returns the timestamp and a vendor-specific counter value.
    fn tx_timestamp(
        &self,
        port_identity: PortIdentity,
        message_id: MessageId,
        last: bool,
    ) -> Option<(Timestamp, u32)>;

    /// Retrieve the RX timestamp for a just-received event message.
    fn rx_timestamp(
        &self,
        port_identity: PortIdentity,
        message_id: MessageId,
        last: bool,
    ) -> Option<(Timestamp, u32)>;

    /// Reset internal retrieval state, called on LINKUP (spec §4.2).
    fn reset(&self);

    /// Fixed link-speed-dependent latency to subtract from RX timestamps
    /// (PHY compensation, spec §4.5 `processMessage`).
    fn rx_phy_delay(&self, link_speed: u32) -> core::time::Duration;
}

/// Fallback used when no hardware timestamper is attached: timestamps are
/// synthesized from the system clock and PHY compensation is zero (spec
/// §4.6: "Otherwise, synthesize ts = clock.systemTime()").
pub struct SystemClockTimestamper<C> {
    clock: std::sync::Arc<C>,
}

impl<C> SystemClockTimestamper<C> {
    pub fn new(clock: std::sync::Arc<C>) -> Self {
        Self { clock }
    }
}

impl<C: crate::clock::Clock> HardwareTimestamper for SystemClockTimestamper<C> {
    fn tx_timestamp(
        &self,
        _port_identity: PortIdentity,
        _message_id: MessageId,
        _last: bool,
    ) -> Option<(Timestamp, u32)> {
        Some((self.clock.system_time(), 0))
    }

    fn rx_timestamp(
        &self,
        _port_identity: PortIdentity,
        _message_id: MessageId,
        _last: bool,
    ) -> Option<(Timestamp, u32)> {
        Some((self.clock.system_time(), 0))
    }

    fn reset(&self) {}

    fn rx_phy_delay(&self, _link_speed: u32) -> core::time::Duration {
        core::time::Duration::ZERO
    }
}
