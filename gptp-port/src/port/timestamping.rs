//! Timestamping adapter (spec §4.6).

use super::Port;
use crate::clock::Clock;
use crate::messages::MessageId;
use crate::scheduler::EventTimerScheduler;
use crate::timestamper::HardwareTimestamper;
use crate::time::Timestamp;
use crate::transport::Transport;

impl<T: Transport, C: Clock, H: HardwareTimestamper, S: EventTimerScheduler> Port<T, C, H, S> {
    /// Retrieve a TX timestamp for `message_id`. Delegates to the hardware
    /// timestamper when one is attached; otherwise synthesizes the system
    /// clock's current time (spec §4.6).
    pub(crate) fn get_tx_timestamp(&self, message_id: MessageId, last: bool) -> Option<(Timestamp, u32)> {
        match &self.timestamper {
            Some(hw) => hw.tx_timestamp(self.port_identity, message_id, last),
            None => Some((self.clock.system_time(), 0)),
        }
    }

    /// Retrieve an RX timestamp for `message_id`, same fallback policy as
    /// [`Self::get_tx_timestamp`].
    pub(crate) fn get_rx_timestamp(&self, message_id: MessageId, last: bool) -> Option<(Timestamp, u32)> {
        match &self.timestamper {
            Some(hw) => hw.rx_timestamp(self.port_identity, message_id, last),
            None => Some((self.clock.system_time(), 0)),
        }
    }

    /// Link-speed-dependent latency to subtract from RX event-message
    /// timestamps (spec §4.5 `processMessage`).
    pub(crate) fn rx_phy_delay(&self, link_speed: u32) -> core::time::Duration {
        match &self.timestamper {
            Some(hw) => hw.rx_phy_delay(link_speed),
            None => core::time::Duration::ZERO,
        }
    }
}
