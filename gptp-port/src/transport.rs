//! The raw-Ethernet transport collaborator (spec §4.5, §6).

use crate::identity::LinkLayerAddress;

/// The three fixed multicast groups compiled into the transport layer
/// (spec §4.5, §6). Concrete MAC addresses are the IEEE 802.1AS-2020
/// defaults; implementations of [`Transport`] are expected to join them.
pub const PDELAY_MULTICAST: LinkLayerAddress = LinkLayerAddress::new([0x01, 0x80, 0xC2, 0x00, 0x00, 0x0E]);
pub const OTHER_MULTICAST: LinkLayerAddress = LinkLayerAddress::new([0x01, 0x1B, 0x19, 0x00, 0x00, 0x00]);
pub const TEST_STATUS_MULTICAST: LinkLayerAddress = LinkLayerAddress::new([0x01, 0x80, 0xC2, 0x00, 0x00, 0x0F]);

/// Which multicast group (if any) a frame should be sent to (spec §4.5
/// `port_send`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulticastType {
    None,
    Pdelay,
    Other,
    TestStatus,
}

impl MulticastType {
    pub fn address(self) -> Option<LinkLayerAddress> {
        match self {
            MulticastType::None => None,
            MulticastType::Pdelay => Some(PDELAY_MULTICAST),
            MulticastType::Other => Some(OTHER_MULTICAST),
            MulticastType::TestStatus => Some(TEST_STATUS_MULTICAST),
        }
    }
}

/// Outcome of a single [`Transport::recv`] call (spec §6).
pub enum RecvOutcome {
    /// A frame was received from `remote`, `length` bytes into the caller's
    /// buffer, over a link running at `link_speed` (used for PHY RX
    /// compensation lookups).
    Received {
        remote: LinkLayerAddress,
        length: usize,
        link_speed: u32,
    },
    /// Nothing usable arrived (e.g. a non-gPTP frame); the receiver loop
    /// continues without action.
    SoftFail,
    /// A fatal read error. The receiver loop posts `FAULT_DETECTED`.
    Fatal,
}

/// The raw-Ethernet send/receive primitive for one interface.
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Block until a frame arrives or the transport fails.
    fn recv(&self, buf: &mut [u8]) -> RecvOutcome;

    /// Send `data` to `dest` using `ether_type`. `timestamp_requested`
    /// asks the transport to hardware-timestamp the TX if possible.
    fn send(
        &self,
        dest: LinkLayerAddress,
        ether_type: u16,
        data: &[u8],
        timestamp_requested: bool,
    ) -> Result<(), Self::Error>;

    /// Current link carrier state, polled by the link watcher.
    fn link_up(&self) -> bool;

    /// Current link speed in Mbps, used for PHY compensation lookups.
    fn link_speed(&self) -> u32;
}
