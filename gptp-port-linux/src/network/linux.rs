//! `gptp_port::Transport` over a raw Ethernet interface.

use gptp_port::identity::LinkLayerAddress;
use gptp_port::transport::{PDELAY_MULTICAST, OTHER_MULTICAST, TEST_STATUS_MULTICAST};
use gptp_port::{Transport, transport::RecvOutcome};

use crate::socket::RawEthernetSocket;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("could not open interface {interface}: {source}")]
    Open {
        interface: String,
        #[source]
        source: std::io::Error,
    },
    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),
}

/// One interface's raw-Ethernet transport. Joins the three multicast groups
/// the port engine relies on (spec §4.5) at construction time.
pub struct RawEthernetTransport {
    socket: RawEthernetSocket,
    link_speed_mbps: u32,
}

impl RawEthernetTransport {
    pub fn open(interface: &str) -> Result<Self, TransportError> {
        let socket = RawEthernetSocket::open(interface).map_err(|source| TransportError::Open {
            interface: interface.to_string(),
            source,
        })?;

        for group in [PDELAY_MULTICAST, OTHER_MULTICAST, TEST_STATUS_MULTICAST] {
            if let Err(err) = socket.join_multicast(group) {
                log::warn!("failed to join multicast group {group} on {interface}: {err}");
            }
        }

        Ok(Self {
            socket,
            // A full ethtool SIOCETHTOOL round trip is out of scope here;
            // gigabit is the common case and PHY compensation tables are
            // looked up per nominal speed rather than per exact value.
            link_speed_mbps: 1000,
        })
    }
}

impl Transport for RawEthernetTransport {
    type Error = TransportError;

    fn recv(&self, buf: &mut [u8]) -> RecvOutcome {
        match self.socket.recv(buf) {
            Ok((length, remote)) => RecvOutcome::Received {
                remote,
                length,
                link_speed: self.link_speed_mbps,
            },
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => RecvOutcome::SoftFail,
            Err(err) => {
                log::error!("transport recv failed: {err}");
                RecvOutcome::Fatal
            }
        }
    }

    fn send(
        &self,
        dest: LinkLayerAddress,
        ether_type: u16,
        data: &[u8],
        _timestamp_requested: bool,
    ) -> Result<(), Self::Error> {
        self.socket
            .send(dest, ether_type, data)
            .map_err(TransportError::Send)
    }

    fn link_up(&self) -> bool {
        self.socket.link_up()
    }

    fn link_speed(&self) -> u32 {
        self.link_speed_mbps
    }
}
