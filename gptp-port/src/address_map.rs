//! Peer address bookkeeping (spec §3, §4.5).
//!
//! Port-private: populated by the receiver when a message's source port
//! identity is observed, consulted by the sender to resolve a unicast
//! destination for a reply.

use crate::identity::{LinkLayerAddress, PortIdentity};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct AddressMap {
    inner: Mutex<HashMap<PortIdentity, LinkLayerAddress>>,
}

impl AddressMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, port_identity: PortIdentity, address: LinkLayerAddress) {
        self.inner.lock().unwrap().insert(port_identity, address);
    }

    pub fn lookup(&self, port_identity: &PortIdentity) -> Option<LinkLayerAddress> {
        self.inner.lock().unwrap().get(port_identity).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ClockIdentity;

    #[test]
    fn round_trips_through_insert_and_lookup() {
        let map = AddressMap::new();
        let id = PortIdentity::new(ClockIdentity([1; 8]), 1);
        let addr = LinkLayerAddress::new([1, 2, 3, 4, 5, 6]);
        assert!(map.lookup(&id).is_none());
        map.insert(id, addr);
        assert_eq!(map.lookup(&id), Some(addr));
    }
}
