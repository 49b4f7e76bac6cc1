//! Automotive-profile signalling overlay (spec §4.7).
//!
//! Kept as a small set of policy hooks invoked from the dispatcher (spec
//! §9 DESIGN NOTES) rather than scattered across the event handler.

/// Published port station state under the automotive profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationState {
    Reserved,
    EthernetReady,
    AvbSync,
}

/// Starting `avbSyncState` countdown for a role. The source comment says to
/// start at 2 for MASTER, decrementing after each sync; the deployed value
/// is 1. We follow the deployed value (spec §9, Open Question (a)).
pub fn initial_avb_sync_state(is_master: bool) -> u8 {
    if is_master {
        1
    } else {
        2
    }
}

/// One decrement of `avbSyncState`. Returns the new value; the caller
/// transitions to [`StationState::AvbSync`] when this reaches 0.
pub fn decrement_avb_sync_state(current: u8) -> u8 {
    current.saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_starts_at_one_slave_at_two() {
        assert_eq!(initial_avb_sync_state(true), 1);
        assert_eq!(initial_avb_sync_state(false), 2);
    }

    #[test]
    fn decrement_reaches_zero() {
        let mut state = initial_avb_sync_state(true);
        state = decrement_avb_sync_state(state);
        assert_eq!(state, 0);
    }
}
