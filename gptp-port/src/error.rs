//! Error kinds for the port engine (spec §7).

use thiserror::Error;

/// Errors the dispatcher and message handlers can produce. Most are
/// recovered from locally; only [`PortError::Fault`] is expected to cross
/// back out to the event dispatcher as a `FAULT_DETECTED` event.
#[derive(Debug, Error)]
pub enum PortError {
    /// Decode failure, or a duplicate/out-of-order sequence id. The message
    /// is dropped, counters are incremented, and no state changes.
    #[error("transient message error: {0}")]
    TransientMessage(&'static str),

    /// A sync- or pdelay-response-receipt timer expired.
    #[error("timer miss: {0}")]
    TimerMiss(&'static str),

    /// The peer is misbehaving; Pdelay is halted for a cooldown period.
    #[error("peer misbehaving: {0}")]
    PeerMisbehaving(&'static str),

    /// A fatal network read error. Surfaces as `FAULT_DETECTED`.
    #[error("fault: {0}")]
    Fault(&'static str),

    /// A programming-error-level invariant violation. Deferred Pdelay
    /// processing with no pending follow-up falls in this category and is
    /// expected to abort the process, matching the original's `abort()`.
    #[error("invariant violation: {0}")]
    Invariant(&'static str),
}
