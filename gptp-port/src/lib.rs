//! Ethernet port engine for a gPTP (IEEE 802.1AS) time-aware system.
//!
//! This crate implements the per-interface protocol state machine: Pdelay
//! measurement, Sync/FollowUp emission and reception, the event dispatcher
//! that times it all, and the automotive-profile signalling overlay. The
//! best-master-clock algorithm, the OS network/timestamper backends, and
//! message byte-level codecs beyond what this crate needs to exercise
//! itself are external collaborators, supplied through the traits in
//! [`clock`], [`transport`], [`timestamper`], and [`scheduler`].

pub mod address_map;
pub mod automotive;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod messages;
pub mod pending;
pub mod port;
pub mod scheduler;
pub mod time;
pub mod timestamper;
pub mod transport;

pub use clock::Clock;
pub use config::PortInitDescriptor;
pub use error::PortError;
pub use port::{Port, PortState};
pub use scheduler::{Event, EventTimerScheduler};
pub use timestamper::HardwareTimestamper;
pub use transport::Transport;
