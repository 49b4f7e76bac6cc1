//! Linux daemon support crate: CLI, configuration, and the platform
//! collaborators (`Clock`, `Transport`, `EventTimerScheduler`) that plug
//! into `gptp_port::Port`.

pub mod clock;
pub mod config;
pub mod network;
pub mod scheduler;
pub mod socket;

use tracing_log::AsTrace;

/// Install a `tracing-subscriber` fmt subscriber at `level`, bridging
/// `log` records through `tracing-log` so that `gptp_port`'s `log::*!`
/// call sites are captured too.
pub fn setup_logger(level: log::LevelFilter) {
    tracing_log::LogTracer::init().ok();
    tracing_subscriber::fmt()
        .with_max_level(level.as_trace())
        .with_ansi(true)
        .init();
}
