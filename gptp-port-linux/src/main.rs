use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use gptp_port::identity::ClockIdentity;
use gptp_port::timestamper::SystemClockTimestamper;
use gptp_port::{Event, Port};

use gptp_port_linux::clock::LinuxClock;
use gptp_port_linux::config::Config;
use gptp_port_linux::network::RawEthernetTransport;
use gptp_port_linux::scheduler::LinuxScheduler;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Set desired logging level
    #[clap(short, long, default_value_t = log::LevelFilter::Info)]
    loglevel: log::LevelFilter,

    /// Path to the daemon's TOML configuration file
    #[clap(short, long, default_value = "/etc/gptpd/gptpd.toml")]
    config: PathBuf,
}

fn main() {
    let args = Args::parse();
    gptp_port_linux::setup_logger(args.loglevel);

    let config = Config::from_file(&args.config).unwrap_or_else(|e| {
        log::error!("could not read config {}: {e}", args.config.display());
        std::process::exit(1);
    });

    let mut join_handles = Vec::new();

    for port_config in config.ports {
        let interface = port_config.interface.clone();

        let clock_identity = config.clock_identity.unwrap_or_else(|| {
            gptp_port_linux::socket::interface_mac_address(&interface)
                .map(ClockIdentity::from_mac_address)
                .unwrap_or_else(|e| {
                    log::warn!("could not read MAC address of {interface}: {e}, using an unknown identity");
                    ClockIdentity::UNKNOWN
                })
        });

        let clock = Arc::new(LinuxClock::new(clock_identity, config.priority1, config.priority2));
        let transport = Arc::new(RawEthernetTransport::open(&interface).unwrap_or_else(|e| {
            log::error!("could not open interface {interface}: {e}");
            std::process::exit(1);
        }));
        let timestamper = Arc::new(SystemClockTimestamper::new(Arc::clone(&clock)));
        let scheduler = Arc::new(LinuxScheduler::new());

        let descriptor = port_config.into_descriptor(clock_identity);

        let port = Port::new(
            descriptor,
            Arc::clone(&transport),
            Arc::clone(&clock),
            Some(Arc::clone(&timestamper)),
            Arc::clone(&scheduler),
        );

        let bound_port = Arc::clone(&port);
        scheduler.bind(move |event| {
            bound_port.process_event(event);
        });

        port.process_event(Event::PowerUp);

        log::info!("gptp port up on {interface} as {:?}", port.port_identity());
        join_handles.push(port);
    }

    if join_handles.is_empty() {
        log::warn!("no ports started, exiting");
        return;
    }

    // The port engine's own worker threads (receiver, link watcher, timer
    // sleepers) run detached; park the main thread for the daemon's life.
    loop {
        std::thread::park();
    }
}
