mod accumulator;
mod config;
mod linearize;
mod machine;
mod models;
mod network;
mod sensor;
mod trigger;
mod utils;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{sleep, Duration};

use config::NodeConfig;
use machine::ProbeStateMachine;
use network::broadcast::broadcast_average;
use network::handshake::run_handshake;
use network::transport::{Datagrams, UdpTransport, MAX_DATAGRAM_BYTES};
use sensor::HwmonProbe;
use trigger::{parse_command, EdgeDebounce, TriggerFlags};

// Re-arm delay for the physical edge signal; metal contacts bounce slowly
const EDGE_REARM_DELAY: Duration = Duration::from_millis(250);
const COMMAND_LISTEN_WAIT: Duration = Duration::from_secs(3600);

async fn main_loop(config: NodeConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting thermocouple probe node");

    let transport = UdpTransport::bind("0.0.0.0:0".parse()?).await?;

    // One-time negotiation of the secondary destination, before any acquisition
    let mut session = run_handshake(&transport, config.rendezvous_addr, &config.probe_serial).await;

    let flags = Arc::new(TriggerFlags::new());

    let command_flags = Arc::clone(&flags);
    let command_addr = config.command_addr;
    tokio::spawn(async move {
        if let Err(e) = command_listener(command_addr, command_flags).await {
            error!("Command listener stopped: {}", e);
        }
    });

    let edge_flags = Arc::clone(&flags);
    tokio::spawn(async move {
        if let Err(e) = edge_listener(edge_flags).await {
            error!("Edge listener stopped: {}", e);
        }
    });

    let mut probe = HwmonProbe::new(
        config.cold_junction_path.clone(),
        config.probe_path.clone(),
        config.supply_voltage,
    );
    let mut machine = ProbeStateMachine::new(config.buffer_capacity);

    info!(
        "Accumulator capacity {} readings, sampling every {:?}",
        config.buffer_capacity, config.sample_interval
    );

    loop {
        sleep(config.sample_interval).await;

        let events = flags.take();
        if !events.is_empty() {
            debug!(
                "Trigger events: acquire={} broadcast={} edge={}",
                events.acquire, events.broadcast, events.edge
            );
        }

        if let Some(window) = machine.tick(events, &mut probe).await {
            let outcome = broadcast_average(&transport, &config, &mut session, &window).await;

            info!("Summary for {}:", config.probe_name);
            info!("  Average temperature: {:.2}°C", window.average);
            info!(
                "  Cold junction: {:.2}..{:.2}°C",
                window.diagnostics.min_internal, window.diagnostics.max_internal
            );
            info!("  Based on {} samples", window.samples);

            if !outcome.primary_sent || outcome.secondary_sent == Some(false) {
                warn!("One or more destinations failed; the next drain is the retry");
            }
        }
    }
}

/// Receive command datagrams and raise the matching trigger flags
///
/// Unrecognized or malformed payloads are dropped without comment so future
/// commands pass through harmlessly.
async fn command_listener(listen: SocketAddr, flags: Arc<TriggerFlags>) -> Result<(), String> {
    let transport = UdpTransport::bind_listener(listen).await?;
    let mut buffer = [0u8; MAX_DATAGRAM_BYTES];
    info!("Listening for commands on {}", listen);

    loop {
        match transport.recv_from(&mut buffer, COMMAND_LISTEN_WAIT).await {
            Ok(Some((len, from))) => {
                if let Some(command) = parse_command(&buffer[..len]) {
                    debug!("Command {:?} from {}", command, from);
                    flags.request(command);
                }
            }
            Ok(None) => {}
            Err(e) => return Err(e),
        }
    }
}

/// Treat SIGUSR1 as the physical edge signal from the companion trigger
///
/// The debounce guard keeps at most one edge outstanding per re-arm window;
/// the main loop is the only consumer of the flag it raises.
async fn edge_listener(flags: Arc<TriggerFlags>) -> Result<(), String> {
    let mut edges = signal(SignalKind::user_defined1())
        .map_err(|e| format!("Failed to install edge signal handler: {}", e))?;
    let mut debounce = EdgeDebounce::new(EDGE_REARM_DELAY);

    while edges.recv().await.is_some() {
        if debounce.accept(Instant::now()) {
            flags.signal_edge();
        } else {
            debug!("Edge ignored inside re-arm window");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match NodeConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        let _ = tx.send(());
    });

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = main_loop(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
