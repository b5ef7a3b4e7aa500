/// Node configuration loaded from the environment
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub probe_name: String,
    pub probe_serial: String,
    pub probe_type: u32,
    pub probe_sub_type: u32,
    pub primary_addr: SocketAddr,
    pub rendezvous_addr: SocketAddr,
    pub command_addr: SocketAddr,
    pub sample_interval: Duration,
    pub buffer_capacity: usize,
    pub debug_broadcast: bool,
    pub cold_junction_path: String,
    pub probe_path: String,
    pub supply_voltage: f64,
}

impl NodeConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let probe_name =
            env::var("PROBE_NAME").map_err(|_| "PROBE_NAME environment variable not set")?;
        let probe_serial =
            env::var("PROBE_SERIAL").map_err(|_| "PROBE_SERIAL environment variable not set")?;
        let probe_type = parse_or_default("PROBE_TYPE", 1u32)?;
        let probe_sub_type = parse_or_default("PROBE_SUB_TYPE", 0u32)?;

        let primary_addr = parse_addr("BROADCAST_ADDR")?;
        let rendezvous_addr = parse_addr("RENDEZVOUS_ADDR")?;
        let command_addr = parse_addr("COMMAND_ADDR")?;

        let sample_interval = Duration::from_millis(parse_or_default("SAMPLE_INTERVAL_MS", 1000u64)?);
        let drain_interval = Duration::from_secs(parse_or_default("DRAIN_INTERVAL_SECS", 60u64)?);
        if sample_interval.is_zero() {
            return Err("SAMPLE_INTERVAL_MS must be greater than zero".into());
        }
        let buffer_capacity = derive_capacity(sample_interval, drain_interval);

        let debug_broadcast = env::var("DEBUG_BROADCAST")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let cold_junction_path = env::var("COLD_JUNCTION_PATH")
            .map_err(|_| "COLD_JUNCTION_PATH environment variable not set")?;
        let probe_path =
            env::var("PROBE_PATH").map_err(|_| "PROBE_PATH environment variable not set")?;
        let supply_voltage = parse_or_default("SUPPLY_VOLTAGE", 3.3f64)?;

        Ok(NodeConfig {
            probe_name,
            probe_serial,
            probe_type,
            probe_sub_type,
            primary_addr,
            rendezvous_addr,
            command_addr,
            sample_interval,
            buffer_capacity,
            debug_broadcast,
            cold_junction_path,
            probe_path,
            supply_voltage,
        })
    }
}

fn parse_addr(name: &str) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    let value = env::var(name).map_err(|_| format!("{} environment variable not set", name))?;
    let addr = value
        .parse()
        .map_err(|_| format!("{} is not a valid socket address: {}", name, value))?;
    Ok(addr)
}

fn parse_or_default<T: std::str::FromStr>(
    name: &str,
    default: T,
) -> Result<T, Box<dyn std::error::Error>> {
    match env::var(name) {
        Ok(value) => {
            let parsed = value
                .trim()
                .parse()
                .map_err(|_| format!("{} is not a valid value: {}", name, value))?;
            Ok(parsed)
        }
        Err(_) => Ok(default),
    }
}

/// Accumulator capacity: expected drain interval over sample interval,
/// plus a 25% safety margin so a late drain wraps instead of truncating
pub(crate) fn derive_capacity(sample_interval: Duration, drain_interval: Duration) -> usize {
    let ticks = (drain_interval.as_millis() / sample_interval.as_millis()).max(1) as usize;
    ticks + ticks / 4
}
