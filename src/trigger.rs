/// Trigger sources for acquisition/broadcast transitions
///
/// Two producers feed the state machine: a command datagram parser and a
/// debounced edge signal. Both only set small flags; the main loop is the
/// sole reader and the sole place the flags are cleared.
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Deserialize;

// Recognized command strings
const COMMAND_READ_PROBES: &str = "readProbes";
const COMMAND_BROADCAST_READINGS: &str = "broadcastReadings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCommand {
    ReadProbes,
    BroadcastReadings,
}

#[derive(Debug, Deserialize)]
struct CommandMessage {
    command: String,
}

/// Parse an inbound command datagram
///
/// Recognizes exactly the two known command strings. Malformed payloads and
/// unknown commands return None so future commands pass through harmlessly.
pub fn parse_command(payload: &[u8]) -> Option<TriggerCommand> {
    let message: CommandMessage = serde_json::from_slice(payload).ok()?;
    match message.command.as_str() {
        COMMAND_READ_PROBES => Some(TriggerCommand::ReadProbes),
        COMMAND_BROADCAST_READINGS => Some(TriggerCommand::BroadcastReadings),
        _ => None,
    }
}

/// Pending trigger requests, consumed once per tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickEvents {
    pub acquire: bool,
    pub broadcast: bool,
    pub edge: bool,
}

impl TickEvents {
    pub fn is_empty(&self) -> bool {
        !self.acquire && !self.broadcast && !self.edge
    }
}

/// Single-writer flags shared between the producers and the main loop
#[derive(Debug, Default)]
pub struct TriggerFlags {
    acquire_requested: AtomicBool,
    broadcast_requested: AtomicBool,
    edge_pending: AtomicBool,
}

impl TriggerFlags {
    pub fn new() -> Self {
        TriggerFlags::default()
    }

    pub fn request(&self, command: TriggerCommand) {
        match command {
            TriggerCommand::ReadProbes => self.acquire_requested.store(true, Ordering::SeqCst),
            TriggerCommand::BroadcastReadings => {
                self.broadcast_requested.store(true, Ordering::SeqCst)
            }
        }
    }

    pub fn signal_edge(&self) {
        self.edge_pending.store(true, Ordering::SeqCst);
    }

    /// Read and clear all pending requests; only the main loop calls this
    pub fn take(&self) -> TickEvents {
        TickEvents {
            acquire: self.acquire_requested.swap(false, Ordering::SeqCst),
            broadcast: self.broadcast_requested.swap(false, Ordering::SeqCst),
            edge: self.edge_pending.swap(false, Ordering::SeqCst),
        }
    }
}

/// Debounce guard for the edge-triggered signal
///
/// Mechanical contacts bounce, so after an accepted edge the guard refuses
/// further edges until the re-arm delay has elapsed. Acceptance is a pure
/// guard condition on the event timestamp; the caller sets the shared flag
/// only when an edge is accepted.
pub struct EdgeDebounce {
    rearm_delay: Duration,
    last_accepted: Option<Instant>,
}

impl EdgeDebounce {
    pub fn new(rearm_delay: Duration) -> Self {
        EdgeDebounce {
            rearm_delay,
            last_accepted: None,
        }
    }

    /// Returns true if the edge at `now` is accepted
    pub fn accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.duration_since(last) < self.rearm_delay {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(
            parse_command(br#"{"command":"readProbes"}"#),
            Some(TriggerCommand::ReadProbes)
        );
        assert_eq!(
            parse_command(br#"{"command":"broadcastReadings"}"#),
            Some(TriggerCommand::BroadcastReadings)
        );
    }

    #[test]
    fn ignores_unknown_and_malformed_commands() {
        assert_eq!(parse_command(br#"{"command":"rebootProbes"}"#), None);
        assert_eq!(parse_command(br#"{"other":"readProbes"}"#), None);
        assert_eq!(parse_command(b"not json at all"), None);
        assert_eq!(parse_command(b""), None);
    }

    #[test]
    fn flags_are_read_and_cleared_together() {
        let flags = TriggerFlags::new();
        flags.request(TriggerCommand::ReadProbes);
        flags.signal_edge();

        let events = flags.take();
        assert!(events.acquire);
        assert!(events.edge);
        assert!(!events.broadcast);

        assert!(flags.take().is_empty());
    }

    #[test]
    fn debounce_rejects_edges_inside_rearm_window() {
        let mut debounce = EdgeDebounce::new(Duration::from_millis(50));
        let base = Instant::now();

        assert!(debounce.accept(base));
        assert!(!debounce.accept(base + Duration::from_millis(10)));
        assert!(!debounce.accept(base + Duration::from_millis(49)));
        assert!(debounce.accept(base + Duration::from_millis(50)));
        assert!(!debounce.accept(base + Duration::from_millis(60)));
    }
}
