/// Startup handshake for the secondary broadcast destination
use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::time::Instant;

use super::messages::RendezvousMessage;
use super::transport::{Datagrams, MAX_DATAGRAM_BYTES};

pub const MAX_LISTEN_ATTEMPTS: u32 = 5;
pub const BASE_LISTEN_DELAY: Duration = Duration::from_millis(500);

/// State negotiated once at startup and consumed for the process lifetime
///
/// The epoch counter advances on every outbound rendezvous message and is
/// never reset; wrap-around is statistically irrelevant for a u64.
pub struct RendezvousSession {
    epoch: u64,
    peer: Option<SocketAddr>,
    secondary_active: bool,
}

impl RendezvousSession {
    pub fn new() -> Self {
        RendezvousSession {
            epoch: 0,
            peer: None,
            secondary_active: false,
        }
    }

    /// Current epoch, then advance
    pub fn next_epoch(&mut self) -> u64 {
        let epoch = self.epoch;
        self.epoch += 1;
        epoch
    }

    pub fn secondary_active(&self) -> bool {
        self.secondary_active
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl Default for RendezvousSession {
    fn default() -> Self {
        RendezvousSession::new()
    }
}

/// Negotiate the secondary destination once, before acquisition starts
///
/// Sends a single synchronize message to the rendezvous address and listens
/// for an acknowledgment. Each failed listen attempt doubles the wait,
/// starting from a small base; other traffic arriving inside a window is
/// logged and does not consume an attempt. Exhausting the budget leaves the
/// secondary destination disabled for the process lifetime, which is a
/// degraded mode rather than a startup failure.
pub async fn run_handshake<T: Datagrams>(
    transport: &T,
    rendezvous: SocketAddr,
    serial: &str,
) -> RendezvousSession {
    let mut session = RendezvousSession::new();

    let synchronize = RendezvousMessage::synchronize(serial, session.next_epoch());
    let payload = match serde_json::to_vec(&synchronize) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to encode synchronize message: {}", e);
            return session;
        }
    };

    info!("Sending synchronize message to {}", rendezvous);
    if let Err(e) = transport.send_to(&payload, rendezvous).await {
        error!("Failed to send synchronize message: {}", e);
        return session;
    }

    let mut delay = BASE_LISTEN_DELAY;
    for attempt in 1..=MAX_LISTEN_ATTEMPTS {
        if let Some(peer) = listen_for_acknowledge(transport, delay).await {
            info!("Acknowledged by {}; secondary destination active", peer);
            session.peer = Some(peer);
            session.secondary_active = true;
            return session;
        }
        debug!(
            "No acknowledgment within {:?} (attempt {}/{})",
            delay, attempt, MAX_LISTEN_ATTEMPTS
        );
        delay *= 2;
    }

    warn!(
        "Handshake exhausted {} attempts; broadcasting to primary destination only",
        MAX_LISTEN_ATTEMPTS
    );
    session
}

/// Listen for an acknowledgment during one backoff window
///
/// Foreign datagrams, well-formed or not, keep the window open; only the
/// window elapsing ends the attempt.
async fn listen_for_acknowledge<T: Datagrams>(transport: &T, window: Duration) -> Option<SocketAddr> {
    let deadline = Instant::now() + window;
    let mut buffer = [0u8; MAX_DATAGRAM_BYTES];
    let mut wait = window;

    loop {
        match transport.recv_from(&mut buffer, wait).await {
            Ok(Some((len, from))) => match serde_json::from_slice::<RendezvousMessage>(&buffer[..len]) {
                Ok(message) if message.is_acknowledge() => return Some(from),
                Ok(_) => debug!("Ignoring non-acknowledge message from {}", from),
                Err(e) => debug!("Ignoring unparseable datagram from {}: {}", from, e),
            },
            Ok(None) => return None,
            Err(e) => {
                error!("Receive error while waiting for acknowledgment: {}", e);
                return None;
            }
        }

        wait = deadline.saturating_duration_since(Instant::now());
        if wait.is_zero() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::transport::testing::{RecvStep, ScriptedTransport};

    fn rendezvous() -> SocketAddr {
        "192.0.2.10:5151".parse().unwrap()
    }

    fn peer() -> SocketAddr {
        "192.0.2.20:5151".parse().unwrap()
    }

    fn acknowledge_payload() -> Vec<u8> {
        br#"{"RPVersion":"1.1","RPSerial":"hub","RPEpoch":3,"RPPayload":[{"RPEventType":"acknowledge"}]}"#
            .to_vec()
    }

    #[tokio::test]
    async fn silent_peer_exhausts_attempts_with_doubling_delays() {
        let transport = ScriptedTransport::new();

        let session = run_handshake(&transport, rendezvous(), "probe-01").await;

        assert!(!session.secondary_active());
        assert_eq!(session.peer(), None);
        assert_eq!(transport.sent_to(rendezvous()).len(), 1);

        let waits = transport.recv_waits.lock().unwrap().clone();
        assert_eq!(
            waits,
            vec![
                BASE_LISTEN_DELAY,
                BASE_LISTEN_DELAY * 2,
                BASE_LISTEN_DELAY * 4,
                BASE_LISTEN_DELAY * 8,
                BASE_LISTEN_DELAY * 16,
            ]
        );
    }

    #[tokio::test]
    async fn acknowledge_latches_the_peer_address() {
        let transport = ScriptedTransport::new();
        transport.script_recv(vec![
            RecvStep::Timeout,
            RecvStep::Datagram(acknowledge_payload(), peer()),
        ]);

        let session = run_handshake(&transport, rendezvous(), "probe-01").await;

        assert!(session.secondary_active());
        assert_eq!(session.peer(), Some(peer()));
        assert_eq!(transport.recv_waits.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn foreign_traffic_does_not_consume_an_attempt() {
        let transport = ScriptedTransport::new();
        transport.script_recv(vec![
            RecvStep::Datagram(b"garbage".to_vec(), peer()),
            RecvStep::Datagram(
                serde_json::to_vec(&RendezvousMessage::temperature("other", 1, 20.0)).unwrap(),
                peer(),
            ),
            RecvStep::Datagram(acknowledge_payload(), peer()),
        ]);

        let session = run_handshake(&transport, rendezvous(), "probe-01").await;

        // All three datagrams arrived inside the first listen window
        assert!(session.secondary_active());
        let waits = transport.recv_waits.lock().unwrap().clone();
        assert_eq!(waits.len(), 3);
        assert_eq!(waits[0], BASE_LISTEN_DELAY);
        assert!(waits[1] <= BASE_LISTEN_DELAY);
        assert!(waits[2] <= BASE_LISTEN_DELAY);
    }

    #[tokio::test]
    async fn synchronize_send_failure_disables_the_secondary() {
        let transport = ScriptedTransport::new();
        transport.fail_sends_to(rendezvous());

        let session = run_handshake(&transport, rendezvous(), "probe-01").await;

        assert!(!session.secondary_active());
        assert!(transport.recv_waits.lock().unwrap().is_empty());
    }

    #[test]
    fn epoch_advances_on_every_outbound_message() {
        let mut session = RendezvousSession::new();
        assert_eq!(session.next_epoch(), 0);
        assert_eq!(session.next_epoch(), 1);
        assert_eq!(session.next_epoch(), 2);
    }
}
