/// Dual-destination broadcast of an averaged reading
use log::{error, info};

use super::handshake::RendezvousSession;
use super::messages::{ProbeReport, RendezvousMessage};
use super::transport::Datagrams;
use crate::config::NodeConfig;
use crate::models::AveragedWindow;

/// Per-destination send results for one drain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub primary_sent: bool,
    /// None when the secondary destination never came active
    pub secondary_sent: Option<bool>,
}

/// Transmit an averaged window to every active destination
///
/// The self-describing report always goes to the primary address; the
/// fixed-schema event record goes to the rendezvous peer only once the
/// handshake latched it. The two sends are independent: a failure on one is
/// reported and does not block the other, and nothing is retried within the
/// same drain. The next scheduled drain is the retry.
pub async fn broadcast_average<T: Datagrams>(
    transport: &T,
    config: &NodeConfig,
    session: &mut RendezvousSession,
    window: &AveragedWindow,
) -> BroadcastOutcome {
    let report = ProbeReport::from_window(
        window,
        &config.probe_name,
        config.probe_type,
        config.probe_sub_type,
        config.debug_broadcast,
    );

    let primary_sent = match serde_json::to_vec(&report) {
        Ok(payload) => match transport.send_to(&payload, config.primary_addr).await {
            Ok(()) => {
                info!(
                    "Broadcast {:.2} C ({} samples) to {}",
                    window.average, window.samples, config.primary_addr
                );
                true
            }
            Err(e) => {
                error!("Primary broadcast failed: {}", e);
                false
            }
        },
        Err(e) => {
            error!("Failed to encode probe report: {}", e);
            false
        }
    };

    let secondary_sent = match session.peer() {
        Some(peer) if session.secondary_active() => {
            let message =
                RendezvousMessage::temperature(&config.probe_serial, session.next_epoch(), window.average);
            let sent = match serde_json::to_vec(&message) {
                Ok(payload) => match transport.send_to(&payload, peer).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!("Secondary broadcast failed: {}", e);
                        false
                    }
                },
                Err(e) => {
                    error!("Failed to encode event record: {}", e);
                    false
                }
            };
            Some(sent)
        }
        _ => None,
    };

    BroadcastOutcome {
        primary_sent,
        secondary_sent,
    }
}
