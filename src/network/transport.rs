/// Datagram transport abstraction and its UDP implementation
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;

/// Largest datagram the node sends or accepts
pub const MAX_DATAGRAM_BYTES: usize = 2048;

/// Send/receive abstraction consumed by the handshake and broadcast paths
///
/// Receive is bounded: `Ok(None)` means the wait elapsed with no datagram.
pub trait Datagrams {
    async fn send_to(&self, payload: &[u8], destination: SocketAddr) -> Result<(), String>;
    async fn recv_from(
        &self,
        buffer: &mut [u8],
        wait: Duration,
    ) -> Result<Option<(usize, SocketAddr)>, String>;
}

pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind an outbound socket with broadcast permission
    ///
    /// Used for the handshake exchange and both broadcast destinations; the
    /// rendezvous peer replies to this socket's source address.
    pub async fn bind(local: SocketAddr) -> Result<Self, String> {
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| format!("Failed to bind {}: {}", local, e))?;
        socket
            .set_broadcast(true)
            .map_err(|e| format!("Failed to enable broadcast: {}", e))?;
        Ok(UdpTransport { socket })
    }

    /// Bind the command listener, joining the group for multicast addresses
    pub async fn bind_listener(listen: SocketAddr) -> Result<Self, String> {
        let local = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), listen.port());
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| format!("Failed to bind listener {}: {}", local, e))?;

        if let SocketAddr::V4(addr) = listen {
            if addr.ip().is_multicast() {
                socket
                    .join_multicast_v4(*addr.ip(), Ipv4Addr::UNSPECIFIED)
                    .map_err(|e| format!("Failed to join multicast group {}: {}", addr.ip(), e))?;
            }
        }

        Ok(UdpTransport { socket })
    }
}

impl Datagrams for UdpTransport {
    async fn send_to(&self, payload: &[u8], destination: SocketAddr) -> Result<(), String> {
        self.socket
            .send_to(payload, destination)
            .await
            .map(|_| ())
            .map_err(|e| format!("Send to {} failed: {}", destination, e))
    }

    async fn recv_from(
        &self,
        buffer: &mut [u8],
        wait: Duration,
    ) -> Result<Option<(usize, SocketAddr)>, String> {
        match tokio::time::timeout(wait, self.socket.recv_from(buffer)).await {
            Ok(Ok((len, from))) => Ok(Some((len, from))),
            Ok(Err(e)) => Err(format!("Receive failed: {}", e)),
            Err(_) => Ok(None),
        }
    }
}
