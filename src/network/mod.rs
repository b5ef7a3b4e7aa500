pub mod broadcast;
pub mod handshake;
pub mod messages;
pub mod transport;
