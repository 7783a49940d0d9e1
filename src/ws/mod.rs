//! Peer and control sockets

pub mod handler;
pub mod protocol;
pub mod transport;
