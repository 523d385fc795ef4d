//! Transport module - moving packages between peers.
//!
//! Provides:
//! - [`Transport`]: send a package to a peer, receive the next package with
//!   its sender, report the local address
//! - [`UdpTransport`]: one package per UDP datagram
//! - [`MemoryTransport`]: an in-process pair over channels, for tests and
//!   wiring components together without sockets
//!
//! Receive errors come in two flavours. [`OscError::Malformed`] means one
//! datagram could not be decoded; the transport is still healthy and the
//! caller should keep receiving. Anything else ends the transport.

mod memory;
mod udp;

use std::net::SocketAddr;

use crate::error::{OscError, Result};
use crate::handler::BoxFuture;
use crate::protocol::Package;

pub use memory::MemoryTransport;
pub use udp::UdpTransport;

/// Default receive buffer size in bytes.
///
/// Datagrams longer than the receive buffer are rejected as malformed, even
/// when the part that fits would decode.
pub const DEFAULT_BUFFER_SIZE: usize = 512;

/// A package-oriented, unreliable transport.
///
/// Both methods take `&self` so one transport can be shared through an
/// `Arc` between a receive loop and any number of senders.
pub trait Transport: Send + Sync + 'static {
    /// Encode `package` and deliver it to `peer`.
    fn send<'a>(&'a self, package: &'a Package, peer: SocketAddr) -> BoxFuture<'a, Result<()>>;

    /// Wait for the next package and return it along with its sender.
    fn receive(&self) -> BoxFuture<'_, Result<(Package, SocketAddr)>>;

    /// Address this transport receives on.
    fn local_addr(&self) -> Result<SocketAddr>;
}

/// Map a requested buffer size to the one actually used (`0` means default).
pub(crate) fn effective_buffer_size(requested: usize) -> usize {
    if requested == 0 {
        DEFAULT_BUFFER_SIZE
    } else {
        requested
    }
}

pub(crate) fn oversized_datagram(buffer_size: usize) -> OscError {
    OscError::Protocol(format!(
        "datagram exceeds receive buffer of {} bytes",
        buffer_size
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_buffer_size() {
        assert_eq!(effective_buffer_size(0), DEFAULT_BUFFER_SIZE);
        assert_eq!(effective_buffer_size(2048), 2048);
    }
}
