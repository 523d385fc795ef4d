//! In-process transport pair backed by channels.
//!
//! Packages are still encoded and decoded, so a `MemoryTransport` exercises
//! the same codec paths as a socket, including rejection of datagrams longer
//! than the receive buffer.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use super::{effective_buffer_size, Transport};
use crate::codec::OscCodec;
use crate::error::{OscError, Result};
use crate::handler::BoxFuture;
use crate::protocol::{Package, MAX_DATAGRAM_SIZE};

type Datagram = (Bytes, SocketAddr);

/// One end of an in-memory datagram link.
///
/// Each end can only reach the other; sending to any other address fails.
pub struct MemoryTransport {
    local: SocketAddr,
    peer: SocketAddr,
    buffer_size: usize,
    tx: mpsc::UnboundedSender<Datagram>,
    rx: Mutex<mpsc::UnboundedReceiver<Datagram>>,
}

impl MemoryTransport {
    /// Create two linked ends with addresses `a` and `b`.
    pub fn pair(a: SocketAddr, b: SocketAddr, buffer_size: usize) -> (Self, Self) {
        let (tx_ab, rx_ab) = mpsc::unbounded_channel();
        let (tx_ba, rx_ba) = mpsc::unbounded_channel();
        let buffer_size = effective_buffer_size(buffer_size);

        let end_a = Self {
            local: a,
            peer: b,
            buffer_size,
            tx: tx_ab,
            rx: Mutex::new(rx_ba),
        };
        let end_b = Self {
            local: b,
            peer: a,
            buffer_size,
            tx: tx_ba,
            rx: Mutex::new(rx_ab),
        };
        (end_a, end_b)
    }

    /// Pair on `127.0.0.1:1` and `127.0.0.1:2` with the default buffer size.
    pub fn pair_default() -> (Self, Self) {
        Self::pair(
            (Ipv4Addr::LOCALHOST, 1).into(),
            (Ipv4Addr::LOCALHOST, 2).into(),
            0,
        )
    }

    /// Address of the other end.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Deliver raw bytes to the other end without encoding them.
    pub fn send_raw(&self, datagram: impl Into<Bytes>) -> Result<()> {
        self.tx
            .send((datagram.into(), self.local))
            .map_err(|_| OscError::ConnectionClosed)
    }

    async fn send_package(&self, package: &Package, peer: SocketAddr) -> Result<()> {
        if peer != self.peer {
            return Err(OscError::Io(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} can only reach {}, not {}", self.local, self.peer, peer),
            )));
        }

        let bytes = OscCodec::encode(package)?;
        if bytes.len() > MAX_DATAGRAM_SIZE {
            return Err(OscError::PackageTooLarge {
                size: bytes.len(),
                limit: MAX_DATAGRAM_SIZE,
            });
        }
        self.send_raw(bytes)
    }

    async fn receive_package(&self) -> Result<(Package, SocketAddr)> {
        let (bytes, from) = self
            .rx
            .lock()
            .await
            .recv()
            .await
            .ok_or(OscError::ConnectionClosed)?;

        if bytes.len() > self.buffer_size {
            return Err(OscError::malformed(
                from,
                super::oversized_datagram(self.buffer_size),
            ));
        }
        let package = OscCodec::decode(&bytes).map_err(|e| OscError::malformed(from, e))?;
        Ok((package, from))
    }
}

impl Transport for MemoryTransport {
    fn send<'a>(&'a self, package: &'a Package, peer: SocketAddr) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.send_package(package, peer))
    }

    fn receive(&self) -> BoxFuture<'_, Result<(Package, SocketAddr)>> {
        Box::pin(self.receive_package())
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local)
    }
}
