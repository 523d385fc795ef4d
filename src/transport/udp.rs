//! UDP transport: one package per datagram.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::{lookup_host, UdpSocket};

use super::{effective_buffer_size, Transport};
use crate::codec::OscCodec;
use crate::error::{OscError, Result};
use crate::handler::BoxFuture;
use crate::protocol::{Package, MAX_DATAGRAM_SIZE};

/// UDP socket carrying OSC packages.
///
/// Created either connected to one remote peer ([`dial`](Self::dial),
/// [`connect`](Self::connect)) or bound to a local address and open to
/// everyone ([`listen`](Self::listen)).
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
    buffer_size: usize,
}

impl UdpTransport {
    /// Resolve `address` (`host:port`) and connect to it.
    pub async fn dial(address: &str, buffer_size: usize) -> Result<Self> {
        let peer = resolve(address).await?;
        Self::connect(peer, buffer_size).await
    }

    /// Bind an ephemeral local port and connect it to `peer`.
    pub async fn connect(peer: SocketAddr, buffer_size: usize) -> Result<Self> {
        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;

        tracing::debug!(
            "UDP transport {} connected to {}",
            socket.local_addr()?,
            peer
        );

        Ok(Self {
            socket,
            peer: Some(peer),
            buffer_size: effective_buffer_size(buffer_size),
        })
    }

    /// Bind `address` (`host:port`) and accept datagrams from anyone.
    pub async fn listen(address: &str, buffer_size: usize) -> Result<Self> {
        let local = resolve(address).await?;
        let socket = UdpSocket::bind(local).await?;

        tracing::debug!("UDP transport listening on {}", socket.local_addr()?);

        Ok(Self {
            socket,
            peer: None,
            buffer_size: effective_buffer_size(buffer_size),
        })
    }

    /// Wrap an already bound socket.
    pub fn from_socket(socket: UdpSocket, buffer_size: usize) -> Self {
        let peer = socket.peer_addr().ok();
        Self {
            socket,
            peer,
            buffer_size: effective_buffer_size(buffer_size),
        }
    }

    /// Remote peer of a connected transport.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Receive buffer size in bytes.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    async fn send_package(&self, package: &Package, peer: SocketAddr) -> Result<()> {
        let bytes = OscCodec::encode(package)?;
        if bytes.len() > MAX_DATAGRAM_SIZE {
            return Err(OscError::PackageTooLarge {
                size: bytes.len(),
                limit: MAX_DATAGRAM_SIZE,
            });
        }

        // A connected socket rejects addressed writes, so it always sends
        // to the peer it was connected to.
        match self.peer {
            Some(connected) => {
                if connected != peer {
                    tracing::debug!(
                        "UDP transport is connected to {}, not sending to {}",
                        connected,
                        peer
                    );
                }
                self.socket.send(&bytes).await?;
            }
            None => {
                self.socket.send_to(&bytes, peer).await?;
            }
        }

        tracing::trace!("Sent {} bytes to {}", bytes.len(), peer);
        Ok(())
    }

    async fn receive_package(&self) -> Result<(Package, SocketAddr)> {
        // One spare byte tells a datagram that filled the buffer exactly
        // from one the OS cut short.
        let mut buf = vec![0u8; self.buffer_size + 1];
        loop {
            let (len, from) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                // ICMP port unreachable for an earlier send, reported on the
                // next receive. The socket itself is fine.
                Err(e) if is_transient(&e) => {
                    tracing::debug!("Ignoring transient UDP receive error: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            tracing::trace!("Received {} bytes from {}", len, from);
            if len > self.buffer_size {
                return Err(OscError::malformed(
                    from,
                    super::oversized_datagram(self.buffer_size),
                ));
            }
            let package = OscCodec::decode(&buf[..len]).map_err(|e| OscError::malformed(from, e))?;
            return Ok((package, from));
        }
    }
}

impl Transport for UdpTransport {
    fn send<'a>(&'a self, package: &'a Package, peer: SocketAddr) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.send_package(package, peer))
    }

    fn receive(&self) -> BoxFuture<'_, Result<(Package, SocketAddr)>> {
        Box::pin(self.receive_package())
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

/// Resolve `host:port` to the first matching socket address.
pub(crate) async fn resolve(address: &str) -> Result<SocketAddr> {
    lookup_host(address)
        .await?
        .next()
        .ok_or_else(|| OscError::AddressResolution(address.to_string()))
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset
    )
}
