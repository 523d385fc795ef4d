//! Reply channel handed to handlers.
//!
//! # Example
//!
//! ```ignore
//! async fn hello(w: ResponseWriter, msg: Message) -> HandlerResult {
//!     w.send(Message::new(msg.address).arg("World")).await
//! }
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::Result;
use crate::protocol::Package;
use crate::transport::Transport;

/// Sends packages back to the peer that sent the package being handled.
///
/// `ResponseWriter` is `Clone`; the transport is shared, so handlers may move
/// copies into spawned tasks and reply later.
#[derive(Clone)]
pub struct ResponseWriter {
    peer: SocketAddr,
    transport: Arc<dyn Transport>,
}

impl ResponseWriter {
    /// Create a writer that replies to `peer` over `transport`.
    pub fn new(peer: SocketAddr, transport: Arc<dyn Transport>) -> Self {
        Self { peer, transport }
    }

    /// Address of the peer replies go to.
    #[inline]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Send a message or bundle to the peer.
    pub async fn send(&self, package: impl Into<Package>) -> Result<()> {
        let package = package.into();
        self.transport.send(&package, self.peer).await
    }
}

impl fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Bundle, Message, Timetag};
    use crate::transport::MemoryTransport;

    #[tokio::test]
    async fn test_send_reaches_peer() {
        let (a, b) = MemoryTransport::pair_default();
        let writer = ResponseWriter::new(a.peer_addr(), Arc::new(a));
        assert_eq!(writer.peer(), b.local_addr().unwrap());

        writer
            .send(Message::new("/hello").arg("World"))
            .await
            .unwrap();
        let (pkg, _) = b.receive().await.unwrap();
        assert_eq!(pkg.as_message().unwrap().arguments[0].as_str(), Some("World"));

        writer.clone().send(Bundle::new(Timetag(3))).await.unwrap();
        let (pkg, _) = b.receive().await.unwrap();
        assert_eq!(pkg.as_bundle().unwrap().timetag, Timetag(3));
    }
}
