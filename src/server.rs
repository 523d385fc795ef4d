//! Server runtime loop.
//!
//! A [`Server`] receives packages from any peer and hands each one, together
//! with a [`ResponseWriter`] bound to its sender, to a single root
//! [`Handler`] (usually a [`Mux`](crate::handler::Mux)).
//!
//! Handler calls are serialized: the next package is not received until the
//! current handler returns. Handlers that want concurrency spawn their own
//! tasks.
//!
//! # Example
//!
//! ```ignore
//! use oscwire::{Message, Mux, Server};
//!
//! #[tokio::main]
//! async fn main() -> oscwire::Result<()> {
//!     let mut mux = Mux::new();
//!     mux.handle_fn("/hello", |w, msg: Message| async move {
//!         w.send(Message::new(msg.address).arg("World")).await
//!     });
//!
//!     Server::default().listen_and_serve("127.0.0.1:8765", mux).await
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::handler::{run_handler, Handler, ResponseWriter};
use crate::protocol::Package;
use crate::transport::{Transport, UdpTransport, DEFAULT_BUFFER_SIZE};

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Receive buffer size in bytes (`0` means [`DEFAULT_BUFFER_SIZE`]).
    pub buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

/// OSC server.
///
/// `Server` is cheap to share; [`shutdown`](Self::shutdown) may be called from
/// any task while another is serving.
///
/// A `Server` is single-use. Shutdown is permanent: once requested, every
/// later [`serve`](Self::serve) or [`listen_and_serve`](Self::listen_and_serve)
/// on the same value returns `Ok(())` without receiving. Create a new
/// `Server` to serve again.
#[derive(Debug, Default)]
pub struct Server {
    config: ServerConfig,
    shutdown: CancellationToken,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind a UDP socket on `address` and serve until shutdown.
    ///
    /// Fails immediately if binding fails.
    pub async fn listen_and_serve<H: Handler>(&self, address: &str, handler: H) -> Result<()> {
        let transport = UdpTransport::listen(address, self.config.buffer_size).await?;
        tracing::info!("OSC server listening on {}", transport.local_addr()?);
        self.serve(transport, handler).await
    }

    /// Serve packages arriving on `transport` until shutdown.
    ///
    /// Returns `Ok(())` after [`shutdown`](Self::shutdown) and the transport
    /// error if the transport fails. Malformed datagrams are logged and
    /// skipped.
    pub async fn serve<T: Transport, H: Handler>(&self, transport: T, handler: H) -> Result<()> {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let handler: Arc<dyn Handler> = Arc::new(handler);

        tracing::debug!("Server receive loop started");
        let result = self.receive_loop(transport, handler).await;
        tracing::debug!("Server receive loop stopped");
        result
    }

    async fn receive_loop(
        &self,
        transport: Arc<dyn Transport>,
        handler: Arc<dyn Handler>,
    ) -> Result<()> {
        loop {
            let received = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(()),
                received = transport.receive() => received,
            };

            match received {
                Ok((package, from)) => {
                    let origin = describe(&package);
                    let writer = ResponseWriter::new(from, Arc::clone(&transport));
                    run_handler(handler.handle(writer, package), &origin).await;
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Dropping datagram: {}", e);
                }
                Err(e) => {
                    tracing::error!("Server receive loop failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Ask the serving loop to stop.
    ///
    /// A blocked receive is interrupted. Calling this before serving starts
    /// makes serving return right away. It cannot be undone.
    pub fn shutdown(&self) {
        tracing::debug!("Server shutdown requested");
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

fn describe(package: &Package) -> String {
    match package {
        Package::Message(message) => message.address.clone(),
        Package::Bundle(_) => "bundle".to_string(),
    }
}
