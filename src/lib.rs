//! # oscwire
//!
//! Open Sound Control (OSC) for tokio.
//!
//! This crate provides the OSC binary codec, a pluggable datagram transport,
//! and client/server runtimes that dispatch inbound packages to address-scoped
//! handlers.
//!
//! ## Architecture
//!
//! - **Codec** ([`codec`]): byte-exact messages and bundles, 4-byte aligned
//! - **Transport** ([`transport`]): one package per UDP datagram
//! - **Dispatch** ([`handler`]): [`Mux`] routes by exact address; [`Client`]
//!   routes by regex and correlates replies with waiting callers
//!
//! ## Example
//!
//! ```ignore
//! use oscwire::{Client, Message, Mux, Server};
//!
//! #[tokio::main]
//! async fn main() -> oscwire::Result<()> {
//!     let mut mux = Mux::new();
//!     mux.handle_fn("/hello", |w, msg: Message| async move {
//!         w.send(Message::new(msg.address).arg("World")).await
//!     });
//!     tokio::spawn(async move { Server::default().listen_and_serve("127.0.0.1:8765", mux).await });
//!
//!     let client = Client::connect("127.0.0.1:8765").await?;
//!     let reply = client.call_message("/hello", ["Hello"]).await?;
//!     assert_eq!(reply.arguments[0].as_str(), Some("World"));
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod transport;

mod client;
mod pending;
mod server;

pub use client::{Client, ClientBuilder, ClientConfig};
pub use codec::OscCodec;
pub use error::{OscError, Result};
pub use handler::{Handler, HandlerFn, Mux, ResponseWriter};
pub use protocol::{Argument, Bundle, Message, Package, PackageType, Timetag};
pub use server::{Server, ServerConfig};
pub use transport::{MemoryTransport, Transport, UdpTransport};
