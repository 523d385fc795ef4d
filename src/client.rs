//! Client builder and runtime loop.
//!
//! A [`Client`] talks to one fixed remote peer. It offers:
//! 1. One-way sends (`send_message`, `send_bundle`, `emit_message`)
//! 2. Calls that wait for the reply on the same address
//!    (`send_and_receive_message`, `call_message`)
//! 3. Regex-addressed handlers for unsolicited messages, plus one bundle handler
//!
//! A background receive loop owns the inbound side of the transport:
//!
//! ```text
//!                  ┌─► pending call on address? ─► caller's reply channel
//! transport ─► loop┤
//!                  ├─► first matching pattern  ─► MessageHandler
//!                  └─► bundle                  ─► BundleHandler
//! ```
//!
//! # Example
//!
//! ```ignore
//! use oscwire::{Client, Message};
//!
//! #[tokio::main]
//! async fn main() -> oscwire::Result<()> {
//!     let client = Client::connect("127.0.0.1:8765").await?;
//!
//!     client.handle_message_fn("^/status/.*", |_w, msg: Message| async move {
//!         println!("status update: {:?}", msg);
//!         Ok(())
//!     })?;
//!
//!     let reply = client.send_and_receive_message(Message::new("/hello")).await?;
//!     println!("{:?}", reply.arguments);
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{OscError, Result};
use crate::handler::{
    run_handler, BundleHandler, BundleHandlerFn, HandlerResult, MessageHandler, MessageHandlerFn,
    ResponseWriter,
};
use crate::pending::PendingCalls;
use crate::protocol::{Argument, Bundle, Message, Package};
use crate::transport::{Transport, UdpTransport, DEFAULT_BUFFER_SIZE};

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Receive buffer size in bytes (`0` means [`DEFAULT_BUFFER_SIZE`]).
    pub buffer_size: usize,
    /// Deadline applied to every call. `None` waits forever.
    pub call_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            call_timeout: None,
        }
    }
}

/// Builder for configuring and creating a [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing config.
    pub fn with_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Set the receive buffer size.
    ///
    /// Default: 512
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Set a deadline for `send_and_receive_message` and `call_message`.
    ///
    /// Default: none
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = Some(timeout);
        self
    }

    /// Dial `address` over UDP and start the client.
    pub async fn connect(self, address: &str) -> Result<Client> {
        let transport = UdpTransport::dial(address, self.config.buffer_size).await?;
        let remote = transport
            .peer_addr()
            .ok_or_else(|| OscError::AddressResolution(address.to_string()))?;
        Ok(self.with_transport(transport, remote))
    }

    /// Start the client over an existing transport, talking to `remote`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_transport<T: Transport>(self, transport: T, remote: SocketAddr) -> Client {
        Client::start(Arc::new(transport), remote, self.config)
    }
}

struct PatternEntry {
    pattern: Regex,
    handler: Arc<dyn MessageHandler>,
}

/// State shared between the client handle and its receive loop.
struct Shared {
    patterns: RwLock<Vec<PatternEntry>>,
    bundle_handler: RwLock<Option<Arc<dyn BundleHandler>>>,
    pending: Arc<PendingCalls>,
}

impl Shared {
    fn message_handler(&self, address: &str) -> Option<Arc<dyn MessageHandler>> {
        self.patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|entry| entry.pattern.is_match(address))
            .map(|entry| Arc::clone(&entry.handler))
    }

    fn bundle_handler(&self) -> Option<Arc<dyn BundleHandler>> {
        self.bundle_handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn dispatch(&self, package: Package, writer: ResponseWriter) {
        match package {
            Package::Message(message) => {
                let Some(message) = self.pending.deliver(message) else {
                    return;
                };
                match self.message_handler(&message.address) {
                    Some(handler) => {
                        let origin = message.address.clone();
                        run_handler(handler.handle_message(writer, message), &origin).await;
                    }
                    None => {
                        tracing::trace!("No handler for {}, dropping", message.address);
                    }
                }
            }
            Package::Bundle(bundle) => match self.bundle_handler() {
                Some(handler) => run_handler(handler.handle_bundle(writer, bundle), "bundle").await,
                None => tracing::trace!("No bundle handler, dropping bundle"),
            },
        }
    }
}

/// A running OSC client.
///
/// Dropping the client stops its receive loop.
pub struct Client {
    remote: SocketAddr,
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    config: ClientConfig,
    cancel: CancellationToken,
    receive_task: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Dial `address` with default settings.
    pub async fn connect(address: &str) -> Result<Self> {
        ClientBuilder::new().connect(address).await
    }

    fn start(transport: Arc<dyn Transport>, remote: SocketAddr, config: ClientConfig) -> Self {
        let shared = Arc::new(Shared {
            patterns: RwLock::new(Vec::new()),
            bundle_handler: RwLock::new(None),
            pending: PendingCalls::new(),
        });
        let cancel = CancellationToken::new();

        let receive_task = tokio::spawn(Self::receive_loop(
            Arc::clone(&transport),
            Arc::clone(&shared),
            cancel.clone(),
        ));

        Self {
            remote,
            transport,
            shared,
            config,
            cancel,
            receive_task: Mutex::new(Some(receive_task)),
        }
    }

    /// Receive packages until cancelled or the transport fails.
    async fn receive_loop(
        transport: Arc<dyn Transport>,
        shared: Arc<Shared>,
        cancel: CancellationToken,
    ) {
        tracing::debug!("Client receive loop started");

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = transport.receive() => received,
            };

            match received {
                Ok((package, from)) => {
                    let writer = ResponseWriter::new(from, Arc::clone(&transport));
                    shared.dispatch(package, writer).await;
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Dropping datagram: {}", e);
                }
                Err(e) => {
                    tracing::error!("Client receive loop failed: {}", e);
                    break;
                }
            }
        }

        shared.pending.close();
        tracing::debug!("Client receive loop stopped");
    }

    /// Send any package to the remote peer.
    pub async fn send(&self, package: impl Into<Package>) -> Result<()> {
        let package = package.into();
        self.transport.send(&package, self.remote).await
    }

    pub async fn send_message(&self, message: Message) -> Result<()> {
        self.send(message).await
    }

    pub async fn send_bundle(&self, bundle: Bundle) -> Result<()> {
        self.send(bundle).await
    }

    /// Build a message from `address` and `args` and send it.
    pub async fn emit_message<I, A>(&self, address: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = A>,
        A: Into<Argument>,
    {
        self.send(Message::with_args(address, args)).await
    }

    /// Send `message` and wait for the next message on the same address.
    ///
    /// Uses the configured call timeout, if any. Only one call per address
    /// can be in flight: a newer call to the same address makes this one
    /// fail with [`OscError::CallSuperseded`].
    pub async fn send_and_receive_message(&self, message: Message) -> Result<Message> {
        match self.config.call_timeout {
            Some(timeout) => self.send_and_receive_message_timeout(message, timeout).await,
            None => self.call(message).await,
        }
    }

    /// Like [`send_and_receive_message`](Self::send_and_receive_message) with
    /// an explicit deadline.
    pub async fn send_and_receive_message_timeout(
        &self,
        message: Message,
        timeout: Duration,
    ) -> Result<Message> {
        let address = message.address.clone();
        tokio::time::timeout(timeout, self.call(message))
            .await
            .map_err(|_| OscError::CallTimeout { address, timeout })?
    }

    /// Build a message from `address` and `args` and wait for its reply.
    pub async fn call_message<I, A>(&self, address: &str, args: I) -> Result<Message>
    where
        I: IntoIterator<Item = A>,
        A: Into<Argument>,
    {
        self.send_and_receive_message(Message::with_args(address, args))
            .await
    }

    async fn call(&self, message: Message) -> Result<Message> {
        // The guard clears the slot on every exit path, including cancellation.
        let (_guard, reply) = self.shared.pending.register(&message.address)?;
        self.send(message).await?;
        reply.await.unwrap_or(Err(OscError::ConnectionClosed))
    }

    /// Register `handler` for inbound messages whose address matches the
    /// regular expression `pattern`.
    ///
    /// Patterns are tried in registration order and the first match wins.
    /// Registering the same pattern string again replaces its handler.
    pub fn handle_message<H: MessageHandler>(&self, pattern: &str, handler: H) -> Result<()> {
        let compiled = Regex::new(pattern)?;
        let handler: Arc<dyn MessageHandler> = Arc::new(handler);

        let mut patterns = self
            .shared
            .patterns
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match patterns
            .iter_mut()
            .find(|entry| entry.pattern.as_str() == pattern)
        {
            Some(entry) => entry.handler = handler,
            None => patterns.push(PatternEntry {
                pattern: compiled,
                handler,
            }),
        }
        Ok(())
    }

    /// Register an async closure for addresses matching `pattern`.
    pub fn handle_message_fn<F, Fut>(&self, pattern: &str, f: F) -> Result<()>
    where
        F: Fn(ResponseWriter, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handle_message(pattern, MessageHandlerFn::new(f))
    }

    /// Set the handler for inbound bundles, replacing any previous one.
    pub fn handle_bundle<H: BundleHandler>(&self, handler: H) {
        *self
            .shared
            .bundle_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    /// Set an async closure as the bundle handler.
    pub fn handle_bundle_fn<F, Fut>(&self, f: F)
    where
        F: Fn(ResponseWriter, Bundle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handle_bundle(BundleHandlerFn::new(f));
    }

    /// Whether a call is waiting for a reply on `address`.
    pub fn is_pending(&self, address: &str) -> bool {
        self.shared.pending.contains(address)
    }

    /// Number of calls waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.shared.pending.len()
    }

    /// Whether the receive loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.shared.pending.is_closed()
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Stop the receive loop and wait for it to finish.
    ///
    /// Calls still waiting for a reply fail with [`OscError::ConnectionClosed`].
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self
            .receive_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!("Client receive loop task failed: {}", e);
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Timetag;
    use crate::transport::MemoryTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Client over one end of a memory pair; the other end plays the peer.
    fn client_with_peer(config: ClientBuilder) -> (Client, MemoryTransport) {
        let (local, peer) = MemoryTransport::pair_default();
        let remote = local.peer_addr();
        (config.with_transport(local, remote), peer)
    }

    async fn expect_message(peer: &MemoryTransport) -> (Message, SocketAddr) {
        let (pkg, from) = peer.receive().await.unwrap();
        (pkg.into_message().unwrap(), from)
    }

    #[test]
    fn test_builder_configuration() {
        let builder = Client::builder()
            .buffer_size(2048)
            .call_timeout(Duration::from_secs(3));
        assert_eq!(builder.config.buffer_size, 2048);
        assert_eq!(builder.config.call_timeout, Some(Duration::from_secs(3)));

        let defaults = ClientConfig::default();
        assert_eq!(defaults.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(defaults.call_timeout, None);
    }

    #[tokio::test]
    async fn test_send_message_reaches_peer() {
        let (client, peer) = client_with_peer(Client::builder());
        client.send_message(Message::new("/a").arg(1i32)).await.unwrap();
        client
            .emit_message("/b", [Argument::from(2.5f32), Argument::from("x")])
            .await
            .unwrap();

        let (first, _) = expect_message(&peer).await;
        assert_eq!(first.address, "/a");
        let (second, _) = expect_message(&peer).await;
        assert_eq!(second.type_tags(), ",fs");
    }

    #[tokio::test]
    async fn test_call_receives_reply_and_clears_pending() {
        let (client, peer) = client_with_peer(Client::builder());
        let client = Arc::new(client);

        let caller = {
            let client = client.clone();
            tokio::spawn(async move { client.call_message("/echo", ["ping"]).await })
        };

        let (request, from) = expect_message(&peer).await;
        assert!(client.is_pending("/echo"));
        peer.send(&Message::new("/echo").arg("pong").into(), from)
            .await
            .unwrap();

        let reply = caller.await.unwrap().unwrap();
        assert_eq!(request.arguments[0].as_str(), Some("ping"));
        assert_eq!(reply.arguments[0].as_str(), Some("pong"));
        assert!(!client.is_pending("/echo"));
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_on_different_addresses() {
        let (client, peer) = client_with_peer(Client::builder());
        let client = Arc::new(client);

        let a = {
            let client = client.clone();
            tokio::spawn(async move { client.call_message("/a", [1i32]).await })
        };
        let b = {
            let client = client.clone();
            tokio::spawn(async move { client.call_message("/b", [2i32]).await })
        };

        let (first, from) = expect_message(&peer).await;
        let (second, _) = expect_message(&peer).await;
        // Answer in reverse arrival order.
        for request in [second, first] {
            let value = request.arguments[0].as_int().unwrap() * 10;
            peer.send(&Message::new(request.address).arg(value).into(), from)
                .await
                .unwrap();
        }

        assert_eq!(a.await.unwrap().unwrap().arguments[0].as_int(), Some(10));
        assert_eq!(b.await.unwrap().unwrap().arguments[0].as_int(), Some(20));
    }

    #[tokio::test]
    async fn test_call_timeout_removes_pending() {
        let (client, _peer) =
            client_with_peer(Client::builder().call_timeout(Duration::from_millis(30)));

        let err = client
            .send_and_receive_message(Message::new("/silent"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OscError::CallTimeout { ref address, timeout }
                if address == "/silent" && timeout == Duration::from_millis(30)
        ));
        assert!(!client.is_pending("/silent"));
    }

    #[tokio::test]
    async fn test_failed_send_leaves_no_pending() {
        let (client, _peer) = client_with_peer(Client::builder());
        let err = client
            .send_and_receive_message(Message::new("bad address"))
            .await
            .unwrap_err();
        assert!(matches!(err, OscError::InvalidAddress(_)));
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_second_call_supersedes_first() {
        let (client, peer) = client_with_peer(Client::builder());
        let client = Arc::new(client);

        let first = {
            let client = client.clone();
            tokio::spawn(async move { client.call_message("/same", [1i32]).await })
        };
        let (_, from) = expect_message(&peer).await;

        let second = {
            let client = client.clone();
            tokio::spawn(async move { client.call_message("/same", [2i32]).await })
        };
        expect_message(&peer).await;

        let err = first.await.unwrap().unwrap_err();
        assert!(matches!(err, OscError::CallSuperseded(ref a) if a == "/same"));

        peer.send(&Message::new("/same").arg(2i32).into(), from)
            .await
            .unwrap();
        let reply = second.await.unwrap().unwrap();
        assert_eq!(reply.arguments[0].as_int(), Some(2));
    }

    #[tokio::test]
    async fn test_patterns_first_match_in_registration_order() {
        let (client, peer) = client_with_peer(Client::builder());
        let (tx, mut rx) = mpsc::unbounded_channel::<&'static str>();

        let general = tx.clone();
        client
            .handle_message_fn("^/mixer/.*", move |_w, _m: Message| {
                let general = general.clone();
                async move {
                    let _ = general.send("general");
                    Ok(())
                }
            })
            .unwrap();
        let specific = tx.clone();
        client
            .handle_message_fn("^/mixer/gain$", move |_w, _m: Message| {
                let specific = specific.clone();
                async move {
                    let _ = specific.send("specific");
                    Ok(())
                }
            })
            .unwrap();

        let to = client.local_addr().unwrap();
        peer.send(&Message::new("/mixer/gain").into(), to)
            .await
            .unwrap();
        assert_eq!(rx.recv().await, Some("general"));

        // Same pattern string replaces the handler in place, keeping its position.
        let replaced = tx.clone();
        client
            .handle_message_fn("^/mixer/.*", move |_w, _m: Message| {
                let replaced = replaced.clone();
                async move {
                    let _ = replaced.send("replaced");
                    Ok(())
                }
            })
            .unwrap();
        peer.send(&Message::new("/mixer/gain").into(), to)
            .await
            .unwrap();
        assert_eq!(rx.recv().await, Some("replaced"));
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_rejected() {
        let (client, _peer) = client_with_peer(Client::builder());
        let err = client
            .handle_message_fn("[0-9", |_w, _m: Message| async { Ok(()) })
            .unwrap_err();
        assert!(matches!(err, OscError::InvalidPattern(_)));
    }

    #[tokio::test]
    async fn test_handler_can_reply_to_sender() {
        let (client, peer) = client_with_peer(Client::builder());
        client
            .handle_message_fn("^/ping$", |w, _m: Message| async move {
                w.send(Message::new("/pong")).await
            })
            .unwrap();

        peer.send(&Message::new("/ping").into(), client.local_addr().unwrap())
            .await
            .unwrap();
        let (reply, _) = expect_message(&peer).await;
        assert_eq!(reply.address, "/pong");
    }

    #[tokio::test]
    async fn test_bundle_handler() {
        let (client, peer) = client_with_peer(Client::builder());
        let seen = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let counter = seen.clone();
        client.handle_bundle_fn(move |_w, b: Bundle| {
            let counter = counter.clone();
            let tx = tx.clone();
            async move {
                counter.fetch_add(b.messages.len(), Ordering::SeqCst);
                let _ = tx.send(b.timetag);
                Ok(())
            }
        });

        let bundle = Bundle::new(Timetag(42))
            .message(Message::new("/a"))
            .message(Message::new("/b"));
        peer.send(&bundle.into(), client.local_addr().unwrap())
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(Timetag(42)));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_malformed_datagram_does_not_stop_loop() {
        let (client, peer) = client_with_peer(Client::builder());
        let client = Arc::new(client);

        peer.send_raw(&b"not osc"[..]).unwrap();

        let caller = {
            let client = client.clone();
            tokio::spawn(async move { client.call_message("/still", [0i32]).await })
        };
        let (_, from) = expect_message(&peer).await;
        peer.send(&Message::new("/still").into(), from).await.unwrap();
        assert!(caller.await.unwrap().is_ok());
        assert!(!client.is_closed());
    }

    #[tokio::test]
    async fn test_transport_close_fails_waiting_call() {
        let (client, peer) = client_with_peer(Client::builder());
        let client = Arc::new(client);

        let caller = {
            let client = client.clone();
            tokio::spawn(async move { client.call_message("/gone", [0i32]).await })
        };
        expect_message(&peer).await;
        drop(peer);

        let err = caller.await.unwrap().unwrap_err();
        assert!(matches!(err, OscError::ConnectionClosed));
        assert!(client.is_closed());

        let err = client.call_message("/again", [0i32]).await.unwrap_err();
        assert!(matches!(err, OscError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let (client, _peer) = client_with_peer(Client::builder());
        client.shutdown().await;
        assert!(client.is_closed());
        // Second shutdown is a no-op.
        client.shutdown().await;
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"call_timeout":{"secs":2,"nanos":0}}"#)
            .unwrap();
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.call_timeout, Some(Duration::from_secs(2)));
    }
}
