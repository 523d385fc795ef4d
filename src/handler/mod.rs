//! Handler module - inbound package dispatch.
//!
//! Provides:
//! - [`Handler`] - receives every inbound [`Package`]; what a server runs
//! - [`MessageHandler`] / [`BundleHandler`] - per-kind handlers registered by address
//! - [`Mux`] - the standard [`Handler`]: exact address lookup plus one bundle handler
//! - [`ResponseWriter`] - replies to the sender of the package being handled
//!
//! Plain closures become handlers through [`HandlerFn`], [`MessageHandlerFn`]
//! and [`BundleHandlerFn`].
//!
//! # Example
//!
//! ```ignore
//! use oscwire::handler::Mux;
//! use oscwire::protocol::Message;
//!
//! let mut mux = Mux::new();
//! mux.handle_fn("/hello", |w, msg: Message| async move {
//!     w.send(Message::new(msg.address).arg("World")).await
//! });
//! ```

mod mux;
mod response;

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::protocol::{Bundle, Message, Package};

pub use mux::Mux;
pub use response::ResponseWriter;

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Receives every inbound package of a server.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, writer: ResponseWriter, package: Package) -> BoxFuture<'static, HandlerResult>;
}

/// Handles messages routed to it by address.
pub trait MessageHandler: Send + Sync + 'static {
    fn handle_message(
        &self,
        writer: ResponseWriter,
        message: Message,
    ) -> BoxFuture<'static, HandlerResult>;
}

/// Handles inbound bundles.
pub trait BundleHandler: Send + Sync + 'static {
    fn handle_bundle(&self, writer: ResponseWriter, bundle: Bundle)
        -> BoxFuture<'static, HandlerResult>;
}

/// Adapter that lets an async closure act as a [`Handler`].
///
/// Handy for middleware that inspects or rewrites a package before passing
/// it on.
pub struct HandlerFn<F>(pub F);

impl<F, Fut> HandlerFn<F>
where
    F: Fn(ResponseWriter, Package) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self(func)
    }
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(ResponseWriter, Package) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle(&self, writer: ResponseWriter, package: Package) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.0)(writer, package))
    }
}

/// Adapter that lets an async closure act as a [`MessageHandler`].
pub struct MessageHandlerFn<F>(pub F);

impl<F, Fut> MessageHandlerFn<F>
where
    F: Fn(ResponseWriter, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self(func)
    }
}

impl<F, Fut> MessageHandler for MessageHandlerFn<F>
where
    F: Fn(ResponseWriter, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle_message(
        &self,
        writer: ResponseWriter,
        message: Message,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.0)(writer, message))
    }
}

/// Adapter that lets an async closure act as a [`BundleHandler`].
pub struct BundleHandlerFn<F>(pub F);

impl<F, Fut> BundleHandlerFn<F>
where
    F: Fn(ResponseWriter, Bundle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self(func)
    }
}

impl<F, Fut> BundleHandler for BundleHandlerFn<F>
where
    F: Fn(ResponseWriter, Bundle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle_bundle(
        &self,
        writer: ResponseWriter,
        bundle: Bundle,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.0)(writer, bundle))
    }
}

/// Run one handler invocation as its own task and wait for it.
///
/// Errors and panics are logged, never propagated, so a receive loop keeps
/// going whatever the handler does.
pub(crate) async fn run_handler(fut: BoxFuture<'static, HandlerResult>, origin: &str) {
    match tokio::spawn(fut).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!("Handler error for {}: {}", origin, e);
        }
        Err(e) if e.is_panic() => {
            tracing::error!("Handler for {} panicked", origin);
        }
        Err(e) => {
            tracing::error!("Handler task for {} failed: {}", origin, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn writer() -> ResponseWriter {
        let (a, _b) = MemoryTransport::pair_default();
        let peer = a.peer_addr();
        ResponseWriter::new(peer, Arc::new(a))
    }

    #[tokio::test]
    async fn test_message_handler_fn_calls_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = MessageHandlerFn::new(move |_w, msg: Message| {
            let counter = counter.clone();
            async move {
                assert_eq!(msg.address, "/test");
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        handler
            .handle_message(writer(), Message::new("/test"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_fn_sees_package() {
        let handler = HandlerFn::new(|_w, pkg: Package| async move {
            assert!(pkg.as_bundle().is_some());
            Ok(())
        });
        handler
            .handle(writer(), Bundle::default().into())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_handler_error_is_returned() {
        let handler = BundleHandlerFn::new(|_w, _b: Bundle| async move {
            Err(crate::error::OscError::Protocol("rejected".to_string()))
        });
        let result = handler.handle_bundle(writer(), Bundle::default()).await;
        assert!(result.is_err());
    }

    async fn panicking() -> HandlerResult {
        panic!("boom")
    }

    async fn failing() -> HandlerResult {
        Err(crate::error::OscError::ConnectionClosed)
    }

    #[tokio::test]
    async fn test_run_handler_contains_panic_and_error() {
        run_handler(Box::pin(panicking()), "/boom").await;
        run_handler(Box::pin(failing()), "/err").await;
    }
}
