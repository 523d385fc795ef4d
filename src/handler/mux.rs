//! Address-based dispatch for servers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use super::{
    BoxFuture, BundleHandler, BundleHandlerFn, Handler, HandlerResult, MessageHandler,
    MessageHandlerFn, ResponseWriter,
};
use crate::protocol::{Bundle, Message, Package};

/// Routes messages by exact address and bundles to a single bundle handler.
///
/// Packages with no matching handler are dropped. Registering a handler for
/// an address that already has one replaces it.
#[derive(Default)]
pub struct Mux {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
    bundle_handler: Option<Arc<dyn BundleHandler>>,
}

impl Mux {
    /// Create an empty mux.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message handler for `address`.
    pub fn handle<H: MessageHandler>(&mut self, address: impl Into<String>, handler: H) {
        let address = address.into();
        if self.handlers.insert(address.clone(), Arc::new(handler)).is_some() {
            tracing::debug!("Replaced handler for {}", address);
        }
    }

    /// Register an async closure as the message handler for `address`.
    pub fn handle_fn<F, Fut>(&mut self, address: impl Into<String>, f: F)
    where
        F: Fn(ResponseWriter, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handle(address, MessageHandlerFn::new(f));
    }

    /// Set the bundle handler, replacing any previous one.
    pub fn handle_bundle<H: BundleHandler>(&mut self, handler: H) {
        self.bundle_handler = Some(Arc::new(handler));
    }

    /// Set an async closure as the bundle handler.
    pub fn handle_bundle_fn<F, Fut>(&mut self, f: F)
    where
        F: Fn(ResponseWriter, Bundle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handle_bundle(BundleHandlerFn::new(f));
    }

    /// Whether a message handler is registered for `address`.
    pub fn contains(&self, address: &str) -> bool {
        self.handlers.contains_key(address)
    }

    /// Number of registered message handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Handler for Mux {
    fn handle(&self, writer: ResponseWriter, package: Package) -> BoxFuture<'static, HandlerResult> {
        match package {
            Package::Message(message) => match self.handlers.get(&message.address) {
                Some(handler) => handler.handle_message(writer, message),
                None => {
                    tracing::trace!(
                        "No handler for {} from {}, dropping",
                        message.address,
                        writer.peer()
                    );
                    Box::pin(async { Ok(()) })
                }
            },
            Package::Bundle(bundle) => match &self.bundle_handler {
                Some(handler) => handler.handle_bundle(writer, bundle),
                None => {
                    tracing::trace!("No bundle handler, dropping bundle from {}", writer.peer());
                    Box::pin(async { Ok(()) })
                }
            },
        }
    }
}
