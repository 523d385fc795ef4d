//! Hello server - answers `/hello` with "World".
//!
//! This example demonstrates:
//! - A custom root [`Handler`] that replies `/404` for unknown addresses
//! - Package-level middleware built from [`HandlerFn`]
//! - Serving over UDP until Ctrl-C
//!
//! # Running
//!
//! ```text
//! cargo run --example hello_server -- 127.0.0.1:8765
//! cargo run --example hello_client -- 127.0.0.1:8765
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use oscwire::handler::{BoxFuture, HandlerResult, MessageHandler, MessageHandlerFn};
use oscwire::{Handler, HandlerFn, Message, Package, ResponseWriter, Server};

/// Routes by exact address like `Mux`, but tells the sender when nothing matched.
#[derive(Default)]
struct NotFoundMux {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl NotFoundMux {
    fn route<H: MessageHandler>(&mut self, address: &str, handler: H) {
        self.handlers.insert(address.to_string(), Arc::new(handler));
    }
}

impl Handler for NotFoundMux {
    fn handle(&self, writer: ResponseWriter, package: Package) -> BoxFuture<'static, HandlerResult> {
        match package {
            Package::Message(message) => match self.handlers.get(&message.address) {
                Some(handler) => handler.handle_message(writer, message),
                None => not_found(writer),
            },
            Package::Bundle(_) => not_found(writer),
        }
    }
}

fn not_found(writer: ResponseWriter) -> BoxFuture<'static, HandlerResult> {
    Box::pin(async move { writer.send(Message::new("/404").arg("Not found")).await })
}

/// Mount `next` under `prefix`: `/hello` arrives at `next` as `/<prefix>/hello`.
fn prefix_middleware<H: Handler>(prefix: &'static str, next: H) -> impl Handler {
    let next = Arc::new(next);
    HandlerFn::new(move |w: ResponseWriter, mut package: Package| {
        if let Package::Message(message) = &mut package {
            message.address = format!("/{}{}", prefix, message.address);
        }
        next.handle(w, package)
    })
}

async fn hello(w: ResponseWriter, _message: Message) -> HandlerResult {
    println!("hello from {}", w.peer());
    w.send(Message::new("/hello").arg("World")).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8765".to_string());

    let mut mux = NotFoundMux::default();
    mux.route("/demo/hello", MessageHandlerFn::new(hello));
    let root = prefix_middleware("demo", mux);

    let server = Arc::new(Server::default());
    let stopper = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.shutdown();
        }
    });

    println!("Serving OSC on {} (Ctrl-C to stop)", address);
    server.listen_and_serve(&address, root).await?;
    println!("Server stopped");
    Ok(())
}
