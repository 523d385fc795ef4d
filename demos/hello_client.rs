//! Hello client - calls `/hello` on the hello server.
//!
//! This example demonstrates:
//! - Connecting a [`Client`] with a call timeout
//! - A correlated call that waits for its reply
//! - A pattern handler for unsolicited messages (`/404`)

use std::time::Duration;

use oscwire::{Client, Message};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8765".to_string());

    let client = Client::builder()
        .call_timeout(Duration::from_secs(2))
        .connect(&address)
        .await?;

    client.handle_message_fn("^/404$", |w, msg: Message| async move {
        println!("{} says {:?}", w.peer(), msg.arguments);
        Ok(())
    })?;

    let reply = client.call_message("/hello", ["Hello"]).await?;
    println!("Server responded {:?}", reply);

    // Nobody handles this address; the answer arrives on `/404`.
    client.emit_message("/nowhere", [1i32]).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    client.shutdown().await;
    Ok(())
}
