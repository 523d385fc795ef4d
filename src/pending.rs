//! Pending-call registry for correlating replies with callers.
//!
//! One slot per address. A reply message is handed to the caller waiting on
//! its address exactly once, and the slot is removed at the same time.
//!
//! ```text
//! caller ──register("/echo")──► slot{id, tx} ◄──deliver(reply)── receive loop
//!    ▲                                │
//!    └────────── rx ◄─────────────────┘
//! ```
//!
//! A [`PendingGuard`] removes its own slot when dropped, so a call that fails
//! to send, times out or is cancelled leaves nothing behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::error::{OscError, Result};
use crate::protocol::Message;

type Reply = Result<Message>;

struct Slot {
    id: u64,
    tx: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct State {
    slots: HashMap<String, Slot>,
    next_id: u64,
    closed: bool,
}

/// Address-keyed table of callers waiting for a reply.
#[derive(Default)]
pub(crate) struct PendingCalls {
    state: Mutex<State>,
}

impl PendingCalls {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the slot for `address`.
    ///
    /// A caller already waiting on the same address is resolved with
    /// [`OscError::CallSuperseded`].
    pub(crate) fn register(
        self: &Arc<Self>,
        address: &str,
    ) -> Result<(PendingGuard, oneshot::Receiver<Reply>)> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.lock();
        if state.closed {
            return Err(OscError::ConnectionClosed);
        }

        state.next_id += 1;
        let id = state.next_id;
        if let Some(previous) = state.slots.insert(address.to_string(), Slot { id, tx }) {
            tracing::debug!("Pending call on {} superseded", address);
            let _ = previous
                .tx
                .send(Err(OscError::CallSuperseded(address.to_string())));
        }
        drop(state);

        let guard = PendingGuard {
            calls: Arc::clone(self),
            address: address.to_string(),
            id,
        };
        Ok((guard, rx))
    }

    /// Hand `message` to the caller waiting on its address.
    ///
    /// Returns the message back when nobody is waiting for it.
    pub(crate) fn deliver(&self, message: Message) -> Option<Message> {
        let slot = self.lock().slots.remove(&message.address);
        match slot {
            Some(slot) => {
                if slot.tx.send(Ok(message)).is_err() {
                    tracing::debug!("Reply arrived after its caller gave up");
                }
                None
            }
            None => Some(message),
        }
    }

    /// Fail every waiting caller and refuse new registrations.
    pub(crate) fn close(&self) {
        let slots = {
            let mut state = self.lock();
            state.closed = true;
            std::mem::take(&mut state.slots)
        };
        for (_, slot) in slots {
            let _ = slot.tx.send(Err(OscError::ConnectionClosed));
        }
    }

    pub(crate) fn contains(&self, address: &str) -> bool {
        self.lock().slots.contains_key(address)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn remove_if_current(&self, address: &str, id: u64) {
        let mut state = self.lock();
        if state.slots.get(address).is_some_and(|slot| slot.id == id) {
            state.slots.remove(address);
        }
    }
}

/// Removes its slot on drop unless a newer call or a reply already took it.
pub(crate) struct PendingGuard {
    calls: Arc<PendingCalls>,
    address: String,
    id: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.calls.remove_if_current(&self.address, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_once_and_remove() {
        let calls = PendingCalls::new();
        let (_guard, rx) = calls.register("/echo").unwrap();
        assert!(calls.contains("/echo"));

        assert!(calls.deliver(Message::new("/echo").arg(1i32)).is_none());
        assert!(!calls.contains("/echo"));

        let reply = rx.await.unwrap().unwrap();
        assert_eq!(reply.arguments[0].as_int(), Some(1));

        // Second reply has nobody to go to.
        assert!(calls.deliver(Message::new("/echo")).is_some());
    }

    #[tokio::test]
    async fn test_unrelated_address_is_returned() {
        let calls = PendingCalls::new();
        let (_guard, _rx) = calls.register("/a").unwrap();
        let back = calls.deliver(Message::new("/b")).unwrap();
        assert_eq!(back.address, "/b");
        assert!(calls.contains("/a"));
    }

    #[tokio::test]
    async fn test_guard_drop_removes_slot() {
        let calls = PendingCalls::new();
        let (guard, _rx) = calls.register("/a").unwrap();
        assert_eq!(calls.len(), 1);
        drop(guard);
        assert_eq!(calls.len(), 0);
    }

    #[tokio::test]
    async fn test_second_register_supersedes_first() {
        let calls = PendingCalls::new();
        let (first_guard, first_rx) = calls.register("/a").unwrap();
        let (_second_guard, second_rx) = calls.register("/a").unwrap();

        let err = first_rx.await.unwrap().unwrap_err();
        assert!(matches!(err, OscError::CallSuperseded(addr) if addr == "/a"));

        // Dropping the stale guard must not remove the newer slot.
        drop(first_guard);
        assert!(calls.contains("/a"));

        calls.deliver(Message::new("/a"));
        assert_eq!(second_rx.await.unwrap().unwrap().address, "/a");
    }

    #[tokio::test]
    async fn test_close_fails_waiters_and_new_calls() {
        let calls = PendingCalls::new();
        let (_guard, rx) = calls.register("/a").unwrap();
        calls.close();

        assert!(calls.is_closed());
        assert!(matches!(rx.await.unwrap(), Err(OscError::ConnectionClosed)));
        assert!(matches!(
            calls.register("/b").map(|_| ()),
            Err(OscError::ConnectionClosed)
        ));
        assert_eq!(calls.len(), 0);
    }
}
