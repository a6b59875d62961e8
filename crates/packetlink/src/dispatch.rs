//! Single-slot dispatch of inbound packets to the registered handler.
//!
//! At most one handler is registered at a time. Registration replaces the
//! slot atomically with respect to delivery: an in-flight delivery finishes
//! with the handler it snapshotted, and every later delivery sees only the
//! new handler. There is no queue — delivery is synchronous on the caller's
//! context.

use std::sync::{Arc, RwLock};

/// The receive callback. Invoked with (payload, source) for every delivered
/// packet. Must complete quickly; it runs on the transport's receive loop.
pub type ReceiveHandler = Arc<dyn Fn(&[u8], &str) + Send + Sync>;

/// Holds the one handler slot.
pub struct Dispatcher {
    slot: RwLock<Option<ReceiveHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Store a handler, replacing any previous registration.
    pub fn set(&self, handler: ReceiveHandler) {
        *self.slot.write().expect("handler slot poisoned") = Some(handler);
    }

    /// Empty the slot. Packets delivered while unset are silently dropped.
    pub fn clear(&self) {
        *self.slot.write().expect("handler slot poisoned") = None;
    }

    pub fn is_set(&self) -> bool {
        self.slot.read().expect("handler slot poisoned").is_some()
    }

    /// Deliver one packet. Returns whether a handler was invoked.
    ///
    /// The slot is snapshotted under a brief read lock and the handler is
    /// invoked outside it, so a handler may itself register or clear
    /// without deadlocking.
    pub fn deliver(&self, payload: &[u8], source: &str) -> bool {
        let snapshot = self.slot.read().expect("handler slot poisoned").clone();
        match snapshot {
            Some(handler) => {
                handler(payload, source);
                true
            }
            None => false,
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
