use std::collections::HashMap;
use std::sync::Arc;

use embx_core::CacheKey;
use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;

use crate::normalize::ItemOutcome;

/// Resolves once the owner of a key publishes its outcome.
pub(crate) type Pending = Shared<oneshot::Receiver<ItemOutcome>>;

type Slots = Arc<Mutex<HashMap<CacheKey, Pending>>>;

/// Keys with a remote call currently running, shared by every batch on one
/// dispatcher.
#[derive(Clone, Default)]
pub(crate) struct InFlight {
    slots: Slots,
}

pub(crate) enum Claim {
    /// The caller must start the call and resolve the ticket. The receiver
    /// lets the owner wait on its own result exactly like a waiter.
    Owner(Ticket, Pending),
    /// Someone else is already running it.
    Waiter(Pending),
}

impl InFlight {
    pub(crate) fn claim(&self, key: CacheKey) -> Claim {
        let mut slots = self.slots.lock();
        if let Some(pending) = slots.get(&key) {
            return Claim::Waiter(pending.clone());
        }
        let (tx, rx) = oneshot::channel();
        let pending = rx.shared();
        slots.insert(key, pending.clone());
        let ticket = Ticket {
            key,
            tx: Some(tx),
            slots: Arc::clone(&self.slots),
        };
        Claim::Owner(ticket, pending)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Ownership of one in-flight key, held by the detached task running the
/// call. Dropping it unresolved releases the key and wakes waiters with a
/// cancellation.
pub(crate) struct Ticket {
    key: CacheKey,
    tx: Option<oneshot::Sender<ItemOutcome>>,
    slots: Slots,
}

impl Ticket {
    pub(crate) const fn key(&self) -> &CacheKey {
        &self.key
    }

    pub(crate) fn resolve(mut self, outcome: ItemOutcome) {
        self.slots.lock().remove(&self.key);
        if let Some(tx) = self.tx.take() {
            // No receiver left means every waiter gave up; nothing to do.
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.slots.lock().remove(&self.key);
        }
    }
}
