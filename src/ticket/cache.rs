use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Process-wide map from account name to its most recent API ticket.
///
/// Created once by the host and handed to every session. Clones share the
/// same map. Entries are overwritten on each successful fetch and never expire.
#[derive(Debug, Clone, Default)]
pub struct TicketCache {
    tickets: Arc<Mutex<HashMap<String, String>>>,
}

impl TicketCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account: &str) -> Option<String> {
        self.lock().get(account).cloned()
    }

    /// Store `ticket` for `account`, returning the ticket it replaced.
    pub fn insert(&self, account: &str, ticket: impl Into<String>) -> Option<String> {
        self.lock().insert(account.to_string(), ticket.into())
    }

    pub fn contains(&self, account: &str) -> bool {
        self.lock().contains_key(account)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every cached ticket. Used on shutdown.
    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock cannot leave the map half-written.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.tickets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
