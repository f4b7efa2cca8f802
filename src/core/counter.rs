use crate::domain::model::QueryId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic query id source. The first id handed out is 1.
#[derive(Debug)]
pub struct IdCounter {
    next: AtomicU64,
}

impl IdCounter {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> QueryId {
        QueryId(self.next.fetch_add(1, Ordering::SeqCst))
    }

    /// Ids issued so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::SeqCst).saturating_sub(1)
    }
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::new()
    }
}
