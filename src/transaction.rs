use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::heap::buffer_pool::BufferPool;
use crate::types::SmallResult;

pub type TransactionID = u64;

static TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// A logical unit of work.
///
/// Ids increase monotonically by 1 and are process-unique; the total order
/// is what breaks ties when two transactions race to upgrade a lock on the
/// same page.
#[derive(Eq, PartialEq, Clone)]
pub struct Transaction {
    id: TransactionID,
}

impl Transaction {
    pub fn new() -> Self {
        let id = TRANSACTION_ID.fetch_add(1, Ordering::Relaxed);
        Self { id }
    }

    pub fn get_id(&self) -> TransactionID {
        self.id
    }

    /// Flush every page this transaction dirtied (force), then release all
    /// of its locks.
    pub fn commit(&self) -> SmallResult {
        BufferPool::transaction_complete(self, true)
    }

    /// Discard every page this transaction dirtied (the next reader gets
    /// the pre-transaction disk image), then release all of its locks.
    pub fn abort(&self) -> SmallResult {
        BufferPool::transaction_complete(self, false)
    }
}

impl std::hash::Hash for Transaction {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.id)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
