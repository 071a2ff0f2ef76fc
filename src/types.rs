use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a single fixed-size page within a table's backing file.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct PageId {
    pub table_id: i32,
    pub page_number: i32,
}

impl PageId {
    pub fn new(table_id: i32, page_number: i32) -> Self {
        Self {
            table_id,
            page_number,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "page({}, {})", self.table_id, self.page_number)
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle identifying a logical transaction across its lifetime.
///
/// Ids are minted from a monotonic counter, the same approach the rest of
/// this lineage uses for its transaction ids.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new() -> Self {
        let id = NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed);
        Self(id)
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.0)
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
