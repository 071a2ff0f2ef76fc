use std::sync::{Arc, RwLock};

use crate::buffer_pool::BufferPool;
use crate::error::SmallResult;
use crate::types::{PageId, TransactionId};

/// The narrow surface the buffer pool requires from a concrete page type.
/// Everything about the page's on-disk layout and tuple encoding lives
/// outside this crate.
pub trait Page: Send + Sync {
    fn get_id(&self) -> PageId;

    /// The transaction that last dirtied this page, if any.
    fn is_dirty(&self) -> Option<TransactionId>;

    fn mark_dirty(&mut self, dirty: bool, tid: TransactionId);

    fn get_page_data(&self) -> Vec<u8>;

    /// Replace the page's raw contents. Not part of the minimal contract
    /// the buffer pool itself calls, but every mutator a real `PageStore`
    /// uses to change a page in place needs some such hook.
    fn set_page_data(&mut self, data: Vec<u8>);
}

/// The on-disk collaborator `BufferPool` delegates page I/O and tuple
/// mutation to. Implementations own heap-file layout, tuple encoding and
/// the catalog lookup from table id to file path - none of which are this
/// crate's concern.
pub trait PageStore: Send + Sync {
    fn read_page(&self, pid: PageId) -> SmallResult<Box<dyn Page>>;

    fn write_page(&self, page: &dyn Page) -> SmallResult<()>;

    /// Insert `tuple` into table `table_id`, returning every page the
    /// insertion dirtied. Implementations typically call back into
    /// `pool.get_page(tid, pid, Permission::ReadWrite)` to fetch the pages
    /// they mutate, so inserts observe the same two-phase locking as any
    /// other access.
    fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: i32,
        tuple: &[u8],
        pool: &BufferPool,
    ) -> SmallResult<Vec<Arc<RwLock<Box<dyn Page>>>>>;

    /// Delete `tuple`, returning every page the deletion dirtied.
    fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &[u8],
        pool: &BufferPool,
    ) -> SmallResult<Vec<Arc<RwLock<Box<dyn Page>>>>>;
}
