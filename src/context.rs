use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::page::PageStore;

/// Everything a caller needs to reach the storage core: the catalog and
/// the buffer pool. Replaces a process-wide global with a value callers
/// pass explicitly.
pub struct Context {
    pub catalog: Arc<dyn Catalog>,
    pub buffer_pool: Arc<BufferPool>,
}

impl Context {
    pub fn new(catalog: Arc<dyn Catalog>, page_store: Arc<dyn PageStore>, capacity: usize) -> Self {
        Self {
            catalog,
            buffer_pool: Arc::new(BufferPool::new(page_store, capacity)),
        }
    }
}

static GLOBAL: OnceCell<Context> = OnceCell::new();

/// Install the process-wide `Context`, for binaries that want a single
/// ambient instance rather than threading one through explicitly. Only
/// the first call has any effect.
pub fn init_global(catalog: Arc<dyn Catalog>, page_store: Arc<dyn PageStore>, capacity: usize) -> &'static Context {
    GLOBAL.get_or_init(|| Context::new(catalog, page_store, capacity))
}

/// # Panics
/// Panics if [`init_global`] has not been called yet.
pub fn global() -> &'static Context {
    GLOBAL
        .get()
        .expect("context::init_global must be called before context::global")
}
