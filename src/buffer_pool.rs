use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use log::{debug, error, info};
use rand::Rng;

use crate::config::{DEFAULT_BUFFER_POOL_PAGES, LOCK_TIMEOUT_MAX_MS, LOCK_TIMEOUT_MIN_MS};
use crate::error::{SmallError, SmallResult};
use crate::lock_table::LockTable;
use crate::page::{Page, PageStore};
use crate::page_cache::PageCache;
use crate::permissions::Permission;
use crate::types::{PageId, TransactionId};

#[derive(Clone)]
struct CachedPage {
    page: Arc<RwLock<Box<dyn Page>>>,
    dirty: Option<TransactionId>,
}

/// The buffer pool: a bounded cache of pages guarded by a page-level lock
/// manager, with a no-steal eviction policy and force-at-commit durability.
///
/// `getPage` acquires the requested lock before touching the cache, so a
/// transaction can never observe a page it isn't entitled to. Eviction only
/// ever removes clean pages; if every resident page is dirty,
/// `get_page` reports [`SmallError::DbException`] rather than stealing one.
pub struct BufferPool {
    page_store: Arc<dyn PageStore>,
    lock_table: LockTable,
    cache: Mutex<PageCache<CachedPage>>,
}

impl BufferPool {
    pub fn new(page_store: Arc<dyn PageStore>, capacity: usize) -> Self {
        Self {
            page_store,
            lock_table: LockTable::new(),
            cache: Mutex::new(PageCache::new(capacity)),
        }
    }

    pub fn with_default_capacity(page_store: Arc<dyn PageStore>) -> Self {
        Self::new(page_store, DEFAULT_BUFFER_POOL_PAGES)
    }

    /// Fetch `pid` under `perm` on behalf of `tid`, acquiring the
    /// corresponding lock first. On a cache miss, reads through to the
    /// backing store and, if the cache is full, evicts a clean page first.
    ///
    /// Returns [`SmallError::TransactionAborted`] if the lock could not be
    /// acquired before its randomized timeout elapsed.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
    ) -> SmallResult<Arc<RwLock<Box<dyn Page>>>> {
        let mode = perm.to_lock_mode();
        let timeout_ms = rand::thread_rng().gen_range(LOCK_TIMEOUT_MIN_MS, LOCK_TIMEOUT_MAX_MS);
        if !self
            .lock_table
            .try_acquire(pid, tid, mode, Duration::from_millis(timeout_ms))
        {
            return Err(SmallError::TransactionAborted);
        }

        {
            let mut cache = self.cache.lock().unwrap();
            if let Some(entry) = cache.get(&pid) {
                debug!("{} cache hit for {}", tid, pid);
                return Ok(entry.page);
            }
        }
        debug!("{} cache miss for {}, reading through", tid, pid);

        let page = self.page_store.read_page(pid)?;
        let page_arc: Arc<RwLock<Box<dyn Page>>> = Arc::new(RwLock::new(page));
        {
            let mut cache = self.cache.lock().unwrap();
            if let Some(entry) = cache.get(&pid) {
                // another thread raced us to the miss; their copy wins
                return Ok(entry.page);
            }
            if cache.size() >= cache.capacity() {
                Self::evict_locked(&mut cache)?;
            }
            cache.put(
                pid,
                CachedPage {
                    page: page_arc.clone(),
                    dirty: None,
                },
            );
        }
        Ok(page_arc)
    }

    /// Evict the least-recently-used clean page. Dirty pages are never
    /// stolen; if none are clean this is a storage-level invariant
    /// violation under the no-steal policy.
    fn evict_locked(cache: &mut PageCache<CachedPage>) -> SmallResult<()> {
        let victim = cache
            .reverse_iterate()
            .find(|(_, entry)| entry.dirty.is_none())
            .map(|(pid, _)| *pid);
        match victim {
            Some(pid) => {
                info!("evicting clean page {}", pid);
                cache.remove(&pid);
                Ok(())
            }
            None => Err(SmallError::db("all pages in the buffer pool are dirty")),
        }
    }

    /// Discard `pid` from the cache without writing it back, regardless of
    /// its dirty stamp. The caller is responsible for holding whatever lock
    /// makes this safe.
    pub fn discard_page(&self, pid: PageId) {
        let mut cache = self.cache.lock().unwrap();
        cache.remove(&pid);
    }

    pub fn insert_tuple(&self, tid: TransactionId, table_id: i32, tuple: &[u8]) -> SmallResult<()> {
        let pages = self.page_store.insert_tuple(tid, table_id, tuple, self)?;
        self.absorb_dirtied_pages(tid, pages);
        Ok(())
    }

    pub fn delete_tuple(&self, tid: TransactionId, tuple: &[u8]) -> SmallResult<()> {
        let pages = self.page_store.delete_tuple(tid, tuple, self)?;
        self.absorb_dirtied_pages(tid, pages.clone());
        for page_arc in pages {
            let page = page_arc.read().unwrap();
            self.page_store.write_page(&**page)?;
        }
        Ok(())
    }

    fn absorb_dirtied_pages(&self, tid: TransactionId, pages: Vec<Arc<RwLock<Box<dyn Page>>>>) {
        let mut cache = self.cache.lock().unwrap();
        for page_arc in pages {
            let pid = page_arc.read().unwrap().get_id();
            page_arc.write().unwrap().mark_dirty(true, tid);
            cache.put(
                pid,
                CachedPage {
                    page: page_arc,
                    dirty: Some(tid),
                },
            );
        }
    }

    /// Finish `tid`: on commit, force its dirty pages to disk; on abort,
    /// discard and reload them from disk so later readers see the
    /// pre-transaction image. Either way, every lock `tid` holds is
    /// released afterward.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) {
        if commit {
            self.flush_pages(tid);
        } else {
            self.reload_pages(tid);
        }
        self.lock_table.release_all_for_transaction(tid);
    }

    /// Write every page `tid` has dirtied through to the backing store and
    /// clear their dirty stamps. Exposed separately from
    /// `transaction_complete` so a caller can force durability mid-transaction
    /// without releasing its locks.
    pub fn flush_pages(&self, tid: TransactionId) {
        let dirtied: Vec<(PageId, Arc<RwLock<Box<dyn Page>>>)> = {
            let cache = self.cache.lock().unwrap();
            cache
                .forward_iterate()
                .filter(|(_, entry)| entry.dirty == Some(tid))
                .map(|(pid, entry)| (*pid, entry.page.clone()))
                .collect()
        };
        for (pid, page_arc) in dirtied {
            let result = {
                let page = page_arc.read().unwrap();
                self.page_store.write_page(&**page)
            };
            match result {
                Ok(()) => {
                    let mut cache = self.cache.lock().unwrap();
                    if let Some(entry) = cache.get_mut(&pid) {
                        entry.dirty = None;
                    }
                }
                Err(e) => error!("failed to flush {} for {}: {}", pid, tid, e),
            }
        }
    }

    fn reload_pages(&self, tid: TransactionId) {
        let pids: Vec<PageId> = {
            let cache = self.cache.lock().unwrap();
            cache
                .forward_iterate()
                .filter(|(_, entry)| entry.dirty == Some(tid))
                .map(|(pid, _)| *pid)
                .collect()
        };
        for pid in pids {
            {
                let mut cache = self.cache.lock().unwrap();
                cache.remove(&pid);
            }
            match self.page_store.read_page(pid) {
                Ok(page) => {
                    let mut cache = self.cache.lock().unwrap();
                    cache.put(
                        pid,
                        CachedPage {
                            page: Arc::new(RwLock::new(page)),
                            dirty: None,
                        },
                    );
                }
                Err(e) => error!("failed to reload {} after abort of {}: {}", pid, tid, e),
            }
        }
    }

    /// Write every dirty page to disk, regardless of which transaction
    /// dirtied it. Used for checkpoints, not for per-transaction commit.
    pub fn flush_all_pages(&self) {
        let dirtied: Vec<(PageId, Arc<RwLock<Box<dyn Page>>>)> = {
            let cache = self.cache.lock().unwrap();
            cache
                .forward_iterate()
                .filter(|(_, entry)| entry.dirty.is_some())
                .map(|(pid, entry)| (*pid, entry.page.clone()))
                .collect()
        };
        for (pid, page_arc) in dirtied {
            let result = {
                let page = page_arc.read().unwrap();
                self.page_store.write_page(&**page)
            };
            match result {
                Ok(()) => {
                    let mut cache = self.cache.lock().unwrap();
                    if let Some(entry) = cache.get_mut(&pid) {
                        entry.dirty = None;
                    }
                }
                Err(e) => error!("failed to flush {}: {}", pid, e),
            }
        }
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_table.holds(pid, tid)
    }

    /// Release a single lock outside the normal commit/abort path. Named
    /// `unsafe` because callers bypass the two-phase discipline when they
    /// use it; it exists for index-structure operations that must release
    /// a page early (e.g. after splitting a node) rather than holding it
    /// for the whole transaction.
    pub fn unsafe_release_page(&self, tid: TransactionId, pid: PageId) -> bool {
        debug!("{} releasing {} outside of transaction_complete", tid, pid);
        self.lock_table.release(pid, tid)
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().unwrap().capacity()
    }

    pub fn size(&self) -> usize {
        self.cache.lock().unwrap().size()
    }
}
