use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use pagebase::buffer_pool::BufferPool;
use pagebase::error::SmallResult;
use pagebase::page::{Page, PageStore};
use pagebase::permissions::Permission;
use pagebase::types::{PageId, TransactionId};

pub const TEST_PAGE_SIZE: usize = 64;

/// A minimal `Page` backed by a fixed-size byte buffer. Real implementations
/// would parse a tuple layout out of these bytes; the tests only care that
/// writes round-trip and dirty stamping is observable.
pub struct FixedPage {
    id: PageId,
    data: Vec<u8>,
    dirty: Option<TransactionId>,
}

impl FixedPage {
    pub fn new(id: PageId, data: Vec<u8>) -> Self {
        Self {
            id,
            data,
            dirty: None,
        }
    }
}

impl Page for FixedPage {
    fn get_id(&self) -> PageId {
        self.id
    }

    fn is_dirty(&self) -> Option<TransactionId> {
        self.dirty
    }

    fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirty = if dirty { Some(tid) } else { None };
    }

    fn get_page_data(&self) -> Vec<u8> {
        self.data.clone()
    }

    fn set_page_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }
}

/// A `PageStore` over a single temp file, one fixed-size page per table id,
/// always at page number 0. Good enough to exercise `BufferPool`'s
/// lock-then-cache-then-load path and its commit/abort durability without
/// pulling in a real heap-file/tuple codec.
pub struct FileStore {
    file: Mutex<std::fs::File>,
}

impl FileStore {
    pub fn new(path: &Path) -> Self {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .unwrap();
        file.set_len((pagebase::config::page_size() * 256) as u64).unwrap();
        Self {
            file: Mutex::new(file),
        }
    }

    fn offset(table_id: i32) -> u64 {
        (table_id as u64) * pagebase::config::page_size() as u64
    }
}

impl PageStore for FileStore {
    fn read_page(&self, pid: PageId) -> SmallResult<Box<dyn Page>> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(Self::offset(pid.table_id)))?;
        let mut buf = vec![0u8; pagebase::config::page_size()];
        file.read_exact(&mut buf)?;
        Ok(Box::new(FixedPage::new(pid, buf)))
    }

    fn write_page(&self, page: &dyn Page) -> SmallResult<()> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(Self::offset(page.get_id().table_id)))?;
        file.write_all(&page.get_page_data())?;
        Ok(())
    }

    fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: i32,
        tuple: &[u8],
        pool: &BufferPool,
    ) -> SmallResult<Vec<Arc<RwLock<Box<dyn Page>>>>> {
        let pid = PageId::new(table_id, 0);
        let page = pool.get_page(tid, pid, Permission::ReadWrite)?;
        {
            let mut guard = page.write().unwrap();
            let mut data = guard.get_page_data();
            let n = tuple.len().min(data.len());
            data[..n].copy_from_slice(&tuple[..n]);
            guard.set_page_data(data);
        }
        Ok(vec![page])
    }

    fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &[u8],
        pool: &BufferPool,
    ) -> SmallResult<Vec<Arc<RwLock<Box<dyn Page>>>>> {
        // test convention: the tuple's first byte carries the table id of
        // the page it lives on
        let table_id = *tuple.first().unwrap_or(&0) as i32;
        let pid = PageId::new(table_id, 0);
        let page = pool.get_page(tid, pid, Permission::ReadWrite)?;
        {
            let mut guard = page.write().unwrap();
            let zeroed = vec![0u8; pagebase::config::page_size()];
            guard.set_page_data(zeroed);
        }
        Ok(vec![page])
    }
}

pub fn setup() -> (tempfile::TempDir, Arc<FileStore>) {
    pagebase::logging::init_log();
    pagebase::config::set_page_size(TEST_PAGE_SIZE);
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(&dir.path().join("data.store")));
    (dir, store)
}
