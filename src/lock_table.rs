use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::config::LOCK_POLL_INTERVAL_MS;
use crate::types::{PageId, TransactionId};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// The holder set for a single page. A page is either held shared by zero
/// or more transactions, or held exclusively by exactly one.
enum Holders {
    Shared(HashSet<TransactionId>),
    Exclusive(TransactionId),
}

struct LockState {
    holders: HashMap<PageId, Holders>,
    held_by: HashMap<TransactionId, HashSet<PageId>>,
}

/// Page-level two-phase lock manager.
///
/// A single mutex guards every operation below, so a caller never observes
/// a partially-applied grant, release or upgrade. Deadlocks are not
/// detected via a waits-for graph: a caller that cannot acquire its lock
/// within a randomized timeout simply gives up and reports
/// [`SmallError::TransactionAborted`](crate::error::SmallError), which is
/// expected to cascade into an abort of the whole transaction.
pub struct LockTable {
    state: Mutex<LockState>,
}

impl LockTable {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockState {
                holders: HashMap::new(),
                held_by: HashMap::new(),
            }),
        }
    }

    /// Attempt to acquire `mode` on `pid` for `tid`, polling until either
    /// the lock is granted or `timeout` elapses. Returns `false` on
    /// timeout; the caller owns none of the lock-table state in that case.
    pub fn try_acquire(
        &self,
        pid: PageId,
        tid: TransactionId,
        mode: LockMode,
        timeout: Duration,
    ) -> bool {
        let start = Instant::now();
        loop {
            {
                let mut state = self.state.lock().unwrap();
                if Self::acquire_step(&mut state.holders, pid, tid, mode) {
                    state.held_by.entry(tid).or_insert_with(HashSet::new).insert(pid);
                    debug!("{} acquired {:?} on {}", tid, mode, pid);
                    return true;
                }
            }
            if start.elapsed() >= timeout {
                debug!("{} timed out waiting for {:?} on {}", tid, mode, pid);
                return false;
            }
            thread::sleep(Duration::from_millis(LOCK_POLL_INTERVAL_MS));
        }
    }

    /// One non-blocking decision step: grant, deny or upgrade. Holds no
    /// lock of its own; the caller already holds `self.state`.
    fn acquire_step(
        holders: &mut HashMap<PageId, Holders>,
        pid: PageId,
        tid: TransactionId,
        mode: LockMode,
    ) -> bool {
        match holders.get_mut(&pid) {
            None => {
                let entry = match mode {
                    LockMode::Shared => {
                        let mut set = HashSet::new();
                        set.insert(tid);
                        Holders::Shared(set)
                    }
                    LockMode::Exclusive => Holders::Exclusive(tid),
                };
                holders.insert(pid, entry);
                true
            }
            Some(Holders::Exclusive(holder)) => *holder == tid,
            Some(Holders::Shared(set)) => {
                if set.contains(&tid) {
                    match mode {
                        LockMode::Shared => true,
                        LockMode::Exclusive => {
                            if set.len() == 1 {
                                holders.insert(pid, Holders::Exclusive(tid));
                                true
                            } else {
                                false
                            }
                        }
                    }
                } else {
                    match mode {
                        LockMode::Shared => {
                            set.insert(tid);
                            true
                        }
                        LockMode::Exclusive => false,
                    }
                }
            }
        }
    }

    /// Release `tid`'s lock on `pid`, if it holds one. Returns whether a
    /// lock was actually released.
    pub fn release(&self, pid: PageId, tid: TransactionId) -> bool {
        let mut state = self.state.lock().unwrap();
        let mut released = false;
        let mut now_empty = false;
        if let Some(holders) = state.holders.get_mut(&pid) {
            match holders {
                Holders::Exclusive(holder) => {
                    if *holder == tid {
                        released = true;
                        now_empty = true;
                    }
                }
                Holders::Shared(set) => {
                    if set.remove(&tid) {
                        released = true;
                        now_empty = set.is_empty();
                    }
                }
            }
        }
        if now_empty {
            state.holders.remove(&pid);
        }
        if released {
            if let Some(pages) = state.held_by.get_mut(&tid) {
                pages.remove(&pid);
                if pages.is_empty() {
                    state.held_by.remove(&tid);
                }
            }
        }
        released
    }

    /// Release every lock `tid` currently holds, e.g. at transaction
    /// commit or abort.
    pub fn release_all_for_transaction(&self, tid: TransactionId) {
        let pages: Vec<PageId> = {
            let state = self.state.lock().unwrap();
            state
                .held_by
                .get(&tid)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default()
        };
        for pid in pages {
            self.release(pid, tid);
        }
    }

    pub fn holds(&self, pid: PageId, tid: TransactionId) -> bool {
        let state = self.state.lock().unwrap();
        match state.holders.get(&pid) {
            Some(Holders::Exclusive(holder)) => *holder == tid,
            Some(Holders::Shared(set)) => set.contains(&tid),
            None => false,
        }
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}
