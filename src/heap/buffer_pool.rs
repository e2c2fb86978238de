use std::sync::{Arc, RwLock};
use std::thread::sleep;
use std::time::{Duration, Instant};

use log::{debug, error};

use crate::concurrent_status::{Lock, Permission};
use crate::config::DbConfig;
use crate::database::Database;
use crate::error::{ErrorKind, SmallError};
use crate::heap::page::HeapPage;
use crate::heap::page_id::HeapPageID;
use crate::heap::table::HeapTable;
use crate::lru::LruCache;
use crate::storage::tuple::{Tuple, WrappedTuple};
use crate::transaction::Transaction;
use crate::types::{Pod, ResultPod, SmallResult};
use crate::utils::HandyRwLock;

/// BufferPool manages the reading and writing of pages into memory from
/// disk, and is also responsible for locking: when a transaction fetches a
/// page, the pool checks that the transaction has the appropriate lock
/// before the page is handed out.
///
/// The public operations are associated functions that take the `Database`
/// component guards one at a time, in slices. In particular the lock wait
/// in `get_page` holds no guard at all between attempts, so a blocked
/// transaction never prevents another one from using the cache or from
/// committing.
pub struct BufferPool {
    cache: LruCache<HeapPageID, Pod<HeapPage>>,

    page_size: usize,
    capacity: usize,
    lock_timeout: Duration,
    poll_interval: Duration,
}

impl BufferPool {
    pub fn new(config: &DbConfig) -> Self {
        Self {
            cache: LruCache::new(config.buffer_capacity),
            page_size: config.page_size,
            capacity: config.buffer_capacity,
            lock_timeout: config.lock_timeout,
            poll_interval: config.poll_interval,
        }
    }

    pub fn get_page_size(&self) -> usize {
        self.page_size
    }

    /// Retrieve the specified page with the associated permissions. Will
    /// acquire a lock and may block if that lock is held by another
    /// transaction.
    ///
    /// The retrieved page is looked up in the cache. If it is present it
    /// is returned (and becomes most-recently-used). If not, it is read
    /// from the table's file and added to the cache, evicting the
    /// least-recently-used clean page when the cache is at capacity.
    pub fn get_page(tx: &Transaction, perm: Permission, pid: &HeapPageID) -> ResultPod<HeapPage> {
        Self::request_lock(tx, &perm.to_lock(), pid)?;
        Database::mut_buffer_pool().fetch_page(pid)
    }

    /// Request a lock on the given page. This api is blocking: it polls
    /// the lock table until the lock is granted or the deadlock timeout
    /// elapses. A sufficiently long wait is assumed to indicate deadlock;
    /// no cycle detection is performed.
    fn request_lock(tx: &Transaction, lock: &Lock, pid: &HeapPageID) -> SmallResult {
        let (timeout, poll_interval) = {
            let pool = Database::buffer_pool();
            (pool.lock_timeout, pool.poll_interval)
        };

        let start_time = Instant::now();
        loop {
            if Database::mut_concurrent_status().acquire_lock(tx, lock, pid)? {
                return Ok(());
            }

            if start_time.elapsed() > timeout {
                break;
            }

            sleep(poll_interval);
        }

        error!(
            "acquire lock timeout, request: <tx: {}, lock: {:?}, pid: {}>, lock table: {:?}",
            tx,
            lock,
            pid,
            Database::concurrent_status(),
        );

        let err = SmallError::new(ErrorKind::TransactionAborted, "acquire lock timeout");
        err.show_backtrace();
        Err(err)
    }

    /// Cache lookup / disk load. The caller must already hold a lock on
    /// the page.
    fn fetch_page(&mut self, pid: &HeapPageID) -> ResultPod<HeapPage> {
        if let Some(page_rc) = self.cache.get(pid) {
            return Ok(page_rc.clone());
        }

        let table_rc = Self::get_table(pid)?;
        let page = table_rc.rl().read_page(pid)?;
        let page_rc = Arc::new(RwLock::new(page));

        if self.cache.len() >= self.capacity {
            self.evict_page()?;
        }
        self.cache.put(*pid, page_rc.clone());

        Ok(page_rc)
    }

    /// Discard the least-recently-used clean page. Dirty pages are never
    /// written back here: uncommitted data must not reach disk (no steal),
    /// so when every resident page is dirty the eviction fails and the
    /// caller sees `ResourceExhausted`.
    fn evict_page(&mut self) -> SmallResult {
        for pid in self.cache.lru_keys() {
            let is_clean = match self.cache.peek(&pid) {
                Some(page_rc) => page_rc.rl().dirtier().is_none(),
                None => continue,
            };

            if is_clean {
                debug!("evicting page {}", pid);
                self.cache.evict(&pid);
                return Ok(());
            }
        }

        Err(SmallError::new(
            ErrorKind::ResourceExhausted,
            "all pages marked dirty",
        ))
    }

    /// Add a tuple to the specified table on behalf of `tx`. Acquires a
    /// write lock on the page the tuple is added to; marks the returned
    /// pages dirty and (re)inserts them into the cache so future requests
    /// see the up-to-date versions.
    pub fn insert_tuple(tx: &Transaction, table_id: u32, tuple: &Tuple) -> SmallResult {
        let table_rc = Database::catalog().get_table(&table_id).ok_or_else(|| {
            SmallError::new(
                ErrorKind::InvalidArgument,
                &format!("table {} not found", table_id),
            )
        })?;

        let dirtied = table_rc.rl().insert_tuple(tx, tuple)?;
        Self::absorb_dirty_pages(tx, dirtied)
    }

    /// Remove the specified tuple on behalf of `tx`. Acquires a write lock
    /// on the page the tuple lives on; marks the returned pages dirty and
    /// (re)inserts them into the cache.
    pub fn delete_tuple(tx: &Transaction, tuple: &WrappedTuple) -> SmallResult {
        let table_id = tuple.get_pid().get_table_id();
        let table_rc = Database::catalog().get_table(&table_id).ok_or_else(|| {
            SmallError::new(
                ErrorKind::InvalidArgument,
                &format!("table {} not found", table_id),
            )
        })?;

        let dirtied = table_rc.rl().delete_tuple(tx, tuple)?;
        Self::absorb_dirty_pages(tx, dirtied)
    }

    fn absorb_dirty_pages(tx: &Transaction, pages: Vec<Pod<HeapPage>>) -> SmallResult {
        for page_rc in pages {
            let pid = {
                let mut page = page_rc.wl();
                page.set_dirty(tx);
                page.get_pid()
            };

            // guard order: never hold a page guard while taking the pool
            let mut pool = Database::mut_buffer_pool();
            pool.cache.put(pid, page_rc.clone());
            if pool.cache.len() > pool.capacity {
                pool.evict_page()?;
            }
        }

        Ok(())
    }

    /// Releases the lock on a page before the transaction ends, breaking
    /// the two-phase discipline. Calling this is very risky and may result
    /// in wrong behavior. Think hard about who needs to call this and why
    /// they can run the risk of calling it.
    pub fn unsafe_release_page(tx: &Transaction, pid: &HeapPageID) {
        Database::mut_concurrent_status()
            .release_lock(tx, pid)
            .unwrap();
    }

    /// Return true if the specified transaction has a lock on the
    /// specified page.
    pub fn holds_lock(tx: &Transaction, pid: &HeapPageID) -> bool {
        Database::concurrent_status().holds_lock(tx, pid)
    }

    /// Commit or abort a given transaction; release all locks associated
    /// with it afterwards.
    ///
    /// On commit, every page dirtied by the transaction is flushed before
    /// any lock is released (force). On abort, every such page is dropped
    /// from the cache, so the next reader re-reads the pre-transaction
    /// disk image.
    pub fn transaction_complete(tx: &Transaction, commit: bool) -> SmallResult {
        if commit {
            Self::flush_pages(tx)?;
        } else {
            Self::restore_pages(tx)?;
        }

        Database::mut_concurrent_status().release_all(tx)
    }

    /// Write all pages dirtied by the specified transaction to disk and
    /// mark them clean.
    fn flush_pages(tx: &Transaction) -> SmallResult {
        let pool = Database::mut_buffer_pool();

        for pid in pool.cache.lru_keys() {
            let page_rc = match pool.cache.peek(&pid) {
                Some(page_rc) => page_rc.clone(),
                None => continue,
            };

            if page_rc.rl().dirtier() == Some(tx.get_id()) {
                pool.flush_page(&pid, &page_rc)?;
            }
        }

        Ok(())
    }

    /// Drop all pages dirtied by the specified transaction from the cache.
    fn restore_pages(tx: &Transaction) -> SmallResult {
        let mut pool = Database::mut_buffer_pool();

        for pid in pool.cache.lru_keys() {
            let is_victim = match pool.cache.peek(&pid) {
                Some(page_rc) => page_rc.rl().dirtier() == Some(tx.get_id()),
                None => continue,
            };

            if is_victim {
                debug!("discarding page {} dirtied by {}", pid, tx);
                pool.cache.evict(&pid);
            }
        }

        Ok(())
    }

    /// Write the content of a specific page to disk and mark it clean.
    fn flush_page(&self, pid: &HeapPageID, page_rc: &Pod<HeapPage>) -> SmallResult {
        let table_rc = Self::get_table(pid)?;

        debug!("flushing page {}", pid);
        table_rc.rl().write_page(&page_rc.rl())?;
        page_rc.wl().set_clean();

        Ok(())
    }

    /// Flush all dirty pages to disk and mark them clean.
    ///
    /// NB: be careful using this routine: it writes dirty data to disk,
    /// which breaks the no-steal policy if a writing transaction is still
    /// active. It is a maintenance/testing operation, not part of the
    /// commit path.
    pub fn flush_all_pages() -> SmallResult {
        let pool = Database::mut_buffer_pool();

        for pid in pool.cache.lru_keys() {
            let page_rc = match pool.cache.peek(&pid) {
                Some(page_rc) => page_rc.clone(),
                None => continue,
            };

            if page_rc.rl().dirtier().is_some() {
                pool.flush_page(&pid, &page_rc)?;
            }
        }

        Ok(())
    }

    /// Remove the specific page id from the buffer pool, without flushing.
    /// Needed to make sure the pool doesn't keep a rolled back page in its
    /// cache, and after a page has been physically replaced on disk.
    pub fn discard_page(pid: &HeapPageID) {
        Database::mut_buffer_pool().cache.evict(pid);
    }

    // cache observability, used by tests and `Database::reset`

    pub fn contains(pid: &HeapPageID) -> bool {
        Database::buffer_pool().cache.contains(pid)
    }

    pub fn size() -> usize {
        Database::buffer_pool().cache.len()
    }

    pub fn clear() {
        Database::mut_buffer_pool().cache.clear();
    }

    fn get_table(pid: &HeapPageID) -> ResultPod<HeapTable> {
        Database::catalog()
            .get_table(&pid.get_table_id())
            .ok_or_else(|| {
                SmallError::new(
                    ErrorKind::InvalidArgument,
                    &format!("table {} not found", pid.get_table_id()),
                )
            })
    }
}
