use crate::concurrent_status::Permission;
use crate::heap::buffer_pool::BufferPool;
use crate::heap::page::HeapPageIterator;
use crate::heap::page_id::HeapPageID;
use crate::heap::table::HeapTable;
use crate::storage::tuple::WrappedTuple;
use crate::transaction::Transaction;
use crate::utils::HandyRwLock;

/// A lazy, forward-only, restartable scan over every tuple of a table.
///
/// Pages are fetched one at a time through the buffer pool under ReadOnly
/// permission, and the occupied slots of the current page are walked in
/// slot order. The page count is captured at open time, so the scan is
/// bounded by the file size as it was then. `close` drops the page cursor
/// only; the read locks persist until the transaction ends, per strict
/// two-phase locking.
pub struct HeapTableIterator {
    tx: Transaction,

    table_id: u32,

    // number of pages at open time
    num_pages: usize,

    // index of the next page to fetch
    page_index: usize,

    // occupied slots of the current page, in slot order
    page_tuples: std::vec::IntoIter<WrappedTuple>,

    is_open: bool,
}

impl HeapTableIterator {
    pub fn new(tx: &Transaction, table: &HeapTable) -> Self {
        Self {
            tx: tx.clone(),
            table_id: table.get_id(),
            num_pages: table.num_pages(),
            page_index: 0,
            page_tuples: Vec::new().into_iter(),
            is_open: false,
        }
    }

    pub fn open(&mut self) {
        self.is_open = true;
        self.page_index = 0;
        self.page_tuples = Vec::new().into_iter();
    }

    /// Restart the scan from page 0.
    pub fn rewind(&mut self) {
        self.open();
    }

    /// Stop the scan. Locks already taken stay with the transaction.
    pub fn close(&mut self) {
        self.is_open = false;
        self.page_tuples = Vec::new().into_iter();
    }

    /// Fetch the next page and buffer its occupied slots. Returns false
    /// when the scan has run out of pages.
    fn advance_page(&mut self) -> bool {
        if self.page_index >= self.num_pages {
            return false;
        }

        let pid = HeapPageID::new(self.table_id, self.page_index as u32);
        self.page_index += 1;

        let page_rc = BufferPool::get_page(&self.tx, Permission::ReadOnly, &pid).unwrap();
        let page = page_rc.rl();
        self.page_tuples = HeapPageIterator::new(&page)
            .collect::<Vec<WrappedTuple>>()
            .into_iter();

        true
    }
}

impl Iterator for HeapTableIterator {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.is_open {
            return None;
        }

        loop {
            if let Some(tuple) = self.page_tuples.next() {
                return Some(tuple);
            }

            if !self.advance_page() {
                return None;
            }
        }
    }
}
