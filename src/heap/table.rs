use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use log::debug;

use crate::concurrent_status::Permission;
use crate::database::Database;
use crate::error::{ErrorKind, SmallError};
use crate::heap::buffer_pool::BufferPool;
use crate::heap::page::HeapPage;
use crate::heap::page_id::HeapPageID;
use crate::heap::table_iter::HeapTableIterator;
use crate::storage::schema::Schema;
use crate::storage::tuple::{Tuple, WrappedTuple};
use crate::transaction::Transaction;
use crate::types::{Pod, SmallResult};
use crate::utils::HandyRwLock;

/// A heap file: an unordered collection of fixed-size pages on disk. The
/// file length is always an exact multiple of the page size; pages are
/// numbered densely from 0.
///
/// All page traffic goes through the `BufferPool`; this type only knows
/// how to move raw pages between disk and memory, and how to pick a page
/// for an insert/delete.
pub struct HeapTable {
    pub name: String,

    // the tuple descriptor of records in the file
    pub schema: Schema,

    file: Mutex<File>,

    table_id: u32,

    page_size: usize,
}

impl fmt::Display for HeapTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<HeapTable, name: {}, id: {}>", self.name, self.table_id)
    }
}

// init functions
impl HeapTable {
    pub fn new(table_name: &str, schema: &Schema) -> Self {
        let db_path = Database::global().get_path();
        let table_path = db_path.join(table_name).with_extension("table");

        let f = Mutex::new(
            OpenOptions::new()
                .write(true)
                .read(true)
                .create(true)
                .open(table_path)
                .unwrap(),
        );

        let mut hasher = DefaultHasher::new();
        table_name.hash(&mut hasher);
        SystemTime::now().hash(&mut hasher);
        let table_id = hasher.finish() as u32;

        Self {
            name: table_name.to_string(),
            schema: schema.clone(),
            file: f,
            table_id,
            page_size: Database::config().page_size,
        }
    }
}

// normal read-only functions
impl HeapTable {
    pub fn get_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_schema(&self) -> Schema {
        self.schema.clone()
    }

    pub fn get_page_size(&self) -> usize {
        self.page_size
    }

    pub fn num_pages(&self) -> usize {
        let len = self.get_file().metadata().unwrap().len() as usize;
        (len + self.page_size - 1) / self.page_size
    }

    /// Calculate the number of tuples in the table. Requires an S lock on
    /// all pages, taken by a throwaway transaction.
    pub fn tuples_count(&self) -> usize {
        let tx = Transaction::new();
        let mut it = self.iter(&tx);
        it.open();
        let count = it.by_ref().count();
        tx.commit().unwrap();
        count
    }
}

// page i/o
impl HeapTable {
    /// Read one page image from disk. The page number must be inside
    /// `[0, num_pages)`.
    pub fn read_page(&self, pid: &HeapPageID) -> Result<HeapPage, SmallError> {
        if pid.page_index as usize >= self.num_pages() {
            return Err(SmallError::new(
                ErrorKind::InvalidArgument,
                &format!("page {} does not exist in {}", pid, self),
            ));
        }

        let mut file = self.get_file();
        let start_pos = pid.page_index as usize * self.page_size;
        file.seek(SeekFrom::Start(start_pos as u64))?;

        let mut buf: Vec<u8> = vec![0; self.page_size];
        file.read_exact(&mut buf)?;

        Ok(HeapPage::new(pid, &buf, &self.schema))
    }

    /// Write one page image to its offset. Extending the file happens only
    /// through `append_empty_page`, never here.
    pub fn write_page(&self, page: &HeapPage) -> SmallResult {
        let pid = page.get_pid();
        if pid.page_index as usize > self.num_pages() {
            return Err(SmallError::new(
                ErrorKind::InvalidArgument,
                &format!("page {} is beyond the end of {}", pid, self),
            ));
        }

        let mut file = self.get_file();
        let start_pos = pid.page_index as usize * self.page_size;
        file.seek(SeekFrom::Start(start_pos as u64))?;
        file.write_all(&page.get_page_data())?;
        file.flush()?;

        Ok(())
    }

    /// Append a zero-filled page and return its id.
    fn append_empty_page(&self) -> Result<HeapPageID, SmallError> {
        let mut file = self.get_file();

        let len = file.metadata()?.len();
        let pid = HeapPageID::new(self.table_id, (len as usize / self.page_size) as u32);

        file.seek(SeekFrom::Start(len))?;
        file.write_all(&HeapPage::empty_page_data(self.page_size))?;
        file.flush()?;

        debug!("{}: appended page {}", self, pid);
        Ok(pid)
    }

    pub fn get_file(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap()
    }

    /// Truncate the backing file. Used by tests to start from an empty
    /// table.
    pub fn clear(&self) {
        self.get_file().set_len(0).expect("io error");
    }
}

// tuple operations
impl HeapTable {
    /// Find a page with a free slot (appending a fresh page when every
    /// existing one is full), insert the tuple there, and return the
    /// modified page.
    ///
    /// Pages are scanned under ReadWrite permission; a page that turns out
    /// to be full is released early via `unsafe_release_page`, since
    /// holding an X lock on a page we did not touch would serialize every
    /// concurrent insert.
    pub fn insert_tuple(
        &self,
        tx: &Transaction,
        tuple: &Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, SmallError> {
        if !self.schema.check_tuple(tuple) {
            return Err(SmallError::new(
                ErrorKind::InvalidArgument,
                &format!("tuple {:?} does not match the schema of {}", tuple, self),
            ));
        }

        let mut page_index = 0;
        loop {
            if page_index >= self.num_pages() {
                self.append_empty_page()?;
            }

            let pid = HeapPageID::new(self.table_id, page_index as u32);
            let page_rc = BufferPool::get_page(tx, Permission::ReadWrite, &pid)?;

            if page_rc.rl().empty_slots_count() == 0 {
                // the early release is only safe for pages this
                // transaction has not modified
                if page_rc.rl().dirtier() != Some(tx.get_id()) {
                    BufferPool::unsafe_release_page(tx, &pid);
                }
                page_index += 1;
                continue;
            }

            page_rc.wl().insert_tuple(tuple)?;
            return Ok(vec![page_rc]);
        }
    }

    /// Resolve the tuple's stored location, free its slot, and return the
    /// modified page.
    pub fn delete_tuple(
        &self,
        tx: &Transaction,
        tuple: &WrappedTuple,
    ) -> Result<Vec<Pod<HeapPage>>, SmallError> {
        let pid = tuple.get_pid();
        if pid.get_table_id() != self.table_id {
            return Err(SmallError::new(
                ErrorKind::InvalidArgument,
                &format!("tuple {:?} does not belong to {}", tuple, self),
            ));
        }

        let page_rc = BufferPool::get_page(tx, Permission::ReadWrite, &pid)?;
        page_rc.wl().delete_tuple(tuple.get_slot_number())?;
        Ok(vec![page_rc])
    }

    pub fn iter(&self, tx: &Transaction) -> HeapTableIterator {
        HeapTableIterator::new(tx, self)
    }
}
