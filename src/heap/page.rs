use bit_vec::BitVec;

use crate::error::{ErrorKind, SmallError};
use crate::heap::page_id::HeapPageID;
use crate::storage::schema::Schema;
use crate::storage::tuple::{Tuple, WrappedTuple};
use crate::transaction::{Transaction, TransactionID};
use crate::types::SmallResult;

/// A fixed-size slotted page holding fixed-length records.
///
/// Layout: a slot-status bitmap (1 bit per slot, true means occupied),
/// followed by `slot_count` record images, followed by zero padding up to
/// the page size. Empty slots keep their byte range; only the bitmap says
/// whether a slot is live.
#[derive(Debug)]
pub struct HeapPage {
    pid: HeapPageID,

    pub slot_count: usize,

    // indicate slots' status: true means occupied, false means empty
    header: BitVec<u32>,

    // all tuples (include images of empty slots)
    tuples: Vec<Tuple>,

    schema: Schema,

    page_size: usize,

    // the uncommitted transaction that last modified this page, if any
    dirtier: Option<TransactionID>,
}

impl HeapPage {
    pub fn new(pid: &HeapPageID, bytes: &[u8], schema: &Schema) -> Self {
        let page_size = bytes.len();
        let slot_count = Self::calculate_slots_count(schema, page_size);
        let header_size = Self::calculate_header_size(slot_count);

        let mut tuples = Vec::with_capacity(slot_count);
        for i in 0..slot_count {
            let start = header_size + i * schema.get_size();
            let end = start + schema.get_size();
            tuples.push(Tuple::from_bytes(&bytes[start..end], schema));
        }

        Self {
            pid: *pid,
            slot_count,
            header: BitVec::from_bytes(&bytes[..header_size]),
            tuples,
            schema: schema.clone(),
            page_size,
            dirtier: None,
        }
    }

    /// Byte image of an empty page. Zero-filled, so every slot reads as
    /// free.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0; page_size]
    }

    /// The maximum number of records a page of `page_size` bytes can hold:
    /// each record costs its own bytes plus one header bit.
    pub fn calculate_slots_count(schema: &Schema, page_size: usize) -> usize {
        let bits_per_tuple_including_header = schema.get_size() * 8 + 1;
        let mut slot_count = page_size * 8 / bits_per_tuple_including_header;

        // invariant: header bytes + record bytes fit in the page
        while Self::calculate_header_size(slot_count) + slot_count * schema.get_size() > page_size {
            slot_count -= 1;
        }

        slot_count
    }

    /// Bytes taken by the slot bitmap at the head of the page.
    pub fn calculate_header_size(slot_count: usize) -> usize {
        slot_count / 8 + 1
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    /// serialize back into exactly `page_size` bytes
    pub fn get_page_data(&self) -> Vec<u8> {
        let header_size = Self::calculate_header_size(self.slot_count);

        let mut data = Vec::with_capacity(self.page_size);
        data.extend_from_slice(&self.header.to_bytes()[..header_size]);
        for tuple in &self.tuples {
            data.extend_from_slice(&tuple.to_bytes(&self.schema));
        }
        data.resize(self.page_size, 0);
        data
    }
}

// slot operations
impl HeapPage {
    /// Put the tuple into the first empty slot and mark the slot used.
    pub fn insert_tuple(&mut self, tuple: &Tuple) -> SmallResult {
        for i in 0..self.slot_count {
            if !self.is_slot_used(i) {
                self.tuples[i] = tuple.clone();
                self.mark_slot_status(i, true);
                return Ok(());
            }
        }

        Err(SmallError::new(
            ErrorKind::InvalidArgument,
            &format!("no empty slot on page {}", self.pid),
        ))
    }

    /// Mark the slot free. The record bytes stay behind until the slot is
    /// reused.
    pub fn delete_tuple(&mut self, slot_index: usize) -> SmallResult {
        if slot_index >= self.slot_count || !self.is_slot_used(slot_index) {
            return Err(SmallError::new(
                ErrorKind::InvalidArgument,
                &format!("slot {} of page {} is not in use", slot_index, self.pid),
            ));
        }

        self.mark_slot_status(slot_index, false);
        Ok(())
    }

    pub fn get_tuple(&self, slot_index: usize) -> Option<Tuple> {
        if self.is_slot_used(slot_index) {
            return Some(self.tuples[slot_index].clone());
        }
        None
    }

    pub fn is_slot_used(&self, slot_index: usize) -> bool {
        self.header[slot_index]
    }

    pub fn mark_slot_status(&mut self, slot_index: usize, used: bool) {
        self.header.set(slot_index, used);
    }

    pub fn empty_slots_count(&self) -> usize {
        let mut count = 0;
        for i in 0..self.slot_count {
            if !self.is_slot_used(i) {
                count += 1;
            }
        }
        count
    }

    /// Returns the number of tuples currently stored on this page.
    pub fn tuples_count(&self) -> usize {
        self.slot_count - self.empty_slots_count()
    }
}

// dirty marker
impl HeapPage {
    pub fn set_dirty(&mut self, tx: &Transaction) {
        self.dirtier = Some(tx.get_id());
    }

    pub fn set_clean(&mut self) {
        self.dirtier = None;
    }

    pub fn dirtier(&self) -> Option<TransactionID> {
        self.dirtier
    }
}

/// Occupied slots of one page, in slot order.
pub struct HeapPageIterator<'page> {
    page: &'page HeapPage,
    cursor: i64,
}

impl<'page> HeapPageIterator<'page> {
    pub fn new(page: &'page HeapPage) -> Self {
        Self { page, cursor: -1 }
    }
}

impl<'page> Iterator for HeapPageIterator<'page> {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.cursor += 1;
            let cursor = self.cursor as usize;
            if cursor >= self.page.slot_count {
                return None;
            }

            if self.page.is_slot_used(cursor) {
                return Some(WrappedTuple::new(
                    &self.page.tuples[cursor],
                    cursor,
                    self.page.get_pid(),
                ));
            }
        }
    }
}
