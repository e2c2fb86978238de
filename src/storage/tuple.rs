use std::fmt;

use crate::heap::page_id::HeapPageID;
use crate::storage::cell::Cell;
use crate::storage::schema::Schema;

#[derive(Clone)]
pub struct Tuple {
    cells: Vec<Cell>,
}

// constructors
impl Tuple {
    pub fn new(cells: &Vec<Cell>) -> Self {
        Self {
            cells: cells.to_vec(),
        }
    }

    /// A tuple with the same integer in every column. Handy for tests.
    pub fn new_int_tuple(value: i64, width: usize) -> Self {
        Self {
            cells: vec![Cell::Int64(value); width],
        }
    }

    pub fn from_bytes(bytes: &[u8], schema: &Schema) -> Self {
        let mut cells: Vec<Cell> = Vec::new();
        let mut pos = 0;
        for field in &schema.fields {
            let size = field.t.size();
            cells.push(Cell::from_bytes(&bytes[pos..pos + size], &field.t));
            pos += size;
        }
        Self { cells }
    }
}

impl Tuple {
    pub fn get_cell(&self, i: usize) -> Cell {
        self.cells[i].clone()
    }

    pub fn get_cells(&self) -> &Vec<Cell> {
        &self.cells
    }

    /// serialize against `schema` into exactly `schema.get_size()` bytes
    pub fn to_bytes(&self, schema: &Schema) -> Vec<u8> {
        let mut buf = Vec::with_capacity(schema.get_size());
        for (cell, field) in self.cells.iter().zip(schema.fields.iter()) {
            buf.extend_from_slice(&cell.to_bytes(&field.t));
        }
        buf
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        if self.cells.len() != other.cells.len() {
            return false;
        }

        for (i, cell) in self.cells.iter().enumerate() {
            if cell != &other.cells[i] {
                return false;
            }
        }

        true
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut content: String = "{".to_owned();
        for cell in &self.cells {
            content.push_str(&format!("{:?}, ", cell));
        }
        if !self.cells.is_empty() {
            content.truncate(content.len() - 2);
        }
        content.push('}');
        write!(f, "{}", content)
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A tuple together with its storage location (page + slot). The location
/// is what `HeapTable::delete_tuple` needs to find the record again.
#[derive(PartialEq)]
pub struct WrappedTuple {
    internal: Tuple,
    slot_number: usize,
    pid: HeapPageID,
}

impl std::ops::Deref for WrappedTuple {
    type Target = Tuple;
    fn deref(&self) -> &Self::Target {
        &self.internal
    }
}

impl WrappedTuple {
    pub fn new(internal: &Tuple, slot_number: usize, pid: HeapPageID) -> WrappedTuple {
        WrappedTuple {
            internal: internal.clone(),
            slot_number,
            pid,
        }
    }

    pub fn get_slot_number(&self) -> usize {
        self.slot_number
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_tuple(&self) -> &Tuple {
        &self.internal
    }
}

impl fmt::Display for WrappedTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}@{}#{}", self.get_tuple(), self.pid, self.slot_number)
    }
}

impl fmt::Debug for WrappedTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
