use std::fmt;

/// HeapPageID identifies a unique page in a heap file.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct HeapPageID {
    pub table_id: u32,

    /// the position of the page in the table, start from 0
    pub page_index: u32,
}

impl HeapPageID {
    pub fn new(table_id: u32, page_index: u32) -> Self {
        Self {
            table_id,
            page_index,
        }
    }

    pub fn get_table_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_short_repr(&self) -> String {
        format!("heap_{}_{}", self.table_id, self.page_index)
    }
}

impl fmt::Display for HeapPageID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.get_short_repr())
    }
}

impl fmt::Debug for HeapPageID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
