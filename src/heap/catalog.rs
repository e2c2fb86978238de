use std::collections::HashMap;

use crate::heap::table::HeapTable;
use crate::types::Pod;
use crate::utils::HandyRwLock;

/// Registry from table id to its heap file. The storage core only reads
/// this mapping; embedding code (and tests) populate it.
pub struct Catalog {
    map: HashMap<Key, Value>,
}

type Key = u32;
type Value = Pod<HeapTable>;

impl Catalog {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn get_table(&self, table_id: &Key) -> Option<Value> {
        self.map.get(table_id).cloned()
    }

    pub fn add_table(&mut self, table: Value) {
        let table_id = table.rl().get_id();
        self.map.insert(table_id, table);
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}
