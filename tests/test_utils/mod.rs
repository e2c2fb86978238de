#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use once_cell::sync::Lazy;
use small_heap::{
    heap::buffer_pool::BufferPool,
    storage::cell::Cell,
    storage::tuple::Tuple,
    transaction::Transaction,
    types::Pod,
    utils::{self, HandyRwLock},
    Database, DbConfig, HeapTable, Schema,
};

// Every test shares the process-wide `Database` singleton, so tests are
// serialized on this lock. The guard is returned to the test and held for
// its whole body.
static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// # Conduct the initialization
///
/// - Setting up log configurations.
/// - Reset the database: empty catalog, empty lock table, fresh buffer
///   pool built from `config`.
pub fn setup_with(config: DbConfig) -> MutexGuard<'static, ()> {
    let guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    utils::init_log();
    Database::reset_with(config);

    guard
}

pub fn setup() -> MutexGuard<'static, ()> {
    setup_with(DbConfig::default())
}

/// An empty heap table registered in the catalog. The backing file is
/// truncated first, so leftovers from earlier runs don't leak in.
pub fn new_empty_table(name: &str, columns: usize) -> Pod<HeapTable> {
    let schema = Schema::small_int_schema(columns);
    let table_rc = Arc::new(RwLock::new(HeapTable::new(name, &schema)));
    table_rc.rl().clear();
    Database::mut_catalog().add_table(Arc::clone(&table_rc));
    table_rc
}

/// A table filled with `rows` random rows, committed. Returns the inserted
/// key values through `values` when provided.
pub fn new_random_table(
    name: &str,
    columns: usize,
    rows: usize,
    values: Option<&mut Vec<i64>>,
) -> Pod<HeapTable> {
    use rand::prelude::*;

    let table_rc = new_empty_table(name, columns);
    let table_id = table_rc.rl().get_id();

    let mut rng = rand::thread_rng();
    let mut inserted = Vec::new();

    let tx = Transaction::new();
    for _ in 0..rows {
        let value = rng.gen_range(i64::MIN / 2, i64::MAX / 2);
        let tuple = Tuple::new_int_tuple(value, columns);
        BufferPool::insert_tuple(&tx, table_id, &tuple).unwrap();
        inserted.push(value);
    }
    tx.commit().unwrap();

    if let Some(values) = values {
        *values = inserted;
    }

    table_rc
}

/// Insert `0..rows` (one tuple per value, same value in every column),
/// committed in a single transaction.
pub fn fill_sequential(table_rc: &Pod<HeapTable>, columns: usize, rows: usize) {
    let table_id = table_rc.rl().get_id();
    let tx = Transaction::new();
    for v in 0..rows {
        let tuple = Tuple::new_int_tuple(v as i64, columns);
        BufferPool::insert_tuple(&tx, table_id, &tuple).unwrap();
    }
    tx.commit().unwrap();
}

pub fn int_value(tuple: &Tuple) -> i64 {
    match tuple.get_cell(0) {
        Cell::Int64(v) => v,
        cell => panic!("expected an Int64 cell, got {:?}", cell),
    }
}

/// A config with a small page so multi-page scenarios stay cheap.
pub fn small_page_config(page_size: usize, buffer_capacity: usize) -> DbConfig {
    DbConfig {
        page_size,
        buffer_capacity,
        ..DbConfig::default()
    }
}
