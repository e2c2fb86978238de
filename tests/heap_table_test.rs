use small_heap::{
    concurrent_status::Permission,
    error::ErrorKind,
    heap::{buffer_pool::BufferPool, page_id::HeapPageID},
    storage::cell::Cell,
    storage::tuple::Tuple,
    transaction::Transaction,
    utils::HandyRwLock,
};

mod test_utils;
use test_utils::{fill_sequential, int_value, new_empty_table, setup_with, small_page_config};

// 128-byte pages, 2 int columns: 7 tuples per page.
const PAGE_SIZE: usize = 128;
const ROWS_PER_PAGE: usize = 7;

#[test]
fn test_insert_and_scan() {
    let _guard = setup_with(small_page_config(PAGE_SIZE, 50));

    let table_rc = new_empty_table("insert_and_scan", 2);
    let table = table_rc.rl();
    let rows = ROWS_PER_PAGE * 2 + 6;

    let tx = Transaction::new();
    let mut pages_seen = 0;
    for v in 0..rows {
        let tuple = Tuple::new_int_tuple(v as i64, 2);
        BufferPool::insert_tuple(&tx, table.get_id(), &tuple).unwrap();

        // the file only ever grows
        assert!(table.num_pages() >= pages_seen);
        pages_seen = table.num_pages();
    }
    tx.commit().unwrap();

    assert_eq!(table.num_pages(), 3);

    // every inserted row comes back exactly once
    let read_tx = Transaction::new();
    let mut it = table.iter(&read_tx);
    it.open();
    let mut values: Vec<i64> = it.by_ref().map(|t| int_value(&t)).collect();
    it.close();
    read_tx.commit().unwrap();

    values.sort();
    assert_eq!(values, (0..rows as i64).collect::<Vec<i64>>());
}

#[test]
fn test_rewind() {
    let _guard = setup_with(small_page_config(PAGE_SIZE, 50));

    let table_rc = new_empty_table("rewind", 2);
    fill_sequential(&table_rc, 2, ROWS_PER_PAGE + 3);

    let tx = Transaction::new();
    let table = table_rc.rl();
    let mut it = table.iter(&tx);
    it.open();

    let first_pass = it.by_ref().count();
    assert_eq!(first_pass, ROWS_PER_PAGE + 3);
    assert!(it.next().is_none());

    it.rewind();
    let second_pass = it.by_ref().count();
    assert_eq!(second_pass, first_pass);

    it.close();
    assert!(it.next().is_none());
    tx.commit().unwrap();
}

#[test]
fn test_delete_tuple() {
    let _guard = setup_with(small_page_config(PAGE_SIZE, 50));

    let table_rc = new_empty_table("delete_tuple", 2);
    fill_sequential(&table_rc, 2, 10);
    let table = table_rc.rl();

    let tx = Transaction::new();
    let mut it = table.iter(&tx);
    it.open();
    let victim = it.by_ref().find(|t| int_value(t) == 5).unwrap();
    it.close();

    BufferPool::delete_tuple(&tx, &victim).unwrap();

    // deleting the same slot again is a caller bug
    let err = BufferPool::delete_tuple(&tx, &victim).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    tx.commit().unwrap();

    let read_tx = Transaction::new();
    let mut it = table.iter(&read_tx);
    it.open();
    let values: Vec<i64> = it.by_ref().map(|t| int_value(&t)).collect();
    read_tx.commit().unwrap();

    assert_eq!(values.len(), 9);
    assert!(!values.contains(&5));
}

#[test]
fn test_read_page_out_of_range() {
    let _guard = setup_with(small_page_config(PAGE_SIZE, 50));

    let table_rc = new_empty_table("out_of_range", 2);
    fill_sequential(&table_rc, 2, 3);
    let table = table_rc.rl();

    assert_eq!(table.num_pages(), 1);

    let bogus = HeapPageID::new(table.get_id(), 5);
    let err = table.read_page(&bogus).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    // and through the buffer pool as well
    let tx = Transaction::new();
    let err = BufferPool::get_page(&tx, Permission::ReadOnly, &bogus).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    tx.abort().unwrap();
}

#[test]
fn test_schema_mismatch() {
    let _guard = setup_with(small_page_config(PAGE_SIZE, 50));

    let table_rc = new_empty_table("schema_mismatch", 2);
    let table = table_rc.rl();

    let tx = Transaction::new();

    let wrong_width = Tuple::new_int_tuple(1, 3);
    let err = BufferPool::insert_tuple(&tx, table.get_id(), &wrong_width).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let wrong_type = Tuple::new(&vec![Cell::Int64(1), Cell::Bool(true)]);
    let err = BufferPool::insert_tuple(&tx, table.get_id(), &wrong_type).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    tx.abort().unwrap();
}
