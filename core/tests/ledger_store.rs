use std::fs;

use anyhow::Result;
use attendance_core::{
    parse_timestamp, DayKey, DayRecord, LedgerError, LedgerRepository, LedgerStore, LoginType,
};
use tempfile::TempDir;

fn day(s: &str) -> DayKey {
    s.parse().unwrap()
}

fn sample_record() -> DayRecord {
    let mut record = DayRecord::new(day("2024/01/10"));
    record.record_scan("Doe, Jane", parse_timestamp("2024/01/10 09:00:00").unwrap());
    record.record_scan("Doe, Jane", parse_timestamp("2024/01/10 12:00:00").unwrap());
    record.record_scan("Roe, Rick", parse_timestamp("2024/01/10 13:00:00").unwrap());
    record
}

#[test]
fn test_open_creates_directory() -> Result<()> {
    let tmp = TempDir::new()?;
    let dir = tmp.path().join("nested").join("attendance_db");
    let store = LedgerStore::open(&dir, false)?;
    assert!(dir.is_dir());
    assert!(store.path().exists());
    assert!(store.days()?.is_empty());
    Ok(())
}

#[test]
fn test_record_survives_reopen() -> Result<()> {
    let tmp = TempDir::new()?;
    let record = sample_record();

    let store = LedgerStore::open(tmp.path(), false)?;
    let txn = store.begin_transaction()?;
    txn.put_day(&record)?;
    txn.commit()?;
    store.close()?;

    let reopened = LedgerStore::open(tmp.path(), true)?;
    assert_eq!(reopened.get_day(&record.day)?, Some(record));
    Ok(())
}

#[test]
fn test_unclean_shutdown_keeps_committed_days() -> Result<()> {
    let tmp = TempDir::new()?;
    let record = sample_record();
    {
        let store = LedgerStore::open(tmp.path(), false)?;
        store.update_day(&record.day, |r| *r = record.clone())?;
        // Dropped without close: the WAL has to be replayed on the next open.
        std::mem::forget(store);
    }

    let reopened = LedgerStore::open(tmp.path(), false)?;
    assert_eq!(reopened.get_day(&record.day)?, Some(record));
    Ok(())
}

#[test]
fn test_abort_discards_writes() -> Result<()> {
    let tmp = TempDir::new()?;
    let store = LedgerStore::open(tmp.path(), false)?;
    let record = sample_record();

    let txn = store.begin_transaction()?;
    txn.put_day(&record)?;
    assert!(txn.get_day(&record.day)?.is_some());
    txn.abort()?;

    assert_eq!(store.get_day(&record.day)?, None);
    Ok(())
}

#[test]
fn test_dropped_transaction_rolls_back() -> Result<()> {
    let tmp = TempDir::new()?;
    let store = LedgerStore::open(tmp.path(), false)?;
    let record = sample_record();
    {
        let txn = store.begin_transaction()?;
        txn.put_day(&record)?;
    }
    assert_eq!(store.get_day(&record.day)?, None);

    // The store is usable again afterwards.
    let result = store.update_day(&record.day, |r| {
        r.record_scan("Doe, Jane", parse_timestamp("2024/01/10 09:00:00").unwrap())
    })?;
    assert_eq!(result, LoginType::Login);
    Ok(())
}

#[test]
fn test_panicking_mutation_leaves_no_partial_write() -> Result<()> {
    let tmp = TempDir::new()?;
    let store = LedgerStore::open(tmp.path(), false)?;
    let key = day("2024/01/10");

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        store.update_day::<(), _>(&key, |_| panic!("mutation failed"))
    }));
    assert!(outcome.is_err());
    assert_eq!(store.get_day(&key)?, None);
    Ok(())
}

#[test]
fn test_iteration_in_day_order() -> Result<()> {
    let tmp = TempDir::new()?;
    let store = LedgerStore::open(tmp.path(), false)?;
    for key in ["2024/02/01", "2023/12/31", "2024/01/10"] {
        let key = day(key);
        store.update_day(&key, |r| {
            r.record_scan("Doe, Jane", key.date().and_hms_opt(9, 0, 0).unwrap())
        })?;
    }

    let keys: Vec<String> = store.days()?.iter().map(|d| d.day.to_string()).collect();
    assert_eq!(keys, vec!["2023/12/31", "2024/01/10", "2024/02/01"]);
    Ok(())
}

#[test]
fn test_iteration_stops_early_and_releases() -> Result<()> {
    let tmp = TempDir::new()?;
    let store = LedgerStore::open(tmp.path(), false)?;
    for key in ["2024/01/10", "2024/01/11"] {
        store.update_day(&day(key), |_| ())?;
    }

    let mut visited = 0;
    let result = store.for_each_day(|_| {
        visited += 1;
        Err(LedgerError::Closed)
    });
    assert!(result.is_err());
    assert_eq!(visited, 1);

    // The cursor is gone, so writes go through.
    store.update_day(&day("2024/01/12"), |_| ())?;
    assert_eq!(store.days()?.len(), 3);
    Ok(())
}

#[test]
fn test_read_only_rejects_writes() -> Result<()> {
    let tmp = TempDir::new()?;
    LedgerStore::open(tmp.path(), false)?.close()?;

    let store = LedgerStore::open(tmp.path(), true)?;
    assert!(store.is_read_only());
    assert!(matches!(store.begin_transaction(), Err(LedgerError::ReadOnly)));
    assert!(matches!(
        store.update_day(&day("2024/01/10"), |_| ()),
        Err(LedgerError::ReadOnly)
    ));
    Ok(())
}

#[test]
fn test_read_only_open_of_missing_ledger_is_fatal() -> Result<()> {
    let tmp = TempDir::new()?;
    let err = LedgerStore::open(tmp.path().join("absent"), true)
        .err()
        .expect("opening a missing ledger read-only must fail");
    assert!(err.is_fatal());
    Ok(())
}

#[test]
fn test_garbage_file_is_fatal() -> Result<()> {
    let tmp = TempDir::new()?;
    fs::write(tmp.path().join("ledger.sqlite3"), vec![0x42u8; 4096])?;
    let err = LedgerStore::open(tmp.path(), false)
        .err()
        .expect("a non-database file must not open");
    assert!(matches!(err, LedgerError::Open { .. }));
    Ok(())
}

#[test]
fn test_close_is_idempotent() -> Result<()> {
    let tmp = TempDir::new()?;
    let store = LedgerStore::open(tmp.path(), false)?;
    store.close()?;
    store.close()?;
    assert!(matches!(store.get_day(&day("2024/01/10")), Err(LedgerError::Closed)));
    assert!(matches!(store.begin_transaction(), Err(LedgerError::Closed)));
    Ok(())
}
