use std::fs;
use std::io::Cursor;
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::Result;
use attendance_core::{
    export_report_to_path, parse_timestamp, spawn_line_source, AttendanceService, DayKey,
    FixedClock, Intake, LedgerRepository, LedgerStore, MemberDirectory, TagType,
};
use chrono::Duration;
use tempfile::TempDir;

const MEMBERS: &str = "\
RFID tag,Barcode,Name,Login Message,Logout Message
04A1B2C3,1001,\"Doe, Jane\",,
0BADF00D,2002,\"Roe, Rick\",Hey Rick,Later Rick
";

#[test]
fn test_jane_doe_day_on_disk() -> Result<()> {
    let tmp = TempDir::new()?;
    let store = LedgerStore::open(tmp.path(), false)?;
    let service = AttendanceService::new(store);

    for at in [
        "2024/01/10 09:00:00",
        "2024/01/10 12:00:00",
        "2024/01/10 13:00:00",
        "2024/01/10 17:30:00",
    ] {
        service.record_event("Doe, Jane", parse_timestamp(at)?)?;
    }
    service.repository().close()?;

    let reopened = LedgerStore::open(tmp.path(), true)?;
    let record = reopened.get_day(&"2024/01/10".parse::<DayKey>()?)?.expect("day recorded");
    let jane = record.member("Doe, Jane").expect("member recorded");
    assert_eq!(jane.checkins, 2);
    assert_eq!(jane.total_time(), Duration::hours(7) + Duration::minutes(30));
    assert_eq!(jane.time_in, None);
    assert_eq!(jane.time_out, None);
    Ok(())
}

#[test]
fn test_concurrent_members_same_day_lose_nothing() -> Result<()> {
    let tmp = TempDir::new()?;
    let store = Arc::new(LedgerStore::open(tmp.path(), false)?);
    let start = parse_timestamp("2024/01/10 09:00:00")?;

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let service = AttendanceService::new(store);
                let member = format!("Member {:02}", i);
                for pair in 0..5 {
                    let login = start + Duration::minutes(pair * 60);
                    service.record_event(&member, login).unwrap();
                    service.record_event(&member, login + Duration::minutes(30)).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker panicked");
    }

    let record = store.get_day(&DayKey::of(&start))?.expect("day recorded");
    assert_eq!(record.members.len(), 8);
    for today in record.members.values() {
        assert_eq!(today.checkins, 5);
        assert_eq!(today.total_time(), Duration::minutes(150));
    }
    Ok(())
}

#[test]
fn test_scan_pipeline_to_report() -> Result<()> {
    let tmp = TempDir::new()?;
    let directory_path = tmp.path().join("members.csv");
    fs::write(&directory_path, MEMBERS)?;
    let directory = MemberDirectory::load(&directory_path)?;

    let clock = FixedClock::new(parse_timestamp("2024/01/10 09:00:00")?);
    let store = LedgerStore::open(tmp.path().join("attendance_db"), false)?;
    let service = AttendanceService::with_clock(store, &clock);
    let intake = Intake::new(&directory, &service);

    // Morning: both arrive, one unknown badge.
    let (tx, rx) = mpsc::channel();
    spawn_line_source(Cursor::new("1001\nZZZZ\n"), TagType::Barcode, tx.clone())?.join().unwrap();
    spawn_line_source(Cursor::new("0BADF00D\n"), TagType::Rfid, tx)?.join().unwrap();
    let mut messages = Vec::new();
    let morning = intake.run(rx, |outcome| {
        if let attendance_core::ScanOutcome::Acknowledged { message, .. } = outcome {
            messages.push(message.clone());
        }
    });
    assert_eq!(morning.logins, 2);
    assert_eq!(morning.unknown, 1);
    assert!(messages.contains(&"Hey Rick Roe, Rick".to_string()));

    // Afternoon: both leave.
    clock.advance(Duration::hours(4));
    let (tx, rx) = mpsc::channel();
    spawn_line_source(Cursor::new("04A1B2C3\n2002\n"), TagType::Rfid, tx.clone())?.join().unwrap();
    spawn_line_source(Cursor::new("2002\n"), TagType::Barcode, tx)?.join().unwrap();
    let afternoon = intake.run(rx, |_| {});
    // "2002" is not a tag, only a barcode.
    assert_eq!(afternoon.logouts, 2);
    assert_eq!(afternoon.unknown, 1);

    service.repository().close()?;

    let reader = LedgerStore::open(tmp.path().join("attendance_db"), true)?;
    let report_path = tmp.path().join("sync").join("current.csv");
    let rows = export_report_to_path(&reader, &report_path)?;
    assert_eq!(rows, 2);

    let first = fs::read_to_string(&report_path)?;
    export_report_to_path(&reader, &report_path)?;
    let second = fs::read_to_string(&report_path)?;
    assert_eq!(first, second);

    let lines: Vec<&str> = first.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Date,Name,Checkins,Total Time",
            "2024/01/10,\"Doe, Jane\",1,14400000",
            "2024/01/10,\"Roe, Rick\",1,14400000",
        ]
    );
    Ok(())
}

#[test]
fn test_unknown_identifier_leaves_ledger_empty() -> Result<()> {
    let tmp = TempDir::new()?;
    let directory = MemberDirectory::from_reader(MEMBERS.as_bytes())?;
    let clock = FixedClock::new(parse_timestamp("2024/01/10 09:00:00")?);
    let service = AttendanceService::with_clock(LedgerStore::open(tmp.path(), false)?, &clock);
    let intake = Intake::new(&directory, &service);

    for source in [TagType::Rfid, TagType::Barcode] {
        intake.process(attendance_core::Scan::new("ZZZZ", source));
    }
    assert!(service.repository().days()?.is_empty());
    Ok(())
}
