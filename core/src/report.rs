use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::ReportError;
use crate::model::day_record::DayRecord;
use crate::repository::LedgerRepository;

pub const REPORT_HEADER: [&str; 4] = ["Date", "Name", "Checkins", "Total Time"];

#[derive(Serialize)]
struct ReportRow<'a> {
    date: String,
    name: &'a str,
    checkins: u32,
    /// Milliseconds, the ledger's own unit.
    total_time: i64,
}

/// Writes one row per (day, member), days ascending then members ascending.
/// Returns the number of data rows.
pub fn export_report<R, W>(repo: &R, writer: W) -> Result<usize, ReportError>
where
    R: LedgerRepository,
    W: Write,
{
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(REPORT_HEADER)?;

    let mut rows = 0;
    repo.for_each_day(|record: DayRecord| -> Result<(), ReportError> {
        let date = record.day.to_string();
        for (name, today) in &record.members {
            csv.serialize(ReportRow {
                date: date.clone(),
                name,
                checkins: today.checkins,
                total_time: today.total_time_ms,
            })?;
            rows += 1;
        }
        Ok(())
    })?;

    csv.flush()?;
    Ok(rows)
}

pub fn export_report_to_path<R: LedgerRepository>(
    repo: &R,
    path: &Path,
) -> Result<usize, ReportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    let rows = export_report(repo, &mut writer)?;
    writer.flush()?;
    info!(path = %path.display(), rows, "report written");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryLedger;
    use crate::service::AttendanceService;
    use crate::time::parse_timestamp;

    fn seeded() -> AttendanceService<InMemoryLedger> {
        let service = AttendanceService::new(InMemoryLedger::new());
        let events = [
            ("Roe, Rick", "2024/01/11 10:00:00"),
            ("Doe, Jane", "2024/01/10 09:00:00"),
            ("Doe, Jane", "2024/01/10 12:00:00"),
            ("Roe, Rick", "2024/01/10 08:00:00"),
            ("Roe, Rick", "2024/01/11 10:30:00"),
        ];
        for (member, at) in events {
            service.record_event(member, parse_timestamp(at).unwrap()).unwrap();
        }
        service
    }

    #[test]
    fn test_report_rows_and_order() {
        let service = seeded();
        let mut out = Vec::new();
        let rows = export_report(service.repository(), &mut out).unwrap();

        assert_eq!(rows, 3);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Date,Name,Checkins,Total Time",
                "2024/01/10,\"Doe, Jane\",1,10800000",
                "2024/01/10,\"Roe, Rick\",0,0",
                "2024/01/11,\"Roe, Rick\",1,1800000",
            ]
        );
    }

    #[test]
    fn test_report_is_deterministic() {
        let service = seeded();
        let mut first = Vec::new();
        let mut second = Vec::new();
        export_report(service.repository(), &mut first).unwrap();
        export_report(service.repository(), &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_ledger_has_header_only() {
        let ledger = InMemoryLedger::new();
        let mut out = Vec::new();
        assert_eq!(export_report(&ledger, &mut out).unwrap(), 0);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["Date,Name,Checkins,Total Time"]);
    }
}
