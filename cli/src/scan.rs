use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::{bail, Context, Result};
use attendance_core::{
    spawn_line_source, AttendanceService, Clock, Intake, IntakeSummary, LedgerRepository,
    LoginType, MemberDirectory, ScanOutcome, TagType,
};

/// Feeds stdin (barcode scanner) and the RFID device into one intake loop
/// until both sources run dry.
pub fn run<R, C>(
    directory: &MemberDirectory,
    service: &AttendanceService<R, C>,
    rfid_device: Option<PathBuf>,
    no_barcode: bool,
) -> Result<IntakeSummary>
where
    R: LedgerRepository,
    C: Clock,
{
    let (tx, rx) = mpsc::channel();
    let mut sources = Vec::new();

    if !no_barcode {
        let stdin = BufReader::new(io::stdin());
        sources.push(spawn_line_source(stdin, TagType::Barcode, tx.clone())?);
    }
    if let Some(path) = rfid_device {
        let device = File::open(&path)
            .with_context(|| format!("Cannot open RFID device {}", path.display()))?;
        sources.push(spawn_line_source(BufReader::new(device), TagType::Rfid, tx.clone())?);
    }
    drop(tx);

    if sources.is_empty() {
        bail!("No scan source: pass --rfid-device or leave barcode input enabled");
    }
    println!("Ready for scans.");

    let intake = Intake::new(directory, service);
    let summary = intake.run(rx, print_outcome);

    for source in sources {
        if source.join().is_err() {
            eprintln!("Warning: a scan reader thread panicked");
        }
    }
    Ok(summary)
}

fn print_outcome(outcome: &ScanOutcome) {
    match outcome {
        ScanOutcome::Acknowledged { login_type: LoginType::InvalidTimeSpan, message, .. } => {
            println!("\x1b[1;33m{}\x1b[0m", message);
        }
        ScanOutcome::Acknowledged { message, .. } => {
            println!("\x1b[1;36m{}\x1b[0m", message);
        }
        ScanOutcome::Unknown(scan) => {
            println!("Unknown {} '{}', please see a mentor", scan.source, scan.identifier);
        }
        ScanOutcome::Failed { member, error, .. } => {
            eprintln!("Error: could not record {}: {}", member, error);
        }
    }
}
