mod dump;
mod scan;

use std::path::PathBuf;

use anyhow::{Context, Result};
use attendance_core::{
    export_report_to_path, parse_day, parse_timestamp, AttendanceService, Clock, DayRecord,
    Direction, Intake, IntakeSummary, LedgerStore, MemberDirectory, OffsetClock, Settings,
    SystemClock, TagType,
};
use attendance_core::time::TIMESTAMP_FORMAT;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "attendance")]
#[command(about = "Badge-scan attendance ledger", long_about = None)]
struct Cli {
    /// Directory holding the ledger, member list and reports (default: ~/.attendance)
    #[arg(long, global = true, env = "ATTENDANCE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Member directory CSV (tag, barcode, name, login message, logout message)
    #[arg(long, global = true, env = "ATTENDANCE_DIRECTORY")]
    directory: Option<PathBuf>,

    /// Use the testing ledger and member list
    #[arg(long, global = true)]
    testing: bool,

    /// Verbose diagnostics
    #[arg(short, long, global = true)]
    debug: bool,

    /// Start the clock at this time (YYYY/MM/DD HH:MM:SS); it keeps running from there
    #[arg(long, global = true)]
    at: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Read scans from the barcode scanner (stdin) and an optional RFID device
    Run {
        /// Line-oriented RFID device or FIFO, one tag UID per line
        #[arg(long)]
        rfid_device: Option<PathBuf>,
        /// Do not read barcodes from stdin
        #[arg(long)]
        no_barcode: bool,
    },
    /// Record a manual login or logout for a member
    Punch {
        /// Member name as it appears in the directory
        name: String,
        /// Force a login
        #[arg(long, conflicts_with = "out")]
        r#in: bool,
        /// Force a logout
        #[arg(long)]
        out: bool,
    },
    /// Export the ledger as CSV
    Report {
        #[arg(short, long, env = "ATTENDANCE_REPORT")]
        output: Option<PathBuf>,
    },
    /// Print the ledger as a table
    Dump {
        /// Only this day (YYYY/MM/DD)
        #[arg(long)]
        day: Option<String>,
    },
    /// Resolve an identifier through the member directory
    Lookup {
        identifier: String,
        /// Treat the identifier as a barcode instead of an RFID tag
        #[arg(long)]
        barcode: bool,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let settings = Settings::new(cli.data_dir.clone(), cli.testing)?
        .with_directory_csv(cli.directory.clone());
    let at = cli.at.as_deref().map(parse_timestamp).transpose()?;

    match cli.command {
        Commands::Run { rfid_device, no_barcode } => {
            let directory = load_directory(&settings)?;
            let store = open_store(&settings, false)?;
            let summary = match at {
                Some(at) => {
                    let clock = OffsetClock::starting_at(at);
                    run_scans(&directory, store, clock, rfid_device, no_barcode)?
                }
                None => run_scans(&directory, store, SystemClock, rfid_device, no_barcode)?,
            };
            println!(
                "{} logins, {} logouts, {} invalid, {} unknown, {} failed",
                summary.logins,
                summary.logouts,
                summary.invalid_spans,
                summary.unknown,
                summary.failed
            );
        }
        Commands::Punch { name, r#in, out } => {
            let directory = load_directory(&settings)?;
            let store = open_store(&settings, false)?;
            let service = AttendanceService::new(store);
            let at = at.unwrap_or_else(|| SystemClock.now());
            let direction = match (r#in, out) {
                (true, _) => Some(Direction::In),
                (_, true) => Some(Direction::Out),
                _ => None,
            };
            let login_type = Intake::new(&directory, &service)
                .punch(&name, at, direction)
                .with_context(|| format!("Could not record {} at {}", name, at))?;
            println!("{}: {} at {}", name, login_type, at.format(TIMESTAMP_FORMAT));
            service.repository().close()?;
        }
        Commands::Report { output } => {
            let settings = settings.with_report_path(output);
            let store = open_store(&settings, true)?;
            let report_path = &settings.report_path;
            let rows = export_report_to_path(&store, report_path)
                .with_context(|| format!("Could not write report {}", report_path.display()))?;
            println!("Report written to {} ({} rows)", settings.report_path.display(), rows);
            store.close()?;
        }
        Commands::Dump { day } => {
            let store = open_store(&settings, true)?;
            let days: Vec<DayRecord> = match day {
                Some(day) => store.get_day(&parse_day(&day)?)?.into_iter().collect(),
                None => store.days()?,
            };
            dump::show_days(&days);
            store.close()?;
        }
        Commands::Lookup { identifier, barcode } => {
            let directory = load_directory(&settings)?;
            let source = if barcode { TagType::Barcode } else { TagType::Rfid };
            match directory.lookup(&identifier, source) {
                Some(member) => println!("{} -> {}", identifier, member.name),
                None => println!("{} ({}) is not in the directory", identifier, source),
            }
        }
    }
    Ok(())
}

fn open_store(settings: &Settings, read_only: bool) -> Result<LedgerStore> {
    LedgerStore::open(&settings.ledger_dir, read_only)
        .with_context(|| format!("Cannot open ledger in {}", settings.ledger_dir.display()))
}

fn load_directory(settings: &Settings) -> Result<MemberDirectory> {
    MemberDirectory::load(&settings.directory_csv).with_context(|| {
        format!("Cannot read member directory {}", settings.directory_csv.display())
    })
}

fn run_scans<C: Clock>(
    directory: &MemberDirectory,
    store: LedgerStore,
    clock: C,
    rfid_device: Option<PathBuf>,
    no_barcode: bool,
) -> Result<IntakeSummary> {
    let service = AttendanceService::with_clock(store, clock);
    let summary = scan::run(directory, &service, rfid_device, no_barcode)?;
    service.repository().close()?;
    Ok(summary)
}
