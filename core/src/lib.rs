pub mod config;
pub mod directory;
pub mod error;
pub mod intake;
pub mod model;
pub mod report;
pub mod repository;
pub mod service;
pub mod time;

pub use config::Settings;
pub use directory::MemberDirectory;
pub use error::{AttendanceError, DirectoryError, LedgerError, ReportError};
pub use intake::{spawn_line_source, Intake, IntakeSummary, Scan, ScanOutcome};
pub use model::day_record::{DayKey, DayRecord, Direction, LoginType, MemberToday};
pub use model::member::{Member, TagType};
pub use report::{export_report, export_report_to_path};
pub use repository::{InMemoryLedger, LedgerRepository, LedgerStore, LedgerTxn};
pub use service::AttendanceService;
pub use time::{parse_day, parse_timestamp, Clock, FixedClock, OffsetClock, SystemClock};
