use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot create ledger directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot open ledger at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("ledger transaction failed: {0}")]
    Transaction(#[from] rusqlite::Error),

    #[error("day record {day} is corrupt: {source}")]
    Corrupt {
        day: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode day record {day}: {source}")]
    Encode {
        day: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("ledger is open read-only")]
    ReadOnly,

    #[error("ledger is closed")]
    Closed,
}

impl LedgerError {
    /// Errors raised while opening; the process cannot go on without a ledger.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::CreateDir { .. } | LedgerError::Open { .. })
    }
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("member identity must not be empty")]
    EmptyMember,

    #[error("{0} is not in the member directory")]
    UnknownMember(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("cannot read member directory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed member directory: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("cannot write report row: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot write report: {0}")]
    Io(#[from] io::Error),
}
