use std::path::PathBuf;
use anyhow::{anyhow, Result};

const DATA_DIR_NAME: &str = ".attendance";

const LEDGER_DIR_NAME: &str = "attendance_db";
const LEDGER_DIR_NAME_TESTING: &str = "testing_db";
const DIRECTORY_FILE_NAME: &str = "members.csv";
const DIRECTORY_FILE_NAME_TESTING: &str = "testing.csv";
const REPORT_FILE_NAME: &str = "sync/current.csv";

/// Where the ledger, the member directory and the report live.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub ledger_dir: PathBuf,
    pub directory_csv: PathBuf,
    pub report_path: PathBuf,
    pub testing: bool,
}

impl Settings {
    /// Derives every path from `data_dir`, defaulting to `~/.attendance`.
    /// The testing profile keeps its own ledger and directory next to the
    /// real ones.
    pub fn new(data_dir: Option<PathBuf>, testing: bool) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => {
                let home_dir = dirs::home_dir()
                    .ok_or_else(|| anyhow!("Could not determine home directory"))?;
                home_dir.join(DATA_DIR_NAME)
            }
        };

        let (ledger, directory) = if testing {
            (LEDGER_DIR_NAME_TESTING, DIRECTORY_FILE_NAME_TESTING)
        } else {
            (LEDGER_DIR_NAME, DIRECTORY_FILE_NAME)
        };

        Ok(Self {
            ledger_dir: data_dir.join(ledger),
            directory_csv: data_dir.join(directory),
            report_path: data_dir.join(REPORT_FILE_NAME),
            data_dir,
            testing,
        })
    }

    pub fn with_directory_csv(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.directory_csv = path;
        }
        self
    }

    pub fn with_report_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.report_path = path;
        }
        self
    }
}
