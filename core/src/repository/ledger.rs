//! SQLite-backed attendance ledger.
//!
//! One row per day, keyed by the `YYYY/MM/DD` day key, holding the JSON
//! encoded [`DayRecord`]. The database runs in WAL mode with full sync so
//! a reopen after an unclean shutdown replays whatever was committed.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::model::day_record::{DayKey, DayRecord};
use crate::repository::traits::LedgerRepository;

const LEDGER_FILE_NAME: &str = "ledger.sqlite3";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS days (
    day    TEXT PRIMARY KEY NOT NULL,
    record TEXT NOT NULL
) WITHOUT ROWID;
";

pub struct LedgerStore {
    conn: Mutex<Option<Connection>>,
    path: PathBuf,
    read_only: bool,
}

impl LedgerStore {
    /// Opens the ledger kept in `dir`, creating the directory and, unless
    /// `read_only`, the database itself.
    pub fn open(dir: impl AsRef<Path>, read_only: bool) -> Result<Self, LedgerError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| LedgerError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(LEDGER_FILE_NAME);

        let conn = Self::connect(&path, read_only).map_err(|source| LedgerError::Open {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), read_only, "ledger opened");

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path,
            read_only,
        })
    }

    fn connect(path: &Path, read_only: bool) -> rusqlite::Result<Connection> {
        let flags = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        };
        let conn = Connection::open_with_flags(path, flags)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        if read_only {
            // Fails on a missing table or a file that is not a database.
            conn.prepare("SELECT day FROM days LIMIT 1")?;
        } else {
            let mode: String =
                conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            debug!(journal_mode = %mode, "ledger journal mode");
            conn.pragma_update(None, "synchronous", "FULL")?;
            conn.execute_batch(SCHEMA_SQL)?;
        }
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Point lookup outside of any explicit transaction.
    pub fn get_day(&self, day: &DayKey) -> Result<Option<DayRecord>, LedgerError> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(LedgerError::Closed)?;
        read_day(conn, day)
    }

    /// Starts a write transaction. The store's connection stays reserved for
    /// it until it is committed, aborted or dropped.
    pub fn begin_transaction(&self) -> Result<LedgerTxn<'_>, LedgerError> {
        if self.read_only {
            return Err(LedgerError::ReadOnly);
        }
        let guard = self.lock();
        guard
            .as_ref()
            .ok_or(LedgerError::Closed)?
            .execute_batch("BEGIN IMMEDIATE")?;
        Ok(LedgerTxn {
            conn: guard,
            finished: false,
        })
    }

    pub fn for_each_day<E, F>(&self, mut visit: F) -> Result<(), E>
    where
        E: From<LedgerError>,
        F: FnMut(DayRecord) -> Result<(), E>,
    {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(LedgerError::Closed)?;
        let mut stmt = conn
            .prepare("SELECT day, record FROM days ORDER BY day")
            .map_err(LedgerError::from)?;
        let mut rows = stmt.query([]).map_err(LedgerError::from)?;

        while let Some(row) = rows.next().map_err(LedgerError::from)? {
            let key: String = row.get(0).map_err(LedgerError::from)?;
            let raw: String = row.get(1).map_err(LedgerError::from)?;
            visit(decode_day(&key, &raw)?)?;
        }
        Ok(())
    }

    pub fn days(&self) -> Result<Vec<DayRecord>, LedgerError> {
        let mut days = Vec::new();
        self.for_each_day(|record| {
            days.push(record);
            Ok::<(), LedgerError>(())
        })?;
        Ok(days)
    }

    /// Releases the connection. Later calls fail with [`LedgerError::Closed`].
    pub fn close(&self) -> Result<(), LedgerError> {
        let mut guard = self.lock();
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, err)| LedgerError::Transaction(err))?;
            info!(path = %self.path.display(), "ledger closed");
        }
        Ok(())
    }
}

impl LedgerRepository for LedgerStore {
    fn get_day(&self, day: &DayKey) -> Result<Option<DayRecord>, LedgerError> {
        LedgerStore::get_day(self, day)
    }

    fn update_day<T, F>(&self, day: &DayKey, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut DayRecord) -> T,
    {
        let txn = self.begin_transaction()?;
        let mut record = match txn.get_day(day)? {
            Some(record) => record,
            None => {
                debug!(day = %day, "new day in ledger");
                DayRecord::new(*day)
            }
        };
        let outcome = f(&mut record);
        txn.put_day(&record)?;
        txn.commit()?;
        Ok(outcome)
    }

    fn for_each_day<E, F>(&self, visit: F) -> Result<(), E>
    where
        E: From<LedgerError>,
        F: FnMut(DayRecord) -> Result<(), E>,
    {
        LedgerStore::for_each_day(self, visit)
    }
}

/// An open write transaction. Dropping it without [`LedgerTxn::commit`]
/// rolls everything back.
pub struct LedgerTxn<'a> {
    conn: MutexGuard<'a, Option<Connection>>,
    finished: bool,
}

impl LedgerTxn<'_> {
    fn connection(&self) -> Result<&Connection, LedgerError> {
        self.conn.as_ref().ok_or(LedgerError::Closed)
    }

    pub fn get_day(&self, day: &DayKey) -> Result<Option<DayRecord>, LedgerError> {
        read_day(self.connection()?, day)
    }

    pub fn put_day(&self, record: &DayRecord) -> Result<(), LedgerError> {
        let raw = serde_json::to_string(record).map_err(|source| LedgerError::Encode {
            day: record.day.to_string(),
            source,
        })?;
        self.connection()?.execute(
            "INSERT INTO days (day, record) VALUES (?1, ?2)
             ON CONFLICT(day) DO UPDATE SET record = excluded.record",
            params![record.day.to_string(), raw],
        )?;
        Ok(())
    }

    pub fn commit(mut self) -> Result<(), LedgerError> {
        self.connection()?.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }

    pub fn abort(mut self) -> Result<(), LedgerError> {
        self.finished = true;
        let conn = self.connection()?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

impl Drop for LedgerTxn<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(conn) = self.conn.as_ref() {
            if conn.is_autocommit() {
                return;
            }
            match conn.execute_batch("ROLLBACK") {
                Ok(()) => warn!("ledger transaction aborted"),
                Err(err) => warn!(error = %err, "ledger rollback failed"),
            }
        }
    }
}

fn read_day(conn: &Connection, day: &DayKey) -> Result<Option<DayRecord>, LedgerError> {
    let key = day.to_string();
    let raw: Option<String> = conn
        .query_row(
            "SELECT record FROM days WHERE day = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|raw| decode_day(&key, &raw)).transpose()
}

fn decode_day(key: &str, raw: &str) -> Result<DayRecord, LedgerError> {
    serde_json::from_str(raw).map_err(|source| LedgerError::Corrupt {
        day: key.to_string(),
        source,
    })
}
