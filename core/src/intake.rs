//! Scan intake: reader threads push raw scans into one channel, and a single
//! consumer resolves them and applies them to the ledger in arrival order.

use std::io::{self, BufRead};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use crate::directory::MemberDirectory;
use crate::error::AttendanceError;
use crate::model::day_record::{Direction, LoginType};
use crate::model::member::TagType;
use crate::repository::LedgerRepository;
use crate::service::AttendanceService;
use crate::time::Clock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    pub identifier: String,
    pub source: TagType,
}

impl Scan {
    pub fn new(identifier: &str, source: TagType) -> Self {
        Self {
            identifier: identifier.to_string(),
            source,
        }
    }
}

#[derive(Debug)]
pub enum ScanOutcome {
    Acknowledged {
        member: String,
        at: NaiveDateTime,
        login_type: LoginType,
        message: String,
    },
    Unknown(Scan),
    Failed {
        member: String,
        at: NaiveDateTime,
        error: AttendanceError,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IntakeSummary {
    pub logins: usize,
    pub logouts: usize,
    pub invalid_spans: usize,
    pub unknown: usize,
    pub failed: usize,
}

impl IntakeSummary {
    fn count(&mut self, outcome: &ScanOutcome) {
        match outcome {
            ScanOutcome::Acknowledged { login_type, .. } => match login_type {
                LoginType::Login => self.logins += 1,
                LoginType::Logout => self.logouts += 1,
                LoginType::InvalidTimeSpan => self.invalid_spans += 1,
            },
            ScanOutcome::Unknown(_) => self.unknown += 1,
            ScanOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Spawns a thread that turns each non-blank line of `reader` into a scan.
/// Barcode scanners that emulate a keyboard and RFID bridges that print one
/// UID per line both fit this shape. The thread ends on EOF, on a read error,
/// or once the consumer has gone away.
pub fn spawn_line_source<R>(
    reader: R,
    source: TagType,
    sender: Sender<Scan>,
) -> io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name(format!("{}-reader", source))
        .spawn(move || {
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        error!(%source, error = %err, "scan source failed");
                        return;
                    }
                };
                let identifier = line.trim();
                if identifier.is_empty() {
                    continue;
                }
                debug!(%source, identifier, "scan read");
                if sender.send(Scan::new(identifier, source)).is_err() {
                    return;
                }
            }
            info!(%source, "scan source reached end of input");
        })
}

pub struct Intake<'a, R: LedgerRepository, C: Clock> {
    directory: &'a MemberDirectory,
    service: &'a AttendanceService<R, C>,
}

impl<'a, R: LedgerRepository, C: Clock> Intake<'a, R, C> {
    pub fn new(directory: &'a MemberDirectory, service: &'a AttendanceService<R, C>) -> Self {
        Self { directory, service }
    }

    pub fn process(&self, scan: Scan) -> ScanOutcome {
        let member = match self.directory.lookup(&scan.identifier, scan.source) {
            Some(member) => member,
            None => {
                warn!(
                    identifier = %scan.identifier,
                    source = %scan.source,
                    "unknown identifier dropped"
                );
                return ScanOutcome::Unknown(scan);
            }
        };

        let at = self.service.now();
        match self.service.record_event(&member.name, at) {
            Ok(login_type) => {
                info!(member = %member.name, %at, %login_type, "scan acknowledged");
                ScanOutcome::Acknowledged {
                    member: member.name.clone(),
                    at,
                    login_type,
                    message: member.greeting(login_type),
                }
            }
            Err(err) => {
                error!(member = %member.name, %at, error = %err, "transaction aborted");
                ScanOutcome::Failed {
                    member: member.name.clone(),
                    at,
                    error: err,
                }
            }
        }
    }

    /// Manual entry by member name. The name must match a directory entry
    /// exactly; `direction` forces a login or logout, otherwise the member's
    /// state that day decides.
    pub fn punch(
        &self,
        name: &str,
        at: NaiveDateTime,
        direction: Option<Direction>,
    ) -> Result<LoginType, AttendanceError> {
        let member = match self.directory.find_by_name(name) {
            Some(member) => member,
            None => {
                warn!(name, "manual entry for unknown member rejected");
                return Err(AttendanceError::UnknownMember(name.trim().to_string()));
            }
        };
        let login_type = match direction {
            Some(direction) => self.service.record_punch(&member.name, at, direction)?,
            None => self.service.record_event(&member.name, at)?,
        };
        info!(member = %member.name, %at, %login_type, "manual entry recorded");
        Ok(login_type)
    }

    /// Consumes scans until every sender has hung up.
    pub fn run<F>(&self, receiver: Receiver<Scan>, mut on_outcome: F) -> IntakeSummary
    where
        F: FnMut(&ScanOutcome),
    {
        let mut summary = IntakeSummary::default();
        for scan in receiver {
            let outcome = self.process(scan);
            summary.count(&outcome);
            on_outcome(&outcome);
        }
        info!(?summary, "intake finished");
        summary
    }
}
