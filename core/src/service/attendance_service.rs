use crate::error::AttendanceError;
use crate::model::day_record::{DayKey, Direction, LoginType, MemberToday};
use crate::repository::LedgerRepository;
use crate::time::{Clock, SystemClock};
use chrono::NaiveDateTime;
use tracing::{debug, warn};

/// Applies login/logout transitions to the ledger, one transaction per event.
pub struct AttendanceService<R: LedgerRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
}

impl<R: LedgerRepository> AttendanceService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, SystemClock)
    }
}

impl<R: LedgerRepository, C: Clock> AttendanceService<R, C> {
    pub fn with_clock(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Records a scan at `at`; whether it is a login or logout follows from
    /// the member's state that day.
    pub fn record_event(
        &self,
        member: &str,
        at: NaiveDateTime,
    ) -> Result<LoginType, AttendanceError> {
        let member = checked_member(member)?;
        let day = DayKey::of(&at);
        let login_type = self
            .repo
            .update_day(&day, |record| record.record_scan(member, at))?;

        log_transition(member, at, login_type);
        Ok(login_type)
    }

    /// Records a scan at the clock's current time.
    pub fn record_scan(&self, member: &str) -> Result<LoginType, AttendanceError> {
        self.record_event(member, self.clock.now())
    }

    /// Manual correction with an explicit direction.
    pub fn record_punch(
        &self,
        member: &str,
        at: NaiveDateTime,
        direction: Direction,
    ) -> Result<LoginType, AttendanceError> {
        let member = checked_member(member)?;
        let day = DayKey::of(&at);
        let login_type = self
            .repo
            .update_day(&day, |record| record.record_punch(member, at, direction))?;

        log_transition(member, at, login_type);
        Ok(login_type)
    }

    pub fn member_today(
        &self,
        member: &str,
        day: &DayKey,
    ) -> Result<Option<MemberToday>, AttendanceError> {
        let record = self.repo.get_day(day)?;
        Ok(record.and_then(|r| r.members.get(member).cloned()))
    }
}

fn checked_member(member: &str) -> Result<&str, AttendanceError> {
    let member = member.trim();
    if member.is_empty() {
        return Err(AttendanceError::EmptyMember);
    }
    Ok(member)
}

fn log_transition(member: &str, at: NaiveDateTime, login_type: LoginType) {
    match login_type {
        LoginType::InvalidTimeSpan => {
            warn!(member, %at, "logout does not match pending login, needs manual reconciliation")
        }
        _ => debug!(member, %at, %login_type, "attendance recorded"),
    }
}
