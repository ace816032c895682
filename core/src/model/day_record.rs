use serde::{Deserialize, Serialize};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const DAY_KEY_FORMAT: &str = "%Y/%m/%d";

/// Calendar date that partitions the ledger, rendered as `YYYY/MM/DD`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The day an event at `at` is attributed to.
    pub fn of(at: &NaiveDateTime) -> Self {
        Self(at.date())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), DAY_KEY_FORMAT).map(Self)
    }
}

impl TryFrom<String> for DayKey {
    type Error = chrono::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DayKey> for String {
    fn from(key: DayKey) -> Self {
        key.to_string()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginType {
    Login,
    Logout,
    /// A login/logout pair that went backwards in time or spans days.
    InvalidTimeSpan,
}

impl fmt::Display for LoginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoginType::Login => "LOGIN",
            LoginType::Logout => "LOGOUT",
            LoginType::InvalidTimeSpan => "INVALID_TIME_SPAN",
        };
        f.write_str(label)
    }
}

/// Explicit direction of a manual punch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// One member's login/logout state and credited time for a single day.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberToday {
    pub time_in: Option<NaiveDateTime>,
    pub time_out: Option<NaiveDateTime>,
    pub checkins: u32,
    /// Credited time in milliseconds.
    pub total_time_ms: i64,
}

impl MemberToday {
    pub fn total_time(&self) -> Duration {
        Duration::milliseconds(self.total_time_ms)
    }

    /// True while a login is waiting for its logout.
    pub fn is_pending(&self) -> bool {
        self.time_in.is_some() && self.time_out.is_none()
    }

    /// Applies a scan whose direction is implied by the current state.
    pub fn apply_scan(&mut self, at: NaiveDateTime) -> LoginType {
        match (self.time_in, self.time_out) {
            (Some(time_in), None) => self.close_pair(time_in, at),
            // Covers a fresh record and one left holding an invalid span:
            // the most recent login wins and the stale one earns nothing.
            _ => self.open_pair(at),
        }
    }

    /// Applies a manual punch with an explicit direction.
    pub fn apply_punch(&mut self, at: NaiveDateTime, direction: Direction) -> LoginType {
        match (direction, self.time_in, self.time_out) {
            (Direction::In, _, _) => self.open_pair(at),
            (Direction::Out, Some(time_in), None) => self.close_pair(time_in, at),
            (Direction::Out, _, _) => {
                // No pending login: keep the stamp for review, credit nothing.
                self.time_out = Some(at);
                LoginType::Logout
            }
        }
    }

    fn open_pair(&mut self, at: NaiveDateTime) -> LoginType {
        self.time_in = Some(at);
        self.time_out = None;
        LoginType::Login
    }

    fn close_pair(&mut self, time_in: NaiveDateTime, at: NaiveDateTime) -> LoginType {
        self.time_out = Some(at);

        let elapsed = at.signed_duration_since(time_in);
        if elapsed < Duration::zero() || time_in.date() != at.date() {
            return LoginType::InvalidTimeSpan;
        }

        self.total_time_ms += elapsed.num_milliseconds();
        self.checkins += 1;
        self.time_in = None;
        self.time_out = None;
        LoginType::Logout
    }
}

/// Attendance state of every member seen on one day.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DayRecord {
    pub day: DayKey,
    pub members: BTreeMap<String, MemberToday>,
}

impl DayRecord {
    pub fn new(day: DayKey) -> Self {
        Self {
            day,
            members: BTreeMap::new(),
        }
    }

    pub fn member(&self, name: &str) -> Option<&MemberToday> {
        self.members.get(name)
    }

    pub fn record_scan(&mut self, name: &str, at: NaiveDateTime) -> LoginType {
        self.member_mut(name).apply_scan(at)
    }

    pub fn record_punch(
        &mut self,
        name: &str,
        at: NaiveDateTime,
        direction: Direction,
    ) -> LoginType {
        self.member_mut(name).apply_punch(at, direction)
    }

    pub fn total_time(&self) -> Duration {
        self.members.values().map(|m| m.total_time()).sum()
    }

    fn member_mut(&mut self, name: &str) -> &mut MemberToday {
        self.members.entry(name.to_string()).or_default()
    }
}
