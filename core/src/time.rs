use chrono::{Duration, Local, NaiveDateTime};
use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::model::day_record::DayKey;

pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Source of event timestamps.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    at: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self { at: Mutex::new(at) }
    }

    pub fn set(&self, at: NaiveDateTime) {
        *self.at.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut at = self.at.lock().unwrap_or_else(PoisonError::into_inner);
        *at += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.at.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Starts at a chosen time and then runs at wall-clock speed.
#[derive(Debug, Clone, Copy)]
pub struct OffsetClock {
    start: NaiveDateTime,
    origin: Instant,
}

impl OffsetClock {
    pub fn starting_at(start: NaiveDateTime) -> Self {
        Self::with_origin(start, Instant::now())
    }

    /// `start` corresponds to the moment `origin`.
    pub fn with_origin(start: NaiveDateTime, origin: Instant) -> Self {
        Self { start, origin }
    }
}

impl Clock for OffsetClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = Duration::from_std(self.origin.elapsed()).unwrap_or(Duration::zero());
        self.start + elapsed
    }
}

pub fn parse_timestamp(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("Empty timestamp"));
    }

    let formats = [
        TIMESTAMP_FORMAT,
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    for format in formats {
        if let Ok(at) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(at);
        }
    }

    Err(anyhow!("Could not parse timestamp: {}", input))
}

pub fn parse_day(input: &str) -> Result<DayKey> {
    input
        .parse::<DayKey>()
        .or_else(|_| {
            chrono::NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map(DayKey::new)
        })
        .map_err(|_| anyhow!("Could not parse day: {}", input))
}

/// `7h30m00s` style rendering of credited time.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!("{}{}h{:02}m{:02}s", sign, total / 3600, (total % 3600) / 60, total % 60)
}
