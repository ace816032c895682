//! In memory implementation of the ledger repository, used by the engine,
//! intake and exporter tests.
//!
//! A mutation is applied to a copy of the day and only swapped in once it
//! completes, so a panicking closure leaves nothing behind.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::error::LedgerError;
use crate::model::day_record::{DayKey, DayRecord};
use crate::repository::traits::LedgerRepository;

#[derive(Default)]
pub struct InMemoryLedger {
    days: Mutex<BTreeMap<DayKey, DayRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.days.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerRepository for InMemoryLedger {
    fn get_day(&self, day: &DayKey) -> Result<Option<DayRecord>, LedgerError> {
        let days = self.days.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(days.get(day).cloned())
    }

    fn update_day<T, F>(&self, day: &DayKey, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut DayRecord) -> T,
    {
        let mut days = self.days.lock().unwrap_or_else(PoisonError::into_inner);
        let mut record = days.get(day).cloned().unwrap_or_else(|| DayRecord::new(*day));
        let outcome = f(&mut record);
        days.insert(*day, record);
        Ok(outcome)
    }

    fn for_each_day<E, F>(&self, mut visit: F) -> Result<(), E>
    where
        E: From<LedgerError>,
        F: FnMut(DayRecord) -> Result<(), E>,
    {
        let snapshot: Vec<DayRecord> = {
            let days = self.days.lock().unwrap_or_else(PoisonError::into_inner);
            days.values().cloned().collect()
        };
        for record in snapshot {
            visit(record)?;
        }
        Ok(())
    }
}
