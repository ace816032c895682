use crate::error::LedgerError;
use crate::model::day_record::{DayKey, DayRecord};
use std::sync::Arc;

pub trait LedgerRepository {
    fn get_day(&self, day: &DayKey) -> Result<Option<DayRecord>, LedgerError>;

    /// Reads the day (or starts an empty one), lets `f` mutate it and writes it
    /// back, all inside one transaction. Nothing is written if any step fails.
    fn update_day<T, F>(&self, day: &DayKey, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut DayRecord) -> T;

    /// Visits every day in key order. The visitor must not call back into the
    /// repository.
    fn for_each_day<E, F>(&self, visit: F) -> Result<(), E>
    where
        E: From<LedgerError>,
        F: FnMut(DayRecord) -> Result<(), E>;
}

impl<R: LedgerRepository> LedgerRepository for Arc<R> {
    fn get_day(&self, day: &DayKey) -> Result<Option<DayRecord>, LedgerError> {
        (**self).get_day(day)
    }

    fn update_day<T, F>(&self, day: &DayKey, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut DayRecord) -> T,
    {
        (**self).update_day(day, f)
    }

    fn for_each_day<E, F>(&self, visit: F) -> Result<(), E>
    where
        E: From<LedgerError>,
        F: FnMut(DayRecord) -> Result<(), E>,
    {
        (**self).for_each_day(visit)
    }
}
