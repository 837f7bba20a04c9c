//! Business-day calendar used to date forecasts

use crate::error::{DashboardError, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Trading calendar trait
pub trait TradingCalendar: Send + Sync {
    /// Check if a date is a trading day
    fn is_trading_day(&self, date: NaiveDate) -> bool;

    /// Get the next trading day after the given date
    fn next_trading_day(&self, date: NaiveDate) -> Result<NaiveDate> {
        let mut current = date + Duration::days(1);
        for _ in 0..365 {
            if self.is_trading_day(current) {
                return Ok(current);
            }
            current += Duration::days(1);
        }
        Err(DashboardError::CalendarError(format!(
            "No trading day found within 365 days after {}",
            date
        )))
    }

    /// The next `count` trading days strictly after `last`
    fn trading_days_after(&self, last: NaiveDate, count: usize) -> Result<Vec<NaiveDate>> {
        let mut days = Vec::with_capacity(count);
        let mut current = last;
        for _ in 0..count {
            current = self.next_trading_day(current)?;
            days.push(current);
        }
        Ok(days)
    }

    /// Get all trading days between two dates (inclusive)
    fn trading_days_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut current = start;

        while current <= end {
            if self.is_trading_day(current) {
                days.push(current);
            }
            current += Duration::days(1);
        }

        days
    }
}

/// Monday to Friday calendar with no holidays
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekdayCalendar;

impl WeekdayCalendar {
    pub fn new() -> Self {
        Self
    }

    fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

impl TradingCalendar for WeekdayCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !Self::is_weekend(date)
    }
}
