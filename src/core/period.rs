use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("period end {to} is before period start {from}")]
    EndBeforeStart { from: NaiveDate, to: NaiveDate },
}

/// Inclusive calendar-date range a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Period {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl Period {
    /// Validated constructor for callers; the estimator itself trusts the range it is given
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, PeriodError> {
        if to < from {
            return Err(PeriodError::EndBeforeStart { from, to });
        }
        Ok(Period { from, to })
    }

    /// Full calendar year
    pub fn calendar_year(year: i32) -> Option<Self> {
        Some(Period {
            from: NaiveDate::from_ymd_opt(year, 1, 1)?,
            to: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Calendar year the report belongs to
    pub fn report_year(&self) -> i32 {
        self.to.year()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn bounds_are_inclusive() {
        let period = Period::new(d("2024-01-01"), d("2024-03-31")).unwrap();
        assert!(period.contains(d("2024-01-01")));
        assert!(period.contains(d("2024-03-31")));
        assert!(!period.contains(d("2023-12-31")));
        assert!(!period.contains(d("2024-04-01")));
    }

    #[test]
    fn single_day_period() {
        let period = Period::new(d("2024-06-15"), d("2024-06-15")).unwrap();
        assert!(period.contains(d("2024-06-15")));
    }

    #[test]
    fn end_before_start_rejected() {
        assert_eq!(
            Period::new(d("2024-02-01"), d("2024-01-31")),
            Err(PeriodError::EndBeforeStart {
                from: d("2024-02-01"),
                to: d("2024-01-31")
            })
        );
    }

    #[test]
    fn report_year_from_end_date() {
        let period = Period::new(d("2023-07-01"), d("2024-06-30")).unwrap();
        assert_eq!(period.report_year(), 2024);
        assert_eq!(Period::calendar_year(2025).unwrap().to, d("2025-12-31"));
    }
}
