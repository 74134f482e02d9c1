//! Reporting period representation
//!
//! Reports take an inclusive timestamp range. Users usually think in calendar
//! months or explicit day ranges, so this type converts those into UTC bounds.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ReportPeriod {
    /// Calendar month (e.g., "2025-01")
    Monthly { year: i32, month: u32 },

    /// Inclusive day range (e.g., "2025-01-01..2025-01-15")
    Custom { start: NaiveDate, end: NaiveDate },
}

impl ReportPeriod {
    /// Create a monthly period
    pub fn monthly(year: i32, month: u32) -> Self {
        Self::Monthly { year, month }
    }

    /// Create a custom period
    pub fn custom(start: NaiveDate, end: NaiveDate) -> Self {
        Self::Custom { start, end }
    }

    /// The month containing `date`
    pub fn month_of(date: NaiveDate) -> Self {
        Self::Monthly {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the period
    pub fn start_date(&self) -> NaiveDate {
        match self {
            Self::Monthly { year, month } => {
                NaiveDate::from_ymd_opt(*year, *month, 1).unwrap_or(NaiveDate::MIN)
            }
            Self::Custom { start, .. } => *start,
        }
    }

    /// Last day of the period (inclusive)
    pub fn end_date(&self) -> NaiveDate {
        match self {
            Self::Monthly { .. } => self.next().start_date() - Duration::days(1),
            Self::Custom { end, .. } => *end,
        }
    }

    /// Start of the first day, UTC
    pub fn start(&self) -> DateTime<Utc> {
        self.start_date().and_time(NaiveTime::MIN).and_utc()
    }

    /// Last representable instant of the final day, UTC
    pub fn end(&self) -> DateTime<Utc> {
        let next_day = self.end_date() + Duration::days(1);
        next_day.and_time(NaiveTime::MIN).and_utc() - Duration::nanoseconds(1)
    }

    /// Check if a timestamp falls within this period
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start() && at <= self.end()
    }

    /// The following period of the same length
    pub fn next(&self) -> Self {
        match self {
            Self::Monthly { year, month } => {
                if *month == 12 {
                    Self::Monthly {
                        year: *year + 1,
                        month: 1,
                    }
                } else {
                    Self::Monthly {
                        year: *year,
                        month: *month + 1,
                    }
                }
            }
            Self::Custom { start, end } => {
                let length = *end - *start;
                Self::Custom {
                    start: *end + Duration::days(1),
                    end: *end + length + Duration::days(1),
                }
            }
        }
    }

    /// Parse a period string
    ///
    /// Formats:
    /// - Monthly: "2025-01"
    /// - Custom: "2025-01-01..2025-01-15"
    pub fn parse(s: &str) -> Result<Self, PeriodParseError> {
        let s = s.trim();

        if let Some((start, end)) = s.split_once("..") {
            let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
                .map_err(|_| PeriodParseError::InvalidFormat(s.to_string()))?;
            let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
                .map_err(|_| PeriodParseError::InvalidFormat(s.to_string()))?;
            if end < start {
                return Err(PeriodParseError::Reversed(s.to_string()));
            }
            return Ok(Self::Custom { start, end });
        }

        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| PeriodParseError::InvalidFormat(s.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| PeriodParseError::InvalidFormat(s.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| PeriodParseError::InvalidFormat(s.to_string()))?;

        if !(1..=12).contains(&month) {
            return Err(PeriodParseError::InvalidMonth(month));
        }

        Ok(Self::Monthly { year, month })
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monthly { year, month } => write!(f, "{:04}-{:02}", year, month),
            Self::Custom { start, end } => write!(
                f,
                "{}..{}",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
        }
    }
}

/// Error type for period parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodParseError {
    InvalidFormat(String),
    InvalidMonth(u32),
    Reversed(String),
}

impl fmt::Display for PeriodParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodParseError::InvalidFormat(s) => write!(f, "Invalid period format: {}", s),
            PeriodParseError::InvalidMonth(m) => write!(f, "Invalid month: {}", m),
            PeriodParseError::Reversed(s) => write!(f, "Period ends before it starts: {}", s),
        }
    }
}

impl std::error::Error for PeriodParseError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_monthly_bounds() {
        let period = ReportPeriod::monthly(2024, 2);
        assert_eq!(period.start_date(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(period.end_date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_december_rolls_over() {
        let period = ReportPeriod::monthly(2024, 12);
        assert_eq!(period.next(), ReportPeriod::monthly(2025, 1));
        assert_eq!(period.end_date(), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let period = ReportPeriod::monthly(2025, 1);
        assert!(period.contains(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        assert!(period.contains(Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap()));
        assert!(!period.contains(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_monthly() {
        assert_eq!(ReportPeriod::parse("2025-03").unwrap(), ReportPeriod::monthly(2025, 3));
        assert_eq!(
            ReportPeriod::parse("2025-13"),
            Err(PeriodParseError::InvalidMonth(13))
        );
    }

    #[test]
    fn test_parse_custom() {
        let period = ReportPeriod::parse("2025-01-05..2025-01-20").unwrap();
        assert_eq!(period.start_date(), NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
        assert_eq!(period.end_date(), NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());
        assert!(ReportPeriod::parse("2025-01-20..2025-01-05").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ReportPeriod::monthly(2025, 1).to_string(), "2025-01");
    }
}
