//! Recurring-transaction schedule
//!
//! A transaction flagged as recurring acts as a template: the recurring
//! service materializes one occurrence per due date and advances
//! `next_due_date` by `interval` steps of `frequency`.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::TransactionId;
use crate::error::ValidationErrors;

/// How often a recurring transaction repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Move `from` forward by `count` periods
    ///
    /// Monthly and yearly steps are calendar-aware: Jan 31 + 1 month lands on
    /// the last day of February.
    pub fn step(&self, from: DateTime<Utc>, count: u32) -> Option<DateTime<Utc>> {
        match self {
            Self::Daily => from.checked_add_signed(Duration::days(i64::from(count))),
            Self::Weekly => from.checked_add_signed(Duration::weeks(i64::from(count))),
            Self::Monthly => from.checked_add_months(Months::new(count)),
            Self::Yearly => from.checked_add_months(Months::new(count.checked_mul(12)?)),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("Unknown frequency: {}", other)),
        }
    }
}

fn default_interval() -> u32 {
    1
}

/// Recurrence settings carried on every transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    #[serde(default)]
    pub is_recurring: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,

    /// Number of frequency steps between occurrences (at least 1)
    #[serde(default = "default_interval")]
    pub interval: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<DateTime<Utc>>,

    /// Last date an occurrence may fall on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    /// For generated occurrences, the template they came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_transaction: Option<TransactionId>,
}

impl Default for Recurrence {
    fn default() -> Self {
        Self {
            is_recurring: false,
            frequency: None,
            interval: default_interval(),
            next_due_date: None,
            end_date: None,
            original_transaction: None,
        }
    }
}

impl Recurrence {
    /// A schedule repeating every `interval` `frequency` steps, first due at `first_due`
    pub fn every(frequency: Frequency, interval: u32, first_due: DateTime<Utc>) -> Self {
        Self {
            is_recurring: true,
            frequency: Some(frequency),
            interval,
            next_due_date: Some(first_due),
            ..Self::default()
        }
    }

    /// Set the last date an occurrence may fall on
    pub fn until(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Marker for an occurrence generated from `template`
    pub fn occurrence_of(template: TransactionId) -> Self {
        Self {
            original_transaction: Some(template),
            ..Self::default()
        }
    }

    /// The due date following `from`, or None if the schedule is incomplete
    pub fn following(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.frequency?.step(from, self.interval.max(1))
    }

    /// Whether `at` is past the end of the schedule
    pub fn is_past_end(&self, at: DateTime<Utc>) -> bool {
        self.end_date.is_some_and(|end| at > end)
    }

    /// All due dates from `next_due_date` up to and including `as_of`,
    /// stopping at `end_date`, plus the next due date after those
    pub fn due_through(&self, as_of: DateTime<Utc>) -> (Vec<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let mut due = Vec::new();
        let mut cursor = self.next_due_date;

        while let Some(at) = cursor {
            if at > as_of || self.is_past_end(at) {
                break;
            }
            due.push(at);
            cursor = self.following(at);
        }

        (due, cursor)
    }

    pub(crate) fn validate(&self, errors: &mut ValidationErrors) {
        if self.interval < 1 {
            errors.push("recurring.interval", "must be at least 1");
        }
        if !self.is_recurring {
            return;
        }
        if self.frequency.is_none() {
            errors.push("recurring.frequency", "is required for recurring transactions");
        }
        if let (Some(next), Some(end)) = (self.next_due_date, self.end_date) {
            if end < next {
                errors.push("recurring.end_date", "must not be before the next due date");
            }
        }
    }
}
