//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod recurring;
pub mod report;
pub mod transaction;

pub use recurring::{handle_recurring_command, RecurringCommands};
pub use report::{handle_report_command, ReportCommands};
pub use transaction::{handle_transaction_command, TransactionCommands};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::config::Settings;
use crate::error::{SpendwiseError, SpendwiseResult};
use crate::models::UserId;

/// Environment variable naming the acting user
pub const USER_ENV: &str = "SPENDWISE_USER";

/// The acting user: explicit `--user` first, then the configured default
pub fn resolve_user(flag: Option<&str>, settings: &Settings) -> SpendwiseResult<UserId> {
    match flag.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<UserId>()
            .map_err(|_| SpendwiseError::invalid("user", format!("'{}' is not a valid user ID", raw))),
        None => settings.default_user.ok_or_else(|| {
            SpendwiseError::Config(format!(
                "No user given. Pass --user, set {}, or run 'spendwise init --user <UUID>'",
                USER_ENV
            ))
        }),
    }
}

/// Parse a `YYYY-MM-DD` argument
pub(crate) fn parse_date(field: &str, value: &str) -> SpendwiseResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        SpendwiseError::invalid(field, format!("Invalid date '{}'. Use YYYY-MM-DD", value))
    })
}

/// Start of a `YYYY-MM-DD` day, UTC
pub(crate) fn parse_day_start(field: &str, value: &str) -> SpendwiseResult<DateTime<Utc>> {
    Ok(parse_date(field, value)?.and_time(NaiveTime::MIN).and_utc())
}

/// Last instant of a `YYYY-MM-DD` day, UTC
pub(crate) fn parse_day_end(field: &str, value: &str) -> SpendwiseResult<DateTime<Utc>> {
    let end_of_day = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    Ok(parse_date(field, value)?.and_time(end_of_day).and_utc())
}
