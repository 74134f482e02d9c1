//! Monthly Trends Report
//!
//! Signed totals per month and transaction type over a lookback window.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{SpendwiseError, SpendwiseResult};
use crate::models::{Currency, Money, TransactionType, UserId};
use crate::services::{MonthlyTrend, TransactionService};
use crate::storage::Storage;

/// All buckets of one calendar month folded together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub income: Money,
    /// Signed, so zero or negative
    pub expense: Money,
    pub transfer: Money,
    pub count: usize,
}

impl MonthSummary {
    /// Income plus expenses plus transfers
    pub fn net(&self) -> Money {
        self.income + self.expense + self.transfer
    }

    pub fn label(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

/// Monthly Trends Report
#[derive(Debug, Clone)]
pub struct TrendsReport {
    pub months: u32,
    pub as_of: DateTime<Utc>,
    /// Raw (year, month, type) buckets, chronological
    pub trends: Vec<MonthlyTrend>,
    pub currency: Currency,
}

#[derive(Serialize)]
struct CsvRow {
    year: i32,
    month: u32,
    #[serde(rename = "type")]
    kind: TransactionType,
    total: String,
    count: usize,
}

impl TrendsReport {
    /// Generate trends for the `months` months before `as_of`
    pub fn generate(
        storage: &Storage,
        owner: UserId,
        months: u32,
        as_of: DateTime<Utc>,
        currency: Currency,
    ) -> SpendwiseResult<Self> {
        let trends = TransactionService::new(storage).monthly_trends(owner, months, as_of)?;
        Ok(Self {
            months,
            as_of,
            trends,
            currency,
        })
    }

    /// Fold buckets into one summary per month, chronological
    pub fn by_month(&self) -> Vec<MonthSummary> {
        let mut summaries: Vec<MonthSummary> = Vec::new();

        for trend in &self.trends {
            let same_month = summaries
                .last()
                .is_some_and(|last| last.year == trend.year && last.month == trend.month);
            if !same_month {
                summaries.push(MonthSummary {
                    year: trend.year,
                    month: trend.month,
                    income: Money::zero(),
                    expense: Money::zero(),
                    transfer: Money::zero(),
                    count: 0,
                });
            }
            let Some(summary) = summaries.last_mut() else {
                continue;
            };

            match trend.kind {
                TransactionType::Income => summary.income += trend.total,
                TransactionType::Expense => summary.expense += trend.total,
                TransactionType::Transfer => summary.transfer += trend.total,
            }
            summary.count += trend.count;
        }

        summaries
    }

    /// Format the report for terminal display
    pub fn format_terminal(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Monthly Trends: last {} months to {}\n",
            self.months,
            self.as_of.format("%Y-%m-%d")
        ));
        output.push_str(&"=".repeat(64));
        output.push('\n');

        let months = self.by_month();
        if months.is_empty() {
            output.push_str("No transactions in this window.\n");
            return output;
        }

        output.push_str(&format!(
            "{:<8} {:>12} {:>12} {:>12} {:>12} {:>5}\n",
            "Month", "Income", "Expenses", "Transfers", "Net", "Count"
        ));
        output.push_str(&"-".repeat(64));
        output.push('\n');

        for month in &months {
            output.push_str(&format!(
                "{:<8} {:>12} {:>12} {:>12} {:>12} {:>5}\n",
                month.label(),
                month.income.format(self.currency),
                month.expense.format(self.currency),
                month.transfer.format(self.currency),
                month.net().format_signed(self.currency),
                month.count
            ));
        }

        output
    }

    /// Export the raw buckets to CSV
    pub fn export_csv<W: Write>(&self, writer: W) -> SpendwiseResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for trend in &self.trends {
            csv_writer
                .serialize(CsvRow {
                    year: trend.year,
                    month: trend.month,
                    kind: trend.kind,
                    total: trend.total.to_decimal_string(self.currency),
                    count: trend.count,
                })
                .map_err(|e| SpendwiseError::Export(e.to_string()))?;
        }

        csv_writer
            .flush()
            .map_err(|e| SpendwiseError::Export(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::SpendwisePaths;
    use crate::models::{AccountId, Category, Transaction};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = SpendwisePaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        (temp_dir, storage)
    }

    fn book(storage: &Storage, owner: UserId, kind: TransactionType, minor: i64, month: u32) {
        let txn = Transaction::new(
            owner,
            AccountId::new(),
            kind,
            Money::from_minor(minor),
            Category::new("General"),
            "entry",
        )
        .with_date(Utc.with_ymd_and_hms(2025, month, 5, 0, 0, 0).unwrap());
        TransactionService::new(storage).create(txn).unwrap();
    }

    fn report(storage: &Storage, owner: UserId) -> TrendsReport {
        let as_of = Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap();
        TrendsReport::generate(storage, owner, 12, as_of, Currency::Usd).unwrap()
    }

    #[test]
    fn test_two_months_chronological() {
        let (_temp_dir, storage) = create_test_storage();
        let owner = UserId::new();
        book(&storage, owner, TransactionType::Expense, -5000, 2);
        book(&storage, owner, TransactionType::Income, 100000, 1);

        let report = report(&storage, owner);

        assert_eq!(report.trends.len(), 2);
        assert_eq!(report.trends[0].month, 1);
        assert_eq!(report.trends[0].total.minor(), 100000);
        assert_eq!(report.trends[1].month, 2);
        assert_eq!(report.trends[1].total.minor(), -5000);
    }

    #[test]
    fn test_by_month_folds_types() {
        let (_temp_dir, storage) = create_test_storage();
        let owner = UserId::new();
        book(&storage, owner, TransactionType::Income, 100000, 3);
        book(&storage, owner, TransactionType::Expense, -30000, 3);
        book(&storage, owner, TransactionType::Transfer, -5000, 3);
        book(&storage, owner, TransactionType::Expense, -1000, 4);

        let months = report(&storage, owner).by_month();

        assert_eq!(months.len(), 2);
        assert_eq!(months[0].label(), "2025-03");
        assert_eq!(months[0].net().minor(), 65000);
        assert_eq!(months[0].count, 3);
        assert_eq!(months[1].expense.minor(), -1000);
    }

    #[test]
    fn test_format_and_export() {
        let (_temp_dir, storage) = create_test_storage();
        let owner = UserId::new();
        book(&storage, owner, TransactionType::Income, 100000, 1);

        let report = report(&storage, owner);
        let output = report.format_terminal();
        assert!(output.contains("2025-01"));
        assert!(output.contains("+$1000.00"));

        let mut buffer = Vec::new();
        report.export_csv(&mut buffer).unwrap();
        let csv = String::from_utf8(buffer).unwrap();
        assert_eq!(csv, "year,month,type,total,count\n2025,1,income,1000.00,1\n");
    }

    #[test]
    fn test_empty_window() {
        let (_temp_dir, storage) = create_test_storage();
        let report = report(&storage, UserId::new());
        assert!(report.format_terminal().contains("No transactions"));
    }
}
