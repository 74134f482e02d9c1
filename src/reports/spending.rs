//! Spending Report
//!
//! Expense totals per primary category over a reporting period.

use std::io::Write;

use serde::Serialize;

use crate::error::{SpendwiseError, SpendwiseResult};
use crate::models::{Currency, Money, ReportPeriod, UserId};
use crate::services::{CategorySpending, TransactionService};
use crate::storage::Storage;

/// One category line of the report
#[derive(Debug, Clone)]
pub struct CategoryLine {
    pub category: String,
    /// Absolute spending
    pub total: Money,
    pub count: usize,
    /// Share of total spending, 0-100
    pub percentage: f64,
}

/// Spending Report
#[derive(Debug, Clone)]
pub struct SpendingReport {
    pub period: ReportPeriod,
    /// Largest spending first
    pub categories: Vec<CategoryLine>,
    pub total_spending: Money,
    pub total_transactions: usize,
    /// Symbol used when rendering amounts
    pub currency: Currency,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    start_date: String,
    end_date: String,
    category: &'a str,
    amount: String,
    transaction_count: usize,
    percentage: String,
}

impl SpendingReport {
    /// Generate a spending report for one owner and period
    pub fn generate(
        storage: &Storage,
        owner: UserId,
        period: ReportPeriod,
        currency: Currency,
    ) -> SpendwiseResult<Self> {
        let spending = TransactionService::new(storage).spending_by_category(
            owner,
            period.start(),
            period.end(),
        )?;
        Ok(Self::from_spending(period, spending, currency))
    }

    /// Build a report from already aggregated category totals
    pub fn from_spending(
        period: ReportPeriod,
        spending: Vec<CategorySpending>,
        currency: Currency,
    ) -> Self {
        let total_spending: Money = spending.iter().map(|s| s.total_amount).sum();
        let total_transactions = spending.iter().map(|s| s.count).sum();

        let categories = spending
            .into_iter()
            .map(|s| CategoryLine {
                percentage: percentage_of(s.total_amount, total_spending),
                category: s.category,
                total: s.total_amount,
                count: s.count,
            })
            .collect();

        Self {
            period,
            categories,
            total_spending,
            total_transactions,
            currency,
        }
    }

    /// Format the report for terminal display
    pub fn format_terminal(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Spending Report: {} to {}\n",
            self.period.start_date(),
            self.period.end_date()
        ));
        output.push_str(&"=".repeat(64));
        output.push('\n');

        if self.categories.is_empty() {
            output.push_str("No spending in this period.\n");
            return output;
        }

        output.push_str(&format!(
            "{:<32} {:>12} {:>8} {:>8}\n",
            "Category", "Amount", "Count", "%"
        ));
        output.push_str(&"-".repeat(64));
        output.push('\n');

        for line in &self.categories {
            output.push_str(&format!(
                "{:<32} {:>12} {:>8} {:>7.1}%\n",
                line.category,
                line.total.format(self.currency),
                line.count,
                line.percentage
            ));
        }

        output.push_str(&"-".repeat(64));
        output.push('\n');
        output.push_str(&format!(
            "{:<32} {:>12} {:>8}\n",
            "TOTAL SPENDING",
            self.total_spending.format(self.currency),
            self.total_transactions
        ));

        output
    }

    /// Export the report to CSV, one row per category plus a total row
    pub fn export_csv<W: Write>(&self, writer: W) -> SpendwiseResult<()> {
        let export_err = |e: csv::Error| SpendwiseError::Export(e.to_string());
        let mut csv_writer = csv::Writer::from_writer(writer);

        let start_date = self.period.start_date().to_string();
        let end_date = self.period.end_date().to_string();

        for line in &self.categories {
            csv_writer
                .serialize(CsvRow {
                    start_date: start_date.clone(),
                    end_date: end_date.clone(),
                    category: &line.category,
                    amount: line.total.to_decimal_string(self.currency),
                    transaction_count: line.count,
                    percentage: format!("{:.2}", line.percentage),
                })
                .map_err(export_err)?;
        }

        csv_writer
            .serialize(CsvRow {
                start_date,
                end_date,
                category: "TOTAL",
                amount: self.total_spending.to_decimal_string(self.currency),
                transaction_count: self.total_transactions,
                percentage: if self.categories.is_empty() { "0.00" } else { "100.00" }.into(),
            })
            .map_err(export_err)?;

        csv_writer
            .flush()
            .map_err(|e| SpendwiseError::Export(e.to_string()))
    }

    /// The `limit` biggest categories
    pub fn top_categories(&self, limit: usize) -> &[CategoryLine] {
        &self.categories[..limit.min(self.categories.len())]
    }
}

fn percentage_of(part: Money, whole: Money) -> f64 {
    if whole.is_zero() {
        0.0
    } else {
        part.minor() as f64 / whole.minor() as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::SpendwisePaths;
    use crate::models::{AccountId, Category, Transaction, TransactionType};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = SpendwisePaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn seed(storage: &Storage, owner: UserId) {
        let service = TransactionService::new(storage);
        let day = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        for (kind, minor, category) in [
            (TransactionType::Expense, -5000, "Food"),
            (TransactionType::Expense, -3000, "Food"),
            (TransactionType::Expense, -2000, "Transport"),
            (TransactionType::Income, 100000, "Salary"),
        ] {
            let txn = Transaction::new(
                owner,
                AccountId::new(),
                kind,
                Money::from_minor(minor),
                Category::new(category),
                "seed",
            )
            .with_date(day);
            service.create(txn).unwrap();
        }
    }

    #[test]
    fn test_generate_spending_report() {
        let (_temp_dir, storage) = create_test_storage();
        let owner = UserId::new();
        seed(&storage, owner);

        let report =
            SpendingReport::generate(&storage, owner, ReportPeriod::monthly(2025, 1), Currency::Usd)
                .unwrap();

        assert_eq!(report.total_spending.minor(), 10000);
        assert_eq!(report.total_transactions, 3);
        assert_eq!(report.categories[0].category, "Food");
        assert_eq!(report.categories[0].total.minor(), 8000);
        assert!((report.categories[0].percentage - 80.0).abs() < 1e-9);
        assert_eq!(report.top_categories(1).len(), 1);
        assert_eq!(report.top_categories(10).len(), 2);
    }

    #[test]
    fn test_empty_period() {
        let (_temp_dir, storage) = create_test_storage();
        let owner = UserId::new();
        seed(&storage, owner);

        let report =
            SpendingReport::generate(&storage, owner, ReportPeriod::monthly(2025, 2), Currency::Usd)
                .unwrap();

        assert!(report.categories.is_empty());
        assert!(report.format_terminal().contains("No spending"));
    }

    #[test]
    fn test_format_terminal() {
        let (_temp_dir, storage) = create_test_storage();
        let owner = UserId::new();
        seed(&storage, owner);

        let report =
            SpendingReport::generate(&storage, owner, ReportPeriod::monthly(2025, 1), Currency::Eur)
                .unwrap();
        let output = report.format_terminal();

        assert!(output.contains("2025-01-01 to 2025-01-31"));
        assert!(output.contains("Food"));
        assert!(output.contains("€80.00"));
        assert!(output.contains("€100.00"));
    }

    #[test]
    fn test_export_csv() {
        let (_temp_dir, storage) = create_test_storage();
        let owner = UserId::new();
        seed(&storage, owner);

        let report =
            SpendingReport::generate(&storage, owner, ReportPeriod::monthly(2025, 1), Currency::Usd)
                .unwrap();

        let mut buffer = Vec::new();
        report.export_csv(&mut buffer).unwrap();
        let csv = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "start_date,end_date,category,amount,transaction_count,percentage"
        );
        assert_eq!(lines[1], "2025-01-01,2025-01-31,Food,80.00,2,80.00");
        assert_eq!(lines[3], "2025-01-01,2025-01-31,TOTAL,100.00,3,100.00");
    }
}
