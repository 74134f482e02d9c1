//! Bank-sync import service
//!
//! Accepts transaction-shaped records from a bank-sync export as CSV with
//! the columns `external_id,date,amount,description,category,merchant,currency`.
//! Each row is stored through the transaction service, so it gets the same
//! normalization, validation and external ID deduplication as manual entry.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{SpendwiseError, SpendwiseResult};
use crate::models::{
    AccountId, Category, Currency, Merchant, Money, Transaction, TransactionStatus,
    TransactionType, UserId,
};
use crate::services::TransactionService;
use crate::storage::Storage;

/// Date formats tried, in order, for the `date` column
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// One CSV row as produced by the bank-sync exporter
#[derive(Debug, Deserialize)]
struct ImportRow {
    #[serde(default)]
    external_id: Option<String>,
    date: String,
    amount: String,
    description: String,
    category: String,
    #[serde(default)]
    merchant: Option<String>,
    #[serde(default)]
    currency: Option<String>,
}

/// Outcome of an import batch
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    /// Rows whose external ID was already stored
    pub duplicates_skipped: usize,
    /// Rows that could not be parsed or failed validation
    pub errors: usize,
    pub imported_ids: Vec<String>,
    /// Error message per 1-based data row number
    pub error_messages: BTreeMap<usize, String>,
}

/// Import options that apply to every row
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub owner: UserId,
    pub account: AccountId,
    /// Currency for rows that leave the column blank
    pub default_currency: Currency,
    /// Status given to imported rows
    pub status: TransactionStatus,
}

impl ImportOptions {
    pub fn new(owner: UserId, account: AccountId) -> Self {
        Self {
            owner,
            account,
            default_currency: Currency::default(),
            status: TransactionStatus::Posted,
        }
    }
}

/// Service for bank-sync CSV import
pub struct ImportService<'a> {
    storage: &'a Storage,
}

impl<'a> ImportService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Import a CSV file
    pub fn import_file(&self, path: &Path, options: &ImportOptions) -> SpendwiseResult<ImportResult> {
        let file = File::open(path).map_err(|e| {
            SpendwiseError::Import(format!("Failed to open {}: {}", path.display(), e))
        })?;
        self.import_reader(file, options)
    }

    /// Import CSV data from any reader
    ///
    /// A bad row is counted and reported; it never aborts the batch. The
    /// accepted rows are stored in one write, so a storage failure imports
    /// nothing.
    pub fn import_reader<R: Read>(&self, reader: R, options: &ImportOptions) -> SpendwiseResult<ImportResult> {
        let txn_service = TransactionService::new(self.storage);
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut result = ImportResult::default();
        let mut accepted = Vec::new();
        let mut seen_external_ids = HashSet::new();
        let now = Utc::now();

        for (idx, row) in reader.deserialize::<ImportRow>().enumerate() {
            let row_number = idx + 1;

            let mut txn = match row.map_err(|e| e.to_string()).and_then(|r| build_transaction(r, options)) {
                Ok(txn) => txn,
                Err(message) => {
                    debug!(row = row_number, error = %message, "Import row rejected");
                    result.errors += 1;
                    result.error_messages.insert(row_number, message);
                    continue;
                }
            };

            txn.prepare_for_save(now);
            if let Err(e) = txn.validate() {
                debug!(row = row_number, error = %e, "Import row failed validation");
                result.errors += 1;
                result.error_messages.insert(row_number, e.to_string());
                continue;
            }

            if let Some(external_id) = txn.external_id.clone() {
                let stored = self.storage.transactions.find_by_external_id(&external_id)?.is_some();
                if stored || !seen_external_ids.insert(external_id) {
                    result.duplicates_skipped += 1;
                    continue;
                }
            }

            accepted.push(txn);
        }

        if !accepted.is_empty() {
            let stored = txn_service.store_batch_at(accepted, Vec::new(), now)?;
            result.imported = stored.created.len();
            result.imported_ids = stored.created.iter().map(|t| t.id.to_string()).collect();
        }

        info!(
            imported = result.imported,
            duplicates = result.duplicates_skipped,
            errors = result.errors,
            "Import finished"
        );
        Ok(result)
    }
}

fn build_transaction(row: ImportRow, options: &ImportOptions) -> Result<Transaction, String> {
    let currency = match row.currency.as_deref().filter(|c| !c.is_empty()) {
        Some(code) => code.parse::<Currency>()?,
        None => options.default_currency,
    };
    let amount = parse_amount(&row.amount, currency)?;
    let date = parse_date(&row.date)?;

    let mut txn = Transaction::new(
        options.owner,
        options.account,
        TransactionType::from_sign(amount),
        amount,
        Category::parse(&row.category),
        row.description,
    )
    .with_date(date)
    .with_currency(currency)
    .with_status(options.status);

    if let Some(external_id) = row.external_id {
        txn = txn.with_external_id(external_id);
    }
    if let Some(merchant) = row.merchant.filter(|m| !m.is_empty()) {
        txn = txn.with_merchant(Merchant::new(merchant));
    }

    Ok(txn)
}

/// Parse an amount, accepting accounting-style parentheses for negatives
fn parse_amount(s: &str, currency: Currency) -> Result<Money, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        Some(inner) => Money::parse_in(inner, currency).map(|m| m.abs().negative()),
        None => Money::parse_in(s, currency),
    };
    parsed.map_err(|e| format!("Could not parse amount '{}': {}", s, e))
}

/// Parse a date column: RFC 3339 timestamps or a plain date at midnight UTC
fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .ok_or_else(|| format!("Could not parse date: '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::SpendwisePaths;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const HEADER: &str = "external_id,date,amount,description,category,merchant,currency\n";

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = SpendwisePaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn options() -> ImportOptions {
        ImportOptions::new(UserId::new(), AccountId::new())
    }

    #[test]
    fn test_import_infers_type_from_sign() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ImportService::new(&storage);
        let options = options();

        let csv = format!(
            "{}b-1,2025-01-15,-50.00,Corner Store,Food > Groceries,Corner Store,USD\n\
             b-2,2025-01-16,1000.00,Paycheck,Salary,,\n",
            HEADER
        );
        let result = service.import_reader(csv.as_bytes(), &options).unwrap();

        assert_eq!(result.imported, 2);
        assert_eq!(result.errors, 0);

        let grocery = storage.transactions.find_by_external_id("b-1").unwrap().unwrap();
        assert_eq!(grocery.kind, TransactionType::Expense);
        assert_eq!(grocery.amount.minor(), -5000);
        assert_eq!(grocery.category_display(), "Food > Groceries");
        assert_eq!(grocery.merchant.unwrap().name, "Corner Store");
        assert_eq!(grocery.date, Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap());
        assert!(grocery.posted_date.is_some());

        let pay = storage.transactions.find_by_external_id("b-2").unwrap().unwrap();
        assert_eq!(pay.kind, TransactionType::Income);
        assert!(pay.merchant.is_none());
        assert_eq!(pay.owner, options.owner);
    }

    #[test]
    fn test_reimport_skips_duplicates() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ImportService::new(&storage);
        let options = options();

        let csv = format!("{}b-1,2025-01-15,-50.00,Store,Food,,\n", HEADER);
        service.import_reader(csv.as_bytes(), &options).unwrap();
        let again = service.import_reader(csv.as_bytes(), &options).unwrap();

        assert_eq!(again.imported, 0);
        assert_eq!(again.duplicates_skipped, 1);
        assert_eq!(storage.transactions.count().unwrap(), 1);
    }

    #[test]
    fn test_bad_rows_do_not_abort_batch() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ImportService::new(&storage);

        let csv = format!(
            "{}b-1,not-a-date,-5.00,Store,Food,,\n\
             b-2,2025-01-15,0,Zero,Food,,\n\
             b-3,2025-01-15,(12.50),Refund fee,Fees,,\n\
             b-4,2025-01-15,-1.00,Odd currency,Food,,XYZ\n",
            HEADER
        );
        let result = service.import_reader(csv.as_bytes(), &options()).unwrap();

        assert_eq!(result.imported, 1);
        assert_eq!(result.errors, 3);
        assert!(result.error_messages[&1].contains("not-a-date"));
        assert!(result.error_messages[&2].contains("amount"));
        assert!(result.error_messages.contains_key(&4));

        let fee = storage.transactions.find_by_external_id("b-3").unwrap().unwrap();
        assert_eq!(fee.amount.minor(), -1250);
    }

    #[test]
    fn test_rows_without_external_id_are_imported() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ImportService::new(&storage);

        let csv = format!(
            "{},01/20/2025,-3.00,Coffee,Food,,\n,01/20/2025,-3.00,Coffee,Food,,\n",
            HEADER
        );
        let result = service.import_reader(csv.as_bytes(), &options()).unwrap();
        assert_eq!(result.imported, 2);
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("-50.00", Currency::Usd).unwrap().minor(), -5000);
        assert_eq!(parse_amount("$1,234.56", Currency::Usd).unwrap().minor(), 123456);
        assert_eq!(parse_amount("(7.25)", Currency::Usd).unwrap().minor(), -725);
        assert_eq!(parse_amount("-1200", Currency::Jpy).unwrap().minor(), -1200);
        assert!(parse_amount("abc", Currency::Usd).is_err());
    }

    #[test]
    fn test_repeated_external_id_in_file_is_skipped() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ImportService::new(&storage);

        let csv = format!(
            "{}b-1,2025-01-15,-5.00,Store,Food,,\nb-1,2025-01-15,-5.00,Store,Food,,\n",
            HEADER
        );
        let result = service.import_reader(csv.as_bytes(), &options()).unwrap();

        assert_eq!(result.imported, 1);
        assert_eq!(result.duplicates_skipped, 1);
        assert_eq!(storage.transactions.count().unwrap(), 1);
    }

    #[test]
    fn test_storage_failure_imports_nothing() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ImportService::new(&storage);
        let options = options();

        let data_file = storage.paths().transactions_file();
        std::fs::create_dir_all(&data_file).unwrap();

        let csv = format!(
            "{}b-1,2025-01-15,-5.00,Store,Food,,\nb-2,2025-01-16,-6.00,Store,Food,,\n",
            HEADER
        );
        assert!(service.import_reader(csv.as_bytes(), &options).is_err());
        assert_eq!(storage.transactions.count().unwrap(), 0);

        std::fs::remove_dir(&data_file).unwrap();
        let result = service.import_reader(csv.as_bytes(), &options).unwrap();
        assert_eq!(result.imported, 2);
        assert_eq!(result.duplicates_skipped, 0);
    }
}
