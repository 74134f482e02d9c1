//! Storage layer for Spendwise
//!
//! JSON document storage with atomic writes, in-memory indexes, and
//! storage-agnostic query descriptions. `Storage` ties the transaction
//! repository to the audit log.

pub mod file_io;
pub mod query;
pub mod transactions;

pub use file_io::{read_json, write_json_atomic};
pub use query::{
    Aggregate, AggregateQuery, DateOrder, GroupKey, GroupRow, GroupSort, GroupValue,
    TransactionQuery,
};
pub use transactions::TransactionRepository;

use crate::audit::{generate_diff, AuditEntry, AuditLogger};
use crate::config::paths::SpendwisePaths;
use crate::error::SpendwiseResult;
use crate::models::Transaction;

/// Main storage coordinator
pub struct Storage {
    paths: SpendwisePaths,
    pub transactions: TransactionRepository,
    audit: AuditLogger,
}

impl Storage {
    /// Create a storage instance, creating directories as needed
    pub fn new(paths: SpendwisePaths) -> SpendwiseResult<Self> {
        paths.ensure_directories()?;

        Ok(Self {
            transactions: TransactionRepository::new(paths.transactions_file()),
            audit: AuditLogger::new(paths.audit_log()),
            paths,
        })
    }

    pub fn paths(&self) -> &SpendwisePaths {
        &self.paths
    }

    /// Load all data from disk
    pub fn load_all(&self) -> SpendwiseResult<()> {
        self.transactions.load()
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Record a newly stored transaction in the audit log
    pub fn log_create(&self, txn: &Transaction) -> SpendwiseResult<()> {
        self.audit.log(&AuditEntry::create(txn))
    }

    /// Record a replaced transaction, with a field diff
    pub fn log_update(&self, before: &Transaction, after: &Transaction) -> SpendwiseResult<()> {
        let diff = match (serde_json::to_value(before), serde_json::to_value(after)) {
            (Ok(b), Ok(a)) => generate_diff(&b, &a),
            _ => None,
        };
        self.audit.log(&AuditEntry::update(before, after, diff))
    }
}
