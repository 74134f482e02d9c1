//! Service layer for Spendwise
//!
//! Business logic on top of the storage layer. All writes to transactions go
//! through `TransactionService`, which the import and recurring services
//! build on.

pub mod import;
pub mod recurring;
pub mod transaction;

pub use import::{ImportOptions, ImportResult, ImportService};
pub use recurring::{RecurringRun, RecurringService};
pub use transaction::{
    CategorySpending, MonthlyTrend, StoredBatch, TransactionFilter, TransactionService,
    DEFAULT_CATEGORY_LIMIT, DEFAULT_TREND_MONTHS,
};
