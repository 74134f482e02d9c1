//! Spendwise - personal finance transaction store
//!
//! This library records a user's financial transactions (income, expenses and
//! transfers), keeps each record consistent on every save, and answers the
//! lookups and aggregations that budgeting views are built on.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: The transaction record and its value types
//! - `storage`: JSON file storage, indexes and query evaluation
//! - `services`: Business logic layer (store, import, recurring generation)
//! - `audit`: Audit logging system
//! - `reports`: Spending and trend reports
//! - `display`: Terminal formatting
//! - `cli`: clap command handlers used by the binary
//!
//! # Example
//!
//! ```rust,ignore
//! use spendwise::config::SpendwisePaths;
//! use spendwise::services::TransactionService;
//! use spendwise::storage::Storage;
//!
//! let storage = Storage::new(SpendwisePaths::new()?)?;
//! storage.load_all()?;
//! let spending = TransactionService::new(&storage).spending_by_category(owner, start, end)?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod reports;
pub mod services;
pub mod storage;

pub use error::{SpendwiseError, SpendwiseResult};
