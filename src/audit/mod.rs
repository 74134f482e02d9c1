//! Audit log of transaction writes
//!
//! Every create and update made through the transaction store is appended to
//! `audit.log` as one JSON object per line, carrying the record before and
//! after the write and a short field diff.
//!
//! - `AuditEntry`: one logged write
//! - `AuditLogger`: appends and reads the JSONL file
//! - `generate_diff`: top-level field changes between two serialized records

mod diff;
mod entry;
mod logger;

pub use diff::generate_diff;
pub use entry::{AuditEntry, Operation};
pub use logger::AuditLogger;
