//! Audit entry data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Transaction, UserId};

/// Kinds of audited writes
///
/// Records are never physically deleted, so there is no delete operation;
/// archiving shows up as an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "CREATE"),
            Operation::Update => write!(f, "UPDATE"),
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the write happened (UTC)
    pub timestamp: DateTime<Utc>,

    pub operation: Operation,

    /// ID of the affected transaction
    pub entity_id: String,

    /// Owner of the affected transaction
    pub owner: UserId,

    /// The transaction description at the time of the write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,

    /// Human-readable diff summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,
}

impl AuditEntry {
    /// Entry for a newly stored transaction
    pub fn create(txn: &Transaction) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: Operation::Create,
            entity_id: txn.id.as_uuid().to_string(),
            owner: txn.owner,
            entity_name: Some(txn.description.clone()),
            before: None,
            after: serde_json::to_value(txn).ok(),
            diff_summary: None,
        }
    }

    /// Entry for a replaced transaction
    pub fn update(before: &Transaction, after: &Transaction, diff_summary: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: Operation::Update,
            entity_id: after.id.as_uuid().to_string(),
            owner: after.owner,
            entity_name: Some(after.description.clone()),
            before: serde_json::to_value(before).ok(),
            after: serde_json::to_value(after).ok(),
            diff_summary,
        }
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            self.entity_id
        );

        if let Some(name) = &self.entity_name {
            output.push_str(&format!(" ({})", name));
        }

        if let Some(diff) = &self.diff_summary {
            output.push_str(&format!("\n  Changes: {}", diff));
        }

        output
    }
}
