//! Transaction display formatting
//!
//! Register views and detail cards for the terminal. Dates are rendered with
//! the user's configured strftime format.

use chrono::{DateTime, Utc};

use crate::models::{Transaction, TransactionStatus};
use crate::services::ImportResult;

fn status_icon(txn: &Transaction) -> &'static str {
    if txn.is_reconciled {
        return "R";
    }
    match txn.status {
        TransactionStatus::Pending => " ",
        TransactionStatus::Posted => "✓",
        TransactionStatus::Cancelled => "x",
        TransactionStatus::Failed => "!",
    }
}

/// Format a single transaction as a register row
pub fn format_transaction_row(txn: &Transaction, date_format: &str) -> String {
    let recurring = if txn.is_recurring_template() { " ↻" } else { "" };

    format!(
        "{:1} {:12} {} {} {:>14} {}{}",
        status_icon(txn),
        txn.id.to_string(),
        txn.date.format(date_format),
        truncate(&txn.description, 24),
        txn.formatted_amount(),
        truncate(&txn.category_display(), 20).trim_end(),
        recurring
    )
}

/// Format a list of transactions as a register
pub fn format_transaction_register(transactions: &[Transaction], date_format: &str) -> String {
    if transactions.is_empty() {
        return "No transactions found.\n".to_string();
    }

    let mut output = String::new();
    for txn in transactions {
        output.push_str(&format_transaction_row(txn, date_format));
        output.push('\n');
    }
    output.push_str(&format!("{} transaction(s)\n", transactions.len()));

    output
}

/// Format every populated field of a transaction
pub fn format_transaction_details(txn: &Transaction, now: DateTime<Utc>, date_format: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("Transaction: {}\n", txn.id.as_uuid()));
    output.push_str(&format!("Description: {}\n", txn.description));
    output.push_str(&format!("Amount:      {}\n", txn.formatted_amount()));
    output.push_str(&format!("Type:        {}\n", txn.kind));
    output.push_str(&format!("Category:    {}\n", txn.category_display()));
    output.push_str(&format!(
        "Date:        {} ({} days ago)\n",
        txn.date.format(date_format),
        txn.age_in_days(now)
    ));
    output.push_str(&format!("Status:      {}\n", txn.status));

    if let Some(posted) = txn.posted_date {
        output.push_str(&format!("Posted:      {}\n", posted.format(date_format)));
    }
    if let Some(merchant) = &txn.merchant {
        output.push_str(&format!("Merchant:    {}\n", merchant.name));
    }
    if let Some(external_id) = &txn.external_id {
        output.push_str(&format!("External ID: {}\n", external_id));
    }
    if !txn.tags.is_empty() {
        let tags: Vec<&str> = txn.tags.iter().map(String::as_str).collect();
        output.push_str(&format!("Tags:        {}\n", tags.join(", ")));
    }
    if let Some(notes) = &txn.notes {
        output.push_str(&format!("Notes:       {}\n", notes));
    }
    if let Some(reconciled) = txn.reconciliation_date.filter(|_| txn.is_reconciled) {
        output.push_str(&format!("Reconciled:  {}\n", reconciled.format(date_format)));
    }
    if txn.is_recurring_template() {
        let frequency = txn
            .recurring
            .frequency
            .map(|f| f.to_string())
            .unwrap_or_default();
        output.push_str(&format!(
            "Recurring:   every {} x {}",
            txn.recurring.interval, frequency
        ));
        if let Some(next) = txn.recurring.next_due_date {
            output.push_str(&format!(", next {}", next.format(date_format)));
        }
        output.push('\n');
    }
    if let Some(template) = txn.recurring.original_transaction {
        output.push_str(&format!("Generated from: {}\n", template));
    }
    if txn.split.is_split {
        output.push_str("\nSplit:\n");
        for share in &txn.split.splits {
            output.push_str(&format!(
                "  {} {}\n",
                share.user,
                share.amount.format(txn.currency)
            ));
        }
    }
    if txn.is_archived {
        output.push_str("(archived)\n");
    }
    if txn.is_hidden {
        output.push_str("(hidden)\n");
    }

    output
}

/// Summarize an import batch
pub fn format_import_result(result: &ImportResult) -> String {
    let mut output = format!(
        "Imported: {}\nDuplicates skipped: {}\nErrors: {}\n",
        result.imported, result.duplicates_skipped, result.errors
    );
    for (row, message) in &result.error_messages {
        output.push_str(&format!("  row {}: {}\n", row, message));
    }
    output
}

/// Pad or cut a string to exactly `max_len` characters
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        format!("{:width$}", s, width = max_len)
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, Category, Money, TransactionType, UserId};
    use chrono::TimeZone;

    fn sample() -> Transaction {
        Transaction::new(
            UserId::new(),
            AccountId::new(),
            TransactionType::Expense,
            Money::from_minor(-5000),
            Category::with_secondary("Food", "Groceries"),
            "Test Store",
        )
        .with_date(Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_format_transaction_row() {
        let formatted = format_transaction_row(&sample(), "%Y-%m-%d");
        assert!(formatted.contains("2025-01-15"));
        assert!(formatted.contains("Test Store"));
        assert!(formatted.contains("-$50.00"));
        assert!(formatted.contains("Food > Groceries"));
    }

    #[test]
    fn test_format_empty_register() {
        let formatted = format_transaction_register(&[], "%Y-%m-%d");
        assert!(formatted.contains("No transactions found"));
    }

    #[test]
    fn test_format_transaction_details() {
        let mut txn = sample().with_notes("weekly shop");
        txn.add_tag("groceries");
        let now = Utc.with_ymd_and_hms(2025, 1, 20, 10, 0, 0).unwrap();

        let formatted = format_transaction_details(&txn, now, "%d/%m/%Y");
        assert!(formatted.contains("15/01/2025 (5 days ago)"));
        assert!(formatted.contains("Tags:        groceries"));
        assert!(formatted.contains("weekly shop"));
        assert!(!formatted.contains("Reconciled"));
    }

    #[test]
    fn test_format_import_result() {
        let mut result = ImportResult {
            imported: 2,
            duplicates_skipped: 1,
            errors: 1,
            ..ImportResult::default()
        };
        result.error_messages.insert(3, "bad date".into());

        let formatted = format_import_result(&result);
        assert!(formatted.contains("Imported: 2"));
        assert!(formatted.contains("row 3: bad date"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Short", 10).trim(), "Short");
        let result = truncate("A very long string", 10);
        assert_eq!(result.chars().count(), 10);
        assert!(result.ends_with("..."));
    }
}
