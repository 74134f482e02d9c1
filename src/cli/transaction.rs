//! Transaction CLI commands
//!
//! Implements CLI commands for transaction management.

use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;

use super::{parse_day_end, parse_day_start};
use crate::config::Settings;
use crate::display::{format_import_result, format_transaction_details, format_transaction_register};
use crate::error::{SpendwiseError, SpendwiseResult};
use crate::models::{
    AccountId, Category, Currency, Frequency, Merchant, Money, Recurrence, Transaction,
    TransactionStatus, TransactionType, UserId,
};
use crate::services::{ImportOptions, ImportService, TransactionFilter, TransactionService};
use crate::storage::Storage;

/// Transaction subcommands
#[derive(Subcommand, Debug)]
pub enum TransactionCommands {
    /// Add a new transaction
    Add {
        /// Account ID
        account: String,
        /// Amount (e.g., "-50.00" for outflow, "100.00" for inflow)
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Description
        description: String,
        /// Category, optionally "Primary > Secondary"
        #[arg(short, long, default_value = "Uncategorized")]
        category: String,
        /// Transaction type (income, expense, transfer); inferred from the sign if omitted
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
        /// Transaction date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
        /// Currency code, defaults to the configured currency
        #[arg(long)]
        currency: Option<String>,
        /// Status (pending, posted, cancelled, failed)
        #[arg(short, long)]
        status: Option<String>,
        /// Merchant name
        #[arg(short, long)]
        merchant: Option<String>,
        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Identifier from the bank-sync source
        #[arg(long)]
        external_id: Option<String>,
        /// Make this a recurring template (daily, weekly, monthly, yearly)
        #[arg(long)]
        recur: Option<String>,
        /// Steps between occurrences
        #[arg(long, default_value = "1")]
        every: u32,
        /// Last date an occurrence may fall on (YYYY-MM-DD)
        #[arg(long, requires = "recur")]
        until: Option<String>,
    },
    /// List transactions
    List {
        /// Filter by account ID
        #[arg(short, long)]
        account: Option<String>,
        /// Filter by primary category
        #[arg(short = 'C', long)]
        category: Option<String>,
        /// Filter by type
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
        /// Filter by status
        #[arg(long)]
        status: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Include archived and hidden transactions
        #[arg(long)]
        all: bool,
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Most recent transactions in a primary category
    #[command(name = "by-category")]
    ByCategory {
        /// Primary category name
        category: String,
    },
    /// Show transaction details
    Show {
        /// Transaction ID
        id: String,
    },
    /// Change a transaction's status
    Status {
        /// Transaction ID
        id: String,
        /// New status (pending, posted, cancelled, failed)
        status: String,
    },
    /// Mark a transaction as reconciled
    Reconcile {
        /// Transaction ID
        id: String,
    },
    /// Add a tag
    Tag {
        /// Transaction ID
        id: String,
        tag: String,
    },
    /// Remove a tag
    Untag {
        /// Transaction ID
        id: String,
        tag: String,
    },
    /// Store a copy of a transaction dated today
    Duplicate {
        /// Transaction ID
        id: String,
    },
    /// Archive a transaction
    Archive {
        /// Transaction ID
        id: String,
    },
    /// Restore an archived transaction
    Unarchive {
        /// Transaction ID
        id: String,
    },
    /// Hide a transaction from listings
    Hide {
        /// Transaction ID
        id: String,
    },
    /// Show a hidden transaction again
    Unhide {
        /// Transaction ID
        id: String,
    },
    /// Import transactions from a bank-sync CSV export
    Import {
        /// Path to CSV file
        file: PathBuf,
        /// Target account ID
        #[arg(short, long)]
        account: String,
    },
}

/// Handle a transaction command
pub fn handle_transaction_command(
    storage: &Storage,
    settings: &Settings,
    user: UserId,
    cmd: TransactionCommands,
) -> SpendwiseResult<()> {
    let service = TransactionService::new(storage);
    let date_format = settings.effective_date_format();

    match cmd {
        TransactionCommands::Add {
            account,
            amount,
            description,
            category,
            kind,
            date,
            currency,
            status,
            merchant,
            notes,
            tags,
            external_id,
            recur,
            every,
            until,
        } => {
            let account = parse_account(&account)?;
            let currency = match currency {
                Some(code) => parse_field::<Currency>("currency", &code)?,
                None => settings.default_currency,
            };
            let amount = Money::parse_in(&amount, currency).map_err(|e| {
                SpendwiseError::invalid(
                    "amount",
                    format!("Invalid amount '{}'. Use a format like '-50.00' or '100'. {}", amount, e),
                )
            })?;
            let kind = match kind {
                Some(kind) => parse_field::<TransactionType>("type", &kind)?,
                None => TransactionType::from_sign(amount),
            };
            let date = match date {
                Some(d) => parse_day_start("date", &d)?,
                None => Utc::now(),
            };

            let mut txn = Transaction::new(user, account, kind, amount, Category::parse(&category), description)
                .with_date(date)
                .with_currency(currency);

            if let Some(status) = status {
                txn = txn.with_status(parse_field::<TransactionStatus>("status", &status)?);
            }
            if let Some(merchant) = merchant {
                txn = txn.with_merchant(Merchant::new(merchant));
            }
            if let Some(notes) = notes {
                txn = txn.with_notes(notes);
            }
            if let Some(external_id) = external_id {
                txn = txn.with_external_id(external_id);
            }
            for tag in &tags {
                txn.add_tag(tag);
            }
            if let Some(frequency) = recur {
                let frequency = parse_field::<Frequency>("recur", &frequency)?;
                // The template itself is the first occurrence
                let mut schedule = Recurrence::every(frequency, every, date);
                schedule.next_due_date = schedule.following(date);
                if let Some(until) = until {
                    schedule = schedule.until(parse_day_end("until", &until)?);
                }
                txn = txn.with_recurrence(schedule);
            }

            let txn = service.create(txn)?;

            println!("Created transaction:");
            println!("  ID:       {}", txn.id);
            println!("  Date:     {}", txn.date.format(date_format));
            println!("  Amount:   {}", txn.formatted_amount());
            println!("  Type:     {}", txn.kind);
            println!("  Category: {}", txn.category_display());
            println!("  Status:   {}", txn.status);
        }

        TransactionCommands::List {
            account,
            category,
            kind,
            status,
            from,
            to,
            all,
            limit,
        } => {
            let mut filter = TransactionFilter::new().limit(limit);

            if let Some(account) = account {
                filter = filter.account(parse_account(&account)?);
            }
            if let Some(category) = category {
                filter = filter.category(category);
            }
            if let Some(kind) = kind {
                filter = filter.kind(parse_field::<TransactionType>("type", &kind)?);
            }
            if let Some(status) = status {
                filter = filter.status(parse_field::<TransactionStatus>("status", &status)?);
            }
            if let Some(from) = from {
                filter.start = Some(parse_day_start("from", &from)?);
            }
            if let Some(to) = to {
                filter.end = Some(parse_day_end("to", &to)?);
            }
            if all {
                filter = filter.include_archived();
            }

            let transactions = service.list(user, &filter)?;
            print!("{}", format_transaction_register(&transactions, date_format));
        }

        TransactionCommands::ByCategory { category } => {
            let transactions = service.find_by_category_limited(user, &category, settings.category_limit)?;
            print!("{}", format_transaction_register(&transactions, date_format));
        }

        TransactionCommands::Show { id } => {
            let txn = service.find(user, &id)?;
            print!("{}", format_transaction_details(&txn, Utc::now(), date_format));
        }

        TransactionCommands::Status { id, status } => {
            let status = parse_field::<TransactionStatus>("status", &status)?;
            let txn = service.find(user, &id)?;
            let txn = service.set_status(user, txn.id, status)?;
            println!("Transaction {} is now {}", txn.id, txn.status);
        }

        TransactionCommands::Reconcile { id } => {
            let txn = service.find(user, &id)?;
            let txn = service.mark_reconciled(user, txn.id)?;
            println!("Reconciled transaction {}", txn.id);
        }

        TransactionCommands::Tag { id, tag } => {
            let txn = service.find(user, &id)?;
            let txn = service.add_tag(user, txn.id, &tag)?;
            println!("Tags on {}: {}", txn.id, join_tags(&txn));
        }

        TransactionCommands::Untag { id, tag } => {
            let txn = service.find(user, &id)?;
            let txn = service.remove_tag(user, txn.id, &tag)?;
            println!("Tags on {}: {}", txn.id, join_tags(&txn));
        }

        TransactionCommands::Duplicate { id } => {
            let original = service.find(user, &id)?;
            let copy = service.create(service.duplicate(user, original.id)?)?;
            println!("Duplicated {} as {}: {}", original.id, copy.id, copy.description);
        }

        TransactionCommands::Archive { id } => {
            let txn = service.find(user, &id)?;
            let txn = service.archive(user, txn.id)?;
            println!("Archived transaction {}", txn.id);
        }

        TransactionCommands::Unarchive { id } => {
            let txn = service.find(user, &id)?;
            let txn = service.unarchive(user, txn.id)?;
            println!("Restored transaction {}", txn.id);
        }

        TransactionCommands::Hide { id } => {
            let txn = service.find(user, &id)?;
            let txn = service.hide(user, txn.id)?;
            println!("Hid transaction {}", txn.id);
        }

        TransactionCommands::Unhide { id } => {
            let txn = service.find(user, &id)?;
            let txn = service.unhide(user, txn.id)?;
            println!("Unhid transaction {}", txn.id);
        }

        TransactionCommands::Import { file, account } => {
            let mut options = ImportOptions::new(user, parse_account(&account)?);
            options.default_currency = settings.default_currency;

            let result = ImportService::new(storage).import_file(&file, &options)?;
            print!("{}", format_import_result(&result));
        }
    }

    Ok(())
}

fn parse_account(raw: &str) -> SpendwiseResult<AccountId> {
    raw.trim()
        .parse::<AccountId>()
        .map_err(|_| SpendwiseError::invalid("account", format!("'{}' is not a valid account ID", raw)))
}

/// Parse an argument through its `FromStr`, reporting failures against `field`
fn parse_field<T>(field: &str, raw: &str) -> SpendwiseResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse::<T>().map_err(|e| SpendwiseError::invalid(field, e))
}

fn join_tags(txn: &Transaction) -> String {
    if txn.tags.is_empty() {
        "(none)".to_string()
    } else {
        txn.tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}
