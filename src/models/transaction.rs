//! Transaction model
//!
//! The one persisted entity. A transaction belongs to exactly one user, is
//! booked against one of that user's accounts, and carries a signed amount
//! whose sign must agree with its type.
//!
//! Derived values (absolute amount, formatted amount, age, category display)
//! are methods and are never serialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::category::Category;
use super::currency::Currency;
use super::ids::{AccountId, TransactionId, UserId};
use super::metadata::{Attachment, Location, Merchant};
use super::money::Money;
use super::recurrence::Recurrence;
use super::split::SplitInfo;
use crate::error::{SpendwiseResult, ValidationErrors};

pub const DESCRIPTION_MAX: usize = 200;
pub const NOTES_MAX: usize = 500;
pub const DUPLICATE_PREFIX: &str = "Copy of ";

/// Largest magnitude accepted for `amount` (100 billion major units)
pub const AMOUNT_MAX: Money = Money::from_minor(10_000_000_000_000);

/// Direction of money flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    /// The type implied by an amount's sign, for imports that carry no type
    pub fn from_sign(amount: Money) -> Self {
        if amount.is_negative() {
            Self::Expense
        } else {
            Self::Income
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "income"),
            Self::Expense => write!(f, "expense"),
            Self::Transfer => write!(f, "transfer"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(format!("Unknown transaction type: {}", other)),
        }
    }
}

/// Settlement status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Authorized but not yet settled
    #[default]
    Pending,
    /// Settled by the bank
    Posted,
    Cancelled,
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Posted => write!(f, "posted"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "posted" => Ok(Self::Posted),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Unknown transaction status: {}", other)),
        }
    }
}

/// What `prepare_for_save` changed on a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveNormalization {
    /// The caller-supplied amount, if the sign had to be flipped
    pub sign_corrected_from: Option<Money>,
    /// Whether `posted_date` was stamped during this save
    pub posted_date_stamped: bool,
}

/// Lowercase and trim a tag; blank tags normalize to None
pub fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

/// A financial transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,

    /// The user who owns this transaction
    pub owner: UserId,

    /// The account this transaction is booked against
    pub account: AccountId,

    /// Identifier from the bank-sync source, unique when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Signed amount: positive for inflow, negative for outflow
    pub amount: Money,

    #[serde(default)]
    pub currency: Currency,

    #[serde(rename = "type")]
    pub kind: TransactionType,

    pub category: Category,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<Merchant>,

    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,

    /// Stamped on the first save that sees `status == Posted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub status: TransactionStatus,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    #[serde(default)]
    pub recurring: Recurrence,

    #[serde(default)]
    pub split: SplitInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    #[serde(default)]
    pub is_reconciled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_hidden: bool,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new pending transaction dated now
    pub fn new(
        owner: UserId,
        account: AccountId,
        kind: TransactionType,
        amount: Money,
        category: Category,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            owner,
            account,
            external_id: None,
            amount,
            currency: Currency::default(),
            kind,
            category,
            description: description.into(),
            merchant: None,
            date: now,
            posted_date: None,
            status: TransactionStatus::Pending,
            tags: BTreeSet::new(),
            notes: None,
            attachments: Vec::new(),
            recurring: Recurrence::default(),
            split: SplitInfo::default(),
            location: None,
            is_reconciled: false,
            reconciliation_date: None,
            is_hidden: false,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_merchant(mut self, merchant: Merchant) -> Self {
        self.merchant = Some(merchant);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_recurrence(mut self, recurring: Recurrence) -> Self {
        self.recurring = recurring;
        self
    }

    pub fn with_split(mut self, split: SplitInfo) -> Self {
        self.split = split;
        self
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }

    pub fn is_transfer(&self) -> bool {
        self.kind == TransactionType::Transfer
    }

    pub fn is_posted(&self) -> bool {
        self.status == TransactionStatus::Posted
    }

    /// Neither hidden nor archived
    pub fn is_visible(&self) -> bool {
        !self.is_hidden && !self.is_archived
    }

    /// Whether this record is a recurring template
    pub fn is_recurring_template(&self) -> bool {
        self.recurring.is_recurring
    }

    // -- Derived values --------------------------------------------------

    /// Magnitude of the amount
    pub fn absolute_amount(&self) -> Money {
        self.amount.abs()
    }

    /// Sign-prefixed amount with currency symbol, e.g. `-$50.00`
    pub fn formatted_amount(&self) -> String {
        self.amount.format_signed(self.currency)
    }

    /// Whole days elapsed between `date` and `now`
    pub fn age_in_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.date).num_days()
    }

    /// "primary > secondary" or just "primary"
    pub fn category_display(&self) -> String {
        self.category.display()
    }

    // -- Pre-save normalization -------------------------------------------

    /// Force the amount's sign to agree with the type
    ///
    /// Returns the original amount when it had to change.
    pub fn normalize_sign(&mut self) -> Option<Money> {
        let normalized = match self.kind {
            TransactionType::Income => self.amount.abs(),
            TransactionType::Expense => self.amount.negative(),
            TransactionType::Transfer => self.amount,
        };

        if normalized == self.amount {
            None
        } else {
            let original = self.amount;
            self.amount = normalized;
            Some(original)
        }
    }

    /// Stamp `posted_date` if the record is posted and has none yet
    pub fn stamp_posted_date(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_posted() && self.posted_date.is_none() {
            self.posted_date = Some(now);
            true
        } else {
            false
        }
    }

    /// Lowercase, trim and drop blank tags; blank external IDs become absent
    fn canonicalize(&mut self) {
        let tags = std::mem::take(&mut self.tags);
        self.tags = tags.iter().filter_map(|t| normalize_tag(t)).collect();

        if let Some(external_id) = self.external_id.take() {
            let trimmed = external_id.trim();
            if !trimmed.is_empty() {
                self.external_id = Some(trimmed.to_string());
            }
        }
    }

    /// Apply every pre-persist rule in a fixed order
    ///
    /// Order: sign normalization (split shares follow the amount's sign),
    /// posted-date stamping, canonicalization. Runs on every save, not only
    /// on creation.
    pub fn prepare_for_save(&mut self, now: DateTime<Utc>) -> SaveNormalization {
        let sign_corrected_from = self.normalize_sign();
        self.split.align_sign(self.amount);
        let posted_date_stamped = self.stamp_posted_date(now);
        self.canonicalize();
        self.updated_at = now;

        SaveNormalization {
            sign_corrected_from,
            posted_date_stamped,
        }
    }

    // -- Validation -------------------------------------------------------

    /// Check every field constraint, collecting all violations
    pub fn validate(&self) -> SpendwiseResult<()> {
        let mut errors = ValidationErrors::new();

        if self.amount.is_zero() {
            errors.push("amount", "must not be zero");
        } else if self.amount.abs() > AMOUNT_MAX {
            errors.push("amount", format!("must be at most {} in magnitude", AMOUNT_MAX));
        }

        if self.description.trim().is_empty() {
            errors.push("description", "is required");
        } else if self.description.chars().count() > DESCRIPTION_MAX {
            errors.push(
                "description",
                format!("must be at most {} characters", DESCRIPTION_MAX),
            );
        }

        self.category.validate(&mut errors);

        if let Some(merchant) = &self.merchant {
            merchant.validate(&mut errors);
        }

        if let Some(notes) = &self.notes {
            if notes.chars().count() > NOTES_MAX {
                errors.push("notes", format!("must be at most {} characters", NOTES_MAX));
            }
        }

        for tag in &self.tags {
            if normalize_tag(tag).as_deref() != Some(tag.as_str()) {
                errors.push("tags", format!("'{}' must be trimmed lowercase text", tag));
            }
        }

        for (i, attachment) in self.attachments.iter().enumerate() {
            attachment.validate(i, &mut errors);
        }

        self.recurring.validate(&mut errors);
        self.split.validate(&mut errors);
        if self.split.is_split && self.split.total_amount != self.amount {
            errors.push(
                "split.total_amount",
                format!("must equal the transaction amount {}", self.amount),
            );
        }

        if let Some(location) = &self.location {
            location.validate(&mut errors);
        }

        errors.into_result()
    }

    // -- Mutations --------------------------------------------------------

    /// Add a tag (lowercased); returns false if it was already present or blank
    pub fn add_tag(&mut self, tag: &str) -> bool {
        match normalize_tag(tag) {
            Some(tag) => self.tags.insert(tag),
            None => false,
        }
    }

    /// Remove a tag (case-insensitive); returns false if it was absent
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        match normalize_tag(tag) {
            Some(tag) => self.tags.remove(&tag),
            None => false,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        normalize_tag(tag).is_some_and(|t| self.tags.contains(&t))
    }

    pub fn set_status(&mut self, status: TransactionStatus) {
        self.status = status;
    }

    /// Mark as verified against an external statement
    pub fn mark_reconciled(&mut self, now: DateTime<Utc>) {
        self.is_reconciled = true;
        self.reconciliation_date = Some(now);
    }

    /// Make an unsaved copy of this transaction
    ///
    /// The copy gets a fresh identity, is dated `now`, starts pending, and
    /// drops attachments, notes, reconciliation state and the external ID.
    pub fn duplicate(&self, now: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::new(),
            external_id: None,
            date: now,
            posted_date: None,
            status: TransactionStatus::Pending,
            description: format!("{}{}", DUPLICATE_PREFIX, self.description),
            attachments: Vec::new(),
            notes: None,
            is_reconciled: false,
            reconciliation_date: None,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.date.format("%Y-%m-%d"),
            self.description,
            self.formatted_amount()
        )
    }
}
