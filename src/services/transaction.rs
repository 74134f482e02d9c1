//! Transaction service
//!
//! The transaction store: every write normalizes, validates and enforces
//! external ID uniqueness before persisting and auditing; every read is
//! scoped to one owner.

use chrono::{DateTime, Months, Utc};
use tracing::{debug, info, warn};

use crate::error::{SpendwiseError, SpendwiseResult};
use crate::models::{
    AccountId, Money, SaveNormalization, Transaction, TransactionId, TransactionStatus,
    TransactionType, UserId,
};
use crate::storage::{
    Aggregate, AggregateQuery, GroupKey, GroupSort, Storage, TransactionQuery,
};

/// Default row cap for `find_by_category`
pub const DEFAULT_CATEGORY_LIMIT: usize = 50;

/// Default lookback for `monthly_trends`
pub const DEFAULT_TREND_MONTHS: u32 = 12;

/// Service for transaction management
pub struct TransactionService<'a> {
    storage: &'a Storage,
}

/// Options for listing transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub account: Option<AccountId>,
    /// Primary category, exact match
    pub category: Option<String>,
    pub kind: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Archived and hidden records are left out unless this is set
    pub include_archived: bool,
    pub limit: Option<usize>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, account: AccountId) -> Self {
        self.account = Some(account);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn kind(mut self, kind: TransactionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn date_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn include_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn to_query(&self, owner: UserId) -> TransactionQuery {
        let mut query = TransactionQuery::owned_by(owner);
        query.account = self.account;
        query.category_primary = self.category.clone();
        query.kind = self.kind;
        query.status = self.status;
        query.from = self.start;
        query.to = self.end;
        query.limit = self.limit;
        if !self.include_archived {
            query = query.visible_only();
        }
        query
    }
}

/// Expense total for one primary category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySpending {
    pub category: String,
    /// Sum of absolute amounts
    pub total_amount: Money,
    pub count: usize,
}

/// Signed total for one (year, month, type) bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyTrend {
    pub year: i32,
    pub month: u32,
    pub kind: TransactionType,
    pub total: Money,
    pub count: usize,
}

/// Records written by `store_batch_at`, as saved
#[derive(Debug, Clone, Default)]
pub struct StoredBatch {
    pub created: Vec<Transaction>,
    pub updated: Vec<Transaction>,
}

impl<'a> TransactionService<'a> {
    /// Create a new transaction service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    // -- Write path -------------------------------------------------------

    /// Store a new transaction
    pub fn create(&self, txn: Transaction) -> SpendwiseResult<Transaction> {
        self.create_at(txn, Utc::now())
    }

    /// Store a new transaction, using `now` as the save time
    pub fn create_at(&self, txn: Transaction, now: DateTime<Utc>) -> SpendwiseResult<Transaction> {
        let txn = prepare(txn, now)?;

        self.storage.transactions.commit(vec![txn.clone()], Vec::new())?;
        self.storage.log_create(&txn)?;

        info!(transaction_id = %txn.id, owner = %txn.owner, amount = %txn.amount, "Transaction created");
        Ok(txn)
    }

    /// Persist changes to an existing transaction
    pub fn save(&self, txn: Transaction) -> SpendwiseResult<Transaction> {
        self.save_at(txn, Utc::now())
    }

    /// Persist changes to an existing transaction, using `now` as the save time
    ///
    /// The stored record must exist and belong to the same owner.
    pub fn save_at(&self, txn: Transaction, now: DateTime<Utc>) -> SpendwiseResult<Transaction> {
        let before = self.get(txn.owner, txn.id)?;
        let txn = prepare(txn, now)?;

        self.storage.transactions.commit(Vec::new(), vec![txn.clone()])?;
        self.storage.log_update(&before, &txn)?;

        debug!(transaction_id = %txn.id, "Transaction saved");
        Ok(txn)
    }

    /// Create and update several transactions in one write
    ///
    /// Every record is normalized and validated first. Either all of them
    /// are stored or, on any failure, none are.
    pub fn store_batch_at(
        &self,
        created: Vec<Transaction>,
        updated: Vec<Transaction>,
        now: DateTime<Utc>,
    ) -> SpendwiseResult<StoredBatch> {
        let created = created
            .into_iter()
            .map(|txn| prepare(txn, now))
            .collect::<SpendwiseResult<Vec<_>>>()?;

        let mut befores = Vec::with_capacity(updated.len());
        let mut prepared = Vec::with_capacity(updated.len());
        for txn in updated {
            befores.push(self.get(txn.owner, txn.id)?);
            prepared.push(prepare(txn, now)?);
        }

        self.storage
            .transactions
            .commit(created.clone(), prepared.clone())?;

        for txn in &created {
            self.storage.log_create(txn)?;
        }
        for (before, after) in befores.iter().zip(&prepared) {
            self.storage.log_update(before, after)?;
        }

        info!(created = created.len(), updated = prepared.len(), "Transaction batch stored");
        Ok(StoredBatch {
            created,
            updated: prepared,
        })
    }

    /// An unsaved copy of a stored transaction, dated now
    pub fn duplicate(&self, owner: UserId, id: TransactionId) -> SpendwiseResult<Transaction> {
        Ok(self.get(owner, id)?.duplicate(Utc::now()))
    }

    /// Mark a transaction as verified against a statement
    pub fn mark_reconciled(&self, owner: UserId, id: TransactionId) -> SpendwiseResult<Transaction> {
        let now = Utc::now();
        self.modify(owner, id, |txn| {
            txn.mark_reconciled(now);
            true
        })
    }

    /// Add a tag; a tag already present leaves the record untouched
    pub fn add_tag(&self, owner: UserId, id: TransactionId, tag: &str) -> SpendwiseResult<Transaction> {
        self.modify(owner, id, |txn| txn.add_tag(tag))
    }

    /// Remove a tag; an absent tag leaves the record untouched
    pub fn remove_tag(&self, owner: UserId, id: TransactionId, tag: &str) -> SpendwiseResult<Transaction> {
        self.modify(owner, id, |txn| txn.remove_tag(tag))
    }

    pub fn set_status(
        &self,
        owner: UserId,
        id: TransactionId,
        status: TransactionStatus,
    ) -> SpendwiseResult<Transaction> {
        self.modify(owner, id, |txn| {
            let changed = txn.status != status;
            txn.set_status(status);
            changed
        })
    }

    pub fn archive(&self, owner: UserId, id: TransactionId) -> SpendwiseResult<Transaction> {
        self.modify(owner, id, |txn| !std::mem::replace(&mut txn.is_archived, true))
    }

    pub fn unarchive(&self, owner: UserId, id: TransactionId) -> SpendwiseResult<Transaction> {
        self.modify(owner, id, |txn| std::mem::replace(&mut txn.is_archived, false))
    }

    pub fn hide(&self, owner: UserId, id: TransactionId) -> SpendwiseResult<Transaction> {
        self.modify(owner, id, |txn| !std::mem::replace(&mut txn.is_hidden, true))
    }

    pub fn unhide(&self, owner: UserId, id: TransactionId) -> SpendwiseResult<Transaction> {
        self.modify(owner, id, |txn| std::mem::replace(&mut txn.is_hidden, false))
    }

    /// Load, mutate and save; `change` returns whether anything changed
    fn modify<F>(&self, owner: UserId, id: TransactionId, change: F) -> SpendwiseResult<Transaction>
    where
        F: FnOnce(&mut Transaction) -> bool,
    {
        let mut txn = self.get(owner, id)?;
        if change(&mut txn) {
            self.save(txn)
        } else {
            Ok(txn)
        }
    }

    // -- Read path --------------------------------------------------------

    /// Owner-scoped lookup; another user's record is reported as not found
    pub fn get(&self, owner: UserId, id: TransactionId) -> SpendwiseResult<Transaction> {
        self.storage
            .transactions
            .get(id)?
            .filter(|txn| txn.owner == owner)
            .ok_or_else(|| SpendwiseError::transaction_not_found(id.to_string()))
    }

    /// Look up by full UUID or by the short `txn-xxxxxxxx` form
    ///
    /// A short form matching more than one record is rejected.
    pub fn find(&self, owner: UserId, identifier: &str) -> SpendwiseResult<Transaction> {
        let identifier = identifier.trim();
        if let Ok(id) = identifier.parse::<TransactionId>() {
            return self.get(owner, id);
        }

        let mut matches = self
            .storage
            .transactions
            .find(&TransactionQuery::owned_by(owner))?
            .into_iter()
            .filter(|txn| txn.id.matches_short(identifier));

        match (matches.next(), matches.next()) {
            (Some(txn), None) => Ok(txn),
            (Some(_), Some(_)) => Err(SpendwiseError::invalid(
                "id",
                format!("'{}' matches more than one transaction", identifier),
            )),
            _ => Err(SpendwiseError::transaction_not_found(identifier)),
        }
    }

    /// Transactions dated within `[start, end]`, newest first
    pub fn find_by_user_and_date_range(
        &self,
        owner: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SpendwiseResult<Vec<Transaction>> {
        self.storage
            .transactions
            .find(&TransactionQuery::owned_by(owner).between(start, end))
    }

    /// Up to 50 transactions in a primary category, newest first
    pub fn find_by_category(&self, owner: UserId, primary: &str) -> SpendwiseResult<Vec<Transaction>> {
        self.find_by_category_limited(owner, primary, DEFAULT_CATEGORY_LIMIT)
    }

    pub fn find_by_category_limited(
        &self,
        owner: UserId,
        primary: &str,
        limit: usize,
    ) -> SpendwiseResult<Vec<Transaction>> {
        self.storage
            .transactions
            .find(&TransactionQuery::owned_by(owner).category(primary).limit(limit))
    }

    pub fn find_by_account(&self, owner: UserId, account: AccountId) -> SpendwiseResult<Vec<Transaction>> {
        self.storage
            .transactions
            .find(&TransactionQuery::owned_by(owner).account(account))
    }

    /// List transactions with optional filtering, newest first
    pub fn list(&self, owner: UserId, filter: &TransactionFilter) -> SpendwiseResult<Vec<Transaction>> {
        self.storage.transactions.find(&filter.to_query(owner))
    }

    // -- Analytics --------------------------------------------------------

    /// Expense totals per primary category within `[start, end]`
    ///
    /// Largest total first; equal totals are ordered by category name.
    pub fn spending_by_category(
        &self,
        owner: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SpendwiseResult<Vec<CategorySpending>> {
        let query = AggregateQuery {
            filter: TransactionQuery::owned_by(owner)
                .kind(TransactionType::Expense)
                .between(start, end),
            group_by: vec![GroupKey::PrimaryCategory],
            aggregate: Aggregate::SumAbsolute,
            sort: GroupSort::TotalDescending,
        };

        Ok(self
            .storage
            .transactions
            .aggregate(&query)?
            .into_iter()
            .filter_map(|row| {
                Some(CategorySpending {
                    category: row.category()?.to_string(),
                    total_amount: row.total,
                    count: row.count,
                })
            })
            .collect())
    }

    /// Signed totals per (year, month, type) over the last `months` months
    ///
    /// Chronological; within a month, income then expense then transfer.
    pub fn monthly_trends(
        &self,
        owner: UserId,
        months: u32,
        now: DateTime<Utc>,
    ) -> SpendwiseResult<Vec<MonthlyTrend>> {
        let since = now
            .checked_sub_months(Months::new(months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let query = AggregateQuery {
            filter: TransactionQuery::owned_by(owner).since(since),
            group_by: vec![GroupKey::Year, GroupKey::Month, GroupKey::Type],
            aggregate: Aggregate::SumSigned,
            sort: GroupSort::KeysAscending,
        };

        Ok(self
            .storage
            .transactions
            .aggregate(&query)?
            .into_iter()
            .filter_map(|row| {
                Some(MonthlyTrend {
                    year: row.year()?,
                    month: row.month()?,
                    kind: row.kind()?,
                    total: row.total,
                    count: row.count,
                })
            })
            .collect())
    }

    /// Total number of stored transactions across all owners
    pub fn count(&self) -> SpendwiseResult<usize> {
        self.storage.transactions.count()
    }
}

/// Apply the pre-save rules and check the result
fn prepare(mut txn: Transaction, now: DateTime<Utc>) -> SpendwiseResult<Transaction> {
    let normalization = txn.prepare_for_save(now);
    report_normalization(&txn, normalization);
    txn.validate()?;
    Ok(txn)
}

fn report_normalization(txn: &Transaction, normalization: SaveNormalization) {
    if let Some(original) = normalization.sign_corrected_from {
        warn!(
            transaction_id = %txn.id,
            kind = %txn.kind,
            original = %original,
            corrected = %txn.amount,
            "Amount sign did not match transaction type and was corrected"
        );
    }
    if normalization.posted_date_stamped {
        debug!(transaction_id = %txn.id, "Posted date stamped");
    }
}
