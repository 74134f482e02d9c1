//! Transaction repository for JSON storage
//!
//! Holds every user's transactions in memory, indexed by owner, with a unique
//! sparse index on `external_id`. Persisted to `transactions.json`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{SpendwiseError, SpendwiseResult};
use crate::models::{Transaction, TransactionId, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::query::{AggregateQuery, DateOrder, GroupRow, TransactionQuery};

/// Serializable transaction data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TransactionData {
    transactions: Vec<Transaction>,
}

/// How to reverse one applied write
enum Undo {
    Inserted(TransactionId),
    Replaced(Transaction),
}

#[derive(Debug, Default)]
struct Indexed {
    data: HashMap<TransactionId, Transaction>,
    /// owner -> transaction ids
    by_owner: HashMap<UserId, Vec<TransactionId>>,
    /// external id -> transaction id (unique)
    by_external_id: HashMap<String, TransactionId>,
}

impl Indexed {
    fn index(&mut self, txn: &Transaction) {
        self.by_owner.entry(txn.owner).or_default().push(txn.id);
        if let Some(external_id) = &txn.external_id {
            self.by_external_id.insert(external_id.clone(), txn.id);
        }
    }

    fn unindex(&mut self, txn: &Transaction) {
        if let Some(ids) = self.by_owner.get_mut(&txn.owner) {
            ids.retain(|&id| id != txn.id);
        }
        if let Some(external_id) = &txn.external_id {
            if self.by_external_id.get(external_id) == Some(&txn.id) {
                self.by_external_id.remove(external_id);
            }
        }
    }

    /// Fail if `external_id` already belongs to a transaction other than `id`
    fn check_external_id(&self, txn: &Transaction) -> SpendwiseResult<()> {
        if let Some(external_id) = &txn.external_id {
            if let Some(existing) = self.by_external_id.get(external_id) {
                if *existing != txn.id {
                    return Err(SpendwiseError::duplicate_external_id(external_id.clone()));
                }
            }
        }
        Ok(())
    }

    /// Fails with `Duplicate` if the ID or external ID is already taken
    fn insert(&mut self, txn: Transaction) -> SpendwiseResult<()> {
        if self.data.contains_key(&txn.id) {
            return Err(SpendwiseError::Duplicate {
                entity_type: "Transaction",
                identifier: txn.id.to_string(),
            });
        }
        self.check_external_id(&txn)?;

        self.index(&txn);
        self.data.insert(txn.id, txn);
        Ok(())
    }

    /// Swap in a new version of a stored record, returning the old one
    fn replace(&mut self, txn: Transaction) -> SpendwiseResult<Transaction> {
        let previous = self
            .data
            .get(&txn.id)
            .cloned()
            .ok_or_else(|| SpendwiseError::transaction_not_found(txn.id.to_string()))?;
        self.check_external_id(&txn)?;

        self.unindex(&previous);
        self.index(&txn);
        self.data.insert(txn.id, txn);
        Ok(previous)
    }

    fn undo(&mut self, step: Undo) {
        match step {
            Undo::Inserted(id) => {
                if let Some(txn) = self.data.remove(&id) {
                    self.unindex(&txn);
                }
            }
            Undo::Replaced(previous) => {
                if let Some(current) = self.data.remove(&previous.id) {
                    self.unindex(&current);
                }
                self.index(&previous);
                self.data.insert(previous.id, previous);
            }
        }
    }

    /// Every record, newest first, in file layout
    fn snapshot(&self) -> TransactionData {
        let mut transactions: Vec<_> = self.data.values().cloned().collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        TransactionData { transactions }
    }

    fn owned_by(&self, owner: UserId) -> impl Iterator<Item = &Transaction> {
        self.by_owner
            .get(&owner)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|id| self.data.get(id))
    }
}

/// Repository for transaction persistence with indexing
pub struct TransactionRepository {
    path: PathBuf,
    inner: RwLock<Indexed>,
}

impl TransactionRepository {
    /// Create a new transaction repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            inner: RwLock::new(Indexed::default()),
        }
    }

    fn read(&self) -> SpendwiseResult<RwLockReadGuard<'_, Indexed>> {
        self.inner
            .read()
            .map_err(|e| SpendwiseError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> SpendwiseResult<RwLockWriteGuard<'_, Indexed>> {
        self.inner
            .write()
            .map_err(|e| SpendwiseError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Load transactions from disk and rebuild indexes
    ///
    /// A file holding two records with the same external ID is rejected
    /// rather than silently deduplicated.
    pub fn load(&self) -> SpendwiseResult<()> {
        let file_data: TransactionData = read_json(&self.path)?;

        let mut inner = self.write()?;
        *inner = Indexed::default();

        for txn in file_data.transactions {
            inner.check_external_id(&txn)?;
            inner.index(&txn);
            inner.data.insert(txn.id, txn);
        }

        Ok(())
    }

    /// Insert and replace records as one unit, then write them to disk
    ///
    /// If any record fails its ID or external ID check, or the file write
    /// fails, every change from this call is reverted in memory as well.
    pub fn commit(&self, inserts: Vec<Transaction>, updates: Vec<Transaction>) -> SpendwiseResult<()> {
        let mut inner = self.write()?;
        let mut applied = Vec::with_capacity(inserts.len() + updates.len());

        let result = apply_writes(&mut inner, inserts, updates, &mut applied)
            .and_then(|()| write_json_atomic(&self.path, &inner.snapshot()));

        if result.is_err() {
            for step in applied.into_iter().rev() {
                inner.undo(step);
            }
        }
        result
    }

    /// Get a transaction by ID, regardless of owner
    pub fn get(&self, id: TransactionId) -> SpendwiseResult<Option<Transaction>> {
        Ok(self.read()?.data.get(&id).cloned())
    }

    /// Find a transaction by its bank-sync external ID
    pub fn find_by_external_id(&self, external_id: &str) -> SpendwiseResult<Option<Transaction>> {
        let inner = self.read()?;
        Ok(inner
            .by_external_id
            .get(external_id)
            .and_then(|id| inner.data.get(id))
            .cloned())
    }

    /// Run a filter query
    pub fn find(&self, query: &TransactionQuery) -> SpendwiseResult<Vec<Transaction>> {
        let inner = self.read()?;

        let mut transactions: Vec<Transaction> = inner
            .owned_by(query.owner)
            .filter(|t| query.matches(t))
            .cloned()
            .collect();

        match query.order {
            DateOrder::NewestFirst => transactions.sort_by(|a, b| b.date.cmp(&a.date)),
            DateOrder::OldestFirst => transactions.sort_by(|a, b| a.date.cmp(&b.date)),
        }

        if let Some(limit) = query.limit {
            transactions.truncate(limit);
        }

        Ok(transactions)
    }

    /// Run a group-by aggregation
    pub fn aggregate(&self, query: &AggregateQuery) -> SpendwiseResult<Vec<GroupRow>> {
        let inner = self.read()?;
        Ok(query.evaluate(inner.owned_by(query.filter.owner)))
    }

    /// Count all transactions across owners
    pub fn count(&self) -> SpendwiseResult<usize> {
        Ok(self.read()?.data.len())
    }
}

fn apply_writes(
    inner: &mut Indexed,
    inserts: Vec<Transaction>,
    updates: Vec<Transaction>,
    applied: &mut Vec<Undo>,
) -> SpendwiseResult<()> {
    for txn in inserts {
        let id = txn.id;
        inner.insert(txn)?;
        applied.push(Undo::Inserted(id));
    }
    for txn in updates {
        let previous = inner.replace(txn)?;
        applied.push(Undo::Replaced(previous));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, Category, Money, TransactionType};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, TransactionRepository) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("transactions.json");
        let repo = TransactionRepository::new(path);
        (temp_dir, repo)
    }

    fn expense(owner: UserId, minor: i64, day: u32) -> Transaction {
        Transaction::new(
            owner,
            AccountId::new(),
            TransactionType::Expense,
            Money::from_minor(minor),
            Category::new("Food"),
            "Lunch",
        )
        .with_date(Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_empty_load() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_insert_and_get() {
        let (_temp_dir, repo) = create_test_repo();
        let txn = expense(UserId::new(), -5000, 15);
        let id = txn.id;

        repo.commit(vec![txn], Vec::new()).unwrap();

        let retrieved = repo.get(id).unwrap().unwrap();
        assert_eq!(retrieved.amount.minor(), -5000);
    }

    #[test]
    fn test_external_id_is_unique() {
        let (_temp_dir, repo) = create_test_repo();
        let owner = UserId::new();

        repo.commit(vec![expense(owner, -100, 1).with_external_id("bank-1")], Vec::new()).unwrap();
        let err = repo
            .commit(vec![expense(owner, -200, 2).with_external_id("bank-1")], Vec::new())
            .unwrap_err();

        assert!(err.is_duplicate());
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_records_without_external_id_do_not_clash() {
        let (_temp_dir, repo) = create_test_repo();
        let owner = UserId::new();

        repo.commit(vec![expense(owner, -100, 1)], Vec::new()).unwrap();
        repo.commit(vec![expense(owner, -200, 2)], Vec::new()).unwrap();
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn test_update_moves_external_id_index() {
        let (_temp_dir, repo) = create_test_repo();
        let mut txn = expense(UserId::new(), -100, 1).with_external_id("old");
        repo.commit(vec![txn.clone()], Vec::new()).unwrap();

        txn.external_id = Some("new".into());
        repo.commit(Vec::new(), vec![txn.clone()]).unwrap();

        assert!(repo.find_by_external_id("old").unwrap().is_none());
        assert_eq!(repo.find_by_external_id("new").unwrap().unwrap().id, txn.id);

        // The freed key is available again
        repo.commit(vec![expense(UserId::new(), -5, 2).with_external_id("old")], Vec::new()).unwrap();
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (_temp_dir, repo) = create_test_repo();
        let err = repo.commit(Vec::new(), vec![expense(UserId::new(), -100, 1)]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_find_is_owner_scoped_and_sorted() {
        let (_temp_dir, repo) = create_test_repo();
        let alice = UserId::new();
        let bob = UserId::new();

        repo.commit(vec![expense(alice, -100, 3)], Vec::new()).unwrap();
        repo.commit(vec![expense(alice, -200, 20)], Vec::new()).unwrap();
        repo.commit(vec![expense(bob, -300, 10)], Vec::new()).unwrap();

        let found = repo.find(&TransactionQuery::owned_by(alice)).unwrap();
        let amounts: Vec<i64> = found.iter().map(|t| t.amount.minor()).collect();
        assert_eq!(amounts, vec![-200, -100]);

        let oldest = repo
            .find(&TransactionQuery::owned_by(alice).order(DateOrder::OldestFirst).limit(1))
            .unwrap();
        assert_eq!(oldest[0].amount.minor(), -100);

        assert!(repo.find(&TransactionQuery::owned_by(UserId::new())).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let (temp_dir, repo) = create_test_repo();
        let owner = UserId::new();
        let txn = expense(owner, -5000, 15).with_external_id("bank-9");
        let id = txn.id;

        repo.commit(vec![txn], Vec::new()).unwrap();

        let repo2 = TransactionRepository::new(temp_dir.path().join("transactions.json"));
        repo2.load().unwrap();

        assert_eq!(repo2.count().unwrap(), 1);
        assert_eq!(repo2.get(id).unwrap().unwrap().amount.minor(), -5000);
        assert_eq!(repo2.find_by_external_id("bank-9").unwrap().unwrap().id, id);
        assert_eq!(repo2.find(&TransactionQuery::owned_by(owner)).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_write_reverts_commit() {
        let (temp_dir, repo) = create_test_repo();
        let owner = UserId::new();
        let mut kept = expense(owner, -100, 1).with_external_id("bank-1");
        repo.commit(vec![kept.clone()], Vec::new()).unwrap();

        // A directory in place of the data file makes the write fail
        let path = temp_dir.path().join("transactions.json");
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let ghost = expense(owner, -200, 2).with_external_id("bank-2");
        kept.description = "Edited".into();
        kept.external_id = Some("bank-3".into());
        assert!(repo.commit(vec![ghost.clone()], vec![kept.clone()]).is_err());

        assert!(repo.get(ghost.id).unwrap().is_none());
        assert!(repo.find_by_external_id("bank-2").unwrap().is_none());
        assert!(repo.find_by_external_id("bank-3").unwrap().is_none());
        let restored = repo.find_by_external_id("bank-1").unwrap().unwrap();
        assert_eq!(restored.description, "Lunch");

        std::fs::remove_dir(&path).unwrap();
        let real = expense(owner, -300, 3);
        repo.commit(vec![real.clone()], Vec::new()).unwrap();

        let reloaded = TransactionRepository::new(path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.count().unwrap(), 2);
        assert!(reloaded.get(ghost.id).unwrap().is_none());
        assert!(reloaded.get(real.id).unwrap().is_some());
    }

    #[test]
    fn test_commit_rejects_duplicate_within_batch() {
        let (_temp_dir, repo) = create_test_repo();
        let owner = UserId::new();
        let first = expense(owner, -100, 1).with_external_id("same");
        let second = expense(owner, -200, 2).with_external_id("same");

        let err = repo.commit(vec![first, second], Vec::new()).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(repo.count().unwrap(), 0);
        assert!(repo.find_by_external_id("same").unwrap().is_none());
    }
}
