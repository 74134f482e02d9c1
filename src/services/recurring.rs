//! Recurring transaction generation
//!
//! A transaction with `recurring.is_recurring` set is a template. Running
//! the generator books one occurrence per due date up to a cutoff and moves
//! the template's schedule forward.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::SpendwiseResult;
use crate::models::{Recurrence, Transaction, TransactionId, TransactionStatus, UserId};
use crate::services::TransactionService;
use crate::storage::{Storage, TransactionQuery};

/// Outcome of one generator run
#[derive(Debug, Clone, Default)]
pub struct RecurringRun {
    /// Occurrences created, in template then date order
    pub generated: Vec<Transaction>,
    /// Templates whose schedule moved forward
    pub templates_advanced: usize,
    /// Templates switched off because their schedule ended
    pub templates_finished: usize,
}

/// Service for recurring transaction templates
pub struct RecurringService<'a> {
    storage: &'a Storage,
}

impl<'a> RecurringService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Active, non-archived templates of `owner`
    pub fn templates(&self, owner: UserId) -> SpendwiseResult<Vec<Transaction>> {
        let mut templates: Vec<Transaction> = self
            .storage
            .transactions
            .find(&TransactionQuery::owned_by(owner))?
            .into_iter()
            .filter(|t| t.is_recurring_template() && !t.is_archived)
            .collect();
        templates.sort_by_key(|t| t.recurring.next_due_date);
        Ok(templates)
    }

    /// Occurrences previously generated from `template`
    pub fn occurrences_of(&self, owner: UserId, template: TransactionId) -> SpendwiseResult<Vec<Transaction>> {
        Ok(self
            .storage
            .transactions
            .find(&TransactionQuery::owned_by(owner))?
            .into_iter()
            .filter(|t| t.recurring.original_transaction == Some(template))
            .collect())
    }

    /// Book every occurrence due on or before `as_of`
    pub fn generate_due(&self, owner: UserId, as_of: DateTime<Utc>) -> SpendwiseResult<RecurringRun> {
        let txn_service = TransactionService::new(self.storage);
        let mut run = RecurringRun::default();

        for mut template in self.templates(owner)? {
            let (due_dates, next_due) = template.recurring.due_through(as_of);
            if due_dates.is_empty() {
                continue;
            }

            let occurrences = due_dates.iter().map(|due| occurrence_of(&template, *due)).collect();

            template.recurring.next_due_date = next_due;
            let finished = next_due.map_or(true, |next| template.recurring.is_past_end(next));
            if finished {
                template.recurring.is_recurring = false;
                run.templates_finished += 1;
            }
            run.templates_advanced += 1;

            info!(
                template_id = %template.id,
                occurrences = due_dates.len(),
                finished,
                "Recurring template advanced"
            );
            // Occurrences and the advanced template land in one write
            let stored = txn_service.store_batch_at(occurrences, vec![template], Utc::now())?;
            run.generated.extend(stored.created);
        }

        Ok(run)
    }
}

/// A fresh pending copy of `template` dated `due`
fn occurrence_of(template: &Transaction, due: DateTime<Utc>) -> Transaction {
    let now = Utc::now();
    Transaction {
        id: TransactionId::new(),
        external_id: None,
        date: due,
        posted_date: None,
        status: TransactionStatus::Pending,
        attachments: Vec::new(),
        recurring: Recurrence::occurrence_of(template.id),
        is_reconciled: false,
        reconciliation_date: None,
        created_at: now,
        updated_at: now,
        ..template.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::SpendwisePaths;
    use crate::models::{AccountId, Category, Frequency, Money, TransactionType};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = SpendwisePaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        (temp_dir, storage)
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    fn rent_template(owner: UserId, schedule: Recurrence) -> Transaction {
        Transaction::new(
            owner,
            AccountId::new(),
            TransactionType::Expense,
            Money::from_minor(-150000),
            Category::new("Housing"),
            "Rent",
        )
        .with_date(at(2025, 1, 1))
        .with_recurrence(schedule)
    }

    #[test]
    fn test_generates_each_due_occurrence() {
        let (_temp_dir, storage) = create_test_storage();
        let txn_service = TransactionService::new(&storage);
        let service = RecurringService::new(&storage);
        let owner = UserId::new();

        let template = txn_service
            .create(rent_template(owner, Recurrence::every(Frequency::Monthly, 1, at(2025, 1, 31))))
            .unwrap();

        let run = service.generate_due(owner, at(2025, 3, 31)).unwrap();

        let dates: Vec<_> = run.generated.iter().map(|t| t.date).collect();
        assert_eq!(dates, vec![at(2025, 1, 31), at(2025, 2, 28), at(2025, 3, 28)]);
        assert!(run
            .generated
            .iter()
            .all(|t| t.recurring.original_transaction == Some(template.id) && !t.recurring.is_recurring));
        assert_eq!(run.generated[0].description, "Rent");
        assert_eq!(run.generated[0].amount.minor(), -150000);

        let advanced = txn_service.get(owner, template.id).unwrap();
        assert_eq!(advanced.recurring.next_due_date, Some(at(2025, 4, 28)));
        assert!(advanced.recurring.is_recurring);

        assert_eq!(service.occurrences_of(owner, template.id).unwrap().len(), 3);
    }

    #[test]
    fn test_second_run_generates_nothing_new() {
        let (_temp_dir, storage) = create_test_storage();
        let txn_service = TransactionService::new(&storage);
        let service = RecurringService::new(&storage);
        let owner = UserId::new();

        txn_service
            .create(rent_template(owner, Recurrence::every(Frequency::Weekly, 1, at(2025, 1, 6))))
            .unwrap();

        assert_eq!(service.generate_due(owner, at(2025, 1, 20)).unwrap().generated.len(), 3);
        assert!(service.generate_due(owner, at(2025, 1, 20)).unwrap().generated.is_empty());
    }

    #[test]
    fn test_template_finishes_at_end_date() {
        let (_temp_dir, storage) = create_test_storage();
        let txn_service = TransactionService::new(&storage);
        let service = RecurringService::new(&storage);
        let owner = UserId::new();

        let schedule = Recurrence::every(Frequency::Monthly, 1, at(2025, 1, 1)).until(at(2025, 2, 15));
        let template = txn_service.create(rent_template(owner, schedule)).unwrap();

        let run = service.generate_due(owner, at(2025, 12, 31)).unwrap();

        assert_eq!(run.generated.len(), 2);
        assert_eq!(run.templates_finished, 1);
        assert!(!txn_service.get(owner, template.id).unwrap().recurring.is_recurring);
        assert!(service.templates(owner).unwrap().is_empty());
    }

    #[test]
    fn test_archived_templates_are_skipped() {
        let (_temp_dir, storage) = create_test_storage();
        let txn_service = TransactionService::new(&storage);
        let service = RecurringService::new(&storage);
        let owner = UserId::new();

        let template = txn_service
            .create(rent_template(owner, Recurrence::every(Frequency::Daily, 1, at(2025, 1, 1))))
            .unwrap();
        txn_service.archive(owner, template.id).unwrap();

        let run = service.generate_due(owner, at(2025, 1, 5)).unwrap();
        assert!(run.generated.is_empty());
    }

    #[test]
    fn test_other_owners_templates_untouched() {
        let (_temp_dir, storage) = create_test_storage();
        let txn_service = TransactionService::new(&storage);
        let service = RecurringService::new(&storage);

        txn_service
            .create(rent_template(UserId::new(), Recurrence::every(Frequency::Daily, 1, at(2025, 1, 1))))
            .unwrap();

        let run = service.generate_due(UserId::new(), at(2025, 1, 5)).unwrap();
        assert!(run.generated.is_empty());
        assert_eq!(txn_service.count().unwrap(), 1);
    }

    #[test]
    fn test_failed_write_leaves_schedule_untouched() {
        let (_temp_dir, storage) = create_test_storage();
        let txn_service = TransactionService::new(&storage);
        let service = RecurringService::new(&storage);
        let owner = UserId::new();

        let template = txn_service
            .create(rent_template(owner, Recurrence::every(Frequency::Weekly, 1, at(2025, 1, 6))))
            .unwrap();

        let data_file = storage.paths().transactions_file();
        std::fs::remove_file(&data_file).unwrap();
        std::fs::create_dir(&data_file).unwrap();
        assert!(service.generate_due(owner, at(2025, 1, 20)).is_err());

        assert_eq!(txn_service.count().unwrap(), 1);
        let unchanged = txn_service.get(owner, template.id).unwrap();
        assert_eq!(unchanged.recurring.next_due_date, Some(at(2025, 1, 6)));

        std::fs::remove_dir(&data_file).unwrap();
        let run = service.generate_due(owner, at(2025, 1, 20)).unwrap();
        assert_eq!(run.generated.len(), 3);
        assert_eq!(service.occurrences_of(owner, template.id).unwrap().len(), 3);
    }
}
