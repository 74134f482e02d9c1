//! Storage-agnostic query descriptions
//!
//! Filters and group-by aggregations are plain values so the service layer
//! never depends on how a backend evaluates them. The JSON repository
//! evaluates them in memory; a database backend would translate them into
//! its own grouping pipeline.

use chrono::{DateTime, Datelike, Utc};

use crate::models::{AccountId, Money, Transaction, TransactionStatus, TransactionType, UserId};

/// Ordering by transaction date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Filter over one owner's transactions
///
/// Owner is mandatory: every query is tenant-scoped.
#[derive(Debug, Clone)]
pub struct TransactionQuery {
    pub owner: UserId,
    pub account: Option<AccountId>,
    /// Exact, case-sensitive match on `category.primary`
    pub category_primary: Option<String>,
    pub kind: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    /// Inclusive lower bound on `date`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `date`
    pub to: Option<DateTime<Utc>>,
    pub include_archived: bool,
    pub include_hidden: bool,
    pub order: DateOrder,
    pub limit: Option<usize>,
}

impl TransactionQuery {
    /// Every transaction of `owner`, archived and hidden included, newest first
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner,
            account: None,
            category_primary: None,
            kind: None,
            status: None,
            from: None,
            to: None,
            include_archived: true,
            include_hidden: true,
            order: DateOrder::NewestFirst,
            limit: None,
        }
    }

    pub fn account(mut self, account: AccountId) -> Self {
        self.account = Some(account);
        self
    }

    pub fn category(mut self, primary: impl Into<String>) -> Self {
        self.category_primary = Some(primary.into());
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

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Leave out archived and hidden records
    pub fn visible_only(mut self) -> Self {
        self.include_archived = false;
        self.include_hidden = false;
        self
    }

    pub fn order(mut self, order: DateOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a single record satisfies this filter (ignores order and limit)
    pub fn matches(&self, txn: &Transaction) -> bool {
        txn.owner == self.owner
            && self.account.map_or(true, |a| txn.account == a)
            && self
                .category_primary
                .as_deref()
                .map_or(true, |c| txn.category.primary == c)
            && self.kind.map_or(true, |k| txn.kind == k)
            && self.status.map_or(true, |s| txn.status == s)
            && self.from.map_or(true, |from| txn.date >= from)
            && self.to.map_or(true, |to| txn.date <= to)
            && (self.include_archived || !txn.is_archived)
            && (self.include_hidden || !txn.is_hidden)
    }
}

/// A dimension to group by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    PrimaryCategory,
    Year,
    Month,
    Type,
}

impl GroupKey {
    fn extract(&self, txn: &Transaction) -> GroupValue {
        match self {
            Self::PrimaryCategory => GroupValue::Category(txn.category.primary.clone()),
            Self::Year => GroupValue::Year(txn.date.year()),
            Self::Month => GroupValue::Month(txn.date.month()),
            Self::Type => GroupValue::Type(txn.kind),
        }
    }
}

/// The value of one group key for one group
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupValue {
    Category(String),
    Year(i32),
    Month(u32),
    Type(TransactionType),
}

/// How amounts are folded within a group (a count is always produced)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Sum of absolute amounts
    SumAbsolute,
    /// Sum of signed amounts
    SumSigned,
}

impl Aggregate {
    fn contribution(&self, amount: Money) -> Money {
        match self {
            Self::SumAbsolute => amount.abs(),
            Self::SumSigned => amount,
        }
    }
}

/// Ordering of aggregated rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSort {
    /// Largest total first; ties by keys ascending
    TotalDescending,
    /// Keys ascending in group-key order
    KeysAscending,
}

/// A group-by aggregation over a filtered set of transactions
#[derive(Debug, Clone)]
pub struct AggregateQuery {
    pub filter: TransactionQuery,
    pub group_by: Vec<GroupKey>,
    pub aggregate: Aggregate,
    pub sort: GroupSort,
}

/// One output row of an aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    /// One value per entry of `group_by`, in the same order
    pub keys: Vec<GroupValue>,
    pub total: Money,
    pub count: usize,
}

impl GroupRow {
    pub fn category(&self) -> Option<&str> {
        self.keys.iter().find_map(|k| match k {
            GroupValue::Category(c) => Some(c.as_str()),
            _ => None,
        })
    }

    pub fn year(&self) -> Option<i32> {
        self.keys.iter().find_map(|k| match k {
            GroupValue::Year(y) => Some(*y),
            _ => None,
        })
    }

    pub fn month(&self) -> Option<u32> {
        self.keys.iter().find_map(|k| match k {
            GroupValue::Month(m) => Some(*m),
            _ => None,
        })
    }

    pub fn kind(&self) -> Option<TransactionType> {
        self.keys.iter().find_map(|k| match k {
            GroupValue::Type(t) => Some(*t),
            _ => None,
        })
    }
}

impl AggregateQuery {
    /// Fold matching records into grouped, sorted rows
    ///
    /// Shared evaluation for in-memory backends. `records` may contain other
    /// owners' data; the filter is applied here.
    pub fn evaluate<'a, I>(&self, records: I) -> Vec<GroupRow>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut groups: std::collections::BTreeMap<Vec<GroupValue>, (Money, usize)> =
            std::collections::BTreeMap::new();

        for txn in records.into_iter().filter(|t| self.filter.matches(t)) {
            let keys: Vec<GroupValue> = self.group_by.iter().map(|k| k.extract(txn)).collect();
            let entry = groups.entry(keys).or_insert((Money::zero(), 0));
            entry.0 += self.aggregate.contribution(txn.amount);
            entry.1 += 1;
        }

        // BTreeMap iteration already yields keys ascending
        let mut rows: Vec<GroupRow> = groups
            .into_iter()
            .map(|(keys, (total, count))| GroupRow { keys, total, count })
            .collect();

        if self.sort == GroupSort::TotalDescending {
            rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.keys.cmp(&b.keys)));
        }

        rows
    }
}
