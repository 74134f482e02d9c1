//! Split-transaction bookkeeping
//!
//! A split apportions a transaction's total across several users. Shares are
//! stored in minor units so they always add back up to the total exactly;
//! percentages are informational.

use serde::{Deserialize, Serialize};

use super::ids::UserId;
use super::money::Money;
use crate::error::ValidationErrors;

/// Slack allowed when summing rounded percentages
const PERCENTAGE_TOLERANCE: f64 = 0.01;

/// One user's portion of a split transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitShare {
    pub user: UserId,

    pub amount: Money,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,

    #[serde(default)]
    pub description: String,
}

impl SplitShare {
    pub fn new(user: UserId, amount: Money) -> Self {
        Self {
            user,
            amount,
            percentage: None,
            description: String::new(),
        }
    }
}

/// Split settings carried on every transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitInfo {
    #[serde(default)]
    pub is_split: bool,

    #[serde(default)]
    pub total_amount: Money,

    #[serde(default)]
    pub splits: Vec<SplitShare>,
}

impl SplitInfo {
    /// Split `total` evenly across `users`
    ///
    /// Leftover minor units go one each to the first shares, so the shares
    /// always sum to `total`. An empty user list yields an unsplit record.
    pub fn even(total: Money, users: &[UserId]) -> Self {
        if users.is_empty() {
            return Self::default();
        }

        let count = users.len() as i64;
        let base = total.minor() / count;
        let remainder = total.minor() % count;
        let step = remainder.signum();

        let splits = users
            .iter()
            .enumerate()
            .map(|(i, user)| {
                let extra = if (i as i64) < remainder.abs() { step } else { 0 };
                let amount = Money::from_minor(base + extra);
                let mut share = SplitShare::new(*user, amount);
                share.percentage = percentage_of(amount, total);
                share
            })
            .collect();

        Self {
            is_split: true,
            total_amount: total,
            splits,
        }
    }

    /// Sum of all share amounts
    pub fn allocated(&self) -> Money {
        self.splits.iter().map(|s| s.amount).sum()
    }

    /// Portion of the total not yet assigned to any share
    pub fn unallocated(&self) -> Money {
        self.total_amount - self.allocated()
    }

    /// The share belonging to `user`, if any
    pub fn share_for(&self, user: UserId) -> Option<&SplitShare> {
        self.splits.iter().find(|s| s.user == user)
    }

    /// Flip the total and every share when their sign disagrees with `amount`
    pub(crate) fn align_sign(&mut self, amount: Money) {
        if !self.is_split || self.total_amount.is_negative() == amount.is_negative() {
            return;
        }
        self.total_amount = -self.total_amount;
        for share in &mut self.splits {
            share.amount = -share.amount;
        }
    }

    pub(crate) fn validate(&self, errors: &mut ValidationErrors) {
        if !self.is_split {
            return;
        }

        if self.splits.is_empty() {
            errors.push("split.splits", "a split transaction needs at least one share");
            return;
        }

        if !self.unallocated().is_zero() {
            errors.push(
                "split.splits",
                format!(
                    "shares add up to {} but the total is {}",
                    self.allocated(),
                    self.total_amount
                ),
            );
        }

        let mut percentage_total = 0.0;
        for (i, share) in self.splits.iter().enumerate() {
            if let Some(pct) = share.percentage {
                if !(0.0..=100.0).contains(&pct) {
                    errors.push(
                        format!("split.splits[{}].percentage", i),
                        "must be between 0 and 100",
                    );
                }
                percentage_total += pct;
            }
        }
        if percentage_total > 100.0 + PERCENTAGE_TOLERANCE {
            errors.push("split.splits", "percentages add up to more than 100");
        }
    }
}

/// `part / total` as a percentage rounded to two decimals
fn percentage_of(part: Money, total: Money) -> Option<f64> {
    if total.is_zero() {
        return None;
    }
    let raw = part.minor() as f64 / total.minor() as f64 * 100.0;
    Some((raw * 100.0).round() / 100.0)
}
