//! Core data models for Spendwise
//!
//! The transaction record and the value types it is built from: identities,
//! money, currency, category labels, recurrence schedules, split shares and
//! descriptive metadata.

pub mod category;
pub mod currency;
pub mod ids;
pub mod metadata;
pub mod money;
pub mod period;
pub mod recurrence;
pub mod split;
pub mod transaction;

pub use category::Category;
pub use currency::Currency;
pub use ids::{AccountId, TransactionId, UserId};
pub use metadata::{Attachment, Coordinates, Location, Merchant};
pub use money::Money;
pub use period::ReportPeriod;
pub use recurrence::{Frequency, Recurrence};
pub use split::{SplitInfo, SplitShare};
pub use transaction::{SaveNormalization, Transaction, TransactionStatus, TransactionType};
