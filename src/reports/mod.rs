//! Reports module for Spendwise
//!
//! Spending by category and monthly trends, each with terminal and CSV
//! rendering.

pub mod spending;
pub mod trends;

pub use spending::{CategoryLine, SpendingReport};
pub use trends::{MonthSummary, TrendsReport};
