//! Configuration for Spendwise
//!
//! Resolves where data lives on disk and persists user preferences.

pub mod paths;
pub mod settings;

pub use paths::SpendwisePaths;
pub use settings::Settings;
