//! Transaction categorization
//!
//! Categories are free-form two-level labels ("Food > Groceries") rather than
//! references to a category table. The optional external ID carries the
//! aggregator's own category code for bank-imported records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationErrors;

/// Two-level category label attached to every transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    /// Top-level category (e.g., "Food"); required
    pub primary: String,

    /// Optional sub-category (e.g., "Groceries")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,

    /// Category code assigned by the bank-aggregation source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_category_id: Option<String>,
}

impl Category {
    /// Create a category with only a primary label
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: None,
            external_category_id: None,
        }
    }

    /// Create a category with primary and secondary labels
    pub fn with_secondary(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: Some(secondary.into()),
            external_category_id: None,
        }
    }

    /// Parse "Primary > Secondary" (or just "Primary")
    pub fn parse(s: &str) -> Self {
        match s.split_once('>') {
            Some((primary, secondary)) if !secondary.trim().is_empty() => {
                Self::with_secondary(primary.trim(), secondary.trim())
            }
            Some((primary, _)) => Self::new(primary.trim()),
            None => Self::new(s.trim()),
        }
    }

    /// "primary > secondary", or just the primary label
    pub fn display(&self) -> String {
        match self.secondary.as_deref().map(str::trim) {
            Some(secondary) if !secondary.is_empty() => {
                format!("{} > {}", self.primary, secondary)
            }
            _ => self.primary.clone(),
        }
    }

    pub(crate) fn validate(&self, errors: &mut ValidationErrors) {
        if self.primary.trim().is_empty() {
            errors.push("category.primary", "is required");
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_secondary() {
        let category = Category::with_secondary("Food", "Groceries");
        assert_eq!(category.display(), "Food > Groceries");
    }

    #[test]
    fn test_display_primary_only() {
        assert_eq!(Category::new("Salary").display(), "Salary");

        let mut blank_secondary = Category::new("Rent");
        blank_secondary.secondary = Some("  ".into());
        assert_eq!(blank_secondary.display(), "Rent");
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            Category::parse("Food > Dining Out"),
            Category::with_secondary("Food", "Dining Out")
        );
        assert_eq!(Category::parse(" Travel "), Category::new("Travel"));
        assert_eq!(Category::parse("Travel >"), Category::new("Travel"));
    }

    #[test]
    fn test_blank_primary_is_invalid() {
        let mut errors = ValidationErrors::new();
        Category::new("   ").validate(&mut errors);
        assert!(errors.has_field("category.primary"));
    }
}
