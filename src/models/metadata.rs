//! Descriptive sub-records of a transaction: merchant, location, attachments
//!
//! Attachments are metadata only. Where the bytes live is the concern of
//! whatever upload service produced the URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;

pub const MERCHANT_NAME_MAX: usize = 100;

/// Merchant details, usually supplied by the bank-aggregation source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl Merchant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            website: None,
            logo: None,
        }
    }

    pub(crate) fn validate(&self, errors: &mut ValidationErrors) {
        if self.name.chars().count() > MERCHANT_NAME_MAX {
            errors.push(
                "merchant.name",
                format!("must be at most {} characters", MERCHANT_NAME_MAX),
            );
        }
    }
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Where a transaction took place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl Location {
    pub(crate) fn validate(&self, errors: &mut ValidationErrors) {
        if let Some(coords) = self.coordinates {
            if !(-90.0..=90.0).contains(&coords.lat) {
                errors.push("location.coordinates.lat", "must be between -90 and 90");
            }
            if !(-180.0..=180.0).contains(&coords.lng) {
                errors.push("location.coordinates.lng", "must be between -180 and 180");
            }
        }
    }
}

/// A receipt or document attached to a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Stored file name
    pub filename: String,
    /// Name of the file as uploaded
    pub original_name: String,
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Attachment {
    pub(crate) fn validate(&self, index: usize, errors: &mut ValidationErrors) {
        if self.filename.trim().is_empty() {
            errors.push(format!("attachments[{}].filename", index), "is required");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merchant_name_limit() {
        let mut errors = ValidationErrors::new();
        Merchant::new("m".repeat(100)).validate(&mut errors);
        assert!(errors.is_empty());

        Merchant::new("m".repeat(101)).validate(&mut errors);
        assert!(errors.has_field("merchant.name"));
    }

    #[test]
    fn test_coordinates_range() {
        let location = Location {
            coordinates: Some(Coordinates {
                lat: 91.0,
                lng: -181.0,
            }),
            ..Location::default()
        };

        let mut errors = ValidationErrors::new();
        location.validate(&mut errors);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_attachment_requires_filename() {
        let attachment = Attachment {
            filename: " ".into(),
            original_name: "receipt.pdf".into(),
            mime_type: "application/pdf".into(),
            size: 2048,
            url: "https://files.example.com/r/1".into(),
            uploaded_at: Utc::now(),
        };

        let mut errors = ValidationErrors::new();
        attachment.validate(3, &mut errors);
        assert!(errors.has_field("attachments[3].filename"));
    }
}
