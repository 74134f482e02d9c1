//! Strongly-typed identity wrappers
//!
//! Users and accounts are owned by collaborators outside this crate and are
//! referenced by identity only; transactions are the one entity stored here.
//! Newtypes keep an owner ID from ever being passed where an account ID is
//! expected.
//!
//! IDs print in a short form (`txn-1a2b3c4d`) for terminal output. Parsing
//! needs the full UUID; resolving a short form to a record is a lookup, see
//! [`TransactionId::matches_short`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Hex digits shown in the short form
const SHORT_LEN: usize = 8;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Prefix used by the short display form
            pub const PREFIX: &'static str = $prefix;

            /// A new random (v4) ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// The first hex digits of the UUID
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..SHORT_LEN].to_string()
            }

            /// Whether `input` is a leading fragment of this ID
            ///
            /// Accepts the display prefix, hyphens and any letter case, so
            /// `txn-1A2B`, `1a2b3c4d` and `1a2b3c4d-5e6f` all match the same
            /// ID. An empty fragment matches nothing.
            pub fn matches_short(&self, input: &str) -> bool {
                let input = input.trim();
                let input = input.strip_prefix($prefix).unwrap_or(input);
                let fragment: String = input
                    .chars()
                    .filter(|c| *c != '-')
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                !fragment.is_empty() && self.0.simple().to_string().starts_with(&fragment)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.short())
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            /// Parse a full UUID, with or without the display prefix
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                let s = s.strip_prefix($prefix).unwrap_or(s);
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// The user a transaction belongs to
    UserId,
    "usr-"
);
define_id!(
    /// An account owned by the account-management collaborator
    AccountId,
    "acc-"
);
define_id!(TransactionId, "txn-");
