//! Supported currencies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ISO 4217 currencies a transaction may be recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
    Jpy,
    Chf,
}

impl Currency {
    pub const ALL: [Currency; 7] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Cad,
        Currency::Aud,
        Currency::Jpy,
        Currency::Chf,
    ];

    /// Three-letter ISO code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Cad => "CAD",
            Self::Aud => "AUD",
            Self::Jpy => "JPY",
            Self::Chf => "CHF",
        }
    }

    /// Decimal places of the minor unit: yen has none, the rest use cents
    pub fn minor_digits(&self) -> u32 {
        match self {
            Self::Jpy => 0,
            _ => 2,
        }
    }

    /// Display symbol used when formatting amounts
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Usd => "$",
            Self::Eur => "€",
            Self::Gbp => "£",
            Self::Cad => "CA$",
            Self::Aud => "A$",
            Self::Jpy => "¥",
            Self::Chf => "CHF ",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.code() == upper)
            .ok_or_else(|| format!("Unsupported currency: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_usd() {
        assert_eq!(Currency::default(), Currency::Usd);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("eur".parse::<Currency>().unwrap(), Currency::Eur);
        assert_eq!(" CHF ".parse::<Currency>().unwrap(), Currency::Chf);
        assert!("XYZ".parse::<Currency>().is_err());
    }

    #[test]
    fn test_minor_digits() {
        assert_eq!(Currency::Jpy.minor_digits(), 0);
        assert_eq!(Currency::Usd.minor_digits(), 2);
        assert_eq!(Currency::Chf.minor_digits(), 2);
    }

    #[test]
    fn test_serde_uses_iso_codes() {
        assert_eq!(serde_json::to_string(&Currency::Gbp).unwrap(), "\"GBP\"");
        let parsed: Currency = serde_json::from_str("\"JPY\"").unwrap();
        assert_eq!(parsed, Currency::Jpy);
        assert!(serde_json::from_str::<Currency>("\"BTC\"").is_err());
    }
}
