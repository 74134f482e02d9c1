//! Money type for representing signed currency amounts
//!
//! Amounts are stored as an i64 count of minor units (cents, pence, ...) to
//! avoid floating-point drift in sums. The currency lives alongside the amount
//! on the owning record; `Money` only knows how to print itself given one.
//! How many minor units make a major unit depends on that currency (100
//! cents to the dollar, 1 to the yen), see [`Currency::minor_digits`].
//!
//! Arithmetic saturates at the `i64` bounds instead of wrapping or
//! panicking. Stored amounts are capped well below that by transaction
//! validation, so saturation only guards totals over absurd inputs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use super::currency::Currency;

/// A signed amount in the currency's minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a Money amount from minor units
    ///
    /// # Examples
    /// ```
    /// use spendwise::models::Money;
    /// let amount = Money::from_minor(1050); // 10.50
    /// assert_eq!(amount.to_string(), "10.50");
    /// ```
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in minor units
    pub const fn minor(&self) -> i64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Magnitude; `i64::MIN` saturates to `i64::MAX`
    pub const fn abs(&self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Same magnitude, negative sign
    pub const fn negative(&self) -> Self {
        if self.0 < 0 {
            *self
        } else {
            Self(-self.0)
        }
    }

    /// Parse an amount with two decimal places
    ///
    /// Accepts formats: "10.50", "-10.50", "+10.50", "$10.50", "-€1,234.5", "10"
    pub fn parse(s: &str) -> Result<Self, MoneyParseError> {
        parse_scaled(s, 2)
    }

    /// Parse an amount written in `currency`'s major units
    ///
    /// `"1000"` is 100000 minor units in dollars but 1000 in yen.
    pub fn parse_in(s: &str, currency: Currency) -> Result<Self, MoneyParseError> {
        parse_scaled(s, currency.minor_digits())
    }

    /// Unsigned decimal text with `places` fractional digits
    fn magnitude_text(&self, places: u32) -> String {
        let magnitude = self.0.unsigned_abs();
        if places == 0 {
            return magnitude.to_string();
        }
        let scale = 10_u64.pow(places);
        format!(
            "{}.{:0width$}",
            magnitude / scale,
            magnitude % scale,
            width = places as usize
        )
    }

    /// Plain signed decimal in `currency`'s precision, e.g. `-50.00` or `1000`
    pub fn to_decimal_string(&self, currency: Currency) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        format!("{}{}", sign, self.magnitude_text(currency.minor_digits()))
    }

    /// Format with the currency symbol, e.g. `-€50.00` or `¥1000`
    pub fn format(&self, currency: Currency) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        format!(
            "{}{}{}",
            sign,
            currency.symbol(),
            self.magnitude_text(currency.minor_digits())
        )
    }

    /// Format with an explicit sign prefix, e.g. `+$1000.00` or `-$50.00`
    pub fn format_signed(&self, currency: Currency) -> String {
        let sign = if self.is_negative() { "-" } else { "+" };
        format!(
            "{}{}{}",
            sign,
            currency.symbol(),
            self.magnitude_text(currency.minor_digits())
        )
    }
}

/// Parse a signed decimal into minor units with `places` fractional digits
fn parse_scaled(s: &str, places: u32) -> Result<Money, MoneyParseError> {
    let original = s;
    let scale = 10_i64.pow(places);
    let s = s.trim();

    let (negative, s) = if let Some(stripped) = s.strip_prefix('-') {
        (true, stripped)
    } else if let Some(stripped) = s.strip_prefix('+') {
        (false, stripped)
    } else {
        (false, s)
    };

    // Drop any leading currency symbol and thousands separators
    let digits: String = s
        .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '.')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    if digits.is_empty() {
        return Err(MoneyParseError::InvalidFormat(original.to_string()));
    }

    let invalid = || MoneyParseError::InvalidFormat(original.to_string());

    let minor = match digits.split_once('.') {
        Some((whole, frac)) => {
            let whole: i64 = if whole.is_empty() {
                0
            } else {
                whole.parse().map_err(|_| invalid())?
            };
            if !frac.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            // Zeros past the currency's precision are harmless
            let frac = if frac.len() > places as usize {
                frac.trim_end_matches('0')
            } else {
                frac
            };
            if frac.len() > places as usize {
                return Err(MoneyParseError::TooPrecise(original.to_string()));
            }
            let frac_minor: i64 = if frac.is_empty() {
                0
            } else {
                frac.parse::<i64>().map_err(|_| invalid())? * 10_i64.pow(places - frac.len() as u32)
            };
            whole
                .checked_mul(scale)
                .and_then(|w| w.checked_add(frac_minor))
                .ok_or_else(invalid)?
        }
        None => digits
            .parse::<i64>()
            .map_err(|_| invalid())?
            .checked_mul(scale)
            .ok_or_else(invalid)?,
    };

    Ok(Money(if negative { -minor } else { minor }))
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{}{}", sign, self.magnitude_text(2))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> std::iter::Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

/// Error type for money parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    InvalidFormat(String),
    TooPrecise(String),
}

impl fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyParseError::InvalidFormat(s) => write!(f, "Invalid money format: {}", s),
            MoneyParseError::TooPrecise(s) => {
                write!(f, "Amount has too many decimal places: {}", s)
            }
        }
    }
}

impl std::error::Error for MoneyParseError {}
