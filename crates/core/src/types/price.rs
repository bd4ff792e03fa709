//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices are entered by hand in the admin console and arrive from
//! the item store as either JSON strings or numbers. [`Price::from_json`]
//! accepts both. Razorpay works in minor units (paise), see
//! [`Price::to_minor_units`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors converting or parsing prices.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount does not fit in the gateway's integer range.
    #[error("price is too large")]
    Overflow,
    /// The value could not be read as a decimal amount.
    #[error("invalid price: {0}")]
    Invalid(String),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Price {
    /// Amount in the currency's standard unit (rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create an INR price.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Create a price from minor units (paise for INR).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::new(minor, 2), currency_code)
    }

    /// Read an amount from a loosely typed JSON value.
    ///
    /// Accepts numbers and numeric strings; `null` and the empty string are
    /// zero, matching how unpriced items are stored.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Invalid` for anything else.
    pub fn parse_amount(value: &serde_json::Value) -> Result<Decimal, PriceError> {
        match value {
            serde_json::Value::Null => Ok(Decimal::ZERO),
            serde_json::Value::Number(n) => n
                .to_string()
                .parse::<Decimal>()
                .or_else(|_| {
                    n.as_f64()
                        .and_then(Decimal::from_f64_retain)
                        .ok_or_else(|| PriceError::Invalid(n.to_string()))
                }),
            serde_json::Value::String(s) if s.trim().is_empty() => Ok(Decimal::ZERO),
            serde_json::Value::String(s) => s
                .trim()
                .trim_start_matches('₹')
                .replace(',', "")
                .parse::<Decimal>()
                .map_err(|_| PriceError::Invalid(s.clone())),
            other => Err(PriceError::Invalid(other.to_string())),
        }
    }

    /// Build an INR price from a loosely typed JSON value.
    ///
    /// # Errors
    ///
    /// See [`Price::parse_amount`].
    pub fn from_json(value: &serde_json::Value) -> Result<Self, PriceError> {
        Self::parse_amount(value).map(Self::inr)
    }

    /// Amount in minor units, rounded half away from zero to two places.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for negative amounts and
    /// `PriceError::Overflow` when the result does not fit in an `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative);
        }
        let minor = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(PriceError::Overflow)?;
        i64::try_from(minor).map_err(|_| PriceError::Overflow)
    }

    /// Multiply by a quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Format for display, e.g. `₹1,25,000.00`.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let text = format!("{:.2}", rounded.abs());
        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
        let grouped = match self.currency_code {
            CurrencyCode::INR => group_indian(whole),
            _ => group_thousands(whole),
        };
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        format!("{sign}{}{grouped}.{fraction}", self.currency_code.symbol())
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

impl std::ops::Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, p| acc + p)
    }
}

/// Indian digit grouping: last three digits, then pairs (1,25,000).
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (left, right) = rest.split_at(rest.len() - 2);
        groups.push(right);
        rest = left;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Currency symbol used in display strings.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// ISO code as sent to the payment gateway.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inr(s: &str) -> Price {
        Price::inr(s.parse().unwrap())
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(inr("1250").to_minor_units(), Ok(125_000));
        assert_eq!(inr("99.995").to_minor_units(), Ok(10_000));
        assert_eq!(inr("0").to_minor_units(), Ok(0));
        assert_eq!(inr("-1").to_minor_units(), Err(PriceError::Negative));
    }

    #[test]
    fn test_from_minor_units() {
        assert_eq!(Price::from_minor_units(125_050, CurrencyCode::INR), inr("1250.50"));
    }

    #[test]
    fn test_parse_amount_variants() {
        assert_eq!(Price::parse_amount(&json!(1500)), Ok(Decimal::from(1500)));
        assert_eq!(
            Price::parse_amount(&json!("1,499.50")),
            Ok("1499.50".parse().unwrap())
        );
        assert_eq!(Price::parse_amount(&json!("₹250")), Ok(Decimal::from(250)));
        assert_eq!(Price::parse_amount(&json!("")), Ok(Decimal::ZERO));
        assert_eq!(Price::parse_amount(&json!(null)), Ok(Decimal::ZERO));
        assert!(Price::parse_amount(&json!("free")).is_err());
        assert!(Price::parse_amount(&json!([1])).is_err());
    }

    #[test]
    fn test_display_indian_grouping() {
        assert_eq!(inr("0").display(), "₹0.00");
        assert_eq!(inr("999").display(), "₹999.00");
        assert_eq!(inr("1250").display(), "₹1,250.00");
        assert_eq!(inr("125000").display(), "₹1,25,000.00");
        assert_eq!(inr("12345678.5").display(), "₹1,23,45,678.50");
    }

    #[test]
    fn test_display_other_currency() {
        let price = Price::new("1234567.891".parse().unwrap(), CurrencyCode::USD);
        assert_eq!(price.display(), "$1,234,567.89");
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [inr("100").times(3), inr("49.50")].into_iter().sum();
        assert_eq!(total, inr("349.50"));
    }
}
