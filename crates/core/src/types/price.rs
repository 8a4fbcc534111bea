//! Price representation using decimal arithmetic.
//!
//! The backend serializes money fields from Django `DecimalField`s, which may
//! arrive as JSON strings (`"1499.00"`) or plain numbers depending on the
//! endpoint. [`Price::amount_from_json`] accepts both.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Price {
    /// Amount in the currency's standard unit (pounds, not piastres).
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

    /// Create a price in the store's default currency.
    #[must_use]
    pub const fn egp(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::EGP)
    }

    /// Read a money amount from a loosely-typed JSON value.
    ///
    /// Numbers and numeric strings are accepted; anything else (including
    /// `null` and garbage strings) becomes zero.
    #[must_use]
    pub fn amount_from_json(value: &serde_json::Value) -> Decimal {
        match value {
            serde_json::Value::String(s) => Decimal::from_str(s.trim()).unwrap_or_default(),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Decimal::from)
                .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok()))
                .unwrap_or_default(),
            _ => Decimal::ZERO,
        }
    }

    /// Format for display (e.g., "EGP 1499.00").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} {:.2}", self.currency_code.code(), self.amount)
    }
}

/// ISO 4217 currency codes used by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EGP,
    USD,
}

impl CurrencyCode {
    /// The three-letter code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EGP => "EGP",
            Self::USD => "USD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_amount_from_string_and_number() {
        assert_eq!(
            Price::amount_from_json(&json!("1499.50")),
            Decimal::new(149_950, 2)
        );
        assert_eq!(Price::amount_from_json(&json!(250)), Decimal::from(250));
        assert_eq!(
            Price::amount_from_json(&json!(12.5)),
            Decimal::new(125, 1)
        );
    }

    #[test]
    fn test_amount_garbage_is_zero() {
        assert_eq!(Price::amount_from_json(&json!("n/a")), Decimal::ZERO);
        assert_eq!(Price::amount_from_json(&json!(null)), Decimal::ZERO);
        assert_eq!(Price::amount_from_json(&json!([1])), Decimal::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::egp(Decimal::new(5, 0)).display(), "EGP 5.00");
    }
}
