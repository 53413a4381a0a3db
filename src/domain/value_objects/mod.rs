//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Money value object, serialized in the commerce platform's MoneyV2 shape:
/// `{ "amount": "12.99", "currencyCode": "USD" }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    #[serde(rename = "currencyCode")]
    pub currency_code: String,
}

impl Money {
    pub fn new(amount: Decimal, currency_code: &str) -> Self {
        Self { amount, currency_code: currency_code.to_string() }
    }

    pub fn usd(amount: Decimal) -> Self {
        Self::new(amount, "USD")
    }

    pub fn zero(currency_code: &str) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    pub fn multiply(&self, quantity: u32) -> Money {
        Money::new(self.amount * Decimal::from(quantity), &self.currency_code)
    }

    /// Adds two amounts of the same currency.
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency_code != other.currency_code {
            return Err(MoneyError::CurrencyMismatch);
        }
        Ok(Money::new(self.amount + other.amount, &self.currency_code))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero("USD")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency_code)
    }
}

#[derive(Debug, Clone)]
pub enum MoneyError {
    CurrencyMismatch,
}
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency mismatch")
    }
}

/// Product or line-item image.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(rename = "altText", default)]
    pub alt_text: String,
}

impl Image {
    pub fn new(url: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self { url: url.into(), alt_text: alt_text.into() }
    }
}
