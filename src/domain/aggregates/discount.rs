//! Discount Engine
//!
//! One discount may be active at a time. `BUY3SAVE10` is special: it is both
//! the only manually enterable code and the only one the engine applies and
//! retires automatically as the cart crosses the three-unit threshold.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Result, StorefrontError};

/// The auto-managed promotional code.
pub const AUTO_DISCOUNT_CODE: &str = "BUY3SAVE10";

/// Cart units required before [`AUTO_DISCOUNT_CODE`] applies.
pub const AUTO_DISCOUNT_THRESHOLD: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscountKind {
    Fixed,
}

#[derive(Clone, Copy, Debug)]
pub struct DiscountRule {
    pub kind: DiscountKind,
    pub amount: Decimal,
}

/// Static registry of redeemable codes.
fn lookup(code: &str) -> Option<DiscountRule> {
    match code {
        AUTO_DISCOUNT_CODE => Some(DiscountRule { kind: DiscountKind::Fixed, amount: Decimal::TEN }),
        _ => None,
    }
}

/// Active discount, persisted as `{"code": ..., "valid": ..., "amount": ...}`.
///
/// Invariant: while `code` is [`AUTO_DISCOUNT_CODE`], `is_valid` tracks
/// whether the cart holds at least [`AUTO_DISCOUNT_THRESHOLD`] units. An
/// invalid `code` may remain stored for display after a rejected attempt.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountState {
    #[serde(default)]
    pub code: String,
    #[serde(rename = "valid", default)]
    pub is_valid: bool,
    #[serde(with = "rust_decimal::serde::float", default)]
    pub amount: Decimal,
}

impl DiscountState {
    /// The code to hand to checkout, if any.
    pub fn active_code(&self) -> Option<&str> {
        (self.is_valid && !self.code.is_empty()).then_some(self.code.as_str())
    }

    /// Reconciles the auto discount after a cart mutation.
    ///
    /// Activates [`AUTO_DISCOUNT_CODE`] when the threshold is met and no
    /// discount is currently valid; the check is against validity, not a
    /// sticky flag, so a removed auto discount re-applies at the next
    /// qualifying mutation. Retires only the auto code when the cart shrinks
    /// below the threshold; manually entered codes are left alone.
    pub fn reconcile(&mut self, item_count: u32) {
        if item_count >= AUTO_DISCOUNT_THRESHOLD {
            if !self.is_valid {
                if let Some(rule) = lookup(AUTO_DISCOUNT_CODE) {
                    self.code = AUTO_DISCOUNT_CODE.to_string();
                    self.is_valid = true;
                    self.amount = rule.amount;
                    tracing::debug!(code = AUTO_DISCOUNT_CODE, "auto discount applied");
                }
            }
        } else if self.code == AUTO_DISCOUNT_CODE && self.is_valid {
            self.is_valid = false;
            self.amount = Decimal::ZERO;
            tracing::debug!(code = AUTO_DISCOUNT_CODE, "auto discount retired");
        }
    }

    /// Applies a manually entered code against the registry.
    ///
    /// The auto code is rejected below the threshold without touching state.
    /// An unknown code is rejected but stays stored (invalid) for display.
    /// A known code replaces whatever was active before.
    pub fn apply_code(&mut self, raw: &str, item_count: u32) -> Result<()> {
        let code = raw.trim().to_uppercase();
        if code == AUTO_DISCOUNT_CODE && item_count < AUTO_DISCOUNT_THRESHOLD {
            return Err(StorefrontError::IneligibleCode);
        }
        match lookup(&code) {
            Some(rule) => {
                self.code = code;
                self.is_valid = true;
                self.amount = rule.amount;
                Ok(())
            }
            None => {
                self.code = code;
                self.is_valid = false;
                self.amount = Decimal::ZERO;
                Err(StorefrontError::InvalidCode)
            }
        }
    }

    /// Clears the discount unconditionally, including the auto code.
    pub fn remove_code(&mut self) {
        *self = DiscountState::default();
    }

    /// Subtotal after the discount, floored at zero.
    pub fn compute_total(&self, subtotal: Decimal) -> Decimal {
        if self.is_valid {
            (subtotal - self.amount).max(Decimal::ZERO)
        } else {
            subtotal
        }
    }
}
