//! Coupon state for a checkout.
//!
//! Validation happens on the backend; this only tracks what was applied.
//! One coupon at a time: applying while another is applied is rejected.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("please enter a coupon code")]
    EmptyCode,
    #[error("a coupon is already applied, remove it first")]
    AlreadyApplied,
    #[error("{0}")]
    Rejected(String),
}

/// Whether a coupon is applied to the checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CouponState {
    #[default]
    None,
    Applied { code: String, discount: Decimal },
}

impl CouponState {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    #[must_use]
    pub fn discount(&self) -> Decimal {
        match self {
            Self::None => Decimal::ZERO,
            Self::Applied { discount, .. } => *discount,
        }
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Applied { code, .. } => Some(code),
        }
    }

    /// Check that a new code may be submitted and return it trimmed.
    ///
    /// # Errors
    ///
    /// Fails if the code is blank or a coupon is already applied.
    pub fn prepare(&self, input: &str) -> Result<String, CouponError> {
        if self.is_applied() {
            return Err(CouponError::AlreadyApplied);
        }
        let code = input.trim();
        if code.is_empty() {
            return Err(CouponError::EmptyCode);
        }
        Ok(code.to_string())
    }

    /// Record a backend-validated coupon. The discount overwrites any previous
    /// value; negative discounts are treated as zero.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::AlreadyApplied`] if a coupon is already applied.
    pub fn apply(&mut self, code: String, discount: Decimal) -> Result<(), CouponError> {
        if self.is_applied() {
            return Err(CouponError::AlreadyApplied);
        }
        *self = Self::Applied {
            code,
            discount: discount.max(Decimal::ZERO),
        };
        Ok(())
    }

    pub fn remove(&mut self) {
        *self = Self::None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_sets_discount() {
        let mut coupon = CouponState::default();
        assert_eq!(coupon.discount(), Decimal::ZERO);
        let code = coupon.prepare("  SAVE10 ").unwrap();
        coupon.apply(code, Decimal::new(10, 0)).unwrap();
        assert!(coupon.is_applied());
        assert_eq!(coupon.code(), Some("SAVE10"));
        assert_eq!(coupon.discount(), Decimal::new(10, 0));
    }

    #[test]
    fn test_no_stacking() {
        let mut coupon = CouponState::default();
        coupon.apply("A".to_string(), Decimal::ONE).unwrap();
        assert_eq!(coupon.prepare("B"), Err(CouponError::AlreadyApplied));
        assert_eq!(
            coupon.apply("B".to_string(), Decimal::TEN),
            Err(CouponError::AlreadyApplied)
        );
        assert_eq!(coupon.discount(), Decimal::ONE);
    }

    #[test]
    fn test_remove_resets() {
        let mut coupon = CouponState::default();
        coupon.apply("A".to_string(), Decimal::ONE).unwrap();
        coupon.remove();
        assert_eq!(coupon, CouponState::None);
        assert!(coupon.prepare("B").is_ok());
    }

    #[test]
    fn test_blank_code() {
        assert_eq!(CouponState::None.prepare("   "), Err(CouponError::EmptyCode));
    }

    #[test]
    fn test_negative_discount_clamped() {
        let mut coupon = CouponState::default();
        coupon.apply("ODD".to_string(), Decimal::new(-5, 0)).unwrap();
        assert_eq!(coupon.discount(), Decimal::ZERO);
    }
}
