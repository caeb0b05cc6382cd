//! Order summary math.
//!
//! The summary is recomputed from current checkout state every time it is
//! rendered; nothing here is cached.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::coupon::CouponState;
use crate::shipping::ShippingMethod;
use crate::types::round_money;

/// Subtotal, adjustments and total for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl CartSummary {
    /// Compute a summary.
    ///
    /// - shipping comes from the selected method (zero when none is selected)
    /// - the discount never exceeds the subtotal
    /// - tax is `tax_rate` percent of `subtotal - discount` (never negative)
    /// - `total = subtotal - discount + shipping + tax`
    #[must_use]
    pub fn compute(
        subtotal: Decimal,
        method: Option<&ShippingMethod>,
        coupon: &CouponState,
        tax_rate: Option<Decimal>,
    ) -> Self {
        let discount = coupon.discount().min(subtotal).max(Decimal::ZERO);
        let shipping = method.map_or(Decimal::ZERO, |m| m.cost_for(subtotal));
        let tax = tax_amount(subtotal - discount, tax_rate);
        Self {
            subtotal,
            discount,
            shipping,
            tax,
            total: subtotal - discount + shipping + tax,
        }
    }
}

/// Percentage tax on a taxable amount, rounded to cents.
#[must_use]
pub fn tax_amount(taxable: Decimal, rate: Option<Decimal>) -> Decimal {
    match rate {
        Some(rate) if rate > Decimal::ZERO && taxable > Decimal::ZERO => {
            round_money(taxable * rate / Decimal::ONE_HUNDRED)
        }
        _ => Decimal::ZERO,
    }
}
