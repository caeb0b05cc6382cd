//! Shipping methods and their cost rule.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ShippingMethodId;

/// How a shipping method charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShippingKind {
    #[default]
    FlatRate,
    /// Free once the order subtotal reaches `min_order_amount`.
    FreeShipping,
    LocalPickup,
}

/// A delivery option offered by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: ShippingMethodId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ShippingKind,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub handling_fee: Decimal,
    #[serde(default)]
    pub min_order_amount: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ShippingMethod {
    /// Whether the free-shipping threshold is met for this subtotal.
    ///
    /// A free-shipping method without a threshold is always free.
    #[must_use]
    pub fn is_free_for(&self, subtotal: Decimal) -> bool {
        self.kind == ShippingKind::FreeShipping
            && subtotal >= self.min_order_amount.unwrap_or(Decimal::ZERO)
    }

    /// Shipping charge for an order with the given subtotal.
    #[must_use]
    pub fn cost_for(&self, subtotal: Decimal) -> Decimal {
        if self.is_free_for(subtotal) {
            Decimal::ZERO
        } else {
            self.cost + self.handling_fee
        }
    }

    /// How much more the buyer must spend to unlock free shipping.
    #[must_use]
    pub fn remaining_for_free(&self, subtotal: Decimal) -> Option<Decimal> {
        if self.kind != ShippingKind::FreeShipping || self.is_free_for(subtotal) {
            return None;
        }
        self.min_order_amount.map(|min| min - subtotal)
    }
}

/// Find a method by id.
#[must_use]
pub fn find_method(methods: &[ShippingMethod], id: ShippingMethodId) -> Option<&ShippingMethod> {
    methods.iter().find(|m| m.id == id)
}
