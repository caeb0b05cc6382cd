//! Currency display and monetary rounding.
//!
//! Amounts are plain [`Decimal`] values everywhere in the checkout math; a
//! store has exactly one currency, so the currency only matters at the edge
//! where amounts are rendered.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Where the currency symbol is placed relative to the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SymbolPosition {
    #[default]
    Before,
    After,
}

/// A store's display currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 code (e.g., "USD").
    pub code: String,
    /// Display symbol (e.g., "$", "€", "ر.س").
    pub symbol: String,
    #[serde(default)]
    pub symbol_position: SymbolPosition,
}

impl Default for Currency {
    fn default() -> Self {
        Self {
            code: "USD".to_string(),
            symbol: "$".to_string(),
            symbol_position: SymbolPosition::Before,
        }
    }
}

impl Currency {
    /// Format an amount for display (e.g., `$19.99` or `19.99 €`).
    ///
    /// Negative amounts carry the sign before the symbol: `-$10.00`.
    #[must_use]
    pub fn format(&self, amount: Decimal) -> String {
        let rounded = round_money(amount);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let magnitude = format!("{:.2}", rounded.abs());
        match self.symbol_position {
            SymbolPosition::Before => format!("{sign}{}{magnitude}", self.symbol),
            SymbolPosition::After => format!("{sign}{magnitude} {}", self.symbol),
        }
    }
}

/// Round to two decimal places, midpoint away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
