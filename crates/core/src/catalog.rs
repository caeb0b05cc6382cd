//! Catalog products and the derived state every product card renders.
//!
//! Card skins differ only in markup. Whether a product is on sale, in stock,
//! or needs options picked before it can go in the cart is decided here once.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, VariantId};

/// A product as provided by the commerce backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Base price.
    pub price: Decimal,
    /// Discounted price. Only honored when strictly below `price`.
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Primary image path, resolved against the media base URL when rendered.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub category: Option<String>,
}

const fn default_true() -> bool {
    true
}

/// A purchasable option of a product (size, color, trim...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    /// Display label (e.g., "Large / Red").
    pub name: String,
    /// Price override; falls back to the product's effective price.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: i64,
}

/// Aggregated review score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    /// Average on a 0-5 scale.
    pub average: Decimal,
    pub count: u32,
}

/// One of the five star slots on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Star {
    Full,
    Half,
    Empty,
}

/// How a card renders its price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceDisplay {
    Regular(Decimal),
    /// Sale price shown with the original struck through.
    Sale { sale: Decimal, original: Decimal },
}

/// What the card's call-to-action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    /// Add directly to the cart.
    AddToCart,
    /// Send the buyer to the detail page to pick a variant.
    SelectOptions,
    /// Nothing to buy; the control is suppressed.
    OutOfStock,
}

impl Product {
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.sale_price.is_some_and(|sale| sale < self.price)
    }

    #[must_use]
    pub const fn is_in_stock(&self) -> bool {
        self.stock > 0 && self.is_active
    }

    #[must_use]
    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }

    /// The price a buyer pays for the base product.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        match self.sale_price {
            Some(sale) if sale < self.price => sale,
            _ => self.price,
        }
    }

    #[must_use]
    pub fn price_display(&self) -> PriceDisplay {
        match self.sale_price {
            Some(sale) if sale < self.price => PriceDisplay::Sale {
                sale,
                original: self.price,
            },
            _ => PriceDisplay::Regular(self.price),
        }
    }

    #[must_use]
    pub fn card_action(&self) -> CardAction {
        if !self.is_in_stock() {
            CardAction::OutOfStock
        } else if self.has_variants() {
            CardAction::SelectOptions
        } else {
            CardAction::AddToCart
        }
    }

    /// Percentage saved when on sale, rounded down to a whole number.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let PriceDisplay::Sale { sale, original } = self.price_display() else {
            return None;
        };
        if original.is_zero() {
            return None;
        }
        let percent = ((original - sale) * Decimal::ONE_HUNDRED / original).floor();
        percent.to_u32().filter(|p| *p > 0)
    }

    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// Unit price for an optional variant of this product.
    #[must_use]
    pub fn unit_price(&self, variant: Option<&Variant>) -> Decimal {
        variant
            .and_then(|v| v.price)
            .unwrap_or_else(|| self.effective_price())
    }

    /// Whether the product (or the given variant) can be sold right now.
    #[must_use]
    pub fn is_purchasable(&self, variant: Option<&Variant>) -> bool {
        match variant {
            Some(v) => self.is_active && v.stock > 0,
            None => self.is_in_stock(),
        }
    }
}

impl Rating {
    /// Five star slots, with the average rounded to the nearest half star.
    #[must_use]
    pub fn stars(&self) -> [Star; 5] {
        let clamped = self.average.clamp(Decimal::ZERO, Decimal::from(5));
        let halves = (clamped * Decimal::TWO)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_usize()
            .unwrap_or(0);
        let mut stars = [Star::Empty; 5];
        for (i, star) in stars.iter_mut().enumerate() {
            let filled = halves.saturating_sub(i * 2);
            *star = match filled {
                0 => Star::Empty,
                1 => Star::Half,
                _ => Star::Full,
            };
        }
        stars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: i64, sale: Option<i64>, stock: i64, active: bool) -> Product {
        Product {
            id: ProductId::new(1),
            slug: "linen-shirt".to_string(),
            name: "Linen Shirt".to_string(),
            description: String::new(),
            price: Decimal::new(price, 0),
            sale_price: sale.map(|s| Decimal::new(s, 0)),
            stock,
            is_active: active,
            image: None,
            gallery: Vec::new(),
            variants: Vec::new(),
            rating: None,
            category: None,
        }
    }

    #[test]
    fn test_sale_price_below_base_is_on_sale() {
        let p = product(100, Some(80), 5, true);
        assert!(p.is_on_sale());
        assert_eq!(
            p.price_display(),
            PriceDisplay::Sale {
                sale: Decimal::new(80, 0),
                original: Decimal::new(100, 0)
            }
        );
        assert_eq!(p.effective_price(), Decimal::new(80, 0));
        assert_eq!(p.discount_percent(), Some(20));
    }

    #[test]
    fn test_sale_price_not_below_base_shows_base_only() {
        for sale in [Some(100), Some(120), None] {
            let p = product(100, sale, 5, true);
            assert!(!p.is_on_sale());
            assert_eq!(p.price_display(), PriceDisplay::Regular(Decimal::new(100, 0)));
            assert_eq!(p.discount_percent(), None);
        }
    }

    #[test]
    fn test_zero_stock_is_out_of_stock() {
        let p = product(10, None, 0, true);
        assert!(!p.is_in_stock());
        assert_eq!(p.card_action(), CardAction::OutOfStock);
    }

    #[test]
    fn test_inactive_is_out_of_stock() {
        let p = product(10, None, 12, false);
        assert!(!p.is_in_stock());
        assert_eq!(p.card_action(), CardAction::OutOfStock);
    }

    #[test]
    fn test_variants_route_to_detail() {
        let mut p = product(10, None, 3, true);
        p.variants.push(Variant {
            id: VariantId::new(9),
            name: "XL".to_string(),
            price: Some(Decimal::new(12, 0)),
            stock: 3,
        });
        assert_eq!(p.card_action(), CardAction::SelectOptions);
        let v = p.variant(VariantId::new(9));
        assert_eq!(p.unit_price(v), Decimal::new(12, 0));
    }

    #[test]
    fn test_plain_product_adds_to_cart() {
        assert_eq!(product(10, None, 1, true).card_action(), CardAction::AddToCart);
    }

    #[test]
    fn test_stars_round_to_half() {
        let rating = Rating {
            average: Decimal::new(37, 1),
            count: 12,
        };
        assert_eq!(
            rating.stars(),
            [Star::Full, Star::Full, Star::Full, Star::Half, Star::Empty]
        );

        let rating = Rating {
            average: Decimal::new(48, 1),
            count: 3,
        };
        assert_eq!(rating.stars(), [Star::Full; 5]);

        let rating = Rating {
            average: Decimal::ZERO,
            count: 0,
        };
        assert_eq!(rating.stars(), [Star::Empty; 5]);
    }
}
