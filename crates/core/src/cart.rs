//! Shopping cart held in the buyer's session.
//!
//! Items snapshot the product data needed to render and price a line, so the
//! cart page and checkout never have to re-fetch the catalog.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Product;
use crate::types::{ProductId, VariantId};

/// Errors raised by cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("this product is out of stock")]
    OutOfStock,
    #[error("please choose an option before adding this product")]
    VariantRequired,
    #[error("the selected option does not exist")]
    UnknownVariant,
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("only {available} left in stock")]
    InsufficientStock { available: u32 },
    #[error("cart line not found: {0}")]
    LineNotFound(String),
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub variant_id: Option<VariantId>,
    pub variant_name: Option<String>,
    pub unit_price: Decimal,
    pub image: Option<String>,
    pub quantity: u32,
    /// Stock available when the line was last touched.
    pub max_quantity: u32,
}

impl CartItem {
    /// Build a cart line for a product, validating stock and variant choice.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the product cannot be bought as requested.
    pub fn from_product(
        product: &Product,
        variant_id: Option<VariantId>,
        quantity: u32,
    ) -> Result<Self, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let variant = match variant_id {
            Some(id) => Some(product.variant(id).ok_or(CartError::UnknownVariant)?),
            None if product.has_variants() => return Err(CartError::VariantRequired),
            None => None,
        };

        if !product.is_purchasable(variant) {
            return Err(CartError::OutOfStock);
        }

        let stock = variant.map_or(product.stock, |v| v.stock);
        let max_quantity = u32::try_from(stock).unwrap_or(u32::MAX);
        if quantity > max_quantity {
            return Err(CartError::InsufficientStock {
                available: max_quantity,
            });
        }

        Ok(Self {
            product_id: product.id,
            slug: product.slug.clone(),
            name: product.name.clone(),
            variant_id: variant.map(|v| v.id),
            variant_name: variant.map(|v| v.name.clone()),
            unit_price: product.unit_price(variant),
            image: product.image.clone(),
            quantity,
            max_quantity,
        })
    }

    /// Stable identifier for this line within a cart.
    #[must_use]
    pub fn line_id(&self) -> String {
        match self.variant_id {
            Some(variant) => format!("{}-{variant}", self.product_id),
            None => self.product_id.to_string(),
        }
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The cart for one store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |count, i| count.saturating_add(i.quantity))
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Add a line, merging with an existing line for the same product/variant.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InsufficientStock`] if the merged quantity would
    /// exceed the available stock.
    pub fn add(&mut self, item: CartItem) -> Result<(), CartError> {
        let line_id = item.line_id();
        if let Some(existing) = self.items.iter_mut().find(|i| i.line_id() == line_id) {
            let quantity = existing.quantity.saturating_add(item.quantity);
            if quantity > item.max_quantity {
                return Err(CartError::InsufficientStock {
                    available: item.max_quantity,
                });
            }
            existing.quantity = quantity;
            existing.max_quantity = item.max_quantity;
            existing.unit_price = item.unit_price;
        } else {
            self.items.push(item);
        }
        Ok(())
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not exist or stock is insufficient.
    pub fn set_quantity(&mut self, line_id: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(line_id);
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.line_id() == line_id)
            .ok_or_else(|| CartError::LineNotFound(line_id.to_string()))?;
        if quantity > item.max_quantity {
            return Err(CartError::InsufficientStock {
                available: item.max_quantity,
            });
        }
        item.quantity = quantity;
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if no such line exists.
    pub fn remove(&mut self, line_id: &str) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.line_id() != line_id);
        if self.items.len() == before {
            return Err(CartError::LineNotFound(line_id.to_string()));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
