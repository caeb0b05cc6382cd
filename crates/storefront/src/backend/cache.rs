//! Cache types for backend responses.

use vitrine_core::types::{CountryId, StateId};
use vitrine_core::{City, State};

use super::types::{ProductDetail, ProductPage, ProductQuery, StoreProps};

/// Cache key for store, catalog and location lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Store(String),
    Products { store: String, query: ProductQuery },
    Product { store: String, slug: String },
    States(CountryId),
    Cities(StateId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Store(Box<StoreProps>),
    Products(Box<ProductPage>),
    Product(Box<ProductDetail>),
    States(Vec<State>),
    Cities(Vec<City>),
}
