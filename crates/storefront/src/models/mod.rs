//! Storefront-side models.

pub mod session;
