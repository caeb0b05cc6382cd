//! Vitrine Core - Storefront domain types and checkout logic.
//!
//! This crate holds everything the storefront decides on its own:
//! - product card state (sale, stock, rating stars)
//! - the session cart
//! - the three-step checkout with its validation rules
//! - pricing, coupons and shipping cost
//! - the cascading country/state/city selection
//! - payment method dispatch and the order payload
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no templates. The storefront crate feeds it data fetched from
//! the commerce backend and renders what it returns.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupon;
pub mod order;
pub mod payment;
pub mod pricing;
pub mod shipping;
pub mod types;

pub use address::{Address, City, Country, LocationLists, LocationSelection, State};
pub use cart::{Cart, CartError, CartItem};
pub use catalog::{CardAction, PriceDisplay, Product, Rating, Star, Variant};
pub use checkout::{
    CheckoutError, CheckoutState, CheckoutStep, ContactDetails, FieldErrors, PaymentDetails,
    ShippingDetails,
};
pub use coupon::{CouponError, CouponState};
pub use order::{OrderLine, OrderPayload};
pub use payment::{EnabledPaymentMethods, HostedProvider, PaymentMethod, SubmissionStrategy};
pub use pricing::CartSummary;
pub use shipping::{ShippingKind, ShippingMethod};
pub use types::*;
