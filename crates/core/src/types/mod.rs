//! Value types shared across the storefront.

pub mod contact;
pub mod id;
pub mod money;
pub mod theme;

pub use contact::{Email, EmailError, Phone, PhoneError};
pub use id::*;
pub use money::{Currency, SymbolPosition, round_money};
pub use theme::{CardSkin, Theme};
