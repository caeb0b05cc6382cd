//! Session-held storefront state.
//!
//! Each store keeps its own cart, checkout progress and flash message, so one
//! browser can shop at several storefronts without the carts mixing.

use serde::{Serialize, de::DeserializeOwned};
use tower_sessions::Session;
use tower_sessions::session::Error;

use vitrine_core::{Cart, CheckoutState};

/// Session key prefixes. The store slug is appended.
pub mod keys {
    /// The store's cart.
    pub const CART: &str = "cart";

    /// The store's checkout progress.
    pub const CHECKOUT: &str = "checkout";

    /// One-shot message shown on the next cart page render.
    pub const FLASH: &str = "flash";
}

fn key(prefix: &str, store: &str) -> String {
    format!("{prefix}:{store}")
}

async fn load<T: DeserializeOwned + Default>(
    session: &Session,
    prefix: &str,
    store: &str,
) -> Result<T, Error> {
    Ok(session.get::<T>(&key(prefix, store)).await?.unwrap_or_default())
}

async fn save<T: Serialize + Sync>(
    session: &Session,
    prefix: &str,
    store: &str,
    value: &T,
) -> Result<(), Error> {
    session.insert(&key(prefix, store), value).await
}

/// The store's cart, empty if none was saved.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_cart(session: &Session, store: &str) -> Result<Cart, Error> {
    load(session, keys::CART, store).await
}

/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(session: &Session, store: &str, cart: &Cart) -> Result<(), Error> {
    save(session, keys::CART, store, cart).await
}

/// The store's checkout progress, starting fresh if none was saved.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_checkout(session: &Session, store: &str) -> Result<CheckoutState, Error> {
    load(session, keys::CHECKOUT, store).await
}

/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_checkout(
    session: &Session,
    store: &str,
    checkout: &CheckoutState,
) -> Result<(), Error> {
    save(session, keys::CHECKOUT, store, checkout).await
}

/// Whether a checkout was already started for this store.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn has_checkout(session: &Session, store: &str) -> Result<bool, Error> {
    Ok(session
        .get::<CheckoutState>(&key(keys::CHECKOUT, store))
        .await?
        .is_some())
}

/// Forget the store's cart and checkout after an order is placed.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear_order_state(session: &Session, store: &str) -> Result<(), Error> {
    session
        .remove::<Cart>(&key(keys::CART, store))
        .await?;
    session
        .remove::<CheckoutState>(&key(keys::CHECKOUT, store))
        .await?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the session store fails.
pub async fn set_flash(session: &Session, store: &str, message: &str) -> Result<(), Error> {
    session.insert(&key(keys::FLASH, store), message).await
}

/// Take the pending flash message, if any.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn take_flash(session: &Session, store: &str) -> Result<Option<String>, Error> {
    session.remove::<String>(&key(keys::FLASH, store)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_scoped_per_store() {
        assert_eq!(key(keys::CART, "maison"), "cart:maison");
        assert_ne!(key(keys::CART, "maison"), key(keys::CART, "garage"));
        assert_ne!(key(keys::CART, "maison"), key(keys::CHECKOUT, "maison"));
    }
}
