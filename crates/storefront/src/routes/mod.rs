//! HTTP route handlers for the storefront.
//!
//! Every page lives under a store slug; one deployment serves many stores.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                - Health check
//! GET  /{store}                               - Store home
//!
//! # Products
//! GET  /{store}/products                      - Product grid (?page=&sort=)
//! GET  /{store}/products/{slug}               - Product detail
//!
//! # Cart (HTMX fragments when HX-Request is set)
//! GET  /{store}/cart                          - Cart page
//! POST /{store}/cart/add                      - Add to cart (count badge, triggers cart-updated)
//! POST /{store}/cart/update                   - Update quantity (cart_items fragment)
//! POST /{store}/cart/remove                   - Remove line (cart_items fragment)
//! GET  /{store}/cart/count                    - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /{store}/checkout                      - Current step
//! POST /{store}/checkout/shipping             - Submit shipping step
//! POST /{store}/checkout/shipping-method      - Change shipping method
//! POST /{store}/checkout/review               - Confirm review step
//! POST /{store}/checkout/back                 - Go back one step
//! POST /{store}/checkout/coupon               - Apply coupon (rate limited)
//! POST /{store}/checkout/coupon/remove        - Remove coupon
//! POST /{store}/checkout/place                - Place order, multipart (rate limited)
//!
//! # Address cascade (option fragments)
//! GET  /{store}/locations/states?country_id=  - State options
//! GET  /{store}/locations/cities?state_id=    - City options
//!
//! # Orders
//! GET  /{store}/orders/{order_number}         - Confirmation page
//! ```

pub mod cart;
pub mod checkout;
pub mod home;
pub mod locations;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderMap,
    routing::{get, post},
};
use rust_decimal::Decimal;
use tower_sessions::Session;

use vitrine_core::{Cart, Product};

use crate::backend::types::StoreProps;
use crate::error::Result;
use crate::middleware::{cart_rate_limiter, checkout_rate_limiter};
use crate::models::session;
use crate::state::AppState;
use crate::views::{CartView, ProductCardView, StoreView};

/// Upper bound for the order form, receipt included.
const ORDER_BODY_LIMIT: usize = 10 * 1024 * 1024;

// =============================================================================
// Shared Handler Context
// =============================================================================

/// Store props plus the buyer's cart for that store.
pub(crate) struct StoreContext {
    pub props: StoreProps,
    pub cart: Cart,
    pub view: StoreView,
    loaded_subtotal: Decimal,
}

impl StoreContext {
    /// Load the store (cached) and this session's cart for it.
    pub(crate) async fn load(state: &AppState, session: &Session, store: &str) -> Result<Self> {
        let props = state.backend().store(store).await?;
        let cart = session::load_cart(session, &props.slug).await?;
        let view = StoreView::new(&props, &state.config().backend.base_url, cart.item_count());
        let loaded_subtotal = cart.subtotal();
        Ok(Self {
            props,
            cart,
            view,
            loaded_subtotal,
        })
    }

    pub(crate) fn slug(&self) -> &str {
        &self.props.slug
    }

    /// A link inside this store, e.g. `path("/cart")`.
    pub(crate) fn path(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.view.base_path)
    }

    pub(crate) fn cards(&self, state: &AppState, products: &[Product]) -> Vec<ProductCardView> {
        ProductCardView::list(
            products,
            &self.view,
            &self.props.currency,
            &state.config().backend.base_url,
        )
    }

    pub(crate) fn cart_view(&self, state: &AppState) -> CartView {
        CartView::new(
            &self.cart,
            &self.view,
            &self.props.currency,
            &state.config().backend.base_url,
        )
    }

    /// Persist the cart and refresh the badge count.
    ///
    /// An open checkout whose subtotal moved loses its coupon and returns to
    /// the shipping step.
    pub(crate) async fn save_cart(&mut self, session: &Session) -> Result<()> {
        session::save_cart(session, &self.props.slug, &self.cart).await?;
        self.view.cart_count = self.cart.item_count();

        let subtotal = self.cart.subtotal();
        if subtotal != self.loaded_subtotal
            && session::has_checkout(session, &self.props.slug).await?
        {
            let mut checkout = session::load_checkout(session, &self.props.slug).await?;
            checkout.cart_changed();
            session::save_checkout(session, &self.props.slug, &checkout).await?;
            tracing::debug!(store = %self.props.slug, "Cart changed, checkout restarted");
        }
        self.loaded_subtotal = subtotal;
        Ok(())
    }

    /// Take the one-shot flash message for this store.
    pub(crate) async fn take_flash(&self, session: &Session) -> Result<Option<String>> {
        Ok(session::take_flash(session, &self.props.slug).await?)
    }
}

/// Whether the request came from an HTMX-style fetch expecting a fragment.
pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .is_some_and(|value| value.as_bytes() == b"true")
}

/// Turn a lowercase error message into a sentence for display.
pub(crate) fn sentence(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        format!("{}{}.", first.to_uppercase(), chars.as_str())
    })
}

// =============================================================================
// Routers
// =============================================================================

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .layer(cart_rate_limiter());

    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .merge(mutations)
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/coupon", post(checkout::apply_coupon))
        .route(
            "/place",
            post(checkout::place).layer(DefaultBodyLimit::max(ORDER_BODY_LIMIT)),
        )
        .layer(checkout_rate_limiter());

    Router::new()
        .route("/", get(checkout::show))
        .route("/shipping", post(checkout::submit_shipping))
        .route("/shipping-method", post(checkout::select_shipping_method))
        .route("/review", post(checkout::confirm_review))
        .route("/back", post(checkout::back))
        .route("/coupon/remove", post(checkout::remove_coupon))
        .merge(limited)
}

/// Create the location lookup routes router.
pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/states", get(locations::states))
        .route("/cities", get(locations::cities))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Store home
        .route("/{store}", get(home::home))
        // Catalog
        .nest("/{store}/products", product_routes())
        // Cart
        .nest("/{store}/cart", cart_routes())
        // Checkout
        .nest("/{store}/checkout", checkout_routes())
        // Address cascade
        .nest("/{store}/locations", location_routes())
        // Confirmation
        .route("/{store}/orders/{order_number}", get(orders::show))
}
