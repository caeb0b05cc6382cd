//! Cart route handlers.
//!
//! The cart lives in the session, one per store. Mutations answer HTMX-style
//! fetches with a fragment and an `HX-Trigger: cart-updated` header; plain
//! form posts are redirected back to the cart page with a flash message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::{CartError, CartItem, types::VariantId};

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::CspNonce;
use crate::models::session;
use crate::routes::{StoreContext, is_htmx, sentence};
use crate::state::AppState;
use crate::views::{CartView, StoreView};

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product: String,
    /// Empty when the product has no variants.
    #[serde(default)]
    pub variant_id: String,
    pub quantity: Option<u32>,
}

impl AddToCartForm {
    fn variant(&self) -> std::result::Result<Option<VariantId>, CartError> {
        let raw = self.variant_id.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(|_| CartError::UnknownVariant)
    }
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub store: StoreView,
    pub nonce: String,
    pub flash: Option<String>,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub store: StoreView,
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Rejected cart change fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_error.html")]
pub struct CartErrorTemplate {
    pub message: String,
}

/// Respond to a cart mutation.
async fn after_mutation(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    ctx: StoreContext,
    fragment: Fragment,
    message: &str,
) -> Result<Response> {
    if is_htmx(headers) {
        let body = match fragment {
            Fragment::Count => CartCountTemplate {
                count: ctx.cart.item_count(),
            }
            .into_response(),
            Fragment::Items => CartItemsTemplate {
                cart: ctx.cart_view(state),
                store: ctx.view,
            }
            .into_response(),
        };
        return Ok((AppendHeaders([("HX-Trigger", "cart-updated")]), body).into_response());
    }

    session::set_flash(session, ctx.slug(), message).await?;
    Ok(Redirect::to(&ctx.path("/cart")).into_response())
}

/// Respond to a rejected cart mutation.
async fn rejected(
    session: &Session,
    headers: &HeaderMap,
    ctx: &StoreContext,
    error: &CartError,
) -> Result<Response> {
    tracing::info!(error = %error, "Cart change rejected");
    let message = sentence(&error.to_string());
    if is_htmx(headers) {
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, CartErrorTemplate { message }).into_response());
    }

    session::set_flash(session, ctx.slug(), &message).await?;
    Ok(Redirect::to(&ctx.path("/cart")).into_response())
}

enum Fragment {
    Count,
    Items,
}

/// Display cart page.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let ctx = StoreContext::load(&state, &session, &store).await?;

    Ok(CartShowTemplate {
        cart: ctx.cart_view(&state),
        flash: ctx.take_flash(&session).await?,
        store: ctx.view,
        nonce,
    })
}

/// Add item to cart.
///
/// The product is re-read from the backend so price and stock come from the
/// catalog, never from the form.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let mut ctx = StoreContext::load(&state, &session, &store).await?;
    let detail = state.backend().product(ctx.slug(), &form.product).await?;

    let item = form.variant().and_then(|variant| {
        CartItem::from_product(&detail.product, variant, form.quantity.unwrap_or(1))
    });
    let result = item.and_then(|item| ctx.cart.add(item));
    if let Err(e) = result {
        return rejected(&session, &headers, &ctx, &e).await;
    }

    ctx.save_cart(&session).await?;
    add_breadcrumb("cart", "Added to cart", Some(&[("product", form.product.as_str())]));
    let message = format!("{} was added to your cart.", detail.product.name);
    after_mutation(&state, &session, &headers, ctx, Fragment::Count, &message).await
}

/// Update cart line quantity. Zero removes the line.
#[instrument(skip(state, session, headers))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let mut ctx = StoreContext::load(&state, &session, &store).await?;

    if let Err(e) = ctx.cart.set_quantity(&form.line_id, form.quantity) {
        return rejected(&session, &headers, &ctx, &e).await;
    }

    ctx.save_cart(&session).await?;
    after_mutation(&state, &session, &headers, ctx, Fragment::Items, "Your cart was updated.").await
}

/// Remove a line from the cart.
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let mut ctx = StoreContext::load(&state, &session, &store).await?;

    if let Err(e) = ctx.cart.remove(&form.line_id) {
        return rejected(&session, &headers, &ctx, &e).await;
    }

    ctx.save_cart(&session).await?;
    after_mutation(&state, &session, &headers, ctx, Fragment::Items, "The item was removed.").await
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session, Path(store): Path<String>) -> Result<impl IntoResponse> {
    let cart = session::load_cart(&session, &store).await?;
    Ok(CartCountTemplate {
        count: cart.item_count(),
    })
}
