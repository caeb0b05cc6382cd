//! Order confirmation route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::CspNonce;
use crate::models::session;
use crate::routes::StoreContext;
use crate::state::AppState;
use crate::views::StoreView;

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub store: StoreView,
    pub nonce: String,
    pub flash: Option<String>,
    pub order_number: String,
}

/// Display the confirmation page and forget the finished order.
///
/// The cart and checkout for this store are cleared on every visit, so a
/// reload shows the confirmation with an empty cart badge.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path((store, order_number)): Path<(String, String)>,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let mut ctx = StoreContext::load(&state, &session, &store).await?;

    session::clear_order_state(&session, ctx.slug()).await?;
    ctx.cart.clear();
    ctx.view.cart_count = 0;
    add_breadcrumb(
        "checkout",
        "Order confirmed",
        Some(&[("order_number", order_number.as_str())]),
    );

    Ok(OrderShowTemplate {
        flash: ctx.take_flash(&session).await?,
        store: ctx.view,
        nonce,
        order_number,
    })
}
