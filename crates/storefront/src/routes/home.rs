//! Store home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::types::ProductQuery;
use crate::error::Result;
use crate::filters;
use crate::middleware::CspNonce;
use crate::routes::StoreContext;
use crate::state::AppState;
use crate::views::{ProductCardView, StoreView};

/// Products shown in the featured slider.
const FEATURED_LIMIT: usize = 12;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub store: StoreView,
    pub nonce: String,
    pub flash: Option<String>,
    pub featured: Vec<ProductCardView>,
    pub newest: Vec<ProductCardView>,
    pub has_more: bool,
}

/// Display the store home page: banner, featured slider, newest products.
///
/// A failing featured list only hides the slider; the newest grid is the
/// page's main content and propagates errors.
#[instrument(skip(state, session, nonce))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let ctx = StoreContext::load(&state, &session, &store).await?;

    let featured_query = ProductQuery {
        featured: true,
        ..ProductQuery::default()
    };
    let featured = match state.backend().products(ctx.slug(), featured_query).await {
        Ok(page) => {
            let mut cards = ctx.cards(&state, &page.data);
            cards.truncate(FEATURED_LIMIT);
            cards
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load featured products");
            Vec::new()
        }
    };

    let newest = state
        .backend()
        .products(ctx.slug(), ProductQuery::default())
        .await?;

    Ok(HomeTemplate {
        featured,
        newest: ctx.cards(&state, &newest.data),
        has_more: newest.has_next(),
        flash: ctx.take_flash(&session).await?,
        store: ctx.view,
        nonce,
    })
}
