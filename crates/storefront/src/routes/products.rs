//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use url::Url;

use vitrine_core::{Currency, Product, Variant};

use crate::backend::types::{ProductQuery, ProductSort};
use crate::error::Result;
use crate::filters;
use crate::middleware::CspNonce;
use crate::routes::StoreContext;
use crate::state::AppState;
use crate::views::{PriceView, ProductCardView, StoreView, media_url, star_classes};

/// Product detail display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub price: PriceView,
    pub images: Vec<String>,
    pub variants: Vec<VariantView>,
    pub in_stock: bool,
    pub max_quantity: i64,
    pub stars: Vec<&'static str>,
    pub rating_count: u32,
}

/// Variant option display data for templates.
#[derive(Clone)]
pub struct VariantView {
    pub id: String,
    pub label: String,
    pub in_stock: bool,
}

impl VariantView {
    fn new(variant: &Variant, product: &Product, currency: &Currency) -> Self {
        let label = match variant.price {
            Some(price) if price != product.effective_price() => {
                format!("{} ({})", variant.name, currency.format(price))
            }
            _ => variant.name.clone(),
        };
        Self {
            id: variant.id.to_string(),
            label,
            in_stock: variant.stock > 0,
        }
    }
}

impl ProductView {
    fn new(product: &Product, currency: &Currency, media: &Url) -> Self {
        // The primary image leads the gallery; duplicates are dropped.
        let mut images: Vec<String> = Vec::new();
        for path in product.image.iter().chain(&product.gallery) {
            let url = media_url(media, path);
            if !images.contains(&url) {
                images.push(url);
            }
        }

        Self {
            slug: product.slug.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            price: PriceView::new(product, currency),
            images,
            variants: product
                .variants
                .iter()
                .map(|v| VariantView::new(v, product, currency))
                .collect(),
            in_stock: product.is_in_stock(),
            max_quantity: product.stock.max(1),
            stars: star_classes(product.rating.as_ref()),
            rating_count: product.rating.map_or(0, |r| r.count),
        }
    }

    #[must_use]
    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }
}

/// Sort option display data for the listing toolbar.
#[derive(Clone)]
pub struct SortOption {
    pub slug: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub page: Option<u32>,
    pub sort: Option<String>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub store: StoreView,
    pub nonce: String,
    pub flash: Option<String>,
    pub products: Vec<ProductCardView>,
    pub sort: &'static str,
    pub sort_options: Vec<SortOption>,
    pub current_page: u32,
    pub last_page: u32,
    pub total: u64,
    pub previous_url: Option<String>,
    pub next_url: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub store: StoreView,
    pub nonce: String,
    pub flash: Option<String>,
    pub product: ProductView,
    pub related: Vec<ProductCardView>,
}

fn page_url(base: &str, page: u32, sort: ProductSort) -> String {
    format!("{base}/products?page={page}&sort={}", sort.slug())
}

/// Display product listing page.
#[instrument(skip(state, session, nonce))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
    Query(query): Query<ListingQuery>,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let ctx = StoreContext::load(&state, &session, &store).await?;

    let sort = ProductSort::from_param(query.sort.as_deref());
    let product_query = ProductQuery {
        page: query.page.unwrap_or(1).max(1),
        sort,
        featured: false,
    };
    let page = state.backend().products(ctx.slug(), product_query).await?;

    let base = ctx.view.base_path.clone();
    Ok(ProductsIndexTemplate {
        products: ctx.cards(&state, &page.data),
        sort: sort.slug(),
        sort_options: ProductSort::ALL
            .into_iter()
            .map(|option| SortOption {
                slug: option.slug(),
                label: option.label(),
                selected: option == sort,
            })
            .collect(),
        current_page: page.current_page,
        last_page: page.last_page,
        total: page.total,
        previous_url: page
            .has_previous()
            .then(|| page_url(&base, page.current_page - 1, sort)),
        next_url: page
            .has_next()
            .then(|| page_url(&base, page.current_page + 1, sort)),
        flash: ctx.take_flash(&session).await?,
        store: ctx.view,
        nonce,
    })
}

/// Display product detail page.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path((store, slug)): Path<(String, String)>,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let ctx = StoreContext::load(&state, &session, &store).await?;
    let detail = state.backend().product(ctx.slug(), &slug).await?;

    Ok(ProductShowTemplate {
        product: ProductView::new(
            &detail.product,
            &ctx.props.currency,
            &state.config().backend.base_url,
        ),
        related: ctx.cards(&state, &detail.related),
        flash: ctx.take_flash(&session).await?,
        store: ctx.view,
        nonce,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use vitrine_core::types::{ProductId, VariantId};

    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::new(1),
            slug: "tee".to_string(),
            name: "Tee".to_string(),
            description: "Soft".to_string(),
            price: Decimal::new(20, 0),
            sale_price: None,
            stock: 4,
            is_active: true,
            image: Some("tee.jpg".to_string()),
            gallery: vec!["tee.jpg".to_string(), "tee-back.jpg".to_string()],
            variants: vec![
                Variant {
                    id: VariantId::new(10),
                    name: "Small".to_string(),
                    price: None,
                    stock: 2,
                },
                Variant {
                    id: VariantId::new(11),
                    name: "XL".to_string(),
                    price: Some(Decimal::new(25, 0)),
                    stock: 0,
                },
            ],
            rating: None,
            category: None,
        }
    }

    #[test]
    fn test_product_view_gallery_dedup() {
        let media = Url::parse("https://api.shop.test/").unwrap();
        let view = ProductView::new(&product(), &Currency::default(), &media);
        assert_eq!(
            view.images,
            [
                "https://api.shop.test/tee.jpg",
                "https://api.shop.test/tee-back.jpg"
            ]
        );
        assert!(view.stars.is_empty());
    }

    #[test]
    fn test_variant_labels() {
        let media = Url::parse("https://api.shop.test/").unwrap();
        let view = ProductView::new(&product(), &Currency::default(), &media);
        assert!(view.has_variants());
        assert_eq!(view.variants[0].label, "Small");
        assert!(view.variants[0].in_stock);
        assert_eq!(view.variants[1].label, "XL ($25.00)");
        assert!(!view.variants[1].in_stock);
    }

    #[test]
    fn test_page_url() {
        assert_eq!(
            page_url("/maison", 2, ProductSort::PriceAsc),
            "/maison/products?page=2&sort=price_asc"
        );
    }
}
