//! Display data shared by several templates.
//!
//! Templates only ever see pre-formatted strings and flags; money formatting
//! and card state decisions happen here.

use rust_decimal::Decimal;
use url::Url;

use vitrine_core::{
    CardAction, Cart, CartItem, CartSummary, Currency, PriceDisplay, Product, Rating,
    ShippingMethod, Star,
};

use crate::backend::types::StoreProps;

// =============================================================================
// Layout
// =============================================================================

#[derive(Clone)]
pub struct PageLinkView {
    pub title: String,
    pub url: String,
}

/// Store chrome rendered by `base.html`.
#[derive(Clone)]
pub struct StoreView {
    pub slug: String,
    pub name: String,
    /// `/{slug}`, the prefix for every store link.
    pub base_path: String,
    pub theme_class: String,
    pub skin: &'static str,
    pub logo: Option<String>,
    pub banner: Option<String>,
    pub description: Option<String>,
    pub pages: Vec<PageLinkView>,
    pub cart_count: u32,
}

impl StoreView {
    #[must_use]
    pub fn new(props: &StoreProps, media: &Url, cart_count: u32) -> Self {
        let theme = props.theme();
        Self {
            slug: props.slug.clone(),
            name: props.name.clone(),
            base_path: format!("/{}", urlencoding::encode(&props.slug)),
            theme_class: theme.css_class(),
            skin: theme.card_skin().slug(),
            logo: props.logo.as_deref().map(|p| media_url(media, p)),
            banner: props.banner.as_deref().map(|p| media_url(media, p)),
            description: props.description.clone().filter(|d| !d.trim().is_empty()),
            pages: props
                .pages
                .iter()
                .map(|p| PageLinkView {
                    title: p.title.clone(),
                    url: p.url.clone(),
                })
                .collect(),
            cart_count,
        }
    }
}

/// Resolve an image reference: absolute URLs and root paths pass through,
/// anything else is relative to the backend.
#[must_use]
pub fn media_url(base: &Url, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with('/') {
        return path.to_string();
    }
    base.join(path)
        .map_or_else(|_| path.to_string(), |url| url.to_string())
}

// =============================================================================
// Product Cards
// =============================================================================

/// CSS classes for the five star slots; empty when unrated.
#[must_use]
pub fn star_classes(rating: Option<&Rating>) -> Vec<&'static str> {
    rating.map_or_else(Vec::new, |r| {
        r.stars()
            .iter()
            .map(|star| match star {
                Star::Full => "full",
                Star::Half => "half",
                Star::Empty => "empty",
            })
            .collect()
    })
}

/// Price block shared by cards and the detail page.
#[derive(Clone)]
pub struct PriceView {
    pub current: String,
    /// Original price, struck through, when on sale.
    pub original: Option<String>,
    /// e.g. "-25%"
    pub badge: Option<String>,
}

impl PriceView {
    #[must_use]
    pub fn new(product: &Product, currency: &Currency) -> Self {
        match product.price_display() {
            PriceDisplay::Sale { sale, original } => Self {
                current: currency.format(sale),
                original: Some(currency.format(original)),
                badge: product.discount_percent().map(|p| format!("-{p}%")),
            },
            PriceDisplay::Regular(price) => Self {
                current: currency.format(price),
                original: None,
                badge: None,
            },
        }
    }
}

/// Product card display data for templates.
#[derive(Clone)]
pub struct ProductCardView {
    pub slug: String,
    pub url: String,
    pub name: String,
    pub category: Option<String>,
    pub image: Option<String>,
    pub price: PriceView,
    pub in_stock: bool,
    /// Show the add-to-cart form.
    pub can_add: bool,
    /// Show a "select options" link to the detail page.
    pub needs_options: bool,
    pub stars: Vec<&'static str>,
    pub rating_count: u32,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, store: &StoreView, currency: &Currency, media: &Url) -> Self {
        let action = product.card_action();
        Self {
            slug: product.slug.clone(),
            url: format!(
                "{}/products/{}",
                store.base_path,
                urlencoding::encode(&product.slug)
            ),
            name: product.name.clone(),
            category: product.category.clone(),
            image: product.image.as_deref().map(|p| media_url(media, p)),
            price: PriceView::new(product, currency),
            in_stock: product.is_in_stock(),
            can_add: action == CardAction::AddToCart,
            needs_options: action == CardAction::SelectOptions,
            stars: star_classes(product.rating.as_ref()),
            rating_count: product.rating.map_or(0, |r| r.count),
        }
    }

    #[must_use]
    pub fn list(products: &[Product], store: &StoreView, currency: &Currency, media: &Url) -> Vec<Self> {
        products
            .iter()
            .map(|p| Self::new(p, store, currency, media))
            .collect()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub line_id: String,
    pub url: String,
    pub name: String,
    pub variant_name: Option<String>,
    pub quantity: u32,
    pub max_quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image: Option<String>,
}

impl CartItemView {
    fn new(item: &CartItem, store: &StoreView, currency: &Currency, media: &Url) -> Self {
        Self {
            line_id: item.line_id(),
            url: format!(
                "{}/products/{}",
                store.base_path,
                urlencoding::encode(&item.slug)
            ),
            name: item.name.clone(),
            variant_name: item.variant_name.clone(),
            quantity: item.quantity,
            max_quantity: item.max_quantity,
            price: currency.format(item.unit_price),
            line_price: currency.format(item.line_total()),
            image: item.image.as_deref().map(|p| media_url(media, p)),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, store: &StoreView, currency: &Currency, media: &Url) -> Self {
        Self {
            items: cart
                .items()
                .iter()
                .map(|item| CartItemView::new(item, store, currency, media))
                .collect(),
            subtotal: currency.format(cart.subtotal()),
            item_count: cart.item_count(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Order Summary
// =============================================================================

/// Summary panel display data.
#[derive(Clone)]
pub struct SummaryView {
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping: String,
    pub tax: Option<String>,
    pub total: String,
    pub coupon_code: Option<String>,
    /// e.g. "Add $12.00 more for free shipping"
    pub free_shipping_hint: Option<String>,
}

impl SummaryView {
    #[must_use]
    pub fn new(
        summary: &CartSummary,
        method: Option<&ShippingMethod>,
        coupon_code: Option<&str>,
        currency: &Currency,
    ) -> Self {
        let shipping = match method {
            None => "Select a method".to_string(),
            Some(_) if summary.shipping.is_zero() => "Free".to_string(),
            Some(_) => currency.format(summary.shipping),
        };
        Self {
            subtotal: currency.format(summary.subtotal),
            discount: (summary.discount > Decimal::ZERO)
                .then(|| currency.format(-summary.discount)),
            shipping,
            tax: (summary.tax > Decimal::ZERO).then(|| currency.format(summary.tax)),
            total: currency.format(summary.total),
            coupon_code: coupon_code.map(str::to_string),
            free_shipping_hint: method
                .and_then(|m| m.remaining_for_free(summary.subtotal))
                .map(|remaining| {
                    format!("Add {} more for free shipping", currency.format(remaining))
                }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vitrine_core::types::{ProductId, StoreId};
    use vitrine_core::{CouponState, ShippingKind, types::ShippingMethodId};

    use super::*;

    fn media() -> Url {
        Url::parse("https://api.shop.test/storage/").unwrap()
    }

    fn store() -> StoreView {
        let props = StoreProps {
            id: StoreId::new(1),
            slug: "maison".to_string(),
            name: "Maison".to_string(),
            theme: "watches".to_string(),
            currency: Currency::default(),
            tax_rate: None,
            logo: Some("logos/m.png".to_string()),
            banner: None,
            description: Some("  ".to_string()),
            pages: Vec::new(),
        };
        StoreView::new(&props, &media(), 2)
    }

    fn product() -> Product {
        Product {
            id: ProductId::new(4),
            slug: "chrono".to_string(),
            name: "Chrono".to_string(),
            description: String::new(),
            price: Decimal::new(200, 0),
            sale_price: Some(Decimal::new(150, 0)),
            stock: 1,
            is_active: true,
            image: Some("https://cdn.test/chrono.jpg".to_string()),
            gallery: Vec::new(),
            variants: Vec::new(),
            rating: Some(Rating {
                average: Decimal::new(44, 1),
                count: 9,
            }),
            category: None,
        }
    }

    #[test]
    fn test_store_view() {
        let view = store();
        assert_eq!(view.base_path, "/maison");
        assert_eq!(view.theme_class, "theme-watches");
        assert_eq!(view.logo.as_deref(), Some("https://api.shop.test/storage/logos/m.png"));
        assert!(view.description.is_none());
    }

    #[test]
    fn test_media_url() {
        assert_eq!(media_url(&media(), "/static/x.png"), "/static/x.png");
        assert_eq!(media_url(&media(), "p/1.jpg"), "https://api.shop.test/storage/p/1.jpg");
    }

    #[test]
    fn test_sale_card() {
        let card = ProductCardView::new(&product(), &store(), &Currency::default(), &media());
        assert_eq!(card.price.current, "$150.00");
        assert_eq!(card.price.original.as_deref(), Some("$200.00"));
        assert_eq!(card.price.badge.as_deref(), Some("-25%"));
        assert!(card.can_add);
        assert!(!card.needs_options);
        assert_eq!(card.url, "/maison/products/chrono");
        assert_eq!(card.stars, ["full", "full", "full", "full", "half"]);
    }

    #[test]
    fn test_out_of_stock_card_has_no_action() {
        let mut product = product();
        product.stock = 0;
        product.sale_price = None;
        let card = ProductCardView::new(&product, &store(), &Currency::default(), &media());
        assert!(!card.in_stock);
        assert!(!card.can_add);
        assert!(!card.needs_options);
        assert!(card.price.original.is_none());
    }

    #[test]
    fn test_summary_view() {
        let method = ShippingMethod {
            id: ShippingMethodId::new(1),
            name: "Free over 50".to_string(),
            kind: ShippingKind::FreeShipping,
            cost: Decimal::new(10, 0),
            handling_fee: Decimal::ZERO,
            min_order_amount: Some(Decimal::new(50, 0)),
            description: None,
        };
        let mut coupon = CouponState::default();
        coupon.apply("SAVE10".to_string(), Decimal::new(10, 0)).unwrap();

        let summary = CartSummary::compute(Decimal::new(100, 0), Some(&method), &coupon, None);
        let view = SummaryView::new(&summary, Some(&method), coupon.code(), &Currency::default());
        assert_eq!(view.shipping, "Free");
        assert_eq!(view.discount.as_deref(), Some("-$10.00"));
        assert_eq!(view.total, "$90.00");
        assert!(view.tax.is_none());
        assert!(view.free_shipping_hint.is_none());

        let small = CartSummary::compute(Decimal::new(30, 0), Some(&method), &CouponState::None, None);
        let view = SummaryView::new(&small, Some(&method), None, &Currency::default());
        assert_eq!(view.shipping, "$10.00");
        assert_eq!(
            view.free_shipping_hint.as_deref(),
            Some("Add $20.00 more for free shipping")
        );
    }
}
