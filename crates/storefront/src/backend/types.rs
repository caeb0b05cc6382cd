//! Page props and request bodies exchanged with the commerce backend.
//!
//! Domain types from `vitrine-core` are deserialized directly where the wire
//! shape matches; the types here wrap them with the page-level metadata.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vitrine_core::{
    Address, ContactDetails, Country, Currency, EnabledPaymentMethods, LocationSelection, Product,
    ShippingDetails, ShippingMethod,
    types::{CityId, CountryId, ShippingMethodId, StateId, StoreId, Theme},
};

/// Store metadata shared by every page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreProps {
    pub id: StoreId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub currency: Currency,
    /// Percentage tax rate applied at checkout.
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Custom pages linked from the footer.
    #[serde(default)]
    pub pages: Vec<PageLink>,
}

impl StoreProps {
    #[must_use]
    pub fn theme(&self) -> Theme {
        Theme::from_slug_or_default(&self.theme)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageLink {
    pub title: String,
    pub url: String,
}

/// Sort orders for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

impl ProductSort {
    pub const ALL: [Self; 3] = [Self::Newest, Self::PriceAsc, Self::PriceDesc];

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
        }
    }

    /// Parse a query-string value, falling back to newest.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        Self::ALL
            .into_iter()
            .find(|sort| Some(sort.slug()) == value)
            .unwrap_or_default()
    }
}

/// Parameters for a product listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub page: u32,
    pub sort: ProductSort,
    pub featured: bool,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 1,
            sort: ProductSort::Newest,
            featured: false,
        }
    }
}

const fn first_page() -> u32 {
    1
}

/// One page of a product listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub data: Vec<Product>,
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default = "first_page")]
    pub last_page: u32,
    #[serde(default)]
    pub total: u64,
}

impl ProductPage {
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.current_page > 1
    }
}

/// Product detail page props.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductDetail {
    pub product: Product,
    #[serde(default)]
    pub related: Vec<Product>,
}

/// Saved buyer details used to prefill the shipping step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CustomerDefaults {
    pub email: String,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub postal_code: String,
    pub country_id: Option<CountryId>,
    pub state_id: Option<StateId>,
    pub city_id: Option<CityId>,
}

impl CustomerDefaults {
    /// Shipping details to start a checkout with. Location names are filled
    /// in once the option lists are loaded.
    #[must_use]
    pub fn to_details(&self) -> ShippingDetails {
        ShippingDetails {
            contact: ContactDetails {
                email: self.email.clone(),
                phone: self.phone.clone(),
            },
            shipping_address: Address {
                first_name: self.first_name.clone(),
                last_name: self.last_name.clone(),
                address: self.address.clone(),
                postal_code: self.postal_code.clone(),
                location: LocationSelection {
                    country_id: self.country_id,
                    state_id: self.state_id,
                    city_id: self.city_id,
                    ..LocationSelection::default()
                },
            },
            ..ShippingDetails::default()
        }
    }
}

/// Checkout page props. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutProps {
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethod>,
    /// Payment method slug to enabled flag.
    #[serde(default)]
    pub payment_methods: BTreeMap<String, bool>,
    #[serde(default)]
    pub countries: Vec<Country>,
    #[serde(default)]
    pub customer: Option<CustomerDefaults>,
    pub csrf_token: String,
    /// Instructions shown for bank transfers.
    #[serde(default)]
    pub bank_details: Option<String>,
    #[serde(default)]
    pub terms_url: Option<String>,
}

impl CheckoutProps {
    #[must_use]
    pub fn enabled_payment_methods(&self) -> EnabledPaymentMethods {
        EnabledPaymentMethods::from_flags(&self.payment_methods)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponRequest<'a> {
    pub store_id: StoreId,
    pub code: &'a str,
    pub shipping_method_id: Option<ShippingMethodId>,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CouponResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub message: Option<String>,
}

/// Answer to a payment initialization or an order submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaymentResponse {
    pub success: bool,
    pub order_number: Option<String>,
    pub redirect_url: Option<String>,
    pub message: Option<String>,
}

/// Error body returned alongside 4xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.trim().is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vitrine_core::PaymentMethod;

    #[test]
    fn test_store_props_fixture() {
        let json = r#"{
            "id": 7,
            "slug": "maison",
            "name": "Maison",
            "theme": "jewelry",
            "currency": {"code": "EUR", "symbol": "€", "symbol_position": "after"},
            "tax_rate": "20",
            "pages": [{"title": "About", "url": "https://maison.test/about"}]
        }"#;
        let props: StoreProps = serde_json::from_str(json).unwrap();
        assert_eq!(props.theme(), Theme::Jewelry);
        assert_eq!(props.tax_rate, Some(Decimal::new(20, 0)));
        assert_eq!(props.currency.format(Decimal::new(5, 0)), "5.00 €");
        assert_eq!(props.pages.len(), 1);
    }

    #[test]
    fn test_store_props_defaults() {
        let props: StoreProps =
            serde_json::from_str(r#"{"id": 1, "slug": "a", "name": "A", "theme": "neon"}"#)
                .unwrap();
        assert_eq!(props.theme(), Theme::Default);
        assert_eq!(props.currency, Currency::default());
        assert!(props.tax_rate.is_none());
    }

    #[test]
    fn test_product_page_fixture() {
        let json = r#"{
            "data": [{"id": 1, "slug": "mug", "name": "Mug", "price": "12.00", "stock": 3}],
            "current_page": 2,
            "last_page": 2,
            "total": 13
        }"#;
        let page: ProductPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(page.has_previous());
        assert!(!page.has_next());
    }

    #[test]
    fn test_checkout_props_fixture() {
        let json = r#"{
            "shipping_methods": [
                {"id": 1, "name": "Standard", "type": "flat_rate", "cost": "10.00", "handling_fee": "2.00"}
            ],
            "payment_methods": {"cod": true, "stripe": false, "bank_transfer": true},
            "countries": [{"id": 1, "name": "Kenya"}],
            "customer": {"email": "a@b.co", "country_id": 1},
            "csrf_token": "abc"
        }"#;
        let props: CheckoutProps = serde_json::from_str(json).unwrap();
        let enabled = props.enabled_payment_methods();
        assert!(enabled.is_enabled(PaymentMethod::CashOnDelivery));
        assert!(!enabled.is_enabled(PaymentMethod::Stripe));

        let details = props.customer.unwrap().to_details();
        assert_eq!(details.contact.email, "a@b.co");
        assert_eq!(
            details.shipping_address.location.country_id,
            Some(CountryId::new(1))
        );
        assert!(details.billing_same_as_shipping);
    }

    #[test]
    fn test_sort_param() {
        assert_eq!(ProductSort::from_param(Some("price_desc")), ProductSort::PriceDesc);
        assert_eq!(ProductSort::from_param(Some("bogus")), ProductSort::Newest);
        assert_eq!(ProductSort::from_param(None), ProductSort::Newest);
    }

    #[test]
    fn test_payment_response_defaults() {
        let response: PaymentResponse =
            serde_json::from_str(r#"{"success": true, "order_number": "ORD-9"}"#).unwrap();
        assert!(response.success);
        assert_eq!(response.order_number.as_deref(), Some("ORD-9"));
        assert!(response.redirect_url.is_none());
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"error": "Coupon expired"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Coupon expired"));
    }
}
