//! The order payload sent to the backend when the buyer places an order.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::address::Address;
use crate::cart::{Cart, CartItem};
use crate::checkout::CheckoutState;
use crate::payment::PaymentMethod;
use crate::pricing::CartSummary;
use crate::types::{ProductId, ShippingMethodId, StoreId, VariantId};

/// A purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        let name = match &item.variant_name {
            Some(variant) => format!("{} ({variant})", item.name),
            None => item.name.clone(),
        };
        Self {
            product_id: item.product_id,
            variant_id: item.variant_id,
            name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total: item.line_total(),
        }
    }
}

/// Everything the backend needs to create an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPayload {
    pub store_id: StoreId,
    pub email: String,
    pub phone: String,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub shipping_method_id: Option<ShippingMethodId>,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderPayload {
    #[must_use]
    pub fn assemble(
        store_id: StoreId,
        cart: &Cart,
        checkout: &CheckoutState,
        payment_method: PaymentMethod,
        summary: &CartSummary,
    ) -> Self {
        let details = &checkout.details;
        let notes = details.notes.trim();
        Self {
            store_id,
            email: details.contact.email.trim().to_string(),
            phone: details.contact.phone.trim().to_string(),
            shipping_address: details.shipping_address.clone(),
            billing_address: checkout.billing_address().clone(),
            shipping_method_id: details.shipping_method_id,
            payment_method,
            coupon_code: checkout.coupon.code().map(str::to_string),
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            items: cart.items().iter().map(OrderLine::from).collect(),
            subtotal: summary.subtotal,
            discount: summary.discount,
            shipping_cost: summary.shipping,
            tax: summary.tax,
            total: summary.total,
        }
    }

    /// Flatten into bracketed form fields for form and multipart submissions,
    /// e.g. `items[0][product_id]`, `shipping[city_id]`.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("store_id".to_string(), self.store_id.to_string()),
            ("email".to_string(), self.email.clone()),
            ("phone".to_string(), self.phone.clone()),
            (
                "payment_method".to_string(),
                self.payment_method.slug().to_string(),
            ),
        ];

        push_address(&mut fields, "shipping", &self.shipping_address);
        push_address(&mut fields, "billing", &self.billing_address);

        if let Some(id) = self.shipping_method_id {
            fields.push(("shipping_method_id".to_string(), id.to_string()));
        }
        if let Some(code) = &self.coupon_code {
            fields.push(("coupon_code".to_string(), code.clone()));
        }
        if let Some(notes) = &self.notes {
            fields.push(("notes".to_string(), notes.clone()));
        }

        for (i, line) in self.items.iter().enumerate() {
            let key = |name: &str| format!("items[{i}][{name}]");
            fields.push((key("product_id"), line.product_id.to_string()));
            if let Some(variant) = line.variant_id {
                fields.push((key("variant_id"), variant.to_string()));
            }
            fields.push((key("quantity"), line.quantity.to_string()));
            fields.push((key("price"), line.unit_price.to_string()));
        }

        for (name, amount) in [
            ("subtotal", self.subtotal),
            ("discount", self.discount),
            ("shipping_cost", self.shipping_cost),
            ("tax", self.tax),
            ("total", self.total),
        ] {
            fields.push((name.to_string(), amount.to_string()));
        }

        fields
    }
}

fn push_address(fields: &mut Vec<(String, String)>, group: &str, address: &Address) {
    let mut push = |name: &str, value: String| {
        fields.push((format!("{group}[{name}]"), value));
    };
    push("first_name", address.first_name.trim().to_string());
    push("last_name", address.last_name.trim().to_string());
    push("address", address.address.trim().to_string());
    push("postal_code", address.postal_code.trim().to_string());
    let location = &address.location;
    if let Some(id) = location.country_id {
        push("country_id", id.to_string());
    }
    if let Some(id) = location.state_id {
        push("state_id", id.to_string());
    }
    if let Some(id) = location.city_id {
        push("city_id", id.to_string());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::address::LocationSelection;
    use crate::catalog::{Product, Variant};
    use crate::checkout::{ContactDetails, ShippingDetails};
    use crate::types::{CityId, CountryId, StateId};

    fn product() -> Product {
        Product {
            id: ProductId::new(3),
            slug: "tee".to_string(),
            name: "Tee".to_string(),
            description: String::new(),
            price: Decimal::new(20, 0),
            sale_price: None,
            stock: 10,
            is_active: true,
            image: None,
            gallery: Vec::new(),
            variants: vec![Variant {
                id: VariantId::new(30),
                name: "Large".to_string(),
                price: Some(Decimal::new(22, 0)),
                stock: 4,
            }],
            rating: None,
            category: None,
        }
    }

    fn checkout() -> CheckoutState {
        let mut checkout = CheckoutState::with_details(ShippingDetails {
            contact: ContactDetails {
                email: " ada@example.com ".to_string(),
                phone: "+44 20 7946 0000".to_string(),
            },
            shipping_address: Address {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                address: "12 St James's Square".to_string(),
                postal_code: "SW1Y 4JH".to_string(),
                location: LocationSelection {
                    country_id: Some(CountryId::new(44)),
                    country_name: "United Kingdom".to_string(),
                    state_id: Some(StateId::new(7)),
                    state_name: "England".to_string(),
                    city_id: Some(CityId::new(9)),
                    city_name: "London".to_string(),
                },
            },
            shipping_method_id: Some(ShippingMethodId::new(1)),
            notes: "   ".to_string(),
            ..ShippingDetails::default()
        });
        checkout.coupon.apply("SAVE5".to_string(), Decimal::new(5, 0)).unwrap();
        checkout
    }

    fn payload() -> OrderPayload {
        let mut cart = Cart::new();
        cart.add(CartItem::from_product(&product(), Some(VariantId::new(30)), 2).unwrap())
            .unwrap();
        let checkout = checkout();
        let summary = CartSummary::compute(cart.subtotal(), None, &checkout.coupon, None);
        OrderPayload::assemble(
            StoreId::new(1),
            &cart,
            &checkout,
            PaymentMethod::BankTransfer,
            &summary,
        )
    }

    #[test]
    fn test_assemble_copies_checkout() {
        let order = payload();
        assert_eq!(order.email, "ada@example.com");
        assert_eq!(order.billing_address, order.shipping_address);
        assert_eq!(order.coupon_code.as_deref(), Some("SAVE5"));
        assert_eq!(order.notes, None);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].name, "Tee (Large)");
        assert_eq!(order.items[0].total, Decimal::new(44, 0));
        assert_eq!(order.total, Decimal::new(39, 0));
    }

    #[test]
    fn test_form_fields_are_bracketed() {
        let fields = payload().form_fields();
        let get = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("payment_method"), Some("bank_transfer"));
        assert_eq!(get("items[0][product_id]"), Some("3"));
        assert_eq!(get("items[0][variant_id]"), Some("30"));
        assert_eq!(get("items[0][quantity]"), Some("2"));
        assert_eq!(get("shipping[city_id]"), Some("9"));
        assert_eq!(get("billing[first_name]"), Some("Ada"));
        assert_eq!(get("coupon_code"), Some("SAVE5"));
        assert_eq!(get("total"), Some("39"));
        assert_eq!(get("notes"), None);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(payload()).unwrap();
        assert_eq!(json["payment_method"], "bank_transfer");
        assert_eq!(json["shipping_address"]["city_name"], "London");
        assert_eq!(json["items"][0]["quantity"], 2);
    }
}
