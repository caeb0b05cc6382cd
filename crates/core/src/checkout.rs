//! The checkout step flow: shipping → review → payment.
//!
//! Steps only move forward through their own validation and only move back
//! one at a time. There is no terminal step; a placed order leaves the flow
//! through a redirect.
//!
//! ```
//! use vitrine_core::checkout::{CheckoutState, CheckoutStep};
//!
//! let mut checkout = CheckoutState::default();
//! assert_eq!(checkout.step(), CheckoutStep::Shipping);
//! checkout.back();
//! assert_eq!(checkout.step(), CheckoutStep::Shipping);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::cart::Cart;
use crate::coupon::CouponState;
use crate::payment::{EnabledPaymentMethods, PaymentMethod};
use crate::pricing::CartSummary;
use crate::shipping::{ShippingMethod, find_method};
use crate::types::{Email, Phone, ShippingMethodId};

/// A stage of the checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    #[default]
    Shipping,
    Review,
    Payment,
}

impl CheckoutStep {
    pub const ALL: [Self; 3] = [Self::Shipping, Self::Review, Self::Payment];

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Shipping => Some(Self::Review),
            Self::Review => Some(Self::Payment),
            Self::Payment => None,
        }
    }

    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Shipping => None,
            Self::Review => Some(Self::Shipping),
            Self::Payment => Some(Self::Review),
        }
    }

    /// 1-based position for progress indicators.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Shipping => 1,
            Self::Review => 2,
            Self::Payment => 3,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shipping => "Shipping",
            Self::Review => "Review",
            Self::Payment => "Payment",
        }
    }

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Shipping => "shipping",
            Self::Review => "review",
            Self::Payment => "payment",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Validation messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn into_result(self) -> Result<(), CheckoutError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::Invalid(self))
        }
    }
}

/// Why a checkout operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("please correct the {} highlighted field(s)", .0.len())]
    Invalid(FieldErrors),
    #[error("expected the {expected} step but checkout is at {current}")]
    OutOfOrder {
        expected: CheckoutStep,
        current: CheckoutStep,
    },
}

impl CheckoutError {
    /// Field errors, if this is a validation failure.
    #[must_use]
    pub const fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            Self::OutOfOrder { .. } => None,
        }
    }
}

/// Buyer contact fields, kept as typed so the form can be re-rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: String,
    pub phone: String,
}

/// Everything collected on the shipping step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub contact: ContactDetails,
    pub shipping_address: Address,
    pub billing_same_as_shipping: bool,
    pub billing_address: Address,
    pub shipping_method_id: Option<ShippingMethodId>,
    pub notes: String,
}

impl Default for ShippingDetails {
    fn default() -> Self {
        Self {
            contact: ContactDetails::default(),
            shipping_address: Address::default(),
            billing_same_as_shipping: true,
            billing_address: Address::default(),
            shipping_method_id: None,
            notes: String::new(),
        }
    }
}

/// What the buyer submitted on the payment step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentDetails {
    /// Raw payment method slug from the form.
    pub method: Option<String>,
    pub has_receipt: bool,
    pub accepted_terms: bool,
}

/// Checkout progress for one store, persisted between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutState {
    step: CheckoutStep,
    pub details: ShippingDetails,
    pub coupon: CouponState,
    pub payment_method: Option<PaymentMethod>,
}

impl CheckoutState {
    /// Start a checkout with prefilled shipping details (e.g. the buyer's
    /// saved address).
    #[must_use]
    pub fn with_details(details: ShippingDetails) -> Self {
        Self {
            details,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    fn expect_step(&self, expected: CheckoutStep) -> Result<(), CheckoutError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(CheckoutError::OutOfOrder {
                expected,
                current: self.step,
            })
        }
    }

    /// Submit the shipping step. The details are kept even when invalid so
    /// the form can be shown again with the buyer's input.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Invalid`] with one entry per failing field, or
    /// [`CheckoutError::OutOfOrder`] if checkout is not at the shipping step.
    pub fn submit_shipping(
        &mut self,
        details: ShippingDetails,
        methods: &[ShippingMethod],
    ) -> Result<(), CheckoutError> {
        self.expect_step(CheckoutStep::Shipping)?;
        self.details = details;
        validate_shipping(&self.details, methods).into_result()?;
        self.step = CheckoutStep::Review;
        Ok(())
    }

    /// Confirm the review step.
    ///
    /// # Errors
    ///
    /// Fails if the cart is empty, the chosen shipping method disappeared, or
    /// checkout is not at the review step.
    pub fn confirm_review(
        &mut self,
        cart: &Cart,
        methods: &[ShippingMethod],
    ) -> Result<(), CheckoutError> {
        self.expect_step(CheckoutStep::Review)?;
        let mut errors = FieldErrors::new();
        if cart.is_empty() {
            errors.insert("cart", "Your cart is empty.");
        }
        if self.selected_method(methods).is_none() {
            errors.insert("shipping_method", "Please choose a shipping method.");
        }
        errors.into_result()?;
        self.step = CheckoutStep::Payment;
        Ok(())
    }

    /// React to the cart changing under an open checkout.
    ///
    /// The applied coupon was validated against the old subtotal, so it is
    /// dropped and the buyer starts over from the shipping step. Details are
    /// kept.
    pub fn cart_changed(&mut self) {
        self.coupon = CouponState::None;
        self.payment_method = None;
        self.step = CheckoutStep::Shipping;
    }

    /// Go back one step. No-op on the first step.
    pub fn back(&mut self) {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
    }

    /// Change the shipping method from the summary panel.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Invalid`] if the method is not offered.
    pub fn select_shipping_method(
        &mut self,
        id: ShippingMethodId,
        methods: &[ShippingMethod],
    ) -> Result<(), CheckoutError> {
        if find_method(methods, id).is_none() {
            let mut errors = FieldErrors::new();
            errors.insert("shipping_method", "Please choose a shipping method.");
            return Err(CheckoutError::Invalid(errors));
        }
        self.details.shipping_method_id = Some(id);
        Ok(())
    }

    /// Validate the payment step and return the chosen method.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Invalid`] if no enabled method is chosen, a required
    /// receipt is missing or the terms were not accepted.
    pub fn submit_payment(
        &mut self,
        payment: &PaymentDetails,
        enabled: &EnabledPaymentMethods,
    ) -> Result<PaymentMethod, CheckoutError> {
        self.expect_step(CheckoutStep::Payment)?;

        let mut errors = FieldErrors::new();
        let method = payment
            .method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .and_then(|m| m.parse::<PaymentMethod>().ok())
            .filter(|m| enabled.is_enabled(*m));

        match method {
            None => errors.insert("payment_method", "Please choose a payment method."),
            Some(m) if m.requires_receipt() && !payment.has_receipt => {
                errors.insert("receipt", "Please attach your payment receipt.");
            }
            Some(_) => {}
        }
        if !payment.accepted_terms {
            errors.insert("terms", "Please accept the terms and conditions.");
        }

        self.payment_method = method;
        errors.into_result()?;
        method.ok_or_else(|| CheckoutError::Invalid(FieldErrors::new()))
    }

    #[must_use]
    pub fn selected_method<'a>(&self, methods: &'a [ShippingMethod]) -> Option<&'a ShippingMethod> {
        self.details
            .shipping_method_id
            .and_then(|id| find_method(methods, id))
    }

    /// The address to bill: the shipping address unless a separate one was given.
    #[must_use]
    pub const fn billing_address(&self) -> &Address {
        if self.details.billing_same_as_shipping {
            &self.details.shipping_address
        } else {
            &self.details.billing_address
        }
    }

    #[must_use]
    pub fn summary(
        &self,
        cart: &Cart,
        methods: &[ShippingMethod],
        tax_rate: Option<Decimal>,
    ) -> CartSummary {
        CartSummary::compute(
            cart.subtotal(),
            self.selected_method(methods),
            &self.coupon,
            tax_rate,
        )
    }
}

fn require(errors: &mut FieldErrors, field: &str, value: &str, label: &str) -> bool {
    if value.trim().is_empty() {
        errors.insert(field, format!("{label} is required."));
        false
    } else {
        true
    }
}

fn validate_address(errors: &mut FieldErrors, address: &Address, prefix: &str) {
    let key = |name: &str| format!("{prefix}{name}");
    require(errors, &key("first_name"), &address.first_name, "First name");
    require(errors, &key("last_name"), &address.last_name, "Last name");
    require(errors, &key("address"), &address.address, "Address");
    require(errors, &key("postal_code"), &address.postal_code, "Postal code");
    let location = &address.location;
    if location.country_id.is_none() {
        errors.insert(key("country"), "Country is required.");
    }
    if location.state_id.is_none() {
        errors.insert(key("state"), "State is required.");
    }
    if location.city_id.is_none() {
        errors.insert(key("city"), "City is required.");
    }
}

/// Synchronous checks for the shipping step. Empty means valid.
#[must_use]
pub fn validate_shipping(details: &ShippingDetails, methods: &[ShippingMethod]) -> FieldErrors {
    let mut errors = FieldErrors::new();

    validate_address(&mut errors, &details.shipping_address, "");

    if require(&mut errors, "email", &details.contact.email, "Email")
        && Email::parse(&details.contact.email).is_err()
    {
        errors.insert("email", "Please enter a valid email address.");
    }
    if require(&mut errors, "phone", &details.contact.phone, "Phone")
        && Phone::parse(&details.contact.phone).is_err()
    {
        errors.insert("phone", "Please enter a valid phone number.");
    }

    let method_known = details
        .shipping_method_id
        .is_some_and(|id| find_method(methods, id).is_some());
    if !method_known {
        errors.insert("shipping_method", "Please choose a shipping method.");
    }

    if !details.billing_same_as_shipping {
        validate_address(&mut errors, &details.billing_address, "billing_");
    }

    errors
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::address::LocationSelection;
    use crate::cart::CartItem;
    use crate::catalog::Product;
    use crate::shipping::ShippingKind;
    use crate::types::{CityId, CountryId, ProductId, StateId};

    fn methods() -> Vec<ShippingMethod> {
        vec![ShippingMethod {
            id: ShippingMethodId::new(5),
            name: "Courier".to_string(),
            kind: ShippingKind::FlatRate,
            cost: Decimal::new(5, 0),
            handling_fee: Decimal::ZERO,
            min_order_amount: None,
            description: None,
        }]
    }

    fn address() -> Address {
        Address {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            address: "1 Navy Way".to_string(),
            postal_code: "22202".to_string(),
            location: LocationSelection {
                country_id: Some(CountryId::new(1)),
                country_name: "United States".to_string(),
                state_id: Some(StateId::new(2)),
                state_name: "Virginia".to_string(),
                city_id: Some(CityId::new(3)),
                city_name: "Arlington".to_string(),
            },
        }
    }

    fn valid_details() -> ShippingDetails {
        ShippingDetails {
            contact: ContactDetails {
                email: "grace@navy.example".to_string(),
                phone: "+1 703 555 0100".to_string(),
            },
            shipping_address: address(),
            shipping_method_id: Some(ShippingMethodId::new(5)),
            ..ShippingDetails::default()
        }
    }

    fn cart() -> Cart {
        let product = Product {
            id: ProductId::new(1),
            slug: "mug".to_string(),
            name: "Mug".to_string(),
            description: String::new(),
            price: Decimal::new(12, 0),
            sale_price: None,
            stock: 10,
            is_active: true,
            image: None,
            gallery: Vec::new(),
            variants: Vec::new(),
            rating: None,
            category: None,
        };
        let mut cart = Cart::new();
        cart.add(CartItem::from_product(&product, None, 1).unwrap())
            .unwrap();
        cart
    }

    fn at_payment() -> CheckoutState {
        let mut checkout = CheckoutState::default();
        checkout.submit_shipping(valid_details(), &methods()).unwrap();
        checkout.confirm_review(&cart(), &methods()).unwrap();
        checkout
    }

    fn enabled() -> EnabledPaymentMethods {
        [PaymentMethod::Stripe, PaymentMethod::BankTransfer]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_valid_shipping_advances() {
        let mut checkout = CheckoutState::default();
        checkout.submit_shipping(valid_details(), &methods()).unwrap();
        assert_eq!(checkout.step(), CheckoutStep::Review);
    }

    #[test]
    fn test_any_empty_required_field_blocks() {
        type Blank = fn(&mut ShippingDetails);
        let blanks: [(&str, Blank); 10] = [
            ("first_name", |d| d.shipping_address.first_name.clear()),
            ("last_name", |d| d.shipping_address.last_name = "  ".to_string()),
            ("email", |d| d.contact.email.clear()),
            ("phone", |d| d.contact.phone.clear()),
            ("address", |d| d.shipping_address.address.clear()),
            ("postal_code", |d| d.shipping_address.postal_code.clear()),
            ("country", |d| d.shipping_address.location = LocationSelection::default()),
            ("state", |d| d.shipping_address.location.select_state(None, "")),
            ("city", |d| d.shipping_address.location.select_city(None, "")),
            ("shipping_method", |d| d.shipping_method_id = None),
        ];
        for (field, blank) in blanks {
            let mut details = valid_details();
            blank(&mut details);
            let mut checkout = CheckoutState::default();
            let err = checkout.submit_shipping(details, &methods()).unwrap_err();
            let errors = err.field_errors().unwrap();
            assert!(!errors.is_empty());
            assert!(errors.contains(field), "missing error for {field}");
            assert_eq!(checkout.step(), CheckoutStep::Shipping);
        }
    }

    #[test]
    fn test_invalid_email_and_phone_shapes() {
        let mut details = valid_details();
        details.contact.email = "grace@navy".to_string();
        details.contact.phone = "call me".to_string();
        let errors = validate_shipping(&details, &methods());
        assert_eq!(errors.get("email"), Some("Please enter a valid email address."));
        assert_eq!(errors.get("phone"), Some("Please enter a valid phone number."));
    }

    #[test]
    fn test_invalid_input_is_kept() {
        let mut details = valid_details();
        details.contact.email = "nope".to_string();
        let mut checkout = CheckoutState::default();
        assert!(checkout.submit_shipping(details, &methods()).is_err());
        assert_eq!(checkout.details.contact.email, "nope");
    }

    #[test]
    fn test_unknown_shipping_method_rejected() {
        let mut details = valid_details();
        details.shipping_method_id = Some(ShippingMethodId::new(404));
        assert!(validate_shipping(&details, &methods()).contains("shipping_method"));
    }

    #[test]
    fn test_separate_billing_validated() {
        let mut details = valid_details();
        details.billing_same_as_shipping = false;
        let errors = validate_shipping(&details, &methods());
        assert!(errors.contains("billing_first_name"));
        assert!(errors.contains("billing_country"));
        assert!(!errors.contains("first_name"));

        details.billing_address = address();
        assert!(validate_shipping(&details, &methods()).is_empty());
    }

    #[test]
    fn test_billing_defaults_to_shipping() {
        let checkout = CheckoutState::with_details(valid_details());
        assert_eq!(checkout.billing_address(), &address());
    }

    #[test]
    fn test_review_requires_items() {
        let mut checkout = CheckoutState::default();
        checkout.submit_shipping(valid_details(), &methods()).unwrap();
        let err = checkout.confirm_review(&Cart::new(), &methods()).unwrap_err();
        assert!(err.field_errors().unwrap().contains("cart"));
        assert_eq!(checkout.step(), CheckoutStep::Review);
    }

    #[test]
    fn test_no_skipping() {
        let mut checkout = CheckoutState::default();
        let err = checkout.confirm_review(&cart(), &methods()).unwrap_err();
        assert_eq!(
            err,
            CheckoutError::OutOfOrder {
                expected: CheckoutStep::Review,
                current: CheckoutStep::Shipping
            }
        );
        let payment = PaymentDetails {
            method: Some("stripe".to_string()),
            has_receipt: false,
            accepted_terms: true,
        };
        assert!(matches!(
            checkout.submit_payment(&payment, &enabled()),
            Err(CheckoutError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn test_back_transitions() {
        let mut checkout = at_payment();
        assert_eq!(checkout.step(), CheckoutStep::Payment);
        checkout.back();
        assert_eq!(checkout.step(), CheckoutStep::Review);
        checkout.back();
        assert_eq!(checkout.step(), CheckoutStep::Shipping);
        checkout.back();
        assert_eq!(checkout.step(), CheckoutStep::Shipping);
    }

    #[test]
    fn test_payment_requires_enabled_method() {
        let mut checkout = at_payment();
        let payment = PaymentDetails {
            method: Some("paypal".to_string()),
            has_receipt: false,
            accepted_terms: true,
        };
        let err = checkout.submit_payment(&payment, &enabled()).unwrap_err();
        assert!(err.field_errors().unwrap().contains("payment_method"));
    }

    #[test]
    fn test_bank_transfer_requires_receipt() {
        let mut checkout = at_payment();
        let mut payment = PaymentDetails {
            method: Some("bank_transfer".to_string()),
            has_receipt: false,
            accepted_terms: true,
        };
        let err = checkout.submit_payment(&payment, &enabled()).unwrap_err();
        assert!(err.field_errors().unwrap().contains("receipt"));

        payment.has_receipt = true;
        assert_eq!(
            checkout.submit_payment(&payment, &enabled()).unwrap(),
            PaymentMethod::BankTransfer
        );
        assert_eq!(checkout.payment_method, Some(PaymentMethod::BankTransfer));
    }

    #[test]
    fn test_terms_required() {
        let mut checkout = at_payment();
        let payment = PaymentDetails {
            method: Some("stripe".to_string()),
            has_receipt: false,
            accepted_terms: false,
        };
        let err = checkout.submit_payment(&payment, &enabled()).unwrap_err();
        assert!(err.field_errors().unwrap().contains("terms"));
    }

    #[test]
    fn test_select_shipping_method() {
        let mut checkout = CheckoutState::default();
        assert!(
            checkout
                .select_shipping_method(ShippingMethodId::new(9), &methods())
                .is_err()
        );
        checkout
            .select_shipping_method(ShippingMethodId::new(5), &methods())
            .unwrap();
        let summary = checkout.summary(&cart(), &methods(), None);
        assert_eq!(summary.shipping, Decimal::new(5, 0));
        assert_eq!(summary.total, Decimal::new(17, 0));
    }

    #[test]
    fn test_cart_change_drops_coupon_and_restarts() {
        let mut checkout = at_payment();
        checkout.coupon = CouponState::Applied {
            code: "SAVE10".to_string(),
            discount: Decimal::new(10, 0),
        };
        checkout.cart_changed();
        assert_eq!(checkout.step(), CheckoutStep::Shipping);
        assert_eq!(checkout.coupon, CouponState::None);
        assert_eq!(checkout.payment_method, None);
        assert_eq!(checkout.details, valid_details());
    }

    #[test]
    fn test_shrunk_cart_never_totals_negative() {
        let lamp = Product {
            id: ProductId::new(2),
            slug: "lamp".to_string(),
            name: "Lamp".to_string(),
            description: String::new(),
            price: Decimal::new(50, 0),
            sale_price: None,
            stock: 5,
            is_active: true,
            image: None,
            gallery: Vec::new(),
            variants: Vec::new(),
            rating: None,
            category: None,
        };
        let mut cart = Cart::new();
        cart.add(CartItem::from_product(&lamp, None, 2).unwrap())
            .unwrap();
        let checkout = CheckoutState {
            coupon: CouponState::Applied {
                code: "BIG60".to_string(),
                discount: Decimal::new(60, 0),
            },
            ..CheckoutState::default()
        };
        cart.set_quantity("2", 1).unwrap();

        let summary = checkout.summary(&cart, &methods(), None);
        assert_eq!(summary.subtotal, Decimal::new(50, 0));
        assert_eq!(summary.discount, Decimal::new(50, 0));
        assert!(summary.total >= Decimal::ZERO);
    }
}
