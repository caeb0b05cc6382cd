//! Auto-submitting hidden form for payment methods the backend completes
//! itself.
//!
//! The buyer's browser performs a full POST navigation to the backend order
//! endpoint, so the backend's own CSRF token travels as the `_token` field.

use vitrine_core::OrderPayload;

/// Name of the CSRF field the backend expects in form posts.
pub const CSRF_FIELD: &str = "_token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenField {
    pub name: String,
    pub value: String,
}

/// A form rendered with hidden inputs only and submitted on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenForm {
    pub action: String,
    pub fields: Vec<HiddenField>,
}

impl HiddenForm {
    #[must_use]
    pub fn for_order(action: impl Into<String>, payload: &OrderPayload, csrf_token: &str) -> Self {
        let fields = std::iter::once((CSRF_FIELD.to_string(), csrf_token.to_string()))
            .chain(payload.form_fields())
            .map(|(name, value)| HiddenField { name, value })
            .collect();
        Self {
            action: action.into(),
            fields,
        }
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::payments::tests::sample_payload;

    #[test]
    fn test_form_carries_token_and_payload() {
        let payload = sample_payload(vitrine_core::PaymentMethod::CashOnDelivery);
        let form = HiddenForm::for_order("https://api.shop.test/api/stores/acme/orders", &payload, "csrf-123");

        assert_eq!(form.fields[0].name, "_token");
        assert_eq!(form.value("_token"), Some("csrf-123"));
        assert_eq!(form.value("payment_method"), Some("cod"));
        assert_eq!(form.value("items[0][quantity]"), Some("2"));
        assert_eq!(form.action, "https://api.shop.test/api/stores/acme/orders");
    }
}
