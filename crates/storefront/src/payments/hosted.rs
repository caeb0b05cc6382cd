//! Hosted provider flows (Razorpay, Paystack, Flutterwave).
//!
//! The backend owns the provider credentials; the storefront only asks it to
//! initialize a payment and follows the answer.

use vitrine_core::{HostedProvider, OrderPayload};

use super::{PaymentError, PaymentHandler, PaymentOutcome};
use crate::backend::BackendClient;

/// Provider handler that delegates to the backend's initialize endpoint.
#[derive(Clone)]
pub struct BackendPaymentHandler {
    provider: HostedProvider,
    client: BackendClient,
}

impl BackendPaymentHandler {
    #[must_use]
    pub const fn new(provider: HostedProvider, client: BackendClient) -> Self {
        Self { provider, client }
    }
}

#[async_trait::async_trait]
impl PaymentHandler for BackendPaymentHandler {
    fn provider(&self) -> HostedProvider {
        self.provider
    }

    async fn pay(&self, store: &str, payload: &OrderPayload) -> Result<PaymentOutcome, PaymentError> {
        let response = self
            .client
            .initialize_payment(store, self.provider, payload)
            .await?;
        PaymentOutcome::from_response(response)
    }
}
