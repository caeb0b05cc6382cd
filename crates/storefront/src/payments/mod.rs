//! Payment dispatch.
//!
//! Every order attempt takes exactly one path, chosen by the payment method:
//!
//! - hosted provider: a [`PaymentHandler`] returns an order number or a
//!   provider redirect
//! - form post: an auto-submitting [`HiddenForm`] posts to the backend
//! - multipart: the order and its receipt are posted directly with an
//!   `X-CSRF-TOKEN` header
//!
//! Failures collapse into one buyer-facing message. Nothing is retried.

pub mod form_post;
pub mod hosted;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use vitrine_core::{HostedProvider, OrderPayload, SubmissionStrategy};

use crate::backend::types::PaymentResponse;
use crate::backend::{Attachment, BackendClient, BackendError};
use crate::config::StorefrontConfig;

pub use form_post::HiddenForm;
pub use hosted::BackendPaymentHandler;

const GENERIC_FAILURE: &str = "We could not complete your order. Please try again.";

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The provider or backend declined the order.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// No handler is registered for the provider.
    #[error("No payment handler for {0:?}")]
    Unsupported(HostedProvider),

    /// A multipart order was attempted without its file.
    #[error("Payment receipt is missing")]
    MissingAttachment,

    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl PaymentError {
    /// The single message shown above the order summary.
    #[must_use]
    pub fn buyer_message(&self) -> String {
        match self {
            Self::Declined(message) => message.clone(),
            Self::MissingAttachment => "Please attach your payment receipt.".to_string(),
            Self::Backend(err) => err
                .buyer_message()
                .map_or_else(|| GENERIC_FAILURE.to_string(), str::to_string),
            Self::Unsupported(_) => GENERIC_FAILURE.to_string(),
        }
    }

    /// Whether this failure points at our side rather than the buyer's input.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Declined(_) | Self::MissingAttachment => false,
            Self::Unsupported(_) => true,
            Self::Backend(err) => !matches!(err, BackendError::Rejected(_)),
        }
    }
}

/// A successful payment step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The order exists; show the confirmation page.
    Completed { order_number: String },
    /// The buyer must continue at the provider.
    Redirect { url: String },
}

impl PaymentOutcome {
    /// Interpret a backend payment or order response.
    ///
    /// # Errors
    ///
    /// [`PaymentError::Declined`] when the backend reports failure or
    /// returns neither an order number nor a redirect.
    pub fn from_response(response: PaymentResponse) -> Result<Self, PaymentError> {
        if !response.success {
            return Err(PaymentError::Declined(
                response
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            ));
        }
        if let Some(url) = response.redirect_url.filter(|u| !u.is_empty()) {
            return Ok(Self::Redirect { url });
        }
        match response.order_number.filter(|n| !n.is_empty()) {
            Some(order_number) => Ok(Self::Completed { order_number }),
            None => {
                tracing::error!("Backend reported success without an order number");
                Err(PaymentError::Declined(GENERIC_FAILURE.to_string()))
            }
        }
    }
}

/// A hosted payment provider integration.
#[async_trait::async_trait]
pub trait PaymentHandler: Send + Sync {
    /// The provider this handler serves.
    fn provider(&self) -> HostedProvider;

    /// Run the provider flow for an assembled order.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] if the provider or backend refuses the order.
    async fn pay(&self, store: &str, payload: &OrderPayload) -> Result<PaymentOutcome, PaymentError>;
}

/// Registered hosted provider handlers.
#[derive(Clone, Default)]
pub struct PaymentHandlers {
    handlers: HashMap<HostedProvider, Arc<dyn PaymentHandler>>,
}

impl PaymentHandlers {
    /// Handlers for every hosted provider, all backed by the commerce backend.
    #[must_use]
    pub fn backend(client: &BackendClient) -> Self {
        let mut handlers = Self::default();
        for provider in [
            HostedProvider::Razorpay,
            HostedProvider::Paystack,
            HostedProvider::Flutterwave,
        ] {
            handlers.register(Arc::new(BackendPaymentHandler::new(provider, client.clone())));
        }
        handlers
    }

    /// Register a handler, replacing any previous one for its provider.
    pub fn register(&mut self, handler: Arc<dyn PaymentHandler>) {
        self.handlers.insert(handler.provider(), handler);
    }

    #[must_use]
    pub fn get(&self, provider: HostedProvider) -> Option<&Arc<dyn PaymentHandler>> {
        self.handlers.get(&provider)
    }
}

/// What the buyer's browser should do after placing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Navigate to this URL (confirmation page or provider checkout).
    Redirect(String),
    /// Render this form and submit it immediately.
    AutoSubmit(HiddenForm),
}

/// An order ready to be handed off.
#[derive(Debug)]
pub struct OrderSubmission<'a> {
    pub store: &'a str,
    pub payload: &'a OrderPayload,
    pub csrf_token: &'a str,
    pub attachment: Option<Attachment>,
}

/// Hand an order to the backend using the method's strategy.
///
/// # Errors
///
/// Returns a [`PaymentError`] if the chosen path fails.
#[instrument(skip_all, fields(store = %order.store, method = %order.payload.payment_method))]
pub async fn dispatch(
    handlers: &PaymentHandlers,
    backend: &BackendClient,
    config: &StorefrontConfig,
    order: OrderSubmission<'_>,
) -> Result<Submission, PaymentError> {
    let outcome = match order.payload.payment_method.strategy() {
        SubmissionStrategy::Provider(provider) => {
            let handler = handlers
                .get(provider)
                .ok_or(PaymentError::Unsupported(provider))?;
            handler.pay(order.store, order.payload).await?
        }
        SubmissionStrategy::FormPost => {
            let action = backend.orders_url(order.store)?;
            return Ok(Submission::AutoSubmit(HiddenForm::for_order(
                action,
                order.payload,
                order.csrf_token,
            )));
        }
        SubmissionStrategy::Multipart => {
            let attachment = order.attachment.ok_or(PaymentError::MissingAttachment)?;
            let response = backend
                .submit_order(order.store, order.payload, order.csrf_token, Some(attachment))
                .await?;
            PaymentOutcome::from_response(response)?
        }
    };

    Ok(match outcome {
        PaymentOutcome::Completed { order_number } => {
            tracing::info!(order_number = %order_number, "Order placed");
            Submission::Redirect(config.confirmation_url(order.store, &order_number))
        }
        PaymentOutcome::Redirect { url } => {
            tracing::info!("Redirecting buyer to payment provider");
            Submission::Redirect(url)
        }
    })
}
