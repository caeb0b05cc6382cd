//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::config::StorefrontConfig;
use crate::payments::PaymentHandlers;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    payments: PaymentHandlers,
}

impl AppState {
    /// Create a new application state with backend-driven payment handlers.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        let payments = PaymentHandlers::backend(&backend);
        Ok(Self::with_payments(config, backend, payments))
    }

    /// Create a state with explicit payment handlers.
    #[must_use]
    pub fn with_payments(
        config: StorefrontConfig,
        backend: BackendClient,
        payments: PaymentHandlers,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                payments,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the commerce backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get the registered hosted payment handlers.
    #[must_use]
    pub fn payments(&self) -> &PaymentHandlers {
        &self.inner.payments
    }
}
