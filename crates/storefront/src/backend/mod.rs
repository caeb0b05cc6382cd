//! Commerce backend REST client.
//!
//! # Architecture
//!
//! - The backend is the source of truth for stores, products, locations,
//!   coupons, payments and orders. Nothing is persisted locally.
//! - Plain JSON over `reqwest` with a bearer token.
//! - Store props, product pages and location lists are cached with `moka`.
//!   Checkout props and coupon checks always go to the backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use vitrine_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//! let store = client.store("maison").await?;
//! let page = client.products("maison", ProductQuery::default()).await?;
//! ```

mod cache;
pub mod types;

use std::sync::Arc;

use moka::future::Cache;
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use vitrine_core::types::{CountryId, StateId};
use vitrine_core::{City, HostedProvider, OrderPayload, State};

use crate::config::BackendConfig;

use cache::{CacheKey, CacheValue};
use types::{
    CheckoutProps, CouponRequest, CouponResponse, ErrorBody, PaymentResponse, ProductDetail,
    ProductPage, ProductQuery, StoreProps,
};

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with an unexpected status.
    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend refused the request with a message for the buyer.
    #[error("{0}")]
    Rejected(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Could not build an endpoint URL.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// Message safe to show a buyer, if the backend provided one.
    #[must_use]
    pub fn buyer_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(message) => Some(message),
            _ => None,
        }
    }
}

/// A file sent with a multipart order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub field: &'static str,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the commerce backend API.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_token: SecretString,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("vitrine-storefront/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client: builder.build()?,
                base_url: config.base_url.clone(),
                api_token: config.api_token.clone(),
                cache,
            }),
        })
    }

    /// Build an endpoint URL from path segments (each segment is escaped).
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<String, BackendError> {
        let response = request
            .bearer_auth(self.inner.api_token.expose_secret())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(what.to_string()));
        }

        if status.is_client_error()
            && let Some(message) = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(ErrorBody::into_message)
        {
            return Err(BackendError::Rejected(message));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, BackendError> {
        let body = self.send(self.inner.client.get(url), what).await?;
        parse(&body)
    }

    // =========================================================================
    // Store & Catalog
    // =========================================================================

    /// Get a store's page props.
    ///
    /// # Errors
    ///
    /// Returns an error if the store does not exist or the request fails.
    #[instrument(skip(self))]
    pub async fn store(&self, store: &str) -> Result<StoreProps, BackendError> {
        let key = CacheKey::Store(store.to_string());
        if let Some(CacheValue::Store(props)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for store");
            return Ok(*props);
        }

        let url = self.endpoint(&["api", "stores", store])?;
        let props: StoreProps = self.get_json(url, &format!("store {store}")).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Store(Box::new(props.clone())))
            .await;
        Ok(props)
    }

    /// Get a page of a store's products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn products(
        &self,
        store: &str,
        query: ProductQuery,
    ) -> Result<ProductPage, BackendError> {
        let key = CacheKey::Products {
            store: store.to_string(),
            query,
        };
        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(*page);
        }

        let mut url = self.endpoint(&["api", "stores", store, "products"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &query.page.to_string());
            pairs.append_pair("sort", query.sort.slug());
            if query.featured {
                pairs.append_pair("featured", "1");
            }
        }
        let page: ProductPage = self.get_json(url, &format!("products of {store}")).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Products(Box::new(page.clone())))
            .await;
        Ok(page)
    }

    /// Get a product with its related products.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the request fails.
    #[instrument(skip(self))]
    pub async fn product(&self, store: &str, slug: &str) -> Result<ProductDetail, BackendError> {
        let key = CacheKey::Product {
            store: store.to_string(),
            slug: slug.to_string(),
        };
        if let Some(CacheValue::Product(detail)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*detail);
        }

        let url = self.endpoint(&["api", "stores", store, "products", slug])?;
        let detail: ProductDetail = self.get_json(url, &format!("product {slug}")).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(detail.clone())))
            .await;
        Ok(detail)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Get checkout page props (shipping methods, payment methods, countries).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn checkout_props(&self, store: &str) -> Result<CheckoutProps, BackendError> {
        let url = self.endpoint(&["api", "stores", store, "checkout"])?;
        self.get_json(url, &format!("checkout of {store}")).await
    }

    /// States of a country.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn states(&self, country: CountryId) -> Result<Vec<State>, BackendError> {
        let key = CacheKey::States(country);
        if let Some(CacheValue::States(states)) = self.inner.cache.get(&key).await {
            return Ok(states);
        }

        let id = country.to_string();
        let url = self.endpoint(&["api", "locations", "countries", &id, "states"])?;
        let states: Vec<State> = self.get_json(url, &format!("states of {country}")).await?;

        self.inner
            .cache
            .insert(key, CacheValue::States(states.clone()))
            .await;
        Ok(states)
    }

    /// Cities of a state.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn cities(&self, state: StateId) -> Result<Vec<City>, BackendError> {
        let key = CacheKey::Cities(state);
        if let Some(CacheValue::Cities(cities)) = self.inner.cache.get(&key).await {
            return Ok(cities);
        }

        let id = state.to_string();
        let url = self.endpoint(&["api", "locations", "states", &id, "cities"])?;
        let cities: Vec<City> = self.get_json(url, &format!("cities of {state}")).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Cities(cities.clone()))
            .await;
        Ok(cities)
    }

    /// Validate a coupon code and return its discount.
    ///
    /// # Errors
    ///
    /// [`BackendError::Rejected`] with the backend's message when the code is
    /// not valid, or any transport error.
    #[instrument(skip(self), fields(code = %request.code))]
    pub async fn validate_coupon(
        &self,
        request: &CouponRequest<'_>,
    ) -> Result<Decimal, BackendError> {
        let url = self.endpoint(&["api", "coupons", "validate"])?;
        let body = self
            .send(self.inner.client.post(url).json(request), "coupon")
            .await?;
        let response: CouponResponse = parse(&body)?;

        if response.valid {
            Ok(response.discount)
        } else {
            Err(BackendError::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "This coupon code is not valid.".to_string()),
            ))
        }
    }

    // =========================================================================
    // Payments & Orders
    // =========================================================================

    /// Start a hosted provider payment for an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, payload), fields(total = %payload.total))]
    pub async fn initialize_payment(
        &self,
        store: &str,
        provider: HostedProvider,
        payload: &OrderPayload,
    ) -> Result<PaymentResponse, BackendError> {
        let url = self.endpoint(&[
            "api",
            "stores",
            store,
            "payments",
            provider.slug(),
            "initialize",
        ])?;
        let body = self
            .send(self.inner.client.post(url).json(payload), "payment")
            .await?;
        parse(&body)
    }

    /// URL the hidden checkout form posts orders to.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend URL cannot hold path segments.
    pub fn orders_url(&self, store: &str) -> Result<Url, BackendError> {
        self.endpoint(&["api", "stores", store, "orders"])
    }

    /// Submit an order as multipart form data, optionally with a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, payload, csrf_token, attachment), fields(total = %payload.total))]
    pub async fn submit_order(
        &self,
        store: &str,
        payload: &OrderPayload,
        csrf_token: &str,
        attachment: Option<Attachment>,
    ) -> Result<PaymentResponse, BackendError> {
        let url = self.orders_url(store)?;

        let mut form = reqwest::multipart::Form::new();
        for (name, value) in payload.form_fields() {
            form = form.text(name, value);
        }
        if let Some(file) = attachment {
            let part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.content_type)?;
            form = form.part(file.field, part);
        }

        let request = self
            .inner
            .client
            .post(url)
            .header("X-CSRF-TOKEN", csrf_token)
            .multipart(form);
        let body = self.send(request, "order").await?;
        parse(&body)
    }
}

/// Parse a JSON body, logging the payload on failure.
fn parse<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        BackendError::Parse(e)
    })
}
