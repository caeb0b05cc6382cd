//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `checkout_rate_limiter`: strict limits for coupon checks and order
//!   placement, which each cost a backend round-trip (~12/min)
//! - `cart_rate_limiter`: relaxed limits for cart mutations (~120/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Proxy headers carrying the real client IP, most trusted first.
const CLIENT_IP_HEADERS: &[&str] = &["cf-connecting-ip", "x-real-ip", "fly-client-ip"];

/// Key extractor that reads proxy headers first, then `X-Forwarded-For`,
/// then the socket peer address.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl ClientIpKeyExtractor {
    fn from_headers(headers: &axum::http::HeaderMap) -> Option<IpAddr> {
        let header_ip = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        };

        CLIENT_IP_HEADERS.iter().find_map(|name| header_ip(name)).or_else(|| {
            // First IP in the chain is the original client
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Self::from_headers(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for coupon and order endpoints: ~12 requests per
/// minute per IP, burst of 6.
///
/// # Panics
///
/// This function will not panic. `per_second(5)` and `burst_size(6)` are
/// valid positive values that `GovernorConfigBuilder` always accepts.
#[must_use]
pub fn checkout_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(5) // Replenish 1 token every 5 seconds
        .burst_size(6)
        .finish()
        .expect("rate limiter config with per_second(5) and burst_size(6) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for cart mutations: ~120 requests per minute per IP,
/// burst of 60.
///
/// # Panics
///
/// This function will not panic. `per_millisecond(500)` and `burst_size(60)`
/// are valid positive values that `GovernorConfigBuilder` always accepts.
#[must_use]
pub fn cart_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_millisecond(500)
        .burst_size(60)
        .finish()
        .expect("rate limiter config with per_millisecond(500) and burst_size(60) is valid");
    GovernorLayer::new(Arc::new(config))
}
