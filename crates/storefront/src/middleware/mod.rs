//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CSP nonce (generate per-request nonce for inline scripts)
//! 5. Security headers (CSP with nonce, frame and isolation headers)
//! 6. Session layer (tower-sessions with in-memory store)
//! 7. Rate limiting (governor) on coupon, order and cart routes

pub mod csp;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use csp::{ContentSecurityPolicy, CspNonce, csp_nonce_middleware};
pub use rate_limit::{cart_rate_limiter, checkout_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
