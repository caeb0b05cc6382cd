//! Content Security Policy: per-request nonces and the policy itself.
//!
//! Every request gets a fresh nonce for inline `<script>` tags. The policy
//! admits the commerce backend as a form target because several payment
//! methods finish with a full POST navigation to the backend.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;

/// A CSP nonce value for inline scripts.
///
/// Each request gets a unique, cryptographically random nonce (128-bit, base64-encoded).
#[derive(Clone, Debug)]
pub struct CspNonce(pub String);

impl CspNonce {
    /// Generate a new random nonce.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    /// Get the nonce value for use in templates.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Middleware that generates a CSP nonce and stores it in request extensions.
///
/// Must run before `security_headers_middleware` so the nonce is available
/// when building the CSP header.
pub async fn csp_nonce_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(CspNonce::generate());
    next.run(request).await
}

impl<S> FromRequestParts<S> for CspNonce
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            tracing::warn!(
                "CSP nonce not found in request extensions - middleware may be misconfigured"
            );
            Self(String::new())
        }))
    }
}

/// The storefront's CSP, parameterized by the backend origin.
#[derive(Debug, Clone)]
pub struct ContentSecurityPolicy {
    backend_origin: String,
    upgrade_insecure: bool,
}

impl ContentSecurityPolicy {
    #[must_use]
    pub fn new(backend_origin: impl Into<String>, upgrade_insecure: bool) -> Self {
        Self {
            backend_origin: backend_origin.into(),
            upgrade_insecure,
        }
    }

    /// Render the header value for one response.
    ///
    /// ```text
    /// default-src 'none';
    /// script-src 'self' 'nonce-…';
    /// style-src 'self';
    /// img-src 'self' data: <backend> https:;
    /// form-action 'self' <backend> https:;
    /// frame-ancestors 'none'; …
    /// ```
    ///
    /// `form-action` also admits `https:` since browsers check the targets
    /// of redirects that follow a form post, and provider checkout pages are
    /// not known in advance.
    #[must_use]
    pub fn header_value(&self, nonce: Option<&CspNonce>) -> String {
        let script_src = match nonce.map(CspNonce::value).filter(|n| !n.is_empty()) {
            Some(nonce) => format!("'self' 'nonce-{nonce}'"),
            None => "'self'".to_string(),
        };
        let backend = &self.backend_origin;

        let mut policy = format!(
            "default-src 'none'; \
             script-src {script_src}; \
             style-src 'self'; \
             font-src 'self'; \
             img-src 'self' data: {backend} https:; \
             connect-src 'self'; \
             frame-src 'none'; \
             object-src 'none'; \
             base-uri 'self'; \
             form-action 'self' {backend} https:; \
             frame-ancestors 'none'"
        );
        if self.upgrade_insecure {
            policy.push_str("; upgrade-insecure-requests");
        }
        policy
    }
}
