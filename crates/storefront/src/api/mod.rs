//! Clients for the RAFAL backend.
//!
//! # Architecture
//!
//! - One [`ApiClient`] per base host wraps a shared `reqwest::Client`
//! - Every request runs under a client-side timeout; expiry is a failure,
//!   never retried
//! - [`ApiError`] classifies what went wrong, but it stays inside this
//!   module: the public service methods fold it into a result value with
//!   `success: false` and a human-readable message
//!
//! # Services
//!
//! - [`OrderService`] - direct buy, cart checkout, order history
//! - [`PaymentService`] - payment gateway hand-off and verification
//! - [`AdsService`] - promotional banners with cache and fallbacks

pub mod ads;
pub mod orders;
pub mod payments;

pub use ads::{AdBanner, AdsService, ConnectionReport};
pub use orders::{BuyerInfo, CheckoutRequest, DirectBuyRequest, Order, OrderItem, OrderService, OrderedItem};
pub use payments::{PaymentOptions, PaymentResult, PaymentService};

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Maximum characters of a raw error body surfaced to the buyer.
const ERROR_TEXT_LIMIT: usize = 200;

/// Maximum characters of a body written to logs.
const LOG_BODY_LIMIT: usize = 500;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client-side timeout expired before a full response arrived.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, TLS or protocol failure.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// A 2xx response whose body was not the expected JSON.
    #[error("{message}")]
    MalformedBody { message: String },

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// The message shown to the buyer for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout(_) => "Request timed out. Please try again.".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    /// Parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::MalformedBody` with a truncated copy of the body
    /// when it is not valid JSON of the requested shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&self.body, LOG_BODY_LIMIT),
                "Failed to parse backend response"
            );
            ApiError::MalformedBody {
                message: format!(
                    "Server returned invalid JSON format. Response: {}...",
                    truncate(&self.body, ERROR_TEXT_LIMIT)
                ),
            }
        })
    }

    /// Turn a non-2xx response into `ApiError::Status` with the best message
    /// available.
    #[must_use]
    pub fn into_status_error(self, operation: &str) -> ApiError {
        let message = extract_error_message(&self.body, self.status, operation);
        ApiError::Status {
            status: self.status,
            message,
        }
    }
}

/// Pick a human-readable message out of an error body.
///
/// JSON bodies yield the first non-empty string among `message`, `error`,
/// and `detail`; other text is returned truncated to 200 characters; empty
/// bodies fall back to `"<operation> failed with status: <code>"`.
#[must_use]
pub fn extract_error_message(body: &str, status: StatusCode, operation: &str) -> String {
    let fallback = || format!("{operation} failed with status: {}", status.as_u16());

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        return ["message", "error", "detail"]
            .iter()
            .find_map(|key| {
                value
                    .get(key)
                    .and_then(serde_json::Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_owned)
            })
            .unwrap_or_else(fallback);
    }

    if body.trim().is_empty() {
        return fallback();
    }

    if body.chars().count() > ERROR_TEXT_LIMIT {
        format!("{}...", truncate(body, ERROR_TEXT_LIMIT))
    } else {
        body.to_owned()
    }
}

/// First `limit` characters of `s`.
#[must_use]
pub fn truncate(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

/// HTTP client bound to one backend host.
///
/// Cheaply cloneable; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("rafal-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner { http, base_url }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Absolute URL for an endpoint path on this host.
    ///
    /// The path is appended to the base (keeping any base path prefix)
    /// rather than resolved against it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if the joined string is not a URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&join_base(&self.inner.base_url, path))?)
    }

    /// Endpoint for a resource `id` under `path`, with a trailing slash.
    ///
    /// The id is percent-encoded as a single path segment, so `/` or `?`
    /// in it cannot reach another route.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if the base URL cannot take path
    /// segments.
    pub fn resource(&self, path: &str, id: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint(path)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(id)
            .push("");
        Ok(url)
    }

    /// Resolve a backend-supplied link: absolute http(s) URLs pass through,
    /// anything else is treated as a path on this host.
    #[must_use]
    pub fn resolve_link(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_owned()
        } else if link.starts_with('/') {
            join_base(&self.inner.base_url, link)
        } else {
            join_base(&self.inner.base_url, &format!("/{link}"))
        }
    }

    /// Send a request and read the full body under `timeout`.
    ///
    /// The status is not checked; callers decide what a non-2xx means.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Timeout` when the deadline passes and
    /// `ApiError::Transport` for connection-level failures.
    pub async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
        bearer: Option<&SecretString>,
        timeout: Duration,
    ) -> Result<RawResponse, ApiError> {
        let mut request = self.inner.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = bearer {
            request = request.bearer_auth(token.expose_secret());
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(RawResponse { status, body })
        };

        let response = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| ApiError::Timeout(timeout))??;

        debug!(
            method = %method,
            url = %url,
            status = %response.status,
            "Backend responded"
        );
        Ok(response)
    }
}

fn join_base(base: &Url, path: &str) -> String {
    format!("{}{}", base.as_str().trim_end_matches('/'), path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_prefers_message_then_error_then_detail() {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        assert_eq!(
            extract_error_message(r#"{"detail":"out of stock"}"#, status, "Checkout"),
            "out of stock"
        );
        assert_eq!(
            extract_error_message(r#"{"error":"bad","detail":"x"}"#, status, "Checkout"),
            "bad"
        );
        assert_eq!(
            extract_error_message(r#"{"message":"m","error":"e"}"#, status, "Checkout"),
            "m"
        );
        assert_eq!(
            extract_error_message(r#"{"message":"","detail":"d"}"#, status, "Checkout"),
            "d"
        );
    }

    #[test]
    fn test_extract_message_fallbacks() {
        let status = StatusCode::BAD_GATEWAY;
        assert_eq!(
            extract_error_message(r#"{"phone":["invalid"]}"#, status, "Order"),
            "Order failed with status: 502"
        );
        assert_eq!(
            extract_error_message("", status, "Order"),
            "Order failed with status: 502"
        );
        assert_eq!(
            extract_error_message("Bad Gateway", status, "Order"),
            "Bad Gateway"
        );

        let long = "x".repeat(250);
        let msg = extract_error_message(&long, status, "Order");
        assert_eq!(msg.len(), 203);
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = ApiClient::new(Url::parse("http://example.test/api/").unwrap()).unwrap();
        assert_eq!(
            client.endpoint("/order/checkout_now/").unwrap().as_str(),
            "http://example.test/api/order/checkout_now/"
        );
    }

    #[test]
    fn test_resource_escapes_id() {
        let client = ApiClient::new(Url::parse("http://example.test/api/").unwrap()).unwrap();
        assert_eq!(
            client.resource("/payment/verify/", "pay_1").unwrap().as_str(),
            "http://example.test/api/payment/verify/pay_1/"
        );
        assert_eq!(
            client.resource("/payment/verify/", "../../order/history?x=1").unwrap().as_str(),
            "http://example.test/api/payment/verify/..%2F..%2Forder%2Fhistory%3Fx=1/"
        );
    }

    #[test]
    fn test_resolve_link() {
        let client = ApiClient::new(Url::parse("https://shop.test").unwrap()).unwrap();
        assert_eq!(
            client.resolve_link("https://pay.example/x"),
            "https://pay.example/x"
        );
        assert_eq!(
            client.resolve_link("/api/payments/paymob/process/4/"),
            "https://shop.test/api/payments/paymob/process/4/"
        );
        assert_eq!(
            client.resolve_link("media/ads/a.png"),
            "https://shop.test/media/ads/a.png"
        );
    }

    #[test]
    fn test_malformed_json_message() {
        let raw = RawResponse {
            status: StatusCode::OK,
            body: "<html>oops</html>".to_string(),
        };
        let err = raw.json::<serde_json::Value>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Server returned invalid JSON format. Response: <html>oops</html>..."
        );
    }
}
