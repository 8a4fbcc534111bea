//! Library-level error type and Sentry helpers.
//!
//! Service operations never return these: backend failures are folded into
//! `success: false` results. `StorefrontError` covers what can go wrong while
//! wiring the storefront together (configuration, the persisted store, HTTP
//! client construction).

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP client error: {0}")]
    Client(#[from] ApiError),
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Report a failure the buyer saw to Sentry and log it.
///
/// Used for backend failures that were turned into a `success: false`
/// result, so they still show up in error tracking.
pub fn report_failure(operation: &str, message: &str) {
    let event_id = sentry::capture_message(
        &format!("{operation} failed: {message}"),
        sentry::Level::Error,
    );
    tracing::error!(
        operation,
        message,
        sentry_event_id = %event_id,
        "Checkout step failed"
    );
}

/// Tag subsequent Sentry events with the cart session key.
pub fn set_sentry_session(session_key: &str) {
    sentry::configure_scope(|scope| {
        scope.set_tag("cart_session", session_key);
    });
}

/// Clear the Sentry session context.
///
/// Call this on logout.
pub fn clear_sentry_session() {
    sentry::configure_scope(|scope| {
        scope.remove_tag("cart_session");
        scope.set_user(None);
    });
}

/// Add a breadcrumb for buyer actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order submitted", Some(&[("order_number", "ORD-41")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorefrontError::from(ConfigError::InvalidEnvVar(
            "RAFAL_API_BASE_URL".to_string(),
            "relative URL without a base".to_string(),
        ));
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid environment variable RAFAL_API_BASE_URL: relative URL without a base"
        );
    }

    #[test]
    fn test_sentry_helpers_without_client() {
        // No client bound: these must be no-ops rather than panics.
        add_breadcrumb("checkout", "Order submitted", Some(&[("order_number", "ORD-1")]));
        set_sentry_session("cart-1");
        clear_sentry_session();
        report_failure("Checkout", "out of stock");
    }
}
