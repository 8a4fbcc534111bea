//! Payment gateway hand-off and verification.

use std::time::Duration;

use rafal_core::{OrderId, PaymentProvider};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, instrument};

use super::{ApiClient, ApiError};
use crate::session::Session;

pub const PAYMENT_CHECKER_PATH: &str = "/payment/payment_checker/";
pub const PAYMENT_VERIFY_PATH: &str = "/payment/verify/";

const VERIFY_TIMEOUT: Duration = Duration::from_secs(15);

/// The checkout form's provider flags. With both unset the payment goes
/// through Paymob.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOptions {
    pub fawry: bool,
    pub aman: bool,
}

impl PaymentOptions {
    #[must_use]
    pub const fn provider(self) -> PaymentProvider {
        PaymentProvider::from_flags(self.fawry, self.aman)
    }
}

impl From<PaymentProvider> for PaymentOptions {
    fn from(provider: PaymentProvider) -> Self {
        let (fawry, aman) = provider.flags();
        Self { fawry, aman }
    }
}

/// Outcome of a payment check or verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub success: bool,
    /// Gateway page to show in the embedded frame.
    pub redirect_url: Option<String>,
    pub payment_id: Option<String>,
    pub message: Option<String>,
}

impl PaymentResult {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn needs_redirect(&self) -> bool {
        self.success && self.redirect_url.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct PaymentService {
    client: ApiClient,
    session: Session,
    timeout: Duration,
}

impl PaymentService {
    #[must_use]
    pub const fn new(client: ApiClient, session: Session, timeout: Duration) -> Self {
        Self {
            client,
            session,
            timeout,
        }
    }

    /// Ask the backend how to collect payment for `order_id`.
    ///
    /// A `redirect_url` (or a relative `redirect` path, resolved against the
    /// API host) means the gateway page must be shown. An OK response
    /// without one is a successful hand-off: Fawry and Aman settle out of
    /// band. Never fails; errors come back with `success: false`.
    #[instrument(skip(self), fields(provider = %options.provider()))]
    pub async fn check_payment(&self, order_id: OrderId, options: PaymentOptions) -> PaymentResult {
        let provider = options.provider();
        info!(%order_id, "Checking payment options");
        let body = json!({
            "pk": order_id,
            "fawry": options.fawry,
            "aman": options.aman,
            "provider": provider.as_str(),
        });

        let result = async {
            let url = self.client.endpoint(PAYMENT_CHECKER_PATH)?;
            let token = self.session.auth_token();
            let raw = self
                .client
                .execute(Method::POST, url, Some(&body), token.as_ref(), self.timeout)
                .await?;
            info!(status = %raw.status, "Payment checker response received");
            if !raw.status.is_success() {
                return Err(raw.into_status_error("Payment check"));
            }
            raw.json::<Value>()
        }
        .await;

        match result {
            Ok(data) => self.interpret_check(&data, provider),
            Err(e) => {
                error!(error = %e, "Payment check failed");
                PaymentResult::failed(e.user_message())
            }
        }
    }

    /// Ask the backend whether payment `payment_id` went through.
    #[instrument(skip(self))]
    pub async fn verify_payment(&self, payment_id: &str) -> PaymentResult {
        let result = async {
            let url = self.client.resource(PAYMENT_VERIFY_PATH, payment_id)?;
            let token = self.session.auth_token();
            let raw = self
                .client
                .execute(Method::GET, url, None, token.as_ref(), VERIFY_TIMEOUT)
                .await?;
            if !raw.status.is_success() {
                return Err(raw.into_status_error("Payment verification"));
            }
            raw.json::<Value>()
        }
        .await;

        let data = match result {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, "Payment verification failed");
                return PaymentResult::failed(e.user_message());
            }
        };

        if let Some(path) = non_empty_str(&data, "redirect") {
            return PaymentResult {
                success: true,
                redirect_url: Some(self.client.resolve_link(path)),
                payment_id: Some(payment_id.to_owned()),
                message: None,
            };
        }

        let success = data.get("success").and_then(Value::as_bool) == Some(true);
        let fallback = if success { "Payment successful" } else { "Payment failed" };
        PaymentResult {
            success,
            redirect_url: None,
            payment_id: Some(payment_id.to_owned()),
            message: Some(non_empty_str(&data, "message").unwrap_or(fallback).to_owned()),
        }
    }

    fn interpret_check(&self, data: &Value, provider: PaymentProvider) -> PaymentResult {
        let payment_id = payment_id(data);
        let redirect_url = non_empty_str(data, "redirect_url")
            .map(str::to_owned)
            .or_else(|| non_empty_str(data, "redirect").map(|p| self.client.resolve_link(p)));

        if let Some(url) = redirect_url {
            info!(%url, "Payment gateway redirect received");
            return PaymentResult {
                success: true,
                redirect_url: Some(url),
                payment_id,
                message: None,
            };
        }

        if !provider.completes_out_of_band() {
            info!("No redirect returned for gateway payment");
        }
        PaymentResult {
            success: true,
            redirect_url: None,
            payment_id,
            message: Some(
                non_empty_str(data, "message")
                    .unwrap_or("Payment method selected successfully")
                    .to_owned(),
            ),
        }
    }
}

fn non_empty_str<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn payment_id(data: &Value) -> Option<String> {
    ["payment_id", "id"].iter().find_map(|key| match data.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use super::*;
    use crate::storage::MemoryStore;

    fn service() -> PaymentService {
        let client = ApiClient::new(Url::parse("https://shop.test").unwrap()).unwrap();
        let session = Session::load(Arc::new(MemoryStore::new()));
        PaymentService::new(client, session, Duration::from_secs(20))
    }

    #[test]
    fn test_options_provider() {
        assert_eq!(PaymentOptions::default().provider(), PaymentProvider::Paymob);
        let both = PaymentOptions {
            fawry: true,
            aman: true,
        };
        assert_eq!(both.provider(), PaymentProvider::Fawry);
        assert_eq!(
            PaymentOptions::from(PaymentProvider::Aman).provider(),
            PaymentProvider::Aman
        );
    }

    #[test]
    fn test_interpret_absolute_redirect() {
        let data = json!({"redirect_url": "https://pay.example/x", "id": 77});
        let result = service().interpret_check(&data, PaymentProvider::Paymob);
        assert!(result.needs_redirect());
        assert_eq!(result.redirect_url.as_deref(), Some("https://pay.example/x"));
        assert_eq!(result.payment_id.as_deref(), Some("77"));
    }

    #[test]
    fn test_interpret_relative_redirect() {
        let data = json!({"redirect": "/api/payments/paymob/process/4/", "payment_id": "p-4"});
        let result = service().interpret_check(&data, PaymentProvider::Paymob);
        assert_eq!(
            result.redirect_url.as_deref(),
            Some("https://shop.test/api/payments/paymob/process/4/")
        );
        assert_eq!(result.payment_id.as_deref(), Some("p-4"));
    }

    #[test]
    fn test_interpret_out_of_band() {
        let result = service().interpret_check(&json!({}), PaymentProvider::Fawry);
        assert!(result.success);
        assert!(!result.needs_redirect());
        assert_eq!(
            result.message.as_deref(),
            Some("Payment method selected successfully")
        );

        let result = service()
            .interpret_check(&json!({"message": "Pay at any Aman kiosk"}), PaymentProvider::Aman);
        assert_eq!(result.message.as_deref(), Some("Pay at any Aman kiosk"));
    }

    #[test]
    fn test_failed_shape() {
        let result = PaymentResult::failed("declined");
        assert!(!result.success);
        assert!(!result.needs_redirect());
        assert_eq!(result.message.as_deref(), Some("declined"));
    }
}
