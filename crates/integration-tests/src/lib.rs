//! End-to-end tests for the RAFAL storefront clients.
//!
//! Each test boots a [`FakeBackend`] (an axum server on an ephemeral
//! localhost port), scripts the responses it needs, and drives the real
//! `OrderService`, `PaymentService`, `AdsService` and `CheckoutFlow` over
//! HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rafal-integration-tests
//! ```
//!
//! No external services are needed.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use rafal_storefront::AppState;
use rafal_storefront::checkout::BuyerDetails;
use rafal_storefront::config::{StorefrontConfig, Timeouts};
use rafal_storefront::storage::{KeyValueStore, MemoryStore};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// A request the fake backend received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
enum CannedBody {
    Json(Value),
    Text(String),
}

#[derive(Debug, Clone)]
struct Canned {
    status: StatusCode,
    body: CannedBody,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct BackendState {
    routes: Mutex<HashMap<(Method, String), Canned>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Scriptable stand-in for the RAFAL order, payment and ads hosts.
///
/// Unscripted routes answer `404 {"detail": "Not found."}`. The server task
/// is aborted on drop.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Listener has no address");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Fake backend stopped");
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL of the server.
    ///
    /// # Panics
    ///
    /// Never in practice; the address is always a valid URL.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).expect("Socket address is a valid URL")
    }

    fn script(&self, method: Method, path: &str, canned: Canned) {
        self.state
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method, path.to_owned()), canned);
    }

    /// Answer `method path` with a JSON body.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.script(
            method,
            path,
            Canned {
                status: status_code(status),
                body: CannedBody::Json(body),
                delay: None,
            },
        );
    }

    /// Answer `method path` with a plain-text body.
    pub fn respond_text(&self, method: Method, path: &str, status: u16, body: &str) {
        self.script(
            method,
            path,
            Canned {
                status: status_code(status),
                body: CannedBody::Text(body.to_owned()),
                delay: None,
            },
        );
    }

    /// Answer `method path` only after `delay`.
    pub fn respond_after(&self, delay: Duration, method: Method, path: &str, body: Value) {
        self.script(
            method,
            path,
            Canned {
                status: StatusCode::OK,
                body: CannedBody::Json(body),
                delay: Some(delay),
            },
        );
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests received for `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn handle(
    State(state): State<Arc<BackendState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_owned();
    let request = RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_owned),
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    state
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(request);

    let canned = state
        .routes
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&(method, path))
        .cloned();

    let Some(canned) = canned else {
        return (
            StatusCode::NOT_FOUND,
            axum::Json(json!({"detail": "Not found."})),
        )
            .into_response();
    };
    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }
    match canned.body {
        CannedBody::Json(value) => (canned.status, axum::Json(value)).into_response(),
        CannedBody::Text(text) => {
            (canned.status, [(CONTENT_TYPE, "text/plain")], text).into_response()
        }
    }
}

/// Configuration pointing both hosts at `backend`, with short timeouts.
#[must_use]
pub fn config_for(backend: &FakeBackend) -> StorefrontConfig {
    StorefrontConfig {
        api_base_url: backend.url(),
        ads_base_url: backend.url(),
        timeouts: Timeouts {
            order: Duration::from_secs(2),
            ads: Duration::from_secs(2),
            ping: Duration::from_secs(1),
        },
        ..StorefrontConfig::default()
    }
}

/// Application state over `config` and the given store.
///
/// # Panics
///
/// Panics if the HTTP clients cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn state_with_store(config: StorefrontConfig, store: Arc<dyn KeyValueStore>) -> AppState {
    AppState::with_store(config, store).expect("Failed to build app state")
}

/// Application state over `backend` with a fresh in-memory store.
#[must_use]
pub fn state_for(backend: &FakeBackend) -> AppState {
    state_with_store(config_for(backend), Arc::new(MemoryStore::new()))
}

/// A buyer whose details pass validation.
#[must_use]
pub fn valid_buyer() -> BuyerDetails {
    BuyerDetails {
        first_name: "Omar".into(),
        last_name: "Hassan".into(),
        email: "omar@example.com".into(),
        phone: "010 1234 5678".into(),
        city: "Giza".into(),
        region: "Dokki".into(),
        address: "5 Nile St".into(),
        apartment: "12".into(),
        ..BuyerDetails::default()
    }
}
