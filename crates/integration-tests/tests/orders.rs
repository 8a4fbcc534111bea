//! Order submission and history against the fake backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use rafal_core::{ColorHex, OrderId, OrderStatus, PaymentMethod, ProductId};
use rafal_integration_tests::{FakeBackend, config_for, state_for, state_with_store};
use rafal_storefront::api::{BuyerInfo, CheckoutRequest, DirectBuyRequest, OrderItem};
use rafal_storefront::config::Timeouts;
use rafal_storefront::storage::MemoryStore;
use rust_decimal::Decimal;
use serde_json::json;

fn buyer() -> BuyerInfo {
    BuyerInfo {
        first_name: "Omar".into(),
        second_name: "Hassan".into(),
        email: String::new(),
        phone: "010 1234 5678".into(),
        country: "EG".into(),
        city: "Giza".into(),
        region: "Dokki".into(),
        address: "5 Nile St".into(),
        apartment: None,
    }
}

fn direct_buy(quantity: u32) -> DirectBuyRequest {
    DirectBuyRequest {
        buyer: buyer(),
        item: OrderItem::new(ProductId::new(3), quantity),
        payment_method: PaymentMethod::Cash,
    }
}

#[tokio::test]
async fn test_direct_buy_sends_normalized_body() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::POST,
        "/order/checkout_now/",
        201,
        json!({
            "id": 41,
            "order_number": "ORD-41",
            "success": true,
            "order": {"status": "pending", "total": "1250.50"}
        }),
    );
    let state = state_for(&backend);

    let order = state.orders().direct_buy(&direct_buy(0)).await;

    assert!(order.success);
    assert_eq!(order.id, Some(OrderId::new(41)));
    assert_eq!(order.order_number, "ORD-41");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, Decimal::new(125_050, 2));
    assert_eq!(order.payment_method, "Cash");
    assert_eq!(order.items.len(), 1);

    let sent = &backend.requests_to("/order/checkout_now/")[0];
    assert_eq!(sent.body["phone"], "1012345678");
    assert_eq!(sent.body["quantity"], 1);
    assert_eq!(sent.body["product_id"], 3);
    assert_eq!(sent.body["color_hex"], ColorHex::BLACK);
    assert_eq!(sent.body["shipping_address"], "5 Nile St _ ");
    assert_eq!(sent.body["payment_method"], "Cash");
    assert!(sent.authorization.is_none());
}

#[tokio::test]
async fn test_error_detail_becomes_message() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::POST,
        "/order/checkout_now/",
        500,
        json!({"detail": "out of stock"}),
    );
    let state = state_for(&backend);

    let order = state.orders().direct_buy(&direct_buy(1)).await;

    assert!(!order.success);
    assert_eq!(order.message.as_deref(), Some("out of stock"));
    assert_eq!(order.status, OrderStatus::Failed);
}

#[tokio::test]
async fn test_unstructured_error_body_is_used_verbatim() {
    let backend = FakeBackend::start().await;
    backend.respond_text(Method::POST, "/order/checkout_now/", 502, "Bad Gateway");
    let state = state_for(&backend);

    let order = state.orders().direct_buy(&direct_buy(1)).await;

    assert!(!order.success);
    assert_eq!(order.message.as_deref(), Some("Bad Gateway"));
}

#[tokio::test]
async fn test_empty_error_body_reports_status() {
    let backend = FakeBackend::start().await;
    backend.respond_text(Method::POST, "/cart/checkout/", 503, "");
    let state = state_for(&backend);

    let request = CheckoutRequest {
        buyer: buyer(),
        items: vec![OrderItem::new(ProductId::new(1), 1)],
        payment_method: PaymentMethod::Cash,
        session_key: Some("abc".into()),
    };
    let order = state.orders().checkout(&request).await;

    assert!(!order.success);
    assert_eq!(
        order.message.as_deref(),
        Some("Checkout failed with status: 503")
    );
}

#[tokio::test]
async fn test_malformed_success_body_fails() {
    let backend = FakeBackend::start().await;
    backend.respond_text(Method::POST, "/order/checkout_now/", 200, "<html>oops</html>");
    let state = state_for(&backend);

    let order = state.orders().direct_buy(&direct_buy(1)).await;

    assert!(!order.success);
    let message = order.message.unwrap();
    assert!(message.starts_with("Server returned invalid JSON format"), "{message}");
}

#[tokio::test]
async fn test_timeout_fails_without_retry() {
    let backend = FakeBackend::start().await;
    backend.respond_after(
        Duration::from_secs(3),
        Method::POST,
        "/order/checkout_now/",
        json!({"success": true}),
    );
    let mut config = config_for(&backend);
    config.timeouts = Timeouts {
        order: Duration::from_millis(300),
        ..config.timeouts
    };
    let state = state_with_store(config, Arc::new(MemoryStore::new()));

    let order = state.orders().direct_buy(&direct_buy(1)).await;

    assert!(!order.success);
    assert_eq!(
        order.message.as_deref(),
        Some("Request timed out. Please try again.")
    );
    assert_eq!(backend.requests_to("/order/checkout_now/").len(), 1);
}

#[tokio::test]
async fn test_cart_checkout_carries_session_key() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::POST,
        "/cart/checkout/",
        200,
        json!({"id": 9, "order_number": "ORD-9", "success": true, "order": {
            "items": [
                {"product_id": 1, "product_name": "Kettle", "quantity": 2, "color_hex": "#ffffff"}
            ]
        }}),
    );
    let state = state_for(&backend);
    state.session().login("tok-1").unwrap();
    let key = state.session().cart_session_key();

    let request = CheckoutRequest {
        buyer: buyer(),
        items: vec![OrderItem::new(ProductId::new(1), 2)],
        payment_method: PaymentMethod::Card,
        session_key: None,
    };
    let order = state.orders().checkout(&request).await;

    assert!(order.success);
    assert_eq!(order.items[0].product_name.as_deref(), Some("Kettle"));

    let sent = &backend.requests_to("/cart/checkout/")[0];
    assert_eq!(sent.query.as_deref(), Some(format!("session_key={key}").as_str()));
    assert_eq!(sent.body["session_key"], key.as_str());
    assert_eq!(sent.body["items"][0]["quantity"], 2);
    assert_eq!(sent.authorization.as_deref(), Some("Bearer tok-1"));
}

#[tokio::test]
async fn test_order_history_shapes() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::GET,
        "/order/history/",
        200,
        json!({"results": [
            {"id": 1, "order_number": "ORD-1", "status": "delivered", "total": 300},
            {"id": 2, "order_number": "ORD-2", "status": "shipped", "total": "99.90"}
        ]}),
    );
    backend.respond(
        Method::GET,
        "/order/history/2/",
        200,
        json!({"id": 2, "order_number": "ORD-2", "status": "shipped"}),
    );
    let state = state_for(&backend);
    state.session().login("tok").unwrap();

    let history = state.orders().order_history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, OrderStatus::Delivered);
    assert_eq!(history[1].total, Decimal::new(9990, 2));

    let details = state.orders().order_details(OrderId::new(2)).await.unwrap();
    assert_eq!(details.order_number, "ORD-2");

    assert!(state.orders().order_details(OrderId::new(404)).await.is_none());
}

#[tokio::test]
async fn test_history_failure_is_empty() {
    let backend = FakeBackend::start().await;
    backend.respond(Method::GET, "/order/history/", 401, json!({"detail": "no auth"}));
    let state = state_for(&backend);

    assert!(state.orders().order_history().await.is_empty());
}
