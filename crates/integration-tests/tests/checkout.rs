//! Full checkout flow: validation, order placement, payment hand-off.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::Method;
use rafal_core::{ColorHex, PaymentMethod, PaymentProvider, ProductId};
use rafal_integration_tests::{FakeBackend, state_for, valid_buyer};
use rafal_storefront::api::{OrderItem, PaymentOptions};
use rafal_storefront::checkout::{BuyerDetails, CheckoutOutcome, DirectPurchase, Field};
use serde_json::json;

fn purchase() -> DirectPurchase {
    DirectPurchase {
        product_id: ProductId::new(2),
        quantity: 1,
        color: Some(ColorHex::parse("#C0C0C0").unwrap()),
    }
}

#[tokio::test]
async fn test_cash_direct_buy_is_confirmed() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::POST,
        "/order/checkout_now/",
        201,
        json!({"id": 11, "order_number": "ORD-11", "success": true}),
    );
    let state = state_for(&backend);

    let outcome = state.checkout().direct_buy(&valid_buyer(), &purchase()).await;

    let CheckoutOutcome::Confirmed { order } = outcome else {
        panic!("expected confirmation, got {outcome:?}");
    };
    assert_eq!(order.order_number, "ORD-11");
    assert!(backend.requests_to("/payment/payment_checker/").is_empty());

    let sent = &backend.requests_to("/order/checkout_now/")[0];
    assert_eq!(sent.body["color_hex"], "#c0c0c0");
    assert_eq!(sent.body["shipping_address"], "5 Nile St _ 12");
}

#[tokio::test]
async fn test_card_checkout_awaits_gateway() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::POST,
        "/cart/checkout/",
        200,
        json!({"id": 12, "order_number": "ORD-12", "success": true}),
    );
    backend.respond(
        Method::POST,
        "/payment/payment_checker/",
        200,
        json!({"redirect_url": "https://accept.paymob.com/iframe/12", "payment_id": "p12"}),
    );
    let state = state_for(&backend);
    let details = BuyerDetails {
        payment_method: Some(PaymentMethod::Card),
        ..valid_buyer()
    };
    let items = [OrderItem::new(ProductId::new(1), 0), OrderItem::new(ProductId::new(4), 2)];

    let outcome = state
        .checkout()
        .checkout_cart(&details, &items, Some("cart-1".into()))
        .await;

    let CheckoutOutcome::AwaitingPayment {
        order,
        redirect_url,
        payment_id,
    } = outcome
    else {
        panic!("expected gateway hand-off, got {outcome:?}");
    };
    assert_eq!(order.order_number, "ORD-12");
    assert_eq!(redirect_url, "https://accept.paymob.com/iframe/12");
    assert_eq!(payment_id.as_deref(), Some("p12"));

    let order_sent = &backend.requests_to("/cart/checkout/")[0];
    assert_eq!(order_sent.query.as_deref(), Some("session_key=cart-1"));
    assert_eq!(order_sent.body["items"][0]["quantity"], 1);
    assert_eq!(order_sent.body["payment_method"], "Card");
    let payment_sent = &backend.requests_to("/payment/payment_checker/")[0];
    assert_eq!(payment_sent.body["pk"], 12);
}

#[tokio::test]
async fn test_card_with_out_of_band_provider_is_confirmed() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::POST,
        "/order/checkout_now/",
        201,
        json!({"id": 13, "order_number": "ORD-13", "success": true}),
    );
    backend.respond(
        Method::POST,
        "/payment/payment_checker/",
        200,
        json!({"message": "Pay with reference 889"}),
    );
    let state = state_for(&backend);
    let details = BuyerDetails {
        payment_method: Some(PaymentMethod::Card),
        payment_options: PaymentOptions::from(PaymentProvider::Aman),
        ..valid_buyer()
    };

    let outcome = state.checkout().direct_buy(&details, &purchase()).await;

    assert!(matches!(outcome, CheckoutOutcome::Confirmed { .. }), "{outcome:?}");
    let sent = &backend.requests_to("/payment/payment_checker/")[0];
    assert_eq!(sent.body["aman"], true);
}

#[tokio::test]
async fn test_order_rejection_is_failed() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::POST,
        "/order/checkout_now/",
        500,
        json!({"detail": "out of stock"}),
    );
    let state = state_for(&backend);

    let outcome = state.checkout().direct_buy(&valid_buyer(), &purchase()).await;

    assert_eq!(
        outcome,
        CheckoutOutcome::Failed {
            message: "out of stock".into()
        }
    );
}

#[tokio::test]
async fn test_payment_rejection_is_failed() {
    let backend = FakeBackend::start().await;
    backend.respond(
        Method::POST,
        "/order/checkout_now/",
        201,
        json!({"id": 14, "order_number": "ORD-14", "success": true}),
    );
    backend.respond(Method::POST, "/payment/payment_checker/", 502, json!({}));
    let state = state_for(&backend);
    let details = BuyerDetails {
        payment_method: Some(PaymentMethod::Card),
        ..valid_buyer()
    };

    let outcome = state.checkout().direct_buy(&details, &purchase()).await;

    let CheckoutOutcome::Failed { message } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(message, "Payment check failed with status: 502");
}

#[tokio::test]
async fn test_invalid_form_sends_nothing() {
    let backend = FakeBackend::start().await;
    let state = state_for(&backend);
    let details = BuyerDetails {
        phone: "12345".into(),
        ..valid_buyer()
    };

    let outcome = state.checkout().direct_buy(&details, &purchase()).await;

    let CheckoutOutcome::Invalid { errors } = outcome else {
        panic!("expected validation failure, got {outcome:?}");
    };
    assert!(errors.get(Field::Phone).is_some());
    assert!(backend.requests().is_empty());
}
