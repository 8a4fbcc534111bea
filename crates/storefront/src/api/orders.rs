//! Order submission and history.
//!
//! Two submission paths exist: a direct buy of a single product, and a cart
//! checkout of many lines tied to the cart session key. Both normalize the
//! buyer's phone number, build the composite shipping address, default any
//! missing colour to black, and return an [`Order`] whose `success` flag is
//! the only thing callers need to branch on.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rafal_core::{ColorHex, OrderId, OrderStatus, PaymentMethod, PhoneNumber, Price, ProductId};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};

use super::{ApiClient, ApiError, RawResponse};
use crate::session::Session;

pub const DIRECT_BUY_PATH: &str = "/order/checkout_now/";
pub const CART_CHECKOUT_PATH: &str = "/cart/checkout/";
pub const ORDER_HISTORY_PATH: &str = "/order/history/";

/// Timeout for read-only history calls.
const HISTORY_TIMEOUT: Duration = Duration::from_secs(15);

/// Buyer identity and delivery fields shared by both submission paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerInfo {
    pub first_name: String,
    /// Family name; the backend calls it `second_name`.
    pub second_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub city: String,
    pub region: String,
    /// Street address.
    pub address: String,
    pub apartment: Option<String>,
}

impl BuyerInfo {
    /// `"<street> _ <apartment>"`, the composite the backend stores as the
    /// shipping address.
    #[must_use]
    pub fn shipping_address(&self) -> String {
        format!(
            "{} _ {}",
            self.address.trim(),
            self.apartment.as_deref().unwrap_or("").trim()
        )
    }

    fn wire_fields(&self) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        map.insert("first_name".into(), json!(self.first_name.trim()));
        map.insert("second_name".into(), json!(self.second_name.trim()));
        map.insert("email".into(), json!(self.email.trim()));
        map.insert("phone".into(), json!(PhoneNumber::normalize(&self.phone)));
        map.insert("country".into(), json!(self.country));
        map.insert("city".into(), json!(self.city));
        map.insert("region".into(), json!(self.region));
        map.insert("address".into(), json!(self.address.trim()));
        map.insert(
            "apartment".into(),
            json!(self.apartment.as_deref().unwrap_or("")),
        );
        map.insert("shipping_address".into(), json!(self.shipping_address()));
        map
    }
}

/// One product line submitted with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Chosen colour; black when unset.
    pub color_hex: Option<ColorHex>,
}

impl OrderItem {
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
            color_hex: None,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: ColorHex) -> Self {
        self.color_hex = Some(color);
        self
    }

    fn wire(&self) -> Value {
        json!({
            "product_id": self.product_id,
            "quantity": self.quantity.max(1),
            "color_hex": self.color_hex.clone().unwrap_or_default(),
        })
    }
}

/// Single-product purchase bypassing the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectBuyRequest {
    pub buyer: BuyerInfo,
    pub item: OrderItem,
    pub payment_method: PaymentMethod,
}

impl DirectBuyRequest {
    fn wire(&self) -> Value {
        let mut map = self.buyer.wire_fields();
        if let Value::Object(item) = self.item.wire() {
            map.extend(item);
        }
        map.insert("payment_method".into(), json!(self.payment_method));
        Value::Object(map)
    }
}

/// Multi-line checkout of the buyer's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub buyer: BuyerInfo,
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    /// Overrides the session's cart key when set.
    pub session_key: Option<String>,
}

impl CheckoutRequest {
    fn wire(&self, session_key: &str) -> Value {
        let mut map = self.buyer.wire_fields();
        map.insert(
            "items".into(),
            Value::Array(self.items.iter().map(OrderItem::wire).collect()),
        );
        map.insert("payment_method".into(), json!(self.payment_method));
        map.insert("session_key".into(), json!(session_key));
        Value::Object(map)
    }
}

/// A line item as reported back by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItem {
    pub product_id: Option<ProductId>,
    pub product_name: Option<String>,
    pub quantity: u32,
    pub color_hex: ColorHex,
    pub unit_price: Option<Decimal>,
    pub total: Option<Decimal>,
}

impl OrderedItem {
    /// Read a backend line item, tolerating the several shapes the order
    /// serializers produce. Non-object values are skipped.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let product_id = ["product_id", "product"]
            .iter()
            .find_map(|k| obj.get(*k))
            .and_then(|v| match v {
                Value::Object(product) => product.get("id").cloned(),
                other => Some(other.clone()),
            })
            .and_then(|v| serde_json::from_value::<ProductId>(v).ok());
        let quantity = obj
            .get("quantity")
            .and_then(Value::as_u64)
            .and_then(|q| u32::try_from(q).ok())
            .unwrap_or(1);
        let color_hex = ColorHex::or_black(obj.get("color_hex").and_then(Value::as_str))
            .unwrap_or_default();
        let money = |key: &str| obj.get(key).map(Price::amount_from_json);

        Some(Self {
            product_id,
            product_name: obj
                .get("product_name")
                .and_then(Value::as_str)
                .map(str::to_owned),
            quantity,
            color_hex,
            unit_price: money("product_price"),
            total: money("total"),
        })
    }
}

impl From<&OrderItem> for OrderedItem {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: Some(item.product_id),
            product_name: None,
            quantity: item.quantity.max(1),
            color_hex: item.color_hex.clone().unwrap_or_default(),
            unit_price: None,
            total: None,
        }
    }
}

/// Normalized result of an order submission or history lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Option<OrderId>,
    pub order_number: String,
    pub status: OrderStatus,
    pub total: Decimal,
    pub items: Vec<OrderedItem>,
    pub shipping_address: String,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub success: bool,
    pub message: Option<String>,
}

impl Order {
    /// The uniform failure shape.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            id: None,
            order_number: String::new(),
            status: OrderStatus::Failed,
            total: Decimal::ZERO,
            items: Vec::new(),
            shipping_address: String::new(),
            payment_method: String::new(),
            created_at: Utc::now(),
            success: false,
            message: Some(message.into()),
        }
    }

    /// Normalize a submission response.
    ///
    /// `id`, `order_number`, `success` and `message` come from the top level;
    /// the rest from the nested `order` object. A successful response without
    /// line items falls back to the submitted lines so a successful order
    /// always has items.
    #[must_use]
    pub fn from_submission(
        body: &Value,
        payment_method: PaymentMethod,
        submitted: &[OrderItem],
    ) -> Self {
        let nested = body.get("order").unwrap_or(&Value::Null);
        let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);

        let mut items = parse_items(nested.get("items"));
        if success && items.is_empty() {
            items = submitted.iter().map(OrderedItem::from).collect();
        }

        Self {
            id: parse_order_id(body.get("id")),
            order_number: string_field(body, "order_number"),
            status: nested
                .get("status")
                .and_then(Value::as_str)
                .map_or(OrderStatus::Pending, OrderStatus::from_backend),
            total: nested
                .get("total")
                .map_or(Decimal::ZERO, Price::amount_from_json),
            items,
            shipping_address: string_field(nested, "shipping_address"),
            payment_method: nested
                .get("payment_method")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map_or_else(|| payment_method.to_string(), str::to_owned),
            created_at: parse_timestamp(nested.get("created_at")),
            success,
            message: body
                .get("message")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        }
    }

    /// Normalize one entry of the order history. History entries are
    /// existing orders, so they are always `success`.
    #[must_use]
    pub fn from_history(value: &Value) -> Self {
        Self {
            id: parse_order_id(value.get("id")),
            order_number: string_field(value, "order_number"),
            status: value
                .get("status")
                .and_then(Value::as_str)
                .map_or(OrderStatus::Pending, OrderStatus::from_backend),
            total: value
                .get("total")
                .map_or(Decimal::ZERO, Price::amount_from_json),
            items: parse_items(value.get("items")),
            shipping_address: string_field(value, "shipping_address"),
            payment_method: string_field(value, "payment_method"),
            created_at: parse_timestamp(value.get("created_at")),
            success: true,
            message: None,
        }
    }
}

fn parse_items(value: Option<&Value>) -> Vec<OrderedItem> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(OrderedItem::from_json).collect())
        .unwrap_or_default()
}

fn parse_order_id(value: Option<&Value>) -> Option<OrderId> {
    value
        .cloned()
        .and_then(|v| serde_json::from_value::<OrderId>(v).ok())
}

fn string_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn parse_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc))
}

/// Client for the order endpoints.
#[derive(Debug, Clone)]
pub struct OrderService {
    client: ApiClient,
    session: Session,
    timeout: Duration,
}

impl OrderService {
    #[must_use]
    pub const fn new(client: ApiClient, session: Session, timeout: Duration) -> Self {
        Self {
            client,
            session,
            timeout,
        }
    }

    /// Place a single-product order.
    ///
    /// Never fails: transport errors, timeouts, non-2xx statuses and
    /// malformed bodies all come back as an order with `success: false`.
    #[instrument(skip(self, request), fields(product_id = %request.item.product_id))]
    pub async fn direct_buy(&self, request: &DirectBuyRequest) -> Order {
        info!("Processing direct buy order");
        let body = request.wire();
        let submitted = std::slice::from_ref(&request.item);
        match self.submit(DIRECT_BUY_PATH, None, &body, "Order").await {
            Ok(raw) => Self::normalize(&raw, request.payment_method, submitted),
            Err(e) => {
                error!(error = %e, "Direct buy failed");
                Order::failed(e.user_message())
            }
        }
    }

    /// Place an order for every line in the cart.
    ///
    /// The cart session key travels as a query parameter (and in the body
    /// for older backends). Never fails; see [`Self::direct_buy`].
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn checkout(&self, request: &CheckoutRequest) -> Order {
        info!("Processing cart checkout");
        let session_key = request
            .session_key
            .clone()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| self.session.cart_session_key());
        let body = request.wire(&session_key);
        match self
            .submit(CART_CHECKOUT_PATH, Some(&session_key), &body, "Checkout")
            .await
        {
            Ok(raw) => Self::normalize(&raw, request.payment_method, &request.items),
            Err(e) => {
                error!(error = %e, "Checkout failed");
                Order::failed(e.user_message())
            }
        }
    }

    /// The buyer's past orders. Failures are logged and yield an empty list.
    #[instrument(skip(self))]
    pub async fn order_history(&self) -> Vec<Order> {
        let result = async {
            let url = self.client.endpoint(ORDER_HISTORY_PATH)?;
            let raw = self.get(url).await?;
            let body: Value = raw.json()?;
            let entries = match &body {
                Value::Array(list) => list.as_slice(),
                Value::Object(obj) => obj
                    .get("results")
                    .and_then(Value::as_array)
                    .map_or(&[][..], Vec::as_slice),
                _ => &[],
            };
            Ok::<_, ApiError>(entries.iter().map(Order::from_history).collect::<Vec<_>>())
        }
        .await;

        result.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch order history");
            Vec::new()
        })
    }

    /// One past order, or `None` if it cannot be fetched.
    #[instrument(skip(self))]
    pub async fn order_details(&self, id: OrderId) -> Option<Order> {
        let result = async {
            let url = self.client.endpoint(&format!("{ORDER_HISTORY_PATH}{id}/"))?;
            let raw = self.get(url).await?;
            let body: Value = raw.json()?;
            Ok::<_, ApiError>(Order::from_history(&body))
        }
        .await;

        match result {
            Ok(order) => Some(order),
            Err(e) => {
                warn!(error = %e, "Failed to fetch order details");
                None
            }
        }
    }

    async fn submit(
        &self,
        path: &str,
        session_key: Option<&str>,
        body: &Value,
        operation: &str,
    ) -> Result<RawResponse, ApiError> {
        let mut url = self.client.endpoint(path)?;
        if let Some(key) = session_key {
            url.query_pairs_mut().append_pair("session_key", key);
        }
        let token = self.session.auth_token();
        let raw = self
            .client
            .execute(Method::POST, url, Some(body), token.as_ref(), self.timeout)
            .await?;
        info!(status = %raw.status, "{operation} response received");
        if raw.status.is_success() {
            Ok(raw)
        } else {
            Err(raw.into_status_error(operation))
        }
    }

    async fn get(&self, url: url::Url) -> Result<RawResponse, ApiError> {
        let token = self.session.auth_token();
        let raw = self
            .client
            .execute(Method::GET, url, None, token.as_ref(), HISTORY_TIMEOUT)
            .await?;
        if raw.status.is_success() {
            Ok(raw)
        } else {
            Err(raw.into_status_error("Order history request"))
        }
    }

    fn normalize(raw: &RawResponse, method: PaymentMethod, submitted: &[OrderItem]) -> Order {
        match raw.json::<Value>() {
            Ok(body) => Order::from_submission(&body, method, submitted),
            Err(e) => Order::failed(e.user_message()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn buyer() -> BuyerInfo {
        BuyerInfo {
            first_name: "Mona".into(),
            second_name: "Adel".into(),
            email: "mona@example.com".into(),
            phone: "010 1234 5678".into(),
            country: "EG".into(),
            city: "Cairo".into(),
            region: "Cairo Governorate".into(),
            address: "12 Tahrir St".into(),
            apartment: Some("Apt 4".into()),
        }
    }

    #[test]
    fn test_shipping_address_composite() {
        assert_eq!(buyer().shipping_address(), "12 Tahrir St _ Apt 4");
        let mut b = buyer();
        b.apartment = None;
        assert_eq!(b.shipping_address(), "12 Tahrir St _ ");
    }

    #[test]
    fn test_direct_buy_wire_body() {
        let request = DirectBuyRequest {
            buyer: buyer(),
            item: OrderItem::new(ProductId::new(3), 2),
            payment_method: PaymentMethod::Card,
        };
        let body = request.wire();
        assert_eq!(body["phone"], "1012345678");
        assert_eq!(body["product_id"], 3);
        assert_eq!(body["quantity"], 2);
        assert_eq!(body["color_hex"], "#000000");
        assert_eq!(body["payment_method"], "Card");
        assert_eq!(body["shipping_address"], "12 Tahrir St _ Apt 4");
    }

    #[test]
    fn test_checkout_wire_defaults_colors() {
        let request = CheckoutRequest {
            buyer: buyer(),
            items: vec![
                OrderItem::new(ProductId::new(1), 1),
                OrderItem::new(ProductId::new(2), 3).with_color(ColorHex::parse("#C0C0C0").unwrap()),
            ],
            payment_method: PaymentMethod::Cash,
            session_key: None,
        };
        let body = request.wire("cart-1");
        assert_eq!(body["items"][0]["color_hex"], "#000000");
        assert_eq!(body["items"][1]["color_hex"], "#c0c0c0");
        assert_eq!(body["session_key"], "cart-1");
        assert_eq!(body["payment_method"], "Cash");
    }

    #[test]
    fn test_from_submission_success() {
        let body = json!({
            "success": true,
            "id": 41,
            "order_number": "ORD-41",
            "message": "Order placed successfully",
            "order": {
                "status": "pending",
                "total": "1549.00",
                "shipping_address": "12 Tahrir St _ Apt 4",
                "payment_method": "card",
                "created_at": "2024-05-01T10:00:00Z",
                "items": [
                    {"product": 3, "product_name": "Kettle", "product_price": "749.50",
                     "color_hex": "#FFFFFF", "quantity": 2, "total": "1499.00"}
                ]
            }
        });
        let order = Order::from_submission(&body, PaymentMethod::Card, &[]);
        assert!(order.success);
        assert_eq!(order.id, Some(OrderId::new(41)));
        assert_eq!(order.order_number, "ORD-41");
        assert_eq!(order.total, Decimal::new(154_900, 2));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id, Some(ProductId::new(3)));
        assert_eq!(order.items[0].color_hex.as_str(), "#ffffff");
        assert_eq!(order.payment_method, "card");
        assert_eq!(order.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert_eq!(order.message.as_deref(), Some("Order placed successfully"));
    }

    #[test]
    fn test_from_submission_defaults_and_item_fallback() {
        let body = json!({"success": true, "id": "7", "order_number": "ORD-7"});
        let submitted = [OrderItem::new(ProductId::new(5), 1)];
        let order = Order::from_submission(&body, PaymentMethod::Cash, &submitted);
        assert!(order.success);
        assert_eq!(order.id, Some(OrderId::new(7)));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, Decimal::ZERO);
        assert_eq!(order.payment_method, "Cash");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].color_hex.as_str(), "#000000");
    }

    #[test]
    fn test_from_submission_without_success_flag_is_failure() {
        let body = json!({"id": 9});
        let submitted = [OrderItem::new(ProductId::new(5), 1)];
        let order = Order::from_submission(&body, PaymentMethod::Cash, &submitted);
        assert!(!order.success);
        assert!(order.items.is_empty());
    }

    #[test]
    fn test_from_history() {
        let entry = json!({
            "id": 12, "order_number": "ORD-12", "status": "delivered",
            "total": 300, "payment_method": "cash", "items": [1, {"product_id": "4"}]
        });
        let order = Order::from_history(&entry);
        assert!(order.success);
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.total, Decimal::from(300));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id, Some(ProductId::new(4)));
        assert_eq!(order.items[0].quantity, 1);
    }

    #[test]
    fn test_failed_shape() {
        let order = Order::failed("out of stock");
        assert!(!order.success);
        assert_eq!(order.status, OrderStatus::Failed);
        assert_eq!(order.message.as_deref(), Some("out of stock"));
        assert!(order.id.is_none());
    }
}
