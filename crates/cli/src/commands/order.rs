//! Order placement and history commands.

use rafal_core::{ColorHex, OrderId, ProductId};
use rafal_storefront::AppState;
use rafal_storefront::api::OrderItem;
use rafal_storefront::catalog;
use rafal_storefront::checkout::{CheckoutOutcome, DirectPurchase};
use tracing::info;

use super::{BuyerArgs, CliError, PaymentArgs, print_json};

/// Parse a cart line written as `PRODUCT[xQTY][@#RRGGBB]`.
///
/// # Errors
///
/// Returns a message naming the malformed part.
pub fn parse_item(s: &str) -> Result<OrderItem, String> {
    let (line, color) = match s.split_once('@') {
        Some((line, color)) => (line, Some(color)),
        None => (s, None),
    };
    let (product, quantity) = match line.split_once(['x', 'X']) {
        Some((product, quantity)) => (product, Some(quantity)),
        None => (line, None),
    };

    let product_id: ProductId = product.parse().map_err(|e| format!("{e}"))?;
    let quantity = match quantity {
        Some(q) => q
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid quantity: {q}"))?,
        None => 1,
    };
    let mut item = OrderItem::new(product_id, quantity);
    if let Some(color) = color {
        item = item.with_color(ColorHex::parse(color).map_err(|e| format!("{e}"))?);
    }
    Ok(item)
}

/// Print the outcome; anything short of a placed order is an error.
fn finish(outcome: &CheckoutOutcome) -> Result<(), CliError> {
    print_json(outcome)?;
    match outcome {
        CheckoutOutcome::Confirmed { order } => {
            info!(order_number = %order.order_number, "Order confirmed");
            Ok(())
        }
        CheckoutOutcome::AwaitingPayment { redirect_url, .. } => {
            info!(%redirect_url, "Complete the payment at the gateway");
            Ok(())
        }
        CheckoutOutcome::Failed { message } => Err(CliError::Rejected(message.clone())),
        CheckoutOutcome::Invalid { errors } => Err(CliError::Rejected(errors.to_string())),
    }
}

pub async fn buy(
    state: &AppState,
    product_id: ProductId,
    quantity: u32,
    color: Option<&str>,
    buyer: BuyerArgs,
    payment: PaymentArgs,
) -> Result<(), CliError> {
    let color = match color {
        Some(hex) => ColorHex::parse(hex).map_err(|e| CliError::InvalidArgument(e.to_string()))?,
        None => catalog::default_selection(product_id).color_hex(),
    };
    let purchase = DirectPurchase {
        product_id,
        quantity,
        color: Some(color),
    };
    let details = buyer.into_details(&payment);

    let outcome = state.checkout().direct_buy(&details, &purchase).await;
    finish(&outcome)
}

pub async fn checkout(
    state: &AppState,
    items: Vec<OrderItem>,
    buyer: BuyerArgs,
    payment: PaymentArgs,
) -> Result<(), CliError> {
    let details = buyer.into_details(&payment);
    let session_key = state.session().cart_session_key();

    let outcome = state
        .checkout()
        .checkout_cart(&details, &items, Some(session_key))
        .await;
    finish(&outcome)
}

pub async fn list(state: &AppState) -> Result<(), CliError> {
    if !state.session().is_authenticated() {
        return Err(CliError::Rejected(
            "Not logged in; run `rafal session login <token>` first".to_owned(),
        ));
    }
    let orders = state.orders().order_history().await;
    info!(count = orders.len(), "Fetched order history");
    print_json(&orders)
}

pub async fn show(state: &AppState, order_id: OrderId) -> Result<(), CliError> {
    match state.orders().order_details(order_id).await {
        Some(order) => print_json(&order),
        None => Err(CliError::Rejected(format!("Order {order_id} not found"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_forms() {
        let item = parse_item("7").unwrap();
        assert_eq!(item.product_id, ProductId::new(7));
        assert_eq!(item.quantity, 1);
        assert!(item.color_hex.is_none());

        let item = parse_item("3x4@#00ff00").unwrap();
        assert_eq!(item.quantity, 4);
        assert!(item.color_hex.is_some());
    }

    #[test]
    fn test_parse_item_rejects_garbage() {
        assert!(parse_item("abc").is_err());
        assert!(parse_item("3xmany").is_err());
        assert!(parse_item("3@red").is_err());
    }
}
