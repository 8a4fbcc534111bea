//! The submit sequence behind the purchase and cart checkout forms:
//! validate, place the order, and for card payments hand off to the gateway.

use rafal_core::{ColorHex, OrderId, PaymentMethod, ProductId};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::form::{BuyerDetails, Field, FormErrors};
use crate::api::{
    CheckoutRequest, DirectBuyRequest, Order, OrderItem, OrderService, PaymentOptions,
    PaymentService,
};
use crate::error::{add_breadcrumb, report_failure};

const ORDER_FAILED: &str = "Failed to place order. Please try again.";
const PAYMENT_FAILED: &str = "Failed to process payment. Please try again.";

/// What the buyer picked on the single-product purchase page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectPurchase {
    pub product_id: ProductId,
    pub quantity: u32,
    pub color: Option<ColorHex>,
}

/// Where the checkout ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Client-side validation failed; nothing was sent.
    Invalid { errors: FormErrors },
    /// The order or the payment hand-off failed.
    Failed { message: String },
    /// The order is placed and needs no further action.
    Confirmed { order: Order },
    /// The order is placed and the gateway page must be shown.
    AwaitingPayment {
        order: Order,
        redirect_url: String,
        payment_id: Option<String>,
    },
}

impl CheckoutOutcome {
    #[must_use]
    pub const fn order(&self) -> Option<&Order> {
        match self {
            Self::Confirmed { order } | Self::AwaitingPayment { order, .. } => Some(order),
            Self::Invalid { .. } | Self::Failed { .. } => None,
        }
    }
}

/// Validate, submit, and (for card payments) request the gateway redirect.
#[derive(Debug, Clone)]
pub struct CheckoutFlow {
    orders: OrderService,
    payments: PaymentService,
}

impl CheckoutFlow {
    #[must_use]
    pub const fn new(orders: OrderService, payments: PaymentService) -> Self {
        Self { orders, payments }
    }

    /// Buy a single product without going through the cart.
    #[instrument(skip(self, details), fields(product_id = %purchase.product_id))]
    pub async fn direct_buy(
        &self,
        details: &BuyerDetails,
        purchase: &DirectPurchase,
    ) -> CheckoutOutcome {
        let (buyer, payment_method) = match details.validate() {
            Ok(valid) => valid,
            Err(errors) => return CheckoutOutcome::Invalid { errors },
        };

        let mut item = OrderItem::new(purchase.product_id, purchase.quantity.max(1));
        item.color_hex.clone_from(&purchase.color);
        let request = DirectBuyRequest {
            buyer,
            item,
            payment_method,
        };

        let order = self.orders.direct_buy(&request).await;
        self.after_order(order, payment_method, details.payment_options)
            .await
    }

    /// Check out every line in the cart.
    #[instrument(skip(self, details, items), fields(lines = items.len()))]
    pub async fn checkout_cart(
        &self,
        details: &BuyerDetails,
        items: &[OrderItem],
        session_key: Option<String>,
    ) -> CheckoutOutcome {
        let validated = details.validate();
        if items.is_empty() {
            let mut errors = validated.err().unwrap_or_default();
            errors.insert(Field::Items, "Your cart is empty");
            return CheckoutOutcome::Invalid { errors };
        }
        let (buyer, payment_method) = match validated {
            Ok(valid) => valid,
            Err(errors) => return CheckoutOutcome::Invalid { errors },
        };

        let request = CheckoutRequest {
            buyer,
            items: items
                .iter()
                .map(|item| OrderItem {
                    quantity: item.quantity.max(1),
                    ..item.clone()
                })
                .collect(),
            payment_method,
            session_key,
        };

        let order = self.orders.checkout(&request).await;
        self.after_order(order, payment_method, details.payment_options)
            .await
    }

    async fn after_order(
        &self,
        order: Order,
        payment_method: PaymentMethod,
        options: PaymentOptions,
    ) -> CheckoutOutcome {
        if !order.success {
            let message = order.message.unwrap_or_else(|| ORDER_FAILED.to_owned());
            report_failure("Order", &message);
            return CheckoutOutcome::Failed { message };
        }
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_number", order.order_number.as_str())]),
        );

        if payment_method == PaymentMethod::Cash {
            info!(order_number = %order.order_number, "Cash order confirmed");
            return CheckoutOutcome::Confirmed { order };
        }

        let Some(order_id) = order.id else {
            warn!(order_number = %order.order_number, "Card order has no id to pay for");
            report_failure("Payment", PAYMENT_FAILED);
            return CheckoutOutcome::Failed {
                message: PAYMENT_FAILED.to_owned(),
            };
        };
        self.hand_off(order, order_id, options).await
    }

    async fn hand_off(
        &self,
        order: Order,
        order_id: OrderId,
        options: PaymentOptions,
    ) -> CheckoutOutcome {
        let payment = self.payments.check_payment(order_id, options).await;
        if !payment.success {
            let message = payment.message.unwrap_or_else(|| PAYMENT_FAILED.to_owned());
            report_failure("Payment", &message);
            return CheckoutOutcome::Failed { message };
        }

        match payment.redirect_url {
            Some(redirect_url) => {
                info!(%redirect_url, "Awaiting gateway payment");
                CheckoutOutcome::AwaitingPayment {
                    order,
                    redirect_url,
                    payment_id: payment.payment_id,
                }
            }
            None => {
                info!(provider = %options.provider(), "Payment completes out of band");
                CheckoutOutcome::Confirmed { order }
            }
        }
    }
}
