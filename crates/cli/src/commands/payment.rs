//! Payment hand-off and verification commands.

use rafal_core::{OrderId, PaymentProvider};
use rafal_storefront::AppState;
use tracing::info;

use super::{CliError, print_json};

pub async fn pay(
    state: &AppState,
    order_id: OrderId,
    provider: PaymentProvider,
) -> Result<(), CliError> {
    let result = state
        .payments()
        .check_payment(order_id, provider.into())
        .await;
    print_json(&result)?;

    if !result.success {
        return Err(CliError::Rejected(
            result.message.unwrap_or_else(|| "Payment check failed".to_owned()),
        ));
    }
    if let Some(url) = &result.redirect_url {
        info!(%url, "Open the gateway page to complete payment");
    }
    Ok(())
}

pub async fn verify(state: &AppState, payment_id: &str) -> Result<(), CliError> {
    let result = state.payments().verify_payment(payment_id).await;
    print_json(&result)?;

    if result.success {
        Ok(())
    } else {
        Err(CliError::Rejected(
            result.message.unwrap_or_else(|| "Payment failed".to_owned()),
        ))
    }
}
