//! Command implementations.

pub mod ads;
pub mod order;
pub mod payment;
pub mod session;

use clap::Args;
use rafal_core::{PaymentMethod, PaymentProvider};
use rafal_storefront::StorefrontError;
use rafal_storefront::api::PaymentOptions;
use rafal_storefront::checkout::BuyerDetails;
use rafal_storefront::storage::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Errors that end a command with a non-zero exit status.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    /// The backend (or local validation) rejected the operation.
    #[error("{0}")]
    Rejected(String),
}

/// Buyer identity and shipping address flags.
#[derive(Debug, Args)]
pub struct BuyerArgs {
    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long, default_value = "")]
    pub email: String,

    /// Local number, 10 or 11 digits
    #[arg(long)]
    pub phone: String,

    #[arg(long, default_value = "EG")]
    pub country: String,

    #[arg(long)]
    pub city: String,

    #[arg(long)]
    pub region: String,

    /// Street address
    #[arg(long)]
    pub address: String,

    #[arg(long, default_value = "")]
    pub apartment: String,
}

/// How the order is paid.
#[derive(Debug, Args)]
pub struct PaymentArgs {
    /// cash or card
    #[arg(long, default_value = "cash")]
    pub payment: PaymentMethod,

    /// Card gateway: fawry, aman or paymob
    #[arg(long)]
    pub provider: Option<PaymentProvider>,
}

impl BuyerArgs {
    pub fn into_details(self, payment: &PaymentArgs) -> BuyerDetails {
        BuyerDetails {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            country: self.country,
            city: self.city,
            region: self.region,
            address: self.address,
            apartment: self.apartment,
            payment_method: Some(payment.payment),
            payment_options: payment
                .provider
                .map(PaymentOptions::from)
                .unwrap_or_default(),
        }
    }
}

/// Write a result to stdout as pretty JSON.
#[allow(clippy::print_stdout)]
pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_details_maps_provider() {
        let buyer = BuyerArgs {
            first_name: "Omar".into(),
            last_name: "Hassan".into(),
            email: String::new(),
            phone: "01012345678".into(),
            country: "EG".into(),
            city: "Giza".into(),
            region: "Dokki".into(),
            address: "5 Nile St".into(),
            apartment: String::new(),
        };
        let payment = PaymentArgs {
            payment: PaymentMethod::Card,
            provider: Some(PaymentProvider::Fawry),
        };
        let details = buyer.into_details(&payment);
        assert_eq!(details.payment_method, Some(PaymentMethod::Card));
        assert!(details.payment_options.fawry);
        assert!(!details.payment_options.aman);
        assert!(details.validate().is_ok());
    }
}
