//! Status and selector enums for orders and payments.

use serde::{Deserialize, Serialize};

/// Order lifecycle status as reported by the backend.
///
/// `Failed` never comes from the backend: it marks a submission that did not
/// produce an order (transport error, non-2xx, malformed body).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Parse a backend status string; unrecognised values map to `Unknown`.
    #[must_use]
    pub fn from_backend(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "cancelled" | "canceled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// How the buyer pays for an order.
///
/// Serialized exactly as the order endpoints expect (`"Cash"` / `"Card"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cash,
    /// Online payment through a gateway.
    Card,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cash => f.write_str("Cash"),
            Self::Card => f.write_str("Card"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Payment gateway used for a card payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    Fawry,
    Aman,
    /// Used whenever neither Fawry nor Aman is selected.
    #[default]
    Paymob,
}

impl PaymentProvider {
    /// Resolve the provider from the checkout form's two flags.
    ///
    /// Fawry wins over Aman; with both unset the provider is Paymob.
    #[must_use]
    pub const fn from_flags(fawry: bool, aman: bool) -> Self {
        if fawry {
            Self::Fawry
        } else if aman {
            Self::Aman
        } else {
            Self::Paymob
        }
    }

    /// The `(fawry, aman)` flag pair sent to the payment checker.
    #[must_use]
    pub const fn flags(&self) -> (bool, bool) {
        match self {
            Self::Fawry => (true, false),
            Self::Aman => (false, true),
            Self::Paymob => (false, false),
        }
    }

    /// Providers that settle outside the embedded frame (reference-code
    /// payment at a kiosk), so a response without a redirect is still a
    /// successful hand-off.
    #[must_use]
    pub const fn completes_out_of_band(&self) -> bool {
        matches!(self, Self::Fawry | Self::Aman)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fawry => "fawry",
            Self::Aman => "aman",
            Self::Paymob => "paymob",
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fawry" => Ok(Self::Fawry),
            "aman" => Ok(Self::Aman),
            "paymob" => Ok(Self::Paymob),
            _ => Err(format!("invalid payment provider: {s}")),
        }
    }
}
