//! Checkout forms and the order-then-payment submit sequence.

pub mod flow;
pub mod form;

pub use flow::{CheckoutFlow, CheckoutOutcome, DirectPurchase};
pub use form::{BuyerDetails, Field, FormErrors};
