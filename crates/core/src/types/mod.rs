//! Core types for the RAFAL storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod color;
pub mod contact;
pub mod id;
pub mod price;
pub mod status;

pub use color::{ColorHex, ColorHexError};
pub use contact::{Email, EmailError, PhoneError, PhoneNumber};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use status::*;
