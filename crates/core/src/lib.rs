//! RAFAL Core - Shared domain types.
//!
//! This crate provides the types used across the RAFAL checkout components:
//! - `storefront` - Backend clients, checkout flow and widget state
//! - `cli` - Command-line driver for the checkout flows
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no persisted state. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, phone numbers, colours and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
