//! RAFAL storefront client library.
//!
//! Order placement, payment gateway hand-off, promotional banners and the
//! headless widget state behind the purchase pages. Front ends (the `rafal`
//! CLI, integration tests) build an [`state::AppState`] from
//! [`config::StorefrontConfig`] and drive the services through it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod storage;
pub mod widgets;

pub use error::{Result, StorefrontError};
pub use state::AppState;
