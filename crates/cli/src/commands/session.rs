//! Stored session commands.

use rafal_storefront::AppState;
use rafal_storefront::error::{clear_sentry_session, set_sentry_session};
use serde_json::json;
use tracing::info;

use super::{CliError, print_json};

pub fn login(state: &AppState, token: &str) -> Result<(), CliError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CliError::InvalidArgument("token cannot be empty".to_owned()));
    }
    state.session().login(token)?;
    set_sentry_session(&state.session().cart_session_key());
    info!("Logged in");
    show(state)
}

pub fn logout(state: &AppState) -> Result<(), CliError> {
    state.session().logout()?;
    clear_sentry_session();
    info!("Logged out");
    show(state)
}

pub fn show(state: &AppState) -> Result<(), CliError> {
    print_json(&json!({
        "authenticated": state.session().is_authenticated(),
        "store": state.config().store_path.display().to_string(),
    }))
}
