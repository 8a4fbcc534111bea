//! Advertisement commands.

use rafal_storefront::AppState;
use tracing::{info, warn};

use super::{CliError, print_json};

pub async fn list(state: &AppState) -> Result<(), CliError> {
    let ads = state.ads().fetch_ads().await;
    info!(
        count = ads.len(),
        cached = state.ads().is_cache_valid(),
        "Loaded advertisements"
    );
    print_json(&ads)
}

pub async fn refresh(state: &AppState) -> Result<(), CliError> {
    let ads = state.ads().refresh_cache().await;
    print_json(&ads)
}

pub async fn ping(state: &AppState) -> Result<(), CliError> {
    let report = state.ads().test_connection().await;
    print_json(&report)?;
    if report.success {
        Ok(())
    } else {
        warn!(message = %report.message, "Ads host unreachable");
        Err(CliError::Rejected(report.message))
    }
}
