//! Promotional banners from the ads host.
//!
//! Every fetch goes to the network. The last good list is kept in the
//! persisted store for five minutes and only served when a fetch fails; when
//! there is neither a fresh response nor a usable cache the built-in
//! fallback banners are returned, so callers always get something to show
//! unless the fallback set has been emptied.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use super::{ApiClient, ApiError};
use crate::storage::{KeyValueStore, keys};

pub const ADS_PATH: &str = "/api/ads/";

/// How long a cached banner list stays valid.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

const DEFAULT_TITLE: &str = "RAFAL Advertisement";

/// A promotional banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdBanner {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "image_ad")]
    pub image_ad: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub is_active: bool,
    /// Lower sorts first.
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Result of a connectivity probe against the ads endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedAds {
    ads: Vec<AdBanner>,
    /// Unix milliseconds at which the list was stored.
    timestamp: i64,
}

/// Built-in banners shown when neither the ads host nor the cache has any.
#[must_use]
pub fn fallback_banners() -> Vec<AdBanner> {
    let banner = |n: u8, title: &str, description: &str, photo: u32| AdBanner {
        id: format!("fallback-{n}"),
        title: title.to_owned(),
        description: Some(description.to_owned()),
        image_ad: format!(
            "https://images.pexels.com/photos/{photo}/pexels-photo-{photo}.jpeg?auto=compress&cs=tinysrgb&w=1200"
        ),
        link: Some("/products".to_owned()),
        is_active: true,
        priority: i64::from(n),
        start_date: None,
        end_date: None,
    };
    vec![
        banner(
            1,
            "RAFAL Electric - Premium Appliances",
            "Discover our latest collection of high-quality electrical appliances",
            1_599_791,
        ),
        banner(
            2,
            "Special Offers & Discounts",
            "Save up to 30% on selected RAFAL Electric products",
            4_107_252,
        ),
        banner(
            3,
            "Free Delivery & Installation",
            "Enjoy free delivery and professional installation on all orders",
            2_724_749,
        ),
    ]
}

/// Normalize an ads response into the display list.
///
/// Accepts a bare array, an object with a `results` array, or a single ad
/// object. Items that are not objects are skipped. The result holds only
/// active banners with a title and an image, sorted by ascending priority
/// (stable for equal priorities).
#[must_use]
pub fn transform_response(data: &Value, client: &ApiClient, now: DateTime<Utc>) -> Vec<AdBanner> {
    let items: Vec<&Value> = match data {
        Value::Array(list) => list.iter().collect(),
        Value::Object(obj) => match obj.get("results") {
            Some(Value::Array(list)) => list.iter().collect(),
            _ => vec![data],
        },
        _ => {
            warn!("Unrecognized ads response shape");
            return Vec::new();
        }
    };

    let mut ads: Vec<AdBanner> = items
        .into_iter()
        .filter(|item| item.is_object())
        .enumerate()
        .map(|(index, item)| transform_item(item, index, client, now))
        .filter(|ad| {
            let valid = ad.is_active && !ad.image_ad.is_empty() && !ad.title.is_empty();
            if !valid {
                debug!(id = %ad.id, "Filtering out inactive or incomplete ad");
            }
            valid
        })
        .collect();

    ads.sort_by_key(|ad| ad.priority);
    ads
}

fn transform_item(item: &Value, index: usize, client: &ApiClient, now: DateTime<Utc>) -> AdBanner {
    let text = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };

    let id = match item.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("ad-{}-{index}", now.timestamp_millis()),
    };
    let image_ad = text("image_ad")
        .map(|url| client.resolve_link(&url))
        .unwrap_or_default();

    AdBanner {
        id,
        title: match item.get("title") {
            Some(Value::String(s)) => s.clone(),
            _ => DEFAULT_TITLE.to_owned(),
        },
        description: text("description"),
        image_ad,
        link: text("link"),
        is_active: parse_active(item, now),
        priority: parse_priority(item, index),
        start_date: text("start_date"),
        end_date: text("end_date"),
    }
}

/// An explicit `is_active`/`isActive` flag wins; otherwise the optional date
/// window decides; otherwise the ad is active.
fn parse_active(item: &Value, now: DateTime<Utc>) -> bool {
    if let Some(flag) = item.get("is_active").or_else(|| item.get("isActive")) {
        return truthy(flag);
    }
    let date = |key: &str| item.get(key).and_then(Value::as_str).and_then(parse_date);
    if date("start_date").is_some_and(|start| start > now) {
        return false;
    }
    if date("end_date").is_some_and(|end| end < now) {
        return false;
    }
    true
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

/// A non-zero numeric priority, else the item's position.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn parse_priority(item: &Value, index: usize) -> i64 {
    let parsed = match item.get("priority") {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    };
    parsed
        .filter(|p| *p != 0)
        .unwrap_or_else(|| i64::try_from(index).unwrap_or(i64::MAX))
}

/// Client for the ads endpoint with a persisted five-minute cache.
#[derive(Clone)]
pub struct AdsService {
    client: ApiClient,
    store: Arc<dyn KeyValueStore>,
    fetch_timeout: Duration,
    ping_timeout: Duration,
    fallback: Arc<Vec<AdBanner>>,
}

impl std::fmt::Debug for AdsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdsService")
            .field("client", &self.client)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("ping_timeout", &self.ping_timeout)
            .field("fallback", &self.fallback.len())
            .finish_non_exhaustive()
    }
}

impl AdsService {
    #[must_use]
    pub fn new(
        client: ApiClient,
        store: Arc<dyn KeyValueStore>,
        fetch_timeout: Duration,
        ping_timeout: Duration,
    ) -> Self {
        Self {
            client,
            store,
            fetch_timeout,
            ping_timeout,
            fallback: Arc::new(fallback_banners()),
        }
    }

    /// Replace the built-in fallback set.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Vec<AdBanner>) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    /// Fetch the current banners.
    ///
    /// A non-empty result is cached. An empty one yields the fallback set.
    /// On any failure the cached list is used if still valid, else the
    /// fallback set.
    #[instrument(skip(self))]
    pub async fn fetch_ads(&self) -> Vec<AdBanner> {
        info!("Fetching advertisements");
        match self.fetch_remote().await {
            Ok(ads) if !ads.is_empty() => {
                self.cache_ads(&ads);
                info!(count = ads.len(), "Fetched advertisements");
                ads
            }
            Ok(_) => {
                warn!("Ads host returned no active advertisements, using fallback");
                self.fallback.to_vec()
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch advertisements");
                let cached = self.cached_ads();
                if cached.is_empty() {
                    info!("Using fallback advertisements");
                    self.fallback.to_vec()
                } else {
                    info!(count = cached.len(), "Using cached advertisements");
                    cached
                }
            }
        }
    }

    /// Drop the cache and fetch again.
    pub async fn refresh_cache(&self) -> Vec<AdBanner> {
        if let Err(e) = self.store.remove(keys::ADS_CACHE) {
            warn!(error = %e, "Failed to clear ads cache");
        }
        debug!("Ads cache cleared");
        self.fetch_ads().await
    }

    /// Whether a cached list exists and is younger than [`CACHE_TTL`].
    #[must_use]
    pub fn is_cache_valid(&self) -> bool {
        self.read_cache()
            .is_some_and(|cache| !is_expired(cache.timestamp, Utc::now()))
    }

    /// Probe the ads endpoint with the short connectivity timeout.
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> ConnectionReport {
        let result = async {
            let url = self.client.endpoint(ADS_PATH)?;
            self.client
                .execute(Method::GET, url, None, None, self.ping_timeout)
                .await
        }
        .await;

        let failure = |message: String| ConnectionReport {
            success: false,
            message,
            data: None,
        };

        match result {
            Ok(raw) if !raw.status.is_success() => failure(format!(
                "API returned status {}: {}",
                raw.status.as_u16(),
                raw.status.canonical_reason().unwrap_or("")
            )),
            Ok(raw) => match raw.json::<Value>() {
                Ok(data) => ConnectionReport {
                    success: true,
                    message: "RAFAL API connection successful".to_owned(),
                    data: Some(data),
                },
                Err(e) => failure(e.to_string()),
            },
            Err(ApiError::Timeout(_)) => failure("Connection timeout".to_owned()),
            Err(e) => {
                error!(error = %e, "Connection test failed");
                failure(e.to_string())
            }
        }
    }

    async fn fetch_remote(&self) -> Result<Vec<AdBanner>, ApiError> {
        let url = self.client.endpoint(ADS_PATH)?;
        let raw = self
            .client
            .execute(Method::GET, url, None, None, self.fetch_timeout)
            .await?;
        if !raw.status.is_success() {
            return Err(raw.into_status_error("Ads request"));
        }
        let data: Value = raw.json()?;
        Ok(transform_response(&data, &self.client, Utc::now()))
    }

    fn read_cache(&self) -> Option<CachedAds> {
        let raw = match self.store.get(keys::ADS_CACHE) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read ads cache");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .inspect_err(|e| warn!(error = %e, "Ignoring unreadable ads cache"))
            .ok()
    }

    /// Cached banners if still valid. An expired entry is removed.
    fn cached_ads(&self) -> Vec<AdBanner> {
        let Some(cache) = self.read_cache() else {
            return Vec::new();
        };
        if is_expired(cache.timestamp, Utc::now()) {
            if let Err(e) = self.store.remove(keys::ADS_CACHE) {
                warn!(error = %e, "Failed to remove expired ads cache");
            }
            debug!("Ads cache expired");
            return Vec::new();
        }
        cache.ads
    }

    fn cache_ads(&self, ads: &[AdBanner]) {
        let entry = CachedAds {
            ads: ads.to_vec(),
            timestamp: Utc::now().timestamp_millis(),
        };
        let stored = serde_json::to_string(&entry)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.store
                    .set(keys::ADS_CACHE, &json)
                    .map_err(|e| e.to_string())
            });
        match stored {
            Ok(()) => debug!(count = ads.len(), "Cached advertisements"),
            Err(e) => warn!(error = %e, "Failed to cache advertisements"),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn is_expired(timestamp: i64, now: DateTime<Utc>) -> bool {
    now.timestamp_millis() - timestamp > CACHE_TTL.as_millis() as i64
}
