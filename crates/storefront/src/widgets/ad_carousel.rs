//! Rotating advertisement banner.
//!
//! ```text
//! Loading --> Displaying <--> Refreshing
//!    |            ^
//!    +--> Error --+ (retry)
//! ```
//!
//! While displaying, an auto-advance task moves to the next slide every
//! `slide_total / banner_count` (only with more than one banner), and a
//! background task checks the ads cache every five minutes and refreshes
//! when it has expired. [`AdCarousel::teardown`] (or dropping the carousel)
//! aborts both.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

use crate::api::{AdBanner, AdsService, ConnectionReport};

pub const CACHE_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

const NO_ADS: &str = "No active advertisements available";

/// Where banners come from.
pub trait BannerSource: Send + Sync + 'static {
    /// Banners for the first load.
    fn load(&self) -> impl Future<Output = Vec<AdBanner>> + Send;

    /// Banners after discarding any cache.
    fn refresh(&self) -> impl Future<Output = Vec<AdBanner>> + Send;

    fn test_connection(&self) -> impl Future<Output = ConnectionReport> + Send;

    fn is_cache_valid(&self) -> bool;
}

impl BannerSource for AdsService {
    fn load(&self) -> impl Future<Output = Vec<AdBanner>> + Send {
        self.fetch_ads()
    }

    fn refresh(&self) -> impl Future<Output = Vec<AdBanner>> + Send {
        self.refresh_cache()
    }

    fn test_connection(&self) -> impl Future<Output = ConnectionReport> + Send {
        Self::test_connection(self)
    }

    fn is_cache_valid(&self) -> bool {
        Self::is_cache_valid(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CarouselState {
    Loading,
    Error { message: String },
    Displaying,
    Refreshing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Unknown,
    Connected,
    Disconnected,
}

/// What clicking a banner should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BannerTarget {
    /// Open in a new window.
    External(String),
    /// Navigate within the storefront.
    Internal(String),
    None,
}

impl BannerTarget {
    #[must_use]
    pub fn for_banner(banner: &AdBanner) -> Self {
        match banner.link.as_deref().map(str::trim) {
            Some(link) if link.starts_with("http") => Self::External(link.to_owned()),
            Some(link) if !link.is_empty() => Self::Internal(link.to_owned()),
            _ => Self::None,
        }
    }
}

/// Everything needed to render the carousel.
#[derive(Debug, Clone, Serialize)]
pub struct CarouselView {
    pub state: CarouselState,
    pub banners: Vec<AdBanner>,
    pub current: usize,
    pub connection: ConnectionStatus,
    pub last_updated: Option<DateTime<Utc>>,
}

impl CarouselView {
    #[must_use]
    pub fn current_banner(&self) -> Option<&AdBanner> {
        self.banners.get(self.current)
    }
}

struct Inner<S> {
    source: S,
    slide_total: Duration,
    auto_slide: bool,
    view: Mutex<CarouselView>,
    auto_task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: BannerSource> Inner<S> {
    fn view(&self) -> std::sync::MutexGuard<'_, CarouselView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn load(self: &Arc<Self>, refreshing: bool) {
        {
            let mut view = self.view();
            view.state = if refreshing {
                CarouselState::Refreshing
            } else {
                CarouselState::Loading
            };
        }

        if refreshing {
            let report = self.source.test_connection().await;
            self.view().connection = connection_status(&report);
            if !report.success {
                warn!(message = %report.message, "Ads connection test failed");
            }
        }

        let banners = if refreshing {
            self.source.refresh().await
        } else {
            self.source.load().await
        };
        self.apply(banners);
    }

    fn apply(self: &Arc<Self>, banners: Vec<AdBanner>) {
        let count = banners.len();
        {
            let mut view = self.view();
            if banners.is_empty() {
                warn!("No advertisements to display");
                view.state = CarouselState::Error {
                    message: NO_ADS.to_owned(),
                };
                view.connection = ConnectionStatus::Disconnected;
                view.banners.clear();
            } else {
                info!(count, "Displaying advertisements");
                view.state = CarouselState::Displaying;
                view.banners = banners;
                view.connection = ConnectionStatus::Connected;
                view.last_updated = Some(Utc::now());
            }
            view.current = 0;
        }
        self.restart_auto_advance(count);
    }

    fn restart_auto_advance(self: &Arc<Self>, count: usize) {
        let mut slot = self.auto_task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        let Some(period) = slide_interval(self.slide_total, count).filter(|_| self.auto_slide)
        else {
            return;
        };
        let inner = Arc::downgrade(self);
        *slot = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                inner.step(1);
            }
        }));
    }

    fn step(&self, delta: isize) {
        let mut view = self.view();
        let len = view.banners.len();
        if len == 0 {
            return;
        }
        view.current = wrap(view.current, delta, len);
    }

    fn stop_auto_advance(&self) {
        if let Some(handle) = self
            .auto_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

/// Per-slide interval, or `None` when there is nothing to rotate.
#[must_use]
pub fn slide_interval(total: Duration, count: usize) -> Option<Duration> {
    if count <= 1 {
        return None;
    }
    let count = u32::try_from(count).ok()?;
    Some(total / count)
}

fn connection_status(report: &ConnectionReport) -> ConnectionStatus {
    if report.success {
        ConnectionStatus::Connected
    } else {
        ConnectionStatus::Disconnected
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
const fn wrap(current: usize, delta: isize, len: usize) -> usize {
    (current as isize + delta).rem_euclid(len as isize) as usize
}

/// The banner carousel and its timers.
pub struct AdCarousel<S: BannerSource> {
    inner: Arc<Inner<S>>,
    cache_task: Option<JoinHandle<()>>,
}

impl<S: BannerSource> std::fmt::Debug for AdCarousel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdCarousel")
            .field("view", &*self.inner.view())
            .finish_non_exhaustive()
    }
}

impl<S: BannerSource> AdCarousel<S> {
    #[must_use]
    pub fn new(source: S, slide_total: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                slide_total,
                auto_slide: true,
                view: Mutex::new(CarouselView {
                    state: CarouselState::Loading,
                    banners: Vec::new(),
                    current: 0,
                    connection: ConnectionStatus::Unknown,
                    last_updated: None,
                }),
                auto_task: Mutex::new(None),
            }),
            cache_task: None,
        }
    }

    /// Disable the auto-advance timer. Must be called before [`Self::mount`].
    #[must_use]
    pub fn without_auto_slide(mut self) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.auto_slide = false;
        }
        self
    }

    /// Load the banners and start the timers.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn mount(&mut self) {
        self.inner.load(false).await;

        if let Some(handle) = self.cache_task.take() {
            handle.abort();
        }
        let inner = Arc::downgrade(&self.inner);
        self.cache_task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(
                Instant::now() + CACHE_CHECK_INTERVAL,
                CACHE_CHECK_INTERVAL,
            );
            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                if !inner.source.is_cache_valid() {
                    debug!("Ads cache expired, refreshing");
                    inner.load(true).await;
                }
            }
        }));
    }

    /// Re-test connectivity and fetch fresh banners. Also the retry action
    /// of the error state.
    pub async fn refresh(&self) {
        info!("Manual ads refresh");
        self.inner.load(true).await;
    }

    #[must_use]
    pub fn view(&self) -> CarouselView {
        self.inner.view().clone()
    }

    #[must_use]
    pub fn state(&self) -> CarouselState {
        self.inner.view().state.clone()
    }

    #[must_use]
    pub fn current_slide(&self) -> usize {
        self.inner.view().current
    }

    pub fn next(&self) {
        self.inner.step(1);
    }

    pub fn prev(&self) {
        self.inner.step(-1);
    }

    /// Jump to a slide. Out-of-range indices are ignored.
    pub fn go_to(&self, index: usize) {
        let mut view = self.inner.view();
        if index < view.banners.len() {
            view.current = index;
        }
    }

    /// Resolve what a click on the current banner should do.
    #[must_use]
    pub fn click_current(&self) -> BannerTarget {
        self.inner
            .view()
            .current_banner()
            .map_or(BannerTarget::None, BannerTarget::for_banner)
    }

    /// Cancel every timer. The view keeps its last state.
    pub fn teardown(&mut self) {
        self.inner.stop_auto_advance();
        if let Some(handle) = self.cache_task.take() {
            handle.abort();
        }
    }
}

impl<S: BannerSource> Drop for AdCarousel<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
