//! Shared client state.

use std::sync::Arc;

use crate::api::{ApiClient, AdsService, OrderService, PaymentService};
use crate::checkout::CheckoutFlow;
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::session::Session;
use crate::storage::{FileStore, KeyValueStore};

/// Everything a storefront front end needs, wired from one configuration.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn KeyValueStore>,
    session: Session,
    orders: OrderService,
    payments: PaymentService,
    ads: AdsService,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("api_base_url", &self.inner.config.api_base_url.as_str())
            .field("ads_base_url", &self.inner.config.ads_base_url.as_str())
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build state backed by the file store named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.store_path.clone()));
        Self::with_store(config, store)
    }

    /// Build state on top of an arbitrary key/value store.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be built.
    pub fn with_store(config: StorefrontConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let api = ApiClient::new(config.api_base_url.clone())?;
        let ads_client = ApiClient::new(config.ads_base_url.clone())?;
        let session = Session::load(Arc::clone(&store));
        let timeouts = config.timeouts;

        let orders = OrderService::new(api.clone(), session.clone(), timeouts.order);
        let payments = PaymentService::new(api, session.clone(), timeouts.order);
        let ads = AdsService::new(ads_client, Arc::clone(&store), timeouts.ads, timeouts.ping);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                session,
                orders,
                payments,
                ads,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.store
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn payments(&self) -> &PaymentService {
        &self.inner.payments
    }

    #[must_use]
    pub fn ads(&self) -> &AdsService {
        &self.inner.ads
    }

    /// A checkout flow over this state's order and payment services.
    #[must_use]
    pub fn checkout(&self) -> CheckoutFlow {
        CheckoutFlow::new(self.inner.orders.clone(), self.inner.payments.clone())
    }
}
