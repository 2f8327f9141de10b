//! Application state shared across handlers.

use std::sync::Arc;

use reef_core::Storefronts;

use crate::bigcommerce::{BigcommerceClient, BigcommerceError};
use crate::cache::ResponseCache;
use crate::config::MiddlewareConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration, the upstream client, and the response cache, which is
/// the only cross-request shared state in the process.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: MiddlewareConfig,
    bigcommerce: BigcommerceClient,
    cache: ResponseCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream client cannot be constructed from
    /// the configuration.
    pub fn new(config: MiddlewareConfig) -> Result<Self, BigcommerceError> {
        let bigcommerce = BigcommerceClient::new(&config.bigcommerce)?;
        let cache = ResponseCache::new(config.cache_ttl);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                bigcommerce,
                cache,
            }),
        })
    }

    /// Get a reference to the middleware configuration.
    #[must_use]
    pub fn config(&self) -> &MiddlewareConfig {
        &self.inner.config
    }

    /// Get a reference to the BigCommerce client.
    #[must_use]
    pub fn bigcommerce(&self) -> &BigcommerceClient {
        &self.inner.bigcommerce
    }

    /// Get a reference to the response cache.
    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    /// Get a reference to the multi-storefront table.
    #[must_use]
    pub fn storefronts(&self) -> &Storefronts {
        &self.inner.config.storefronts
    }
}
