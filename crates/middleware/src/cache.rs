//! Response cache for idempotent upstream calls.
//!
//! Backed by `moka` with time-to-live eviction. Entries are keyed by the
//! full call identity (integration, method, canonical argument JSON, and
//! channel), so the same call on two channels never shares a body.
//!
//! Population goes through moka's `entry()` API, which coalesces concurrent
//! lookups for the same key onto a single init future: two identical calls
//! racing before the first completes make one upstream request. Errors are
//! never cached; the shared error is handed to every coalesced waiter.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde_json::Value;
use tracing::debug;

use reef_core::ChannelId;

use crate::error::AppError;

/// Identity of a proxy call, used as the cache key.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CallId {
    integration: String,
    method: String,
    channel: i32,
    args: String,
}

impl CallId {
    /// Build a call identity from the request parts. Arguments are
    /// canonicalized as their JSON serialization.
    #[must_use]
    pub fn new(integration: &str, method: &str, channel: ChannelId, args: &[Value]) -> Self {
        Self {
            integration: integration.to_owned(),
            method: method.to_owned(),
            channel: channel.as_i32(),
            args: serde_json::to_string(args).unwrap_or_default(),
        }
    }
}

/// A cached upstream response body.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// The upstream body, verbatim.
    pub body: Value,
    /// When the entry was created.
    pub stored_at: DateTime<Utc>,
}

/// Result of a cache lookup: the response plus whether it was served from
/// an existing entry.
pub struct Lookup {
    pub response: Arc<CachedResponse>,
    /// `true` when the entry existed (or another in-flight call populated
    /// it); `false` only for the call that performed the upstream request.
    pub cached: bool,
}

/// TTL response cache shared across requests.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Cache<CallId, Arc<CachedResponse>>,
}

impl ResponseCache {
    /// Create a cache with the given time-to-live.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }

    /// Serve the call from the cache, invoking the upstream only on a miss.
    ///
    /// Concurrent calls for the same key are coalesced onto one upstream
    /// request.
    ///
    /// # Errors
    ///
    /// Returns the upstream's error; failed calls leave no cache entry.
    pub async fn get_or_invoke<F, Fut>(&self, key: CallId, invoke: F) -> Result<Lookup, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, AppError>>,
    {
        let entry = self
            .inner
            .entry(key)
            .or_try_insert_with(async move {
                let body = invoke().await?;
                Ok(Arc::new(CachedResponse {
                    body,
                    stored_at: Utc::now(),
                }))
            })
            .await
            .map_err(|e: Arc<AppError>| (*e).clone())?;

        let cached = !entry.is_fresh();
        if cached {
            debug!(stored_at = %entry.value().stored_at, "Cache hit");
        }

        Ok(Lookup {
            response: entry.into_value(),
            cached,
        })
    }

    /// Invoke the upstream unconditionally and refresh the entry.
    ///
    /// Used for cache-bypass requests: the response is fresh by definition
    /// and subsequent non-bypass calls see the refreshed entry.
    ///
    /// # Errors
    ///
    /// Returns the upstream's error; the previous entry is left in place on
    /// failure.
    pub async fn refresh<F, Fut>(
        &self,
        key: CallId,
        invoke: F,
    ) -> Result<Arc<CachedResponse>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, AppError>>,
    {
        let body = invoke().await?;
        let response = Arc::new(CachedResponse {
            body,
            stored_at: Utc::now(),
        });
        self.inner.insert(key, Arc::clone(&response)).await;
        Ok(response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde_json::json;

    use super::*;

    fn key(method: &str) -> CallId {
        CallId::new("bigcommerce", method, ChannelId::new(1), &[json!({})])
    }

    #[test]
    fn test_call_identity() {
        assert_eq!(key("getSite"), key("getSite"));
        assert_ne!(key("getSite"), key("getChannel"));

        // Same method, different channel: distinct entries
        let a = CallId::new("bigcommerce", "getSite", ChannelId::new(1), &[]);
        let b = CallId::new("bigcommerce", "getSite", ChannelId::new(983_771), &[]);
        assert_ne!(a, b);

        // Same method, different arguments: distinct entries
        let a = CallId::new("bigcommerce", "getOrders", ChannelId::new(1), &[json!({"customer_id": 1})]);
        let b = CallId::new("bigcommerce", "getOrders", ChannelId::new(1), &[json!({"customer_id": 2})]);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let calls = AtomicU32::new(0);

        let first = cache
            .get_or_invoke(key("getSite"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "data": { "urls": ["test-url"] } }))
            })
            .await
            .unwrap();
        assert!(!first.cached);

        let second = cache
            .get_or_invoke(key("getSite"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "data": { "urls": ["other-url"] } }))
            })
            .await
            .unwrap();
        assert!(second.cached);
        assert_eq!(second.response.body, first.response.body);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = ResponseCache::new(Duration::from_secs(60));

        let result = cache
            .get_or_invoke(key("getSite"), || async {
                Err(AppError::Upstream {
                    status: 404,
                    body: json!({ "title": "Channel not found" }),
                })
            })
            .await;
        assert!(matches!(result, Err(AppError::Upstream { status: 404, .. })));

        // The failed call left no entry behind
        let retry = cache
            .get_or_invoke(key("getSite"), || async { Ok(json!({ "ok": true })) })
            .await
            .unwrap();
        assert!(!retry.cached);
    }

    #[tokio::test]
    async fn test_refresh_replaces_entry() {
        let cache = ResponseCache::new(Duration::from_secs(60));

        cache
            .get_or_invoke(key("getSite"), || async { Ok(json!({ "version": 1 })) })
            .await
            .unwrap();

        let refreshed = cache
            .refresh(key("getSite"), || async { Ok(json!({ "version": 2 })) })
            .await
            .unwrap();
        assert_eq!(refreshed.body, json!({ "version": 2 }));

        // Subsequent plain lookups see the refreshed body, served from cache
        let lookup = cache
            .get_or_invoke(key("getSite"), || async { Ok(json!({ "version": 3 })) })
            .await
            .unwrap();
        assert!(lookup.cached);
        assert_eq!(lookup.response.body, json!({ "version": 2 }));
    }

    #[tokio::test]
    async fn test_single_flight_coalesces_concurrent_calls() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicU32::new(0));

        let invoke = |calls: Arc<AtomicU32>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(json!({ "data": {} }))
            }
        };

        let (a, b) = tokio::join!(
            cache.get_or_invoke(key("getSite"), invoke(Arc::clone(&calls))),
            cache.get_or_invoke(key("getSite"), invoke(Arc::clone(&calls))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Exactly one of the two performed the upstream call
        let cached_flags = [a.unwrap().cached, b.unwrap().cached];
        assert_eq!(cached_flags.iter().filter(|cached| **cached).count(), 1);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        // moka keeps its own clock, so this test runs on (short) real time
        let cache = ResponseCache::new(Duration::from_millis(100));

        cache
            .get_or_invoke(key("getSite"), || async { Ok(json!({ "version": 1 })) })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        let lookup = cache
            .get_or_invoke(key("getSite"), || async { Ok(json!({ "version": 2 })) })
            .await
            .unwrap();
        assert!(!lookup.cached);
        assert_eq!(lookup.response.body, json!({ "version": 2 }));
    }
}
