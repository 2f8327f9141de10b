//! Integration tests for Reef.
//!
//! The tests in `tests/` drive the real middleware router over HTTP against
//! a `wiremock` stub standing in for the BigCommerce API. The harness here
//! builds a middleware instance on an ephemeral port wired to a given
//! upstream URL.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p reef-integration-tests
//! ```

use std::time::Duration;

use reef_core::{ChannelId, Storefront, Storefronts};
use reef_middleware::config::{BigcommerceConfig, LOCAL_DEV_ORIGIN, MiddlewareConfig};
use reef_middleware::routes;
use reef_middleware::state::AppState;
use secrecy::SecretString;

/// Store hash every test configuration uses; stub paths embed it.
pub const STORE_HASH: &str = "abc123xyz";

/// Extra allow-listed origin for CORS tests.
pub const STOREFRONT_ORIGIN: &str = "https://store1.demo-bc.vuestorefront.io";

/// A configuration pointed at a stubbed upstream.
#[must_use]
pub fn test_config(upstream_url: &str, cache_ttl: Duration) -> MiddlewareConfig {
    MiddlewareConfig {
        host: "127.0.0.1".parse().expect("loopback address"),
        port: 0,
        allowed_origins: vec![LOCAL_DEV_ORIGIN.to_string(), STOREFRONT_ORIGIN.to_string()],
        cache_ttl,
        bigcommerce: BigcommerceConfig {
            api_url: upstream_url.to_string(),
            client_id: "t7q0sk2f1dmx".to_string(),
            client_secret: SecretString::from("k2p9mc4xv81rz0wq"),
            access_token: SecretString::from("b5nj3tqy7r0wp8xz"),
            store_hash: STORE_HASH.to_string(),
            graphql_max_retry: 1,
            jwt_token_expiration_days: 2,
        },
        storefronts: Storefronts {
            default_channel: ChannelId::new(1),
            hosts: vec![(
                "store1.demo-bc.vuestorefront.io".to_owned(),
                Storefront {
                    name: "Household items".to_owned(),
                    channel_id: ChannelId::new(983_771),
                    protocol: None,
                },
            )],
        },
        sentry_dsn: None,
    }
}

/// Spawn a middleware instance and return its base URL.
///
/// The server lives on a background task for the rest of the test process;
/// tests each spawn their own instance, so no cross-test state leaks.
pub async fn spawn_middleware(config: MiddlewareConfig) -> String {
    let state = AppState::new(config).expect("middleware state");
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    format!("http://{addr}")
}

/// Spawn a middleware instance with the default test configuration.
pub async fn spawn_default_middleware(upstream_url: &str) -> String {
    spawn_middleware(test_config(upstream_url, Duration::from_secs(60))).await
}
