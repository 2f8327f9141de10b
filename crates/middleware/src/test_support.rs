//! Shared fixtures for in-crate tests.

use std::time::Duration;

use reef_core::{ChannelId, Storefronts};
use secrecy::SecretString;

use crate::config::{BigcommerceConfig, LOCAL_DEV_ORIGIN, MiddlewareConfig};
use crate::state::AppState;

/// An `AppState` pointed at the given upstream base URL.
#[allow(clippy::unwrap_used)]
pub fn test_state(api_url: &str) -> AppState {
    let config = MiddlewareConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        allowed_origins: vec![LOCAL_DEV_ORIGIN.to_string()],
        cache_ttl: Duration::from_secs(60),
        bigcommerce: BigcommerceConfig {
            api_url: api_url.to_string(),
            client_id: "t7q0sk2f1dmx".to_string(),
            client_secret: SecretString::from("k2p9mc4xv81rz0wq"),
            access_token: SecretString::from("b5nj3tqy7r0wp8xz"),
            store_hash: "abc123xyz".to_string(),
            graphql_max_retry: 1,
            jwt_token_expiration_days: 2,
        },
        storefronts: Storefronts::with_default(ChannelId::new(1)),
        sentry_dsn: None,
    };

    AppState::new(config).unwrap()
}
