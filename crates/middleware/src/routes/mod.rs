//! HTTP routes for the proxy.
//!
//! # Route Structure
//!
//! ```text
//! GET  /healthz                  - Liveness probe
//! POST /{integration}/{method}   - Invoke an integration method
//! ```
//!
//! The integration route takes a JSON array body of positional arguments
//! and answers with the upstream JSON body (annotated with `cached: true`
//! when served from the response cache).

pub mod proxy;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::request_id_middleware;
use crate::state::AppState;
use crate::storefronts::CHANNEL_ID_HEADER;

/// Build the application router with the full middleware stack.
#[must_use]
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config().allowed_origins);

    Router::new()
        .route("/healthz", get(health))
        .route("/{integration}/{method}", post(proxy::invoke))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the upstream.
async fn health() -> &'static str {
    "ok"
}

/// The CORS gate: statically allow-listed origins with credentials.
///
/// Browser storefronts call the proxy cross-origin with cookies, so the
/// allow-list is explicit origins (browsers reject a wildcard for
/// credentialed requests). Origins that fail header encoding are dropped
/// with a warning.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unencodable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::CACHE_CONTROL,
            HeaderName::from_static(CHANNEL_ID_HEADER),
        ])
}
