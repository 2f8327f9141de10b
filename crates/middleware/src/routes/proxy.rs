//! The integration invocation endpoint.
//!
//! `POST /{integration}/{method}` with a JSON array body is translated into
//! a call against the upstream client, optionally through the response
//! cache. The upstream body is returned verbatim; cache hits carry a
//! top-level `cached: true` marker so browser clients can tell a stale-ish
//! body from a fresh one.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::instrument;

use crate::bigcommerce::{self, methods};
use crate::cache::CallId;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storefronts::resolve_channel;

/// Invoke an integration method.
///
/// # Errors
///
/// - 404 for an unknown integration or method name
/// - 400 for malformed arguments
/// - upstream errors pass through with their status and body
/// - 502 for transport failures
#[instrument(skip(state, headers, args), fields(integration = %integration, method = %method))]
pub async fn invoke(
    State(state): State<AppState>,
    Path((integration, method)): Path<(String, String)>,
    headers: HeaderMap,
    Json(args): Json<Vec<Value>>,
) -> Result<Response> {
    if integration != bigcommerce::INTEGRATION_NAME {
        return Err(AppError::UnknownIntegration(integration));
    }

    let Some(entry) = methods::lookup(&method) else {
        return Err(AppError::UnknownMethod {
            integration,
            method,
        });
    };

    let channel = resolve_channel(&headers, state.storefronts());

    if !entry.cacheable {
        let body = state
            .bigcommerce()
            .invoke(entry.method, channel, &args)
            .await?;
        return Ok(Json(body).into_response());
    }

    let key = CallId::new(&integration, &method, channel, &args);
    let client = state.bigcommerce().clone();
    let upstream = move || async move {
        client
            .invoke(entry.method, channel, &args)
            .await
            .map_err(AppError::from)
    };

    if wants_fresh(&headers) {
        // Bypass: recompute, refresh the entry, and never mark the response
        // as cached
        let response = state.cache().refresh(key, upstream).await?;
        return Ok(Json(response.body.clone()).into_response());
    }

    let lookup = state.cache().get_or_invoke(key, upstream).await?;
    let mut body = lookup.response.body.clone();
    if lookup.cached {
        annotate_cached(&mut body);
    }

    Ok(Json(body).into_response())
}

/// Whether the request asks to skip the cache (`Cache-Control: no-cache`).
fn wants_fresh(headers: &HeaderMap) -> bool {
    headers
        .get(header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            v.split(',')
                .any(|directive| directive.trim().eq_ignore_ascii_case("no-cache"))
        })
}

/// Mark a response body as served from cache.
///
/// Only object bodies can carry the marker; the upstream APIs answer with
/// objects everywhere the cache applies.
fn annotate_cached(body: &mut Value) {
    if let Value::Object(map) = body {
        map.insert("cached".to_string(), Value::Bool(true));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wants_fresh() {
        let mut headers = HeaderMap::new();
        assert!(!wants_fresh(&headers));

        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        assert!(wants_fresh(&headers));

        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("max-age=0, No-Cache"),
        );
        assert!(wants_fresh(&headers));

        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        assert!(!wants_fresh(&headers));
    }

    #[test]
    fn test_annotate_cached() {
        let mut body = json!({ "data": { "urls": [] } });
        annotate_cached(&mut body);
        assert_eq!(body.get("cached"), Some(&json!(true)));

        // Non-object bodies are left alone
        let mut body = json!([1, 2, 3]);
        annotate_cached(&mut body);
        assert!(body.get("cached").is_none());
    }
}
