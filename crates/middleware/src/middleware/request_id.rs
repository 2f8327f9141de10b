//! Request ID middleware for request tracing and correlation.
//!
//! The proxy sits between browser storefronts and the commerce API, so a
//! stable per-request ID is the only thing tying a browser-side failure to
//! the upstream call that caused it. IDs arriving from a fronting proxy
//! (`x-request-id`) are kept; otherwise a UUID v4 is minted.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The request's ID: the forwarded header value when present and readable,
/// a fresh UUID v4 otherwise.
fn request_id_from(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from)
}

/// Middleware that ensures every request has a unique request ID.
///
/// The ID is recorded in the current tracing span, tagged on the Sentry
/// scope for error correlation, and echoed in the response headers so the
/// storefront can surface it when reporting a failed call.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request_id_from(request.headers());

    Span::current().record("request_id", &request_id);

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("cf-ray-1234"));
        assert_eq!(request_id_from(&headers), "cf-ray-1234");
    }

    #[test]
    fn test_missing_id_is_minted() {
        let id = request_id_from(&HeaderMap::new());
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_blank_id_is_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(""));
        let id = request_id_from(&headers);
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
