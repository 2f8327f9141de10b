//! Client-side error taxonomy.
//!
//! Services never propagate these to the caller; each operation records its
//! failure in the store's error slot for the surrounding application to
//! inspect and render.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when calling the proxy middleware.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The proxy (or the upstream behind it) answered non-2xx.
    #[error("API error: HTTP {status}")]
    Api {
        status: u16,
        body: Value,
    },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The operation needs state the session does not have yet.
    #[error("{0}")]
    Precondition(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ClientError::Api {
            status: 422,
            body: serde_json::json!({ "title": "Missing line_items" }),
        };
        assert_eq!(err.to_string(), "API error: HTTP 422");

        let err = ClientError::Precondition("there is no cart to add the item to");
        assert_eq!(err.to_string(), "there is no cart to add the item to");
    }
}
