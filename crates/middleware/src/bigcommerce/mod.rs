//! BigCommerce API client.
//!
//! # Architecture
//!
//! - Management REST API (v2/v3) via `reqwest` with store-level credentials
//! - Storefront GraphQL API reached through the channel's canonical site URL
//!   with a customer-impersonation token
//! - The exposed surface is the method registry in [`methods`]: named
//!   operations dispatched from `POST /bigcommerce/{method}` calls
//!
//! # Example
//!
//! ```rust,ignore
//! use reef_middleware::bigcommerce::{BigcommerceClient, methods};
//!
//! let client = BigcommerceClient::new(&config.bigcommerce)?;
//!
//! let Some(entry) = methods::lookup("getSite") else { /* 404 */ };
//! let site = client.invoke(entry.method, channel, &args).await?;
//! ```

mod graphql;
pub mod methods;
mod rest;

pub use methods::BigcommerceClient;

use thiserror::Error;

/// The integration name this client is mounted under in the proxy.
pub const INTEGRATION_NAME: &str = "bigcommerce";

/// Errors that can occur when interacting with the BigCommerce APIs.
#[derive(Debug, Error)]
pub enum BigcommerceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status. The body is kept verbatim so
    /// the proxy can pass it through.
    #[error("upstream returned HTTP {status}")]
    Upstream {
        status: u16,
        body: serde_json::Value,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The caller supplied arguments the method cannot work with.
    #[error("invalid call arguments: {0}")]
    InvalidArguments(String),

    /// The client could not be built from the configuration.
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    /// The channel's site exposes no canonical URL to run GraphQL against.
    #[error("channel site has no canonical URL")]
    MissingCanonicalUrl,

    /// The API answered 2xx but the payload misses a field we depend on.
    #[error("unexpected upstream payload: missing {0}")]
    UnexpectedPayload(&'static str),
}
