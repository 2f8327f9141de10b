//! Management REST API transport (v2/v3).
//!
//! Paths are store-relative (`/v3/carts`, `/v2/store`); the transport
//! prefixes them with the API base URL and store hash and attaches the
//! account credentials as default headers.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::instrument;

use crate::config::BigcommerceConfig;

use super::BigcommerceError;

/// REST transport for the management API.
#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    store_base: String,
}

impl RestClient {
    /// Create a new REST transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build (e.g. the access
    /// token is not a valid header value).
    pub fn new(config: &BigcommerceConfig) -> Result<Self, BigcommerceError> {
        let mut headers = HeaderMap::new();

        let token = HeaderValue::from_str(config.access_token.expose_secret())
            .map_err(|_| BigcommerceError::Configuration(
                "access token is not a valid header value".to_string(),
            ))?;
        headers.insert("X-Auth-Token", token);

        let client_id = HeaderValue::from_str(&config.client_id).map_err(|_| {
            BigcommerceError::Configuration(
                "client id is not a valid header value".to_string(),
            )
        })?;
        headers.insert("X-Auth-Client", client_id);

        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            store_base: format!(
                "{}/stores/{}",
                config.api_url.trim_end_matches('/'),
                config.store_hash
            ),
        })
    }

    /// GET a store-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx upstream status.
    #[instrument(skip(self, query), fields(path = %path))]
    pub async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, BigcommerceError> {
        let request = self
            .client
            .get(format!("{}{path}", self.store_base))
            .query(query);
        self.execute(request).await
    }

    /// POST a JSON body to a store-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx upstream status.
    #[instrument(skip(self, query, body), fields(path = %path))]
    pub async fn post(
        &self,
        path: &str,
        query: &[(String, String)],
        body: &Value,
    ) -> Result<Value, BigcommerceError> {
        let request = self
            .client
            .post(format!("{}{path}", self.store_base))
            .query(query)
            .json(body);
        self.execute(request).await
    }

    /// PUT a JSON body to a store-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx upstream status.
    #[instrument(skip(self, query, body), fields(path = %path))]
    pub async fn put(
        &self,
        path: &str,
        query: &[(String, String)],
        body: &Value,
    ) -> Result<Value, BigcommerceError> {
        let request = self
            .client
            .put(format!("{}{path}", self.store_base))
            .query(query)
            .json(body);
        self.execute(request).await
    }

    /// DELETE a store-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx upstream status.
    #[instrument(skip(self, query), fields(path = %path))]
    pub async fn delete(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, BigcommerceError> {
        let request = self
            .client
            .delete(format!("{}{path}", self.store_base))
            .query(query);
        self.execute(request).await
    }

    /// Send a prepared request and normalize the response.
    ///
    /// 204 and empty bodies map to JSON `null` (the upstream deletes a cart
    /// outright when its last item is removed and answers with no content).
    /// Non-2xx statuses carry their body back verbatim for passthrough.
    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, BigcommerceError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let text = response.text().await?;

        let body = if text.is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) => {
                    if status.is_success() {
                        tracing::error!(
                            error = %e,
                            body = %text.chars().take(500).collect::<String>(),
                            "Failed to parse upstream response"
                        );
                        return Err(BigcommerceError::Parse(e));
                    }
                    // Error bodies are occasionally plain text; wrap them so
                    // the caller still sees what the upstream said
                    Value::String(text)
                }
            }
        };

        if !status.is_success() {
            tracing::debug!(status = %status, "Upstream returned non-success status");
            return Err(BigcommerceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}
