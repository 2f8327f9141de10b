//! The proxy transport.
//!
//! Every integration call is `POST {base}/bigcommerce/{method}` with a JSON
//! array of positional arguments; the response is whatever JSON the
//! upstream produced. The channel selection rides on the
//! `x-bigcommerce-channel-id` header and session cookies are forwarded
//! verbatim, mirroring a credentialed browser `fetch`.
//!
//! Methods are explicit on the services; nothing here intercepts unknown
//! names to forward them blindly.

use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;

use reef_core::ChannelId;

use crate::error::ClientError;

/// The integration every call in this crate addresses.
const INTEGRATION: &str = "bigcommerce";

/// `{data, meta}` envelope of the management API's v3 endpoints.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(default)]
    pub meta: Value,
}

/// Client for the proxy middleware.
#[derive(Debug, Clone)]
pub struct ProxyApi {
    client: reqwest::Client,
    base_url: String,
    channel: ChannelId,
    cookie: Option<String>,
}

impl ProxyApi {
    /// Create a client for a middleware instance and channel.
    #[must_use]
    pub fn new(base_url: impl Into<String>, channel: ChannelId) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            channel,
            cookie: None,
        }
    }

    /// Forward a session cookie header with every call (SSR pass-through).
    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    /// The channel this client addresses.
    #[must_use]
    pub const fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Invoke a method and return the response body verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx response, or a
    /// non-JSON body.
    #[instrument(skip(self, args), fields(method = %method))]
    pub async fn call(&self, method: &str, args: &[Value]) -> Result<Value, ClientError> {
        let mut headers = HeaderMap::new();
        if let Ok(channel) = HeaderValue::from_str(&self.channel.to_string()) {
            headers.insert("x-bigcommerce-channel-id", channel);
        }
        if let Some(cookie) = self.cookie.as_deref()
            && let Ok(value) = HeaderValue::from_str(cookie)
        {
            headers.insert(reqwest::header::COOKIE, value);
        }

        let response = self
            .client
            .post(format!("{}/{INTEGRATION}/{method}", self.base_url))
            .headers(headers)
            .json(&args)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: Value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if !status.is_success() {
            tracing::debug!(status = %status, method, "Proxy call failed");
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    /// Invoke a method and unwrap the v3 `{data, meta}` envelope.
    ///
    /// # Errors
    ///
    /// As [`Self::call`], plus a parse error when the body does not carry
    /// the expected `data` shape.
    pub async fn call_data<T: DeserializeOwned>(
        &self,
        method: &str,
        args: &[Value],
    ) -> Result<T, ClientError> {
        let body = self.call(method, args).await?;
        let envelope: ApiResponse<T> = serde_json::from_value(body)?;
        Ok(envelope.data)
    }

    /// Invoke a method and parse the whole body (v2 endpoints have no
    /// envelope).
    ///
    /// # Errors
    ///
    /// As [`Self::call`], plus a parse error on shape mismatch.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        args: &[Value],
    ) -> Result<T, ClientError> {
        let body = self.call(method, args).await?;
        Ok(serde_json::from_value(body)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_call_posts_positional_args_with_channel_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bigcommerce/getCart"))
            .and(header("x-bigcommerce-channel-id", "983771"))
            .and(body_json(json!([{ "id": "cart-1" }])))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": "cart-1" } })),
            )
            .mount(&server)
            .await;

        let api = ProxyApi::new(server.uri(), ChannelId::new(983_771));
        let body = api.call("getCart", &[json!({ "id": "cart-1" })]).await.unwrap();
        assert_eq!(body, json!({ "data": { "id": "cart-1" } }));
    }

    #[tokio::test]
    async fn test_call_data_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bigcommerce/getCategoryTree"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": 1, "name": "Garden" }],
                "meta": {}
            })))
            .mount(&server)
            .await;

        let api = ProxyApi::new(server.uri(), ChannelId::new(1));
        let data: Value = api.call_data("getCategoryTree", &[json!({})]).await.unwrap();
        assert_eq!(data, json!([{ "id": 1, "name": "Garden" }]));
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bigcommerce/getCart"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "title": "Cart not found" })),
            )
            .mount(&server)
            .await;

        let api = ProxyApi::new(server.uri(), ChannelId::new(1));
        let err = api.call("getCart", &[json!({ "id": "gone" })]).await.unwrap_err();
        match err {
            ClientError::Api { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, json!({ "title": "Cart not found" }));
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cookie_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bigcommerce/getCustomers"))
            .and(header("cookie", "shop_session=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let api =
            ProxyApi::new(server.uri(), ChannelId::new(1)).with_cookie("shop_session=abc123");
        let data: Value = api.call_data("getCustomers", &[json!({})]).await.unwrap();
        assert_eq!(data, json!([]));
    }
}
