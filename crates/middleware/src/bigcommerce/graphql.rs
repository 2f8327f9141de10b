//! Storefront GraphQL API transport.
//!
//! GraphQL queries run against the channel's own storefront host, not the
//! management API: the transport resolves the channel site's canonical URL,
//! obtains a customer-impersonation token, and POSTs the query to
//! `{canonical}/graphql` with a Bearer token.
//!
//! Queries are materialized per request from caller-supplied filter values,
//! so they are string constants with `serde_json` variables rather than
//! `graphql_client` codegen; the crate's `QueryBody`/`Response` envelope
//! types are still used for the wire format.

use chrono::{Duration, Utc};
use graphql_client::{QueryBody, Response};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use reef_core::ChannelId;

use crate::config::BigcommerceConfig;

use super::BigcommerceError;
use super::rest::RestClient;

/// GraphQL transport for the storefront API.
#[derive(Clone)]
pub struct GraphqlTransport {
    rest: RestClient,
    client: reqwest::Client,
    max_retry: u32,
    token_expiration_days: i64,
}

impl GraphqlTransport {
    /// Create a new GraphQL transport sharing the REST credentials.
    #[must_use]
    pub fn new(config: &BigcommerceConfig, rest: RestClient) -> Self {
        Self {
            rest,
            client: reqwest::Client::new(),
            max_retry: config.graphql_max_retry,
            token_expiration_days: config.jwt_token_expiration_days,
        }
    }

    /// Execute a storefront GraphQL query on a channel.
    ///
    /// Transport failures (connect, timeout) are retried up to the
    /// configured retry count. HTTP-status and GraphQL-envelope errors are
    /// not retried; envelope errors are returned in the body verbatim, the
    /// way the storefront API reports them to browsers.
    ///
    /// # Errors
    ///
    /// Returns an error on exhausted retries, non-2xx upstream status, or a
    /// site without a canonical URL.
    #[instrument(skip(self, query, variables), fields(operation = %operation_name))]
    pub async fn execute(
        &self,
        channel: ChannelId,
        query: &'static str,
        operation_name: &'static str,
        variables: Value,
    ) -> Result<Value, BigcommerceError> {
        let endpoint = format!("{}/graphql", self.canonical_url(channel).await?);
        let token = self.impersonation_token(channel).await?;

        let body = QueryBody {
            variables,
            query,
            operation_name,
        };

        let mut attempt = 0;
        let response = loop {
            match self
                .client
                .post(&endpoint)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await
            {
                Ok(response) => break response,
                Err(e) if is_transient(&e) && attempt < self.max_retry => {
                    attempt += 1;
                    warn!(
                        error = %e,
                        attempt,
                        max_retry = self.max_retry,
                        "GraphQL transport error, retrying"
                    );
                }
                Err(e) => return Err(BigcommerceError::Http(e)),
            }
        };

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(BigcommerceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = serde_json::from_str(&text)?;

        // Surface envelope errors in the log; the body itself passes through
        // unchanged so callers can inspect them
        let envelope: Response<Value> = serde_json::from_value(raw.clone())?;
        if let Some(errors) = envelope.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, "GraphQL errors in response");
        }

        Ok(raw)
    }

    /// Resolve the canonical storefront URL for a channel's site.
    async fn canonical_url(&self, channel: ChannelId) -> Result<String, BigcommerceError> {
        let site = self
            .rest
            .get(&format!("/v3/channels/{channel}/site"), &[])
            .await?;

        let urls = site
            .pointer("/data/urls")
            .and_then(Value::as_array)
            .ok_or(BigcommerceError::UnexpectedPayload("data.urls"))?;

        urls.iter()
            .find(|u| u.get("type").and_then(Value::as_str) == Some("canonical"))
            .or_else(|| urls.first())
            .and_then(|u| u.get("url").and_then(Value::as_str))
            .map(|u| u.trim_end_matches('/').to_owned())
            .ok_or(BigcommerceError::MissingCanonicalUrl)
    }

    /// Obtain a short-lived customer-impersonation token for a channel.
    async fn impersonation_token(&self, channel: ChannelId) -> Result<String, BigcommerceError> {
        let expires_at = (Utc::now() + Duration::days(self.token_expiration_days)).timestamp();

        let response = self
            .rest
            .post(
                "/v3/storefront/api-token-customer-impersonation",
                &[],
                &serde_json::json!({
                    "channel_id": channel.as_i32(),
                    "expires_at": expires_at,
                }),
            )
            .await?;

        response
            .pointer("/data/token")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(BigcommerceError::UnexpectedPayload("data.token"))
    }
}

/// Whether a transport error is worth retrying.
///
/// Only connection-level failures qualify; anything the upstream actually
/// answered is final.
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}
