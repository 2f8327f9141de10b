//! Per-request channel resolution.
//!
//! A storefront request selects its channel one of three ways, in order:
//! an explicit `x-bigcommerce-channel-id` header (sent by the browser-side
//! client), the request `Host` looked up in the multi-storefront table, or
//! the configured default channel.

use axum::http::{HeaderMap, header};

use reef_core::{ChannelId, Storefronts};

/// Header carrying the client's explicit channel selection.
pub const CHANNEL_ID_HEADER: &str = "x-bigcommerce-channel-id";

/// Resolve the channel for a request.
///
/// Malformed header values (non-numeric) are ignored rather than rejected;
/// the request proceeds on the host/default channel.
#[must_use]
pub fn resolve_channel(headers: &HeaderMap, storefronts: &Storefronts) -> ChannelId {
    if let Some(channel) = headers
        .get(CHANNEL_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i32>().ok())
    {
        return ChannelId::new(channel);
    }

    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map_or(storefronts.default_channel, |host| {
            storefronts.channel_for_host(host)
        })
}
