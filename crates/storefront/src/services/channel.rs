//! Channel operations.
//!
//! Channel details and store metadata are fetched together and written as
//! one snapshot: the storefront renders currency and SEO data from the
//! same load.

use std::sync::Arc;

use serde_json::json;
use tracing::{instrument, warn};

use reef_core::{ChannelId, Storefronts};

use crate::api::ProxyApi;
use crate::stores::{ChannelSnapshot, ChannelStore};
use crate::types::{Channel, StoreMeta};

/// Channel operations over the session store.
pub struct ChannelService {
    api: Arc<ProxyApi>,
    store: Arc<ChannelStore>,
    storefronts: Storefronts,
}

impl ChannelService {
    /// Create a channel service.
    #[must_use]
    pub fn new(api: Arc<ProxyApi>, store: Arc<ChannelStore>, storefronts: Storefronts) -> Self {
        Self {
            api,
            store,
            storefronts,
        }
    }

    /// Load channel details and store metadata concurrently.
    #[instrument(skip(self))]
    pub async fn load(&self) {
        self.store.set_errors(|errors| errors.load = None);

        let get_channel_args = [json!({ "include": "currencies" })];
        let get_store_meta_args = [json!({})];
        let (channel, seo_meta) = tokio::join!(
            self.api
                .call_data::<Channel>("getChannel", &get_channel_args),
            // v2 endpoint: whole body, no envelope
            self.api.call_as::<StoreMeta>("getStoreMeta", &get_store_meta_args),
        );

        match (channel, seo_meta) {
            (Ok(channel), Ok(seo_meta)) => {
                self.store.replace(ChannelSnapshot { channel, seo_meta });
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!(error = %err, "channel load failed");
                self.store.set_errors(|errors| errors.load = Some(err));
            }
        }
    }

    /// The channels a shopper can switch to, as `(name, link, channel_id)`.
    #[must_use]
    pub fn available_channels(&self) -> Vec<(String, String, ChannelId)> {
        self.storefronts.available_channels()
    }

    /// The loaded channel's default currency, if any.
    #[must_use]
    pub fn currency(&self) -> Option<String> {
        self.store
            .snapshot()
            .and_then(|snapshot| snapshot.channel.default_currency().map(str::to_owned))
    }
}
