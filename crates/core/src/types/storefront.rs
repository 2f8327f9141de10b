//! Multi-storefront configuration.
//!
//! A BigCommerce store can expose multiple storefronts (channels), each
//! served from its own host. The middleware resolves the channel for a
//! request from this table when the client does not send an explicit
//! channel header; the storefront layer uses it to list the channels a
//! shopper can switch to.

use serde::{Deserialize, Serialize};

use super::id::ChannelId;

/// A single storefront entry: one host serving one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storefront {
    /// Display name of the storefront, shown when listing available channels.
    pub name: String,
    /// The channel this host serves.
    pub channel_id: ChannelId,
    /// Protocol used when redirecting to this storefront (default: https).
    #[serde(default)]
    pub protocol: Option<String>,
}

impl Storefront {
    /// The protocol to use when linking to this storefront.
    #[must_use]
    pub fn protocol(&self) -> &str {
        self.protocol.as_deref().unwrap_or("https")
    }
}

/// Host-keyed storefront table with a default channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storefronts {
    /// Channel used when no host matches and no channel header is sent.
    pub default_channel: ChannelId,
    /// Host → storefront entries. Hosts are compared case-insensitively
    /// and without the port.
    pub hosts: Vec<(String, Storefront)>,
}

impl Storefronts {
    /// A table with only the default channel and no host entries.
    #[must_use]
    pub fn with_default(default_channel: ChannelId) -> Self {
        Self {
            default_channel,
            hosts: Vec::new(),
        }
    }

    /// Resolve the channel for a request host.
    ///
    /// The port is stripped before lookup so `store1.example.io:8181`
    /// matches a `store1.example.io` entry. Unknown hosts fall back to the
    /// default channel.
    #[must_use]
    pub fn channel_for_host(&self, host: &str) -> ChannelId {
        let host = host.split(':').next().unwrap_or(host);
        self.hosts
            .iter()
            .find(|(h, _)| h.eq_ignore_ascii_case(host))
            .map_or(self.default_channel, |(_, s)| s.channel_id)
    }

    /// List the storefronts a shopper can switch to, with their links.
    ///
    /// Returns `(name, link, channel_id)` triples, one per configured host.
    #[must_use]
    pub fn available_channels(&self) -> Vec<(String, String, ChannelId)> {
        self.hosts
            .iter()
            .map(|(host, s)| {
                (
                    s.name.clone(),
                    format!("{}://{host}", s.protocol()),
                    s.channel_id,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Storefronts {
        Storefronts {
            default_channel: ChannelId::new(1),
            hosts: vec![
                (
                    "store1.demo-bc.example.io".to_owned(),
                    Storefront {
                        name: "Household items".to_owned(),
                        channel_id: ChannelId::new(983_771),
                        protocol: None,
                    },
                ),
                (
                    "store2.demo-bc.example.io".to_owned(),
                    Storefront {
                        name: "Garden".to_owned(),
                        channel_id: ChannelId::new(993_626),
                        protocol: Some("http".to_owned()),
                    },
                ),
            ],
        }
    }

    #[test]
    fn test_channel_for_known_host() {
        assert_eq!(
            table().channel_for_host("store1.demo-bc.example.io"),
            ChannelId::new(983_771)
        );
    }

    #[test]
    fn test_channel_for_host_strips_port_and_case() {
        assert_eq!(
            table().channel_for_host("Store2.Demo-BC.example.io:8181"),
            ChannelId::new(993_626)
        );
    }

    #[test]
    fn test_channel_for_unknown_host_is_default() {
        assert_eq!(table().channel_for_host("nowhere.example"), ChannelId::new(1));
    }

    #[test]
    fn test_available_channels_links() {
        let channels = table().available_channels();
        assert_eq!(channels.len(), 2);
        assert_eq!(
            channels[0],
            (
                "Household items".to_owned(),
                "https://store1.demo-bc.example.io".to_owned(),
                ChannelId::new(983_771)
            )
        );
        assert_eq!(channels[1].1, "http://store2.demo-bc.example.io");
    }
}
