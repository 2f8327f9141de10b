//! Reef Storefront - typed client layer for the proxy middleware.
//!
//! This crate is the browser-side half of the data-access stack, for Rust
//! frontends (SSR or wasm hosts) talking to the Reef middleware. It wraps
//! the `POST /{integration}/{method}` wire convention in typed calls and
//! keeps per-domain session state:
//!
//! - [`api::ProxyApi`] - the transport: positional JSON arguments in, JSON
//!   body out, channel header and cookies attached
//! - [`stores`] - one snapshot per domain (cart, wishlist, channel,
//!   category tree, customer), replaced wholesale on every successful call,
//!   with a per-operation error slot
//! - [`services`] - the operations: fetch from the proxy, write the store,
//!   record failures
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use reef_storefront::api::ProxyApi;
//! use reef_storefront::services::CartService;
//! use reef_storefront::stores::{CartStore, CustomerStore};
//!
//! let api = Arc::new(ProxyApi::new("http://localhost:8181", ChannelId::new(1)));
//! let cart = CartService::new(api, Arc::new(CartStore::new()), Arc::new(CustomerStore::new()));
//! cart.load(false).await;
//! cart.add_item(ProductId::new(77), None, 1).await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod error;
pub mod services;
pub mod stores;
pub mod types;
