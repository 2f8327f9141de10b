//! Reef Core - Shared types library.
//!
//! This crate provides common types used across all Reef components:
//! - `middleware` - The BigCommerce API proxy server
//! - `storefront` - The typed client layer with per-domain session state
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and emails,
//!   plus the multi-storefront channel table

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
