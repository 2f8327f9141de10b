//! Wire types for the domain snapshots.
//!
//! These mirror the upstream API payloads closely enough to deserialize
//! them without loss; fields the services never read are not modeled.
//! Amounts are decimals, ids are the typed wrappers from `reef-core`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use reef_core::{
    CartId, CartItemId, CategoryId, ChannelId, CurrencyCode, CustomerId, Price, ProductId,
    VariantId, WishlistId,
};

// =============================================================================
// Cart
// =============================================================================

/// A cart as returned by `getCart` / `createCart` / cart mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    /// `0` marks a guest cart.
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub currency: Option<CartCurrency>,
    #[serde(default)]
    pub base_amount: Option<Decimal>,
    #[serde(default)]
    pub cart_amount: Option<Decimal>,
    #[serde(default)]
    pub line_items: LineItems,
}

impl Cart {
    /// Whether this cart belongs to no customer yet.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.customer_id.is_none_or(|id| id.as_i32() == 0)
    }

    /// Whether the cart has no line items at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_items.physical_items.is_empty() && self.line_items.digital_items.is_empty()
    }

    /// The cart total as a typed price, when the upstream sent both the
    /// amount and a recognized currency code.
    #[must_use]
    pub fn total(&self) -> Option<Price> {
        let amount = self.cart_amount?;
        let code = self.currency.as_ref()?.code.parse::<CurrencyCode>().ok()?;
        Some(Price::new(amount, code))
    }
}

/// Transactional currency of a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCurrency {
    pub code: String,
}

/// Line items grouped the way the upstream reports them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItems {
    #[serde(default)]
    pub physical_items: Vec<LineItem>,
    #[serde(default)]
    pub digital_items: Vec<LineItem>,
    #[serde(default)]
    pub gift_certificates: Vec<Value>,
}

/// A physical or digital cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub list_price: Option<Decimal>,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
}

// =============================================================================
// Channel & Site
// =============================================================================

/// A channel as returned by `getChannel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub currencies: Option<ChannelCurrencies>,
}

impl Channel {
    /// The channel's default transactional currency, when known.
    #[must_use]
    pub fn default_currency(&self) -> Option<&str> {
        self.currencies
            .as_ref()
            .and_then(|c| c.default_currency.as_deref())
    }
}

/// Currency assignments of a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCurrencies {
    #[serde(default)]
    pub default_currency: Option<String>,
    #[serde(default)]
    pub enabled_currencies: Vec<String>,
}

/// Store metadata as returned by `getStoreMeta` (v2, no envelope).
///
/// Only the SEO-relevant fields are modeled; the rest rides along in
/// `extra` untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// =============================================================================
// Category Tree
// =============================================================================

/// A node of the catalog category tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTreeItem {
    pub id: CategoryId,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub children: Vec<CategoryTreeItem>,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer as returned by `getCustomers` / `createCustomer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub form_fields: Vec<FormField>,
}

impl Customer {
    /// The value of a named form field, if the customer carries it.
    #[must_use]
    pub fn form_field(&self, name: &str) -> Option<&Value> {
        self.form_fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }
}

/// A custom form field attached to a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: Value,
}

// =============================================================================
// Wishlist
// =============================================================================

/// A wishlist. The guest wishlist lives purely in the session store; signed
/// in customers get server-side wishlists with real ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wishlist {
    #[serde(default)]
    pub id: Option<WishlistId>,
    pub name: String,
    /// `0` for the guest wishlist.
    pub customer_id: CustomerId,
    #[serde(default)]
    pub items: Vec<WishlistItem>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub token: Option<String>,
    /// Product payloads for the listed items, refreshed through the product
    /// search call and kept verbatim.
    #[serde(default)]
    pub wishlist_product_data: Value,
}

/// One wishlist entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItem {
    /// `{product_id}_{variant_id}` for guest items, the upstream's id for
    /// server-side items.
    pub id: String,
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
}
