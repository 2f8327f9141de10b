//! Guest wishlist operations.
//!
//! The guest wishlist never reaches the upstream as an entity; it lives in
//! the session store, and only the product payloads for its items are
//! fetched (through the product search call). Persisting it across page
//! loads is the embedding application's concern.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{instrument, warn};

use reef_core::{CustomerId, ProductId, VariantId};

use crate::api::ProxyApi;
use crate::error::ClientError;
use crate::stores::WishlistStore;
use crate::types::{Wishlist, WishlistItem};

/// Display name of the guest wishlist.
pub const GUEST_WISHLIST_NAME: &str = "Guest wishlist";

/// An empty guest wishlist.
fn guest_wishlist() -> Wishlist {
    Wishlist {
        id: None,
        name: GUEST_WISHLIST_NAME.to_string(),
        customer_id: CustomerId::new(0),
        items: Vec::new(),
        is_public: false,
        token: None,
        wishlist_product_data: Value::Null,
    }
}

/// The guest item id, `{product_id}` or `{product_id}_{variant_id}`.
fn item_id(product_id: ProductId, variant_id: Option<VariantId>) -> String {
    match variant_id {
        Some(variant) => format!("{product_id}_{variant}"),
        None => product_id.to_string(),
    }
}

/// Guest wishlist operations over the session store.
pub struct WishlistService {
    api: Arc<ProxyApi>,
    store: Arc<WishlistStore>,
}

impl WishlistService {
    /// Create a wishlist service.
    #[must_use]
    pub fn new(api: Arc<ProxyApi>, store: Arc<WishlistStore>) -> Self {
        Self { api, store }
    }

    /// Load the guest wishlist, refreshing product data for its items.
    ///
    /// Seeds an empty wishlist when the session has none yet.
    #[instrument(skip(self))]
    pub async fn load(&self) {
        self.store.set_errors(|errors| errors.load = None);

        let result: Result<(), ClientError> = async {
            let mut wishlist = self.store.snapshot().unwrap_or_else(guest_wishlist);

            if !wishlist.items.is_empty() {
                wishlist.wishlist_product_data = self.product_data(&wishlist.items).await?;
            }

            self.store.replace(wishlist);
            Ok(())
        }
        .await;

        if let Err(err) = result {
            warn!(error = %err, "wishlist load failed");
            self.store.set_errors(|errors| errors.load = Some(err));
        }
    }

    /// Add a product to the wishlist. Adding an item twice is a no-op.
    #[instrument(skip(self))]
    pub async fn add_item(&self, product_id: ProductId, variant_id: Option<VariantId>) {
        self.store.set_errors(|errors| errors.add_item = None);

        if self.is_in_wishlist(product_id, variant_id) {
            return;
        }

        let result: Result<(), ClientError> = async {
            let mut wishlist = self.store.snapshot().unwrap_or_else(guest_wishlist);

            wishlist.items.push(WishlistItem {
                id: item_id(product_id, variant_id),
                product_id,
                variant_id,
            });
            wishlist.wishlist_product_data = self.product_data(&wishlist.items).await?;

            self.store.replace(wishlist);
            Ok(())
        }
        .await;

        if let Err(err) = result {
            warn!(error = %err, "wishlist add failed");
            self.store.set_errors(|errors| errors.add_item = Some(err));
        }
    }

    /// Remove an item from the wishlist by its item id.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: &str) {
        self.store.set_errors(|errors| errors.remove_item = None);

        let Some(mut wishlist) = self.store.snapshot() else {
            return;
        };

        wishlist.items.retain(|item| item.id != item_id);
        self.store.replace(wishlist);
    }

    /// Reset to an empty guest wishlist.
    pub fn clear(&self) {
        self.store.set_errors(|errors| errors.clear = None);
        self.store.replace(guest_wishlist());
    }

    /// Whether the wishlist holds this product/variant combination.
    #[must_use]
    pub fn is_in_wishlist(&self, product_id: ProductId, variant_id: Option<VariantId>) -> bool {
        self.store.snapshot().is_some_and(|wishlist| {
            wishlist
                .items
                .iter()
                .any(|item| item.product_id == product_id && item.variant_id == variant_id)
        })
    }

    /// Product payloads for the listed items, verbatim from the search call.
    async fn product_data(&self, items: &[WishlistItem]) -> Result<Value, ClientError> {
        let ids: Vec<i32> = items.iter().map(|item| item.product_id.as_i32()).collect();
        self.api
            .call(
                "getProducts",
                &[json!({ "id:in": ids, "include": "variants" })],
            )
            .await
    }
}
