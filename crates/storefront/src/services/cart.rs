//! Cart operations.
//!
//! The cart snapshot is the session's single source of truth; every
//! mutation answers with the full updated cart, which replaces the
//! snapshot wholesale. The one multi-step procedure is
//! [`CartService::load_customer_cart`], which reconciles a guest cart with
//! the signed-in customer's server-side cart.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{instrument, warn};

use reef_core::{CartId, CartItemId, ProductId, VariantId};

use crate::api::ProxyApi;
use crate::error::ClientError;
use crate::stores::{CartStore, CustomerStore};
use crate::types::{Cart, LineItem};

/// Sub-resources requested with every cart payload.
pub const CART_INCLUDE: &str =
    "line_items.physical_items.options,line_items.digital_items.options";

/// Customer form field holding the id of the customer's server-side cart.
pub const CUSTOMER_CART_FIELD: &str = "user-cart-id";

/// Cart operations over the session stores.
pub struct CartService {
    api: Arc<ProxyApi>,
    store: Arc<CartStore>,
    customer: Arc<CustomerStore>,
}

impl CartService {
    /// Create a cart service over the shared stores.
    #[must_use]
    pub fn new(api: Arc<ProxyApi>, store: Arc<CartStore>, customer: Arc<CustomerStore>) -> Self {
        Self {
            api,
            store,
            customer,
        }
    }

    /// Load the session cart.
    ///
    /// With no cart in the session (or `force_new`), a fresh cart is
    /// created and, when a customer is signed in, assigned to them.
    /// Otherwise the known cart is re-fetched; if the upstream no longer
    /// has it, a fresh cart silently takes its place.
    #[instrument(skip(self))]
    pub async fn load(&self, force_new: bool) {
        self.store.set_errors(|errors| errors.load = None);

        if let Err(err) = self.load_inner(force_new).await {
            warn!(error = %err, "cart load failed");
            self.store.set_errors(|errors| errors.load = Some(err));
        }
    }

    async fn load_inner(&self, force_new: bool) -> Result<(), ClientError> {
        let existing = self.store.snapshot().filter(|_| !force_new);

        let Some(current) = existing else {
            let cart = self.create_cart().await?;
            if self.customer.snapshot().is_some() {
                self.assign_cart_to_customer(&cart.id).await?;
            } else {
                self.store.replace(cart);
            }
            return Ok(());
        };

        match self.fetch_cart(current.id.as_str()).await {
            Ok(cart) => self.store.replace(cart),
            Err(err) => {
                // The known id went stale (expired or deleted upstream);
                // start over with a fresh cart
                warn!(error = %err, "stored cart is gone, creating a new one");
                let cart = self.create_cart().await?;
                self.store.replace(cart);
            }
        }

        Ok(())
    }

    /// Reconcile the session cart with the signed-in customer's cart.
    ///
    /// 1. No cart reference on the customer: the current cart becomes the
    ///    customer's cart.
    /// 2. Current cart is not a guest cart, or is empty: the customer's
    ///    cart is adopted wholesale.
    /// 3. Otherwise the guest cart's line items are merged into the
    ///    customer cart, which is then assigned.
    /// 4. If fetching or merging fails, a fresh cart is created and
    ///    assigned instead.
    #[instrument(skip(self))]
    pub async fn load_customer_cart(&self) {
        self.store
            .set_errors(|errors| errors.load_customer_cart = None);

        if let Err(err) = self.load_customer_cart_inner().await {
            warn!(error = %err, "customer cart load failed");
            self.store
                .set_errors(|errors| errors.load_customer_cart = Some(err));
        }
    }

    async fn load_customer_cart_inner(&self) -> Result<(), ClientError> {
        let attempt: Result<(), ClientError> = async {
            match self.customer_cart().await? {
                None => {
                    let current = self.store.snapshot().ok_or(ClientError::Precondition(
                        "there is no cart to assign to the customer",
                    ))?;
                    self.assign_cart_to_customer(&current.id).await?;
                }
                Some(user_cart) => {
                    let guest = self
                        .store
                        .snapshot()
                        .filter(|cart| cart.is_guest() && !cart.is_empty());

                    match guest {
                        None => self.store.replace(user_cart),
                        Some(guest) => {
                            let merged = self.merge_line_items(&user_cart, &guest).await?;
                            self.assign_cart_to_customer(&merged.id).await?;
                        }
                    }
                }
            }
            Ok(())
        }
        .await;

        match attempt {
            Ok(()) => Ok(()),
            // Without a signed-in customer there is nothing to recover into
            Err(err @ ClientError::Precondition(_)) => Err(err),
            Err(err) => {
                warn!(error = %err, "customer cart reconciliation failed, assigning a fresh cart");
                let cart = self.create_cart().await?;
                self.assign_cart_to_customer(&cart.id).await?;
                Ok(())
            }
        }
    }

    /// Add a product to the cart.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
    ) {
        self.store.set_errors(|errors| errors.add_item = None);

        let result: Result<(), ClientError> = async {
            let current = self.store.snapshot().ok_or(ClientError::Precondition(
                "there is no cart to add the item to",
            ))?;

            let mut line = json!({ "product_id": product_id, "quantity": quantity });
            if let Some(variant) = variant_id {
                line["variant_id"] = json!(variant);
            }

            let cart: Cart = self
                .api
                .call_data(
                    "addCartItems",
                    &[json!({
                        "cartId": current.id.as_str(),
                        "include": CART_INCLUDE,
                        "data": { "line_items": [line] }
                    })],
                )
                .await?;

            self.store.replace(cart);
            Ok(())
        }
        .await;

        if let Err(err) = result {
            warn!(error = %err, "add to cart failed");
            self.store.set_errors(|errors| errors.add_item = Some(err));
        }
    }

    /// Change the quantity of a cart line.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn update_item_qty(&self, item: &LineItem, quantity: i64) {
        self.store.set_errors(|errors| errors.update_item_qty = None);

        let result: Result<(), ClientError> = async {
            let current = self.store.snapshot().ok_or(ClientError::Precondition(
                "there is no cart to update product quantity in",
            ))?;

            let cart: Cart = self
                .api
                .call_data(
                    "updateCartItem",
                    &[json!({
                        "cartId": current.id.as_str(),
                        "itemId": item.id.as_str(),
                        "include": CART_INCLUDE,
                        "data": {
                            "line_item": {
                                "quantity": quantity,
                                "product_id": item.product_id
                            }
                        }
                    })],
                )
                .await?;

            self.store.replace(cart);
            Ok(())
        }
        .await;

        if let Err(err) = result {
            warn!(error = %err, "cart quantity update failed");
            self.store
                .set_errors(|errors| errors.update_item_qty = Some(err));
        }
    }

    /// Remove a line from the cart.
    ///
    /// The upstream deletes the cart outright when its last item goes; the
    /// `null` body that comes back triggers a fresh cart.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: &CartItemId) {
        self.store.set_errors(|errors| errors.remove_item = None);

        let result: Result<(), ClientError> = async {
            let current = self.store.snapshot().ok_or(ClientError::Precondition(
                "there is no cart to remove the item from",
            ))?;

            let body = self
                .api
                .call(
                    "removeCartItem",
                    &[json!({
                        "cartId": current.id.as_str(),
                        "itemId": item_id.as_str(),
                        "include": CART_INCLUDE
                    })],
                )
                .await?;

            match body.get("data") {
                Some(data) if !data.is_null() => {
                    let cart: Cart = serde_json::from_value(data.clone())?;
                    self.store.replace(cart);
                }
                _ => {
                    // Last item removed; the cart no longer exists
                    self.store.clear();
                    self.load_inner(true).await?;
                }
            }
            Ok(())
        }
        .await;

        if let Err(err) = result {
            warn!(error = %err, "remove from cart failed");
            self.store.set_errors(|errors| errors.remove_item = Some(err));
        }
    }

    /// Delete the cart and start a fresh one.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        self.store.set_errors(|errors| errors.clear = None);

        let result: Result<(), ClientError> = async {
            let current = self
                .store
                .snapshot()
                .ok_or(ClientError::Precondition("there is no cart to clear"))?;

            self.api
                .call("deleteCart", &[json!({ "id": current.id.as_str() })])
                .await?;

            self.store.clear();
            self.load_inner(true).await
        }
        .await;

        if let Err(err) = result {
            warn!(error = %err, "cart clear failed");
            self.store.set_errors(|errors| errors.clear = Some(err));
        }
    }

    /// Whether any cart line references the product.
    #[must_use]
    pub fn is_in_cart(&self, product_id: ProductId) -> bool {
        self.store.snapshot().is_some_and(|cart| {
            cart.line_items
                .physical_items
                .iter()
                .chain(&cart.line_items.digital_items)
                .any(|item| item.product_id == product_id)
        })
    }

    // =========================================================================
    // Upstream Calls
    // =========================================================================

    async fn fetch_cart(&self, id: &str) -> Result<Cart, ClientError> {
        self.api
            .call_data("getCart", &[json!({ "id": id, "include": CART_INCLUDE })])
            .await
    }

    async fn create_cart(&self) -> Result<Cart, ClientError> {
        self.api
            .call_data(
                "createCart",
                &[json!({
                    "data": { "line_items": [] },
                    "include": CART_INCLUDE
                })],
            )
            .await
    }

    /// Claim a cart for the signed-in customer and persist the reference on
    /// their form fields, in one round.
    async fn assign_cart_to_customer(&self, cart_id: &CartId) -> Result<Cart, ClientError> {
        let customer = self.customer.snapshot().ok_or(ClientError::Precondition(
            "no signed-in customer to assign the cart to",
        ))?;

        let update_cart_args = [json!({
            "id": cart_id.as_str(),
            "include": CART_INCLUDE,
            "data": { "customer_id": customer.id }
        })];
        let update_form_fields_args = [json!({
            "data": [{
                "name": CUSTOMER_CART_FIELD,
                "value": cart_id.as_str(),
                "customer_id": customer.id
            }]
        })];
        let (cart, _) = tokio::try_join!(
            self.api.call_data::<Cart>("updateCart", &update_cart_args),
            self.api
                .call("updateCustomerFormFields", &update_form_fields_args),
        )?;

        self.store.replace(cart.clone());
        Ok(cart)
    }

    /// The customer's server-side cart, when their form fields reference one.
    async fn customer_cart(&self) -> Result<Option<Cart>, ClientError> {
        let customer = self
            .customer
            .snapshot()
            .ok_or(ClientError::Precondition("no signed-in customer"))?;

        let Some(value) = customer.form_field(CUSTOMER_CART_FIELD) else {
            return Ok(None);
        };

        let id = value
            .as_str()
            .map_or_else(|| value.to_string(), str::to_owned);
        Ok(Some(self.fetch_cart(&id).await?))
    }

    /// Add the guest cart's line items to the target cart.
    async fn merge_line_items(&self, target: &Cart, guest: &Cart) -> Result<Cart, ClientError> {
        let line_items: Vec<Value> = guest
            .line_items
            .digital_items
            .iter()
            .chain(&guest.line_items.physical_items)
            .map(|item| {
                let mut line = json!({
                    "product_id": item.product_id,
                    "quantity": item.quantity
                });
                if let Some(variant) = item.variant_id {
                    line["variant_id"] = json!(variant);
                }
                line
            })
            .collect();

        self.api
            .call_data(
                "addCartItems",
                &[json!({
                    "cartId": target.id.as_str(),
                    "include": CART_INCLUDE,
                    "data": { "line_items": line_items }
                })],
            )
            .await
    }
}
