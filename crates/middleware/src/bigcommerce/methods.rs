//! The method registry: the surface exposed as `POST /bigcommerce/{method}`.
//!
//! Browser-side clients address operations by name with a JSON array of
//! positional arguments. Dispatch is an explicit lookup table: a static
//! registry of method names with their cache policy, and a match from
//! [`Method`] to a typed handler. Unknown names fail the lookup; nothing is
//! forwarded blindly.
//!
//! Handler bodies are thin: parse the first positional argument, build the
//! upstream path/query/body, call the transport. Responses pass through
//! unreshaped.

use serde_json::{Map, Value, json};
use tracing::instrument;

use reef_core::ChannelId;

use crate::config::BigcommerceConfig;

use super::BigcommerceError;
use super::graphql::GraphqlTransport;
use super::rest::RestClient;

/// Operations exposed by the integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GetSite,
    GetChannel,
    GetStoreMeta,
    GetCategoryTree,
    GetProducts,
    GetProductsWithFilter,
    CreateCart,
    GetCart,
    UpdateCart,
    AddCartItems,
    UpdateCartItem,
    RemoveCartItem,
    DeleteCart,
    GetCustomers,
    CreateCustomer,
    UpdateCustomer,
    UpdateCustomerFormFields,
    LoginCustomer,
    GetOrders,
    GetOrderProducts,
    GetWishlists,
    CreateWishlist,
    AddWishlistItems,
    RemoveWishlistItem,
    DeleteWishlist,
}

/// A registry entry: wire name, dispatch target, cache policy.
#[derive(Debug, Clone, Copy)]
pub struct MethodEntry {
    /// Name as addressed in `POST /bigcommerce/{method}`.
    pub name: &'static str,
    /// Dispatch target.
    pub method: Method,
    /// Whether responses may be served from the response cache. Only
    /// read-only endpoints whose data rarely changes within a request burst
    /// qualify; everything touching carts, customers, or wishlists is
    /// always fresh.
    pub cacheable: bool,
}

/// The registry. Order matches the upstream API reference sections.
pub const METHODS: &[MethodEntry] = &[
    MethodEntry { name: "getSite", method: Method::GetSite, cacheable: true },
    MethodEntry { name: "getChannel", method: Method::GetChannel, cacheable: true },
    MethodEntry { name: "getStoreMeta", method: Method::GetStoreMeta, cacheable: true },
    MethodEntry { name: "getCategoryTree", method: Method::GetCategoryTree, cacheable: true },
    MethodEntry { name: "getProducts", method: Method::GetProducts, cacheable: false },
    MethodEntry { name: "getProductsWithFilter", method: Method::GetProductsWithFilter, cacheable: false },
    MethodEntry { name: "createCart", method: Method::CreateCart, cacheable: false },
    MethodEntry { name: "getCart", method: Method::GetCart, cacheable: false },
    MethodEntry { name: "updateCart", method: Method::UpdateCart, cacheable: false },
    MethodEntry { name: "addCartItems", method: Method::AddCartItems, cacheable: false },
    MethodEntry { name: "updateCartItem", method: Method::UpdateCartItem, cacheable: false },
    MethodEntry { name: "removeCartItem", method: Method::RemoveCartItem, cacheable: false },
    MethodEntry { name: "deleteCart", method: Method::DeleteCart, cacheable: false },
    MethodEntry { name: "getCustomers", method: Method::GetCustomers, cacheable: false },
    MethodEntry { name: "createCustomer", method: Method::CreateCustomer, cacheable: false },
    MethodEntry { name: "updateCustomer", method: Method::UpdateCustomer, cacheable: false },
    MethodEntry { name: "updateCustomerFormFields", method: Method::UpdateCustomerFormFields, cacheable: false },
    MethodEntry { name: "loginCustomer", method: Method::LoginCustomer, cacheable: false },
    MethodEntry { name: "getOrders", method: Method::GetOrders, cacheable: false },
    MethodEntry { name: "getOrderProducts", method: Method::GetOrderProducts, cacheable: false },
    MethodEntry { name: "getWishlists", method: Method::GetWishlists, cacheable: false },
    MethodEntry { name: "createWishlist", method: Method::CreateWishlist, cacheable: false },
    MethodEntry { name: "addWishlistItems", method: Method::AddWishlistItems, cacheable: false },
    MethodEntry { name: "removeWishlistItem", method: Method::RemoveWishlistItem, cacheable: false },
    MethodEntry { name: "deleteWishlist", method: Method::DeleteWishlist, cacheable: false },
];

/// Look a method up by its wire name.
#[must_use]
pub fn lookup(name: &str) -> Option<MethodEntry> {
    METHODS.iter().find(|entry| entry.name == name).copied()
}

/// Storefront product search, shared by `getProducts` and
/// `getProductsWithFilter`.
const SEARCH_PRODUCTS_QUERY: &str = r"
query SearchProducts($filters: SearchProductsFiltersInput, $first: Int, $after: String) {
  site {
    search {
      searchProducts(filters: $filters) {
        products(first: $first, after: $after) {
          edges {
            node {
              entityId
              name
              path
              sku
              prices {
                price {
                  value
                  currencyCode
                }
              }
              defaultImage {
                urlOriginal
                altText
              }
              variants(first: 25) {
                edges {
                  node {
                    entityId
                    sku
                    isPurchasable
                  }
                }
              }
            }
          }
          pageInfo {
            hasNextPage
            endCursor
          }
        }
      }
    }
  }
}";

static NULL: Value = Value::Null;

/// Client for the BigCommerce APIs, dispatching registry methods to the
/// REST and GraphQL transports.
#[derive(Clone)]
pub struct BigcommerceClient {
    rest: RestClient,
    graphql: GraphqlTransport,
}

impl BigcommerceClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the REST transport fails to build.
    pub fn new(config: &BigcommerceConfig) -> Result<Self, BigcommerceError> {
        let rest = RestClient::new(config)?;
        let graphql = GraphqlTransport::new(config, rest.clone());
        Ok(Self { rest, graphql })
    }

    /// Invoke a registry method with positional JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed arguments, transport failure, or a
    /// non-2xx upstream status.
    #[instrument(skip(self, args), fields(method = ?method, channel = %channel))]
    pub async fn invoke(
        &self,
        method: Method,
        channel: ChannelId,
        args: &[Value],
    ) -> Result<Value, BigcommerceError> {
        let params = args.first().unwrap_or(&NULL);

        match method {
            Method::GetSite => {
                self.rest
                    .get(&format!("/v3/channels/{channel}/site"), &[])
                    .await
            }
            Method::GetChannel => {
                let query = include_query(params, "currencies");
                self.rest
                    .get(&format!("/v3/channels/{channel}"), &query)
                    .await
            }
            Method::GetStoreMeta => self.rest.get("/v2/store", &[]).await,
            Method::GetCategoryTree => {
                self.rest.get("/v3/catalog/categories/tree", &[]).await
            }
            Method::GetProducts | Method::GetProductsWithFilter => {
                self.search_products(channel, params).await
            }
            Method::CreateCart => {
                let mut data = required_object(params, "data")?;
                // Carts are channel-scoped; stamp the channel server-side so
                // browser clients cannot create carts on foreign channels
                data.entry("channel_id")
                    .or_insert_with(|| json!(channel.as_i32()));
                self.rest
                    .post("/v3/carts", &include_query(params, ""), &Value::Object(data))
                    .await
            }
            Method::GetCart => {
                let id = required_str(params, "id")?;
                self.rest
                    .get(&format!("/v3/carts/{id}"), &include_query(params, ""))
                    .await
            }
            Method::UpdateCart => {
                let id = required_str(params, "id")?;
                let data = params.get("data").cloned().unwrap_or_else(|| json!({}));
                self.rest
                    .put(
                        &format!("/v3/carts/{id}"),
                        &include_query(params, ""),
                        &data,
                    )
                    .await
            }
            Method::AddCartItems => {
                let cart_id = required_str(params, "cartId")?;
                let data = required_value(params, "data")?;
                self.rest
                    .post(
                        &format!("/v3/carts/{cart_id}/items"),
                        &include_query(params, ""),
                        data,
                    )
                    .await
            }
            Method::UpdateCartItem => {
                let cart_id = required_str(params, "cartId")?;
                let item_id = required_str_or_number(params, "itemId")?;
                let data = required_value(params, "data")?;
                self.rest
                    .put(
                        &format!("/v3/carts/{cart_id}/items/{item_id}"),
                        &include_query(params, ""),
                        data,
                    )
                    .await
            }
            Method::RemoveCartItem => {
                let cart_id = required_str(params, "cartId")?;
                let item_id = required_str_or_number(params, "itemId")?;
                self.rest
                    .delete(
                        &format!("/v3/carts/{cart_id}/items/{item_id}"),
                        &include_query(params, ""),
                    )
                    .await
            }
            Method::DeleteCart => {
                let id = required_str(params, "id")?;
                self.rest.delete(&format!("/v3/carts/{id}"), &[]).await
            }
            Method::GetCustomers => {
                self.rest.get("/v3/customers", &query_pairs(params)).await
            }
            Method::CreateCustomer => {
                // The management API takes a batch; the storefront sends one
                self.rest.post("/v3/customers", &[], &json!([params])).await
            }
            Method::UpdateCustomer => {
                self.rest.put("/v3/customers", &[], &json!([params])).await
            }
            Method::UpdateCustomerFormFields => {
                let data = required_value(params, "data")?;
                self.rest
                    .put("/v3/customers/form-field-values", &[], data)
                    .await
            }
            Method::LoginCustomer => {
                let mut credentials = params
                    .as_object()
                    .cloned()
                    .ok_or_else(|| BigcommerceError::InvalidArguments(
                        "credentials object required".to_string(),
                    ))?;
                credentials
                    .entry("channel_id")
                    .or_insert_with(|| json!(channel.as_i32()));
                self.rest
                    .post(
                        "/v3/customers/validate-credentials",
                        &[],
                        &Value::Object(credentials),
                    )
                    .await
            }
            Method::GetOrders => self.rest.get("/v2/orders", &query_pairs(params)).await,
            Method::GetOrderProducts => {
                let order_id = required_str_or_number(params, "orderId")?;
                self.rest
                    .get(&format!("/v2/orders/{order_id}/products"), &[])
                    .await
            }
            Method::GetWishlists => {
                self.rest.get("/v3/wishlists", &query_pairs(params)).await
            }
            Method::CreateWishlist => {
                let data = required_value(params, "data")?;
                self.rest.post("/v3/wishlists", &[], data).await
            }
            Method::AddWishlistItems => {
                let wishlist_id = required_str_or_number(params, "wishlistId")?;
                let data = required_value(params, "data")?;
                self.rest
                    .post(&format!("/v3/wishlists/{wishlist_id}/items"), &[], data)
                    .await
            }
            Method::RemoveWishlistItem => {
                let wishlist_id = required_str_or_number(params, "wishlistId")?;
                let item_id = required_str_or_number(params, "itemId")?;
                self.rest
                    .delete(
                        &format!("/v3/wishlists/{wishlist_id}/items/{item_id}"),
                        &[],
                    )
                    .await
            }
            Method::DeleteWishlist => {
                let id = required_str_or_number(params, "id")?;
                self.rest.delete(&format!("/v3/wishlists/{id}"), &[]).await
            }
        }
    }

    /// Run the storefront product search on the channel's GraphQL endpoint.
    ///
    /// `getProductsWithFilter` passes `filters` through as-is;
    /// `getProducts`-style flat params (`id:in`, `categoryEntityId`,
    /// `search`) are folded into the filter input.
    async fn search_products(
        &self,
        channel: ChannelId,
        params: &Value,
    ) -> Result<Value, BigcommerceError> {
        let mut filters = params
            .get("filters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        if let Some(ids) = params.get("id:in") {
            filters.entry("entityIds").or_insert_with(|| ids.clone());
        }
        if let Some(category) = params.get("categoryEntityId") {
            filters
                .entry("categoryEntityId")
                .or_insert_with(|| category.clone());
        }
        if let Some(term) = params.get("search") {
            filters.entry("searchTerm").or_insert_with(|| term.clone());
        }

        let variables = json!({
            "filters": Value::Object(filters),
            "first": params.get("first").cloned().unwrap_or(json!(50)),
            "after": params.get("after").cloned().unwrap_or(Value::Null),
        });

        self.graphql
            .execute(channel, SEARCH_PRODUCTS_QUERY, "SearchProducts", variables)
            .await
    }
}

// =============================================================================
// Argument Helpers
// =============================================================================

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, BigcommerceError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| BigcommerceError::InvalidArguments(format!("{key} must be a string")))
}

/// Accept both `"42"` and `42` for upstream path segments; clients are not
/// consistent about numeric ids.
fn required_str_or_number(params: &Value, key: &str) -> Result<String, BigcommerceError> {
    match params.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(BigcommerceError::InvalidArguments(format!(
            "{key} must be a string or number"
        ))),
    }
}

fn required_value<'a>(params: &'a Value, key: &str) -> Result<&'a Value, BigcommerceError> {
    params
        .get(key)
        .ok_or_else(|| BigcommerceError::InvalidArguments(format!("{key} is required")))
}

fn required_object(
    params: &Value,
    key: &str,
) -> Result<Map<String, Value>, BigcommerceError> {
    params
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| BigcommerceError::InvalidArguments(format!("{key} must be an object")))
}

/// The `include` query parameter, with an optional default.
fn include_query(params: &Value, default: &str) -> Vec<(String, String)> {
    let include = params
        .get("include")
        .and_then(Value::as_str)
        .unwrap_or(default);
    if include.is_empty() {
        Vec::new()
    } else {
        vec![("include".to_string(), include.to_string())]
    }
}

/// Fold scalar params into query pairs, skipping structured values.
fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let Some(object) = params.as_object() else {
        return Vec::new();
    };

    object
        .iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key.clone(), s.clone())),
            Value::Number(n) => Some((key.clone(), n.to_string())),
            Value::Bool(b) => Some((key.clone(), b.to_string())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_method() {
        let entry = lookup("getSite").unwrap();
        assert_eq!(entry.method, Method::GetSite);
        assert!(entry.cacheable);

        let entry = lookup("addCartItems").unwrap();
        assert_eq!(entry.method, Method::AddCartItems);
        assert!(!entry.cacheable);
    }

    #[test]
    fn test_lookup_unknown_method() {
        assert!(lookup("dropAllTables").is_none());
        // Names are case-sensitive, like the generated client they mirror
        assert!(lookup("getsite").is_none());
    }

    #[test]
    fn test_only_read_only_site_data_is_cacheable() {
        let cacheable: Vec<&str> = METHODS
            .iter()
            .filter(|entry| entry.cacheable)
            .map(|entry| entry.name)
            .collect();
        assert_eq!(
            cacheable,
            vec!["getSite", "getChannel", "getStoreMeta", "getCategoryTree"]
        );
    }

    #[test]
    fn test_required_str() {
        let params = json!({ "id": "abc" });
        assert_eq!(required_str(&params, "id").unwrap(), "abc");
        assert!(required_str(&params, "missing").is_err());
        assert!(required_str(&json!({ "id": 42 }), "id").is_err());
    }

    #[test]
    fn test_required_str_or_number() {
        let params = json!({ "a": "abc", "b": 42 });
        assert_eq!(required_str_or_number(&params, "a").unwrap(), "abc");
        assert_eq!(required_str_or_number(&params, "b").unwrap(), "42");
        assert!(required_str_or_number(&params, "c").is_err());
    }

    #[test]
    fn test_include_query() {
        assert_eq!(
            include_query(&json!({ "include": "line_items.physical_items" }), ""),
            vec![(
                "include".to_string(),
                "line_items.physical_items".to_string()
            )]
        );
        assert_eq!(
            include_query(&json!({}), "currencies"),
            vec![("include".to_string(), "currencies".to_string())]
        );
        assert!(include_query(&json!({}), "").is_empty());
    }

    #[test]
    fn test_query_pairs_skips_structured_values() {
        let params = json!({
            "email:in": "shopper@example.com",
            "page": 2,
            "is_active": true,
            "nested": { "ignored": 1 }
        });
        let mut pairs = query_pairs(&params);
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("email:in".to_string(), "shopper@example.com".to_string()),
                ("is_active".to_string(), "true".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }
}
