//! Category tree operations.

use std::sync::Arc;

use serde_json::json;
use tracing::{instrument, warn};

use crate::api::ProxyApi;
use crate::stores::CategoryTreeStore;
use crate::types::CategoryTreeItem;

/// Category operations over the session store.
pub struct CategoryService {
    api: Arc<ProxyApi>,
    store: Arc<CategoryTreeStore>,
}

impl CategoryService {
    /// Create a category service.
    #[must_use]
    pub fn new(api: Arc<ProxyApi>, store: Arc<CategoryTreeStore>) -> Self {
        Self { api, store }
    }

    /// Load the catalog's category tree.
    #[instrument(skip(self))]
    pub async fn load_category_tree(&self) {
        self.store
            .set_errors(|errors| errors.load_category_tree = None);

        match self
            .api
            .call_data::<Vec<CategoryTreeItem>>("getCategoryTree", &[json!({})])
            .await
        {
            Ok(tree) => self.store.replace(tree),
            Err(err) => {
                warn!(error = %err, "category tree load failed");
                self.store
                    .set_errors(|errors| errors.load_category_tree = Some(err));
            }
        }
    }
}
