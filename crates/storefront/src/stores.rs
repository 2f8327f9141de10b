//! Per-domain session stores.
//!
//! Each store holds at most one in-memory snapshot of upstream state for
//! the session, replaced wholesale on every successful call; services
//! never patch fields into an existing snapshot. Failures land in the
//! store's per-operation error slot and leave the snapshot untouched.

use std::sync::{PoisonError, RwLock};

use crate::error::ClientError;
use crate::types::{Cart, Channel, CategoryTreeItem, Customer, StoreMeta, Wishlist};

/// A snapshot container with per-operation error slots.
///
/// `T` is the domain snapshot, `E` the error-slot struct for the domain's
/// operations.
#[derive(Debug)]
pub struct SessionStore<T, E> {
    inner: RwLock<StoreState<T, E>>,
}

#[derive(Debug)]
struct StoreState<T, E> {
    snapshot: Option<T>,
    errors: E,
}

impl<T, E: Default> Default for SessionStore<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E: Default> SessionStore<T, E> {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreState {
                snapshot: None,
                errors: E::default(),
            }),
        }
    }
}

impl<T: Clone, E> SessionStore<T, E> {
    /// The current snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<T> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    /// Replace the snapshot wholesale.
    pub fn replace(&self, value: T) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot = Some(value);
    }

    /// Drop the snapshot (logout, cleared cart).
    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot = None;
    }

    /// Read the error slots.
    pub fn with_errors<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        f(&self.inner.read().unwrap_or_else(PoisonError::into_inner).errors)
    }

    /// Mutate the error slots (used by services to record or reset).
    pub fn set_errors(&self, f: impl FnOnce(&mut E)) {
        f(&mut self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .errors);
    }
}

// =============================================================================
// Error Slots
// =============================================================================

/// Per-operation error slots of the cart store.
#[derive(Debug, Default)]
pub struct CartErrors {
    pub load: Option<ClientError>,
    pub load_customer_cart: Option<ClientError>,
    pub add_item: Option<ClientError>,
    pub update_item_qty: Option<ClientError>,
    pub remove_item: Option<ClientError>,
    pub clear: Option<ClientError>,
}

/// Per-operation error slots of the wishlist store.
#[derive(Debug, Default)]
pub struct WishlistErrors {
    pub load: Option<ClientError>,
    pub add_item: Option<ClientError>,
    pub remove_item: Option<ClientError>,
    pub clear: Option<ClientError>,
}

/// Per-operation error slots of the channel store.
#[derive(Debug, Default)]
pub struct ChannelErrors {
    pub load: Option<ClientError>,
}

/// Per-operation error slots of the category store.
#[derive(Debug, Default)]
pub struct CategoryErrors {
    pub load_category_tree: Option<ClientError>,
}

/// Per-operation error slots of the customer store.
#[derive(Debug, Default)]
pub struct CustomerErrors {
    pub load: Option<ClientError>,
    pub register: Option<ClientError>,
    pub login: Option<ClientError>,
    pub update_customer: Option<ClientError>,
    pub update_form_fields: Option<ClientError>,
}

// =============================================================================
// Domain Stores
// =============================================================================

/// The session's cart snapshot.
pub type CartStore = SessionStore<Cart, CartErrors>;

/// The session's wishlist snapshot (guest wishlists live only here).
pub type WishlistStore = SessionStore<Wishlist, WishlistErrors>;

/// Channel details and store metadata, loaded together.
#[derive(Debug, Clone)]
pub struct ChannelSnapshot {
    pub channel: Channel,
    pub seo_meta: StoreMeta,
}

/// The session's channel snapshot.
pub type ChannelStore = SessionStore<ChannelSnapshot, ChannelErrors>;

/// The session's category tree snapshot.
pub type CategoryTreeStore = SessionStore<Vec<CategoryTreeItem>, CategoryErrors>;

/// The session's customer snapshot; `None` means not signed in.
pub type CustomerStore = SessionStore<Customer, CustomerErrors>;
