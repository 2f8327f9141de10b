//! Per-domain operation glue.
//!
//! Each service owns the call-and-store flow for one domain: invoke the
//! proxy, write the snapshot wholesale on success, record the failure in
//! the store's error slot otherwise. Operations return `()`; callers read
//! outcomes from the stores.

pub mod cart;
pub mod category;
pub mod channel;
pub mod customer;
pub mod wishlist;

pub use cart::CartService;
pub use category::CategoryService;
pub use channel::ChannelService;
pub use customer::{CustomerService, NewCustomer};
pub use wishlist::WishlistService;
