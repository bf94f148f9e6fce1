//! Persistence for the restaurant back office.
//!
//! Records are plain data; every cross-record read (prices of the products
//! an order references, the lines of an order) is an explicit call. Two
//! backends implement the store traits: [`InMemoryStore`] and
//! [`PostgresStore`].

pub mod error;
pub mod filter;
pub mod memory;
pub mod postgres;
pub mod reconcile;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use filter::OrderFilter;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use reconcile::{Reconciliation, reconcile, requested_product_ids};
pub use records::{
    Category, LineRequest, MAX_QUANTITY, NewCategory, NewOrder, NewProduct, NewUser, Order, OrderLine,
    OrderPatch, Product, ProductPatch, Role, User, UserPatch,
};
pub use store::{CatalogStore, OrderRepository, Store, UserStore, UserStoreExt};
