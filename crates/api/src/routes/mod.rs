//! HTTP handlers, grouped by resource.

pub mod catalog;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod users;

use domain::{CatalogService, OrderService, UserService};
use store::Store;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub orders: OrderService<S>,
    pub catalog: CatalogService<S>,
    pub users: UserService<S>,
}

impl<S: Store> AppState<S> {
    /// Builds every service over one store.
    pub fn new(store: S) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            users: UserService::new(store),
        }
    }
}
