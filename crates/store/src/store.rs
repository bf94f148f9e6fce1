use std::collections::HashMap;

use async_trait::async_trait;
use common::{CategoryId, Money, OrderId, ProductId, RoleId, RoleName, UserId};

use crate::{
    Category, NewCategory, NewOrder, NewProduct, NewUser, Order, OrderFilter, OrderPatch,
    Product, ProductPatch, Result, Role, User, UserPatch,
};

/// Categories and products.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_category(&self, category: NewCategory) -> Result<Category>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>>;

    /// Renames a category. Returns `None` if it does not exist.
    async fn rename_category(&self, id: CategoryId, name: String) -> Result<Option<Category>>;

    /// Deletes a category and detaches its products.
    ///
    /// Returns whether the category existed.
    async fn delete_category(&self, id: CategoryId) -> Result<bool>;

    async fn create_product(&self, product: NewProduct) -> Result<Product>;

    async fn list_products(&self) -> Result<Vec<Product>>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Applies the fields present in `patch`. Returns `None` if the product
    /// does not exist.
    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Option<Product>>;

    async fn delete_product(&self, id: ProductId) -> Result<bool>;

    /// Current prices of the given products. Unknown ids are absent from the map.
    async fn prices_for(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Money>>;
}

/// Orders and their lines.
///
/// Every method is one all-or-nothing unit of work: a failed write leaves
/// no partial order and no partial line set behind.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Creates an order, reconciling `order.lines` against an empty line set.
    async fn create_order(&self, order: NewOrder) -> Result<Order>;

    /// Loads an order with its lines.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders matching the filter, ordered by id.
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>>;

    /// Applies the fields present in `patch`.
    ///
    /// When `patch.lines` is set the line set is replaced and the total
    /// recomputed in the same unit of work. Returns `None` if the order does
    /// not exist.
    async fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<Option<Order>>;

    /// Deletes an order together with its lines. Returns whether it existed.
    async fn delete_order(&self, id: OrderId) -> Result<bool>;
}

/// Roles and users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_role(&self, name: RoleName) -> Result<Role>;

    async fn list_roles(&self) -> Result<Vec<Role>>;

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>>;

    async fn rename_role(&self, id: RoleId, name: RoleName) -> Result<Option<Role>>;

    /// Deletes a role after unassigning it from its users.
    ///
    /// Returns the ids of the users that lost the role, or `None` if the
    /// role does not exist.
    async fn delete_role(&self, id: RoleId) -> Result<Option<Vec<UserId>>>;

    /// Creates a user. A duplicate email is a [`crate::StoreError::Conflict`].
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn list_users(&self) -> Result<Vec<User>>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<Option<User>>;

    /// Deletes a user. A user who still has orders cannot be deleted.
    async fn delete_user(&self, id: UserId) -> Result<bool>;
}

/// Extension trait providing convenience methods for user stores.
#[async_trait]
pub trait UserStoreExt: UserStore {
    /// Checks if a user exists.
    async fn user_exists(&self, id: UserId) -> Result<bool> {
        Ok(self.get_user(id).await?.is_some())
    }
}

// Blanket implementation for all UserStore implementations
impl<T: UserStore + ?Sized> UserStoreExt for T {}

/// A backend providing every store the application needs.
pub trait Store: CatalogStore + OrderRepository + UserStore + Clone + 'static {}

impl<T> Store for T where T: CatalogStore + OrderRepository + UserStore + Clone + 'static {}
