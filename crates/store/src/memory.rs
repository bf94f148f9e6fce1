use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CategoryId, Money, OrderId, ProductId, RoleId, RoleName, UserId};
use tokio::sync::RwLock;

use crate::{
    Category, NewCategory, NewOrder, NewProduct, NewUser, Order, OrderFilter, OrderPatch,
    Product, ProductPatch, Result, Role, StoreError, User, UserPatch,
    reconcile::reconcile,
    store::{CatalogStore, OrderRepository, UserStore},
};

#[derive(Default)]
struct Tables {
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    roles: BTreeMap<RoleId, Role>,
    users: BTreeMap<UserId, User>,
    sequence: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn prices_for(&self, ids: &[ProductId]) -> HashMap<ProductId, Money> {
        ids.iter()
            .filter_map(|id| self.products.get(id).map(|p| (*id, p.price)))
            .collect()
    }

    fn check_client(&self, client_id: UserId) -> Result<()> {
        if self.users.contains_key(&client_id) {
            Ok(())
        } else {
            Err(StoreError::Conflict(format!(
                "client {client_id} does not exist"
            )))
        }
    }

    fn check_category(&self, category_id: Option<CategoryId>) -> Result<()> {
        match category_id {
            Some(id) if !self.categories.contains_key(&id) => Err(StoreError::Conflict(
                format!("category {id} does not exist"),
            )),
            _ => Ok(()),
        }
    }

    fn check_role(&self, role_id: Option<RoleId>) -> Result<()> {
        match role_id {
            Some(id) if !self.roles.contains_key(&id) => {
                Err(StoreError::Conflict(format!("role {id} does not exist")))
            }
            _ => Ok(()),
        }
    }
}

/// In-memory store implementation.
///
/// All tables live behind one lock, so every write holds the lock for the
/// whole operation and is atomic with respect to other requests. Applies
/// the same reference checks as the PostgreSQL schema.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of order lines stored.
    pub async fn line_count(&self) -> usize {
        self.tables
            .read()
            .await
            .orders
            .values()
            .map(|o| o.lines.len())
            .sum()
    }

    /// Clears all tables and resets identities.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn create_category(&self, category: NewCategory) -> Result<Category> {
        let mut tables = self.tables.write().await;
        let id = CategoryId::new(tables.next_id());
        let category = Category {
            id,
            name: category.name,
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.tables.read().await.categories.values().cloned().collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn rename_category(&self, id: CategoryId, name: String) -> Result<Option<Category>> {
        let mut tables = self.tables.write().await;
        Ok(tables.categories.get_mut(&id).map(|category| {
            category.name = name;
            category.clone()
        }))
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for product in tables.products.values_mut() {
            if product.category_id == Some(id) {
                product.category_id = None;
            }
        }
        Ok(true)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;
        tables.check_category(product.category_id)?;
        let id = ProductId::new(tables.next_id());
        let product = Product {
            id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            category_id: product.category_id,
        };
        tables.products.insert(id, product.clone());
        Ok(product)
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        if patch.category_id.is_some() {
            tables.check_category(patch.category_id)?;
        }
        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        if let Some(category_id) = patch.category_id {
            product.category_id = Some(category_id);
        }
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        Ok(self.tables.write().await.products.remove(&id).is_some())
    }

    async fn prices_for(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Money>> {
        Ok(self.tables.read().await.prices_for(ids))
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut tables = self.tables.write().await;
        tables.check_client(order.client_id)?;

        let id = OrderId::new(tables.next_id());
        let prices = tables.prices_for(&crate::requested_product_ids(&order.lines));
        let reconciled = reconcile(id, &order.lines, &prices)?;

        let order = Order {
            id,
            client_id: order.client_id,
            date_placed: order.date_placed.unwrap_or_else(Utc::now),
            status: order.status.unwrap_or_default(),
            total_amount: reconciled.total,
            lines: reconciled.lines,
        };
        tables.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect())
    }

    async fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<Option<Order>> {
        let mut tables = self.tables.write().await;
        if !tables.orders.contains_key(&id) {
            return Ok(None);
        }
        if let Some(client_id) = patch.client_id {
            tables.check_client(client_id)?;
        }

        // Everything fallible happens before the stored order is touched.
        let reconciled = patch
            .lines
            .as_ref()
            .map(|lines| {
                let prices = tables.prices_for(&crate::requested_product_ids(lines));
                reconcile(id, lines, &prices)
            })
            .transpose()?;

        let Some(order) = tables.orders.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(client_id) = patch.client_id {
            order.client_id = client_id;
        }
        if let Some(date_placed) = patch.date_placed {
            order.date_placed = date_placed;
        }
        if let Some(status) = patch.status {
            order.status = status;
        }
        if let Some(reconciled) = reconciled {
            order.lines = reconciled.lines;
            order.total_amount = reconciled.total;
        }
        Ok(Some(order.clone()))
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        Ok(self.tables.write().await.orders.remove(&id).is_some())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_role(&self, name: RoleName) -> Result<Role> {
        let mut tables = self.tables.write().await;
        let id = RoleId::new(tables.next_id());
        let role = Role { id, name };
        tables.roles.insert(id, role.clone());
        Ok(role)
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.tables.read().await.roles.values().cloned().collect())
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>> {
        Ok(self.tables.read().await.roles.get(&id).cloned())
    }

    async fn rename_role(&self, id: RoleId, name: RoleName) -> Result<Option<Role>> {
        let mut tables = self.tables.write().await;
        Ok(tables.roles.get_mut(&id).map(|role| {
            role.name = name;
            role.clone()
        }))
    }

    async fn delete_role(&self, id: RoleId) -> Result<Option<Vec<UserId>>> {
        let mut tables = self.tables.write().await;
        if tables.roles.remove(&id).is_none() {
            return Ok(None);
        }
        let mut affected = Vec::new();
        for user in tables.users.values_mut() {
            if user.role_id == Some(id) {
                user.role_id = None;
                affected.push(user.id);
            }
        }
        Ok(Some(affected))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email {} is already registered",
                user.email
            )));
        }
        tables.check_role(user.role_id)?;

        let id = UserId::new(tables.next_id());
        let user = User {
            id,
            last_name: user.last_name,
            first_name: user.first_name,
            email: user.email,
            address: user.address,
            phone: user.phone,
            password_hash: user.password_hash,
            role_id: user.role_id,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        if patch.role_id.is_some() {
            tables.check_role(patch.role_id)?;
        }
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(last_name) = patch.last_name {
            user.last_name = last_name;
        }
        if let Some(first_name) = patch.first_name {
            user.first_name = first_name;
        }
        if let Some(address) = patch.address {
            user.address = address;
        }
        if let Some(phone) = patch.phone {
            user.phone = phone;
        }
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(role_id) = patch.role_id {
            user.role_id = Some(role_id);
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.orders.values().any(|o| o.client_id == id) {
            return Err(StoreError::Conflict(format!("user {id} still has orders")));
        }
        Ok(tables.users.remove(&id).is_some())
    }
}
