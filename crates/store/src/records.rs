//! Plain data records held by the store.
//!
//! Relationships are explicit foreign-key fields; nothing here loads a
//! related record on its own.

use chrono::{DateTime, Utc};
use common::{CategoryId, Money, OrderId, OrderStatus, ProductId, RoleId, RoleName, UserId};
use serde::Serialize;

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
}

/// A product on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
}

/// Partial product update. `None` fields are left untouched.
///
/// Nullable columns take a nested option: `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Money>,
    pub stock: Option<i32>,
    pub category_id: Option<CategoryId>,
}

/// Largest line quantity every backend can store (`order_lines.quantity` is
/// an `INTEGER`).
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// A requested `(product, quantity)` pairing, before reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineRequest {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// One line of an order. Identified by `(order_id, product_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// An order together with its current lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub client_id: UserId,
    pub date_placed: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Returns the quantity ordered for a product, if it has a line.
    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub client_id: UserId,
    /// Defaults to the creation time.
    pub date_placed: Option<DateTime<Utc>>,
    /// Defaults to [`OrderStatus::Pending`].
    pub status: Option<OrderStatus>,
    pub lines: Vec<LineRequest>,
}

/// Partial order update.
///
/// There is no total field: the total is always derived from
/// the lines.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub client_id: Option<UserId>,
    pub date_placed: Option<DateTime<Utc>>,
    pub status: Option<OrderStatus>,
    /// When present, replaces the whole line set and recomputes the total.
    pub lines: Option<Vec<LineRequest>>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.client_id.is_none()
            && self.date_placed.is_none()
            && self.status.is_none()
            && self.lines.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
}

/// A back-office user. Clients place orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    /// PHC-formatted password hash. Never sent to clients.
    pub password_hash: String,
    pub role_id: Option<RoleId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role_id: Option<RoleId>,
}

/// Partial user update, with the same conventions as [`ProductPatch`].
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub address: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub role_id: Option<RoleId>,
}
