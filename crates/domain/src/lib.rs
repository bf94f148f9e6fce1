//! Application services for the restaurant back office.
//!
//! This crate sits between the HTTP surface and the store:
//! - commands carry raw client input and validate it into store requests
//! - [`OrderService`] drives the order lifecycle and line reconciliation
//! - [`CatalogService`] and [`UserService`] cover categories, products,
//!   roles, users and login

pub mod catalog;
pub mod dates;
pub mod error;
pub mod order;
pub mod password;
mod patch;
pub mod users;

pub use catalog::{CatalogService, CreateProduct, UpdateProduct};
pub use error::{DomainError, ValidationError};
pub use order::{CreateOrder, LineInput, ListOrders, OrderService, UpdateOrder};
pub use users::{CreateUser, UpdateUser, UserService, MIN_PASSWORD_LEN};
