//! Order commands and the order service.

mod commands;
mod service;

pub use commands::{CreateOrder, LineInput, ListOrders, UpdateOrder};
pub use service::OrderService;
