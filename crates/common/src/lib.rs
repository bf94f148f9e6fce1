//! Shared types for the restaurant back office.
//!
//! Identity newtypes, the `Money` amount type and the closed enumerations
//! (`OrderStatus`, `RoleName`) used by every layer.

mod money;
mod status;
mod types;

pub use money::Money;
pub use status::{OrderStatus, ParseEnumError, RoleName};
pub use types::{CategoryId, OrderId, ProductId, RoleId, UserId};
