use serde::{Deserialize, Serialize};

/// Declares an integer identity newtype.
///
/// Identities are assigned by the store and wrap the database `BIGINT` key,
/// so ids of different tables cannot be mixed up.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw value.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw value.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a product category.
    CategoryId
);
define_id!(
    /// Identifier of a menu product.
    ProductId
);
define_id!(
    /// Identifier of an order.
    OrderId
);
define_id!(
    /// Identifier of a user (the client of an order).
    UserId
);
define_id!(
    /// Identifier of a role.
    RoleId
);
