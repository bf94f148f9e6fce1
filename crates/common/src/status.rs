//! Closed enumerations stored as text.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a text token names no variant of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    #[serde(alias = "en_attente")]
    Pending,
    #[serde(alias = "en_preparation")]
    InPreparation,
    #[serde(alias = "prete")]
    Ready,
    #[serde(alias = "servie")]
    Served,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::InPreparation,
        OrderStatus::Ready,
        OrderStatus::Served,
    ];

    /// Returns the canonical token.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InPreparation => "in_preparation",
            OrderStatus::Ready => "ready",
            OrderStatus::Served => "served",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" | "en_attente" => Ok(OrderStatus::Pending),
            "in_preparation" | "en_preparation" => Ok(OrderStatus::InPreparation),
            "ready" | "prete" => Ok(OrderStatus::Ready),
            "served" | "servie" => Ok(OrderStatus::Served),
            other => Err(ParseEnumError {
                kind: "order status",
                value: other.to_string(),
                expected: "pending, in_preparation, ready, served",
            }),
        }
    }
}

/// Name of a user role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    Admin,
    Client,
    #[serde(alias = "serveur")]
    Waiter,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "admin",
            RoleName::Client => "client",
            RoleName::Waiter => "waiter",
        }
    }
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(RoleName::Admin),
            "client" => Ok(RoleName::Client),
            "waiter" | "serveur" => Ok(RoleName::Waiter),
            other => Err(ParseEnumError {
                kind: "role name",
                value: other.to_string(),
                expected: "admin, client, waiter",
            }),
        }
    }
}
