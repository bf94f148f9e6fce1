//! Order commands.
//!
//! Commands hold client input as received. `validate` turns them into the
//! store's request types or rejects them; nothing reaches the store before
//! that.

use common::{OrderId, OrderStatus, ProductId, UserId};
use serde::Deserialize;
use store::{LineRequest, MAX_QUANTITY, NewOrder, OrderFilter, OrderPatch};

use crate::dates::{parse_day, parse_timestamp};
use crate::error::ValidationError;

/// A requested order line, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LineInput {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl LineInput {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

fn validate_lines(lines: &[LineInput]) -> Result<Vec<LineRequest>, ValidationError> {
    lines
        .iter()
        .map(|line| {
            if line.quantity <= 0 {
                return Err(ValidationError::NonPositiveQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                });
            }
            match u32::try_from(line.quantity) {
                Ok(quantity) if quantity <= MAX_QUANTITY => {
                    Ok(LineRequest::new(line.product_id, quantity))
                }
                _ => Err(ValidationError::QuantityTooLarge {
                    product_id: line.product_id,
                    quantity: line.quantity,
                }),
            }
        })
        .collect()
}

fn parse_status(token: Option<&str>) -> Result<Option<OrderStatus>, ValidationError> {
    token
        .map(|t| t.trim().parse::<OrderStatus>())
        .transpose()
        .map_err(ValidationError::from)
}

/// Command to place a new order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The client placing the order.
    pub client_id: UserId,

    /// When the order was placed. Defaults to now.
    pub date_placed: Option<String>,

    /// Initial status token. Defaults to pending.
    pub status: Option<String>,

    /// Requested lines.
    pub lines: Vec<LineInput>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command with default date and status.
    pub fn new(client_id: impl Into<UserId>, lines: Vec<LineInput>) -> Self {
        Self {
            client_id: client_id.into(),
            date_placed: None,
            status: None,
            lines,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_date(mut self, date_placed: impl Into<String>) -> Self {
        self.date_placed = Some(date_placed.into());
        self
    }

    /// Checks every field and builds the store request.
    pub fn validate(&self) -> Result<NewOrder, ValidationError> {
        Ok(NewOrder {
            client_id: self.client_id,
            date_placed: self.date_placed.as_deref().map(parse_timestamp).transpose()?,
            status: parse_status(self.status.as_deref())?,
            lines: validate_lines(&self.lines)?,
        })
    }
}

/// Command to change an existing order. Absent fields are left untouched.
///
/// There is no total: supplying `lines` replaces the whole line set and the
/// total follows from it.
#[derive(Debug, Clone)]
pub struct UpdateOrder {
    pub order_id: OrderId,
    pub client_id: Option<UserId>,
    pub date_placed: Option<String>,
    pub status: Option<String>,
    pub lines: Option<Vec<LineInput>>,
}

impl UpdateOrder {
    pub fn new(order_id: impl Into<OrderId>) -> Self {
        Self {
            order_id: order_id.into(),
            client_id: None,
            date_placed: None,
            status: None,
            lines: None,
        }
    }

    pub fn with_client(mut self, client_id: impl Into<UserId>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_date(mut self, date_placed: impl Into<String>) -> Self {
        self.date_placed = Some(date_placed.into());
        self
    }

    pub fn with_lines(mut self, lines: Vec<LineInput>) -> Self {
        self.lines = Some(lines);
        self
    }

    /// Checks every supplied field and builds the store patch.
    pub fn validate(&self) -> Result<OrderPatch, ValidationError> {
        Ok(OrderPatch {
            client_id: self.client_id,
            date_placed: self.date_placed.as_deref().map(parse_timestamp).transpose()?,
            status: parse_status(self.status.as_deref())?,
            lines: self.lines.as_deref().map(validate_lines).transpose()?,
        })
    }
}

/// Query for listing orders. Every supplied criterion must match.
#[derive(Debug, Clone, Default)]
pub struct ListOrders {
    pub client_id: Option<UserId>,
    /// Calendar day, `YYYY-MM-DD`.
    pub date: Option<String>,
    pub status: Option<String>,
}

impl ListOrders {
    pub fn validate(&self) -> Result<OrderFilter, ValidationError> {
        let mut filter = OrderFilter::new();
        if let Some(client_id) = self.client_id {
            filter = filter.client_id(client_id);
        }
        if let Some(date) = self.date.as_deref() {
            filter = filter.date(parse_day(date)?);
        }
        if let Some(status) = parse_status(self.status.as_deref())? {
            filter = filter.status(status);
        }
        Ok(filter)
    }
}
