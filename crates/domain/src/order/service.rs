//! Order service providing the order lifecycle operations.

use common::{OrderId, UserId};
use store::{Order, OrderRepository, UserStore, UserStoreExt};

use crate::error::{DomainError, ValidationError};

use super::{CreateOrder, ListOrders, UpdateOrder};

/// Service for managing orders.
///
/// Validates commands, checks that the referenced client exists, then hands
/// the request to the repository, which reconciles lines and total in a
/// single unit of work.
pub struct OrderService<S> {
    store: S,
}

impl<S: OrderRepository + UserStore> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn ensure_client(&self, client_id: UserId) -> Result<(), DomainError> {
        if self.store.user_exists(client_id).await? {
            Ok(())
        } else {
            Err(ValidationError::UnknownClient(client_id).into())
        }
    }

    /// Places a new order and computes its total.
    #[tracing::instrument(skip(self, cmd), fields(client_id = %cmd.client_id))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order, DomainError> {
        let new_order = cmd.validate()?;
        self.ensure_client(new_order.client_id).await?;

        let order = self
            .store
            .create_order(new_order)
            .await
            .map_err(DomainError::from_reconcile)?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id,
            lines = order.lines.len(),
            total = %order.total_amount,
            "order created"
        );
        Ok(order)
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.store.get_order(order_id).await?)
    }

    /// Lists orders matching every supplied criterion. May be empty.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, query: ListOrders) -> Result<Vec<Order>, DomainError> {
        let filter = query.validate()?;
        Ok(self.store.list_orders(filter).await?)
    }

    /// Applies a partial update.
    ///
    /// Supplied lines replace the whole line set and the total is recomputed
    /// from current prices. Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn update_order(&self, cmd: UpdateOrder) -> Result<Option<Order>, DomainError> {
        let patch = cmd.validate()?;
        if let Some(client_id) = patch.client_id {
            self.ensure_client(client_id).await?;
        }
        let replaces_lines = patch.lines.is_some();

        let updated = self
            .store
            .update_order(cmd.order_id, patch)
            .await
            .map_err(DomainError::from_reconcile)?;
        let Some(order) = updated else {
            tracing::debug!("order not found");
            return Ok(None);
        };

        metrics::counter!("orders_updated_total").increment(1);
        tracing::info!(
            order_id = %order.id,
            replaces_lines,
            total = %order.total_amount,
            "order updated"
        );
        Ok(Some(order))
    }

    /// Deletes an order and its lines. Returns whether it existed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId) -> Result<bool, DomainError> {
        let deleted = self.store.delete_order(order_id).await?;
        if deleted {
            metrics::counter!("orders_deleted_total").increment(1);
            tracing::info!(%order_id, "order deleted");
        }
        Ok(deleted)
    }
}
