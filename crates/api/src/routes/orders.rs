//! Order CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{OrderId, OrderStatus, ProductId, UserId};
use domain::{CreateOrder, LineInput, ListOrders, UpdateOrder};
use serde::{Deserialize, Serialize};
use store::{Order, Store};

use super::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub client_id: UserId,
    #[serde(default, alias = "date_placed")]
    pub date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub lines: Vec<LineInput>,
}

/// Any subset of the order fields. Unknown fields, including a client
/// supplied total, are ignored.
#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub client_id: Option<UserId>,
    #[serde(default, alias = "date_placed")]
    pub date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub lines: Option<Vec<LineInput>>,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub client_id: Option<UserId>,
    pub date: Option<String>,
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub client_id: UserId,
    pub date_placed: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub lines: Vec<OrderLineResponse>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            client_id: order.client_id,
            date_placed: order.date_placed,
            status: order.status,
            total_amount: order.total_amount.to_decimal(),
            lines: order
                .lines
                .into_iter()
                .map(|line| OrderLineResponse {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /orders — place an order; the total is computed from current prices.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let cmd = CreateOrder {
        client_id: req.client_id,
        date_placed: req.date,
        status: req.status,
        lines: req.lines,
    };
    let order = state.orders.create_order(cmd).await?;
    Ok(Json(order.into()))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .get_order(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", id))?;
    Ok(Json(order.into()))
}

/// GET /orders — list orders matching every supplied filter. Possibly empty.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state
        .orders
        .list_orders(ListOrders {
            client_id: query.client_id,
            date: query.date,
            status: query.status,
        })
        .await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// PATCH /orders/{id} — partial update; `lines` replaces the whole line set.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let cmd = UpdateOrder {
        order_id: id,
        client_id: req.client_id,
        date_placed: req.date,
        status: req.status,
        lines: req.lines,
    };
    let order = state
        .orders
        .update_order(cmd)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", id))?;
    Ok(Json(order.into()))
}

/// DELETE /orders/{id} — removes the order and its lines.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode, ApiError> {
    if state.orders.delete_order(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Order", id))
    }
}
