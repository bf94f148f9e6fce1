//! Category and product endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CategoryId, ProductId};
use domain::{CreateProduct, UpdateProduct};
use serde::{Deserialize, Serialize};
use store::{Category, Product, Store};

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price.to_decimal(),
            stock: product.stock,
            category_id: product.category_id,
        }
    }
}

/// POST /categories
#[tracing::instrument(skip(state, req))]
pub async fn create_category<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.catalog.create_category(&req.name).await?))
}

/// GET /categories
#[tracing::instrument(skip(state))]
pub async fn list_categories<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.catalog.list_categories().await?))
}

/// GET /categories/{id}
#[tracing::instrument(skip(state))]
pub async fn get_category<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>, ApiError> {
    state
        .catalog
        .get_category(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Category", id))
}

/// PATCH /categories/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update_category<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<CategoryId>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    state
        .catalog
        .rename_category(id, &req.name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Category", id))
}

/// DELETE /categories/{id} — products of the category become uncategorized.
#[tracing::instrument(skip(state))]
pub async fn delete_category<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, ApiError> {
    if state.catalog.delete_category(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Category", id))
    }
}

/// POST /products
#[tracing::instrument(skip(state, req))]
pub async fn create_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateProduct>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.catalog.create_product(req).await?;
    Ok(Json(product.into()))
}

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list_products<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.catalog.list_products().await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .catalog
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;
    Ok(Json(product.into()))
}

/// PATCH /products/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
    Json(req): Json<UpdateProduct>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .catalog
        .update_product(id, req)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;
    Ok(Json(product.into()))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state))]
pub async fn delete_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    if state.catalog.delete_product(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Product", id))
    }
}
