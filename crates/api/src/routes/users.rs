//! Role, user and login endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{RoleId, UserId};
use domain::{CreateUser, UpdateUser};
use serde::{Deserialize, Serialize};
use store::{Role, Store, User};

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RoleRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct RoleDeletedResponse {
    pub role_id: RoleId,
    pub unassigned_users: Vec<UserId>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub user: UserResponse,
}

/// A user as sent to clients. The password hash is never included.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub role_id: Option<RoleId>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            last_name: user.last_name,
            first_name: user.first_name,
            email: user.email,
            address: user.address,
            phone: user.phone,
            role_id: user.role_id,
            created_at: user.created_at,
        }
    }
}

// -- Roles --

/// POST /roles
#[tracing::instrument(skip(state, req))]
pub async fn create_role<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RoleRequest>,
) -> Result<Json<Role>, ApiError> {
    Ok(Json(state.users.create_role(&req.name).await?))
}

/// GET /roles
#[tracing::instrument(skip(state))]
pub async fn list_roles<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Role>>, ApiError> {
    Ok(Json(state.users.list_roles().await?))
}

/// GET /roles/{id}
#[tracing::instrument(skip(state))]
pub async fn get_role<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<RoleId>,
) -> Result<Json<Role>, ApiError> {
    state
        .users
        .get_role(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Role", id))
}

/// PATCH /roles/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update_role<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<RoleId>,
    Json(req): Json<RoleRequest>,
) -> Result<Json<Role>, ApiError> {
    state
        .users
        .rename_role(id, &req.name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Role", id))
}

/// DELETE /roles/{id} — unassigns the role and reports the affected users.
#[tracing::instrument(skip(state))]
pub async fn delete_role<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<RoleId>,
) -> Result<Json<RoleDeletedResponse>, ApiError> {
    let unassigned_users = state
        .users
        .delete_role(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Role", id))?;
    Ok(Json(RoleDeletedResponse {
        role_id: id,
        unassigned_users,
    }))
}

// -- Users --

/// POST /users
#[tracing::instrument(skip(state, req))]
pub async fn create_user<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.create_user(req).await?;
    Ok(Json(user.into()))
}

/// GET /users
#[tracing::instrument(skip(state))]
pub async fn list_users<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /users/{id}
#[tracing::instrument(skip(state))]
pub async fn get_user<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;
    Ok(Json(user.into()))
}

/// GET /users/by-email/{email}
#[tracing::instrument(skip(state))]
pub async fn get_user_by_email<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(email): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .get_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &email))?;
    Ok(Json(user.into()))
}

/// PATCH /users/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update_user<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<UserId>,
    Json(req): Json<UpdateUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .update_user(id, req)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;
    Ok(Json(user.into()))
}

/// DELETE /users/{id}
#[tracing::instrument(skip(state))]
pub async fn delete_user<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    if state.users.delete_user(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("User", id))
    }
}

/// POST /login
#[tracing::instrument(skip(state, req))]
pub async fn login<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.users.login(&req.email, &req.password).await?;
    Ok(Json(LoginResponse {
        message: "Login OK",
        user: user.into(),
    }))
}
