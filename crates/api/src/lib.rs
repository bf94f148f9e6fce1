//! HTTP API server for the restaurant back office.
//!
//! Provides REST endpoints for orders, the catalog, users and login, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    use routes::{catalog, orders, users};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(orders::create::<S>).get(orders::list::<S>))
        .route(
            "/orders/{id}",
            get(orders::get::<S>)
                .patch(orders::update::<S>)
                .delete(orders::delete::<S>),
        )
        .route(
            "/categories",
            post(catalog::create_category::<S>).get(catalog::list_categories::<S>),
        )
        .route(
            "/categories/{id}",
            get(catalog::get_category::<S>)
                .patch(catalog::update_category::<S>)
                .delete(catalog::delete_category::<S>),
        )
        .route(
            "/products",
            post(catalog::create_product::<S>).get(catalog::list_products::<S>),
        )
        .route(
            "/products/{id}",
            get(catalog::get_product::<S>)
                .patch(catalog::update_product::<S>)
                .delete(catalog::delete_product::<S>),
        )
        .route(
            "/roles",
            post(users::create_role::<S>).get(users::list_roles::<S>),
        )
        .route(
            "/roles/{id}",
            get(users::get_role::<S>)
                .patch(users::update_role::<S>)
                .delete(users::delete_role::<S>),
        )
        .route(
            "/users",
            post(users::create_user::<S>).get(users::list_users::<S>),
        )
        .route(
            "/users/{id}",
            get(users::get_user::<S>)
                .patch(users::update_user::<S>)
                .delete(users::delete_user::<S>),
        )
        .route("/users/by-email/{email}", get(users::get_user_by_email::<S>))
        .route("/login", post(users::login::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over the given store.
pub fn create_state<S: Store>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store))
}
