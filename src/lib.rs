//! Worklane Tenancy Core
//!
//! The tenant isolation core of the Worklane business-management platform:
//! resolves which organization a request belongs to, carries that fact
//! implicitly through all downstream async work, and enforces at the data
//! access layer that no operation touches another tenant's records.

use std::sync::Arc;

use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod tenancy;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
pub use utils::{AppError, AppResult};

use services::ScopedBroadcaster;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Scoped broadcast channel registry
    pub broadcast: Arc<ScopedBroadcaster>,
}

/// Build the application router
///
/// Protected routes run behind principal attachment and then tenant
/// scoping, in that order: the principal must be on the request before the
/// membership check runs.
pub fn create_router(state: AppState) -> Router {
    let protected = api::protected_routes()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::tenant::tenant_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .nest("/api/v1", api::public_routes())
        .nest("/api/v1", protected)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .with_state(state)
}
