//! API routes and handlers
//!
//! Public routes carry no tenant context. Protected routes run behind the
//! principal-attachment and tenant-scoping middleware, so every handler in
//! them executes inside a scoped unit of work.

use axum::{routing::get, Router};

use crate::AppState;

mod events;
mod health;
mod organizations;
mod projects;

pub use health::*;

/// Public API routes (no authentication, no tenant scoping)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
}

/// Protected API routes (authentication and tenant scoping required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .nest("/organizations", organizations::routes())
        .nest("/projects", projects::routes())
        .nest("/events", events::routes())
}
