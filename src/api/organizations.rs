//! Organization API endpoints
//!
//! Read-only view of the ambient organization. Provisioning and lifecycle
//! transitions are administrative flows outside this service.

use axum::{routing::get, Json, Router};

use crate::{models::Organization, tenancy, utils::AppError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/current", get(get_current_organization))
}

/// Return the organization snapshot the request is scoped to
async fn get_current_organization() -> Result<Json<Organization>, AppError> {
    let ctx = tenancy::current()?;
    Ok(Json(ctx.organization))
}
