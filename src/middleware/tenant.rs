//! Tenant scoping middleware
//!
//! The per-request unit-of-work boundary: derive a routing token from the
//! Host header, resolve the organization, validate membership when a
//! principal was attached upstream, then run the rest of the request -
//! handler, every storage call, every await - inside `run_scoped`. The
//! context lives exactly as long as the response future; nothing lingers
//! once the request completes.

use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{
    models::Principal,
    tenancy::{routing_token, run_scoped, MembershipValidator, TenantContext, TenantResolver},
    utils::AppError,
    AppState,
};

/// Resolve the tenant and scope the remainder of the request to it
///
/// All resolution and membership failures are terminal: the inner handler
/// never runs.
pub async fn tenant_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = {
        let host = req
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        routing_token(host, &state.config.tenancy)
            .ok_or_else(|| AppError::TenantNotFound(host.to_string()))?
    };

    let org = TenantResolver::new(&state.db).resolve(&token).await?;

    let ctx = match req.extensions().get::<Principal>().cloned() {
        Some(principal) => {
            let role = MembershipValidator::new(&state.db)
                .validate(principal.id, org.id)
                .await?;
            TenantContext::new(org).with_principal(principal.id, role)
        }
        // Explicitly public routes carry an anonymous context.
        None => TenantContext::new(org),
    };

    debug!(
        organization = %ctx.organization.slug,
        principal = ?ctx.principal_id,
        "Tenant context established"
    );

    Ok(run_scoped(ctx, next.run(req)).await)
}
