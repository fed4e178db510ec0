//! Tenant context carrier and scoped execution wrapper
//!
//! One immutable [`TenantContext`] exists per unit of work (one inbound
//! request or one background job). It is carried in a tokio task-local cell,
//! so it is visible from any `.await` depth of the wrapped future - and only
//! there. Task-locals are scoped to the future's own continuation graph:
//! when [`run_scoped`] returns, the context is gone, and a later unit of
//! work on the same executor starts with nothing to inherit. No completion
//! hooks or I/O monkey-patching are needed; the lifetime of the context *is*
//! the lifetime of the wrapped future.
//!
//! Reading the context outside any scope is a programming error and fails
//! loudly with `NoTenantContext` rather than defaulting to any tenant.

use std::future::Future;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::{MemberRole, Organization};
use crate::utils::{AppError, AppResult};

tokio::task_local! {
    static CURRENT_TENANT: TenantContext;
}

/// Immutable per-unit-of-work tenant context
///
/// Constructed once by the resolver (or explicitly for background jobs and
/// tests), never mutated, and never shared across units of work.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub organization_id: Uuid,
    /// Snapshot of the organization at resolution time.
    pub organization: Organization,
    pub principal_id: Option<Uuid>,
    pub role: Option<MemberRole>,
}

impl TenantContext {
    /// Context for an anonymous unit of work (public route, offline job)
    pub fn new(organization: Organization) -> Self {
        Self {
            organization_id: organization.id,
            organization,
            principal_id: None,
            role: None,
        }
    }

    /// Attach the validated principal and their role
    pub fn with_principal(mut self, principal_id: Uuid, role: MemberRole) -> Self {
        self.principal_id = Some(principal_id);
        self.role = Some(role);
        self
    }
}

/// Run a future with the given tenant context active
///
/// The context is visible to `fut` and everything it awaits, at any depth,
/// for exactly as long as `fut` runs. Usable for live requests and for
/// offline work alike - tests and migrations run real business logic "as" a
/// tenant through this same seam.
pub async fn run_scoped<F>(ctx: TenantContext, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_TENANT.scope(ctx, fut).await
}

/// Read the ambient tenant context, if one is active
pub fn try_current() -> Option<TenantContext> {
    CURRENT_TENANT.try_with(|ctx| ctx.clone()).ok()
}

/// Read the ambient tenant context
///
/// Fails with `NoTenantContext` outside any [`run_scoped`] invocation.
pub fn current() -> AppResult<TenantContext> {
    try_current().ok_or(AppError::NoTenantContext)
}

/// Read the ambient organization id
pub fn current_organization_id() -> AppResult<Uuid> {
    CURRENT_TENANT
        .try_with(|ctx| ctx.organization_id)
        .map_err(|_| AppError::NoTenantContext)
}

/// Spawn a task that inherits the ambient tenant context
///
/// Plain `tokio::spawn` starts a fresh task with no task-locals; work
/// detached from a scoped unit (notification fan-out, audit writes) must go
/// through here so its data access stays scoped to the right tenant.
pub fn spawn_scoped<F>(fut: F) -> AppResult<JoinHandle<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let ctx = current()?;
    Ok(tokio::spawn(CURRENT_TENANT.scope(ctx, fut)))
}
