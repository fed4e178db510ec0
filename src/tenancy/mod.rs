//! Tenant isolation core
//!
//! Resolution (host → organization), membership validation, and the
//! context-scoped execution wrapper that carries the resolved tenant
//! implicitly through a unit of work's entire async call graph.

pub mod context;
pub mod membership;
pub mod resolver;

pub use context::{
    current, current_organization_id, run_scoped, spawn_scoped, try_current, TenantContext,
};
pub use membership::MembershipValidator;
pub use resolver::{routing_token, TenantResolver};
