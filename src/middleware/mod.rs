//! Middleware components
//!
//! - Principal attachment (JWT bearer verification)
//! - Tenant resolution and request scoping

pub mod auth;
pub mod tenant;

pub use auth::{auth_middleware, create_access_token, Claims};
pub use tenant::tenant_middleware;
