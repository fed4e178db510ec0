//! Tenant resolver
//!
//! Maps an inbound unit of work to exactly one organization, or fails
//! closed. Resolution is a single directory read; all errors are terminal
//! for the unit of work and no business logic may run after one.

use sqlx::SqlitePool;
use tracing::debug;

use crate::config::TenancyConfig;
use crate::db::TenantDirectory;
use crate::models::{OrgStatus, Organization};
use crate::utils::{AppError, AppResult};
use uuid::Uuid;

/// Derive a routing token from a request host
///
/// Deterministic: `acme.worklane.com` → `acme`. Loopback hosts and
/// configured preview-hosting suffixes map to the configured development
/// token (an explicit configuration escape hatch, not resolver logic).
/// Hosts with two or fewer labels carry no token and return `None`;
/// tenant-scoped routes treat that as terminal.
pub fn routing_token(host: &str, config: &TenancyConfig) -> Option<String> {
    let host = strip_port(host)?.to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }

    if is_loopback(&host) {
        return Some(config.dev_token.clone());
    }

    for suffix in &config.preview_suffixes {
        let suffix = suffix.to_ascii_lowercase();
        if host == suffix || host.ends_with(&format!(".{}", suffix)) {
            return Some(config.dev_token.clone());
        }
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return None;
    }

    let token = labels[0];
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn strip_port(host: &str) -> Option<&str> {
    // Bracketed IPv6 hosts keep their colons.
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next();
    }
    host.split(':').next()
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0" | "::1")
}

/// Resolves routing tokens to organization snapshots
pub struct TenantResolver<'a> {
    directory: TenantDirectory<'a>,
}

impl<'a> TenantResolver<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            directory: TenantDirectory::new(pool),
        }
    }

    /// Resolve a routing token to an active organization
    pub async fn resolve(&self, token: &str) -> AppResult<Organization> {
        if token.is_empty() {
            return Err(AppError::TenantNotFound(token.to_string()));
        }

        let org = self
            .directory
            .find_by_slug(token)
            .await?
            .ok_or_else(|| AppError::TenantNotFound(token.to_string()))?;

        check_status(org)
    }

    /// Resolve an explicit organization id to an active organization
    ///
    /// The path used by queued background jobs, which carry an organization
    /// id instead of a host header. Same fail-closed status checks.
    pub async fn resolve_id(&self, organization_id: Uuid) -> AppResult<Organization> {
        let org = self
            .directory
            .find_by_id(organization_id)
            .await?
            .ok_or_else(|| AppError::TenantNotFound(organization_id.to_string()))?;

        check_status(org)
    }
}

fn check_status(org: Organization) -> AppResult<Organization> {
    match org.status {
        OrgStatus::Active => Ok(org),
        OrgStatus::Suspended => {
            debug!(slug = %org.slug, "Resolved organization is suspended");
            Err(AppError::TenantSuspended)
        }
        OrgStatus::Cancelled => {
            debug!(slug = %org.slug, "Resolved organization is cancelled");
            Err(AppError::TenantCancelled)
        }
    }
}
