//! Membership validator
//!
//! Confirms that an authenticated principal may act within the resolved
//! organization. Only invoked when the unit of work carries a principal;
//! explicitly public routes skip this step. Membership is either valid now
//! or the request fails - nothing here is transient, so nothing is retried.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::TenantDirectory;
use crate::models::MemberRole;
use crate::utils::{AppError, AppResult};

pub struct MembershipValidator<'a> {
    directory: TenantDirectory<'a>,
}

impl<'a> MembershipValidator<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            directory: TenantDirectory::new(pool),
        }
    }

    /// Validate that the principal is an active member, returning their role
    ///
    /// Missing and non-active memberships both surface as `AccessDenied`;
    /// the specific condition goes into the error payload for operator logs
    /// only and never reaches the end user.
    pub async fn validate(
        &self,
        principal_id: Uuid,
        organization_id: Uuid,
    ) -> AppResult<MemberRole> {
        let membership = self
            .directory
            .find_membership(principal_id, organization_id)
            .await?
            .ok_or_else(|| {
                AppError::AccessDenied(format!(
                    "principal {} has no membership in organization {}",
                    principal_id, organization_id
                ))
            })?;

        if !membership.is_active() {
            return Err(AppError::AccessDenied(format!(
                "membership for principal {} in organization {} has status {}",
                principal_id, organization_id, membership.status
            )));
        }

        Ok(membership.role)
    }
}
