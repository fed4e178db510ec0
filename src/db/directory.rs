//! Tenant directory repository
//!
//! Durable store of organizations and memberships. This is the one part of
//! storage that is legitimately cross-tenant: resolution has to find an
//! organization before any context exists. Everything else goes through the
//! enforcement layer in [`super::scoped`].

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};
use uuid::Uuid;

use crate::db::{decode_enum, decode_timestamp, decode_uuid};
use crate::models::{
    CreateOrganizationRequest, MemberRole, Membership, MembershipStatus, OrgStatus,
    Organization,
};
use crate::utils::validation::validate_slug;
use crate::utils::{AppError, AppResult};

const ORG_COLUMNS: &str =
    "id, name, slug, status, plan_tier, max_users, max_projects, created_at, updated_at";

const MEMBERSHIP_COLUMNS: &str =
    "id, organization_id, principal_id, role, status, created_at, updated_at";

impl<'r> FromRow<'r, SqliteRow> for Organization {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: decode_uuid(row.try_get("id")?, "id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            status: decode_enum(row.try_get("status")?, "status")?,
            plan_tier: decode_enum(row.try_get("plan_tier")?, "plan_tier")?,
            max_users: row.try_get("max_users")?,
            max_projects: row.try_get("max_projects")?,
            created_at: decode_timestamp(row.try_get("created_at")?, "created_at")?,
            updated_at: decode_timestamp(row.try_get("updated_at")?, "updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Membership {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: decode_uuid(row.try_get("id")?, "id")?,
            organization_id: decode_uuid(
                row.try_get("organization_id")?,
                "organization_id",
            )?,
            principal_id: decode_uuid(row.try_get("principal_id")?, "principal_id")?,
            role: decode_enum(row.try_get("role")?, "role")?,
            status: decode_enum(row.try_get("status")?, "status")?,
            created_at: decode_timestamp(row.try_get("created_at")?, "created_at")?,
            updated_at: decode_timestamp(row.try_get("updated_at")?, "updated_at")?,
        })
    }
}

pub struct TenantDirectory<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TenantDirectory<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        let sql = format!("SELECT {} FROM organizations WHERE slug = ?", ORG_COLUMNS);
        sqlx::query_as::<_, Organization>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await
            .context("Failed to look up organization by slug")
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        let sql = format!("SELECT {} FROM organizations WHERE id = ?", ORG_COLUMNS);
        sqlx::query_as::<_, Organization>(&sql)
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to look up organization by id")
    }

    /// Look up the membership for one (principal, organization) pair
    pub async fn find_membership(
        &self,
        principal_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Membership>> {
        let sql = format!(
            "SELECT {} FROM memberships WHERE principal_id = ? AND organization_id = ?",
            MEMBERSHIP_COLUMNS
        );
        sqlx::query_as::<_, Membership>(&sql)
            .bind(principal_id.to_string())
            .bind(organization_id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to look up membership")
    }

    /// Provision a new organization
    ///
    /// The seam used by seeds and tests; production provisioning flows sit
    /// outside this subsystem but come through the same method.
    pub async fn create_organization(
        &self,
        req: &CreateOrganizationRequest,
    ) -> AppResult<Organization> {
        if !validate_slug(&req.slug) {
            return Err(AppError::ValidationError(format!(
                "Invalid organization slug: {}",
                req.slug
            )));
        }

        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let (max_users, max_projects) = req.plan_tier.default_quotas();

        sqlx::query(
            r#"
            INSERT INTO organizations
                (id, name, slug, status, plan_tier, max_users, max_projects, created_at, updated_at)
            VALUES (?, ?, ?, 'active', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&req.name)
        .bind(&req.slug)
        .bind(req.plan_tier.to_string())
        .bind(max_users)
        .bind(max_projects)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::internal("Failed to retrieve created organization"))
    }

    /// Create or replace a membership for (principal, organization)
    pub async fn add_member(
        &self,
        organization_id: Uuid,
        principal_id: Uuid,
        role: MemberRole,
        status: MembershipStatus,
    ) -> AppResult<Membership> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO memberships
                (id, organization_id, principal_id, role, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (principal_id, organization_id)
            DO UPDATE SET role = excluded.role, status = excluded.status,
                          updated_at = excluded.updated_at
            "#,
        )
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .bind(principal_id.to_string())
        .bind(role.to_string())
        .bind(status.to_string())
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.find_membership(principal_id, organization_id)
            .await?
            .ok_or_else(|| AppError::internal("Failed to retrieve created membership"))
    }

    /// Transition an organization's lifecycle status
    ///
    /// Driven by administrative flows outside this subsystem. The slug is
    /// deliberately not updatable anywhere.
    pub async fn set_status(&self, id: Uuid, status: OrgStatus) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE organizations SET status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Organization not found"));
        }
        Ok(())
    }

    /// Delete an organization
    ///
    /// Rare administrative action; foreign keys cascade the deletion to all
    /// tenant-scoped records and memberships.
    pub async fn delete_organization(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Organization not found"));
        }
        Ok(())
    }
}
