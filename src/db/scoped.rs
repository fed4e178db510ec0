//! Data access enforcement layer
//!
//! The only sanctioned way to touch tenant-scoped tables. Every operation
//! reads the ambient [`TenantContext`](crate::tenancy::TenantContext) and
//! constrains or injects the organization id itself, so a call site cannot
//! forget the tenant filter:
//!
//! - reads always carry `organization_id = ?` sourced from the ambient
//!   context, failing with `NoTenantContext` when none is active
//! - creates overwrite whatever organization id the caller put on the record
//! - updates and deletes constrain `id = ? AND organization_id = ?`, and a
//!   zero-row outcome surfaces as `NotFound`, indistinguishable from an id
//!   that does not exist at all
//! - joins constrain both sides on the ambient organization id
//!
//! No retries here; transient storage failures are the backend's concern.

use std::marker::PhantomData;

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::Sqlite;
use uuid::Uuid;

use crate::db::DbPool;
use crate::tenancy::current_organization_id;
use crate::utils::{AppError, AppResult};

/// Query type bound to the SQLite backend
pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// A record shape stored in a tenant-scoped table
///
/// Implementations describe their table and columns and bind their own
/// fields; the enforcement layer owns the WHERE clauses and the organization
/// id. `UPDATE_SET` must never include `id` or `organization_id` - both are
/// immutable once written.
pub trait TenantRecord:
    for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Sync + Unpin
{
    /// Table name
    const TABLE: &'static str;
    /// Full column list, in `FromRow` order
    const COLUMNS: &'static str;
    /// Columns written on insert (must include `organization_id`)
    const INSERT_COLUMNS: &'static str;
    /// Placeholders matching `INSERT_COLUMNS`
    const INSERT_PLACEHOLDERS: &'static str;
    /// SET clause for updates (mutable columns only)
    const UPDATE_SET: &'static str;

    fn id(&self) -> Uuid;

    fn organization_id(&self) -> Uuid;

    /// Replace the organization id. Called by [`Scoped::create`] with the
    /// ambient organization, overriding anything the caller supplied.
    fn with_organization(self, organization_id: Uuid) -> Self;

    /// Bind all `INSERT_COLUMNS` values, in order
    fn bind_insert<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;

    /// Bind all `UPDATE_SET` values, in order
    fn bind_update<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;
}

/// Tenant-scoped repository over one record shape
pub struct Scoped<'a, T: TenantRecord> {
    pool: &'a DbPool,
    _record: PhantomData<T>,
}

impl<'a, T: TenantRecord> Scoped<'a, T> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }

    /// List all records belonging to the ambient organization
    pub async fn find_all(&self) -> AppResult<Vec<T>> {
        let org = current_organization_id()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE organization_id = ? ORDER BY created_at",
            T::COLUMNS,
            T::TABLE
        );
        let rows = sqlx::query_as::<_, T>(&sql)
            .bind(org.to_string())
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Fetch one record by id within the ambient organization
    ///
    /// An id belonging to another organization reads as absent.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<T>> {
        let org = current_organization_id()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ? AND organization_id = ?",
            T::COLUMNS,
            T::TABLE
        );
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id.to_string())
            .bind(org.to_string())
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Insert a record, stamping it with the ambient organization id
    ///
    /// Any organization id already present on the record is discarded, which
    /// removes the class of bugs where a caller forges a cross-tenant write.
    pub async fn create(&self, record: T) -> AppResult<T> {
        let org = current_organization_id()?;
        let record = record.with_organization(org);
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            T::TABLE,
            T::INSERT_COLUMNS,
            T::INSERT_PLACEHOLDERS
        );
        record
            .bind_insert(sqlx::query(&sql))
            .execute(self.pool)
            .await?;
        Ok(record)
    }

    /// Update a record's mutable columns within the ambient organization
    ///
    /// Zero affected rows - including a target id owned by another
    /// organization - surfaces as `NotFound`.
    pub async fn update(&self, record: &T) -> AppResult<()> {
        let org = current_organization_id()?;
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ? AND organization_id = ?",
            T::TABLE,
            T::UPDATE_SET
        );
        let result = record
            .bind_update(sqlx::query(&sql))
            .bind(record.id().to_string())
            .bind(org.to_string())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Record not found"));
        }
        Ok(())
    }

    /// Delete a record by id within the ambient organization
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let org = current_organization_id()?;
        let sql = format!(
            "DELETE FROM {} WHERE id = ? AND organization_id = ?",
            T::TABLE
        );
        let result = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(org.to_string())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Record not found"));
        }
        Ok(())
    }

    /// List records of `T` joined against another tenant-scoped table
    ///
    /// Both sides of the join carry the ambient organization constraint;
    /// there is no way to express a half-scoped join through this layer.
    /// `fk_column` is the column on `T` referencing `B`'s id; `parent_id`
    /// optionally narrows to one parent row.
    pub async fn find_joined<B: TenantRecord>(
        &self,
        fk_column: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<T>> {
        let org = current_organization_id()?;
        let mut sql = format!(
            "SELECT {} FROM {} a JOIN {} b ON a.{} = b.id \
             WHERE a.organization_id = ? AND b.organization_id = ?",
            qualify(T::COLUMNS, "a"),
            T::TABLE,
            B::TABLE,
            fk_column
        );
        if parent_id.is_some() {
            sql.push_str(" AND b.id = ?");
        }
        sql.push_str(" ORDER BY a.created_at");

        let mut query = sqlx::query_as::<_, T>(&sql)
            .bind(org.to_string())
            .bind(org.to_string());
        if let Some(parent) = parent_id {
            query = query.bind(parent.to_string());
        }
        Ok(query.fetch_all(self.pool).await?)
    }
}

/// Prefix every column in a comma-separated list with a table alias
fn qualify(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
