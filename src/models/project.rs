//! Project and task models
//!
//! The two tenant-scoped record shapes shipped with the core. Both go
//! through the enforcement layer in `db::scoped`; neither table is ever
//! queried directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;
use validator::Validate;

use crate::db::scoped::{SqliteQuery, TenantRecord};
use crate::db::{decode_enum, decode_timestamp, decode_uuid};

/// Project entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Build a new project. The organization id is a placeholder here; the
    /// enforcement layer stamps the ambient one on create.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            name: name.into(),
            description,
            created_at: now,
            updated_at: now,
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Project {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: decode_uuid(row.try_get("id")?, "id")?,
            organization_id: decode_uuid(
                row.try_get("organization_id")?,
                "organization_id",
            )?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: decode_timestamp(row.try_get("created_at")?, "created_at")?,
            updated_at: decode_timestamp(row.try_get("updated_at")?, "updated_at")?,
        })
    }
}

impl TenantRecord for Project {
    const TABLE: &'static str = "projects";
    const COLUMNS: &'static str =
        "id, organization_id, name, description, created_at, updated_at";
    const INSERT_COLUMNS: &'static str =
        "id, organization_id, name, description, created_at, updated_at";
    const INSERT_PLACEHOLDERS: &'static str = "?, ?, ?, ?, ?, ?";
    const UPDATE_SET: &'static str = "name = ?, description = ?, updated_at = ?";

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn with_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = organization_id;
        self
    }

    fn bind_insert<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.to_string())
            .bind(self.organization_id.to_string())
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.created_at.to_rfc3339())
            .bind(self.updated_at.to_rfc3339())
    }

    fn bind_update<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.name)
            .bind(&self.description)
            .bind(Utc::now().to_rfc3339())
    }
}

/// Task lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Done,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Open => write!(f, "open"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TaskStatus::Open),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

/// Task entity, always attached to a project in the same organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(project_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            project_id,
            title: title.into(),
            status: TaskStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Task {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: decode_uuid(row.try_get("id")?, "id")?,
            organization_id: decode_uuid(
                row.try_get("organization_id")?,
                "organization_id",
            )?,
            project_id: decode_uuid(row.try_get("project_id")?, "project_id")?,
            title: row.try_get("title")?,
            status: decode_enum(row.try_get("status")?, "status")?,
            created_at: decode_timestamp(row.try_get("created_at")?, "created_at")?,
            updated_at: decode_timestamp(row.try_get("updated_at")?, "updated_at")?,
        })
    }
}

impl TenantRecord for Task {
    const TABLE: &'static str = "tasks";
    const COLUMNS: &'static str =
        "id, organization_id, project_id, title, status, created_at, updated_at";
    const INSERT_COLUMNS: &'static str =
        "id, organization_id, project_id, title, status, created_at, updated_at";
    const INSERT_PLACEHOLDERS: &'static str = "?, ?, ?, ?, ?, ?, ?";
    const UPDATE_SET: &'static str = "title = ?, status = ?, updated_at = ?";

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn with_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = organization_id;
        self
    }

    fn bind_insert<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.to_string())
            .bind(self.organization_id.to_string())
            .bind(self.project_id.to_string())
            .bind(&self.title)
            .bind(self.status.to_string())
            .bind(self.created_at.to_rfc3339())
            .bind(self.updated_at.to_rfc3339())
    }

    fn bind_update<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.title)
            .bind(self.status.to_string())
            .bind(Utc::now().to_rfc3339())
    }
}

/// Request body for creating a project
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    /// Ignored if supplied: the ambient organization always wins.
    pub organization_id: Option<Uuid>,
}

/// Request body for updating a project
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Request body for creating a task under a project
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
}
