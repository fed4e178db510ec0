//! Project and task API endpoints
//!
//! The demonstration surface for the enforcement layer: every handler here
//! touches storage exclusively through [`Scoped`], so the ambient tenant
//! constraint is applied on every operation without any handler mentioning
//! an organization id. Mutations publish advisory events on the scoped
//! broadcast channel.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::Scoped,
    models::{CreateProjectRequest, CreateTaskRequest, Project, Task, UpdateProjectRequest},
    utils::AppError,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/{id}/tasks", get(list_project_tasks).post(create_task))
}

/// Originating connection id, if the client supplied one
///
/// Used only to exclude the caller's own live connection from the resulting
/// broadcast; it cannot widen delivery beyond the ambient organization.
fn origin_connection(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get("x-connection-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
}

async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, AppError> {
    let projects = Scoped::<Project>::new(&state.db).find_all().await?;
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    req.validate()?;

    let mut project = Project::new(&req.name, req.description.clone());
    // A caller-supplied organization id is allowed into the record here on
    // purpose: the enforcement layer discards it on create, so the stored
    // row always belongs to the ambient organization.
    if let Some(forged) = req.organization_id {
        project.organization_id = forged;
    }

    let project = Scoped::<Project>::new(&state.db).create(project).await?;

    state.broadcast.broadcast_current(
        "project.created",
        json!({ "id": project.id, "name": project.name }),
        origin_connection(&headers),
    )?;

    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    let project = Scoped::<Project>::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Project not found"))?;
    Ok(Json(project))
}

async fn update_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    req.validate()?;

    let repo = Scoped::<Project>::new(&state.db);
    let mut project = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Project not found"))?;

    if let Some(name) = req.name {
        project.name = name;
    }
    if let Some(description) = req.description {
        project.description = Some(description);
    }

    repo.update(&project).await?;

    state.broadcast.broadcast_current(
        "project.updated",
        json!({ "id": project.id }),
        origin_connection(&headers),
    )?;

    Ok(Json(project))
}

async fn delete_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    Scoped::<Project>::new(&state.db).delete(id).await?;

    state.broadcast.broadcast_current(
        "project.deleted",
        json!({ "id": id }),
        origin_connection(&headers),
    )?;

    Ok(StatusCode::NO_CONTENT)
}

/// List a project's tasks via the same-tenant join helper
async fn list_project_tasks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = Scoped::<Task>::new(&state.db)
        .find_joined::<Project>("project_id", Some(id))
        .await?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    req.validate()?;

    // The parent must exist within the ambient organization; a cross-tenant
    // project id reads as absent.
    Scoped::<Project>::new(&state.db)
        .find_by_id(project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project not found"))?;

    let task = Scoped::<Task>::new(&state.db)
        .create(Task::new(project_id, &req.title))
        .await?;

    state.broadcast.broadcast_current(
        "task.created",
        json!({ "id": task.id, "project_id": project_id }),
        origin_connection(&headers),
    )?;

    Ok((StatusCode::CREATED, Json(task)))
}
