// src/handlers/tasks.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::AuthUser,
    models::crm::{Task, TaskPayload},
    services::transitions,
};

// GET /api/tasks
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "Tasks",
    responses(
        (status = 200, description = "Atividades por prazo", body = Vec<Task>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_tasks(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let tasks = app_state.task_repo.list_tasks(user.id).await?;
    Ok((StatusCode::OK, Json(tasks)))
}

// GET /api/tasks/{id}
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "Atividade", body = Task),
        (status = 404, description = "Atividade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_task(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state.task_repo.get_task(id, user.id).await?;
    Ok((StatusCode::OK, Json(task)))
}

// POST /api/tasks
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "Tasks",
    request_body = TaskPayload,
    responses(
        (status = 201, description = "Atividade criada", body = Task),
        (status = 400, description = "Título ausente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_task(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<TaskPayload>,
) -> Result<impl IntoResponse, AppError> {
    let task = app_state.task_repo.create_task(&payload, user.id).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

// PUT /api/tasks/{id}
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path)),
    request_body = TaskPayload,
    responses(
        (status = 200, description = "Atividade atualizada", body = Task),
        (status = 404, description = "Atividade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_task(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<TaskPayload>,
) -> Result<impl IntoResponse, AppError> {
    // "Completata" carimba completedAt; qualquer outro status limpa.
    let now = transitions::now_iso();
    let completed_at = transitions::completion_stamp(payload.status.as_deref(), &now);
    let task = app_state
        .task_repo
        .update_task(id, &payload, completed_at.as_deref(), user.id)
        .await?;
    Ok((StatusCode::OK, Json(task)))
}

// PATCH /api/tasks/{id}/toggle
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}/toggle",
    tag = "Tasks",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "Status alternado entre Completata e Da fare", body = Task),
        (status = 404, description = "Atividade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn toggle_task(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let current = app_state.task_repo.get_task(id, user.id).await?;
    let status = transitions::toggled_status(&current.status);
    let now = transitions::now_iso();
    let completed_at = transitions::completion_stamp(Some(status), &now);
    let task = app_state
        .task_repo
        .set_task_status(id, status, completed_at.as_deref(), user.id)
        .await?;
    Ok((StatusCode::OK, Json(task)))
}

// DELETE /api/tasks/{id}
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "Atividade removida"),
        (status = 404, description = "Atividade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_task(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.task_repo.delete_task(id, user.id).await?;
    Ok((StatusCode::OK, Json(json!({ "message": "Task deleted successfully" }))))
}
