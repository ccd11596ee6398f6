// src/handlers/dashboard.rs
//
// Rotas transversais: rollup de estatísticas, busca global, export,
// notificações, notas e os endpoints públicos de health/info.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::AuthUser,
    models::dashboard::{ExportEnvelope, NotePayload},
    services::stats::{
        generate_csv, CONTACT_CSV_COLUMNS, OPPORTUNITY_CSV_COLUMNS, TASK_CSV_COLUMNS,
    },
    services::transitions,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotesQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
}

// ============================================================================
// ESTATÍSTICAS E BUSCA
// ============================================================================

// GET /api/stats
#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "Dashboard",
    responses((status = 200, description = "Contagens e valores agregados do CRM")),
    security(("api_jwt" = []))
)]
pub async fn global_stats(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let stats = app_state.dashboard_repo.global_stats(user.id).await?;
    Ok((StatusCode::OK, Json(stats)))
}

// GET /api/search?q=
#[utoipa::path(
    get,
    path = "/api/search",
    tag = "Dashboard",
    params(("q" = Option<String>, Query, description = "Termo de busca, mínimo 2 caracteres")),
    responses((status = 200, description = "Contatos, oportunidades e tarefas que casam com o termo")),
    security(("api_jwt" = []))
)]
pub async fn search(
    State(app_state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let term = query.q.unwrap_or_default();
    let results = app_state.dashboard_repo.search(user.id, &term).await?;
    Ok((StatusCode::OK, Json(results)))
}

// GET /api/export?format=csv|json
#[utoipa::path(
    get,
    path = "/api/export",
    tag = "Dashboard",
    params(("format" = Option<String>, Query, description = "csv ou json (padrão)")),
    responses((status = 200, description = "Dump de contatos, oportunidades e tarefas", body = ExportEnvelope)),
    security(("api_jwt" = []))
)]
pub async fn export_data(
    State(app_state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let format = query.format.unwrap_or_else(|| "json".to_string());
    let snapshot = app_state.dashboard_repo.crm_snapshot(user.id).await?;

    let envelope = if format == "csv" {
        ExportEnvelope {
            format: "csv".to_string(),
            export_date: None,
            data: json!({
                "contacts": generate_csv(&snapshot.contacts, &CONTACT_CSV_COLUMNS),
                "opportunities": generate_csv(&snapshot.opportunities, &OPPORTUNITY_CSV_COLUMNS),
                "tasks": generate_csv(&snapshot.tasks, &TASK_CSV_COLUMNS),
            }),
        }
    } else {
        ExportEnvelope {
            format: "json".to_string(),
            export_date: Some(transitions::now_iso()),
            data: json!({
                "contacts": snapshot.contacts,
                "opportunities": snapshot.opportunities,
                "tasks": snapshot.tasks,
            }),
        }
    };

    Ok((StatusCode::OK, Json(envelope)))
}

// ============================================================================
// NOTIFICAÇÕES
// ============================================================================

// GET /api/notifications
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notificações",
    responses((status = 200, description = "Notificações derivadas de prazos seguidas das persistidas")),
    security(("api_jwt" = []))
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let today = transitions::today();
    let notifications = app_state
        .dashboard_repo
        .list_notifications(user.id, &today)
        .await?;
    Ok((StatusCode::OK, Json(notifications)))
}

// PATCH /api/notifications/{id}/read
#[utoipa::path(
    patch,
    path = "/api/notifications/{id}/read",
    tag = "Notificações",
    params(("id" = String, Path, description = "Id numérico ou marcador task-N")),
    responses((status = 200, description = "Confirmação; ids derivados são aceitos sem efeito")),
    security(("api_jwt" = []))
)]
pub async fn mark_notification_read(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // Ids "task-N" são transitórios: não existem no banco, só confirma.
    if !id.starts_with("task-") {
        if let Ok(stored_id) = id.parse::<i64>() {
            app_state
                .dashboard_repo
                .mark_notification_read(stored_id, user.id)
                .await?;
        }
    }
    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

// PATCH /api/notifications/read-all
#[utoipa::path(
    patch,
    path = "/api/notifications/read-all",
    tag = "Notificações",
    responses((status = 200, description = "Todas as notificações persistidas marcadas como lidas")),
    security(("api_jwt" = []))
)]
pub async fn mark_all_notifications_read(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .dashboard_repo
        .mark_all_notifications_read(user.id)
        .await?;
    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

// ============================================================================
// NOTAS
// ============================================================================

// GET /api/notes?entityType=&entityId=
#[utoipa::path(
    get,
    path = "/api/notes",
    tag = "Notas",
    params(
        ("entityType" = Option<String>, Query, description = "Tipo da entidade"),
        ("entityId" = Option<i64>, Query, description = "Id da entidade")
    ),
    responses(
        (status = 200, description = "Notas da entidade, mais recentes primeiro"),
        (status = 400, description = "Filtro incompleto")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_notes(
    State(app_state): State<AppState>,
    user: AuthUser,
    Query(query): Query<NotesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (entity_type, entity_id) = match (query.entity_type, query.entity_id) {
        (Some(entity_type), Some(entity_id)) => (entity_type, entity_id),
        _ => return Err(AppError::invalid("entityType and entityId required")),
    };

    let notes = app_state
        .dashboard_repo
        .list_notes(user.id, &entity_type, entity_id)
        .await?;
    Ok((StatusCode::OK, Json(notes)))
}

// POST /api/notes
#[utoipa::path(
    post,
    path = "/api/notes",
    tag = "Notas",
    request_body = NotePayload,
    responses(
        (status = 201, description = "Nota criada"),
        (status = 400, description = "Campos obrigatórios ausentes")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_note(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NotePayload>,
) -> Result<impl IntoResponse, AppError> {
    let (entity_type, entity_id, content) =
        match (payload.entity_type, payload.entity_id, payload.content) {
            (Some(entity_type), Some(entity_id), Some(content)) if !content.is_empty() => {
                (entity_type, entity_id, content)
            }
            _ => return Err(AppError::invalid("entityType, entityId and content required")),
        };

    let note = app_state
        .dashboard_repo
        .create_note(user.id, &entity_type, entity_id, &content)
        .await?;
    Ok((StatusCode::CREATED, Json(note)))
}

// DELETE /api/notes/{id}
#[utoipa::path(
    delete,
    path = "/api/notes/{id}",
    tag = "Notas",
    params(("id" = i64, Path, description = "Id da nota")),
    responses(
        (status = 200, description = "Nota removida"),
        (status = 404, description = "Nota não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_note(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.dashboard_repo.delete_note(id, user.id).await?;
    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

// ============================================================================
// HEALTH E INFO (públicos)
// ============================================================================

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Sistema",
    responses((status = 200, description = "Estado do serviço"))
)]
pub async fn health(State(app_state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "message": "vCRM API is running",
            "version": "2.0.0",
            "timestamp": transitions::now_iso(),
            "environment": app_state.environment,
        })),
    )
}

// GET /api
#[utoipa::path(
    get,
    path = "/api",
    tag = "Sistema",
    responses((status = 200, description = "Nome, versão e mapa de endpoints"))
)]
pub async fn api_info() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "name": "vCRM API",
            "version": "2.0.0",
            "description": "Modern CRM System API",
            "endpoints": {
                "auth": "/api/auth",
                "contacts": "/api/contacts",
                "opportunities": "/api/opportunities",
                "tasks": "/api/tasks",
                "health": "/api/health"
            }
        })),
    )
}
