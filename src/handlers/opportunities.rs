// src/handlers/opportunities.rs

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
    models::crm::{Opportunity, OpportunityPayload, ProjectStatusPayload, StagePatchPayload},
    services::transitions,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OpportunityQuery {
    // Ano do closeDate; sem ele vem tudo.
    pub year: Option<i32>,
}

// GET /api/opportunities
#[utoipa::path(
    get,
    path = "/api/opportunities",
    tag = "Opportunities",
    params(("year" = Option<i32>, Query, description = "Filtra pelo ano do closeDate")),
    responses(
        (status = 200, description = "Oportunidades, mais recentes primeiro", body = Vec<Opportunity>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_opportunities(
    State(app_state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OpportunityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let opportunities = app_state
        .opportunity_repo
        .list_opportunities(user.id, query.year)
        .await?;
    Ok((StatusCode::OK, Json(opportunities)))
}

// GET /api/opportunities/{id}
#[utoipa::path(
    get,
    path = "/api/opportunities/{id}",
    tag = "Opportunities",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "Oportunidade", body = Opportunity),
        (status = 404, description = "Oportunidade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_opportunity(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let opportunity = app_state.opportunity_repo.get_opportunity(id, user.id).await?;
    Ok((StatusCode::OK, Json(opportunity)))
}

// POST /api/opportunities
#[utoipa::path(
    post,
    path = "/api/opportunities",
    tag = "Opportunities",
    request_body = OpportunityPayload,
    responses(
        (status = 201, description = "Oportunidade criada", body = Opportunity),
        (status = 400, description = "Título ausente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_opportunity(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<OpportunityPayload>,
) -> Result<impl IntoResponse, AppError> {
    let opportunity = app_state
        .opportunity_repo
        .create_opportunity(&payload, user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(opportunity)))
}

// PUT /api/opportunities/{id}
#[utoipa::path(
    put,
    path = "/api/opportunities/{id}",
    tag = "Opportunities",
    params(("id" = i64, Path)),
    request_body = OpportunityPayload,
    responses(
        (status = 200, description = "Oportunidade atualizada", body = Opportunity),
        (status = 404, description = "Oportunidade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_opportunity(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<OpportunityPayload>,
) -> Result<impl IntoResponse, AppError> {
    let opportunity = app_state
        .opportunity_repo
        .update_opportunity(id, &payload, user.id)
        .await?;
    Ok((StatusCode::OK, Json(opportunity)))
}

// DELETE /api/opportunities/{id}
#[utoipa::path(
    delete,
    path = "/api/opportunities/{id}",
    tag = "Opportunities",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "Oportunidade removida"),
        (status = 404, description = "Oportunidade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_opportunity(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.opportunity_repo.delete_opportunity(id, user.id).await?;
    Ok((StatusCode::OK, Json(json!({ "message": "Opportunity deleted successfully" }))))
}

// =============================================================================
//  TRANSIÇÕES (drag and drop do pipeline e kanban de projetos)
// =============================================================================

// PATCH /api/opportunities/{id}/stage
#[utoipa::path(
    patch,
    path = "/api/opportunities/{id}/stage",
    tag = "Opportunities",
    params(("id" = i64, Path)),
    request_body = StagePatchPayload,
    responses(
        (status = 200, description = "Estágio atualizado, com os efeitos de vitória/reabertura", body = Opportunity),
        (status = 400, description = "Estágio ausente"),
        (status = 404, description = "Oportunidade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn patch_stage(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<StagePatchPayload>,
) -> Result<impl IntoResponse, AppError> {
    let current = app_state.opportunity_repo.get_opportunity(id, user.id).await?;
    let plan = transitions::plan_stage_change(&current, &payload)?;
    let opportunity = app_state
        .opportunity_repo
        .apply_stage_plan(id, &plan, user.id)
        .await?;
    Ok((StatusCode::OK, Json(opportunity)))
}

// PATCH /api/opportunities/{id}/project-status
#[utoipa::path(
    patch,
    path = "/api/opportunities/{id}/project-status",
    tag = "Opportunities",
    params(("id" = i64, Path)),
    request_body = ProjectStatusPayload,
    responses(
        (status = 200, description = "Status de projeto atualizado", body = Opportunity),
        (status = 400, description = "Status inválido ou oportunidade ainda não ganha"),
        (status = 404, description = "Oportunidade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn patch_project_status(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<ProjectStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let current = app_state.opportunity_repo.get_opportunity(id, user.id).await?;
    let status = transitions::validated_project_status(&current, payload.project_status.as_deref())?;
    let opportunity = app_state
        .opportunity_repo
        .set_project_status(id, &status, user.id)
        .await?;
    Ok((StatusCode::OK, Json(opportunity)))
}
