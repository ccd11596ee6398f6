// src/handlers/targets.rs

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
    models::target::{AnnualTargetTotals, MonthlyTarget, TargetBatchPayload, TargetPayload},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TargetQuery {
    #[serde(rename = "type")]
    pub target_type: Option<String>,
}

// GET /api/targets/{year}
#[utoipa::path(
    get,
    path = "/api/targets/{year}",
    tag = "Targets",
    params(
        ("year" = i32, Path),
        ("type" = Option<String>, Query, description = "ordinato | fatturato | incassato")
    ),
    responses(
        (status = 200, description = "Metas mensais do ano, em ordem de mês", body = Vec<MonthlyTarget>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_targets(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(year): Path<i32>,
    Query(query): Query<TargetQuery>,
) -> Result<impl IntoResponse, AppError> {
    let targets = app_state
        .target_repo
        .list_targets(user.id, year, query.target_type.as_deref())
        .await?;
    Ok((StatusCode::OK, Json(targets)))
}

// GET /api/targets/{year}/total
#[utoipa::path(
    get,
    path = "/api/targets/{year}/total",
    tag = "Targets",
    params(("year" = i32, Path)),
    responses(
        (status = 200, description = "Soma anual por tipo de meta", body = AnnualTargetTotals)
    ),
    security(("api_jwt" = []))
)]
pub async fn annual_total(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(year): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let totals = app_state.target_repo.annual_totals(user.id, year).await?;
    Ok((StatusCode::OK, Json(totals)))
}

// POST /api/targets
#[utoipa::path(
    post,
    path = "/api/targets",
    tag = "Targets",
    request_body = TargetPayload,
    responses(
        (status = 200, description = "Meta criada ou atualizada (upsert)", body = MonthlyTarget),
        (status = 400, description = "Ano/mês/valor ausentes ou tipo inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn upsert_target(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<TargetPayload>,
) -> Result<impl IntoResponse, AppError> {
    let target = app_state.target_repo.upsert_target(&payload, user.id).await?;
    Ok((StatusCode::OK, Json(target)))
}

// POST /api/targets/batch
#[utoipa::path(
    post,
    path = "/api/targets/batch",
    tag = "Targets",
    request_body = TargetBatchPayload,
    responses(
        (status = 200, description = "Ano substituído de uma vez para o tipo", body = Vec<MonthlyTarget>),
        (status = 400, description = "Ano ausente, mês inválido ou mês duplicado")
    ),
    security(("api_jwt" = []))
)]
pub async fn replace_year(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<TargetBatchPayload>,
) -> Result<impl IntoResponse, AppError> {
    let targets = app_state.target_repo.replace_year(&payload, user.id).await?;
    Ok((StatusCode::OK, Json(targets)))
}

// DELETE /api/targets/{year}
#[utoipa::path(
    delete,
    path = "/api/targets/{year}",
    tag = "Targets",
    params(("year" = i32, Path)),
    responses(
        (status = 200, description = "Metas do ano removidas (todos os tipos)"),
        (status = 404, description = "Nenhuma meta no ano")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_year(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(year): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    app_state.target_repo.delete_year(user.id, year).await?;
    Ok((StatusCode::OK, Json(json!({ "message": "Target deleted successfully" }))))
}
