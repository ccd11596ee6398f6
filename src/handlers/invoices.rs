// src/handlers/invoices.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::AuthUser,
    models::invoice::{Invoice, InvoiceFilters, InvoicePayload, InvoiceStats, InvoiceStatusPayload},
    services::stats::compute_invoice_stats,
};

// GET /api/invoices
#[utoipa::path(
    get,
    path = "/api/invoices",
    tag = "Invoices",
    params(
        ("status" = Option<String>, Query, description = "da_emettere | emessa | pagata"),
        ("type" = Option<String>, Query, description = "emessa | ricevuta"),
        ("opportunityId" = Option<i64>, Query)
    ),
    responses(
        (status = 200, description = "Faturas com os nomes do join, próximas do vencimento primeiro", body = Vec<Invoice>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
    user: AuthUser,
    Query(filters): Query<InvoiceFilters>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = app_state.invoice_repo.list_invoices(user.id, &filters).await?;
    Ok((StatusCode::OK, Json(invoices)))
}

// GET /api/invoices/stats
#[utoipa::path(
    get,
    path = "/api/invoices/stats",
    tag = "Invoices",
    responses(
        (status = 200, description = "Baldes de fatura (pago/pendente/vencido/a emitir)", body = InvoiceStats)
    ),
    security(("api_jwt" = []))
)]
pub async fn invoice_stats(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let invoices = app_state
        .invoice_repo
        .list_invoices(user.id, &InvoiceFilters::default())
        .await?;
    let stats = compute_invoice_stats(&invoices, Utc::now().date_naive());
    Ok((StatusCode::OK, Json(stats)))
}

// GET /api/invoices/{id}
#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "Fatura", body = Invoice),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_invoice(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state.invoice_repo.get_invoice(id, user.id).await?;
    Ok((StatusCode::OK, Json(invoice)))
}

// POST /api/invoices
#[utoipa::path(
    post,
    path = "/api/invoices",
    tag = "Invoices",
    request_body = InvoicePayload,
    responses(
        (status = 201, description = "Fatura criada", body = Invoice),
        (status = 400, description = "Campos obrigatórios ausentes")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_invoice(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<InvoicePayload>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state.invoice_repo.create_invoice(&payload, user.id).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

// PUT /api/invoices/{id}
#[utoipa::path(
    put,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = i64, Path)),
    request_body = InvoicePayload,
    responses(
        (status = 200, description = "Fatura atualizada", body = Invoice),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_invoice(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<InvoicePayload>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state
        .invoice_repo
        .update_invoice(id, &payload, user.id)
        .await?;
    Ok((StatusCode::OK, Json(invoice)))
}

// PATCH /api/invoices/{id}/status
#[utoipa::path(
    patch,
    path = "/api/invoices/{id}/status",
    tag = "Invoices",
    params(("id" = i64, Path)),
    request_body = InvoiceStatusPayload,
    responses(
        (status = 200, description = "Status trocado", body = Invoice),
        (status = 400, description = "Status ausente"),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn patch_invoice_status(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<InvoiceStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state
        .invoice_repo
        .set_invoice_status(id, &payload, user.id)
        .await?;
    Ok((StatusCode::OK, Json(invoice)))
}

// DELETE /api/invoices/{id}
#[utoipa::path(
    delete,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "Fatura removida"),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_invoice(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.invoice_repo.delete_invoice(id, user.id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Invoice deleted successfully" })),
    ))
}
