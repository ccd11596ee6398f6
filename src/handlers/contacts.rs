// src/handlers/contacts.rs

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
    models::crm::{Contact, ContactPayload},
};

// GET /api/contacts
#[utoipa::path(
    get,
    path = "/api/contacts",
    tag = "Contacts",
    responses(
        (status = 200, description = "Contatos do usuário, mais recentes primeiro", body = Vec<Contact>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_contacts(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let contacts = app_state.contact_repo.list_contacts(user.id).await?;
    Ok((StatusCode::OK, Json(contacts)))
}

// GET /api/contacts/{id}
#[utoipa::path(
    get,
    path = "/api/contacts/{id}",
    tag = "Contacts",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "Contato", body = Contact),
        (status = 404, description = "Contato não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_contact(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let contact = app_state.contact_repo.get_contact(id, user.id).await?;
    Ok((StatusCode::OK, Json(contact)))
}

// POST /api/contacts
#[utoipa::path(
    post,
    path = "/api/contacts",
    tag = "Contacts",
    request_body = ContactPayload,
    responses(
        (status = 201, description = "Contato criado", body = Contact),
        (status = 400, description = "Nome ausente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_contact(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ContactPayload>,
) -> Result<impl IntoResponse, AppError> {
    let contact = app_state.contact_repo.create_contact(&payload, user.id).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

// PUT /api/contacts/{id}
#[utoipa::path(
    put,
    path = "/api/contacts/{id}",
    tag = "Contacts",
    params(("id" = i64, Path)),
    request_body = ContactPayload,
    responses(
        (status = 200, description = "Contato atualizado", body = Contact),
        (status = 404, description = "Contato não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_contact(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<ContactPayload>,
) -> Result<impl IntoResponse, AppError> {
    let contact = app_state.contact_repo.update_contact(id, &payload, user.id).await?;
    Ok((StatusCode::OK, Json(contact)))
}

// DELETE /api/contacts/{id}
#[utoipa::path(
    delete,
    path = "/api/contacts/{id}",
    tag = "Contacts",
    params(("id" = i64, Path)),
    responses(
        (status = 200, description = "Contato removido"),
        (status = 404, description = "Contato não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_contact(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.contact_repo.delete_contact(id, user.id).await?;
    Ok((StatusCode::OK, Json(json!({ "message": "Contact deleted successfully" }))))
}
