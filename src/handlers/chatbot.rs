// src/handlers/chatbot.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::AuthUser,
    models::chat::{ChatPayload, QuickQueryPayload, Suggestion},
    services::chatbot::{quick_query, quick_suggestions, FREE_MODELS},
    services::transitions,
};

// Resposta do chat e da query rápida. `model` e `query` só aparecem
// quando existem, como o cliente espera.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
}

// POST /api/chatbot/message
#[utoipa::path(
    post,
    path = "/api/chatbot/message",
    tag = "Chatbot",
    request_body = ChatPayload,
    responses(
        (status = 200, description = "Resposta do assistente; modelos esgotados viram success=false, nunca erro HTTP", body = ChatResponse),
        (status = 400, description = "Mensagem ausente ou longa demais")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_message(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChatPayload>,
) -> Result<impl IntoResponse, AppError> {
    let message = payload
        .message
        .as_deref()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::invalid("Message is required"))?;
    if message.chars().count() > 2000 {
        return Err(AppError::invalid("Message too long (max 2000 characters)"));
    }

    let preview: String = message.chars().take(100).collect();
    tracing::info!("[Chatbot] User {} asked: \"{preview}...\"", user.id);

    let snapshot = app_state.dashboard_repo.crm_snapshot(user.id).await?;
    let outcome = app_state
        .chatbot_service
        .chat(message, &snapshot, &payload.conversation_history)
        .await;

    tracing::info!(
        "[Chatbot] Response from {}: {}",
        outcome.model.as_deref().unwrap_or("unknown"),
        if outcome.success { "success" } else { "failed" }
    );

    Ok((
        StatusCode::OK,
        Json(ChatResponse {
            success: outcome.success,
            query: None,
            message: outcome.message,
            model: outcome.model,
            timestamp: transitions::now_iso(),
        }),
    ))
}

// GET /api/chatbot/suggestions
#[utoipa::path(
    get,
    path = "/api/chatbot/suggestions",
    tag = "Chatbot",
    responses(
        (status = 200, description = "Sugestões heurísticas a partir dos dados do CRM", body = SuggestionsResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn suggestions(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = app_state.dashboard_repo.crm_snapshot(user.id).await?;
    let suggestions = quick_suggestions(&snapshot, Utc::now().date_naive());
    Ok((StatusCode::OK, Json(SuggestionsResponse { suggestions })))
}

// GET /api/chatbot/models
#[utoipa::path(
    get,
    path = "/api/chatbot/models",
    tag = "Chatbot",
    responses(
        (status = 200, description = "A lista ordenada de modelos do fallback")
    ),
    security(("api_jwt" = []))
)]
pub async fn models() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "models": FREE_MODELS, "count": FREE_MODELS.len() })),
    )
}

// POST /api/chatbot/quick-query
#[utoipa::path(
    post,
    path = "/api/chatbot/quick-query",
    tag = "Chatbot",
    request_body = QuickQueryPayload,
    responses(
        (status = 200, description = "Resposta à pergunta pré-definida", body = ChatResponse),
        (status = 400, description = "Tipo de query desconhecido")
    ),
    security(("api_jwt" = []))
)]
pub async fn quick_query_message(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<QuickQueryPayload>,
) -> Result<impl IntoResponse, AppError> {
    let message = payload
        .query_type
        .as_deref()
        .and_then(quick_query)
        .ok_or_else(|| AppError::invalid("Query type not found"))?;

    let snapshot = app_state.dashboard_repo.crm_snapshot(user.id).await?;
    let outcome = app_state.chatbot_service.chat(message, &snapshot, &[]).await;

    Ok((
        StatusCode::OK,
        Json(ChatResponse {
            success: outcome.success,
            query: Some(message.to_string()),
            message: outcome.message,
            model: outcome.model,
            timestamp: transitions::now_iso(),
        }),
    ))
}
