// src/handlers/ui_config.rs
//
// A UI é schema-driven: o cliente desenha a interface a partir do documento
// JSON servido aqui. Os PATCHes estreitos e o AI builder mexem sempre na
// configuração ativa, nascendo uma linha 'default' quando não existe.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::AuthUser,
    models::ui_config::{
        default_ui_config, default_version, has_valid_structure, merge_configs, AiGeneratePayload,
        ThemePayload, UiConfigPayload, UiConfigView, VisibilityPayload,
    },
};

// GET /api/ui-config/me
#[utoipa::path(
    get,
    path = "/api/ui-config/me",
    tag = "UI Config",
    responses(
        (status = 200, description = "Configuração ativa, ou o documento padrão com isDefault=true", body = UiConfigView)
    ),
    security(("api_jwt" = []))
)]
pub async fn my_config(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let view = match app_state.ui_config_repo.get_active(user.id).await? {
        Some(view) => view,
        None => {
            let mut fallback = UiConfigView::fallback();
            fallback.user_id = Some(user.id);
            fallback
        }
    };
    Ok((StatusCode::OK, Json(view)))
}

// GET /api/ui-config/default
#[utoipa::path(
    get,
    path = "/api/ui-config/default",
    tag = "UI Config",
    responses(
        (status = 200, description = "O documento padrão do processo")
    ),
    security(("api_jwt" = []))
)]
pub async fn default_config() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "version": default_version(),
            "config": default_ui_config(),
        })),
    )
}

// POST /api/ui-config
#[utoipa::path(
    post,
    path = "/api/ui-config",
    tag = "UI Config",
    request_body = UiConfigPayload,
    responses(
        (status = 200, description = "Upsert pela chave (usuário, nome); devolve id e action"),
        (status = 400, description = "Documento ausente ou sem version/theme/pages")
    ),
    security(("api_jwt" = []))
)]
pub async fn save_config(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UiConfigPayload>,
) -> Result<impl IntoResponse, AppError> {
    let config = payload
        .config
        .as_ref()
        .ok_or_else(|| AppError::invalid("Config is required"))?;
    if !has_valid_structure(config) {
        return Err(AppError::invalid("Invalid config structure"));
    }

    let name = payload.name.as_deref().unwrap_or("default");
    let version = config.get("version").and_then(Value::as_str);
    let (id, action) = app_state
        .ui_config_repo
        .upsert_config(user.id, name, version, config)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "id": id, "action": action })),
    ))
}

// PATCH /api/ui-config/theme
#[utoipa::path(
    patch,
    path = "/api/ui-config/theme",
    tag = "UI Config",
    request_body = ThemePayload,
    responses(
        (status = 200, description = "Tema mesclado campo a campo sobre o atual"),
        (status = 400, description = "Tema ausente")
    ),
    security(("api_jwt" = []))
)]
pub async fn patch_theme(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ThemePayload>,
) -> Result<impl IntoResponse, AppError> {
    let theme = payload
        .theme
        .ok_or_else(|| AppError::invalid("Theme is required"))?;

    let current = match app_state.ui_config_repo.get_active(user.id).await? {
        Some(view) => view.config,
        None => default_ui_config(),
    };
    let merged = merge_configs(&current, &json!({ "theme": theme }));
    app_state.ui_config_repo.save_active(user.id, &merged).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "theme": merged.get("theme") })),
    ))
}

// PATCH /api/ui-config/pages/{pageId}/visibility
#[utoipa::path(
    patch,
    path = "/api/ui-config/pages/{pageId}/visibility",
    tag = "UI Config",
    params(("pageId" = String, Path, description = "Chave da página no documento")),
    request_body = VisibilityPayload,
    responses(
        (status = 200, description = "Visibilidade da página trocada"),
        (status = 400, description = "visible ausente"),
        (status = 404, description = "Página desconhecida")
    ),
    security(("api_jwt" = []))
)]
pub async fn patch_page_visibility(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(page_id): Path<String>,
    Json(payload): Json<VisibilityPayload>,
) -> Result<impl IntoResponse, AppError> {
    let visible = payload
        .visible
        .ok_or_else(|| AppError::invalid("visible must be a boolean"))?;

    let mut config = match app_state.ui_config_repo.get_active(user.id).await? {
        Some(view) => view.config,
        None => default_ui_config(),
    };

    let page = config
        .get_mut("pages")
        .and_then(|pages| pages.get_mut(&page_id))
        .and_then(Value::as_object_mut)
        .ok_or(AppError::NotFound("Page"))?;
    page.insert("visible".to_string(), json!(visible));

    app_state.ui_config_repo.save_active(user.id, &config).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "pageId": page_id, "visible": visible })),
    ))
}

// POST /api/ui-config/reset
#[utoipa::path(
    post,
    path = "/api/ui-config/reset",
    tag = "UI Config",
    responses(
        (status = 200, description = "Configurações do usuário apagadas; volta o documento padrão")
    ),
    security(("api_jwt" = []))
)]
pub async fn reset_config(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    app_state.ui_config_repo.delete_all(user.id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Configurazione resettata",
            "config": default_ui_config(),
        })),
    ))
}

// POST /api/ui-config/ai-generate
#[utoipa::path(
    post,
    path = "/api/ui-config/ai-generate",
    tag = "UI Config",
    request_body = AiGeneratePayload,
    responses(
        (status = 200, description = "Mudanças geradas, mescladas e salvas"),
        (status = 400, description = "Prompt ausente ou longo demais"),
        (status = 500, description = "Nenhum modelo disponível (success=false no corpo)")
    ),
    security(("api_jwt" = []))
)]
pub async fn ai_generate(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AiGeneratePayload>,
) -> Result<Response, AppError> {
    let prompt = payload
        .prompt
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::invalid("Prompt is required"))?;
    if prompt.chars().count() > 500 {
        return Err(AppError::invalid("Prompt too long (max 500 characters)"));
    }

    let preview: String = prompt.chars().take(50).collect();
    tracing::info!("[AI Builder] Generating UI config for: \"{preview}...\"");

    let base = payload.current_config.unwrap_or_else(default_ui_config);

    match app_state.ui_builder_service.generate(prompt, &base).await {
        Ok(generated) => {
            // As mudanças também são persistidas na configuração ativa.
            let merged = merge_configs(&base, &generated.changes);
            app_state.ui_config_repo.save_active(user.id, &merged).await?;

            Ok((
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "changes": generated.changes,
                    "description": generated.description,
                    "model": generated.model,
                })),
            )
                .into_response())
        }
        Err(error) => Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": error })),
        )
            .into_response()),
    }
}
