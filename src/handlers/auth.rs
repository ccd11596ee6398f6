// src/handlers/auth.rs

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
    models::auth::{
        AuthResponse, AuthUser, ChangePasswordPayload, ForgotPasswordPayload, LoginPayload,
        ProfilePayload, RegisterPayload, ResetPasswordPayload, User,
    },
};

// =============================================================================
//  REGISTRO E LOGIN (rotas públicas)
// =============================================================================

// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterPayload,
    responses(
        (status = 201, description = "Usuário criado, já autenticado", body = AuthResponse),
        (status = 400, description = "Dados inválidos ou username/email já existente")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state.auth_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Token e usuário", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state.auth_service.login(payload).await?;
    Ok((StatusCode::OK, Json(response)))
}

// =============================================================================
//  PERFIL
// =============================================================================

// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Perfil do usuário autenticado", body = User)
    ),
    security(("api_jwt" = []))
)]
pub async fn me(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = app_state.auth_service.profile(user.id).await?;
    Ok((StatusCode::OK, Json(profile)))
}

// PUT /api/auth/profile
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    tag = "Auth",
    request_body = ProfilePayload,
    responses(
        (status = 200, description = "Perfil atualizado", body = User),
        (status = 400, description = "Email já em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_profile(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ProfilePayload>,
) -> Result<impl IntoResponse, AppError> {
    let profile = app_state.auth_service.update_profile(user.id, payload).await?;
    Ok((StatusCode::OK, Json(profile)))
}

// POST /api/auth/change-password
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    tag = "Auth",
    request_body = ChangePasswordPayload,
    responses(
        (status = 200, description = "Senha trocada"),
        (status = 401, description = "Senha atual incorreta")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_password(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_state.auth_service.change_password(user.id, payload).await?;
    Ok((StatusCode::OK, Json(json!({ "message": message }))))
}

// =============================================================================
//  RESET DE SENHA E VERIFICAÇÃO DE EMAIL
// =============================================================================

// POST /api/auth/forgot-password
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordPayload,
    responses(
        (status = 200, description = "Sempre a mesma resposta, exista ou não o email")
    )
)]
pub async fn forgot_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_state.auth_service.forgot_password(payload).await?;
    Ok((StatusCode::OK, Json(json!({ "message": message }))))
}

// POST /api/auth/reset-password
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Senha redefinida"),
        (status = 400, description = "Token inválido ou expirado")
    )
)]
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_state.auth_service.reset_password(payload).await?;
    Ok((StatusCode::OK, Json(json!({ "message": message }))))
}

// GET /api/auth/verify-email/{token}
#[utoipa::path(
    get,
    path = "/api/auth/verify-email/{token}",
    tag = "Auth",
    params(("token" = String, Path, description = "Token de verificação enviado por email")),
    responses(
        (status = 200, description = "Email verificado"),
        (status = 400, description = "Token de verificação inválido")
    )
)]
pub async fn verify_email(
    State(app_state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_state.auth_service.verify_email(&token).await?;
    Ok((StatusCode::OK, Json(json!({ "message": message }))))
}

// POST /api/auth/resend-verification
#[utoipa::path(
    post,
    path = "/api/auth/resend-verification",
    tag = "Auth",
    responses(
        (status = 200, description = "Email de verificação reenviado (ou já verificada)")
    ),
    security(("api_jwt" = []))
)]
pub async fn resend_verification(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let message = app_state.auth_service.resend_verification(user.id).await?;
    Ok((StatusCode::OK, Json(json!({ "message": message }))))
}
