// src/middleware/auth.rs
//
// Guarda de autenticação: valida o Bearer JWT e deixa a identidade nas
// extensions da requisição. Nenhuma consulta ao banco aqui: o token já
// carrega id, username e role.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request},
    middleware::Next,
    response::Response,
};

use crate::common::error::AppError;
use crate::config::AppState;
use crate::models::auth::AuthUser;

pub async fn auth_guard(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err(AppError::Unauthorized("No token provided"));
    };

    let claims = state.auth_service.decode_token(token)?;
    request.extensions_mut().insert(AuthUser::from(&claims));

    Ok(next.run(request).await)
}

// Extrator usado pelos handlers protegidos; só funciona atrás do guard.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized("No token provided"))
    }
}
