// src/middleware/cors.rs
//
// CORS com lista de origens em função do ambiente: em produção o domínio
// publicado mais ALLOWED_ORIGINS, em desenvolvimento os localhost do frontend.
// Requisições sem Origin (curl, health checks) passam sem cabeçalhos extras.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

const PRODUCTION_ORIGINS: &[&str] = &["https://v-crm-sigma.vercel.app"];
const DEVELOPMENT_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";
const MAX_AGE_SECONDS: &str = "86400";

/// Origens aceitas, resolvidas uma única vez na subida do servidor.
#[derive(Clone)]
pub struct CorsPolicy {
    allowed_origins: Arc<Vec<String>>,
}

impl CorsPolicy {
    pub fn from_env(environment: &str, extra_origins: Option<&str>) -> Self {
        let mut origins: Vec<String> = if environment == "production" {
            PRODUCTION_ORIGINS.iter().map(|s| s.to_string()).collect()
        } else {
            DEVELOPMENT_ORIGINS.iter().map(|s| s.to_string()).collect()
        };

        if environment == "production" {
            if let Some(extra) = extra_origins {
                origins.extend(
                    extra
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string),
                );
            }
        }

        CorsPolicy {
            allowed_origins: Arc::new(origins),
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }

    pub async fn handle(self, request: Request<Body>, next: Next) -> Response {
        let origin = request
            .headers()
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let Some(origin) = origin else {
            return next.run(request).await;
        };

        if !self.is_allowed(&origin) {
            tracing::warn!("CORS blocked origin: {origin}");
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Not allowed by CORS" })),
            )
                .into_response();
        }

        let preflight = request.method() == Method::OPTIONS;
        let mut response = if preflight {
            StatusCode::NO_CONTENT.into_response()
        } else {
            next.run(request).await
        };

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        if preflight {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            );
            headers.insert(
                header::ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from_static(MAX_AGE_SECONDS),
            );
        }

        response
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producao_soma_o_dominio_publicado_com_os_extras() {
        let policy = CorsPolicy::from_env(
            "production",
            Some("https://app.vaib.it, https://beta.vaib.it"),
        );

        assert!(policy.is_allowed("https://v-crm-sigma.vercel.app"));
        assert!(policy.is_allowed("https://app.vaib.it"));
        assert!(policy.is_allowed("https://beta.vaib.it"));
        assert!(!policy.is_allowed("http://localhost:3000"));
    }

    #[test]
    fn desenvolvimento_aceita_so_os_localhost() {
        let policy = CorsPolicy::from_env("development", None);

        assert!(policy.is_allowed("http://localhost:3000"));
        assert!(policy.is_allowed("http://127.0.0.1:3000"));
        assert!(!policy.is_allowed("https://v-crm-sigma.vercel.app"));
    }

    #[test]
    fn extras_so_valem_em_producao() {
        let policy = CorsPolicy::from_env("development", Some("https://app.vaib.it"));
        assert!(!policy.is_allowed("https://app.vaib.it"));
    }
}
