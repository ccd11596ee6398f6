use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// As mensagens expostas na API ficam no IntoResponse; aqui embaixo
// são as descrições que aparecem nos logs.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Regras de negócio que o `validator` não cobre (campos cruzados,
    // vocabulário de status, chave duplicada...). A mensagem já chega
    // pronta para o cliente.
    #[error("Requisição inválida: {0}")]
    Invalid(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    // 401 com mensagem própria (ex.: senha atual errada na troca de senha).
    #[error("Não autorizado: {0}")]
    Unauthorized(&'static str),

    #[error("Token inválido")]
    InvalidToken,

    // 404 genérico; o argumento é o nome do recurso ("Contact", "Task"...)
    #[error("{0} não encontrado")]
    NotFound(&'static str),

    // 429 do limitador de janela fixa; cada janela tem sua mensagem.
    #[error("Muitas requisições")]
    TooManyRequests(&'static str),

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    // Atalho para as regras de negócio; evita `.to_string()` espalhado.
    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::Invalid(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message): (StatusCode, String) = match self {
            // Retornar todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Validation failed",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            AppError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
            }
            AppError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, format!("{resource} not found"))
            }
            AppError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.to_string()),

            // Todos os outros (DatabaseError, InternalServerError...) viram 500.
            // O detalhe fica só no log; o cliente recebe a mensagem genérica.
            ref e => {
                tracing::error!("Erro interno do servidor: {}", e);
                let msg = match e {
                    AppError::DatabaseError(_) => "Database error",
                    _ => "Internal server error",
                };
                (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string())
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
