// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::datasource::SqlRow;

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password: String,

    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: String,
    pub email_verified: bool,

    // Validade do token de reset; nunca sai na API.
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub reset_expires: Option<String>,

    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl User {
    pub fn from_row(row: &SqlRow) -> Result<Self, sqlx::Error> {
        Ok(User {
            id: row.i64("id")?,
            username: row.text("username")?,
            email: row.text("email")?,
            password: row.opt_text("password").unwrap_or_default(),
            full_name: row.opt_text("fullName"),
            avatar: row.opt_text("avatar"),
            phone: row.opt_text("phone"),
            company: row.opt_text("company"),
            role: row.opt_text("role").unwrap_or_else(|| "user".to_string()),
            email_verified: row.opt_i64("emailVerified").unwrap_or(0) != 0,
            reset_expires: row.opt_text("resetExpires"),
            created_at: row.opt_text("createdAt"),
            updated_at: row.opt_text("updatedAt"),
        })
    }
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    #[validate(length(min = 1, message = "Username, email, and password are required"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub full_name: Option<String>,
    pub company: Option<String>,
}

// Dados para login (aceita username OU email no mesmo campo)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(length(min = 1, message = "Username and password are required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Username and password are required"))]
    pub password: String,
}

// Resposta de autenticação com o token e o usuário logado
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

// Identidade já validada pelo auth_guard, disponível nas extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl From<&Claims> for AuthUser {
    fn from(claims: &Claims) -> Self {
        AuthUser {
            id: claims.user_id,
            username: claims.username.clone(),
            role: claims.role.clone(),
        }
    }
}

// --- PAYLOADS DO PERFIL E DO CICLO DE SENHA ---

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ForgotPasswordPayload {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordPayload {
    pub token: Option<String>,
    pub password: Option<String>,
}
