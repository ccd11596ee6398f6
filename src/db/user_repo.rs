// src/db/user_repo.rs

use crate::common::error::AppError;
use crate::db::datasource::{is_unique_violation, DataSource};
use crate::models::auth::User;
use crate::params;

// O repositório de usuários, responsável por todas as interações com a
// tabela 'users'.
#[derive(Clone)]
pub struct UserRepository {
    db: DataSource,
}

impl UserRepository {
    pub fn new(db: DataSource) -> Self {
        Self { db }
    }

    // =========================================================================
    //  BUSCAS
    // =========================================================================

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = self
            .db
            .fetch_optional("SELECT * FROM users WHERE id = ?", &params![id])
            .await?;
        row.map(|row| User::from_row(&row)).transpose().map_err(AppError::from)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = self
            .db
            .fetch_optional("SELECT * FROM users WHERE username = ?", &params![username])
            .await?;
        row.map(|row| User::from_row(&row)).transpose().map_err(AppError::from)
    }

    /// O login aceita username OU email no mesmo campo.
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AppError> {
        let row = self
            .db
            .fetch_optional(
                "SELECT * FROM users WHERE username = ? OR email = ?",
                &params![identifier, identifier],
            )
            .await?;
        row.map(|row| User::from_row(&row)).transpose().map_err(AppError::from)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = self
            .db
            .fetch_optional("SELECT * FROM users WHERE email = ?", &params![email])
            .await?;
        row.map(|row| User::from_row(&row)).transpose().map_err(AppError::from)
    }

    pub async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, AppError> {
        let row = self
            .db
            .fetch_optional(
                r#"SELECT * FROM users WHERE "resetToken" = ?"#,
                &params![token],
            )
            .await?;
        row.map(|row| User::from_row(&row)).transpose().map_err(AppError::from)
    }

    pub async fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, AppError> {
        let row = self
            .db
            .fetch_optional(
                r#"SELECT * FROM users WHERE "verificationToken" = ?"#,
                &params![token],
            )
            .await?;
        row.map(|row| User::from_row(&row)).transpose().map_err(AppError::from)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    /// Cria um usuário com a senha já em hash. Violações de unicidade de
    /// username/email voltam como 400, não como erro de banco.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        full_name: Option<&str>,
        avatar: Option<&str>,
        company: Option<&str>,
        role: &str,
    ) -> Result<User, AppError> {
        let id = self
            .db
            .insert(
                r#"INSERT INTO users (username, email, password, "fullName", avatar, company, role)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
                &params![username, email, password_hash, full_name, avatar, company, role],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::invalid("Username or email already exists")
                } else {
                    AppError::from(e)
                }
            })?;

        self.find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    /// Atualiza o perfil. `avatar` usa COALESCE: só muda quando um novo
    /// valor (as iniciais recalculadas) é passado.
    pub async fn update_profile(
        &self,
        id: i64,
        full_name: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
        company: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<User, AppError> {
        self.db
            .execute(
                r#"UPDATE users
                   SET "fullName" = ?, email = ?, phone = ?, company = ?,
                       avatar = COALESCE(?, avatar),
                       "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ?"#,
                &params![full_name, email, phone, company, avatar, id],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::invalid("Email already in use")
                } else {
                    AppError::from(e)
                }
            })?;

        self.find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        self.db
            .execute(
                r#"UPDATE users
                   SET password = ?, "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ?"#,
                &params![password_hash, id],
            )
            .await?;
        Ok(())
    }

    /// Conclui o reset: grava a senha nova e queima o token.
    pub async fn set_password_and_clear_reset(
        &self,
        id: i64,
        password_hash: &str,
    ) -> Result<(), AppError> {
        self.db
            .execute(
                r#"UPDATE users
                   SET password = ?, "resetToken" = NULL, "resetExpires" = NULL,
                       "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ?"#,
                &params![password_hash, id],
            )
            .await?;
        Ok(())
    }

    pub async fn set_reset_token(
        &self,
        id: i64,
        token: &str,
        expires: &str,
    ) -> Result<(), AppError> {
        self.db
            .execute(
                r#"UPDATE users
                   SET "resetToken" = ?, "resetExpires" = ?,
                       "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ?"#,
                &params![token, expires, id],
            )
            .await?;
        Ok(())
    }

    pub async fn set_verification_token(&self, id: i64, token: &str) -> Result<(), AppError> {
        self.db
            .execute(
                r#"UPDATE users
                   SET "verificationToken" = ?, "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ?"#,
                &params![token, id],
            )
            .await?;
        Ok(())
    }

    pub async fn mark_email_verified(&self, id: i64) -> Result<(), AppError> {
        self.db
            .execute(
                r#"UPDATE users
                   SET "emailVerified" = 1, "verificationToken" = NULL,
                       "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ?"#,
                &params![id],
            )
            .await?;
        Ok(())
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::ensure_schema;

    async fn repo_de_teste() -> UserRepository {
        let db = DataSource::connect("sqlite::memory:").await.unwrap();
        ensure_schema(&db).await.unwrap();
        UserRepository::new(db)
    }

    #[tokio::test]
    async fn criacao_e_busca_por_identificador() {
        let repo = repo_de_teste().await;

        let criado = repo
            .create_user("mario", "mario@studio.it", "hash", Some("Mario Rossi"), Some("MR"), None, "user")
            .await
            .unwrap();
        assert_eq!(criado.username, "mario");
        assert_eq!(criado.avatar.as_deref(), Some("MR"));

        // Tanto o username quanto o email funcionam no login.
        assert!(repo.find_by_identifier("mario").await.unwrap().is_some());
        assert!(repo.find_by_identifier("mario@studio.it").await.unwrap().is_some());
        assert!(repo.find_by_identifier("sconosciuto").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn username_duplicado_vira_400() {
        let repo = repo_de_teste().await;

        repo.create_user("anna", "anna@studio.it", "hash", None, None, None, "user")
            .await
            .unwrap();
        let erro = repo
            .create_user("anna", "altra@studio.it", "hash", None, None, None, "user")
            .await
            .unwrap_err();

        assert!(matches!(erro, AppError::Invalid(_)));
    }

    #[tokio::test]
    async fn perfil_preserva_avatar_quando_nao_ha_novo() {
        let repo = repo_de_teste().await;
        let user = repo
            .create_user("luca", "luca@studio.it", "hash", Some("Luca Bianchi"), Some("LB"), None, "user")
            .await
            .unwrap();

        let sem_avatar = repo
            .update_profile(user.id, Some("Luca B."), Some("luca@studio.it"), None, None, None)
            .await
            .unwrap();
        assert_eq!(sem_avatar.avatar.as_deref(), Some("LB"));

        let com_avatar = repo
            .update_profile(
                user.id,
                Some("Luca Verdi"),
                Some("luca@studio.it"),
                None,
                None,
                Some("LV"),
            )
            .await
            .unwrap();
        assert_eq!(com_avatar.avatar.as_deref(), Some("LV"));
    }

    #[tokio::test]
    async fn ciclo_de_reset_limpa_o_token() {
        let repo = repo_de_teste().await;
        let user = repo
            .create_user("sara", "sara@studio.it", "vecchia", None, None, None, "user")
            .await
            .unwrap();

        repo.set_reset_token(user.id, "tok123", "2026-12-31T00:00:00.000Z")
            .await
            .unwrap();
        assert!(repo.find_by_reset_token("tok123").await.unwrap().is_some());

        repo.set_password_and_clear_reset(user.id, "nuova").await.unwrap();
        assert!(repo.find_by_reset_token("tok123").await.unwrap().is_none());

        let atualizado = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(atualizado.password, "nuova");
    }

    #[tokio::test]
    async fn verificacao_de_email_queima_o_token() {
        let repo = repo_de_teste().await;
        let user = repo
            .create_user("piero", "piero@studio.it", "hash", None, None, None, "user")
            .await
            .unwrap();

        repo.set_verification_token(user.id, "ver456").await.unwrap();
        assert!(repo.find_by_verification_token("ver456").await.unwrap().is_some());

        repo.mark_email_verified(user.id).await.unwrap();
        assert!(repo.find_by_verification_token("ver456").await.unwrap().is_none());

        let atualizado = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert!(atualizado.email_verified);
    }
}
