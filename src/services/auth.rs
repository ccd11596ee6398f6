// src/services/auth.rs

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, SecondsFormat, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{
        AuthResponse, ChangePasswordPayload, Claims, ForgotPasswordPayload, LoginPayload,
        ProfilePayload, RegisterPayload, ResetPasswordPayload, User,
    },
    services::mailer::Mailer,
};

// Resposta opaca do forgot-password: a mesma com ou sem usuário.
const RESET_REQUEST_MESSAGE: &str = "Se l'email esiste, riceverai le istruzioni per il reset";

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    mailer: Mailer,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, mailer: Mailer, jwt_secret: String) -> Self {
        Self { user_repo, mailer, jwt_secret }
    }

    // =========================================================================
    //  REGISTRO E LOGIN
    // =========================================================================

    pub async fn register(&self, payload: RegisterPayload) -> Result<AuthResponse, AppError> {
        payload.validate()?;

        let hashed = hash_password(payload.password).await?;
        let avatar = avatar_initials(payload.full_name.as_deref(), &payload.username);
        let company = payload.company.as_deref().filter(|c| !c.is_empty());

        let user = self
            .user_repo
            .create_user(
                &payload.username,
                &payload.email,
                &hashed,
                payload.full_name.as_deref(),
                Some(&avatar),
                company,
                "user",
            )
            .await?;

        let token = self.create_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    /// O campo `username` aceita tanto o username quanto o email.
    pub async fn login(&self, payload: LoginPayload) -> Result<AuthResponse, AppError> {
        payload.validate()?;

        let user = self
            .user_repo
            .find_by_identifier(&payload.username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(payload.password, user.password.clone()).await? {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.create_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    // =========================================================================
    //  PERFIL
    // =========================================================================

    pub async fn profile(&self, user_id: i64) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    /// Atualização de perfil é linha inteira: campo ausente vira NULL.
    /// O avatar é recalculado a partir do nome novo; sem nome, fica o antigo.
    pub async fn update_profile(
        &self,
        user_id: i64,
        payload: ProfilePayload,
    ) -> Result<User, AppError> {
        let avatar = payload
            .full_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| avatar_initials(Some(name), ""));

        self.user_repo
            .update_profile(
                user_id,
                payload.full_name.as_deref(),
                payload.email.as_deref(),
                payload.phone.as_deref(),
                payload.company.as_deref(),
                avatar.as_deref(),
            )
            .await
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        payload: ChangePasswordPayload,
    ) -> Result<&'static str, AppError> {
        let current = payload.current_password.as_deref().filter(|p| !p.is_empty());
        let new_password = payload.new_password.as_deref().filter(|p| !p.is_empty());
        let (current, new_password) = match (current, new_password) {
            (Some(current), Some(new_password)) => (current, new_password),
            _ => {
                return Err(AppError::invalid(
                    "Current password and new password are required",
                ))
            }
        };
        if new_password.chars().count() < 6 {
            return Err(AppError::invalid("New password must be at least 6 characters"));
        }

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        if !verify_password(current.to_string(), user.password.clone()).await? {
            return Err(AppError::Unauthorized("Current password is incorrect"));
        }

        let hashed = hash_password(new_password.to_string()).await?;
        self.user_repo.set_password(user_id, &hashed).await?;
        Ok("Password updated successfully")
    }

    // =========================================================================
    //  RESET DE SENHA
    // =========================================================================

    pub async fn forgot_password(
        &self,
        payload: ForgotPasswordPayload,
    ) -> Result<&'static str, AppError> {
        let email = payload
            .email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::invalid("Email is required"))?;

        // A resposta nunca revela se o email existe.
        let user = match self.user_repo.find_by_email(email).await? {
            Some(user) => user,
            None => return Ok(RESET_REQUEST_MESSAGE),
        };

        let token = generate_token();
        let expires =
            (Utc::now() + Duration::hours(1)).to_rfc3339_opts(SecondsFormat::Millis, true);
        self.user_repo.set_reset_token(user.id, &token, &expires).await?;

        // Envio em segundo plano; falha de email não muda a resposta.
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer
                .send_password_reset_email(&user.email, &token, user.full_name.as_deref())
                .await
            {
                tracing::error!("Failed to send password reset email: {e}");
            }
        });

        Ok(RESET_REQUEST_MESSAGE)
    }

    pub async fn reset_password(
        &self,
        payload: ResetPasswordPayload,
    ) -> Result<&'static str, AppError> {
        let token = payload.token.as_deref().filter(|t| !t.is_empty());
        let password = payload.password.as_deref().filter(|p| !p.is_empty());
        let (token, password) = match (token, password) {
            (Some(token), Some(password)) => (token, password),
            _ => return Err(AppError::invalid("Token e nuova password sono obbligatori")),
        };
        if password.chars().count() < 6 {
            return Err(AppError::invalid("La password deve essere di almeno 6 caratteri"));
        }

        let user = self
            .user_repo
            .find_by_reset_token(token)
            .await?
            .ok_or_else(|| AppError::invalid("Token non valido o scaduto"))?;

        let expired = match user.reset_expires.as_deref() {
            Some(text) => chrono::DateTime::parse_from_rfc3339(text)
                .map(|expiry| expiry < Utc::now())
                .unwrap_or(false),
            None => true,
        };
        if expired {
            return Err(AppError::invalid("Token scaduto. Richiedi un nuovo reset."));
        }

        let hashed = hash_password(password.to_string()).await?;
        self.user_repo.set_password_and_clear_reset(user.id, &hashed).await?;
        Ok("Password aggiornata con successo")
    }

    // =========================================================================
    //  VERIFICAÇÃO DE EMAIL
    // =========================================================================

    pub async fn verify_email(&self, token: &str) -> Result<&'static str, AppError> {
        let user = self
            .user_repo
            .find_by_verification_token(token)
            .await?
            .ok_or_else(|| AppError::invalid("Token di verifica non valido"))?;

        self.user_repo.mark_email_verified(user.id).await?;
        Ok("Email verificata con successo!")
    }

    pub async fn resend_verification(&self, user_id: i64) -> Result<&'static str, AppError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        if user.email_verified {
            return Ok("Email già verificata");
        }

        let token = generate_token();
        self.user_repo.set_verification_token(user.id, &token).await?;

        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer
                .send_verification_email(&user.email, &token, user.full_name.as_deref())
                .await
            {
                tracing::error!("Failed to send verification email: {e}");
            }
        });

        Ok("Email di verifica inviata")
    }

    // =========================================================================
    //  TOKENS
    // =========================================================================

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(24);

        let claims = Claims {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(data.claims)
    }

    // =========================================================================
    //  BOOTSTRAP
    // =========================================================================

    /// Garante o usuário admin inicial na primeira subida do servidor.
    pub async fn bootstrap_admin(&self) -> Result<(), AppError> {
        if self.user_repo.find_by_username("admin").await?.is_some() {
            return Ok(());
        }

        let hashed = hash_password("admin123".to_string()).await?;
        match self
            .user_repo
            .create_user(
                "admin",
                "admin@vcrm.it",
                &hashed,
                Some("Amministratore"),
                Some("AD"),
                None,
                "admin",
            )
            .await
        {
            Ok(_) => {
                tracing::info!("✅ Usuário admin padrão criado (admin / admin123)");
                Ok(())
            }
            // Outro processo pode ter criado o admin no meio tempo.
            Err(AppError::Invalid(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// AUXILIARES
// ============================================================================

/// As iniciais do nome completo ("Mario Rossi" -> "MR"), limitadas a duas;
/// sem nome, os dois primeiros caracteres do username.
fn avatar_initials(full_name: Option<&str>, username: &str) -> String {
    match full_name.filter(|name| !name.is_empty()) {
        Some(name) => name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .collect::<String>()
            .to_uppercase()
            .chars()
            .take(2)
            .collect(),
        None => username.chars().take(2).collect::<String>().to_uppercase(),
    }
}

// Token opaco de 64 caracteres hex (reset de senha / verificação de email).
fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

// O bcrypt é caro; roda fora do runtime para não travar os workers.
async fn hash_password(password: String) -> Result<String, AppError> {
    let hashed = tokio::task::spawn_blocking(move || hash(&password, DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

async fn verify_password(password: String, password_hash: String) -> Result<bool, AppError> {
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(valid)
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::datasource::DataSource;
    use crate::db::schema::ensure_schema;
    use crate::params;

    async fn servico_de_teste() -> (AuthService, DataSource) {
        let db = DataSource::connect("sqlite::memory:").await.unwrap();
        ensure_schema(&db).await.unwrap();
        let service = AuthService::new(
            UserRepository::new(db.clone()),
            Mailer::unconfigured(),
            "segredo-de-teste".to_string(),
        );
        (service, db)
    }

    fn registro(username: &str, email: &str) -> RegisterPayload {
        RegisterPayload {
            username: username.to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            full_name: Some("Mario Rossi".to_string()),
            company: None,
        }
    }

    #[test]
    fn iniciais_do_avatar() {
        assert_eq!(avatar_initials(Some("Mario Rossi"), "x"), "MR");
        assert_eq!(avatar_initials(Some("Gian Carlo Rossi"), "x"), "GC");
        assert_eq!(avatar_initials(Some("anna"), "x"), "A");
        assert_eq!(avatar_initials(None, "valentino"), "VA");
        assert_eq!(avatar_initials(Some(""), "vg"), "VG");
    }

    #[tokio::test]
    async fn registro_login_e_token() {
        let (service, _db) = servico_de_teste().await;

        let criado = service.register(registro("mario", "mario@studio.it")).await.unwrap();
        assert!(!criado.token.is_empty());
        assert_eq!(criado.user.avatar.as_deref(), Some("MR"));
        assert_eq!(criado.user.role, "user");

        // O login aceita o email no lugar do username.
        let login = service
            .login(LoginPayload {
                username: "mario@studio.it".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();
        let claims = service.decode_token(&login.token).unwrap();
        assert_eq!(claims.user_id, criado.user.id);
        assert_eq!(claims.username, "mario");
        assert_eq!(claims.role, "user");

        let errado = service
            .login(LoginPayload {
                username: "mario".to_string(),
                password: "sbagliata".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(errado, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn troca_de_senha_exige_a_atual() {
        let (service, _db) = servico_de_teste().await;
        let criado = service.register(registro("anna", "anna@studio.it")).await.unwrap();

        let erro = service
            .change_password(
                criado.user.id,
                ChangePasswordPayload {
                    current_password: Some("sbagliata".to_string()),
                    new_password: Some("nuovapassword".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(erro, AppError::Unauthorized(_)));

        service
            .change_password(
                criado.user.id,
                ChangePasswordPayload {
                    current_password: Some("password123".to_string()),
                    new_password: Some("nuovapassword".to_string()),
                },
            )
            .await
            .unwrap();

        assert!(service
            .login(LoginPayload {
                username: "anna".to_string(),
                password: "nuovapassword".to_string(),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn ciclo_de_reset_de_senha() {
        let (service, db) = servico_de_teste().await;
        service.register(registro("sara", "sara@studio.it")).await.unwrap();

        let msg = service
            .forgot_password(ForgotPasswordPayload { email: Some("sara@studio.it".to_string()) })
            .await
            .unwrap();
        assert_eq!(msg, "Se l'email esiste, riceverai le istruzioni per il reset");

        // Email desconhecido recebe a MESMA resposta.
        let opaco = service
            .forgot_password(ForgotPasswordPayload {
                email: Some("nessuno@studio.it".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(opaco, msg);

        let row = db
            .fetch_optional(
                r#"SELECT "resetToken" FROM users WHERE email = ?"#,
                &params!["sara@studio.it"],
            )
            .await
            .unwrap()
            .unwrap();
        let token = row.opt_text("resetToken").unwrap();
        assert_eq!(token.len(), 64);

        service
            .reset_password(ResetPasswordPayload {
                token: Some(token.clone()),
                password: Some("nuovissima".to_string()),
            })
            .await
            .unwrap();

        // O token queima após o uso.
        let di_nuovo = service
            .reset_password(ResetPasswordPayload {
                token: Some(token),
                password: Some("altra123".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(di_nuovo, AppError::Invalid(_)));

        assert!(service
            .login(LoginPayload {
                username: "sara".to_string(),
                password: "nuovissima".to_string(),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn token_de_reset_expirado_e_recusado() {
        let (service, db) = servico_de_teste().await;
        let criado = service.register(registro("piero", "piero@studio.it")).await.unwrap();

        let repo = UserRepository::new(db);
        repo.set_reset_token(criado.user.id, "scaduto-tok", "2020-01-01T00:00:00.000Z")
            .await
            .unwrap();

        let erro = service
            .reset_password(ResetPasswordPayload {
                token: Some("scaduto-tok".to_string()),
                password: Some("nuovapass".to_string()),
            })
            .await
            .unwrap_err();
        match erro {
            AppError::Invalid(msg) => {
                assert_eq!(msg, "Token scaduto. Richiedi un nuovo reset.")
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[tokio::test]
    async fn ciclo_de_verificacao_de_email() {
        let (service, db) = servico_de_teste().await;
        let criado = service.register(registro("luca", "luca@studio.it")).await.unwrap();

        assert_eq!(
            service.resend_verification(criado.user.id).await.unwrap(),
            "Email di verifica inviata"
        );

        let row = db
            .fetch_optional(
                r#"SELECT "verificationToken" FROM users WHERE id = ?"#,
                &params![criado.user.id],
            )
            .await
            .unwrap()
            .unwrap();
        let token = row.opt_text("verificationToken").unwrap();

        assert_eq!(
            service.verify_email(&token).await.unwrap(),
            "Email verificata con successo!"
        );
        assert_eq!(
            service.resend_verification(criado.user.id).await.unwrap(),
            "Email già verificata"
        );

        let sbagliato = service.verify_email("inesistente").await.unwrap_err();
        assert!(matches!(sbagliato, AppError::Invalid(_)));
    }

    #[tokio::test]
    async fn bootstrap_cria_o_admin_uma_vez_so() {
        let (service, db) = servico_de_teste().await;
        service.bootstrap_admin().await.unwrap();
        service.bootstrap_admin().await.unwrap();

        let rows = db
            .fetch_all("SELECT id FROM users WHERE username = 'admin'", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        assert!(service
            .login(LoginPayload {
                username: "admin".to_string(),
                password: "admin123".to_string(),
            })
            .await
            .is_ok());
    }
}
