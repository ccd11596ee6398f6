// src/config.rs

use std::{env, sync::Arc};

use anyhow::Context;

use crate::{
    db::{
        schema, ContactRepository, DashboardRepository, DataSource, InvoiceRepository,
        OpportunityRepository, TargetRepository, TaskRepository, UiConfigRepository,
        UserRepository,
    },
    services::{
        openrouter::{CompletionBackend, OpenRouterBackend},
        AuthService, ChatbotService, Mailer, UiBuilderService,
    },
};

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db: DataSource,
    pub environment: String,
    pub auth_service: AuthService,
    pub chatbot_service: ChatbotService,
    pub ui_builder_service: UiBuilderService,
    pub contact_repo: ContactRepository,
    pub opportunity_repo: OpportunityRepository,
    pub task_repo: TaskRepository,
    pub invoice_repo: InvoiceRepository,
    pub target_repo: TargetRepository,
    pub ui_config_repo: UiConfigRepository,
    pub dashboard_repo: DashboardRepository,
}

impl AppState {
    // Carrega o ambiente, abre o banco e monta o gráfico de dependências.
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let environment = env::var("NODE_ENV").unwrap_or_else(|_| "development".to_string());
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let openrouter_key = env::var("OPENROUTER_API_KEY").unwrap_or_default();
        if openrouter_key.is_empty() {
            tracing::warn!("[AI Chatbot] WARNING: OPENROUTER_API_KEY not set in environment variables");
        }

        // DATABASE_URL liga o Postgres; sem ela o serviço degrada para um
        // arquivo SQLite local, como em desenvolvimento.
        let database_url = env::var("DATABASE_URL")
            .or_else(|_| env::var("DB_PATH"))
            .unwrap_or_else(|_| "crm.db".to_string());

        let db = DataSource::connect(&database_url).await.with_context(|| {
            format!("falha ao conectar ao banco de dados ({database_url})")
        })?;
        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        schema::ensure_schema(&db)
            .await
            .context("falha ao preparar o esquema do banco de dados")?;

        let api_key_configured = !openrouter_key.is_empty();
        let backend: Arc<dyn CompletionBackend> = Arc::new(OpenRouterBackend::new(openrouter_key));

        let state = Self::assemble(
            db,
            jwt_secret,
            backend,
            api_key_configured,
            Mailer::from_env(),
            environment,
        );

        state.auth_service.bootstrap_admin().await?;
        Ok(state)
    }

    // Montagem pura do estado: os testes de rota passam um SQLite em memória
    // e um backend de IA roteirizado por aqui.
    pub fn assemble(
        db: DataSource,
        jwt_secret: String,
        backend: Arc<dyn CompletionBackend>,
        api_key_configured: bool,
        mailer: Mailer,
        environment: String,
    ) -> Self {
        let user_repo = UserRepository::new(db.clone());
        let auth_service = AuthService::new(user_repo, mailer, jwt_secret);
        let chatbot_service = ChatbotService::new(backend.clone());
        let ui_builder_service = UiBuilderService::new(backend, api_key_configured);

        AppState {
            environment,
            auth_service,
            chatbot_service,
            ui_builder_service,
            contact_repo: ContactRepository::new(db.clone()),
            opportunity_repo: OpportunityRepository::new(db.clone()),
            task_repo: TaskRepository::new(db.clone()),
            invoice_repo: InvoiceRepository::new(db.clone()),
            target_repo: TargetRepository::new(db.clone()),
            ui_config_repo: UiConfigRepository::new(db.clone()),
            dashboard_repo: DashboardRepository::new(db.clone()),
            db,
        }
    }
}
