// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::auth::update_profile,
        handlers::auth::change_password,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::auth::verify_email,
        handlers::auth::resend_verification,

        // --- Contacts ---
        handlers::contacts::list_contacts,
        handlers::contacts::get_contact,
        handlers::contacts::create_contact,
        handlers::contacts::update_contact,
        handlers::contacts::delete_contact,

        // --- Opportunities ---
        handlers::opportunities::list_opportunities,
        handlers::opportunities::get_opportunity,
        handlers::opportunities::create_opportunity,
        handlers::opportunities::update_opportunity,
        handlers::opportunities::delete_opportunity,
        handlers::opportunities::patch_stage,
        handlers::opportunities::patch_project_status,

        // --- Tasks ---
        handlers::tasks::list_tasks,
        handlers::tasks::get_task,
        handlers::tasks::create_task,
        handlers::tasks::update_task,
        handlers::tasks::toggle_task,
        handlers::tasks::delete_task,

        // --- Invoices ---
        handlers::invoices::list_invoices,
        handlers::invoices::invoice_stats,
        handlers::invoices::get_invoice,
        handlers::invoices::create_invoice,
        handlers::invoices::update_invoice,
        handlers::invoices::patch_invoice_status,
        handlers::invoices::delete_invoice,

        // --- Targets ---
        handlers::targets::list_targets,
        handlers::targets::annual_total,
        handlers::targets::upsert_target,
        handlers::targets::replace_year,
        handlers::targets::delete_year,

        // --- UI Config ---
        handlers::ui_config::my_config,
        handlers::ui_config::default_config,
        handlers::ui_config::save_config,
        handlers::ui_config::patch_theme,
        handlers::ui_config::patch_page_visibility,
        handlers::ui_config::reset_config,
        handlers::ui_config::ai_generate,

        // --- Chatbot ---
        handlers::chatbot::send_message,
        handlers::chatbot::suggestions,
        handlers::chatbot::models,
        handlers::chatbot::quick_query_message,

        // --- Dashboard ---
        handlers::dashboard::global_stats,
        handlers::dashboard::search,
        handlers::dashboard::export_data,
        handlers::dashboard::list_notifications,
        handlers::dashboard::mark_notification_read,
        handlers::dashboard::mark_all_notifications_read,
        handlers::dashboard::list_notes,
        handlers::dashboard::create_note,
        handlers::dashboard::delete_note,
        handlers::dashboard::health,
        handlers::dashboard::api_info,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterPayload,
            models::auth::LoginPayload,
            models::auth::AuthResponse,
            models::auth::ProfilePayload,
            models::auth::ChangePasswordPayload,
            models::auth::ForgotPasswordPayload,
            models::auth::ResetPasswordPayload,

            // --- CRM ---
            models::crm::Contact,
            models::crm::Opportunity,
            models::crm::Task,
            models::crm::ContactPayload,
            models::crm::OpportunityPayload,
            models::crm::StagePatchPayload,
            models::crm::ProjectStatusPayload,
            models::crm::TaskPayload,

            // --- Invoices ---
            models::invoice::Invoice,
            models::invoice::InvoiceStats,
            models::invoice::ForfettarioSummary,
            models::invoice::MonthlyAmount,
            models::invoice::InvoicePayload,
            models::invoice::InvoiceStatusPayload,

            // --- Targets ---
            models::target::MonthlyTarget,
            models::target::AnnualTargetTotals,
            models::target::TargetTotals,
            models::target::TargetPayload,
            models::target::TargetBatchPayload,
            models::target::TargetBatchItem,

            // --- UI Config ---
            models::ui_config::UiConfigView,
            models::ui_config::UiConfigPayload,
            models::ui_config::ThemePayload,
            models::ui_config::VisibilityPayload,
            models::ui_config::AiGeneratePayload,

            // --- Chatbot ---
            models::chat::ChatMessage,
            models::chat::Suggestion,
            models::chat::ChatPayload,
            models::chat::QuickQueryPayload,
            handlers::chatbot::ChatResponse,
            handlers::chatbot::SuggestionsResponse,

            // --- Dashboard ---
            models::dashboard::GlobalStats,
            models::dashboard::SearchResults,
            models::dashboard::Note,
            models::dashboard::NotificationView,
            models::dashboard::NotePayload,
            models::dashboard::ExportEnvelope,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação, perfil e verificação de email"),
        (name = "Contacts", description = "Contatos e clientes"),
        (name = "Opportunities", description = "Pipeline de oportunidades e projetos"),
        (name = "Tasks", description = "Tarefas e prazos"),
        (name = "Invoices", description = "Faturas e regime forfettario"),
        (name = "Targets", description = "Metas mensais de faturamento"),
        (name = "UI Config", description = "Configuração de interface por usuário"),
        (name = "Chatbot", description = "Assistente IA sobre os dados do CRM"),
        (name = "Dashboard", description = "Estatísticas, busca e export"),
        (name = "Notificações", description = "Avisos persistidos e derivados de prazos"),
        (name = "Notas", description = "Notas ligadas a qualquer entidade"),
        (name = "Sistema", description = "Health check e metadados da API")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
