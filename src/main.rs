//src/main.rs

use std::net::SocketAddr;

use axum::{
    extract::Request,
    http::{StatusCode, Uri},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::auth_guard;
use crate::middleware::cors::CorsPolicy;
use crate::middleware::rate_limit::RateLimiter;

#[tokio::main]
async fn main() {
    // Inicializa o logger; RUST_LOG pode afinar o nível por módulo.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    let environment = app_state.environment.clone();
    let app = build_router(app_state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(5001);
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("Falha ao iniciar o listener TCP");

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("  vCRM Server v2.0.0");
    tracing::info!("  Environment: {environment}");
    tracing::info!("  Server running on http://localhost:{port}");
    tracing::info!("  API docs: http://localhost:{port}/docs");
    tracing::info!("═══════════════════════════════════════════════════════");

    // O connect_info alimenta o rate limiter quando não há proxy na frente.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Erro no servidor Axum");
}

// Monta a árvore de rotas completa. Separado do main para os testes de rota
// poderem servir a aplicação inteira em memória.
pub fn build_router(app_state: AppState) -> Router {
    // Login e registro têm uma janela própria, bem mais estreita.
    let auth_limiter = RateLimiter::auth();
    let throttled_auth = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .layer(axum_middleware::from_fn(
            move |request: Request, next: axum::middleware::Next| {
                auth_limiter.clone().handle(request, next)
            },
        ));

    let public_auth = Router::new()
        .route("/forgot-password", post(handlers::auth::forgot_password))
        .route("/reset-password", post(handlers::auth::reset_password))
        .route("/verify-email/{token}", get(handlers::auth::verify_email));

    let protected_auth = Router::new()
        .route("/me", get(handlers::auth::me))
        .route("/profile", put(handlers::auth::update_profile))
        .route("/change-password", post(handlers::auth::change_password))
        .route("/resend-verification", post(handlers::auth::resend_verification))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let auth_routes = throttled_auth.merge(public_auth).merge(protected_auth);

    let contact_routes = Router::new()
        .route(
            "/",
            get(handlers::contacts::list_contacts).post(handlers::contacts::create_contact),
        )
        .route(
            "/{id}",
            get(handlers::contacts::get_contact)
                .put(handlers::contacts::update_contact)
                .delete(handlers::contacts::delete_contact),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let opportunity_routes = Router::new()
        .route(
            "/",
            get(handlers::opportunities::list_opportunities)
                .post(handlers::opportunities::create_opportunity),
        )
        .route(
            "/{id}",
            get(handlers::opportunities::get_opportunity)
                .put(handlers::opportunities::update_opportunity)
                .delete(handlers::opportunities::delete_opportunity),
        )
        .route("/{id}/stage", patch(handlers::opportunities::patch_stage))
        .route(
            "/{id}/project-status",
            patch(handlers::opportunities::patch_project_status),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let task_routes = Router::new()
        .route(
            "/",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/{id}",
            get(handlers::tasks::get_task)
                .put(handlers::tasks::update_task)
                .delete(handlers::tasks::delete_task),
        )
        .route("/{id}/toggle", patch(handlers::tasks::toggle_task))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let invoice_routes = Router::new()
        .route(
            "/",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route("/stats", get(handlers::invoices::invoice_stats))
        .route(
            "/{id}",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route("/{id}/status", patch(handlers::invoices::patch_invoice_status))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let target_routes = Router::new()
        .route("/", post(handlers::targets::upsert_target))
        .route("/batch", post(handlers::targets::replace_year))
        .route(
            "/{year}",
            get(handlers::targets::list_targets).delete(handlers::targets::delete_year),
        )
        .route("/{year}/total", get(handlers::targets::annual_total))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let ui_config_routes = Router::new()
        .route("/me", get(handlers::ui_config::my_config))
        .route("/default", get(handlers::ui_config::default_config))
        .route("/", post(handlers::ui_config::save_config))
        .route("/theme", patch(handlers::ui_config::patch_theme))
        .route(
            "/pages/{pageId}/visibility",
            patch(handlers::ui_config::patch_page_visibility),
        )
        .route("/reset", post(handlers::ui_config::reset_config))
        .route("/ai-generate", post(handlers::ui_config::ai_generate))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let chatbot_routes = Router::new()
        .route("/message", post(handlers::chatbot::send_message))
        .route("/suggestions", get(handlers::chatbot::suggestions))
        .route("/models", get(handlers::chatbot::models))
        .route("/quick-query", post(handlers::chatbot::quick_query_message))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Rotas transversais montadas direto em /api.
    let extra_routes = Router::new()
        .route("/stats", get(handlers::dashboard::global_stats))
        .route("/search", get(handlers::dashboard::search))
        .route("/export", get(handlers::dashboard::export_data))
        .route("/notifications", get(handlers::dashboard::list_notifications))
        .route(
            "/notifications/read-all",
            patch(handlers::dashboard::mark_all_notifications_read),
        )
        .route(
            "/notifications/{id}/read",
            patch(handlers::dashboard::mark_notification_read),
        )
        .route(
            "/notes",
            get(handlers::dashboard::list_notes).post(handlers::dashboard::create_note),
        )
        .route("/notes/{id}", delete(handlers::dashboard::delete_note))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Janela geral de 15 minutos para toda a API.
    let general_limiter = RateLimiter::general();
    let api = Router::new()
        .route("/", get(handlers::dashboard::api_info))
        .route("/health", get(handlers::dashboard::health))
        .nest("/auth", auth_routes)
        .nest("/contacts", contact_routes)
        .nest("/opportunities", opportunity_routes)
        .nest("/tasks", task_routes)
        .nest("/invoices", invoice_routes)
        .nest("/targets", target_routes)
        .nest("/ui-config", ui_config_routes)
        .nest("/chatbot", chatbot_routes)
        .merge(extra_routes)
        .layer(axum_middleware::from_fn(
            move |request: Request, next: axum::middleware::Next| {
                general_limiter.clone().handle(request, next)
            },
        ));

    let cors = CorsPolicy::from_env(
        &app_state.environment,
        std::env::var("ALLOWED_ORIGINS").ok().as_deref(),
    );
    let log_requests = app_state.environment == "development";

    Router::new()
        .nest("/api", api)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .fallback(endpoint_not_found)
        .layer(axum_middleware::from_fn(
            move |request: Request, next: axum::middleware::Next| async move {
                if log_requests {
                    tracing::info!("{} {}", request.method(), request.uri().path());
                }
                next.run(request).await
            },
        ))
        .layer(axum_middleware::from_fn(
            move |request: Request, next: axum::middleware::Next| {
                cors.clone().handle(request, next)
            },
        ))
        .with_state(app_state)
}

async fn endpoint_not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found", "path": uri.to_string() })),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("SIGINT received. Shutting down gracefully...");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!("SIGTERM received. Shutting down gracefully...");
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppState;
    use crate::db::{schema, DataSource};
    use crate::services::openrouter::testing::ScriptedBackend;
    use crate::services::openrouter::CompletionBackend;
    use crate::services::Mailer;

    use super::build_router;

    async fn test_app() -> axum::Router {
        let db = DataSource::connect("sqlite::memory:").await.unwrap();
        schema::ensure_schema(&db).await.unwrap();
        let backend: Arc<dyn CompletionBackend> = Arc::new(ScriptedBackend::new(Vec::new()));
        let state = AppState::assemble(
            db,
            "segredo-de-teste".to_string(),
            backend,
            false,
            Mailer::unconfigured(),
            "development".to_string(),
        );
        build_router(state)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_responde_com_o_estado_do_servico() {
        let app = test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], json!("ok"));
        assert_eq!(body["message"], json!("vCRM API is running"));
        assert_eq!(body["environment"], json!("development"));
    }

    #[tokio::test]
    async fn raiz_da_api_descreve_os_endpoints() {
        let app = test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], json!("vCRM API"));
        assert_eq!(body["endpoints"]["auth"], json!("/api/auth"));
    }

    #[tokio::test]
    async fn rota_desconhecida_vira_404_json() {
        let app = test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/api/nao-existe").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("Endpoint not found"));
        assert_eq!(body["path"], json!("/api/nao-existe"));
    }

    #[tokio::test]
    async fn rotas_protegidas_exigem_token() {
        let app = test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/api/contacts").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("No token provided"));
    }

    #[tokio::test]
    async fn registro_login_e_perfil_de_ponta_a_ponta() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/auth/register",
                json!({
                    "username": "giulia",
                    "email": "giulia@test.it",
                    "password": "segreto1",
                    "fullName": "Giulia Bianchi"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert!(body["token"].is_string());
        assert_eq!(body["user"]["username"], json!("giulia"));

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/auth/login",
                json!({ "username": "giulia", "password": "segreto1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let token = body["token"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["username"], json!("giulia"));
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn preflight_cors_liberado_para_o_front_local() {
        let app = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/contacts")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("http://localhost:3000")
        );
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|methods| methods.contains("PATCH")));
    }

    #[tokio::test]
    async fn origem_desconhecida_e_bloqueada() {
        let app = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header(header::ORIGIN, "http://intruso.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("Not allowed by CORS"));
    }
}
