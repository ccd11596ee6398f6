// src/middleware/rate_limit.rs
//
// Limitador de janela fixa em memória, por endereço do cliente. A janela
// reinicia inteira quando expira; não há sliding window nem persistência.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::common::error::AppError;

#[derive(Clone)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    message: &'static str,
    hits: Arc<Mutex<HashMap<String, (Instant, u32)>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32, message: &'static str) -> Self {
        RateLimiter {
            window,
            max_requests,
            message,
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 100 requisições a cada 15 minutos, para a API inteira.
    pub fn general() -> Self {
        Self::new(
            Duration::from_secs(15 * 60),
            100,
            "Too many requests, please try again later.",
        )
    }

    /// 10 tentativas por hora em login/register.
    pub fn auth() -> Self {
        Self::new(
            Duration::from_secs(60 * 60),
            10,
            "Too many login attempts, please try again after an hour.",
        )
    }

    /// Camada axum: conta a requisição e devolve 429 quando a janela estoura.
    pub async fn handle(self, request: Request<Body>, next: Next) -> Result<Response, AppError> {
        self.check(&client_key(&request), Instant::now())?;
        Ok(next.run(request).await)
    }

    fn check(&self, client: &str, now: Instant) -> Result<(), AppError> {
        let mut hits = self
            .hits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let entry = hits.entry(client.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        entry.1 += 1;

        if entry.1 > self.max_requests {
            return Err(AppError::TooManyRequests(self.message));
        }
        Ok(())
    }
}

// Atrás de proxy vale o primeiro X-Forwarded-For; sem ele, o endereço da
// conexão. Sem nenhum dos dois (testes in-process) tudo cai num balde só.
fn client_key(request: &Request<Body>) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return forwarded.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "local".to_string())
}

// ============================================================================
// TESTES
// ============================================================================
