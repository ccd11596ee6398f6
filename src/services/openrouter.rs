// src/services/openrouter.rs
//
// Cliente do endpoint chat/completions da OpenRouter. A trait isola o HTTP
// dos serviços que fazem fallback de modelos: nos testes entra um backend
// roteirizado no lugar da rede.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::chat::ChatMessage;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

const REFERER: &str = "https://vcrm.app";

// ============================================================================
// CONTRATO
// ============================================================================

/// Parâmetros de uma chamada. O chat conversacional e o builder de UI usam
/// perfis diferentes (o builder quer respostas curtas e pouco criativas).
#[derive(Debug, Clone)]
pub struct CompletionProfile {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub title: &'static str,
}

impl CompletionProfile {
    pub fn chat() -> Self {
        CompletionProfile {
            max_tokens: 1500,
            temperature: 0.7,
            top_p: Some(0.9),
            title: "vCRM Assistant",
        }
    }

    pub fn builder() -> Self {
        CompletionProfile {
            max_tokens: 500,
            temperature: 0.3,
            top_p: None,
            title: "vCRM AI Builder",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub model: String,
}

/// Como uma chamada falhou, do ponto de vista do fallback: `Retryable`
/// sempre passa ao próximo modelo da lista; `Fatal` também passa, mas no
/// último modelo é a mensagem dele que chega ao usuário.
#[derive(Debug, Clone)]
pub enum CompletionError {
    // 429/503/500, resposta vazia ou falha de rede.
    Retryable(String),
    // Qualquer outro status HTTP; carrega a mensagem da API.
    Fatal(String),
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        profile: &CompletionProfile,
    ) -> Result<Completion, CompletionError>;
}

// ============================================================================
// IMPLEMENTAÇÃO HTTP
// ============================================================================

pub struct OpenRouterBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterBackend {
    pub fn new(api_key: String) -> Self {
        OpenRouterBackend {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENROUTER_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenRouterBackend {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        profile: &CompletionProfile,
    ) -> Result<Completion, CompletionError> {
        let mut body = json!({
            "model": model,
            "messages": messages,
            "max_tokens": profile.max_tokens,
            "temperature": profile.temperature,
        });
        if let Some(top_p) = profile.top_p {
            body["top_p"] = json!(top_p);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", REFERER)
            .header("X-Title", profile.title)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Retryable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body: Value = response.json().await.unwrap_or_else(|_| json!({}));
            return Err(classify_http_failure(status.as_u16(), &error_body));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Retryable(e.to_string()))?;

        match data
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .filter(|content| !content.is_empty())
        {
            Some(content) => Ok(Completion {
                content: content.to_string(),
                model: model.to_string(),
            }),
            None => Err(CompletionError::Retryable(format!(
                "risposta vuota da {model}"
            ))),
        }
    }
}

// Sobrecarga e indisponibilidade passam ao próximo modelo; o resto carrega
// a mensagem que a API mandou (chave errada, payload inválido...).
fn classify_http_failure(status: u16, error_body: &Value) -> CompletionError {
    match status {
        429 | 500 | 503 => CompletionError::Retryable(format!("HTTP {status}")),
        code => {
            let message = error_body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("API error: {code}"));
            CompletionError::Fatal(message)
        }
    }
}

// ============================================================================
// BACKEND ROTEIRIZADO (só para testes)
// ============================================================================


// ============================================================================
// TESTES
// ============================================================================
