// src/models/chat.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::crm::{Contact, Opportunity, Task};
use crate::models::invoice::Invoice;

// Uma mensagem no formato chat-completions (role: system/user/assistant).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { role: "user".to_string(), content: content.into() }
    }
}

// Snapshot do CRM do usuário, carregado uma vez por chamada e passado ao
// construtor de contexto. O builder nunca toca o banco.
#[derive(Debug, Clone, Default)]
pub struct CrmSnapshot {
    pub contacts: Vec<Contact>,
    pub opportunities: Vec<Opportunity>,
    pub tasks: Vec<Task>,
    pub invoices: Vec<Invoice>,
}

// Resultado de uma conversa: o esgotamento dos modelos vira success=false
// com uma mensagem de desculpas, nunca um erro HTTP.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub success: bool,
    pub message: String,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub action: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub message: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuickQueryPayload {
    pub query_type: Option<String>,
}
