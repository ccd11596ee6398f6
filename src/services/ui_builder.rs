// src/services/ui_builder.rs
//
// Builder de UI por linguagem natural: pede a um modelo um JSON só com as
// propriedades a modificar, extrai o objeto da resposta e devolve as
// mudanças já descritas em italiano. Quem mescla e persiste é o handler.

use std::sync::Arc;

use serde_json::Value;

use crate::models::chat::ChatMessage;
use crate::models::ui_config::describe_changes;
use crate::services::openrouter::{CompletionBackend, CompletionProfile};

// Modelos bons em JSON puro, também em fallback sequencial.
pub const AI_MODELS: [&str; 4] = [
    "google/gemini-2.0-flash-exp:free",
    "meta-llama/llama-3.3-70b-instruct:free",
    "deepseek/deepseek-chat-v3-0324:free",
    "qwen/qwq-32b:free",
];

const UI_BUILDER_PROMPT: &str = r##"Sei un AI specializzato nella generazione di configurazioni UI per VAIB, il business assistant AI per freelance e partite IVA forfettarie.

L'utente descriverà in linguaggio naturale cosa vuole cambiare nell'interfaccia, e tu devi generare SOLO un oggetto JSON valido con le modifiche richieste.

SCHEMA CONFIGURAZIONE UI COMPLETO:
{
  "theme": {
    "mode": "light" | "dark",
    "primaryColor": "#hex6",
    "accentColor": "#hex6",
    "borderRadius": "none" | "small" | "medium" | "large",
    "density": "compact" | "normal" | "comfortable",
    "fontSize": "small" | "medium" | "large",
    "fontFamily": "system" | "inter" | "roboto"
  },
  "navigation": {
    "position": "sidebar" | "top",
    "collapsed": boolean,
    "showLabels": boolean,
    "showIcons": boolean,
    "visibleItems": ["dashboard", "pipeline", "contacts", "opportunities", "projects", "tasks", "invoices", "calendar", "settings"]
  },
  "homePage": "dashboard" | "pipeline" | "contacts" | "tasks" | "projects",
  "dashboard": {
    "layout": "default" | "compact" | "minimal",
    "visibleCards": ["kpi", "forfettario", "activities", "pipeline-mini"],
    "cardOrder": [...],
    "kpiCards": ["revenue", "pipeline", "contacts", "tasks"]
  },
  "tables": {
    "contacts": { "visibleColumns": [...], "sortBy": "name" | "value" | "company", "sortOrder": "asc" | "desc" },
    "opportunities": { "visibleColumns": [...], "sortBy": "value" | "closeDate" | "stage" },
    "tasks": { "visibleColumns": [...], "sortBy": "dueDate" | "priority" },
    "invoices": { "visibleColumns": [...], "sortBy": "dueDate" | "amount" }
  },
  "quickActions": { "enabled": boolean, "items": ["add-contact", "add-task", "add-opportunity"] },
  "globalSettings": {
    "dateFormat": "DD/MM/YYYY" | "MM/DD/YYYY" | "YYYY-MM-DD",
    "currency": "EUR" | "USD" | "GBP",
    "language": "it" | "en"
  }
}

COLORI DISPONIBILI:
- Blu: #3b82f6 - Viola: #8b5cf6 - Verde: #10b981 - Rosso: #ef4444
- Arancione: #f97316 - Rosa: #ec4899 - Indaco: #6366f1 - Teal: #14b8a6
- Giallo: #eab308 - Grigio: #6b7280 - Navy: #1e3a5f - Nero: #0f172a

ESEMPI DI RICHIESTE:
- "tema scuro" → {"theme":{"mode":"dark"}}
- "usa colori verdi" → {"theme":{"primaryColor":"#10b981","accentColor":"#34d399"}}
- "interfaccia più compatta" → {"theme":{"density":"compact"}}
- "nascondi fatture dal menu" → {"navigation":{"visibleItems":["dashboard","pipeline","contacts","opportunities","projects","tasks","calendar","settings"]}}
- "dashboard minimale" → {"dashboard":{"layout":"minimal","visibleCards":["kpi","forfettario"]}}
- "bordi più arrotondati" → {"theme":{"borderRadius":"large"}}
- "testo più grande" → {"theme":{"fontSize":"large"}}

REGOLE:
1. Rispondi SOLO con JSON valido, niente altro
2. Includi SOLO le proprietà da modificare
3. Per nascondere voci menu, rimuovile dall'array visibleItems
4. Per nascondere card dashboard, rimuovile da visibleCards

CONFIGURAZIONE ATTUALE:
"##;

/// Mudanças que o modelo propôs, prontas para mesclar na configuração.
#[derive(Debug, Clone)]
pub struct GeneratedUiChanges {
    pub changes: Value,
    pub description: String,
    pub model: String,
}

#[derive(Clone)]
pub struct UiBuilderService {
    backend: Arc<dyn CompletionBackend>,
    api_key_configured: bool,
}

impl UiBuilderService {
    pub fn new(backend: Arc<dyn CompletionBackend>, api_key_configured: bool) -> Self {
        Self {
            backend,
            api_key_configured,
        }
    }

    /// Traduz o pedido em linguagem natural num objeto de mudanças. Aqui
    /// QUALQUER falha avança para o próximo modelo: status HTTP, resposta
    /// vazia, resposta sem objeto JSON ou JSON inválido.
    pub async fn generate(
        &self,
        prompt: &str,
        current_config: &Value,
    ) -> Result<GeneratedUiChanges, &'static str> {
        if !self.api_key_configured {
            tracing::error!("[AI Builder] OPENROUTER_API_KEY not set");
            return Err("API key non configurata");
        }

        // só o tema vai no prompt; o resto do documento não ajuda o modelo
        let theme = current_config.get("theme").cloned().unwrap_or(Value::Null);
        let theme_json =
            serde_json::to_string_pretty(&theme).unwrap_or_else(|_| "null".to_string());

        let messages = [
            ChatMessage::system(format!("{UI_BUILDER_PROMPT}{theme_json}")),
            ChatMessage::user(format!(
                "Modifica la UI secondo questa richiesta: \"{prompt}\"\n\nRispondi SOLO con il JSON delle modifiche."
            )),
        ];

        let profile = CompletionProfile::builder();
        for model in AI_MODELS {
            tracing::info!("[AI Builder] Trying model: {model}");

            let completion = match self.backend.complete(model, &messages, &profile).await {
                Ok(completion) => completion,
                Err(error) => {
                    tracing::warn!("[AI Builder] Model {model} failed: {error:?}");
                    continue;
                }
            };

            let Some(candidate) = extract_json(&completion.content) else {
                tracing::warn!("[AI Builder] No JSON found in response from {model}");
                continue;
            };

            match serde_json::from_str::<Value>(candidate) {
                Ok(changes) => {
                    tracing::info!("[AI Builder] Success with {model}");
                    return Ok(GeneratedUiChanges {
                        description: describe_changes(&changes),
                        changes,
                        model: model.to_string(),
                    });
                }
                Err(error) => {
                    tracing::warn!("[AI Builder] Invalid JSON from {model}: {error}");
                }
            }
        }

        Err("Nessun modello AI disponibile")
    }
}

// Do primeiro '{' ao último '}' da resposta; os modelos adoram embrulhar o
// objeto em prosa ou em cercas de código.
fn extract_json(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::openrouter::testing::ScriptedBackend;
    use crate::services::openrouter::CompletionError;
    use serde_json::json;

    #[test]
    fn extrai_do_primeiro_ao_ultimo_colchete() {
        assert_eq!(
            extract_json("Ecco le modifiche:\n```json\n{\"a\": {\"b\": 1}}\n```"),
            Some("{\"a\": {\"b\": 1}}")
        );
        assert_eq!(extract_json("{\"x\":1} e {\"y\":2}"), Some("{\"x\":1} e {\"y\":2}"));
        assert_eq!(extract_json("nessun oggetto qui"), None);
        assert_eq!(extract_json("} al contrario {"), None);
    }

    #[tokio::test]
    async fn gera_mudancas_extraindo_o_json_da_prosa() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(
            "Certo! Ecco: {\"theme\":{\"mode\":\"dark\"}} Fammi sapere.".to_string(),
        )]));
        let service = UiBuilderService::new(backend.clone(), true);

        let saida = service
            .generate("tema scuro", &json!({"theme": {"mode": "light"}}))
            .await
            .unwrap();

        assert_eq!(saida.changes, json!({"theme": {"mode": "dark"}}));
        assert_eq!(saida.description, "Tema scuro");
        assert_eq!(saida.model, AI_MODELS[0]);
    }

    #[tokio::test]
    async fn respostas_sem_objeto_ou_invalidas_avancam() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok("non ho capito la richiesta".to_string()),
            Ok("{\"theme\": senza virgolette}".to_string()),
            Ok("{\"theme\":{\"primaryColor\":\"#10b981\"}}".to_string()),
        ]));
        let service = UiBuilderService::new(backend.clone(), true);

        let saida = service.generate("verde", &json!({})).await.unwrap();

        assert_eq!(saida.model, AI_MODELS[2]);
        assert_eq!(saida.description, "Colore verde");
        assert_eq!(backend.models_called().len(), 3);
    }

    #[tokio::test]
    async fn sem_chave_nao_chama_nenhum_modelo() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let service = UiBuilderService::new(backend.clone(), false);

        let erro = service.generate("tema scuro", &json!({})).await.unwrap_err();

        assert_eq!(erro, "API key non configurata");
        assert!(backend.models_called().is_empty());
    }

    #[tokio::test]
    async fn esgotar_os_quatro_modelos_vira_erro() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(CompletionError::Retryable(
                "HTTP 503".to_string()
            ));
            4
        ]));
        let service = UiBuilderService::new(backend.clone(), true);

        let erro = service.generate("tema scuro", &json!({})).await.unwrap_err();

        assert_eq!(erro, "Nessun modello AI disponibile");
        assert_eq!(backend.models_called(), &AI_MODELS[..]);
    }

    #[tokio::test]
    async fn prompt_do_sistema_leva_so_o_tema_corrente() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(
            "{\"theme\":{\"mode\":\"dark\"}}".to_string()
        )]));
        let service = UiBuilderService::new(backend.clone(), true);

        let config = json!({
            "theme": {"mode": "light", "primaryColor": "#3b82f6"},
            "navigation": {"position": "sidebar"},
        });
        service.generate("tema scuro", &config).await.unwrap();

        let mensagens = backend.last_messages();
        assert!(mensagens[0].content.starts_with("Sei un AI specializzato"));
        assert!(mensagens[0].content.contains("\"mode\": \"light\""));
        assert!(!mensagens[0].content.contains("sidebar"));
        assert_eq!(
            mensagens[1].content,
            "Modifica la UI secondo questa richiesta: \"tema scuro\"\n\nRispondi SOLO con il JSON delle modifiche."
        );
    }
}
