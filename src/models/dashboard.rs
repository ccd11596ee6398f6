// src/models/dashboard.rs
//
// Shapes trasversais do dashboard: rollup global, busca, notas e
// notificações. As notificações misturam linhas persistidas com entradas
// sintetizadas a partir de tarefas vencidas, por isso o id pode ser um
// inteiro ou um marcador "task-N".

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::db::datasource::SqlRow;
use crate::models::crm::{Contact, Opportunity, Task};

// Rollup global: contagens e valores agregados de todo o CRM visível.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub contacts: i64,
    pub opportunities: i64,
    pub tasks: i64,
    pub pipeline_value: f64,
    pub won_deals: i64,
    pub won_value: f64,
    pub open_tasks: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchResults {
    pub contacts: Vec<Contact>,
    pub opportunities: Vec<Opportunity>,
    pub tasks: Vec<Task>,
}

impl SearchResults {
    pub fn empty() -> Self {
        SearchResults { contacts: Vec::new(), opportunities: Vec::new(), tasks: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub content: String,
    pub created_by: Option<i64>,
    pub created_at: Option<String>,
}

impl Note {
    pub fn from_row(row: &SqlRow) -> Result<Self, sqlx::Error> {
        Ok(Note {
            id: row.i64("id")?,
            entity_type: row.text("entityType")?,
            entity_id: row.i64("entityId")?,
            content: row.text("content")?,
            created_by: row.opt_i64("createdBy"),
            created_at: row.opt_text("createdAt"),
        })
    }
}

// Id de notificação: inteiro para linhas persistidas, "task-N" para as
// entradas derivadas de tarefas. Serializa sem tag, como o cliente espera.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum NotificationId {
    Stored(i64),
    Derived(String),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub is_read: i64,
    pub created_at: Option<String>,
}

impl NotificationView {
    pub fn from_row(row: &SqlRow) -> Result<Self, sqlx::Error> {
        Ok(NotificationView {
            id: NotificationId::Stored(row.i64("id")?),
            kind: row.text("type")?,
            title: row.text("title")?,
            message: row.opt_text("message"),
            entity_type: row.opt_text("entityType"),
            entity_id: row.opt_i64("entityId"),
            is_read: row.opt_i64("isRead").unwrap_or(0),
            created_at: row.opt_text("createdAt"),
        })
    }

    // Entrada transitória construída a partir de uma tarefa com prazo
    // vencido ou vencendo hoje. Nunca vai para o banco.
    pub fn from_due_task(task: &Task, today: &str) -> Self {
        let overdue = task.due_date.as_deref().map(|d| d < today).unwrap_or(false);
        NotificationView {
            id: NotificationId::Derived(format!("task-{}", task.id)),
            kind: if overdue { "overdue" } else { "due_today" }.to_string(),
            title: if overdue { "Attività scaduta" } else { "Attività in scadenza oggi" }
                .to_string(),
            message: Some(task.title.clone()),
            entity_type: Some("task".to_string()),
            entity_id: Some(task.id),
            is_read: 0,
            created_at: task.due_date.clone(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotePayload {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub content: Option<String>,
}

// Corpo de resposta do /api/export. Em CSV cada entidade vira uma string
// única com header + linhas; em JSON vai o snapshot bruto.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_date: Option<String>,
    #[schema(value_type = Object)]
    pub data: Value,
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(id: i64, title: &str, due: &str) -> Task {
        Task {
            id,
            title: title.to_string(),
            task_type: "Chiamata".to_string(),
            priority: "Media".to_string(),
            due_date: Some(due.to_string()),
            status: "Da fare".to_string(),
            contact_id: None,
            opportunity_id: None,
            user_id: None,
            description: None,
            completed_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn notificacao_derivada_distingue_vencida_de_vencendo() {
        let overdue =
            NotificationView::from_due_task(&task(7, "Chiamare Mario", "2025-03-01"), "2025-03-10");
        assert_eq!(overdue.kind, "overdue");
        assert_eq!(overdue.title, "Attività scaduta");

        let due_today =
            NotificationView::from_due_task(&task(8, "Inviare offerta", "2025-03-10"), "2025-03-10");
        assert_eq!(due_today.kind, "due_today");
        assert_eq!(due_today.title, "Attività in scadenza oggi");
    }

    #[test]
    fn id_derivado_serializa_como_string_e_persistido_como_numero() {
        let derived = NotificationView::from_due_task(&task(42, "Follow up", "2025-01-01"), "2025-01-02");
        let body = serde_json::to_value(&derived).expect("serializa");
        assert_eq!(body["id"], json!("task-42"));
        assert_eq!(body["type"], json!("overdue"));
        assert_eq!(body["entityId"], json!(42));

        let stored = NotificationView {
            id: NotificationId::Stored(5),
            kind: "info".to_string(),
            title: "Benvenuto".to_string(),
            message: None,
            entity_type: None,
            entity_id: None,
            is_read: 0,
            created_at: None,
        };
        let body = serde_json::to_value(&stored).expect("serializa");
        assert_eq!(body["id"], json!(5));
    }
}
