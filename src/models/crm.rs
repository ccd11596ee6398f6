// src/models/crm.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::datasource::SqlRow;

// --- VOCABULÁRIO DO PIPELINE ---

pub const STAGE_WON: &str = "Chiuso Vinto";
pub const STAGE_LOST: &str = "Chiuso Perso";

// (estágio, probabilidade padrão) — a probabilidade acompanha o arrasto
// no kanban quando o cliente não manda uma explícita.
pub const STAGE_PROBABILITIES: &[(&str, i64)] = &[
    ("Lead", 10),
    ("In contatto", 30),
    ("Follow Up da fare", 50),
    ("Revisionare offerta", 75),
    (STAGE_WON, 100),
    (STAGE_LOST, 0),
];

pub const CONTACT_STATUSES: &[&str] = &["Lead", "Prospect", "Cliente"];

pub const TASK_STATUS_TODO: &str = "Da fare";
pub const TASK_STATUS_DONE: &str = "Completata";

pub const PROJECT_STATUSES: &[&str] = &[
    "in_lavorazione",
    "in_revisione",
    "consegnato",
    "chiuso",
    "archiviato",
];

pub const PROJECT_STATUS_INITIAL: &str = "in_lavorazione";

pub fn stage_probability(stage: &str) -> i64 {
    STAGE_PROBABILITIES
        .iter()
        .find(|(name, _)| *name == stage)
        .map(|(_, probability)| *probability)
        .unwrap_or(30)
}

pub fn is_won_stage(stage: &str) -> bool {
    stage == STAGE_WON
}

// Fechado = vinto ou perso; tudo o resto é pipeline aberto.
pub fn is_closed_stage(stage: &str) -> bool {
    stage == STAGE_WON || stage == STAGE_LOST
}

pub fn is_valid_project_status(status: &str) -> bool {
    PROJECT_STATUSES.contains(&status)
}

// Oportunidade que já nasce vinta entra direto no kanban de projetos.
pub fn initial_project_status(stage: &str) -> Option<&'static str> {
    is_won_stage(stage).then_some(PROJECT_STATUS_INITIAL)
}

// --- CONTATO ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub value: f64,
    pub status: String,
    pub avatar: Option<String>,
    pub last_contact: Option<String>,
    pub notes: Option<String>,
    pub user_id: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Contact {
    pub fn from_row(row: &SqlRow) -> Result<Self, sqlx::Error> {
        Ok(Contact {
            id: row.i64("id")?,
            name: row.text("name")?,
            company: row.opt_text("company"),
            email: row.opt_text("email"),
            phone: row.opt_text("phone"),
            value: row.f64_lossy("value"),
            status: row.opt_text("status").unwrap_or_else(|| "Lead".to_string()),
            avatar: row.opt_text("avatar"),
            last_contact: row.opt_text("lastContact"),
            notes: row.opt_text("notes"),
            user_id: row.opt_i64("userId"),
            created_at: row.opt_text("createdAt"),
            updated_at: row.opt_text("updatedAt"),
        })
    }
}

// --- OPORTUNIDADE ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: i64,
    pub title: String,
    pub company: Option<String>,
    pub value: f64,
    pub stage: String,
    pub probability: i64,
    pub open_date: Option<String>,
    pub close_date: Option<String>,
    pub owner: Option<String>,
    pub contact_id: Option<i64>,
    pub user_id: Option<i64>,

    // Como a oportunidade fechou pela primeira vez (Chiuso Vinto/Perso).
    // Sobrevive a reaberturas: o dashboard conta o ordinato por aqui.
    pub original_stage: Option<String>,

    // Só existe enquanto stage == "Chiuso Vinto". <---
    pub project_status: Option<String>,
    pub expected_invoice_date: Option<String>,
    pub expected_payment_date: Option<String>,

    pub notes: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Opportunity {
    pub fn from_row(row: &SqlRow) -> Result<Self, sqlx::Error> {
        Ok(Opportunity {
            id: row.i64("id")?,
            title: row.text("title")?,
            company: row.opt_text("company"),
            value: row.f64_lossy("value"),
            stage: row.opt_text("stage").unwrap_or_else(|| "Lead".to_string()),
            probability: row.opt_i64("probability").unwrap_or(0),
            open_date: row.opt_text("openDate"),
            close_date: row.opt_text("closeDate"),
            owner: row.opt_text("owner"),
            contact_id: row.opt_i64("contactId"),
            user_id: row.opt_i64("userId"),
            original_stage: row.opt_text("originalStage"),
            project_status: row.opt_text("projectStatus"),
            expected_invoice_date: row.opt_text("expectedInvoiceDate"),
            expected_payment_date: row.opt_text("expectedPaymentDate"),
            notes: row.opt_text("notes"),
            created_at: row.opt_text("createdAt"),
            updated_at: row.opt_text("updatedAt"),
        })
    }

    pub fn is_won(&self) -> bool {
        is_won_stage(&self.stage)
    }

    pub fn is_open(&self) -> bool {
        !is_closed_stage(&self.stage)
    }
}

// --- ATIVIDADE (TASK) ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub priority: String,
    pub due_date: Option<String>,
    pub status: String,
    pub contact_id: Option<i64>,
    pub opportunity_id: Option<i64>,
    pub user_id: Option<i64>,
    pub description: Option<String>,

    // Carimbada exatamente quando status vira "Completata"; limpa em
    // qualquer outro status.
    pub completed_at: Option<String>,

    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Task {
    pub fn from_row(row: &SqlRow) -> Result<Self, sqlx::Error> {
        Ok(Task {
            id: row.i64("id")?,
            title: row.text("title")?,
            task_type: row.opt_text("type").unwrap_or_else(|| "Chiamata".to_string()),
            priority: row.opt_text("priority").unwrap_or_else(|| "Media".to_string()),
            due_date: row.opt_text("dueDate"),
            status: row.opt_text("status").unwrap_or_else(|| TASK_STATUS_TODO.to_string()),
            contact_id: row.opt_i64("contactId"),
            opportunity_id: row.opt_i64("opportunityId"),
            user_id: row.opt_i64("userId"),
            description: row.opt_text("description"),
            completed_at: row.opt_text("completedAt"),
            created_at: row.opt_text("createdAt"),
            updated_at: row.opt_text("updatedAt"),
        })
    }

    pub fn is_completed(&self) -> bool {
        self.status == TASK_STATUS_DONE
    }
}

// --- PAYLOADS DE ESCRITA ---
//
// Corpos JSON aceitos pelos endpoints de criação/edição. Campos ausentes
// viram NULL na linha (o cliente sempre manda o objeto completo no PUT).

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactPayload {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub value: Option<f64>,
    pub status: Option<String>,
    pub avatar: Option<String>,
    pub last_contact: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityPayload {
    pub title: Option<String>,
    pub company: Option<String>,
    pub value: Option<f64>,
    pub stage: Option<String>,
    pub probability: Option<i64>,
    pub open_date: Option<String>,
    pub close_date: Option<String>,
    pub owner: Option<String>,
    pub contact_id: Option<i64>,
    pub original_stage: Option<String>,
    pub notes: Option<String>,
}

/// Corpo do PATCH de estágio: além do destino, o cliente pode mandar as
/// datas previstas de fatturazione/incasso quando fecha como vinto.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StagePatchPayload {
    pub stage: Option<String>,
    pub probability: Option<i64>,
    pub expected_invoice_date: Option<String>,
    pub expected_payment_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatusPayload {
    pub project_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<String>,
    pub contact_id: Option<i64>,
    pub opportunity_id: Option<i64>,
    pub description: Option<String>,
}

/// Valores finais calculados por uma transição de estágio. Quem decide é
/// `services::transitions`; a repo só aplica as seis colunas de uma vez.
#[derive(Debug, Clone, PartialEq)]
pub struct StagePlan {
    pub stage: String,
    pub probability: i64,
    pub original_stage: Option<String>,
    pub project_status: Option<String>,
    pub expected_invoice_date: Option<String>,
    pub expected_payment_date: Option<String>,
}
