// src/models/invoice.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::datasource::SqlRow;

// --- VOCABULÁRIO DE STATUS ---

// Os três status canônicos. "da_pagare" é um legado que ainda chega de
// bancos antigos e de clientes desatualizados: é aceito e tratado como
// "emessa" em todo lugar. "Overdue"/"pending" nunca são gravados; são
// baldes derivados de emessa + dueDate.
pub const STATUS_TO_ISSUE: &str = "da_emettere";
pub const STATUS_ISSUED: &str = "emessa";
pub const STATUS_PAID: &str = "pagata";
pub const STATUS_LEGACY_UNPAID: &str = "da_pagare";

pub const INVOICE_STATUSES: &[&str] = &[STATUS_TO_ISSUE, STATUS_ISSUED, STATUS_PAID];

// Normaliza o vocabulário antes de gravar.
pub fn canonical_status(status: &str) -> &str {
    if status == STATUS_LEGACY_UNPAID {
        STATUS_ISSUED
    } else {
        status
    }
}

// --- FATURA ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub opportunity_id: Option<i64>,
    pub contact_id: Option<i64>,
    #[serde(rename = "type")]
    pub invoice_type: String,
    pub amount: f64,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    pub paid_date: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub user_id: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,

    // Campos do JOIN com oportunidade/contato, só na listagem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity_company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
}

impl Invoice {
    pub fn from_row(row: &SqlRow) -> Result<Self, sqlx::Error> {
        Ok(Invoice {
            id: row.i64("id")?,
            invoice_number: row.text("invoiceNumber")?,
            opportunity_id: row.opt_i64("opportunityId"),
            contact_id: row.opt_i64("contactId"),
            invoice_type: row.opt_text("type").unwrap_or_else(|| STATUS_ISSUED.to_string()),
            amount: row.f64_lossy("amount"),
            issue_date: row.opt_text("issueDate"),
            due_date: row.opt_text("dueDate"),
            paid_date: row.opt_text("paidDate"),
            status: row.opt_text("status").unwrap_or_else(|| STATUS_TO_ISSUE.to_string()),
            notes: row.opt_text("notes"),
            user_id: row.opt_i64("userId"),
            created_at: row.opt_text("createdAt"),
            updated_at: row.opt_text("updatedAt"),
            opportunity_title: row.opt_text("opportunityTitle"),
            opportunity_company: row.opt_text("opportunityCompany"),
            contact_name: row.opt_text("contactName"),
        })
    }
}

// --- AGREGADOS ---

// O resultado de GET /api/invoices/stats. Os baldes são mutuamente
// exclusivos; total/totalAmount somam TODAS as faturas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStats {
    pub total: i64,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub paid_count: i64,
    pub overdue_amount: f64,
    pub overdue_count: i64,
    pub pending_amount: f64,
    pub issued_count: i64,
    pub to_issue_count: i64,
}

// Resumo do regime forfettario para um ano (limite de € 85.000).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForfettarioSummary {
    pub year: i32,
    pub limit: f64,
    pub used_amount: f64,
    pub remaining: f64,
    pub percentage_used: f64,
    // Um item por mês de 0 até o mês corrente, inclusive.
    pub monthly: Vec<MonthlyAmount>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAmount {
    // 0 = gennaio ... 11 = dicembre
    pub month: u32,
    pub amount: f64,
}

// --- PAYLOADS DE ESCRITA ---

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayload {
    pub invoice_number: Option<String>,
    pub opportunity_id: Option<i64>,
    pub contact_id: Option<i64>,
    #[serde(rename = "type")]
    pub invoice_type: Option<String>,
    pub amount: Option<f64>,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    pub paid_date: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Corpo do PATCH /api/invoices/{id}/status.
///
/// `paid_date` é gravada sempre (ausente => NULL, o caminho normal quando
/// a fatura volta de "pagata"). `issue_date` usa Option duplo: só toca a
/// coluna se o campo veio no JSON.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStatusPayload {
    pub status: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub issue_date: Option<Option<String>>,
    pub paid_date: Option<String>,
}

/// Filtros de query string do GET /api/invoices.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct InvoiceFilters {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub invoice_type: Option<String>,
    #[serde(rename = "opportunityId")]
    pub opportunity_id: Option<i64>,
}

// Teto anual de ricavi do regime forfettario.
pub const FORFETTARIO_LIMIT: f64 = 85000.0;
