// src/models/target.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::datasource::SqlRow;

// Os três eixos acompanhados pelo planejamento mensal: quanto foi
// ordinato (pipeline fechado), fatturato (emesso) e incassato (pago).
pub const TARGET_TYPES: &[&str] = &["ordinato", "fatturato", "incassato"];

pub const TARGET_TYPE_DEFAULT: &str = "fatturato";

pub fn is_valid_target_type(target_type: &str) -> bool {
    TARGET_TYPES.contains(&target_type)
}

// Meta mensal: única por (year, month, targetType, userId).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTarget {
    pub id: i64,
    pub year: i32,
    // 0 = gennaio ... 11 = dicembre, como no cliente.
    pub month: i32,
    pub target: f64,
    pub target_type: String,
    pub user_id: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl MonthlyTarget {
    pub fn from_row(row: &SqlRow) -> Result<Self, sqlx::Error> {
        Ok(MonthlyTarget {
            id: row.i64("id")?,
            year: row.i64("year")? as i32,
            month: row.i64("month")? as i32,
            target: row.f64_lossy("target"),
            target_type: row
                .opt_text("targetType")
                .unwrap_or_else(|| TARGET_TYPE_DEFAULT.to_string()),
            user_id: row.opt_i64("userId"),
            created_at: row.opt_text("createdAt"),
            updated_at: row.opt_text("updatedAt"),
        })
    }
}

// Total anual agrupado por tipo, para a barra de progresso do ano.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnnualTargetTotals {
    pub year: i32,
    pub totals: TargetTotals,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct TargetTotals {
    pub ordinato: f64,
    pub fatturato: f64,
    pub incassato: f64,
}

// --- PAYLOADS DE ESCRITA ---

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetPayload {
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub target: Option<f64>,
    pub target_type: Option<String>,
}

/// Corpo do POST /api/targets/batch: todas as metas de um ano numa
/// chamada só, cada item com o próprio mês.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetBatchPayload {
    pub year: Option<i32>,
    #[serde(default)]
    pub targets: Vec<TargetBatchItem>,
    pub target_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetBatchItem {
    pub month: i32,
    pub target: f64,
}
