// src/db/target_repo.rs

use crate::common::error::AppError;
use crate::db::datasource::{is_unique_violation, DataSource, SqlParam};
use crate::models::target::{
    is_valid_target_type, AnnualTargetTotals, MonthlyTarget, TargetBatchPayload, TargetPayload,
    TargetTotals, TARGET_TYPE_DEFAULT,
};
use crate::params;

#[derive(Clone)]
pub struct TargetRepository {
    db: DataSource,
}

impl TargetRepository {
    pub fn new(db: DataSource) -> Self {
        Self { db }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    /// Metas de um ano, opcionalmente só de um tipo, em ordem de mês.
    pub async fn list_targets(
        &self,
        owner: i64,
        year: i32,
        target_type: Option<&str>,
    ) -> Result<Vec<MonthlyTarget>, AppError> {
        let mut sql = String::from(
            r#"SELECT * FROM monthly_targets
               WHERE year = ? AND ("userId" = ? OR "userId" IS NULL)"#,
        );
        let mut params: Vec<SqlParam> = params![year, owner];

        if let Some(target_type) = target_type {
            sql.push_str(r#" AND "targetType" = ?"#);
            params.push(SqlParam::from(target_type));
        }

        sql.push_str(r#" ORDER BY "targetType" ASC, month ASC"#);

        let rows = self.db.fetch_all(&sql, &params).await?;
        let targets = rows
            .iter()
            .map(MonthlyTarget::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(targets)
    }

    /// Soma anual por tipo (ordinato/fatturato/incassato).
    pub async fn annual_totals(
        &self,
        owner: i64,
        year: i32,
    ) -> Result<AnnualTargetTotals, AppError> {
        let rows = self
            .db
            .fetch_all(
                r#"SELECT "targetType", SUM(target) AS total
                   FROM monthly_targets
                   WHERE year = ? AND ("userId" = ? OR "userId" IS NULL)
                   GROUP BY "targetType""#,
                &params![year, owner],
            )
            .await?;

        let mut totals = TargetTotals::default();
        for row in &rows {
            let total = row.f64_lossy("total");
            match row.opt_text("targetType").as_deref() {
                Some("ordinato") => totals.ordinato = total,
                Some("incassato") => totals.incassato = total,
                _ => totals.fatturato = total,
            }
        }

        Ok(AnnualTargetTotals { year, totals })
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    /// Upsert de uma meta pela chave (year, month, targetType, userId).
    pub async fn upsert_target(
        &self,
        payload: &TargetPayload,
        owner: i64,
    ) -> Result<MonthlyTarget, AppError> {
        let (year, month, target) = match (payload.year, payload.month, payload.target) {
            (Some(year), Some(month), Some(target)) => (year, month, target),
            _ => return Err(AppError::invalid("Year, month and target are required")),
        };
        let target_type = validated_type(payload.target_type.as_deref())?;
        validate_month(month)?;

        self.db
            .execute(
                r#"INSERT INTO monthly_targets (year, month, target, "targetType", "userId")
                   VALUES (?, ?, ?, ?, ?)
                   ON CONFLICT (year, month, "targetType", "userId")
                   DO UPDATE SET target = excluded.target,
                                 "updatedAt" = CURRENT_TIMESTAMP"#,
                &params![year, month, target, target_type, owner],
            )
            .await?;

        let row = self
            .db
            .fetch_optional(
                r#"SELECT * FROM monthly_targets
                   WHERE year = ? AND month = ? AND "targetType" = ? AND "userId" = ?"#,
                &params![year, month, target_type, owner],
            )
            .await?
            .ok_or(AppError::NotFound("Target"))?;

        Ok(MonthlyTarget::from_row(&row)?)
    }

    /// Substitui de uma vez todas as metas de um ano para um tipo: apaga as
    /// existentes e insere as recebidas.
    pub async fn replace_year(
        &self,
        payload: &TargetBatchPayload,
        owner: i64,
    ) -> Result<Vec<MonthlyTarget>, AppError> {
        let year = payload
            .year
            .ok_or_else(|| AppError::invalid("Year and targets are required"))?;
        let target_type = validated_type(payload.target_type.as_deref())?;
        for item in &payload.targets {
            validate_month(item.month)?;
        }

        self.db
            .execute(
                r#"DELETE FROM monthly_targets
                   WHERE year = ? AND "targetType" = ?
                     AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![year, target_type, owner],
            )
            .await?;

        for item in &payload.targets {
            self.db
                .execute(
                    r#"INSERT INTO monthly_targets (year, month, target, "targetType", "userId")
                       VALUES (?, ?, ?, ?, ?)"#,
                    &params![year, item.month, item.target, target_type, owner],
                )
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::invalid("Duplicate month in targets")
                    } else {
                        AppError::from(e)
                    }
                })?;
        }

        self.list_targets(owner, year, Some(target_type)).await
    }

    /// Apaga todas as metas de um ano (todos os tipos).
    pub async fn delete_year(&self, owner: i64, year: i32) -> Result<u64, AppError> {
        let outcome = self
            .db
            .execute(
                r#"DELETE FROM monthly_targets
                   WHERE year = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![year, owner],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Target"));
        }
        Ok(outcome.rows_affected)
    }
}

fn validated_type(target_type: Option<&str>) -> Result<&str, AppError> {
    let target_type = target_type.unwrap_or(TARGET_TYPE_DEFAULT);
    if !is_valid_target_type(target_type) {
        return Err(AppError::invalid("Invalid target type"));
    }
    Ok(target_type)
}

fn validate_month(month: i32) -> Result<(), AppError> {
    // 0 = gennaio ... 11 = dicembre
    if !(0..=11).contains(&month) {
        return Err(AppError::invalid("Month must be between 0 and 11"));
    }
    Ok(())
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::ensure_schema;

    async fn repo_de_teste() -> TargetRepository {
        let db = DataSource::connect("sqlite::memory:").await.unwrap();
        ensure_schema(&db).await.unwrap();
        crate::db::seed_test_users(&db).await;
        TargetRepository::new(db)
    }

    fn meta(year: i32, month: i32, target: f64) -> TargetPayload {
        TargetPayload {
            year: Some(year),
            month: Some(month),
            target: Some(target),
            target_type: None,
        }
    }

    #[tokio::test]
    async fn upsert_cria_e_depois_atualiza() {
        let repo = repo_de_teste().await;

        let criada = repo.upsert_target(&meta(2026, 0, 5000.0), 1).await.unwrap();
        assert_eq!(criada.target, 5000.0);
        assert_eq!(criada.target_type, "fatturato");

        let atualizada = repo.upsert_target(&meta(2026, 0, 7500.0), 1).await.unwrap();
        assert_eq!(atualizada.id, criada.id);
        assert_eq!(atualizada.target, 7500.0);

        let lista = repo.list_targets(1, 2026, None).await.unwrap();
        assert_eq!(lista.len(), 1);
    }

    #[tokio::test]
    async fn mes_fora_do_intervalo_falha() {
        let repo = repo_de_teste().await;

        let erro = repo.upsert_target(&meta(2026, 12, 1000.0), 1).await.unwrap_err();
        assert!(matches!(erro, AppError::Invalid(_)));
    }

    #[tokio::test]
    async fn batch_substitui_o_ano_inteiro() {
        let repo = repo_de_teste().await;

        repo.upsert_target(&meta(2026, 0, 1000.0), 1).await.unwrap();
        repo.upsert_target(&meta(2026, 1, 2000.0), 1).await.unwrap();

        let novas = repo
            .replace_year(
                &TargetBatchPayload {
                    year: Some(2026),
                    targets: vec![
                        crate::models::target::TargetBatchItem { month: 5, target: 9000.0 },
                    ],
                    target_type: None,
                },
                1,
            )
            .await
            .unwrap();

        // As metas antigas de janeiro/fevereiro sumiram.
        assert_eq!(novas.len(), 1);
        assert_eq!(novas[0].month, 5);
        assert_eq!(novas[0].target, 9000.0);
    }

    #[tokio::test]
    async fn tipos_diferentes_convivem_no_mesmo_mes() {
        let repo = repo_de_teste().await;

        repo.upsert_target(&meta(2026, 3, 4000.0), 1).await.unwrap();
        repo.upsert_target(
            &TargetPayload {
                target_type: Some("incassato".to_string()),
                ..meta(2026, 3, 3500.0)
            },
            1,
        )
        .await
        .unwrap();

        let totais = repo.annual_totals(1, 2026).await.unwrap();
        assert_eq!(totais.totals.fatturato, 4000.0);
        assert_eq!(totais.totals.incassato, 3500.0);
        assert_eq!(totais.totals.ordinato, 0.0);
    }

    #[tokio::test]
    async fn apagar_ano_vazio_da_404() {
        let repo = repo_de_teste().await;

        let erro = repo.delete_year(1, 2031).await.unwrap_err();
        assert!(matches!(erro, AppError::NotFound("Target")));
    }
}
