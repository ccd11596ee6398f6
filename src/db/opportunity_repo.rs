// src/db/opportunity_repo.rs

use crate::common::error::AppError;
use crate::db::datasource::DataSource;
use crate::models::crm::{initial_project_status, Opportunity, OpportunityPayload, StagePlan};
use crate::params;

#[derive(Clone)]
pub struct OpportunityRepository {
    db: DataSource,
}

impl OpportunityRepository {
    pub fn new(db: DataSource) -> Self {
        Self { db }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    /// Lista as oportunidades, opcionalmente filtradas pelo ano da data de
    /// fechamento (`closeDate` é TEXT ISO, então o ano são os 4 primeiros
    /// caracteres nos dois dialetos).
    pub async fn list_opportunities(
        &self,
        owner: i64,
        year: Option<i32>,
    ) -> Result<Vec<Opportunity>, AppError> {
        let rows = match year {
            Some(year) => {
                self.db
                    .fetch_all(
                        r#"SELECT * FROM opportunities
                           WHERE ("userId" = ? OR "userId" IS NULL)
                             AND substr("closeDate", 1, 4) = ?
                           ORDER BY "createdAt" DESC"#,
                        &params![owner, year.to_string()],
                    )
                    .await?
            }
            None => {
                self.db
                    .fetch_all(
                        r#"SELECT * FROM opportunities
                           WHERE ("userId" = ? OR "userId" IS NULL)
                           ORDER BY "createdAt" DESC"#,
                        &params![owner],
                    )
                    .await?
            }
        };

        let opportunities = rows
            .iter()
            .map(Opportunity::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(opportunities)
    }

    pub async fn get_opportunity(&self, id: i64, owner: i64) -> Result<Opportunity, AppError> {
        let row = self
            .db
            .fetch_optional(
                r#"SELECT * FROM opportunities
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![id, owner],
            )
            .await?
            .ok_or(AppError::NotFound("Opportunity"))?;

        Ok(Opportunity::from_row(&row)?)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn create_opportunity(
        &self,
        payload: &OpportunityPayload,
        owner: i64,
    ) -> Result<Opportunity, AppError> {
        let title = payload
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::invalid("Title is required"))?;
        let stage = payload.stage.as_deref().unwrap_or("Lead");

        let id = self
            .db
            .insert(
                r#"INSERT INTO opportunities
                       (title, company, value, stage, probability, "openDate",
                        "closeDate", owner, "contactId", "userId",
                        "originalStage", notes, "projectStatus")
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                &params![
                    title,
                    payload.company.as_deref(),
                    payload.value.unwrap_or(0.0),
                    stage,
                    payload.probability.unwrap_or(0),
                    payload.open_date.as_deref(),
                    payload.close_date.as_deref(),
                    payload.owner.as_deref(),
                    payload.contact_id,
                    owner,
                    payload.original_stage.as_deref(),
                    payload.notes.as_deref(),
                    initial_project_status(stage),
                ],
            )
            .await?;

        self.get_opportunity(id, owner).await
    }

    /// Substituição integral dos campos editáveis. `projectStatus` e as
    /// datas previstas ficam fora de propósito: só as transições mexem nelas.
    pub async fn update_opportunity(
        &self,
        id: i64,
        payload: &OpportunityPayload,
        owner: i64,
    ) -> Result<Opportunity, AppError> {
        let title = payload
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::invalid("Title is required"))?;

        let outcome = self
            .db
            .execute(
                r#"UPDATE opportunities
                   SET title = ?, company = ?, value = ?, stage = ?,
                       probability = ?, "openDate" = ?, "closeDate" = ?,
                       owner = ?, "contactId" = ?, "originalStage" = ?,
                       notes = ?, "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![
                    title,
                    payload.company.as_deref(),
                    payload.value.unwrap_or(0.0),
                    payload.stage.as_deref().unwrap_or("Lead"),
                    payload.probability.unwrap_or(0),
                    payload.open_date.as_deref(),
                    payload.close_date.as_deref(),
                    payload.owner.as_deref(),
                    payload.contact_id,
                    payload.original_stage.as_deref(),
                    payload.notes.as_deref(),
                    id,
                    owner,
                ],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Opportunity"));
        }

        self.get_opportunity(id, owner).await
    }

    /// Aplica de uma vez as colunas decididas por uma transição de estágio.
    pub async fn apply_stage_plan(
        &self,
        id: i64,
        plan: &StagePlan,
        owner: i64,
    ) -> Result<Opportunity, AppError> {
        let outcome = self
            .db
            .execute(
                r#"UPDATE opportunities
                   SET stage = ?, probability = ?, "originalStage" = ?,
                       "projectStatus" = ?, "expectedInvoiceDate" = ?,
                       "expectedPaymentDate" = ?,
                       "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![
                    plan.stage.as_str(),
                    plan.probability,
                    plan.original_stage.as_deref(),
                    plan.project_status.as_deref(),
                    plan.expected_invoice_date.as_deref(),
                    plan.expected_payment_date.as_deref(),
                    id,
                    owner,
                ],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Opportunity"));
        }

        self.get_opportunity(id, owner).await
    }

    pub async fn set_project_status(
        &self,
        id: i64,
        project_status: &str,
        owner: i64,
    ) -> Result<Opportunity, AppError> {
        let outcome = self
            .db
            .execute(
                r#"UPDATE opportunities
                   SET "projectStatus" = ?, "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![project_status, id, owner],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Opportunity"));
        }

        self.get_opportunity(id, owner).await
    }

    pub async fn delete_opportunity(&self, id: i64, owner: i64) -> Result<(), AppError> {
        let outcome = self
            .db
            .execute(
                r#"DELETE FROM opportunities
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![id, owner],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Opportunity"));
        }
        Ok(())
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::ensure_schema;
    use crate::models::crm::{PROJECT_STATUS_INITIAL, STAGE_WON};

    async fn repo_de_teste() -> OpportunityRepository {
        let db = DataSource::connect("sqlite::memory:").await.unwrap();
        ensure_schema(&db).await.unwrap();
        crate::db::seed_test_users(&db).await;
        OpportunityRepository::new(db)
    }

    fn payload_minimo(titulo: &str) -> OpportunityPayload {
        OpportunityPayload {
            title: Some(titulo.to_string()),
            ..OpportunityPayload::default()
        }
    }

    #[tokio::test]
    async fn criacao_aplica_padroes() {
        let repo = repo_de_teste().await;

        let opp = repo.create_opportunity(&payload_minimo("Sito web"), 1).await.unwrap();

        assert_eq!(opp.stage, "Lead");
        assert_eq!(opp.value, 0.0);
        assert_eq!(opp.probability, 0);
        assert_eq!(opp.project_status, None);
    }

    #[tokio::test]
    async fn criacao_sem_titulo_falha() {
        let repo = repo_de_teste().await;

        let erro = repo
            .create_opportunity(&OpportunityPayload::default(), 1)
            .await
            .unwrap_err();
        assert!(matches!(erro, AppError::Invalid(_)));
    }

    #[tokio::test]
    async fn criacao_ja_vinta_entra_no_kanban_de_projetos() {
        let repo = repo_de_teste().await;

        let opp = repo
            .create_opportunity(
                &OpportunityPayload {
                    stage: Some(STAGE_WON.to_string()),
                    ..payload_minimo("Manutenzione annuale")
                },
                1,
            )
            .await
            .unwrap();

        assert_eq!(opp.project_status.as_deref(), Some(PROJECT_STATUS_INITIAL));
    }

    #[tokio::test]
    async fn filtro_por_ano_usa_a_data_de_fechamento() {
        let repo = repo_de_teste().await;

        repo.create_opportunity(
            &OpportunityPayload {
                title: Some("Progetto 2025".to_string()),
                close_date: Some("2025-11-30".to_string()),
                ..OpportunityPayload::default()
            },
            1,
        )
        .await
        .unwrap();
        repo.create_opportunity(
            &OpportunityPayload {
                title: Some("Progetto 2026".to_string()),
                close_date: Some("2026-02-15".to_string()),
                ..OpportunityPayload::default()
            },
            1,
        )
        .await
        .unwrap();

        let de_2026 = repo.list_opportunities(1, Some(2026)).await.unwrap();
        assert_eq!(de_2026.len(), 1);
        assert_eq!(de_2026[0].title, "Progetto 2026");

        let todas = repo.list_opportunities(1, None).await.unwrap();
        assert_eq!(todas.len(), 2);
    }

    #[tokio::test]
    async fn plano_de_estagio_e_aplicado_por_inteiro() {
        let repo = repo_de_teste().await;
        let opp = repo.create_opportunity(&payload_minimo("Logo"), 1).await.unwrap();

        let fechada = repo
            .apply_stage_plan(
                opp.id,
                &StagePlan {
                    stage: STAGE_WON.to_string(),
                    probability: 100,
                    original_stage: Some("Lead".to_string()),
                    project_status: Some(PROJECT_STATUS_INITIAL.to_string()),
                    expected_invoice_date: Some("2026-03-31".to_string()),
                    expected_payment_date: None,
                },
                1,
            )
            .await
            .unwrap();

        assert_eq!(fechada.stage, STAGE_WON);
        assert_eq!(fechada.probability, 100);
        assert_eq!(fechada.original_stage.as_deref(), Some("Lead"));
        assert_eq!(fechada.project_status.as_deref(), Some(PROJECT_STATUS_INITIAL));
        assert_eq!(fechada.expected_invoice_date.as_deref(), Some("2026-03-31"));
    }

    #[tokio::test]
    async fn oportunidade_alheia_nao_aparece() {
        let repo = repo_de_teste().await;
        let opp = repo.create_opportunity(&payload_minimo("Riservato"), 1).await.unwrap();

        let erro = repo.get_opportunity(opp.id, 2).await.unwrap_err();
        assert!(matches!(erro, AppError::NotFound("Opportunity")));
    }
}
