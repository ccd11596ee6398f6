// src/db/invoice_repo.rs

use crate::common::error::AppError;
use crate::db::datasource::{DataSource, SqlParam};
use crate::models::invoice::{
    canonical_status, Invoice, InvoiceFilters, InvoicePayload, InvoiceStatusPayload,
};
use crate::params;

// O SELECT com os nomes denormalizados que o cliente mostra na tabela.
const SELECT_WITH_JOINS: &str = r#"
    SELECT i.*,
           o.title AS "opportunityTitle",
           o.company AS "opportunityCompany",
           c.name AS "contactName"
    FROM invoices i
    LEFT JOIN opportunities o ON i."opportunityId" = o.id
    LEFT JOIN contacts c ON i."contactId" = c.id
"#;

#[derive(Clone)]
pub struct InvoiceRepository {
    db: DataSource,
}

impl InvoiceRepository {
    pub fn new(db: DataSource) -> Self {
        Self { db }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    /// Lista as faturas com os filtros opcionais da query string, próximas
    /// do vencimento primeiro.
    pub async fn list_invoices(
        &self,
        owner: i64,
        filters: &InvoiceFilters,
    ) -> Result<Vec<Invoice>, AppError> {
        let mut sql = format!(
            r#"{SELECT_WITH_JOINS} WHERE (i."userId" = ? OR i."userId" IS NULL)"#
        );
        let mut params: Vec<SqlParam> = params![owner];

        if let Some(status) = filters.status.as_deref() {
            sql.push_str(" AND i.status = ?");
            params.push(SqlParam::from(status));
        }
        if let Some(invoice_type) = filters.invoice_type.as_deref() {
            sql.push_str(r#" AND i."type" = ?"#);
            params.push(SqlParam::from(invoice_type));
        }
        if let Some(opportunity_id) = filters.opportunity_id {
            sql.push_str(r#" AND i."opportunityId" = ?"#);
            params.push(SqlParam::from(opportunity_id));
        }

        sql.push_str(r#" ORDER BY i."dueDate" ASC"#);

        let rows = self.db.fetch_all(&sql, &params).await?;
        let invoices = rows
            .iter()
            .map(Invoice::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(invoices)
    }

    pub async fn get_invoice(&self, id: i64, owner: i64) -> Result<Invoice, AppError> {
        let sql = format!(
            r#"{SELECT_WITH_JOINS} WHERE i.id = ? AND (i."userId" = ? OR i."userId" IS NULL)"#
        );
        let row = self
            .db
            .fetch_optional(&sql, &params![id, owner])
            .await?
            .ok_or(AppError::NotFound("Invoice"))?;

        Ok(Invoice::from_row(&row)?)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn create_invoice(
        &self,
        payload: &InvoicePayload,
        owner: i64,
    ) -> Result<Invoice, AppError> {
        let (invoice_number, amount, issue_date, due_date) = required_fields(payload)?;

        let id = self
            .db
            .insert(
                r#"INSERT INTO invoices
                       ("invoiceNumber", "opportunityId", "contactId", "type",
                        amount, "issueDate", "dueDate", status, notes, "userId")
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                &params![
                    invoice_number,
                    payload.opportunity_id,
                    payload.contact_id,
                    payload.invoice_type.as_deref().unwrap_or("emessa"),
                    amount,
                    issue_date,
                    due_date,
                    canonical_status(payload.status.as_deref().unwrap_or("da_emettere")),
                    payload.notes.as_deref(),
                    owner,
                ],
            )
            .await?;

        self.get_invoice(id, owner).await
    }

    pub async fn update_invoice(
        &self,
        id: i64,
        payload: &InvoicePayload,
        owner: i64,
    ) -> Result<Invoice, AppError> {
        let (invoice_number, amount, issue_date, due_date) = required_fields(payload)?;

        let outcome = self
            .db
            .execute(
                r#"UPDATE invoices
                   SET "invoiceNumber" = ?, "opportunityId" = ?, "contactId" = ?,
                       "type" = ?, amount = ?, "issueDate" = ?, "dueDate" = ?,
                       "paidDate" = ?, status = ?, notes = ?,
                       "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![
                    invoice_number,
                    payload.opportunity_id,
                    payload.contact_id,
                    payload.invoice_type.as_deref().unwrap_or("emessa"),
                    amount,
                    issue_date,
                    due_date,
                    payload.paid_date.as_deref(),
                    canonical_status(payload.status.as_deref().unwrap_or("da_emettere")),
                    payload.notes.as_deref(),
                    id,
                    owner,
                ],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Invoice"));
        }

        self.get_invoice(id, owner).await
    }

    /// Troca rápida de status vinda da tabela.
    ///
    /// `paidDate` vale exatamente o que veio no corpo (ausente => NULL);
    /// `issueDate` só muda quando o campo veio no JSON, porque o fluxo
    /// "da_emettere -> emessa" manda a data real de emissão junto.
    pub async fn set_invoice_status(
        &self,
        id: i64,
        patch: &InvoiceStatusPayload,
        owner: i64,
    ) -> Result<Invoice, AppError> {
        let status = patch
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::invalid("Status is required"))?;
        let status = canonical_status(status);

        let outcome = match &patch.issue_date {
            Some(issue_date) => {
                self.db
                    .execute(
                        r#"UPDATE invoices
                           SET status = ?, "issueDate" = ?, "paidDate" = ?,
                               "updatedAt" = CURRENT_TIMESTAMP
                           WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                        &params![
                            status,
                            issue_date.as_deref(),
                            patch.paid_date.as_deref(),
                            id,
                            owner,
                        ],
                    )
                    .await?
            }
            None => {
                self.db
                    .execute(
                        r#"UPDATE invoices
                           SET status = ?, "paidDate" = ?,
                               "updatedAt" = CURRENT_TIMESTAMP
                           WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                        &params![status, patch.paid_date.as_deref(), id, owner],
                    )
                    .await?
            }
        };

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Invoice"));
        }

        self.get_invoice(id, owner).await
    }

    pub async fn delete_invoice(&self, id: i64, owner: i64) -> Result<(), AppError> {
        let outcome = self
            .db
            .execute(
                r#"DELETE FROM invoices
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![id, owner],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Invoice"));
        }
        Ok(())
    }
}

fn required_fields(payload: &InvoicePayload) -> Result<(&str, f64, &str, &str), AppError> {
    match (
        payload.invoice_number.as_deref().filter(|n| !n.is_empty()),
        payload.amount,
        payload.issue_date.as_deref().filter(|d| !d.is_empty()),
        payload.due_date.as_deref().filter(|d| !d.is_empty()),
    ) {
        (Some(number), Some(amount), Some(issue), Some(due)) => {
            Ok((number, amount, issue, due))
        }
        _ => Err(AppError::invalid(
            "Invoice number, amount, issue date and due date are required",
        )),
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::ensure_schema;

    async fn repo_de_teste() -> InvoiceRepository {
        let db = DataSource::connect("sqlite::memory:").await.unwrap();
        ensure_schema(&db).await.unwrap();
        crate::db::seed_test_users(&db).await;
        InvoiceRepository::new(db)
    }

    fn payload_minimo(numero: &str) -> InvoicePayload {
        InvoicePayload {
            invoice_number: Some(numero.to_string()),
            amount: Some(1000.0),
            issue_date: Some("2026-01-10".to_string()),
            due_date: Some("2026-02-10".to_string()),
            ..InvoicePayload::default()
        }
    }

    #[tokio::test]
    async fn criacao_aplica_padroes() {
        let repo = repo_de_teste().await;

        let fattura = repo.create_invoice(&payload_minimo("2026-001"), 1).await.unwrap();

        assert_eq!(fattura.invoice_number, "2026-001");
        assert_eq!(fattura.invoice_type, "emessa");
        assert_eq!(fattura.status, "da_emettere");
        assert_eq!(fattura.paid_date, None);
    }

    #[tokio::test]
    async fn criacao_incompleta_falha() {
        let repo = repo_de_teste().await;

        let erro = repo
            .create_invoice(
                &InvoicePayload {
                    invoice_number: Some("2026-002".to_string()),
                    amount: Some(500.0),
                    // sem issueDate/dueDate
                    ..InvoicePayload::default()
                },
                1,
            )
            .await
            .unwrap_err();
        assert!(matches!(erro, AppError::Invalid(_)));
    }

    #[tokio::test]
    async fn status_legado_e_normalizado_na_gravacao() {
        let repo = repo_de_teste().await;

        let fattura = repo
            .create_invoice(
                &InvoicePayload {
                    status: Some("da_pagare".to_string()),
                    ..payload_minimo("2026-003")
                },
                1,
            )
            .await
            .unwrap();

        assert_eq!(fattura.status, "emessa");
    }

    #[tokio::test]
    async fn patch_de_status_preserva_issue_date_quando_ausente() {
        let repo = repo_de_teste().await;
        let fattura = repo.create_invoice(&payload_minimo("2026-004"), 1).await.unwrap();

        // Marca como paga sem mandar issueDate: a original fica.
        let paga = repo
            .set_invoice_status(
                fattura.id,
                &InvoiceStatusPayload {
                    status: Some("pagata".to_string()),
                    issue_date: None,
                    paid_date: Some("2026-02-05".to_string()),
                },
                1,
            )
            .await
            .unwrap();

        assert_eq!(paga.status, "pagata");
        assert_eq!(paga.issue_date.as_deref(), Some("2026-01-10"));
        assert_eq!(paga.paid_date.as_deref(), Some("2026-02-05"));

        // Volta para emessa sem paidDate: a coluna zera.
        let emessa = repo
            .set_invoice_status(
                fattura.id,
                &InvoiceStatusPayload {
                    status: Some("emessa".to_string()),
                    issue_date: Some(Some("2026-01-20".to_string())),
                    paid_date: None,
                },
                1,
            )
            .await
            .unwrap();

        assert_eq!(emessa.status, "emessa");
        assert_eq!(emessa.issue_date.as_deref(), Some("2026-01-20"));
        assert_eq!(emessa.paid_date, None);
    }

    #[tokio::test]
    async fn filtros_da_listagem_combinam() {
        let repo = repo_de_teste().await;

        repo.create_invoice(
            &InvoicePayload {
                status: Some("pagata".to_string()),
                ..payload_minimo("2026-005")
            },
            1,
        )
        .await
        .unwrap();
        repo.create_invoice(&payload_minimo("2026-006"), 1).await.unwrap();

        let pagas = repo
            .list_invoices(
                1,
                &InvoiceFilters {
                    status: Some("pagata".to_string()),
                    ..InvoiceFilters::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(pagas.len(), 1);
        assert_eq!(pagas[0].invoice_number, "2026-005");
    }

    #[tokio::test]
    async fn listagem_traz_os_nomes_do_join() {
        let repo = repo_de_teste().await;

        repo.db
            .execute(
                r#"INSERT INTO opportunities (title, company, "userId")
                   VALUES ('Sito web', 'ACME Srl', 1)"#,
                &params![],
            )
            .await
            .unwrap();

        repo.create_invoice(
            &InvoicePayload {
                opportunity_id: Some(1),
                ..payload_minimo("2026-007")
            },
            1,
        )
        .await
        .unwrap();

        let lista = repo.list_invoices(1, &InvoiceFilters::default()).await.unwrap();
        assert_eq!(lista[0].opportunity_title.as_deref(), Some("Sito web"));
        assert_eq!(lista[0].opportunity_company.as_deref(), Some("ACME Srl"));
    }

    #[tokio::test]
    async fn fatura_alheia_e_invisivel() {
        let repo = repo_de_teste().await;
        let fattura = repo.create_invoice(&payload_minimo("2026-008"), 1).await.unwrap();

        let erro = repo.get_invoice(fattura.id, 2).await.unwrap_err();
        assert!(matches!(erro, AppError::NotFound("Invoice")));
    }
}
