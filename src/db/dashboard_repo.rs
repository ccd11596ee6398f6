// src/db/dashboard_repo.rs
//
// Leituras transversais: o rollup do dashboard, a busca global, o snapshot
// completo (export e contexto do chatbot), notas e notificações.

use crate::common::error::AppError;
use crate::db::datasource::DataSource;
use crate::models::chat::CrmSnapshot;
use crate::models::crm::{Contact, Opportunity, Task, TASK_STATUS_DONE};
use crate::models::dashboard::{GlobalStats, Note, NotificationView, SearchResults};
use crate::models::invoice::Invoice;
use crate::params;

#[derive(Clone)]
pub struct DashboardRepository {
    db: DataSource,
}

impl DashboardRepository {
    pub fn new(db: DataSource) -> Self {
        Self { db }
    }

    // =========================================================================
    //  ROLLUP GLOBAL
    // =========================================================================

    /// Os seis números do topo do dashboard, numa passada por tabela.
    pub async fn global_stats(&self, owner: i64) -> Result<GlobalStats, AppError> {
        let contacts = self.count("contacts", owner).await?;
        let opportunities = self.count("opportunities", owner).await?;
        let tasks = self.count("tasks", owner).await?;

        let pipeline = self
            .db
            .fetch_optional(
                r#"SELECT SUM(value) AS total FROM opportunities
                   WHERE ("userId" = ? OR "userId" IS NULL)
                     AND stage NOT LIKE '%Chiuso%'"#,
                &params![owner],
            )
            .await?;
        let pipeline_value = pipeline.map(|row| row.f64_lossy("total")).unwrap_or(0.0);

        let won = self
            .db
            .fetch_optional(
                r#"SELECT COUNT(*) AS count, SUM(value) AS total FROM opportunities
                   WHERE ("userId" = ? OR "userId" IS NULL)
                     AND stage LIKE '%Vinto%'"#,
                &params![owner],
            )
            .await?;
        let (won_deals, won_value) = match won {
            Some(row) => (row.opt_i64("count").unwrap_or(0), row.f64_lossy("total")),
            None => (0, 0.0),
        };

        let open = self
            .db
            .fetch_optional(
                &format!(
                    r#"SELECT COUNT(*) AS count FROM tasks
                       WHERE ("userId" = ? OR "userId" IS NULL)
                         AND status != '{TASK_STATUS_DONE}'"#
                ),
                &params![owner],
            )
            .await?;
        let open_tasks = open.and_then(|row| row.opt_i64("count")).unwrap_or(0);

        Ok(GlobalStats {
            contacts,
            opportunities,
            tasks,
            pipeline_value,
            won_deals,
            won_value,
            open_tasks,
        })
    }

    async fn count(&self, table: &str, owner: i64) -> Result<i64, AppError> {
        let row = self
            .db
            .fetch_optional(
                &format!(
                    r#"SELECT COUNT(*) AS count FROM {table}
                       WHERE ("userId" = ? OR "userId" IS NULL)"#
                ),
                &params![owner],
            )
            .await?;
        Ok(row.and_then(|row| row.opt_i64("count")).unwrap_or(0))
    }

    // =========================================================================
    //  BUSCA GLOBAL
    // =========================================================================

    /// Procura o termo em contatos, oportunidades e atividades (10 de cada).
    /// Menos de 2 caracteres devolve os três conjuntos vazios.
    pub async fn search(&self, owner: i64, query: &str) -> Result<SearchResults, AppError> {
        if query.chars().count() < 2 {
            return Ok(SearchResults::empty());
        }

        let term = format!("%{query}%");

        let contact_rows = self
            .db
            .fetch_all(
                r#"SELECT * FROM contacts
                   WHERE ("userId" = ? OR "userId" IS NULL)
                     AND (name LIKE ? OR company LIKE ? OR email LIKE ?)
                   LIMIT 10"#,
                &params![owner, term.as_str(), term.as_str(), term.as_str()],
            )
            .await?;

        let opportunity_rows = self
            .db
            .fetch_all(
                r#"SELECT * FROM opportunities
                   WHERE ("userId" = ? OR "userId" IS NULL)
                     AND (title LIKE ? OR company LIKE ?)
                   LIMIT 10"#,
                &params![owner, term.as_str(), term.as_str()],
            )
            .await?;

        let task_rows = self
            .db
            .fetch_all(
                r#"SELECT * FROM tasks
                   WHERE ("userId" = ? OR "userId" IS NULL)
                     AND (title LIKE ? OR description LIKE ?)
                   LIMIT 10"#,
                &params![owner, term.as_str(), term.as_str()],
            )
            .await?;

        Ok(SearchResults {
            contacts: contact_rows
                .iter()
                .map(Contact::from_row)
                .collect::<Result<Vec<_>, _>>()?,
            opportunities: opportunity_rows
                .iter()
                .map(Opportunity::from_row)
                .collect::<Result<Vec<_>, _>>()?,
            tasks: task_rows
                .iter()
                .map(Task::from_row)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    // =========================================================================
    //  SNAPSHOT COMPLETO
    // =========================================================================

    /// Tudo de uma vez: export e contexto do chatbot leem daqui. As faturas
    /// vêm com os nomes do join para as linhas "- numero - cliente - €...".
    pub async fn crm_snapshot(&self, owner: i64) -> Result<CrmSnapshot, AppError> {
        let contact_rows = self
            .db
            .fetch_all(
                r#"SELECT * FROM contacts WHERE ("userId" = ? OR "userId" IS NULL)"#,
                &params![owner],
            )
            .await?;
        let opportunity_rows = self
            .db
            .fetch_all(
                r#"SELECT * FROM opportunities WHERE ("userId" = ? OR "userId" IS NULL)"#,
                &params![owner],
            )
            .await?;
        let task_rows = self
            .db
            .fetch_all(
                r#"SELECT * FROM tasks WHERE ("userId" = ? OR "userId" IS NULL)"#,
                &params![owner],
            )
            .await?;
        let invoice_rows = self
            .db
            .fetch_all(
                r#"SELECT i.*,
                          o.title AS "opportunityTitle",
                          o.company AS "opportunityCompany",
                          c.name AS "contactName"
                   FROM invoices i
                   LEFT JOIN opportunities o ON i."opportunityId" = o.id
                   LEFT JOIN contacts c ON i."contactId" = c.id
                   WHERE (i."userId" = ? OR i."userId" IS NULL)"#,
                &params![owner],
            )
            .await?;

        Ok(CrmSnapshot {
            contacts: contact_rows
                .iter()
                .map(Contact::from_row)
                .collect::<Result<Vec<_>, _>>()?,
            opportunities: opportunity_rows
                .iter()
                .map(Opportunity::from_row)
                .collect::<Result<Vec<_>, _>>()?,
            tasks: task_rows
                .iter()
                .map(Task::from_row)
                .collect::<Result<Vec<_>, _>>()?,
            invoices: invoice_rows
                .iter()
                .map(Invoice::from_row)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    // =========================================================================
    //  NOTIFICAÇÕES
    // =========================================================================

    /// Notificações gravadas + as sintéticas de atividades vencidas/do dia.
    /// As sintéticas vêm primeiro, como o cliente espera.
    pub async fn list_notifications(
        &self,
        owner: i64,
        today: &str,
    ) -> Result<Vec<NotificationView>, AppError> {
        let stored_rows = self
            .db
            .fetch_all(
                r#"SELECT * FROM notifications
                   WHERE ("userId" = ? OR "userId" IS NULL)
                   ORDER BY "createdAt" DESC
                   LIMIT 50"#,
                &params![owner],
            )
            .await?;

        let due_rows = self
            .db
            .fetch_all(
                &format!(
                    r#"SELECT * FROM tasks
                       WHERE ("userId" = ? OR "userId" IS NULL)
                         AND status != '{TASK_STATUS_DONE}'
                         AND "dueDate" <= ?
                       ORDER BY "dueDate"
                       LIMIT 10"#
                ),
                &params![owner, today],
            )
            .await?;

        let mut notifications = Vec::with_capacity(due_rows.len() + stored_rows.len());
        for row in &due_rows {
            let task = Task::from_row(row)?;
            notifications.push(NotificationView::from_due_task(&task, today));
        }
        for row in &stored_rows {
            notifications.push(NotificationView::from_row(row)?);
        }

        Ok(notifications)
    }

    pub async fn mark_notification_read(&self, id: i64, owner: i64) -> Result<(), AppError> {
        self.db
            .execute(
                r#"UPDATE notifications SET "isRead" = 1
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![id, owner],
            )
            .await?;
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self, owner: i64) -> Result<(), AppError> {
        self.db
            .execute(
                r#"UPDATE notifications SET "isRead" = 1
                   WHERE ("userId" = ? OR "userId" IS NULL)"#,
                &params![owner],
            )
            .await?;
        Ok(())
    }

    // =========================================================================
    //  NOTAS
    // =========================================================================

    pub async fn list_notes(
        &self,
        owner: i64,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<Vec<Note>, AppError> {
        let rows = self
            .db
            .fetch_all(
                r#"SELECT * FROM notes
                   WHERE "entityType" = ? AND "entityId" = ?
                     AND ("createdBy" = ? OR "createdBy" IS NULL)
                   ORDER BY "createdAt" DESC"#,
                &params![entity_type, entity_id, owner],
            )
            .await?;

        let notes = rows
            .iter()
            .map(Note::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    pub async fn create_note(
        &self,
        owner: i64,
        entity_type: &str,
        entity_id: i64,
        content: &str,
    ) -> Result<Note, AppError> {
        let id = self
            .db
            .insert(
                r#"INSERT INTO notes ("entityType", "entityId", content, "createdBy")
                   VALUES (?, ?, ?, ?)"#,
                &params![entity_type, entity_id, content, owner],
            )
            .await?;

        let row = self
            .db
            .fetch_optional("SELECT * FROM notes WHERE id = ?", &params![id])
            .await?
            .ok_or(AppError::NotFound("Note"))?;

        Ok(Note::from_row(&row)?)
    }

    pub async fn delete_note(&self, id: i64, owner: i64) -> Result<(), AppError> {
        let outcome = self
            .db
            .execute(
                r#"DELETE FROM notes
                   WHERE id = ? AND ("createdBy" = ? OR "createdBy" IS NULL)"#,
                &params![id, owner],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Note"));
        }
        Ok(())
    }
}

// ============================================================================
// TESTES
// ============================================================================
