// src/db/task_repo.rs

use crate::common::error::AppError;
use crate::db::datasource::DataSource;
use crate::models::crm::{Task, TaskPayload};
use crate::params;

#[derive(Clone)]
pub struct TaskRepository {
    db: DataSource,
}

impl TaskRepository {
    pub fn new(db: DataSource) -> Self {
        Self { db }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    /// Lista as atividades por vencimento (as sem data por último no
    /// Postgres, primeiro no SQLite — o cliente reordena de qualquer jeito).
    pub async fn list_tasks(&self, owner: i64) -> Result<Vec<Task>, AppError> {
        let rows = self
            .db
            .fetch_all(
                r#"SELECT * FROM tasks
                   WHERE ("userId" = ? OR "userId" IS NULL)
                   ORDER BY "dueDate" ASC, "createdAt" DESC"#,
                &params![owner],
            )
            .await?;

        let tasks = rows
            .iter()
            .map(Task::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub async fn get_task(&self, id: i64, owner: i64) -> Result<Task, AppError> {
        let row = self
            .db
            .fetch_optional(
                r#"SELECT * FROM tasks
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![id, owner],
            )
            .await?
            .ok_or(AppError::NotFound("Task"))?;

        Ok(Task::from_row(&row)?)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn create_task(&self, payload: &TaskPayload, owner: i64) -> Result<Task, AppError> {
        let title = payload
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::invalid("Title is required"))?;

        let id = self
            .db
            .insert(
                r#"INSERT INTO tasks
                       (title, "type", priority, "dueDate", status,
                        "contactId", "opportunityId", "userId", description)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                &params![
                    title,
                    payload.task_type.as_deref().unwrap_or("Chiamata"),
                    payload.priority.as_deref().unwrap_or("Media"),
                    payload.due_date.as_deref(),
                    payload.status.as_deref().unwrap_or("Da fare"),
                    payload.contact_id,
                    payload.opportunity_id,
                    owner,
                    payload.description.as_deref(),
                ],
            )
            .await?;

        self.get_task(id, owner).await
    }

    /// Substituição integral. `completed_at` chega já decidido pela regra
    /// de transição (carimbo quando vira "Completata", NULL caso contrário).
    pub async fn update_task(
        &self,
        id: i64,
        payload: &TaskPayload,
        completed_at: Option<&str>,
        owner: i64,
    ) -> Result<Task, AppError> {
        let title = payload
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::invalid("Title is required"))?;

        let outcome = self
            .db
            .execute(
                r#"UPDATE tasks
                   SET title = ?, "type" = ?, priority = ?, "dueDate" = ?,
                       status = ?, "contactId" = ?, "opportunityId" = ?,
                       description = ?, "completedAt" = ?,
                       "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![
                    title,
                    payload.task_type.as_deref().unwrap_or("Chiamata"),
                    payload.priority.as_deref().unwrap_or("Media"),
                    payload.due_date.as_deref(),
                    payload.status.as_deref().unwrap_or("Da fare"),
                    payload.contact_id,
                    payload.opportunity_id,
                    payload.description.as_deref(),
                    completed_at,
                    id,
                    owner,
                ],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Task"));
        }

        self.get_task(id, owner).await
    }

    /// Troca só o status (usada pelo toggle do kanban), carimbando ou
    /// limpando `completedAt` conforme decidido pelo chamador.
    pub async fn set_task_status(
        &self,
        id: i64,
        status: &str,
        completed_at: Option<&str>,
        owner: i64,
    ) -> Result<Task, AppError> {
        let outcome = self
            .db
            .execute(
                r#"UPDATE tasks
                   SET status = ?, "completedAt" = ?,
                       "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![status, completed_at, id, owner],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Task"));
        }

        self.get_task(id, owner).await
    }

    pub async fn delete_task(&self, id: i64, owner: i64) -> Result<(), AppError> {
        let outcome = self
            .db
            .execute(
                r#"DELETE FROM tasks
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![id, owner],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Task"));
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
    use crate::models::crm::{TASK_STATUS_DONE, TASK_STATUS_TODO};

    async fn repo_de_teste() -> TaskRepository {
        let db = DataSource::connect("sqlite::memory:").await.unwrap();
        ensure_schema(&db).await.unwrap();
        crate::db::seed_test_users(&db).await;
        TaskRepository::new(db)
    }

    fn payload_minimo(titulo: &str) -> TaskPayload {
        TaskPayload {
            title: Some(titulo.to_string()),
            ..TaskPayload::default()
        }
    }

    #[tokio::test]
    async fn criacao_aplica_padroes() {
        let repo = repo_de_teste().await;

        let task = repo.create_task(&payload_minimo("Chiamare Mario"), 1).await.unwrap();

        assert_eq!(task.task_type, "Chiamata");
        assert_eq!(task.priority, "Media");
        assert_eq!(task.status, TASK_STATUS_TODO);
        assert_eq!(task.completed_at, None);
    }

    #[tokio::test]
    async fn criacao_sem_titulo_falha() {
        let repo = repo_de_teste().await;

        let erro = repo.create_task(&TaskPayload::default(), 1).await.unwrap_err();
        assert!(matches!(erro, AppError::Invalid(_)));
    }

    #[tokio::test]
    async fn troca_de_status_grava_o_carimbo_recebido() {
        let repo = repo_de_teste().await;
        let task = repo.create_task(&payload_minimo("Preventivo"), 1).await.unwrap();

        let concluida = repo
            .set_task_status(task.id, TASK_STATUS_DONE, Some("2026-03-01T10:00:00.000Z"), 1)
            .await
            .unwrap();
        assert_eq!(concluida.status, TASK_STATUS_DONE);
        assert_eq!(concluida.completed_at.as_deref(), Some("2026-03-01T10:00:00.000Z"));

        let reaberta = repo
            .set_task_status(task.id, TASK_STATUS_TODO, None, 1)
            .await
            .unwrap();
        assert_eq!(reaberta.status, TASK_STATUS_TODO);
        assert_eq!(reaberta.completed_at, None);
    }

    #[tokio::test]
    async fn listagem_ordena_por_vencimento() {
        let repo = repo_de_teste().await;

        repo.create_task(
            &TaskPayload {
                title: Some("Depois".to_string()),
                due_date: Some("2026-05-20".to_string()),
                ..TaskPayload::default()
            },
            1,
        )
        .await
        .unwrap();
        repo.create_task(
            &TaskPayload {
                title: Some("Antes".to_string()),
                due_date: Some("2026-05-01".to_string()),
                ..TaskPayload::default()
            },
            1,
        )
        .await
        .unwrap();

        let lista = repo.list_tasks(1).await.unwrap();
        assert_eq!(lista[0].title, "Antes");
        assert_eq!(lista[1].title, "Depois");
    }

    #[tokio::test]
    async fn tarefas_de_outro_usuario_ficam_invisiveis() {
        let repo = repo_de_teste().await;
        let task = repo.create_task(&payload_minimo("Riservata"), 1).await.unwrap();

        let erro = repo.get_task(task.id, 2).await.unwrap_err();
        assert!(matches!(erro, AppError::NotFound("Task")));

        let erro = repo.delete_task(task.id, 2).await.unwrap_err();
        assert!(matches!(erro, AppError::NotFound("Task")));
    }
}
