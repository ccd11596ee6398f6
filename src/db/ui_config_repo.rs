// src/db/ui_config_repo.rs

use serde_json::Value;

use crate::common::error::AppError;
use crate::db::datasource::DataSource;
use crate::models::ui_config::{default_ui_config, UiConfigView};
use crate::params;

#[derive(Clone)]
pub struct UiConfigRepository {
    db: DataSource,
}

impl UiConfigRepository {
    pub fn new(db: DataSource) -> Self {
        Self { db }
    }

    /// Configuração ativa do usuário, já com a coluna JSON desserializada.
    /// Configuração é estritamente pessoal: aqui não existem linhas
    /// compartilhadas sem dono.
    pub async fn get_active(&self, owner: i64) -> Result<Option<UiConfigView>, AppError> {
        let row = self
            .db
            .fetch_optional(
                r#"SELECT * FROM ui_configs
                   WHERE "userId" = ? AND "isActive" = 1"#,
                &params![owner],
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw = row.opt_text("config").unwrap_or_default();
        // Coluna corrompida não derruba a UI: volta o documento padrão e o
        // próximo save sobrescreve.
        let config: Value =
            serde_json::from_str(&raw).unwrap_or_else(|_| default_ui_config());

        Ok(Some(UiConfigView {
            id: Some(row.i64("id")?),
            user_id: row.opt_i64("userId"),
            name: row.opt_text("name").unwrap_or_else(|| "default".to_string()),
            version: row.opt_text("version"),
            config,
            is_default: false,
            updated_at: row.opt_text("updatedAt"),
        }))
    }

    /// Upsert pela chave (userId, name). Devolve o id e se a linha foi
    /// criada ou atualizada, como o cliente espera no campo `action`.
    pub async fn upsert_config(
        &self,
        owner: i64,
        name: &str,
        version: Option<&str>,
        config: &Value,
    ) -> Result<(i64, &'static str), AppError> {
        let serialized = serde_json::to_string(config).map_err(anyhow::Error::from)?;

        let existing = self
            .db
            .fetch_optional(
                r#"SELECT id FROM ui_configs WHERE "userId" = ? AND name = ?"#,
                &params![owner, name],
            )
            .await?;

        match existing {
            Some(row) => {
                let id = row.i64("id")?;
                self.db
                    .execute(
                        r#"UPDATE ui_configs
                           SET config = ?, version = ?,
                               "updatedAt" = CURRENT_TIMESTAMP
                           WHERE id = ?"#,
                        &params![serialized, version, id],
                    )
                    .await?;
                Ok((id, "updated"))
            }
            None => {
                let id = self
                    .db
                    .insert(
                        r#"INSERT INTO ui_configs
                               ("userId", name, version, config, "isActive")
                           VALUES (?, ?, ?, ?, 1)"#,
                        &params![owner, name, version, serialized],
                    )
                    .await?;
                Ok((id, "created"))
            }
        }
    }

    /// Grava o documento no registro ativo do usuário; sem registro ativo,
    /// nasce um 'default' novo. É o caminho dos PATCHes de tema e
    /// visibilidade e do AI builder, que mexem sempre na configuração ativa.
    pub async fn save_active(&self, owner: i64, config: &Value) -> Result<(), AppError> {
        let serialized = serde_json::to_string(config).map_err(anyhow::Error::from)?;

        let existing = self
            .db
            .fetch_optional(
                r#"SELECT id FROM ui_configs WHERE "userId" = ? AND "isActive" = 1"#,
                &params![owner],
            )
            .await?;

        match existing {
            Some(row) => {
                let id = row.i64("id")?;
                self.db
                    .execute(
                        r#"UPDATE ui_configs
                           SET config = ?, "updatedAt" = CURRENT_TIMESTAMP
                           WHERE id = ?"#,
                        &params![serialized, id],
                    )
                    .await?;
            }
            None => {
                let version = config.get("version").and_then(Value::as_str);
                self.db
                    .insert(
                        r#"INSERT INTO ui_configs
                               ("userId", name, version, config, "isActive")
                           VALUES (?, 'default', ?, ?, 1)"#,
                        &params![owner, version, serialized],
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Remove todas as configurações do usuário (o reset volta ao padrão).
    pub async fn delete_all(&self, owner: i64) -> Result<u64, AppError> {
        let outcome = self
            .db
            .execute(
                r#"DELETE FROM ui_configs WHERE "userId" = ?"#,
                &params![owner],
            )
            .await?;
        Ok(outcome.rows_affected)
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::ensure_schema;
    use crate::models::ui_config::default_version;
    use serde_json::json;

    async fn repo_de_teste() -> UiConfigRepository {
        let db = DataSource::connect("sqlite::memory:").await.unwrap();
        ensure_schema(&db).await.unwrap();
        crate::db::seed_test_users(&db).await;
        UiConfigRepository::new(db)
    }

    #[tokio::test]
    async fn upsert_cria_e_depois_atualiza_a_mesma_linha() {
        let repo = repo_de_teste().await;
        let config = default_ui_config();

        let (id, action) = repo
            .upsert_config(1, "default", default_version().as_deref(), &config)
            .await
            .unwrap();
        assert_eq!(action, "created");

        let (id2, action) = repo
            .upsert_config(1, "default", default_version().as_deref(), &config)
            .await
            .unwrap();
        assert_eq!(action, "updated");
        assert_eq!(id, id2);
    }

    #[tokio::test]
    async fn configuracao_ativa_volta_desserializada() {
        let repo = repo_de_teste().await;
        let mut config = default_ui_config();
        config["theme"]["primaryColor"] = json!("#ef4444");

        repo.upsert_config(1, "default", Some("2.0"), &config).await.unwrap();

        let ativa = repo.get_active(1).await.unwrap().unwrap();
        assert!(!ativa.is_default);
        assert_eq!(ativa.config["theme"]["primaryColor"], json!("#ef4444"));
        assert_eq!(ativa.version.as_deref(), Some("2.0"));
    }

    #[tokio::test]
    async fn usuario_sem_configuracao_recebe_none() {
        let repo = repo_de_teste().await;
        assert!(repo.get_active(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn json_corrompido_degrada_para_o_padrao() {
        let repo = repo_de_teste().await;

        repo.db
            .execute(
                r#"INSERT INTO ui_configs ("userId", name, config, "isActive")
                   VALUES (1, 'default', 'non-e-json{', 1)"#,
                &params![],
            )
            .await
            .unwrap();

        let ativa = repo.get_active(1).await.unwrap().unwrap();
        assert_eq!(ativa.config, default_ui_config());
    }

    #[tokio::test]
    async fn save_active_cria_e_depois_reusa_a_linha_ativa() {
        let repo = repo_de_teste().await;

        let mut config = default_ui_config();
        config["theme"]["mode"] = json!("dark");
        repo.save_active(1, &config).await.unwrap();

        let ativa = repo.get_active(1).await.unwrap().unwrap();
        assert_eq!(ativa.name, "default");
        assert_eq!(ativa.config["theme"]["mode"], json!("dark"));

        config["theme"]["mode"] = json!("light");
        repo.save_active(1, &config).await.unwrap();

        let de_novo = repo.get_active(1).await.unwrap().unwrap();
        assert_eq!(de_novo.id, ativa.id);
        assert_eq!(de_novo.config["theme"]["mode"], json!("light"));
    }

    #[tokio::test]
    async fn reset_apaga_tudo_do_usuario() {
        let repo = repo_de_teste().await;
        let config = default_ui_config();

        repo.upsert_config(1, "default", None, &config).await.unwrap();
        repo.upsert_config(1, "alternativa", None, &config).await.unwrap();
        repo.upsert_config(2, "default", None, &config).await.unwrap();

        let removidas = repo.delete_all(1).await.unwrap();
        assert_eq!(removidas, 2);

        assert!(repo.get_active(1).await.unwrap().is_none());
        assert!(repo.get_active(2).await.unwrap().is_some());
    }
}
