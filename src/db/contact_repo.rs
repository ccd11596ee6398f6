// src/db/contact_repo.rs

use crate::common::error::AppError;
use crate::db::datasource::DataSource;
use crate::models::crm::{Contact, ContactPayload};
use crate::params;

#[derive(Clone)]
pub struct ContactRepository {
    db: DataSource,
}

impl ContactRepository {
    pub fn new(db: DataSource) -> Self {
        Self { db }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    /// Lista os contatos visíveis para o usuário (os dele + os sem dono),
    /// mais recentes primeiro.
    pub async fn list_contacts(&self, owner: i64) -> Result<Vec<Contact>, AppError> {
        let rows = self
            .db
            .fetch_all(
                r#"SELECT * FROM contacts
                   WHERE ("userId" = ? OR "userId" IS NULL)
                   ORDER BY "createdAt" DESC"#,
                &params![owner],
            )
            .await?;

        let contacts = rows
            .iter()
            .map(Contact::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(contacts)
    }

    pub async fn get_contact(&self, id: i64, owner: i64) -> Result<Contact, AppError> {
        let row = self
            .db
            .fetch_optional(
                r#"SELECT * FROM contacts
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![id, owner],
            )
            .await?
            .ok_or(AppError::NotFound("Contact"))?;

        Ok(Contact::from_row(&row)?)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn create_contact(
        &self,
        payload: &ContactPayload,
        owner: i64,
    ) -> Result<Contact, AppError> {
        let name = payload
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::invalid("Name is required"))?;

        let id = self
            .db
            .insert(
                r#"INSERT INTO contacts
                       (name, company, email, phone, value, status, avatar,
                        "lastContact", notes, "userId")
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                &params![
                    name,
                    payload.company.as_deref(),
                    payload.email.as_deref(),
                    payload.phone.as_deref(),
                    payload.value.unwrap_or(0.0),
                    payload.status.as_deref().unwrap_or("Lead"),
                    payload.avatar.as_deref(),
                    payload.last_contact.as_deref(),
                    payload.notes.as_deref(),
                    owner,
                ],
            )
            .await?;

        self.get_contact(id, owner).await
    }

    /// Substituição integral da linha (o cliente sempre manda o objeto
    /// completo no PUT).
    pub async fn update_contact(
        &self,
        id: i64,
        payload: &ContactPayload,
        owner: i64,
    ) -> Result<Contact, AppError> {
        let name = payload
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::invalid("Name is required"))?;

        let outcome = self
            .db
            .execute(
                r#"UPDATE contacts
                   SET name = ?, company = ?, email = ?, phone = ?, value = ?,
                       status = ?, avatar = ?, "lastContact" = ?, notes = ?,
                       "updatedAt" = CURRENT_TIMESTAMP
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![
                    name,
                    payload.company.as_deref(),
                    payload.email.as_deref(),
                    payload.phone.as_deref(),
                    payload.value.unwrap_or(0.0),
                    payload.status.as_deref().unwrap_or("Lead"),
                    payload.avatar.as_deref(),
                    payload.last_contact.as_deref(),
                    payload.notes.as_deref(),
                    id,
                    owner,
                ],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Contact"));
        }

        self.get_contact(id, owner).await
    }

    pub async fn delete_contact(&self, id: i64, owner: i64) -> Result<(), AppError> {
        let outcome = self
            .db
            .execute(
                r#"DELETE FROM contacts
                   WHERE id = ? AND ("userId" = ? OR "userId" IS NULL)"#,
                &params![id, owner],
            )
            .await?;

        if outcome.rows_affected == 0 {
            return Err(AppError::NotFound("Contact"));
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

    async fn repo_de_teste() -> ContactRepository {
        let db = DataSource::connect("sqlite::memory:").await.unwrap();
        ensure_schema(&db).await.unwrap();
        crate::db::seed_test_users(&db).await;
        ContactRepository::new(db)
    }

    fn payload_minimo(nome: &str) -> ContactPayload {
        ContactPayload {
            name: Some(nome.to_string()),
            ..ContactPayload::default()
        }
    }

    #[tokio::test]
    async fn criacao_aplica_padroes() {
        let repo = repo_de_teste().await;

        let contato = repo.create_contact(&payload_minimo("Mario Rossi"), 1).await.unwrap();

        assert_eq!(contato.name, "Mario Rossi");
        assert_eq!(contato.status, "Lead");
        assert_eq!(contato.value, 0.0);
        assert_eq!(contato.user_id, Some(1));
    }

    #[tokio::test]
    async fn criacao_sem_nome_falha() {
        let repo = repo_de_teste().await;

        let erro = repo.create_contact(&ContactPayload::default(), 1).await.unwrap_err();
        assert!(matches!(erro, AppError::Invalid(_)));
    }

    #[tokio::test]
    async fn usuarios_nao_enxergam_contatos_alheios() {
        let repo = repo_de_teste().await;

        let meu = repo.create_contact(&payload_minimo("Cliente A"), 1).await.unwrap();

        // O dono lê; o vizinho recebe 404.
        assert!(repo.get_contact(meu.id, 1).await.is_ok());
        let erro = repo.get_contact(meu.id, 2).await.unwrap_err();
        assert!(matches!(erro, AppError::NotFound(_)));

        // Listagem do vizinho não inclui a linha.
        assert!(repo.list_contacts(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn linhas_sem_dono_sao_compartilhadas() {
        let repo = repo_de_teste().await;

        repo.db
            .execute(
                r#"INSERT INTO contacts (name, status) VALUES ('Legado', 'Cliente')"#,
                &params![],
            )
            .await
            .unwrap();

        let lista = repo.list_contacts(7).await.unwrap();
        assert_eq!(lista.len(), 1);
        assert_eq!(lista[0].name, "Legado");
    }

    #[tokio::test]
    async fn atualizacao_substitui_a_linha_inteira() {
        let repo = repo_de_teste().await;

        let contato = repo
            .create_contact(
                &ContactPayload {
                    name: Some("Anna".to_string()),
                    company: Some("Studio Anna".to_string()),
                    value: Some(1500.0),
                    ..ContactPayload::default()
                },
                1,
            )
            .await
            .unwrap();

        let atualizado = repo
            .update_contact(
                contato.id,
                &ContactPayload {
                    name: Some("Anna Bianchi".to_string()),
                    status: Some("Cliente".to_string()),
                    ..ContactPayload::default()
                },
                1,
            )
            .await
            .unwrap();

        assert_eq!(atualizado.name, "Anna Bianchi");
        assert_eq!(atualizado.status, "Cliente");
        // PUT é substituição integral: campos ausentes viram NULL/zero.
        assert_eq!(atualizado.company, None);
        assert_eq!(atualizado.value, 0.0);
    }

    #[tokio::test]
    async fn remocao_de_id_inexistente_da_404() {
        let repo = repo_de_teste().await;

        let erro = repo.delete_contact(999, 1).await.unwrap_err();
        assert!(matches!(erro, AppError::NotFound("Contact")));
    }
}
