// src/db.rs

pub mod datasource;
pub mod schema;

pub mod contact_repo;
pub mod dashboard_repo;
pub mod invoice_repo;
pub mod opportunity_repo;
pub mod target_repo;
pub mod task_repo;
pub mod ui_config_repo;
pub mod user_repo;

pub use contact_repo::ContactRepository;
pub use dashboard_repo::DashboardRepository;
pub use datasource::DataSource;
pub use invoice_repo::InvoiceRepository;
pub use opportunity_repo::OpportunityRepository;
pub use target_repo::TargetRepository;
pub use task_repo::TaskRepository;
pub use ui_config_repo::UiConfigRepository;
pub use user_repo::UserRepository;

// Usuários 1 e 2 para os testes de repositório: as chaves estrangeiras
// ficam ligadas também no SQLite, então "userId" precisa existir.
#[cfg(test)]
pub async fn seed_test_users(db: &DataSource) {
    for sql in [
        "INSERT INTO users (username, email, password) VALUES ('utente1', 'utente1@test.it', 'hash')",
        "INSERT INTO users (username, email, password) VALUES ('utente2', 'utente2@test.it', 'hash')",
    ] {
        db.execute(sql, &[]).await.unwrap();
    }
}
