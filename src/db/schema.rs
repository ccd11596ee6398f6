// src/db/schema.rs
//
// Inicialização idempotente do esquema. `ensure_schema` pode rodar em todo
// boot: CREATE TABLE IF NOT EXISTS para as tabelas, ALTER TABLE aditivo para
// colunas que chegaram depois (tolerando "duplicate column") e limpezas
// destrutivas controladas por um marcador de versão em `schema_meta` —
// nunca re-executadas em bancos já migrados.
//
// Datas preenchidas pela aplicação ficam em colunas TEXT (ISO-8601) nos dois
// dialetos, então comparação e substr() funcionam sem ramificar a query.
// Só createdAt/updatedAt usam o timestamp nativo de cada banco.

use crate::db::datasource::{is_duplicate_column, DataSource, Dialect};
use crate::params;

// Versão atual do esquema. A v2 trocou a tabela yearly_targets pela
// monthly_targets; o DROP só acontece na passagem de v1 para v2.
pub const SCHEMA_VERSION: i64 = 2;

pub async fn ensure_schema(db: &DataSource) -> Result<(), sqlx::Error> {
    for statement in table_statements(db.dialect()) {
        db.execute(statement, &[]).await?;
    }
    apply_additive_migrations(db).await?;
    apply_versioned_cleanups(db).await?;
    tracing::info!("✅ Esquema do banco de dados pronto");
    Ok(())
}

// ============================================================================
// 1. TABELAS
// ============================================================================

fn table_statements(dialect: Dialect) -> &'static [&'static str] {
    match dialect {
        Dialect::Sqlite => SQLITE_TABLES,
        Dialect::Postgres => POSTGRES_TABLES,
    }
}

const SQLITE_TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS schema_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        email TEXT UNIQUE NOT NULL,
        password TEXT NOT NULL,
        fullName TEXT,
        avatar TEXT,
        phone TEXT,
        company TEXT,
        role TEXT DEFAULT 'user',
        resetToken TEXT,
        resetExpires TEXT,
        verificationToken TEXT,
        emailVerified INTEGER DEFAULT 0,
        createdAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        updatedAt DATETIME DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS contacts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        company TEXT,
        email TEXT,
        phone TEXT,
        value REAL DEFAULT 0,
        status TEXT DEFAULT 'Lead',
        avatar TEXT,
        lastContact TEXT,
        notes TEXT,
        userId INTEGER,
        createdAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        updatedAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (userId) REFERENCES users(id) ON DELETE SET NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS opportunities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        company TEXT,
        value REAL DEFAULT 0,
        stage TEXT DEFAULT 'Lead',
        probability INTEGER DEFAULT 0,
        openDate TEXT,
        closeDate TEXT,
        owner TEXT,
        contactId INTEGER,
        userId INTEGER,
        originalStage TEXT,
        projectStatus TEXT,
        expectedInvoiceDate TEXT,
        expectedPaymentDate TEXT,
        notes TEXT,
        createdAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        updatedAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (contactId) REFERENCES contacts(id) ON DELETE SET NULL,
        FOREIGN KEY (userId) REFERENCES users(id) ON DELETE SET NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        type TEXT DEFAULT 'Chiamata',
        priority TEXT DEFAULT 'Media',
        dueDate TEXT,
        status TEXT DEFAULT 'Da fare',
        contactId INTEGER,
        opportunityId INTEGER,
        userId INTEGER,
        description TEXT,
        completedAt TEXT,
        createdAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        updatedAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (contactId) REFERENCES contacts(id) ON DELETE SET NULL,
        FOREIGN KEY (opportunityId) REFERENCES opportunities(id) ON DELETE SET NULL,
        FOREIGN KEY (userId) REFERENCES users(id) ON DELETE SET NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS invoices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        invoiceNumber TEXT NOT NULL,
        opportunityId INTEGER,
        contactId INTEGER,
        type TEXT DEFAULT 'emessa',
        amount REAL NOT NULL,
        issueDate TEXT,
        dueDate TEXT,
        paidDate TEXT,
        status TEXT DEFAULT 'da_emettere',
        notes TEXT,
        userId INTEGER,
        createdAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        updatedAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (opportunityId) REFERENCES opportunities(id) ON DELETE SET NULL,
        FOREIGN KEY (contactId) REFERENCES contacts(id) ON DELETE SET NULL,
        FOREIGN KEY (userId) REFERENCES users(id) ON DELETE SET NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS monthly_targets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        target REAL DEFAULT 0,
        targetType TEXT DEFAULT 'fatturato',
        userId INTEGER,
        createdAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        updatedAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(year, month, targetType, userId),
        FOREIGN KEY (userId) REFERENCES users(id) ON DELETE SET NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS ui_configs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        userId INTEGER,
        name TEXT DEFAULT 'default',
        version TEXT,
        config TEXT NOT NULL,
        isActive INTEGER DEFAULT 1,
        createdAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        updatedAt DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(userId, name),
        FOREIGN KEY (userId) REFERENCES users(id) ON DELETE SET NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entityType TEXT NOT NULL,
        entityId INTEGER NOT NULL,
        content TEXT NOT NULL,
        createdBy INTEGER,
        createdAt DATETIME DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        userId INTEGER,
        type TEXT NOT NULL,
        title TEXT NOT NULL,
        message TEXT,
        entityType TEXT,
        entityId INTEGER,
        isRead INTEGER DEFAULT 0,
        createdAt DATETIME DEFAULT CURRENT_TIMESTAMP
    )"#,
];

const POSTGRES_TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS schema_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        username VARCHAR(255) UNIQUE NOT NULL,
        email VARCHAR(255) UNIQUE NOT NULL,
        password VARCHAR(255) NOT NULL,
        "fullName" VARCHAR(255),
        avatar VARCHAR(10),
        phone VARCHAR(50),
        company VARCHAR(255),
        role VARCHAR(50) DEFAULT 'user',
        "resetToken" TEXT,
        "resetExpires" TEXT,
        "verificationToken" TEXT,
        "emailVerified" INTEGER DEFAULT 0,
        "createdAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
        "updatedAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS contacts (
        id SERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        company VARCHAR(255),
        email VARCHAR(255),
        phone VARCHAR(50),
        value DOUBLE PRECISION DEFAULT 0,
        status VARCHAR(50) DEFAULT 'Lead',
        avatar VARCHAR(10),
        "lastContact" TEXT,
        notes TEXT,
        "userId" INTEGER REFERENCES users(id) ON DELETE SET NULL,
        "createdAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
        "updatedAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS opportunities (
        id SERIAL PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        company VARCHAR(255),
        value DOUBLE PRECISION DEFAULT 0,
        stage VARCHAR(50) DEFAULT 'Lead',
        probability INTEGER DEFAULT 0,
        "openDate" TEXT,
        "closeDate" TEXT,
        owner VARCHAR(255),
        "contactId" INTEGER REFERENCES contacts(id) ON DELETE SET NULL,
        "userId" INTEGER REFERENCES users(id) ON DELETE SET NULL,
        "originalStage" VARCHAR(50),
        "projectStatus" VARCHAR(50),
        "expectedInvoiceDate" TEXT,
        "expectedPaymentDate" TEXT,
        notes TEXT,
        "createdAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
        "updatedAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS tasks (
        id SERIAL PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        type VARCHAR(50) DEFAULT 'Chiamata',
        priority VARCHAR(50) DEFAULT 'Media',
        "dueDate" TEXT,
        status VARCHAR(50) DEFAULT 'Da fare',
        "contactId" INTEGER REFERENCES contacts(id) ON DELETE SET NULL,
        "opportunityId" INTEGER REFERENCES opportunities(id) ON DELETE SET NULL,
        "userId" INTEGER REFERENCES users(id) ON DELETE SET NULL,
        description TEXT,
        "completedAt" TEXT,
        "createdAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
        "updatedAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS invoices (
        id SERIAL PRIMARY KEY,
        "invoiceNumber" VARCHAR(255) NOT NULL,
        "opportunityId" INTEGER REFERENCES opportunities(id) ON DELETE SET NULL,
        "contactId" INTEGER REFERENCES contacts(id) ON DELETE SET NULL,
        type VARCHAR(50) DEFAULT 'emessa',
        amount DOUBLE PRECISION NOT NULL,
        "issueDate" TEXT,
        "dueDate" TEXT,
        "paidDate" TEXT,
        status VARCHAR(50) DEFAULT 'da_emettere',
        notes TEXT,
        "userId" INTEGER REFERENCES users(id) ON DELETE SET NULL,
        "createdAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
        "updatedAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS monthly_targets (
        id SERIAL PRIMARY KEY,
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        target DOUBLE PRECISION DEFAULT 0,
        "targetType" VARCHAR(50) DEFAULT 'fatturato',
        "userId" INTEGER REFERENCES users(id) ON DELETE SET NULL,
        "createdAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
        "updatedAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(year, month, "targetType", "userId")
    )"#,
    r#"CREATE TABLE IF NOT EXISTS ui_configs (
        id SERIAL PRIMARY KEY,
        "userId" INTEGER REFERENCES users(id) ON DELETE SET NULL,
        name VARCHAR(100) DEFAULT 'default',
        version VARCHAR(20),
        config TEXT NOT NULL,
        "isActive" INTEGER DEFAULT 1,
        "createdAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
        "updatedAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
        UNIQUE("userId", name)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS notes (
        id SERIAL PRIMARY KEY,
        "entityType" VARCHAR(50) NOT NULL,
        "entityId" INTEGER NOT NULL,
        content TEXT NOT NULL,
        "createdBy" INTEGER,
        "createdAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS notifications (
        id SERIAL PRIMARY KEY,
        "userId" INTEGER,
        type VARCHAR(50) NOT NULL,
        title VARCHAR(255) NOT NULL,
        message TEXT,
        "entityType" VARCHAR(50),
        "entityId" INTEGER,
        "isRead" INTEGER DEFAULT 0,
        "createdAt" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
    )"#,
];

// ============================================================================
// 2. MIGRAÇÕES ADITIVAS
// ============================================================================

// Colunas que entraram depois do esquema inicial. Em bancos novos o CREATE
// TABLE acima já as inclui e o ALTER falha com "duplicate column" — que é
// tratado como sucesso. Qualquer outro erro sobe.
const ADDITIVE_MIGRATIONS: &[&str] = &[
    r#"ALTER TABLE users ADD COLUMN phone TEXT"#,
    r#"ALTER TABLE users ADD COLUMN company TEXT"#,
    r#"ALTER TABLE users ADD COLUMN "resetToken" TEXT"#,
    r#"ALTER TABLE users ADD COLUMN "resetExpires" TEXT"#,
    r#"ALTER TABLE users ADD COLUMN "verificationToken" TEXT"#,
    r#"ALTER TABLE users ADD COLUMN "emailVerified" INTEGER DEFAULT 0"#,
    r#"ALTER TABLE opportunities ADD COLUMN "projectStatus" TEXT"#,
    r#"ALTER TABLE opportunities ADD COLUMN "expectedInvoiceDate" TEXT"#,
    r#"ALTER TABLE opportunities ADD COLUMN "expectedPaymentDate" TEXT"#,
    r#"ALTER TABLE invoices ADD COLUMN "paidDate" TEXT"#,
];

async fn apply_additive_migrations(db: &DataSource) -> Result<(), sqlx::Error> {
    for statement in ADDITIVE_MIGRATIONS {
        if let Err(err) = db.execute(statement, &[]).await {
            if is_duplicate_column(&err) {
                continue;
            }
            return Err(err);
        }
    }
    Ok(())
}

// ============================================================================
// 3. LIMPEZAS COM MARCADOR DE VERSÃO
// ============================================================================

async fn apply_versioned_cleanups(db: &DataSource) -> Result<(), sqlx::Error> {
    let current = stored_version(db).await?;

    if current < 2 {
        // v1 -> v2: as metas anuais foram substituídas pelas mensais.
        db.execute("DROP TABLE IF EXISTS yearly_targets", &[]).await?;
        tracing::info!("Migração v2 aplicada: yearly_targets removida");
    }

    if current < SCHEMA_VERSION {
        store_version(db, SCHEMA_VERSION).await?;
    }
    Ok(())
}

async fn stored_version(db: &DataSource) -> Result<i64, sqlx::Error> {
    let row = db
        .fetch_optional(
            "SELECT value FROM schema_meta WHERE key = ?",
            &params!["schema_version"],
        )
        .await?;
    Ok(row
        .and_then(|r| r.opt_text("value"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(1))
}

async fn store_version(db: &DataSource, version: i64) -> Result<(), sqlx::Error> {
    let updated = db
        .execute(
            "UPDATE schema_meta SET value = ? WHERE key = ?",
            &params![version.to_string(), "schema_version"],
        )
        .await?;
    if updated.rows_affected == 0 {
        db.execute(
            "INSERT INTO schema_meta (key, value) VALUES (?, ?)",
            &params!["schema_version", version.to_string()],
        )
        .await?;
    }
    Ok(())
}

// ============================================================================
// TESTES
// ============================================================================
