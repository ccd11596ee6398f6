// src/db/datasource.rs
//
// A fonte de dados com dialeto escolhido em runtime: a mesma query canônica
// (placeholders `?`, identificadores camelCase entre aspas) roda em SQLite e
// em Postgres. Para o Postgres os `?` são reescritos como `$1..$n` e o id
// inserido é capturado com `RETURNING id`; no SQLite usamos o rowid.
// Os repositórios nunca ramificam por dialeto.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};

// ============================================================================
// 1. PARÂMETROS E VALORES
// ============================================================================

// Parâmetro de query. Mantém o tipo mesmo quando o valor é NULL: o Postgres
// checa o tipo do parâmetro antes de olhar o valor, então um NULL "sem tipo"
// quebraria inserts em colunas INTEGER.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Integer(Option<i64>),
    Real(Option<f64>),
    Text(Option<String>),
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Integer(Some(v))
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Integer(Some(v as i64))
    }
}

impl From<Option<i64>> for SqlParam {
    fn from(v: Option<i64>) -> Self {
        SqlParam::Integer(v)
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Real(Some(v))
    }
}

impl From<Option<f64>> for SqlParam {
    fn from(v: Option<f64>) -> Self {
        SqlParam::Real(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(Some(v.to_string()))
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(Some(v))
    }
}

impl From<Option<String>> for SqlParam {
    fn from(v: Option<String>) -> Self {
        SqlParam::Text(v)
    }
}

impl From<Option<&str>> for SqlParam {
    fn from(v: Option<&str>) -> Self {
        SqlParam::Text(v.map(str::to_string))
    }
}

impl From<&String> for SqlParam {
    fn from(v: &String) -> Self {
        SqlParam::Text(Some(v.clone()))
    }
}

// Monta um Vec<SqlParam> a partir de valores heterogêneos, no espírito do
// `params![]` do rusqlite.
#[macro_export]
macro_rules! params {
    () => { Vec::<$crate::db::datasource::SqlParam>::new() };
    ($($p:expr),+ $(,)?) => {
        vec![$($crate::db::datasource::SqlParam::from($p)),+]
    };
}

// Valor de uma célula do resultado, já normalizado entre os dialetos.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            SqlValue::Real(v) => Some(*v as i64),
            SqlValue::Text(s) => s.parse().ok(),
            SqlValue::Null => None,
        }
    }

    // Coerção numérica permissiva: valores guardados como texto viram f64,
    // texto não-numérico (e NULL) contribui com 0.0. As agregações de
    // faturas dependem exatamente desse comportamento.
    pub fn as_f64_lossy(&self) -> f64 {
        match self {
            SqlValue::Integer(v) => *v as f64,
            SqlValue::Real(v) => *v,
            SqlValue::Text(s) => s.trim().parse().unwrap_or(0.0),
            SqlValue::Null => 0.0,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

// ============================================================================
// 2. LINHA NORMALIZADA
// ============================================================================

// Uma linha do resultado como mapa coluna -> valor. Os getters devolvem
// sqlx::Error para que os repositórios continuem usando `?` normalmente.
#[derive(Debug, Clone, Default)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>,
}

impl SqlRow {
    pub fn value(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, value)| value)
    }

    fn required(&self, name: &str) -> Result<&SqlValue, sqlx::Error> {
        self.value(name)
            .ok_or_else(|| sqlx::Error::ColumnNotFound(name.to_string()))
    }

    pub fn i64(&self, name: &str) -> Result<i64, sqlx::Error> {
        self.required(name)?.as_i64().ok_or_else(|| decode_error(name))
    }

    pub fn opt_i64(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(SqlValue::as_i64)
    }

    pub fn f64_lossy(&self, name: &str) -> f64 {
        self.value(name).map(SqlValue::as_f64_lossy).unwrap_or(0.0)
    }

    pub fn text(&self, name: &str) -> Result<String, sqlx::Error> {
        match self.required(name)? {
            SqlValue::Text(s) => Ok(s.clone()),
            SqlValue::Integer(v) => Ok(v.to_string()),
            SqlValue::Real(v) => Ok(v.to_string()),
            SqlValue::Null => Err(decode_error(name)),
        }
    }

    pub fn opt_text(&self, name: &str) -> Option<String> {
        match self.value(name)? {
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Integer(v) => Some(v.to_string()),
            SqlValue::Real(v) => Some(v.to_string()),
            SqlValue::Null => None,
        }
    }
}

fn decode_error(column: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("valor nulo ou de tipo inesperado na coluna `{column}`").into(),
    }
}

// Resultado de um statement que não retorna linhas.
#[derive(Debug, Clone, Copy)]
pub struct ExecOutcome {
    // Só o SQLite informa o id sem RETURNING; use `DataSource::insert`
    // quando o id for necessário nos dois dialetos.
    pub last_insert_id: Option<i64>,
    pub rows_affected: u64,
}

// ============================================================================
// 3. A FONTE DE DADOS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

#[derive(Clone)]
enum Pool {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

#[derive(Clone)]
pub struct DataSource {
    pool: Pool,
}

impl DataSource {
    // O dialeto vem do esquema da URL: postgres:// ou postgresql:// ligam o
    // driver Postgres, qualquer outra coisa é tratada como SQLite (inclusive
    // um caminho de arquivo puro, como "crm.db").
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .connect(database_url)
                .await?;
            return Ok(DataSource { pool: Pool::Postgres(pool) });
        }

        let normalized = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite:{database_url}")
        };
        let options = SqliteConnectOptions::from_str(&normalized)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Um banco em memória existe por conexão; o pool precisa de uma só.
        let max_connections = if normalized.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(DataSource { pool: Pool::Sqlite(pool) })
    }

    pub fn dialect(&self) -> Dialect {
        match &self.pool {
            Pool::Sqlite(_) => Dialect::Sqlite,
            Pool::Postgres(_) => Dialect::Postgres,
        }
    }

    pub async fn close(&self) {
        match &self.pool {
            Pool::Sqlite(pool) => pool.close().await,
            Pool::Postgres(pool) => pool.close().await,
        }
    }

    // INSERT/UPDATE/DELETE/DDL.
    pub async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<ExecOutcome, sqlx::Error> {
        match &self.pool {
            Pool::Sqlite(pool) => {
                let result = bind_sqlite(sql, params).execute(pool).await?;
                Ok(ExecOutcome {
                    last_insert_id: Some(result.last_insert_rowid()),
                    rows_affected: result.rows_affected(),
                })
            }
            Pool::Postgres(pool) => {
                let converted = convert_placeholders(sql);
                let result = bind_postgres(&converted, params).execute(pool).await?;
                Ok(ExecOutcome {
                    last_insert_id: None,
                    rows_affected: result.rows_affected(),
                })
            }
        }
    }

    // INSERT com captura do id gerado. Recebe o statement SEM cláusula
    // RETURNING; ela é acrescentada aqui quando o dialeto exige.
    pub async fn insert(&self, sql: &str, params: &[SqlParam]) -> Result<i64, sqlx::Error> {
        match &self.pool {
            Pool::Sqlite(pool) => {
                let result = bind_sqlite(sql, params).execute(pool).await?;
                Ok(result.last_insert_rowid())
            }
            Pool::Postgres(pool) => {
                let converted = format!("{} RETURNING id", convert_placeholders(sql));
                let row = bind_postgres(&converted, params).fetch_one(pool).await?;
                let id: i32 = row.try_get(0)?;
                Ok(id as i64)
            }
        }
    }

    pub async fn fetch_all(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>, sqlx::Error> {
        match &self.pool {
            Pool::Sqlite(pool) => {
                let rows = bind_sqlite(sql, params).fetch_all(pool).await?;
                rows.iter().map(sqlite_row).collect()
            }
            Pool::Postgres(pool) => {
                let converted = convert_placeholders(sql);
                let rows = bind_postgres(&converted, params).fetch_all(pool).await?;
                rows.iter().map(pg_row).collect()
            }
        }
    }

    pub async fn fetch_optional(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<SqlRow>, sqlx::Error> {
        match &self.pool {
            Pool::Sqlite(pool) => {
                let row = bind_sqlite(sql, params).fetch_optional(pool).await?;
                row.as_ref().map(sqlite_row).transpose()
            }
            Pool::Postgres(pool) => {
                let converted = convert_placeholders(sql);
                let row = bind_postgres(&converted, params).fetch_optional(pool).await?;
                row.as_ref().map(pg_row).transpose()
            }
        }
    }
}

// ============================================================================
// 4. TRADUÇÃO DE PLACEHOLDERS E BINDING
// ============================================================================

// Reescreve cada `?` como `$1..$n`, da esquerda para a direita. A troca é
// textual: um `?` dentro de literal de string também seria trocado, então as
// queries canônicas não usam `?` em literais.
pub fn convert_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut position = 0usize;
    for ch in sql.chars() {
        if ch == '?' {
            position += 1;
            out.push('$');
            out.push_str(&position.to_string());
        } else {
            out.push(ch);
        }
    }
    out
}

fn bind_sqlite<'q>(
    sql: &'q str,
    params: &'q [SqlParam],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            SqlParam::Integer(v) => query.bind(*v),
            SqlParam::Real(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.as_deref()),
        };
    }
    query
}

fn bind_postgres<'q>(
    sql: &'q str,
    params: &'q [SqlParam],
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            SqlParam::Integer(v) => query.bind(*v),
            SqlParam::Real(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.as_deref()),
        };
    }
    query
}

// ============================================================================
// 5. NORMALIZAÇÃO DO RESULTADO
// ============================================================================

// SQLite: o tipo útil é o do VALOR (runtime), não o declarado na coluna —
// expressões como COUNT(*) nem têm tipo declarado.
fn sqlite_row(row: &SqliteRow) -> Result<SqlRow, sqlx::Error> {
    let mut columns = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get::<i64, _>(index)?),
                "REAL" => SqlValue::Real(row.try_get::<f64, _>(index)?),
                _ => SqlValue::Text(row.try_get::<String, _>(index)?),
            }
        };
        columns.push((column.name().to_string(), value));
    }
    Ok(SqlRow { columns })
}

// Postgres: aqui o tipo declarado da coluna é confiável. Datas e timestamps
// viram texto ISO-8601 para casar com o que o SQLite devolve.
fn pg_row(row: &PgRow) -> Result<SqlRow, sqlx::Error> {
    let mut columns = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match column.type_info().name() {
                "INT2" => SqlValue::Integer(row.try_get::<i16, _>(index)? as i64),
                "INT4" => SqlValue::Integer(row.try_get::<i32, _>(index)? as i64),
                "INT8" => SqlValue::Integer(row.try_get::<i64, _>(index)?),
                "FLOAT4" => SqlValue::Real(row.try_get::<f32, _>(index)? as f64),
                "FLOAT8" => SqlValue::Real(row.try_get::<f64, _>(index)?),
                "BOOL" => SqlValue::Integer(row.try_get::<bool, _>(index)? as i64),
                "DATE" => SqlValue::Text(row.try_get::<chrono::NaiveDate, _>(index)?.to_string()),
                "TIMESTAMP" => SqlValue::Text(
                    row.try_get::<chrono::NaiveDateTime, _>(index)?
                        .format("%Y-%m-%dT%H:%M:%S%.3f")
                        .to_string(),
                ),
                "TIMESTAMPTZ" => SqlValue::Text(
                    row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)?
                        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                ),
                _ => SqlValue::Text(row.try_get::<String, _>(index)?),
            }
        };
        columns.push((column.name().to_string(), value));
    }
    Ok(SqlRow { columns })
}

// Violações de UNIQUE viram erro de validação nos repositórios.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

// "duplicate column name" (SQLite) / 42701 (Postgres): a migração aditiva
// já foi aplicada, pode seguir em frente.
pub fn is_duplicate_column(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_lowercase();
            message.contains("duplicate column")
                || db_err.code().as_deref() == Some("42701")
        }
        _ => false,
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    async fn memory() -> DataSource {
        DataSource::connect("sqlite::memory:").await.unwrap()
    }

    #[test]
    fn placeholders_sao_numerados_da_esquerda_para_a_direita() {
        assert_eq!(convert_placeholders("SELECT 1"), "SELECT 1");
        assert_eq!(
            convert_placeholders("SELECT * FROM t WHERE a = ? AND b = ?"),
            "SELECT * FROM t WHERE a = $1 AND b = $2"
        );
        assert_eq!(
            convert_placeholders("INSERT INTO t (a, b, c) VALUES (?, ?, ?)"),
            "INSERT INTO t (a, b, c) VALUES ($1, $2, $3)"
        );
    }

    #[test]
    fn placeholders_acima_de_nove_continuam_corretos() {
        let sql = convert_placeholders(&"?, ".repeat(11));
        assert!(sql.contains("$10"));
        assert!(sql.contains("$11"));
    }

    #[test]
    fn coercao_numerica_permissiva() {
        assert_eq!(SqlValue::Integer(3).as_f64_lossy(), 3.0);
        assert_eq!(SqlValue::Real(2.5).as_f64_lossy(), 2.5);
        assert_eq!(SqlValue::Text("12.75".into()).as_f64_lossy(), 12.75);
        assert_eq!(SqlValue::Text(" 8 ".into()).as_f64_lossy(), 8.0);
        assert_eq!(SqlValue::Text("abc".into()).as_f64_lossy(), 0.0);
        assert_eq!(SqlValue::Null.as_f64_lossy(), 0.0);
    }

    #[tokio::test]
    async fn insert_devolve_ids_sequenciais_e_linhas_normalizadas() {
        let db = memory().await;
        db.execute(
            "CREATE TABLE amostra (id INTEGER PRIMARY KEY AUTOINCREMENT, nome TEXT, valor REAL, extra TEXT)",
            &[],
        )
        .await
        .unwrap();

        let first = db
            .insert(
                "INSERT INTO amostra (nome, valor, extra) VALUES (?, ?, ?)",
                &params!["alfa", 10.5, Option::<&str>::None],
            )
            .await
            .unwrap();
        let second = db
            .insert(
                "INSERT INTO amostra (nome, valor, extra) VALUES (?, ?, ?)",
                &params!["beta", 2.0, "x"],
            )
            .await
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);

        let rows = db
            .fetch_all("SELECT id, nome, valor, extra FROM amostra ORDER BY id", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].i64("id").unwrap(), 1);
        assert_eq!(rows[0].text("nome").unwrap(), "alfa");
        assert_eq!(rows[0].value("valor"), Some(&SqlValue::Real(10.5)));
        assert!(rows[0].value("extra").unwrap().is_null());
        assert_eq!(rows[1].opt_text("extra").as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn execute_conta_linhas_afetadas() {
        let db = memory().await;
        db.execute("CREATE TABLE n (id INTEGER PRIMARY KEY, v INTEGER)", &[])
            .await
            .unwrap();
        for v in [1i64, 2, 3] {
            db.insert("INSERT INTO n (v) VALUES (?)", &params![v]).await.unwrap();
        }
        let outcome = db
            .execute("UPDATE n SET v = v + 1 WHERE v >= ?", &params![2i64])
            .await
            .unwrap();
        assert_eq!(outcome.rows_affected, 2);
    }

    #[tokio::test]
    async fn parametro_nulo_tipado_faz_roundtrip() {
        let db = memory().await;
        db.execute("CREATE TABLE opt (id INTEGER PRIMARY KEY, refid INTEGER)", &[])
            .await
            .unwrap();
        db.insert("INSERT INTO opt (refid) VALUES (?)", &params![Option::<i64>::None])
            .await
            .unwrap();
        db.insert("INSERT INTO opt (refid) VALUES (?)", &params![Some(7i64)])
            .await
            .unwrap();

        let rows = db.fetch_all("SELECT refid FROM opt ORDER BY id", &[]).await.unwrap();
        assert_eq!(rows[0].opt_i64("refid"), None);
        assert_eq!(rows[1].opt_i64("refid"), Some(7));
    }

    #[tokio::test]
    async fn expressoes_agregadas_chegam_como_inteiro() {
        let db = memory().await;
        db.execute("CREATE TABLE c (id INTEGER PRIMARY KEY)", &[]).await.unwrap();
        db.insert("INSERT INTO c DEFAULT VALUES", &[]).await.unwrap();
        db.insert("INSERT INTO c DEFAULT VALUES", &[]).await.unwrap();

        let row = db
            .fetch_optional("SELECT COUNT(*) AS total FROM c", &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.i64("total").unwrap(), 2);
    }

    #[tokio::test]
    async fn violacao_de_unique_e_reconhecida() {
        let db = memory().await;
        db.execute("CREATE TABLE u (id INTEGER PRIMARY KEY, nome TEXT UNIQUE)", &[])
            .await
            .unwrap();
        db.insert("INSERT INTO u (nome) VALUES (?)", &params!["unico"]).await.unwrap();
        let err = db
            .insert("INSERT INTO u (nome) VALUES (?)", &params!["unico"])
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }
}
