//! Relational table store
//!
//! Keeps each logical table in a SQL table with a surrogate `id` key plus
//! one column per registry field, named by its internal identifier.

use crate::config::PostgresSettings;
use async_trait::async_trait;
use flexo_core::{
    BackendKind, Connection, FieldKind, FlexoError, Result, SaveReport, Table, TableBackend,
    TableId, Transaction, Value, normalize, schema,
};
use flexo_driver_postgres::PostgresConnection;
use flexo_driver_sqlite::SqliteConnection;
use std::path::Path;
use std::sync::Arc;

/// SQL flavour spoken by the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn from_dialect_id(id: Option<&str>) -> Result<Self> {
        match id {
            Some("postgresql") | Some("postgres") => Ok(Dialect::Postgres),
            Some("sqlite") => Ok(Dialect::Sqlite),
            other => Err(FlexoError::Schema(format!(
                "unsupported SQL dialect: {}",
                other.unwrap_or("unknown")
            ))),
        }
    }

    pub fn quote_identifier(self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    /// Placeholder for the 1-based parameter `n`
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", n),
            Dialect::Sqlite => format!("?{}", n),
        }
    }

    fn surrogate_key(self) -> &'static str {
        match self {
            Dialect::Postgres => "id SERIAL PRIMARY KEY",
            Dialect::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }
}

/// DDL for one logical table
pub fn create_table_sql(dialect: Dialect, table: &TableId) -> String {
    let mut column_defs = vec![format!("    {}", dialect.surrogate_key())];
    for field in schema::fields() {
        let sql_type = match (field.kind(), field.max_length()) {
            (FieldKind::Date, _) => "DATE".to_string(),
            (FieldKind::Quantity, _) => "INTEGER".to_string(),
            (FieldKind::Text, Some(len)) => format!("VARCHAR({})", len),
            (FieldKind::Text, None) => "TEXT".to_string(),
        };
        column_defs.push(format!(
            "    {} {}",
            dialect.quote_identifier(field.internal_id()),
            sql_type
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        dialect.quote_identifier(&table.physical_name()),
        column_defs.join(",\n")
    )
}

fn insert_sql(dialect: Dialect, table: &TableId) -> String {
    let columns: Vec<String> = schema::fields()
        .iter()
        .map(|f| dialect.quote_identifier(f.internal_id()))
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|n| dialect.placeholder(n)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_identifier(&table.physical_name()),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Table store over a single long-lived SQL connection
pub struct RelationalStore {
    connection: Arc<dyn Connection>,
    dialect: Dialect,
}

impl RelationalStore {
    /// Wrap an open connection and make sure all six tables exist
    pub async fn new(connection: Arc<dyn Connection>) -> Result<Self> {
        let dialect = Dialect::from_dialect_id(connection.dialect_id())?;
        let store = Self {
            connection,
            dialect,
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Connect to PostgreSQL; fails with a configuration error naming any
    /// missing setting before a connection is attempted
    pub async fn connect_postgres(settings: &PostgresSettings) -> Result<Self> {
        let options = settings.connect_options()?;
        let connection = PostgresConnection::connect(&options).await?;
        Self::new(Arc::new(connection)).await
    }

    pub async fn open_sqlite(path: &Path) -> Result<Self> {
        let path = path.to_str().ok_or_else(|| {
            FlexoError::Configuration(format!("SQLite path is not valid UTF-8: {}", path.display()))
        })?;
        let connection = SqliteConnection::open(path)?;
        Self::new(Arc::new(connection)).await
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Create any missing tables; safe to call repeatedly
    #[tracing::instrument(skip(self), fields(dialect = ?self.dialect))]
    pub async fn ensure_schema(&self) -> Result<()> {
        for table in TableId::all() {
            self.connection
                .execute(&create_table_sql(self.dialect, &table), &[])
                .await?;
        }
        tracing::debug!("relational schema ensured");
        Ok(())
    }

    async fn replace_rows(
        &self,
        tx: &dyn Transaction,
        table: &TableId,
        data: &Table,
    ) -> Result<usize> {
        let delete = format!(
            "DELETE FROM {}",
            self.dialect.quote_identifier(&table.physical_name())
        );
        tx.execute(&delete, &[]).await?;

        let insert = insert_sql(self.dialect, table);
        for record in data.records() {
            let params: Vec<Value> = schema::fields()
                .iter()
                .map(|f| record.storage_value(*f))
                .collect();
            tx.execute(&insert, &params).await?;
        }
        Ok(data.len())
    }
}

#[async_trait]
impl TableBackend for RelationalStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    #[tracing::instrument(skip(self), fields(table = %table.physical_name()))]
    async fn load(&self, table: &TableId) -> Result<Table> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY id",
            self.dialect.quote_identifier(&table.physical_name())
        );
        let mut raw = self.connection.query(&sql, &[]).await?.into_raw_table();
        raw.rename_columns(schema::display_name_for);

        let table = normalize(&raw);
        tracing::debug!(rows = table.len(), "loaded relational table");
        Ok(table)
    }

    #[tracing::instrument(skip(self, data), fields(table = %table.physical_name(), rows = data.len()))]
    async fn save(&self, table: &TableId, data: &Table) -> Result<SaveReport> {
        let tx = self.connection.begin_transaction().await?;
        let replaced = self.replace_rows(tx.as_ref(), table, data).await;

        match replaced {
            Ok(rows_written) => {
                tx.commit().await?;
                tracing::info!(rows_written, "saved relational table");
                Ok(SaveReport {
                    table: *table,
                    rows_written,
                    backend: BackendKind::Relational,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "save failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexo_core::{QueryResult, Record, Section, StatementResult, Subsection};
    use std::sync::Mutex;

    /// Records every statement; inserts fail once `fail_after_inserts` have run
    struct TrackingConnection {
        dialect: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_after_inserts: Option<usize>,
    }

    impl TrackingConnection {
        fn new(dialect: &'static str) -> Self {
            Self {
                dialect,
                log: Arc::new(Mutex::new(Vec::new())),
                fail_after_inserts: None,
            }
        }

        fn failing_after(mut self, inserts: usize) -> Self {
            self.fail_after_inserts = Some(inserts);
            self
        }

        fn executed_sql(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    struct TrackingTransaction {
        log: Arc<Mutex<Vec<String>>>,
        fail_after_inserts: Option<usize>,
    }

    #[async_trait]
    impl Transaction for TrackingTransaction {
        async fn commit(self: Box<Self>) -> Result<()> {
            self.log.lock().unwrap().push("COMMIT".into());
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            self.log.lock().unwrap().push("ROLLBACK".into());
            Ok(())
        }

        async fn execute(&self, sql: &str, _params: &[Value]) -> Result<StatementResult> {
            let mut log = self.log.lock().unwrap();
            let inserts = log.iter().filter(|s| s.starts_with("INSERT")).count();
            if sql.starts_with("INSERT") && self.fail_after_inserts.is_some_and(|n| inserts >= n) {
                return Err(FlexoError::Query("value too long for column".into()));
            }
            log.push(sql.to_string());
            Ok(StatementResult { affected_rows: 1 })
        }
    }

    #[async_trait]
    impl Connection for TrackingConnection {
        fn driver_name(&self) -> &str {
            self.dialect
        }

        fn dialect_id(&self) -> Option<&'static str> {
            Some(self.dialect)
        }

        async fn execute(&self, sql: &str, _params: &[Value]) -> Result<StatementResult> {
            self.log.lock().unwrap().push(sql.to_string());
            Ok(StatementResult { affected_rows: 0 })
        }

        async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
            Ok(QueryResult::empty())
        }

        async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
            self.log.lock().unwrap().push("BEGIN".into());
            Ok(Box::new(TrackingTransaction {
                log: Arc::clone(&self.log),
                fail_after_inserts: self.fail_after_inserts,
            }))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }

        fn is_closed(&self) -> bool {
            false
        }
    }

    fn invoices() -> TableId {
        TableId::new(Section::Suppliers, Subsection::Invoices)
    }

    fn three_records() -> Table {
        (0..3)
            .map(|i| Record {
                order_number: format!("PO-{}", i),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn create_table_sql_uses_dialect_key_and_registry_types() {
        let sql = create_table_sql(Dialect::Postgres, &invoices());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"facturas_proveedores\""));
        assert!(sql.contains("id SERIAL PRIMARY KEY"));
        assert!(sql.contains("\"numPedido\" VARCHAR(50)"));
        assert!(sql.contains("\"nombreEmisor\" VARCHAR(200)"));
        assert!(sql.contains("\"fechaPedido\" DATE"));
        assert!(sql.contains("\"cantidad\" INTEGER"));
        assert!(sql.contains("\"descripcion\" TEXT"));
        assert!(sql.contains("\"pdfLink\" VARCHAR(500)"));

        let sql = create_table_sql(Dialect::Sqlite, &invoices());
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
    }

    #[test]
    fn insert_sql_uses_dialect_placeholders() {
        let pg = insert_sql(Dialect::Postgres, &invoices());
        assert!(pg.contains("$1, $2"));
        assert!(pg.ends_with("$14)"));
        let lite = insert_sql(Dialect::Sqlite, &invoices());
        assert!(lite.ends_with("?14)"));
    }

    #[test]
    fn unknown_dialects_are_rejected() {
        assert!(Dialect::from_dialect_id(Some("mysql")).is_err());
        assert!(Dialect::from_dialect_id(None).is_err());
    }

    #[tokio::test]
    async fn construction_creates_all_six_tables() {
        let conn = Arc::new(TrackingConnection::new("postgresql"));
        RelationalStore::new(conn.clone()).await.unwrap();
        let sqls = conn.executed_sql();
        assert_eq!(sqls.len(), 6);
        assert!(sqls.iter().all(|s| s.starts_with("CREATE TABLE IF NOT EXISTS")));
    }

    #[tokio::test]
    async fn save_deletes_then_inserts_inside_a_transaction() {
        let conn = Arc::new(TrackingConnection::new("postgresql"));
        let store = RelationalStore::new(conn.clone()).await.unwrap();

        let report = store.save(&invoices(), &three_records()).await.unwrap();
        assert_eq!(report.rows_written, 3);

        let sqls: Vec<String> = conn.executed_sql().into_iter().skip(6).collect();
        assert_eq!(sqls[0], "BEGIN");
        assert_eq!(sqls[1], "DELETE FROM \"facturas_proveedores\"");
        assert_eq!(sqls.iter().filter(|s| s.starts_with("INSERT")).count(), 3);
        assert_eq!(sqls.last().map(String::as_str), Some("COMMIT"));
    }

    #[tokio::test]
    async fn failed_insert_rolls_back_and_reports_the_error() {
        let conn = Arc::new(TrackingConnection::new("sqlite").failing_after(1));
        let store = RelationalStore::new(conn.clone()).await.unwrap();

        let err = store.save(&invoices(), &three_records()).await.unwrap_err();
        assert!(matches!(err, FlexoError::Query(_)));

        let sqls = conn.executed_sql();
        assert_eq!(sqls.last().map(String::as_str), Some("ROLLBACK"));
        assert!(!sqls.iter().any(|s| s == "COMMIT"));
    }
}
