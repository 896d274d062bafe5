//! PostgreSQL connection implementation

use crate::tls::{SslMode, build_tls_connector};
use async_trait::async_trait;
use bytes::BytesMut;
use flexo_core::{
    ColumnMeta, Connection, FlexoError, QueryResult, Result, Row, StatementResult, Transaction,
    Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio_postgres::{
    Client, NoTls, Row as PgRow, Statement,
    types::{FromSql, ToSql, Type},
};

fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let code = db_error.code();
    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail() {
        if !detail.trim().is_empty() {
            message.push_str(&format!(" (detail: {})", detail));
        }
    }

    if let Some(hint) = db_error.hint() {
        if !hint.trim().is_empty() {
            message.push_str(&format!(" (hint: {})", hint));
        }
    }

    match code.code() {
        "22001" => format!("value too long for column: {}", message),
        "22007" => format!("invalid datetime format: {}", message),
        "22P02" => format!("invalid input syntax: {}", message),
        "42P01" => format!("undefined table: {}", message),
        _ => format!("{} (code: {:?})", message, code),
    }
}

/// Parameters for opening a session
#[derive(Debug, Clone)]
pub struct PostgresConnectOptions {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl_mode: SslMode,
}

/// PostgreSQL connection wrapper
pub struct PostgresConnection {
    client: Arc<Mutex<Client>>,
    closed: AtomicBool,
}

impl PostgresConnection {
    /// Connect to a PostgreSQL database.
    ///
    /// Must be called from inside a tokio runtime; the socket task is spawned
    /// onto it and lives as long as the client.
    pub async fn connect(options: &PostgresConnectOptions) -> Result<Self> {
        tracing::info!(
            host = %options.host,
            port = %options.port,
            database = %options.database,
            ssl_mode = %options.ssl_mode,
            "connecting to PostgreSQL database"
        );

        let mut config = tokio_postgres::Config::new();
        config
            .host(&options.host)
            .port(options.port)
            .dbname(&options.database)
            .user(&options.user)
            .password(&options.password)
            .ssl_mode(options.ssl_mode.to_pg());

        let client = if options.ssl_mode.uses_tls() {
            let tls = build_tls_connector(options.ssl_mode)
                .map_err(|e| FlexoError::Connection(e.to_string()))?;
            let (client, connection) = config.connect(tls).await.map_err(|e| {
                FlexoError::Connection(format!(
                    "Failed to connect to PostgreSQL: {}",
                    format_postgres_error(&e)
                ))
            })?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "PostgreSQL connection error");
                }
            });
            client
        } else {
            let (client, connection) = config.connect(NoTls).await.map_err(|e| {
                FlexoError::Connection(format!(
                    "Failed to connect to PostgreSQL: {}",
                    format_postgres_error(&e)
                ))
            })?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "PostgreSQL connection error");
                }
            });
            client
        };

        tracing::info!(
            host = %options.host,
            database = %options.database,
            "PostgreSQL connection established"
        );
        Ok(Self {
            client: Arc::new(Mutex::new(client)),
            closed: AtomicBool::new(false),
        })
    }
}

/// Owned parameter values for tokio-postgres.
#[derive(Debug)]
enum PgValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Date(chrono::NaiveDate),
}

#[derive(Debug)]
struct PgFallbackString(String);

impl<'a> FromSql<'a> for PgFallbackString {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        let text = String::from_utf8(raw.to_vec())?;
        Ok(Self(text))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

impl PgValue {
    /// Convert a value into the variant matching the target column type so
    /// tokio-postgres writes the right binary width (4 bytes for INT4).
    ///
    /// Integers that do not fit the column are rejected rather than wrapped.
    fn from_value_for_type(value: &Value, target_type: &Type) -> Result<Self> {
        Ok(match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int64(v) => Self::coerce_int(*v, target_type)?,
            Value::Float64(v) => match *target_type {
                Type::FLOAT4 => PgValue::Float32(*v as f32),
                Type::INT2 | Type::INT4 | Type::INT8 => {
                    Self::coerce_int(v.trunc() as i64, target_type)?
                }
                _ => PgValue::Float64(*v),
            },
            Value::String(v) => Self::coerce_string(v, target_type)?,
            Value::Date(v) => PgValue::Date(*v),
        })
    }

    fn coerce_int(value: i64, target_type: &Type) -> Result<Self> {
        let out_of_range = || {
            FlexoError::Query(format!(
                "integer {} is out of range for column type {}",
                value,
                target_type.name()
            ))
        };
        Ok(match *target_type {
            Type::INT2 => PgValue::Int16(i16::try_from(value).map_err(|_| out_of_range())?),
            Type::INT4 => PgValue::Int32(i32::try_from(value).map_err(|_| out_of_range())?),
            Type::FLOAT4 => PgValue::Float32(value as f32),
            Type::FLOAT8 => PgValue::Float64(value as f64),
            Type::TEXT | Type::VARCHAR => PgValue::String(value.to_string()),
            _ => PgValue::Int64(value),
        })
    }

    fn coerce_string(value: &str, target_type: &Type) -> Result<Self> {
        match *target_type {
            Type::DATE => Ok(chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(PgValue::Date)
                .unwrap_or(PgValue::Null)),
            Type::INT2 | Type::INT4 | Type::INT8 => match value.trim().parse::<i64>() {
                Ok(v) => Self::coerce_int(v, target_type),
                Err(_) => Ok(PgValue::Null),
            },
            _ => Ok(PgValue::String(value.to_string())),
        }
    }

    /// Fallback used when the statement does not report a parameter type
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int64(v) => PgValue::Int64(*v),
            Value::Float64(v) => PgValue::Float64(*v),
            Value::String(v) => PgValue::String(v.clone()),
            Value::Date(v) => PgValue::Date(*v),
        }
    }
}

impl ToSql for PgValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<postgres_types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            PgValue::Null => Ok(postgres_types::IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int16(v) => v.to_sql(ty, out),
            PgValue::Int32(v) => v.to_sql(ty, out),
            PgValue::Int64(v) => v.to_sql(ty, out),
            PgValue::Float32(v) => v.to_sql(ty, out),
            PgValue::Float64(v) => v.to_sql(ty, out),
            PgValue::String(v) => v.to_sql(ty, out),
            PgValue::Date(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

fn bind_params(statement: &Statement, params: &[Value]) -> Result<Vec<PgValue>> {
    let param_types = statement.params();
    params
        .iter()
        .enumerate()
        .map(|(i, value)| match param_types.get(i) {
            Some(target_type) => PgValue::from_value_for_type(value, target_type),
            None => Ok(PgValue::from_value(value)),
        })
        .collect()
}

async fn prepare(client: &Client, sql: &str) -> Result<Statement> {
    client.prepare(sql).await.map_err(|e| {
        FlexoError::Query(format!(
            "Failed to prepare statement: {}",
            format_postgres_error(&e)
        ))
    })
}

async fn run_execute(client: &Client, sql: &str, params: &[Value]) -> Result<StatementResult> {
    let statement = prepare(client, sql).await?;
    let pg_params = bind_params(&statement, params)?;
    let param_refs: Vec<&(dyn ToSql + Sync)> =
        pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

    let affected_rows = client
        .execute(&statement, &param_refs)
        .await
        .map_err(|e| {
            FlexoError::Query(format!(
                "Failed to execute statement: {}",
                format_postgres_error(&e)
            ))
        })?;

    tracing::debug!(affected_rows, "statement executed");
    Ok(StatementResult { affected_rows })
}

async fn run_query(client: &Client, sql: &str, params: &[Value]) -> Result<QueryResult> {
    let statement = prepare(client, sql).await?;
    let pg_params = bind_params(&statement, params)?;
    let param_refs: Vec<&(dyn ToSql + Sync)> =
        pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

    let pg_rows = client
        .query(&statement, &param_refs)
        .await
        .map_err(|e| {
            FlexoError::Query(format!(
                "Failed to execute query: {}",
                format_postgres_error(&e)
            ))
        })?;

    // Column metadata comes from the statement so empty results still carry it
    let columns: Vec<ColumnMeta> = statement
        .columns()
        .iter()
        .map(|col| ColumnMeta {
            name: col.name().to_string(),
            data_type: col.type_().name().to_string(),
        })
        .collect();

    let rows: Vec<Row> = pg_rows
        .iter()
        .map(|pg_row| Row::new((0..columns.len()).map(|idx| postgres_to_value(pg_row, idx)).collect()))
        .collect();

    tracing::debug!(row_count = rows.len(), "query executed");

    Ok(QueryResult { columns, rows })
}

/// PostgreSQL transaction wrapper
///
/// Runs on the connection's single session between `BEGIN` and
/// `COMMIT`/`ROLLBACK`.
pub struct PostgresTransaction {
    client: Arc<Mutex<Client>>,
    finished: bool,
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("PostgreSQL transaction dropped without commit or rollback");
        }
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("committing PostgreSQL transaction");
        let client = self.client.lock().await;
        client.batch_execute("COMMIT").await.map_err(|e| {
            FlexoError::Query(format!(
                "Failed to commit transaction: {}",
                format_postgres_error(&e)
            ))
        })?;
        drop(client);
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("rolling back PostgreSQL transaction");
        let client = self.client.lock().await;
        client.batch_execute("ROLLBACK").await.map_err(|e| {
            FlexoError::Query(format!(
                "Failed to rollback transaction: {}",
                format_postgres_error(&e)
            ))
        })?;
        drop(client);
        self.finished = true;
        Ok(())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let client = self.client.lock().await;
        run_execute(&client, sql, params).await
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgresql"
    }

    fn dialect_id(&self) -> Option<&'static str> {
        Some("postgresql")
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let client = self.client.lock().await;
        run_execute(&client, sql, params).await
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let client = self.client.lock().await;
        run_query(&client, sql, params).await
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        tracing::debug!("beginning PostgreSQL transaction");
        let client = self.client.lock().await;
        client.batch_execute("BEGIN").await.map_err(|e| {
            FlexoError::Query(format!(
                "Failed to begin transaction: {}",
                format_postgres_error(&e)
            ))
        })?;
        drop(client);

        Ok(Box::new(PostgresTransaction {
            client: Arc::clone(&self.client),
            finished: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        tracing::info!("closing PostgreSQL connection");
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.client.try_lock().is_ok_and(|c| c.is_closed())
    }
}

/// Convert PostgreSQL row value to our Value type
fn postgres_to_value(row: &PgRow, idx: usize) -> Value {
    let type_name = row.columns()[idx].type_().name();

    match type_name {
        "bool" => row
            .try_get::<_, Option<bool>>(idx)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::Int64(v.into()))
            .unwrap_or(Value::Null),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::Int64(v.into()))
            .unwrap_or(Value::Null),
        "int8" => row
            .try_get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(Value::Int64)
            .unwrap_or(Value::Null),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::Float64(v.into()))
            .unwrap_or(Value::Null),
        "float8" => row
            .try_get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(Value::Float64)
            .unwrap_or(Value::Null),
        "text" | "varchar" | "char" | "bpchar" | "name" => row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
        "date" => row
            .try_get::<_, Option<chrono::NaiveDate>>(idx)
            .ok()
            .flatten()
            .map(Value::Date)
            .unwrap_or(Value::Null),
        "timestamp" => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::Date(v.date()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<_, Option<PgFallbackString>>(idx)
            .ok()
            .flatten()
            .map(|value| Value::String(value.0))
            .unwrap_or(Value::Null),
    }
}
