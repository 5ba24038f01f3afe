//! PostgreSQL database client implementation.
//!
//! Provides `PostgresConnector` and the `PostgresClient` session it opens, a
//! single `sqlx::PgConnection` per handle.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, Connector, DatabaseClient, QueryResult, Row, Value};
use crate::error::{MddbError, Result};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgRow, PgTypeInfo};
use sqlx::query::Query;
use sqlx::{
    Column as SqlxColumn, Connection, Executor, Postgres, Row as SqlxRow, Statement, Type,
    TypeInfo,
};
use std::time::Instant;
use tracing::{debug, info};

/// Reported to the server as `application_name`.
const APPLICATION_NAME: &str = "mddb";

/// Opens `PostgresClient` sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresConnector;

#[async_trait]
impl Connector for PostgresConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        let client = PostgresClient::connect(config).await?;
        Ok(Box::new(client))
    }
}

/// PostgreSQL database session.
#[derive(Debug)]
pub struct PostgresClient {
    conn: Option<PgConnection>,
}

impl PostgresClient {
    /// Opens a connection with the given credentials. No retry is attempted.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let options = connect_options(config)?;

        debug!("Connecting to {}", config.display_string());
        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(map_connection_error)?;
        info!("Connected to {}", config.display_string());

        Ok(Self { conn: Some(conn) })
    }

    fn session(&mut self) -> Result<&mut PgConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| MddbError::connection("Connection is closed"))
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute_query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let conn = self.session()?;
        debug!(params = params.len(), "query: {sql}");

        let start = Instant::now();

        // Preparing with the parameter types we are about to bind keeps the
        // column metadata available even when no rows come back.
        let param_types: Vec<PgTypeInfo> = params.iter().map(param_type).collect();
        let statement = (&mut *conn)
            .prepare_with(sql, &param_types)
            .await
            .map_err(map_query_error)?;

        let columns: Vec<ColumnInfo> = statement
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect();

        let pg_rows = bind_params(statement.query(), params)
            .fetch_all(&mut *conn)
            .await
            .map_err(map_query_error)?;

        let execution_time = start.elapsed();
        let rows = pg_rows
            .iter()
            .map(convert_row)
            .collect::<Result<Vec<Row>>>()?;
        debug!("query returned {} rows in {:?}", rows.len(), execution_time);

        Ok(QueryResult::with_data(columns, rows).with_execution_time(execution_time))
    }

    async fn execute_script(&mut self, script: &str) -> Result<()> {
        let conn = self.session()?;
        debug!("script: {} bytes", script.len());

        // Dropping an uncommitted transaction rolls it back.
        let mut tx = conn.begin().await.map_err(map_query_error)?;
        (&mut *tx)
            .execute(sqlx::raw_sql(script))
            .await
            .map_err(map_query_error)?;
        tx.commit().await.map_err(map_query_error)?;

        info!("Script committed");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| MddbError::connection(e.to_string()))?;
            debug!("Connection closed");
        }
        Ok(())
    }
}

/// Builds driver connect options from the credential fields.
fn connect_options(config: &ConnectionConfig) -> Result<PgConnectOptions> {
    let mut options = PgConnectOptions::new()
        .host(config.host.as_deref().unwrap_or("localhost"))
        .port(config.effective_port())
        .database(config.require_database()?)
        .application_name(APPLICATION_NAME);

    if let Some(user) = &config.user {
        options = options.username(user);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }

    Ok(options)
}

/// Returns the type a parameter is declared as when the statement is prepared.
///
/// NULL is declared as text; use an explicit cast (`$1::int`) in the SQL when
/// a typed NULL is needed.
fn param_type(value: &Value) -> PgTypeInfo {
    match value {
        Value::Null | Value::String(_) => <String as Type<Postgres>>::type_info(),
        Value::Bool(_) => <bool as Type<Postgres>>::type_info(),
        Value::Int(_) => <i64 as Type<Postgres>>::type_info(),
        Value::Float(_) => <f64 as Type<Postgres>>::type_info(),
        Value::Bytes(_) => <Vec<u8> as Type<Postgres>>::type_info(),
    }
}

/// Binds parameters positionally, matching the types from `param_type`.
fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [Value],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
        };
    }
    query
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Result<Row> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.name(), col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// Exact numerics, UUIDs, JSON and intervals are rendered as text. A column
/// that cannot be decoded is an error, never a NULL.
fn convert_value(row: &PgRow, index: usize, name: &str, type_name: &str) -> Result<Value> {
    let value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => decode::<bool>(row, index, name, type_name)?.map(Value::Bool),

        "INT2" | "SMALLINT" => {
            decode::<i16>(row, index, name, type_name)?.map(|v| Value::Int(v as i64))
        }

        "INT4" | "INT" | "INTEGER" => {
            decode::<i32>(row, index, name, type_name)?.map(|v| Value::Int(v as i64))
        }

        "INT8" | "BIGINT" => decode::<i64>(row, index, name, type_name)?.map(Value::Int),

        "FLOAT4" | "REAL" => {
            decode::<f32>(row, index, name, type_name)?.map(|v| Value::Float(v as f64))
        }

        "FLOAT8" | "DOUBLE PRECISION" => {
            decode::<f64>(row, index, name, type_name)?.map(Value::Float)
        }

        "NUMERIC" => decode::<BigDecimal>(row, index, name, type_name)?
            .map(|v| Value::String(v.to_string())),

        "BYTEA" => decode::<Vec<u8>>(row, index, name, type_name)?.map(Value::Bytes),

        "TIMESTAMP" => decode::<chrono::NaiveDateTime>(row, index, name, type_name)?
            .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S%.f").to_string())),

        "TIMESTAMPTZ" => decode::<chrono::DateTime<chrono::Utc>>(row, index, name, type_name)?
            .map(|v| Value::String(v.to_rfc3339())),

        "DATE" => decode::<chrono::NaiveDate>(row, index, name, type_name)?
            .map(|v| Value::String(v.to_string())),

        "TIME" => decode::<chrono::NaiveTime>(row, index, name, type_name)?
            .map(|v| Value::String(v.to_string())),

        "INTERVAL" => decode::<PgInterval>(row, index, name, type_name)?
            .map(|v| Value::String(format_interval(&v))),

        "UUID" => decode::<uuid::Uuid>(row, index, name, type_name)?
            .map(|v| Value::String(v.to_string())),

        "JSON" | "JSONB" => decode::<serde_json::Value>(row, index, name, type_name)?
            .map(|v| Value::String(v.to_string())),

        // Text-like types (TEXT, VARCHAR, BPCHAR, NAME, ...)
        _ => decode::<String>(row, index, name, type_name)?.map(Value::String),
    };

    Ok(value.unwrap_or(Value::Null))
}

/// Decodes a nullable column, reporting the column on failure.
fn decode<'r, T>(row: &'r PgRow, index: usize, name: &str, type_name: &str) -> Result<Option<T>>
where
    T: sqlx::Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index).map_err(|e| {
        MddbError::query(format!(
            "Cannot read column \"{name}\" of type {type_name}: {e}"
        ))
    })
}

/// Formats an interval the way psql prints it, e.g. `1 year 2 mons 3 days 04:05:06`.
fn format_interval(interval: &PgInterval) -> String {
    fn unit(n: i64, singular: &str, plural: &str) -> String {
        format!("{n} {}", if n.abs() == 1 { singular } else { plural })
    }

    let years = i64::from(interval.months / 12);
    let months = i64::from(interval.months % 12);
    let mut parts = Vec::new();
    if years != 0 {
        parts.push(unit(years, "year", "years"));
    }
    if months != 0 {
        parts.push(unit(months, "mon", "mons"));
    }
    if interval.days != 0 {
        parts.push(unit(i64::from(interval.days), "day", "days"));
    }

    let micros = interval.microseconds;
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let micros = micros.unsigned_abs();
        let secs = micros / 1_000_000;
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        let fraction = micros % 1_000_000;
        if fraction != 0 {
            let digits = format!("{fraction:06}");
            time.push('.');
            time.push_str(digits.trim_end_matches('0'));
        }
        parts.push(time);
    }

    parts.join(" ")
}

/// Maps a failure while establishing a session. The driver's message is kept as is.
fn map_connection_error(error: sqlx::Error) -> MddbError {
    MddbError::connection(error.to_string())
}

/// Maps a statement failure, keeping the server's SQLSTATE.
fn map_query_error(error: sqlx::Error) -> MddbError {
    let sqlstate = error
        .as_database_error()
        .and_then(|db_error| db_error.code())
        .map(|code| code.into_owned());

    MddbError::Query {
        message: format_query_error(&error),
        sqlstate,
    }
}

/// Formats a query error with the server's detail and hint if available.
fn format_query_error(error: &sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }

        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }

        if let Some(constraint) = pg_error.constraint() {
            result.push_str("\n  CONSTRAINT: ");
            result.push_str(constraint);
        }
    }

    result
}
