//! Database abstraction layer for mddb.
//!
//! A `Connector` opens sessions from a `ConnectionConfig`; each session is a
//! `DatabaseClient`, the connection handle the reader and admin modules hand
//! out and accept back.

mod mock;
mod postgres;
mod types;

pub use mock::{MockConnector, MockDatabase, MockDatabaseClient};
pub use postgres::{PostgresClient, PostgresConnector};
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;
use tracing::warn;

/// Opens database sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new connection using the given credentials.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>>;
}

/// A live database session.
///
/// A session serves one statement at a time; every operation takes `&mut self`.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Executes a SQL statement with positional `$n` parameters and
    /// materializes the full result set.
    async fn execute_query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Executes a SQL script in one round trip inside a transaction and
    /// commits it. On error the transaction is rolled back.
    async fn execute_script(&mut self, script: &str) -> Result<()>;

    /// Closes the connection. Later calls on this session fail.
    async fn close(&mut self) -> Result<()>;
}

/// Closes a session opened on the caller's behalf and hands back the
/// statement's outcome. A failing close is logged, never reported over the
/// outcome.
pub(crate) async fn release<T>(
    mut client: Box<dyn DatabaseClient>,
    outcome: Result<T>,
) -> Result<T> {
    if let Err(e) = client.close().await {
        warn!("Failed to close connection: {e}");
    }
    outcome
}
