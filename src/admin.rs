//! Administrative access for schema changes and maintenance scripts.

use crate::access::Access;
use crate::config::{Config, ConnectionConfig, Role};
use crate::db::{Connector, DatabaseClient, PostgresConnector, QueryResult, Value};
use crate::error::{MddbError, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Runs queries and scripts with the administrative credentials.
pub struct Admin {
    access: Access,
}

impl Admin {
    /// Creates an admin that connects to PostgreSQL with `config`.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_connector(config, Arc::new(PostgresConnector))
    }

    /// Creates an admin that opens its sessions through `connector`.
    pub fn with_connector(config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            access: Access::new(Role::Admin, config, connector),
        }
    }

    /// Creates an admin from the `[credentials.admin]` section.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.require_credentials(Role::Admin)?))
    }

    /// Returns the credentials this admin connects with.
    pub fn config(&self) -> &ConnectionConfig {
        self.access.config()
    }

    /// Opens a new connection. The caller owns it and should `close()` it.
    pub async fn get_connection(&self) -> Result<Box<dyn DatabaseClient>> {
        self.access.open().await
    }

    /// Runs `statement` and returns the whole result set.
    ///
    /// Without a `connection`, one is opened for this call and closed before
    /// returning. A supplied connection is left open.
    pub async fn query(
        &self,
        statement: &str,
        connection: Option<&mut dyn DatabaseClient>,
        parameters: &[Value],
    ) -> Result<QueryResult> {
        self.access.query(statement, connection, parameters).await
    }

    /// Executes `script` in one round trip and commits it.
    ///
    /// A failing script is rolled back as a whole.
    pub async fn run_sql(
        &self,
        script: &str,
        connection: Option<&mut dyn DatabaseClient>,
    ) -> Result<()> {
        self.access.execute_script(script, connection).await
    }

    /// Reads the SQL script at `path`, executes it and commits.
    ///
    /// The file is read before any connection is opened, so a missing,
    /// unreadable or non-UTF-8 file fails with `FileNotFound` without touching
    /// the database.
    pub async fn run_sql_file(
        &self,
        path: impl AsRef<Path>,
        connection: Option<&mut dyn DatabaseClient>,
    ) -> Result<()> {
        let path = path.as_ref();
        let script = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MddbError::file_not_found(path, read_failure_reason(&e)))?;

        info!("Running SQL file {}", path.display());
        self.run_sql(&script, connection).await
    }
}

fn read_failure_reason(error: &std::io::Error) -> String {
    match error.kind() {
        std::io::ErrorKind::InvalidData => "file is not valid UTF-8".to_string(),
        _ => error.to_string(),
    }
}
