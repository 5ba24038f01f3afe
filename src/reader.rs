//! Read-only access to the database for analytical queries.

use crate::access::Access;
use crate::config::{Config, ConnectionConfig, Role};
use crate::db::{Connector, DatabaseClient, PostgresConnector, QueryResult, Value};
use crate::error::Result;
use std::sync::Arc;

/// Runs queries with the read-only credentials.
pub struct Reader {
    access: Access,
}

impl Reader {
    /// Creates a reader that connects to PostgreSQL with `config`.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_connector(config, Arc::new(PostgresConnector))
    }

    /// Creates a reader that opens its sessions through `connector`.
    pub fn with_connector(config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            access: Access::new(Role::Reader, config, connector),
        }
    }

    /// Creates a reader from the `[credentials.reader]` section.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.require_credentials(Role::Reader)?))
    }

    /// Returns the credentials this reader connects with.
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
}
