//! Connection plumbing shared by the reader and admin modules.

use crate::config::{ConnectionConfig, Role};
use crate::db::{self, Connector, DatabaseClient, QueryResult, Value};
use crate::error::Result;
use std::sync::Arc;
use tracing::debug;

/// One role's credentials plus the connector used to open sessions with them.
pub(crate) struct Access {
    role: Role,
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
}

impl Access {
    pub(crate) fn new(role: Role, config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            role,
            config,
            connector,
        }
    }

    pub(crate) fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Opens a new session with this role's credentials.
    pub(crate) async fn open(&self) -> Result<Box<dyn DatabaseClient>> {
        debug!(role = %self.role, "opening connection to {}", self.config.display_string());
        self.connector.connect(&self.config).await
    }

    /// Runs `statement` on `connection`, or on a session opened and closed
    /// for this call alone.
    pub(crate) async fn query(
        &self,
        statement: &str,
        connection: Option<&mut dyn DatabaseClient>,
        parameters: &[Value],
    ) -> Result<QueryResult> {
        match connection {
            Some(conn) => conn.execute_query(statement, parameters).await,
            None => {
                let mut conn = self.open().await?;
                let outcome = conn.execute_query(statement, parameters).await;
                db::release(conn, outcome).await
            }
        }
    }

    /// Runs `script` and commits it, on `connection` or on a session opened
    /// and closed for this call alone.
    pub(crate) async fn execute_script(
        &self,
        script: &str,
        connection: Option<&mut dyn DatabaseClient>,
    ) -> Result<()> {
        match connection {
            Some(conn) => conn.execute_script(script).await,
            None => {
                let mut conn = self.open().await?;
                let outcome = conn.execute_script(script).await;
                db::release(conn, outcome).await
            }
        }
    }
}
