//! Mock database for testing.
//!
//! `MockDatabase` is shared state standing in for a server: it records every
//! connect, statement and committed script, and can be told which users are
//! read-only, which statements fail, and what canned results to return.

use super::{ColumnInfo, Connector, DatabaseClient, QueryResult, Value};
use crate::config::ConnectionConfig;
use crate::error::{MddbError, Result, SQLSTATE_INSUFFICIENT_PRIVILEGE};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Statement keywords rejected for read-only users.
const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "TRUNCATE", "GRANT", "REVOKE",
];

struct Failure {
    fragment: String,
    message: String,
    sqlstate: String,
}

struct MockState {
    reachable: bool,
    read_only_users: HashSet<String>,
    results: HashMap<String, QueryResult>,
    failures: Vec<Failure>,
    connects: usize,
    closes: usize,
    executed: Vec<String>,
    committed: Vec<String>,
}

/// In-memory stand-in for a database server.
pub struct MockDatabase {
    state: Mutex<MockState>,
}

impl MockDatabase {
    /// Creates a reachable mock server with no users restricted.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                reachable: true,
                read_only_users: HashSet::new(),
                results: HashMap::new(),
                failures: Vec::new(),
                connects: 0,
                closes: 0,
                executed: Vec::new(),
                committed: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes every later connect attempt fail.
    pub fn set_unreachable(&self) {
        self.state().reachable = false;
    }

    /// Marks a user as read-only: write statements fail with SQLSTATE 42501.
    pub fn add_read_only_user(&self, user: impl Into<String>) {
        self.state().read_only_users.insert(user.into());
    }

    /// Returns `result` whenever exactly `sql` (trimmed) is queried.
    pub fn set_result(&self, sql: &str, result: QueryResult) {
        self.state().results.insert(sql.trim().to_string(), result);
    }

    /// Fails any statement or script containing `fragment`.
    pub fn fail_on(&self, fragment: &str, message: &str, sqlstate: &str) {
        self.state().failures.push(Failure {
            fragment: fragment.to_string(),
            message: message.to_string(),
            sqlstate: sqlstate.to_string(),
        });
    }

    /// Number of successful connects so far.
    pub fn connect_count(&self) -> usize {
        self.state().connects
    }

    /// Number of sessions closed so far.
    pub fn close_count(&self) -> usize {
        self.state().closes
    }

    /// Every statement and script received, in order.
    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    /// Scripts that were committed, in order.
    pub fn committed_scripts(&self) -> Vec<String> {
        self.state().committed.clone()
    }

    fn check(&self, sql: &str, read_only: bool) -> Result<()> {
        let state = self.state();

        if let Some(failure) = state.failures.iter().find(|f| sql.contains(&f.fragment)) {
            return Err(MddbError::query_with_state(
                failure.message.clone(),
                failure.sqlstate.clone(),
            ));
        }

        if read_only && sql.split(';').any(is_write_statement) {
            return Err(MddbError::query_with_state(
                "ERROR: permission denied for relation",
                SQLSTATE_INSUFFICIENT_PRIVILEGE,
            ));
        }

        Ok(())
    }
}

impl Default for MockDatabase {
    fn default() -> Self {
        Self::new()
    }
}

fn is_write_statement(sql: &str) -> bool {
    sql.split_whitespace()
        .next()
        .map(|keyword| WRITE_KEYWORDS.contains(&keyword.to_uppercase().as_str()))
        .unwrap_or(false)
}

/// Opens `MockDatabaseClient` sessions against a shared `MockDatabase`.
#[derive(Clone, Default)]
pub struct MockConnector {
    db: Arc<MockDatabase>,
}

impl MockConnector {
    /// Creates a connector for the given mock server.
    pub fn new(db: Arc<MockDatabase>) -> Self {
        Self { db }
    }

    /// Returns the mock server behind this connector.
    pub fn database(&self) -> &Arc<MockDatabase> {
        &self.db
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        config.require_database()?;

        let read_only = {
            let mut state = self.db.state();
            if !state.reachable {
                return Err(MddbError::connection(format!(
                    "error communicating with database: Connection refused ({}:{})",
                    config.host.as_deref().unwrap_or("localhost"),
                    config.effective_port()
                )));
            }
            state.connects += 1;
            config
                .user
                .as_ref()
                .is_some_and(|user| state.read_only_users.contains(user))
        };

        Ok(Box::new(MockDatabaseClient {
            db: Arc::clone(&self.db),
            read_only,
            open: true,
        }))
    }
}

/// A mock session.
pub struct MockDatabaseClient {
    db: Arc<MockDatabase>,
    read_only: bool,
    open: bool,
}

impl MockDatabaseClient {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(MddbError::connection("Connection is closed"))
        }
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&mut self, sql: &str, _params: &[Value]) -> Result<QueryResult> {
        self.ensure_open()?;
        self.db.state().executed.push(sql.to_string());
        self.db.check(sql, self.read_only)?;

        if let Some(result) = self.db.state().results.get(sql.trim()) {
            return Ok(result.clone());
        }

        if sql.trim_start().to_uppercase().starts_with("SELECT") {
            let columns = vec![ColumnInfo::new("result", "TEXT")];
            let rows = vec![vec![Value::String(format!("Mock result for: {sql}"))]];
            Ok(QueryResult::with_data(columns, rows).with_execution_time(Duration::from_millis(1)))
        } else {
            Ok(QueryResult::new().with_execution_time(Duration::from_millis(1)))
        }
    }

    async fn execute_script(&mut self, script: &str) -> Result<()> {
        self.ensure_open()?;
        self.db.state().executed.push(script.to_string());
        self.db.check(script, self.read_only)?;
        self.db.state().committed.push(script.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.db.state().closes += 1;
        }
        Ok(())
    }
}
