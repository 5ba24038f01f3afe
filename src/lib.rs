//! mddb - Read-only and administrative access to the market data database.
//!
//! `Reader` runs queries with read-only credentials; `Admin` runs queries and
//! applies SQL scripts with administrative credentials. Both hand back
//! materialized `QueryResult`s and accept an existing connection for reuse.

mod access;
pub mod admin;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod reader;

pub use admin::Admin;
pub use config::{Config, ConnectionConfig, Role};
pub use db::{ColumnInfo, Connector, DatabaseClient, QueryResult, Row, Value};
pub use error::{MddbError, Result};
pub use reader::Reader;
