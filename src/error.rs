//! Error types for mddb.
//!
//! Defines the main error enum used throughout the crate.

use std::path::PathBuf;
use thiserror::Error;

/// SQLSTATE reported by PostgreSQL for insufficient privileges.
pub const SQLSTATE_INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Main error type for mddb operations.
#[derive(Error, Debug)]
pub enum MddbError {
    /// Database connection errors (host unreachable, auth failed, unknown database).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, permission or constraint violations, etc.)
    #[error("Query error: {message}")]
    Query {
        message: String,
        /// SQLSTATE code reported by the server, when there is one.
        sqlstate: Option<String>,
    },

    /// A SQL script file could not be read: missing, unreadable, or not UTF-8.
    /// `reason` says which.
    #[error("File not found: {}: {reason}", .path.display())]
    FileNotFound { path: PathBuf, reason: String },

    /// Configuration errors (invalid config file, missing credentials, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (output serialization, unexpected states).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MddbError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error without a SQLSTATE.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query {
            message: msg.into(),
            sqlstate: None,
        }
    }

    /// Creates a query error carrying the server's SQLSTATE code.
    pub fn query_with_state(msg: impl Into<String>, sqlstate: impl Into<String>) -> Self {
        Self::Query {
            message: msg.into(),
            sqlstate: Some(sqlstate.into()),
        }
    }

    /// Creates a file-not-found error for a script path.
    pub fn file_not_found(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileNotFound {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the SQLSTATE code of a query error, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Query { sqlstate, .. } => sqlstate.as_deref(),
            _ => None,
        }
    }

    /// Returns true if the server rejected the statement for lack of privileges.
    pub fn is_permission_denied(&self) -> bool {
        self.sqlstate() == Some(SQLSTATE_INSUFFICIENT_PRIVILEGE)
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query { .. } => "Query Error",
            Self::FileNotFound { .. } => "File Not Found",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using MddbError.
pub type Result<T> = std::result::Result<T, MddbError>;
