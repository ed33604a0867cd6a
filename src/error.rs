//! Error types for sqlshift.

use thiserror::Error;

use crate::transpiler::Dialect;

/// Boxed error handed back by a [`Driver`](crate::processor::Driver).
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// An expression was built with an invalid field combination.
    #[error("Invalid expression: {0}")]
    Validation(String),

    /// The dialect cannot express the requested operation.
    #[error("{operation} is not supported by {dialect}")]
    Unsupported {
        operation: String,
        dialect: Dialect,
    },

    /// The dialect has no DDL mapping for a column type.
    #[error("Type {column_type} is not supported by {dialect}")]
    UnsupportedType {
        column_type: String,
        dialect: Dialect,
    },

    /// The driver rejected a statement.
    #[error("Failed to execute statement: {source}\n  Statement: {statement}")]
    Execution {
        statement: String,
        #[source]
        source: DriverError,
    },

    /// Connection or transaction control failed.
    #[error("Connection error: {0}")]
    Connection(#[source] DriverError),

    /// A statement did not complete within the configured timeout.
    #[error("Statement timed out after {seconds}s\n  Statement: {statement}")]
    Timeout { statement: String, seconds: u64 },

    /// Requested target version is unknown.
    #[error("Version {0} was not found")]
    VersionNotFound(i64),

    /// Available migrations are not unique or not in a consistent order.
    #[error("Version order error: {0}")]
    VersionOrder(String),

    /// A migration failed; wraps the underlying cause.
    #[error("Migration {version} ({description}) failed: {source}")]
    Migration {
        version: i64,
        description: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// Configuration error (invalid TOML, unknown provider, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run was cancelled between statements.
    #[error("Migration run cancelled")]
    Cancelled,

    /// IO error (migration files, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl MigrateError {
    /// Create an Unsupported error for an operation on a dialect.
    pub fn unsupported(operation: impl Into<String>, dialect: Dialect) -> Self {
        MigrateError::Unsupported {
            operation: operation.into(),
            dialect,
        }
    }

    /// Create an Execution error carrying the failing statement.
    pub fn execution(statement: impl Into<String>, source: DriverError) -> Self {
        MigrateError::Execution {
            statement: statement.into(),
            source,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
