//! Run configuration.
//!
//! Loaded once from `sqlshift.toml` and passed by reference into the
//! processor, generator and runner. Nothing mutates it once a run starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::transpiler::{CompatibilityMode, Dialect};

pub const CONFIG_FILE: &str = "sqlshift.toml";

/// Whether each migration runs inside its own transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionMode {
    #[default]
    PerMigration,
    None,
}

/// Names used for the version-tracking table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionTableOptions {
    pub schema: Option<String>,
    pub table: String,
    pub version_column: String,
    pub applied_on_column: String,
    pub description_column: String,
}

impl Default for VersionTableOptions {
    fn default() -> Self {
        Self {
            schema: None,
            table: "VersionInfo".to_string(),
            version_column: "Version".to_string(),
            applied_on_column: "AppliedOn".to_string(),
            description_column: "Description".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub dialect: Dialect,
    /// Connection URL; the CLI also reads `SQLSHIFT_DATABASE_URL`.
    pub database_url: Option<String>,
    pub migrations_dir: PathBuf,
    pub version_table: VersionTableOptions,
    pub transaction_mode: TransactionMode,
    /// Log writes instead of executing them.
    pub preview: bool,
    /// Per-statement timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// `None` uses the dialect default (quote everything except on Oracle).
    pub force_quote: Option<bool>,
    pub compatibility: CompatibilityMode,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            database_url: None,
            migrations_dir: PathBuf::from("migrations"),
            version_table: VersionTableOptions::default(),
            transaction_mode: TransactionMode::default(),
            preview: false,
            timeout_secs: None,
            force_quote: None,
            compatibility: CompatibilityMode::default(),
        }
    }
}

impl Options {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MigrateError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Explicit path, else `./sqlshift.toml`, else the user config dir,
    /// else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::discover() {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("sqlshift").join(CONFIG_FILE))
            .filter(|path| path.is_file())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
