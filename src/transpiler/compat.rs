use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MigrateError, Result};
use crate::transpiler::Dialect;

/// What a generator does when asked for an operation its dialect cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityMode {
    /// Fail with [`MigrateError::Unsupported`].
    #[default]
    Strict,
    /// Log a warning and emit nothing.
    Loose,
}

impl CompatibilityMode {
    pub fn handle(&self, operation: &str, dialect: Dialect) -> Result<String> {
        match self {
            CompatibilityMode::Strict => Err(MigrateError::unsupported(operation, dialect)),
            CompatibilityMode::Loose => {
                warn!(%dialect, operation, "Skipping unsupported operation");
                Ok(String::new())
            }
        }
    }
}
