//! Supported database dialects.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::batch::BatchRules;
use crate::config::Options;
use crate::error::MigrateError;
use crate::transpiler::quoter::{CaseFolding, Quoter};
use crate::transpiler::{
    MySqlGenerator, OracleGenerator, PostgresGenerator, SqlGenerator, SqlServerGenerator,
    SqliteGenerator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    #[serde(alias = "mariadb")]
    MySql,
    Sqlite,
    #[serde(alias = "mssql")]
    SqlServer,
    Oracle,
}

impl Dialect {
    pub fn all() -> [Dialect; 5] {
        [
            Dialect::Postgres,
            Dialect::MySql,
            Dialect::Sqlite,
            Dialect::SqlServer,
            Dialect::Oracle,
        ]
    }

    /// Build the SQL generator for this dialect.
    pub fn generator(&self, options: &Options) -> Box<dyn SqlGenerator> {
        match self {
            Dialect::Postgres => Box::new(PostgresGenerator::new(options)),
            Dialect::MySql => Box::new(MySqlGenerator::new(options)),
            Dialect::Sqlite => Box::new(SqliteGenerator::new(options)),
            Dialect::SqlServer => Box::new(SqlServerGenerator::new(options)),
            Dialect::Oracle => Box::new(OracleGenerator::new(options)),
        }
    }

    /// Identifier quoter, honouring the `force_quote` override.
    pub fn quoter(&self, force_quote: Option<bool>) -> Quoter {
        match self {
            Dialect::Postgres => Quoter::new('"', '"', CaseFolding::Lower, force_quote.unwrap_or(true)),
            Dialect::MySql => Quoter::new('`', '`', CaseFolding::None, force_quote.unwrap_or(true)),
            Dialect::Sqlite => Quoter::new('"', '"', CaseFolding::None, force_quote.unwrap_or(true)),
            Dialect::SqlServer => Quoter::new('[', ']', CaseFolding::None, force_quote.unwrap_or(true)),
            Dialect::Oracle => Quoter::new('"', '"', CaseFolding::Upper, force_quote.unwrap_or(false)),
        }
    }

    /// How raw SQL text is split into executable batches.
    pub fn batch_rules(&self) -> BatchRules {
        match self {
            Dialect::Postgres => BatchRules::terminated().with_dollar_quotes(),
            Dialect::MySql => BatchRules::terminated().with_backticks(),
            Dialect::Sqlite => BatchRules::terminated(),
            Dialect::SqlServer => BatchRules::separator_line("GO").with_brackets(),
            Dialect::Oracle => BatchRules::terminated()
                .with_separator("/")
                .with_block_starters(&[
                    "BEGIN",
                    "DECLARE",
                    "CREATE OR REPLACE",
                    "CREATE PROCEDURE",
                    "CREATE FUNCTION",
                    "CREATE TRIGGER",
                    "CREATE PACKAGE",
                ]),
        }
    }

    /// Whether DDL statements can be rolled back inside a transaction.
    pub fn transactional_ddl(&self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::Sqlite | Dialect::SqlServer)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dialect::Postgres => "PostgreSQL",
            Dialect::MySql => "MySQL",
            Dialect::Sqlite => "SQLite",
            Dialect::SqlServer => "SQL Server",
            Dialect::Oracle => "Oracle",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Dialect {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            "oracle" => Ok(Dialect::Oracle),
            other => Err(MigrateError::Config(format!("Unknown dialect: {}", other))),
        }
    }
}
