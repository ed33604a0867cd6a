//! SQL generation for the expression model.
//!
//! Converts expressions into dialect-specific SQL text. Each dialect is a
//! [`SqlGenerator`] built from a [`Quoter`], a [`TypeMap`] and a
//! [`CompatibilityMode`].

pub mod compat;
pub mod dialect;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod quoter;
pub mod sqlite;
pub mod sqlserver;
pub mod traits;
pub mod types;

pub use compat::CompatibilityMode;
pub use dialect::Dialect;
pub use mysql::MySqlGenerator;
pub use oracle::OracleGenerator;
pub use postgres::PostgresGenerator;
pub use quoter::{CaseFolding, Quoter};
pub use sqlite::SqliteGenerator;
pub use sqlserver::SqlServerGenerator;
pub use traits::{GeneratorBase, SqlGenerator};
pub use types::TypeMap;
