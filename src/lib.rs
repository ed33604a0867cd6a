//! # sqlshift
//!
//! Versioned schema migrations. Migrations record dialect-independent
//! expressions; a generator per database turns them into SQL, and a runner
//! applies them in version order while tracking what has been applied.
//!
//! ```ignore
//! use sqlshift::prelude::*;
//!
//! struct AddUsers;
//!
//! impl Migration for AddUsers {
//!     fn version(&self) -> i64 { 1 }
//!
//!     fn up(&self, ctx: &mut MigrationContext) -> Result<()> {
//!         ctx.push(
//!             CreateTable::new("users")
//!                 .column(ColumnDef::new("id", ColumnType::int64()).primary_key().identity())
//!                 .column(ColumnDef::new("email", ColumnType::string(Some(255)))),
//!         )
//!     }
//! }
//!
//! let driver = SqlxDriver::connect("sqlite::memory:").await?;
//! let processor = Processor::new(driver, &Options::default());
//! let mut runner = Runner::new(processor, MigrationSet::new().with(AddUsers));
//! runner.migrate_up(None).await?;
//! ```

pub mod ast;
pub mod batch;
pub mod config;
pub mod error;
pub mod processor;
pub mod runner;
pub mod transpiler;

pub use config::Options;
pub use error::{MigrateError, Result};

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::{Options, TransactionMode};
    pub use crate::error::{MigrateError, Result};
    pub use crate::processor::{Driver, Processor, SqlxDriver};
    pub use crate::runner::{Migration, MigrationRecord, MigrationSet, Runner};
    pub use crate::transpiler::{CompatibilityMode, Dialect, SqlGenerator};
}
