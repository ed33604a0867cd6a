//! The database capability the processor runs on.

use crate::ast::Value;
use crate::error::DriverError;
use crate::transpiler::Dialect;

/// One result row, columns in select order.
pub type Row = Vec<Value>;

/// A single open connection.
///
/// Calls are awaited one at a time; the processor never issues two
/// statements concurrently on the same driver.
#[allow(async_fn_in_trait)]
pub trait Driver: Send {
    fn dialect(&self) -> Dialect;

    /// Whether DDL participates in transactions on this connection.
    fn supports_transactional_ddl(&self) -> bool {
        self.dialect().transactional_ddl()
    }

    async fn begin(&mut self) -> Result<(), DriverError>;

    async fn commit(&mut self) -> Result<(), DriverError>;

    async fn rollback(&mut self) -> Result<(), DriverError>;

    /// Run a statement, returning rows affected.
    async fn execute(&mut self, sql: &str) -> Result<u64, DriverError>;

    /// Run a query and collect every row.
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, DriverError>;

    async fn close(self) -> Result<(), DriverError>
    where
        Self: Sized;
}
