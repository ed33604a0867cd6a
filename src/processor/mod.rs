//! Executing generated SQL against a live connection.
//!
//! The [`Processor`] owns the run's only connection. It turns expressions
//! into SQL through the dialect generator, splits multi-statement text with
//! the [`BatchParser`], answers existence predicates from the catalog, and
//! evaluates conditional blocks right before they run.

pub mod catalog;
pub mod driver;
pub mod sqlx_driver;

pub use driver::{Driver, Row};
pub use sqlx_driver::SqlxDriver;

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ast::{Expression, SchemaCondition, Value};
use crate::batch::{BatchEvent, BatchParser, BatchRules};
use crate::config::Options;
use crate::error::{DriverError, MigrateError, Result};
use crate::transpiler::{Dialect, SqlGenerator};

/// Await a driver call under the statement timeout, tagging failures with
/// the statement text.
async fn timed<T, F>(limit: Option<Duration>, statement: &str, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, DriverError>>,
{
    let result = match limit {
        Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
            MigrateError::Timeout {
                statement: statement.to_string(),
                seconds: limit.as_secs(),
            }
        })?,
        None => call.await,
    };
    result.map_err(|e| MigrateError::execution(statement, e))
}

pub struct Processor<D: Driver> {
    driver: D,
    generator: Box<dyn SqlGenerator>,
    rules: BatchRules,
    options: Options,
    cancel: CancellationToken,
}

impl<D: Driver> Processor<D> {
    /// Wrap an open connection. The generator follows the driver's dialect.
    pub fn new(driver: D, options: &Options) -> Self {
        let dialect = driver.dialect();
        if dialect != options.dialect {
            debug!(
                "Configured dialect {} differs from connection dialect {}; using {}",
                options.dialect, dialect, dialect
            );
        }
        Self {
            generator: dialect.generator(options),
            rules: dialect.batch_rules(),
            driver,
            options: options.clone(),
            cancel: CancellationToken::new(),
        }
    }

    /// Abort at the next statement boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.generator.dialect()
    }

    pub fn generator(&self) -> &dyn SqlGenerator {
        self.generator.as_ref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn is_preview(&self) -> bool {
        self.options.preview
    }

    pub fn supports_transactional_ddl(&self) -> bool {
        self.driver.supports_transactional_ddl()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub async fn close(self) -> Result<()> {
        self.driver.close().await.map_err(MigrateError::Connection)
    }

    // ------------------------------------------------------------ transactions

    pub async fn begin_transaction(&mut self) -> Result<()> {
        if self.is_preview() {
            return Ok(());
        }
        debug!("BEGIN");
        self.driver.begin().await.map_err(MigrateError::Connection)
    }

    pub async fn commit_transaction(&mut self) -> Result<()> {
        if self.is_preview() {
            return Ok(());
        }
        debug!("COMMIT");
        self.driver.commit().await.map_err(MigrateError::Connection)
    }

    pub async fn rollback_transaction(&mut self) -> Result<()> {
        if self.is_preview() {
            return Ok(());
        }
        debug!("ROLLBACK");
        self.driver.rollback().await.map_err(MigrateError::Connection)
    }

    // --------------------------------------------------------------- execution

    /// Generate and run one expression. Conditional blocks are evaluated
    /// against the live schema first and their children run only when the
    /// condition holds.
    pub async fn process(&mut self, expression: &Expression) -> Result<()> {
        if let Expression::Conditional(block) = expression {
            if !self.evaluate(&block.condition).await {
                info!(
                    "Skipping {} expression(s): {} is false",
                    block.expressions.len(),
                    block.condition
                );
                return Ok(());
            }
            for nested in &block.expressions {
                Box::pin(self.process(nested)).await?;
            }
            return Ok(());
        }

        debug!("{} {}", expression.operation(), expression.target());
        let sql = self.generator.generate(expression)?;
        self.execute(&sql).await
    }

    pub async fn process_all(&mut self, expressions: &[Expression]) -> Result<()> {
        for expression in expressions {
            self.process(expression).await?;
        }
        Ok(())
    }

    /// Run SQL text that may hold one statement or a whole script.
    ///
    /// Single statements go straight to the driver, without their trailing
    /// terminator. Anything else is split and run statement by statement, so
    /// a failure names the statement that failed rather than the script.
    pub async fn execute(&mut self, sql: &str) -> Result<()> {
        let events = BatchParser::split(self.rules.clone(), sql);
        if !events.iter().any(|e| matches!(e, BatchEvent::Statement(_))) {
            debug!("Skipping empty statement");
            return Ok(());
        }
        if !BatchParser::is_multi_batch(&self.rules, &events) {
            let statement = self.single_statement(sql, &events);
            return self.run_statement(&statement).await;
        }

        let mut last: Option<String> = None;
        for event in events {
            match event {
                BatchEvent::Statement(statement) => {
                    self.run_statement(&statement).await?;
                    last = Some(statement);
                }
                BatchEvent::SpecialToken { token, count } if count > 1 => {
                    if let Some(statement) = last.clone() {
                        debug!("{} {}: repeating batch {} more time(s)", token, count, count - 1);
                        for _ in 1..count {
                            self.run_statement(&statement).await?;
                        }
                    }
                }
                BatchEvent::SpecialToken { .. } => {}
            }
        }
        Ok(())
    }

    /// The text to send for a script holding one statement. Where `;` ends
    /// statements the parsed text goes out without it; procedural blocks and
    /// separator-only dialects keep the text as written.
    fn single_statement(&self, sql: &str, events: &[BatchEvent]) -> String {
        let parsed = events.iter().find_map(|e| match e {
            BatchEvent::Statement(statement) => Some(statement),
            BatchEvent::SpecialToken { .. } => None,
        });
        match parsed {
            Some(statement)
                if self.rules.terminator().is_some() && !self.rules.starts_block(statement) =>
            {
                statement.clone()
            }
            _ => sql.trim().to_string(),
        }
    }

    async fn run_statement(&mut self, sql: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }
        if self.is_preview() {
            info!("{}", sql);
            return Ok(());
        }
        debug!("{}", sql);
        let limit = self.options.timeout();
        timed(limit, sql, self.driver.execute(sql)).await?;
        Ok(())
    }

    /// Run a read. Reads go to the database in preview mode too.
    pub async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        if self.cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }
        debug!("{}", sql);
        let limit = self.options.timeout();
        timed(limit, sql, self.driver.query(sql)).await
    }

    // -------------------------------------------------------------- predicates

    /// Evaluate a condition. Lookup failures propagate.
    pub async fn exists(&mut self, condition: &SchemaCondition) -> Result<bool> {
        match condition {
            SchemaCondition::Not(inner) => Ok(!Box::pin(self.exists(inner)).await?),
            SchemaCondition::All(children) => {
                for child in children {
                    if !Box::pin(self.exists(child)).await? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            SchemaCondition::Any(children) => {
                for child in children {
                    if Box::pin(self.exists(child)).await? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            leaf => {
                let sql = catalog::existence_query(self.generator.as_ref(), leaf)?;
                Ok(!self.query(&sql).await?.is_empty())
            }
        }
    }

    /// Evaluate a condition for a conditional block. A failed lookup counts
    /// as false.
    pub async fn evaluate(&mut self, condition: &SchemaCondition) -> bool {
        match self.exists(condition).await {
            Ok(holds) => holds,
            Err(e) => {
                warn!("Could not evaluate \"{}\", treating it as false: {}", condition, e);
                false
            }
        }
    }

    pub async fn schema_exists(&mut self, schema: &str) -> Result<bool> {
        self.exists(&SchemaCondition::schema_exists(schema)).await
    }

    pub async fn table_exists(&mut self, schema: Option<&str>, table: &str) -> Result<bool> {
        self.exists(&in_schema(SchemaCondition::table_exists(table), schema))
            .await
    }

    pub async fn column_exists(
        &mut self,
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> Result<bool> {
        self.exists(&in_schema(SchemaCondition::column_exists(table, column), schema))
            .await
    }

    pub async fn index_exists(
        &mut self,
        schema: Option<&str>,
        table: &str,
        index: &str,
    ) -> Result<bool> {
        self.exists(&in_schema(SchemaCondition::index_exists(table, index), schema))
            .await
    }

    pub async fn constraint_exists(
        &mut self,
        schema: Option<&str>,
        table: &str,
        constraint: &str,
    ) -> Result<bool> {
        self.exists(&in_schema(
            SchemaCondition::constraint_exists(table, constraint),
            schema,
        ))
        .await
    }

    pub async fn sequence_exists(&mut self, schema: Option<&str>, sequence: &str) -> Result<bool> {
        self.exists(&in_schema(SchemaCondition::sequence_exists(sequence), schema))
            .await
    }

    pub async fn default_value_exists(
        &mut self,
        schema: Option<&str>,
        table: &str,
        column: &str,
        default: impl Into<Value>,
    ) -> Result<bool> {
        self.exists(&in_schema(
            SchemaCondition::default_value_exists(table, column, default),
            schema,
        ))
        .await
    }
}

fn in_schema(condition: SchemaCondition, schema: Option<&str>) -> SchemaCondition {
    match schema {
        Some(name) => condition.in_schema(name),
        None => condition,
    }
}
