//! Version-tracked migration runs.
//!
//! The [`Runner`] compares the available migrations with the version table,
//! decides what to run and in which order, and runs each migration as one
//! unit: its expressions and its version-table change commit together or
//! not at all. A failure stops the run; migrations committed before it stay
//! applied.

pub mod migration;
pub mod sql_files;
pub mod version_table;

pub use migration::{Direction, Migration, MigrationSet};
pub use sql_files::SqlFileMigration;
pub use version_table::{MigrationRecord, VersionTable};

use tracing::{info, warn};

use crate::ast::Expression;
use crate::config::TransactionMode;
use crate::error::{MigrateError, Result};
use crate::processor::{Driver, Processor};

/// A migration resolved for execution.
struct Step {
    version: i64,
    description: String,
    expressions: Vec<Expression>,
}

pub struct Runner<D: Driver> {
    processor: Processor<D>,
    migrations: MigrationSet,
    version_table: VersionTable,
}

impl<D: Driver> Runner<D> {
    pub fn new(processor: Processor<D>, migrations: MigrationSet) -> Self {
        let version_table = VersionTable::new(processor.options().version_table.clone());
        Self {
            processor,
            migrations,
            version_table,
        }
    }

    pub fn processor(&self) -> &Processor<D> {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut Processor<D> {
        &mut self.processor
    }

    pub fn migrations(&self) -> &MigrationSet {
        &self.migrations
    }

    pub fn into_processor(self) -> Processor<D> {
        self.processor
    }

    /// Applied migrations, ascending. Empty when the version table is missing.
    pub async fn list_applied(&mut self) -> Result<Vec<MigrationRecord>> {
        let exists = self
            .processor
            .table_exists(self.version_table.schema(), self.version_table.table())
            .await?;
        if !exists {
            return Ok(Vec::new());
        }
        let sql = self.version_table.select_sql(self.processor.generator());
        let mut records = self
            .processor
            .query(&sql)
            .await?
            .iter()
            .map(MigrationRecord::from_row)
            .collect::<Result<Vec<_>>>()?;
        records.sort_by_key(|r| r.version);
        Ok(records)
    }

    async fn applied_versions(&mut self) -> Result<Vec<i64>> {
        Ok(self.list_applied().await?.into_iter().map(|r| r.version).collect())
    }

    /// Available versions not yet applied, ascending.
    pub async fn pending(&mut self) -> Result<Vec<i64>> {
        let applied = self.applied_versions().await?;
        Ok(self
            .migrations
            .versions()
            .into_iter()
            .filter(|v| !applied.contains(v))
            .collect())
    }

    /// Versions must be unique, and nothing unapplied may sit below the
    /// highest applied version.
    pub async fn validate_version_order(&mut self) -> Result<()> {
        self.migrations.validate()?;
        let applied = self.applied_versions().await?;
        let Some(&latest) = applied.iter().max() else {
            return Ok(());
        };
        let out_of_order: Vec<String> = self
            .migrations
            .versions()
            .into_iter()
            .filter(|v| *v < latest && !applied.contains(v))
            .map(|v| v.to_string())
            .collect();
        if !out_of_order.is_empty() {
            return Err(MigrateError::VersionOrder(format!(
                "Unapplied migration(s) {} are older than the latest applied version {}",
                out_of_order.join(", "),
                latest
            )));
        }
        Ok(())
    }

    /// Apply every migration newer than the latest applied one, up to and
    /// including `target` when given. Returns the versions applied.
    pub async fn migrate_up(&mut self, target: Option<i64>) -> Result<Vec<i64>> {
        self.migrations.validate()?;
        if let Some(target) = target {
            if !self.migrations.contains(target) {
                return Err(MigrateError::VersionNotFound(target));
            }
        }

        self.bootstrap().await?;
        let applied = self.applied_versions().await?;
        let latest = applied.iter().copied().max().unwrap_or(0);

        let skipped: Vec<i64> = self
            .migrations
            .versions()
            .into_iter()
            .filter(|v| *v < latest && !applied.contains(v))
            .collect();
        if !skipped.is_empty() {
            warn!(
                "Skipping {:?}: older than the latest applied version {}",
                skipped, latest
            );
        }

        let versions: Vec<i64> = self
            .migrations
            .versions()
            .into_iter()
            .filter(|v| *v > latest && target.is_none_or(|t| *v <= t))
            .collect();
        let steps = self.resolve(&versions, Direction::Up)?;
        if steps.is_empty() {
            info!("Database is up to date at version {}", latest);
        }
        self.run(steps, Direction::Up).await
    }

    /// Revert every applied migration newer than `target`, newest first.
    /// `target` 0 reverts everything.
    pub async fn migrate_down(&mut self, target: i64) -> Result<Vec<i64>> {
        self.migrations.validate()?;
        let applied = self.applied_versions().await?;
        if target != 0 && !applied.contains(&target) && !self.migrations.contains(target) {
            return Err(MigrateError::VersionNotFound(target));
        }

        let versions: Vec<i64> = applied.into_iter().rev().filter(|v| *v > target).collect();
        if let Some(missing) = versions.iter().find(|v| !self.migrations.contains(**v)) {
            return Err(MigrateError::VersionNotFound(*missing));
        }
        let steps = self.resolve(&versions, Direction::Down)?;
        if steps.is_empty() {
            info!("Nothing to revert above version {}", target);
        }
        self.run(steps, Direction::Down).await
    }

    /// Revert the latest `steps` applied migrations.
    pub async fn rollback(&mut self, steps: usize) -> Result<Vec<i64>> {
        if steps == 0 {
            return Ok(Vec::new());
        }
        let applied = self.applied_versions().await?;
        let target = if steps >= applied.len() {
            0
        } else {
            applied[applied.len() - steps - 1]
        };
        self.migrate_down(target).await
    }

    /// Build every migration's expressions before running any of them, so
    /// a migration that fails to build stops the run with nothing executed.
    fn resolve(&self, versions: &[i64], direction: Direction) -> Result<Vec<Step>> {
        versions
            .iter()
            .map(|&version| {
                let migration = self
                    .migrations
                    .get(version)
                    .ok_or(MigrateError::VersionNotFound(version))?;
                let expressions = migration::build(migration, direction).map_err(|e| {
                    MigrateError::Migration {
                        version,
                        description: migration.description(),
                        source: Box::new(e),
                    }
                })?;
                Ok(Step {
                    version,
                    description: migration.description(),
                    expressions,
                })
            })
            .collect()
    }

    async fn bootstrap(&mut self) -> Result<()> {
        for expression in self.version_table.bootstrap() {
            self.processor.process(&expression).await?;
        }
        Ok(())
    }

    async fn run(&mut self, steps: Vec<Step>, direction: Direction) -> Result<Vec<i64>> {
        let mut done = Vec::with_capacity(steps.len());
        for step in steps {
            info!(
                "Migrating {} {}: {}",
                direction, step.version, step.description
            );
            self.apply(&step, direction)
                .await
                .map_err(|e| MigrateError::Migration {
                    version: step.version,
                    description: step.description.clone(),
                    source: Box::new(e),
                })?;
            done.push(step.version);
        }
        Ok(done)
    }

    async fn apply(&mut self, step: &Step, direction: Direction) -> Result<()> {
        let wanted = self.processor.options().transaction_mode == TransactionMode::PerMigration;
        let transactional = wanted && self.processor.supports_transactional_ddl();
        if wanted && !transactional {
            warn!(
                "{} cannot roll back DDL; migration {} runs without a transaction",
                self.processor.dialect(),
                step.version
            );
        }

        if transactional {
            self.processor.begin_transaction().await?;
        }
        let outcome = self.execute_step(step, direction).await;
        match outcome {
            Ok(()) if transactional => self.processor.commit_transaction().await,
            Ok(()) => Ok(()),
            Err(e) => {
                if transactional {
                    if let Err(rollback) = self.processor.rollback_transaction().await {
                        warn!("Rollback of migration {} failed: {}", step.version, rollback);
                    }
                }
                Err(e)
            }
        }
    }

    async fn execute_step(&mut self, step: &Step, direction: Direction) -> Result<()> {
        self.processor.process_all(&step.expressions).await?;
        let record = match direction {
            Direction::Up => self.version_table.record(step.version, &step.description),
            Direction::Down => self.version_table.remove(step.version),
        };
        self.processor.process(&record).await
    }
}
