//! Migrations and the ordered set a runner works from.

use std::collections::BTreeMap;

use crate::ast::{Expression, MigrationContext};
use crate::error::{MigrateError, Result};

/// One versioned schema change.
///
/// `up` and `down` only record expressions; nothing touches the database
/// until the runner executes them.
pub trait Migration: Send + Sync {
    fn version(&self) -> i64;

    fn description(&self) -> String {
        String::new()
    }

    fn up(&self, ctx: &mut MigrationContext) -> Result<()>;

    /// Defaults to the inverse of `up`, last expression first. Fails when
    /// `up` records anything without an inverse.
    fn down(&self, ctx: &mut MigrationContext) -> Result<()> {
        let mut forward = MigrationContext::new();
        self.up(&mut forward)?;
        for expression in forward.expressions().iter().rev() {
            ctx.push(expression.reverse()?)?;
        }
        Ok(())
    }
}

/// Which way a migration is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Collect the expressions for one direction of a migration.
pub fn build(migration: &dyn Migration, direction: Direction) -> Result<Vec<Expression>> {
    let mut ctx = MigrationContext::new();
    match direction {
        Direction::Up => migration.up(&mut ctx)?,
        Direction::Down => migration.down(&mut ctx)?,
    }
    Ok(ctx.into_expressions())
}

/// Available migrations, kept in ascending version order whatever order
/// they were added in.
#[derive(Default)]
pub struct MigrationSet {
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, migration: impl Migration + 'static) {
        self.push(Box::new(migration));
    }

    pub fn with(mut self, migration: impl Migration + 'static) -> Self {
        self.add(migration);
        self
    }

    pub fn push(&mut self, migration: Box<dyn Migration>) {
        let at = self
            .migrations
            .partition_point(|m| m.version() <= migration.version());
        self.migrations.insert(at, migration);
    }

    pub fn get(&self, version: i64) -> Option<&dyn Migration> {
        self.migrations
            .iter()
            .find(|m| m.version() == version)
            .map(|m| m.as_ref())
    }

    pub fn contains(&self, version: i64) -> bool {
        self.get(version).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Migration> {
        self.migrations.iter().map(|m| m.as_ref())
    }

    pub fn versions(&self) -> Vec<i64> {
        self.migrations.iter().map(|m| m.version()).collect()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Versions must be positive and unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen: BTreeMap<i64, usize> = BTreeMap::new();
        for migration in &self.migrations {
            let version = migration.version();
            if version <= 0 {
                return Err(MigrateError::VersionOrder(format!(
                    "Migration version {} must be positive",
                    version
                )));
            }
            *seen.entry(version).or_default() += 1;
        }
        let duplicates: Vec<String> = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(version, _)| version.to_string())
            .collect();
        if !duplicates.is_empty() {
            return Err(MigrateError::VersionOrder(format!(
                "Duplicate migration version(s): {}",
                duplicates.join(", ")
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MigrationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationSet")
            .field("versions", &self.versions())
            .finish()
    }
}
