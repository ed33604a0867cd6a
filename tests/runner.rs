//! Runner transaction protocol against a recording driver.

mod common;

use common::FakeDriver;
use sqlshift::ast::*;
use sqlshift::config::{Options, TransactionMode};
use sqlshift::error::{MigrateError, Result};
use sqlshift::processor::Processor;
use sqlshift::runner::{Migration, MigrationSet, Runner};
use sqlshift::transpiler::Dialect;

struct Raw(i64, &'static str);

impl Migration for Raw {
    fn version(&self) -> i64 {
        self.0
    }

    fn description(&self) -> String {
        format!("raw {}", self.0)
    }

    fn up(&self, ctx: &mut MigrationContext) -> Result<()> {
        ctx.execute_sql(self.1)
    }
}

fn runner(driver: &FakeDriver, options: Options, set: MigrationSet) -> Runner<FakeDriver> {
    Runner::new(Processor::new(driver.clone(), &options), set)
}

/// Position of the first log line containing `needle`.
fn position(log: &[String], needle: &str) -> usize {
    log.iter()
        .position(|l| l.contains(needle))
        .unwrap_or_else(|| panic!("{} not in {:#?}", needle, log))
}

#[tokio::test]
async fn test_each_migration_commits_with_its_version_row() {
    let driver = FakeDriver::new(Dialect::Postgres);
    let set = MigrationSet::new()
        .with(Raw(1, "CREATE TABLE one (id int)"))
        .with(Raw(2, "CREATE TABLE two (id int)"));
    let mut runner = runner(&driver, Options::default(), set);

    assert_eq!(runner.migrate_up(None).await.unwrap(), vec![1, 2]);

    let log = driver.executed();
    assert!(log[0].starts_with("CREATE TABLE") && log[0].contains("VersionInfo"));
    let one = position(&log, "CREATE TABLE one");
    let record_one = position(&log, "VALUES (1,");
    assert_eq!(log[one - 1], "BEGIN");
    assert!(record_one > one);
    assert_eq!(log[record_one + 1], "COMMIT");
    assert_eq!(log[position(&log, "CREATE TABLE two") - 1], "BEGIN");
}

#[tokio::test]
async fn test_failure_rolls_back_only_the_failing_migration() {
    let driver = FakeDriver::new(Dialect::Postgres).fail_on("broken");
    let set = MigrationSet::new()
        .with(Raw(1, "CREATE TABLE one (id int)"))
        .with(Raw(2, "CREATE TABLE two (id int);\nSELECT broken;"))
        .with(Raw(3, "CREATE TABLE three (id int)"));
    let mut runner = runner(&driver, Options::default(), set);

    let err = runner.migrate_up(None).await.unwrap_err();
    match &err {
        MigrateError::Migration { version, source, .. } => {
            assert_eq!(*version, 2);
            assert!(matches!(**source, MigrateError::Execution { ref statement, .. } if statement == "SELECT broken"));
        }
        other => panic!("expected migration error, got {:?}", other),
    }

    let log = driver.executed();
    assert_eq!(log.iter().filter(|l| *l == "COMMIT").count(), 1);
    assert_eq!(log.last().map(String::as_str), Some("ROLLBACK"));
    assert!(!log.iter().any(|l| l.contains("VALUES (2,")));
    assert!(!log.iter().any(|l| l.contains("three")));
}

#[tokio::test]
async fn test_non_transactional_ddl_runs_without_begin() {
    let driver = FakeDriver::new(Dialect::MySql);
    let set = MigrationSet::new().with(Raw(1, "CREATE TABLE one (id int)"));
    let mut runner = runner(&driver, Options::default(), set);

    runner.migrate_up(None).await.unwrap();
    assert!(!driver.log().iter().any(|l| l == "BEGIN"));
}

#[tokio::test]
async fn test_transaction_mode_none() {
    let driver = FakeDriver::new(Dialect::Postgres);
    let options = Options { transaction_mode: TransactionMode::None, ..Options::default() };
    let set = MigrationSet::new().with(Raw(1, "CREATE TABLE one (id int)"));
    let mut runner = runner(&driver, options, set);

    runner.migrate_up(None).await.unwrap();
    assert!(!driver.log().iter().any(|l| l == "BEGIN" || l == "COMMIT"));
}

#[tokio::test]
async fn test_build_errors_stop_before_anything_runs() {
    struct Irreversible;

    impl Migration for Irreversible {
        fn version(&self) -> i64 {
            1
        }

        fn up(&self, ctx: &mut MigrationContext) -> Result<()> {
            ctx.push(UpsertData::new("t", &["id"])?.row(DataRow::new().set("id", 1))?)
        }
    }

    struct Broken;

    impl Migration for Broken {
        fn version(&self) -> i64 {
            2
        }

        fn up(&self, ctx: &mut MigrationContext) -> Result<()> {
            let upsert = UpsertData::new("t", &["id"])?
                .update_columns(&["name"])?
                .ignore_insert_if_exists()?;
            ctx.push(upsert)
        }
    }

    let driver = FakeDriver::new(Dialect::Postgres);
    let set = MigrationSet::new().with(Irreversible).with(Broken);
    let mut runner = runner(&driver, Options::default(), set);

    let err = runner.migrate_up(None).await.unwrap_err();
    assert!(matches!(err, MigrateError::Migration { version: 2, .. }));
    assert!(!driver.executed().iter().any(|l| l.contains("\"t\"")));
}

#[tokio::test]
async fn test_unknown_target_version_fails_first() {
    let driver = FakeDriver::new(Dialect::Postgres);
    let set = MigrationSet::new().with(Raw(1, "SELECT 1"));
    let mut runner = runner(&driver, Options::default(), set);

    let err = runner.migrate_up(Some(9)).await.unwrap_err();
    assert!(matches!(err, MigrateError::VersionNotFound(9)));
    assert!(driver.log().is_empty());
}

#[tokio::test]
async fn test_duplicate_versions_fail_first() {
    let driver = FakeDriver::new(Dialect::Postgres);
    let set = MigrationSet::new().with(Raw(1, "SELECT 1")).with(Raw(1, "SELECT 2"));
    let mut runner = runner(&driver, Options::default(), set);

    assert!(matches!(
        runner.migrate_up(None).await,
        Err(MigrateError::VersionOrder(_))
    ));
    assert!(driver.log().is_empty());
}

#[tokio::test]
async fn test_preview_executes_nothing() {
    let driver = FakeDriver::new(Dialect::Postgres);
    let options = Options { preview: true, ..Options::default() };
    let set = MigrationSet::new()
        .with(Raw(1, "CREATE TABLE one (id int)"))
        .with(Raw(2, "CREATE TABLE two (id int)"));
    let mut runner = runner(&driver, options, set);

    assert_eq!(runner.migrate_up(None).await.unwrap(), vec![1, 2]);
    assert!(driver.executed().is_empty());
}
