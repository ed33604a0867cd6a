//! Processor behaviour against a recording driver.

mod common;

use std::time::Duration;

use common::FakeDriver;
use pretty_assertions::assert_eq;
use sqlshift::ast::*;
use sqlshift::config::Options;
use sqlshift::error::MigrateError;
use sqlshift::processor::Processor;
use sqlshift::transpiler::{CompatibilityMode, Dialect};
use tokio_util::sync::CancellationToken;

fn processor(driver: &FakeDriver, options: Options) -> Processor<FakeDriver> {
    Processor::new(driver.clone(), &options)
}

fn users_table() -> Expression {
    CreateTable::new("users")
        .column(ColumnDef::new("id", ColumnType::int32()).primary_key())
        .into()
}

#[tokio::test]
async fn test_preview_logs_without_executing() {
    let driver = FakeDriver::new(Dialect::Postgres);
    let mut p = processor(&driver, Options { preview: true, ..Options::default() });

    p.begin_transaction().await.unwrap();
    p.process(&users_table()).await.unwrap();
    p.commit_transaction().await.unwrap();

    assert!(driver.log().is_empty());
}

#[tokio::test]
async fn test_preview_still_reads_the_catalog() {
    let driver = FakeDriver::new(Dialect::Postgres);
    let mut p = processor(&driver, Options { preview: true, ..Options::default() });

    assert!(!p.table_exists(None, "users").await.unwrap());
    assert_eq!(driver.log().len(), 1);
    assert!(driver.log()[0].starts_with("QUERY SELECT 1 FROM INFORMATION_SCHEMA.TABLES"));
}

#[tokio::test]
async fn test_script_is_split_into_statements() {
    let driver = FakeDriver::new(Dialect::Postgres);
    let mut p = processor(&driver, Options::default());

    p.execute("-- two tables\nCREATE TABLE a (id int);\nCREATE TABLE b (note text DEFAULT ';');")
        .await
        .unwrap();

    assert_eq!(
        driver.executed(),
        vec![
            "CREATE TABLE a (id int)".to_string(),
            "CREATE TABLE b (note text DEFAULT ';')".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_single_statement_loses_its_terminator() {
    let driver = FakeDriver::new(Dialect::Postgres);
    let mut p = processor(&driver, Options::default());

    p.execute("  DROP TABLE a;  ").await.unwrap();

    assert_eq!(driver.executed(), vec!["DROP TABLE a".to_string()]);
}

#[tokio::test]
async fn test_oracle_statements_never_carry_a_semicolon() {
    let driver = FakeDriver::new(Dialect::Oracle);
    let mut p = processor(&driver, Options::default());

    p.process(&DeleteTable::new("Users").into()).await.unwrap();
    p.process(
        &CreateTable::new("T")
            .column(ColumnDef::new("c", ColumnType::int32()))
            .description("d")
            .into(),
    )
    .await
    .unwrap();

    let executed = driver.executed();
    assert_eq!(executed[0], "DROP TABLE Users");
    assert_eq!(executed.len(), 3);
    assert!(executed.iter().all(|s| !s.ends_with(';')));
}

#[tokio::test]
async fn test_oracle_block_keeps_its_end() {
    let driver = FakeDriver::new(Dialect::Oracle);
    let mut p = processor(&driver, Options::default());

    p.execute("BEGIN\n  UPDATE t SET x = 1;\nEND;").await.unwrap();

    assert_eq!(
        driver.executed(),
        vec!["BEGIN\n  UPDATE t SET x = 1;\nEND;".to_string()]
    );
}

#[tokio::test]
async fn test_separator_dialect_sends_single_batch_as_written() {
    let driver = FakeDriver::new(Dialect::SqlServer);
    let mut p = processor(&driver, Options::default());

    p.execute("UPDATE t SET x = 1;").await.unwrap();

    assert_eq!(driver.executed(), vec!["UPDATE t SET x = 1;".to_string()]);
}

#[tokio::test]
async fn test_go_count_repeats_the_batch() {
    let driver = FakeDriver::new(Dialect::SqlServer);
    let mut p = processor(&driver, Options::default());

    p.execute("INSERT INTO t DEFAULT VALUES\nGO 3\nSELECT 1\nGO")
        .await
        .unwrap();

    assert_eq!(
        driver.executed(),
        vec![
            "INSERT INTO t DEFAULT VALUES".to_string(),
            "INSERT INTO t DEFAULT VALUES".to_string(),
            "INSERT INTO t DEFAULT VALUES".to_string(),
            "SELECT 1".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_failure_names_the_failing_statement() {
    let driver = FakeDriver::new(Dialect::MySql).fail_on("second");
    let mut p = processor(&driver, Options::default());

    let err = p
        .execute("UPDATE first SET x = 1;\nUPDATE second SET x = 2;\nUPDATE third SET x = 3;")
        .await
        .unwrap_err();

    match err {
        MigrateError::Execution { statement, .. } => {
            assert_eq!(statement, "UPDATE second SET x = 2")
        }
        other => panic!("expected execution error, got {:?}", other),
    }
    assert_eq!(driver.executed().len(), 2);
}

#[tokio::test]
async fn test_failed_condition_lookup_skips_the_block() {
    let driver = FakeDriver::new(Dialect::Postgres).fail_queries();
    let mut p = processor(&driver, Options::default());

    let block: Expression = ConditionalExpression {
        condition: SchemaCondition::table_exists("users"),
        expressions: vec![DeleteTable::new("users").into()],
    }
    .into();
    p.process(&block).await.unwrap();

    assert!(driver.executed().is_empty());
}

#[tokio::test]
async fn test_condition_runs_nested_expressions_in_order() {
    let driver = FakeDriver::new(Dialect::Postgres).answer("INFORMATION_SCHEMA.TABLES");
    let mut p = processor(&driver, Options::default());

    let block: Expression = ConditionalExpression {
        condition: SchemaCondition::table_exists("users")
            .and(SchemaCondition::column_exists("users", "legacy").not()),
        expressions: vec![
            CreateColumn {
                schema: None,
                table: "users".to_string(),
                column: ColumnDef::new("legacy", ColumnType::boolean()).nullable(),
            }
            .into(),
            InsertData::new("audit").row(DataRow::new().set("note", "added")).into(),
        ],
    }
    .into();
    p.process(&block).await.unwrap();

    assert_eq!(
        driver.executed(),
        vec![
            "ALTER TABLE \"users\" ADD COLUMN \"legacy\" boolean NULL".to_string(),
            "INSERT INTO \"audit\" (\"note\") VALUES ('added')".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_exists_propagates_lookup_errors() {
    let driver = FakeDriver::new(Dialect::Postgres).fail_queries();
    let mut p = processor(&driver, Options::default());

    assert!(p.table_exists(None, "users").await.is_err());
    assert!(!p.evaluate(&SchemaCondition::table_exists("users")).await);
}

#[tokio::test]
async fn test_loose_mode_skips_unsupported_operations() {
    let driver = FakeDriver::new(Dialect::Sqlite);
    let options = Options { compatibility: CompatibilityMode::Loose, ..Options::default() };
    let mut p = processor(&driver, options);

    p.process(&CreateSchema { schema: "app".to_string() }.into())
        .await
        .unwrap();

    assert!(driver.log().is_empty());
}

#[tokio::test]
async fn test_strict_mode_reports_the_gap() {
    let driver = FakeDriver::new(Dialect::Sqlite);
    let mut p = processor(&driver, Options::default());

    let err = p
        .process(&CreateSchema { schema: "app".to_string() }.into())
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::Unsupported { dialect: Dialect::Sqlite, .. }));
}

#[tokio::test]
async fn test_statement_timeout() {
    let driver = FakeDriver::new(Dialect::Postgres).delay(Duration::from_secs(3));
    let mut p = processor(&driver, Options { timeout_secs: Some(1), ..Options::default() });

    let err = p.execute("SELECT pg_sleep(3)").await.unwrap_err();
    assert!(matches!(err, MigrateError::Timeout { seconds: 1, .. }));
}

#[tokio::test]
async fn test_cancellation_stops_before_next_statement() {
    let driver = FakeDriver::new(Dialect::Postgres);
    let token = CancellationToken::new();
    let mut p = processor(&driver, Options::default()).with_cancellation(token.clone());

    p.execute("SELECT 1").await.unwrap();
    token.cancel();
    let err = p.execute("SELECT 2").await.unwrap_err();

    assert!(matches!(err, MigrateError::Cancelled));
    assert_eq!(driver.executed(), vec!["SELECT 1".to_string()]);
}
