//! End-to-end runs against an in-memory SQLite database.

use pretty_assertions::assert_eq;
use sqlshift::prelude::*;

struct Scripted {
    version: i64,
    description: &'static str,
    up: fn(&mut MigrationContext) -> Result<()>,
}

impl Migration for Scripted {
    fn version(&self) -> i64 {
        self.version
    }

    fn description(&self) -> String {
        self.description.to_string()
    }

    fn up(&self, ctx: &mut MigrationContext) -> Result<()> {
        (self.up)(ctx)
    }
}

fn people(version: i64) -> Scripted {
    Scripted {
        version,
        description: "create people",
        up: |ctx| {
            ctx.push(
                CreateTable::new("People")
                    .column(ColumnDef::new("Email", ColumnType::string(Some(255))).primary_key())
                    .column(ColumnDef::new("Name", ColumnType::string(Some(100))).nullable())
                    .column(ColumnDef::new("Active", ColumnType::boolean()).nullable()),
            )?;
            ctx.push(IndexDef::new("IX_People_Name", "People").column("Name"))
        },
    }
}

fn orders(version: i64) -> Scripted {
    Scripted {
        version,
        description: "create orders",
        up: |ctx| {
            ctx.push(
                CreateTable::new("Orders")
                    .column(ColumnDef::new("Id", ColumnType::int64()).primary_key().identity()),
            )
        },
    }
}

fn order_notes(version: i64) -> Scripted {
    Scripted {
        version,
        description: "add order notes",
        up: |ctx| {
            ctx.push(CreateColumn {
                schema: None,
                table: "Orders".to_string(),
                column: ColumnDef::new("Note", ColumnType::string(None)).nullable(),
            })
        },
    }
}

async fn sqlite_runner(set: MigrationSet) -> Runner<SqlxDriver> {
    let driver = SqlxDriver::connect("sqlite::memory:").await.unwrap();
    Runner::new(Processor::new(driver, &Options::default()), set)
}

async fn versions(runner: &mut Runner<SqlxDriver>) -> Vec<i64> {
    runner
        .list_applied()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.version)
        .collect()
}

#[tokio::test]
async fn test_second_run_applies_nothing() {
    let set = MigrationSet::new().with(people(1)).with(orders(2));
    let mut runner = sqlite_runner(set).await;

    assert_eq!(runner.migrate_up(None).await.unwrap(), vec![1, 2]);
    assert_eq!(runner.migrate_up(None).await.unwrap(), Vec::<i64>::new());

    let records = runner.list_applied().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].description, "create people");
    assert!(records.iter().all(|r| r.applied_on.is_some()));
}

#[tokio::test]
async fn test_migrations_apply_in_version_order() {
    let set = MigrationSet::new()
        .with(people(1))
        .with(order_notes(3))
        .with(orders(2));
    let mut runner = sqlite_runner(set).await;

    // Notes alter the Orders table, so out-of-order application would fail.
    assert_eq!(runner.migrate_up(None).await.unwrap(), vec![1, 2, 3]);
    assert!(runner
        .processor_mut()
        .column_exists(None, "Orders", "Note")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_migrate_up_stops_at_target() {
    let set = MigrationSet::new()
        .with(people(1))
        .with(orders(2))
        .with(order_notes(3));
    let mut runner = sqlite_runner(set).await;

    assert_eq!(runner.migrate_up(Some(2)).await.unwrap(), vec![1, 2]);
    assert_eq!(runner.pending().await.unwrap(), vec![3]);
    assert!(!runner
        .processor_mut()
        .column_exists(None, "Orders", "Note")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_down_reverses_up_automatically() {
    let set = MigrationSet::new()
        .with(people(1))
        .with(orders(2))
        .with(order_notes(3));
    let mut runner = sqlite_runner(set).await;
    runner.migrate_up(None).await.unwrap();

    assert_eq!(runner.rollback(1).await.unwrap(), vec![3]);
    let p = runner.processor_mut();
    assert!(p.table_exists(None, "Orders").await.unwrap());
    assert!(!p.column_exists(None, "Orders", "Note").await.unwrap());
    assert_eq!(versions(&mut runner).await, vec![1, 2]);

    assert_eq!(runner.migrate_down(0).await.unwrap(), vec![2, 1]);
    let p = runner.processor_mut();
    assert!(!p.table_exists(None, "Orders").await.unwrap());
    assert!(!p.table_exists(None, "People").await.unwrap());
    assert!(!p.index_exists(None, "People", "IX_People_Name").await.unwrap());
    assert!(p.table_exists(None, "VersionInfo").await.unwrap());
    assert!(versions(&mut runner).await.is_empty());
}

#[tokio::test]
async fn test_failed_migration_leaves_no_trace() {
    let broken = Scripted {
        version: 2,
        description: "half a migration",
        up: |ctx| ctx.execute_sql("CREATE TABLE Half (Id INTEGER);\nINSERT INTO Nowhere VALUES (1);"),
    };
    let set = MigrationSet::new().with(people(1)).with(broken).with(orders(3));
    let mut runner = sqlite_runner(set).await;

    let err = runner.migrate_up(None).await.unwrap_err();
    match err {
        MigrateError::Migration { version, source, .. } => {
            assert_eq!(version, 2);
            assert!(matches!(
                *source,
                MigrateError::Execution { ref statement, .. } if statement == "INSERT INTO Nowhere VALUES (1)"
            ));
        }
        other => panic!("expected migration error, got {:?}", other),
    }

    let p = runner.processor_mut();
    assert!(p.table_exists(None, "People").await.unwrap());
    assert!(!p.table_exists(None, "Half").await.unwrap());
    assert!(!p.table_exists(None, "Orders").await.unwrap());
    assert_eq!(versions(&mut runner).await, vec![1]);
}

#[tokio::test]
async fn test_conditional_block_is_skipped_when_false() {
    let guarded = Scripted {
        version: 2,
        description: "guarded",
        up: |ctx| {
            ctx.when(SchemaCondition::table_exists("Missing"), |c| {
                c.push(
                    CreateTable::new("NeverCreated")
                        .column(ColumnDef::new("Id", ColumnType::int32())),
                )
            })?;
            ctx.when(
                SchemaCondition::table_exists("People")
                    .and(SchemaCondition::column_exists("People", "Age").not()),
                |c| {
                    c.push(CreateColumn {
                        schema: None,
                        table: "People".to_string(),
                        column: ColumnDef::new("Age", ColumnType::int32()).nullable(),
                    })
                },
            )
        },
    };
    let set = MigrationSet::new().with(people(1)).with(guarded);
    let mut runner = sqlite_runner(set).await;

    assert_eq!(runner.migrate_up(None).await.unwrap(), vec![1, 2]);
    let p = runner.processor_mut();
    assert!(!p.table_exists(None, "NeverCreated").await.unwrap());
    assert!(p.column_exists(None, "People", "Age").await.unwrap());
}

#[tokio::test]
async fn test_upsert_update_modes() {
    let mut runner = sqlite_runner(MigrationSet::new().with(people(1))).await;
    runner.migrate_up(None).await.unwrap();
    let p = runner.processor_mut();

    let row = |name: &str, active: bool| {
        DataRow::new().set("Email", "a@x.com").set("Name", name).set("Active", active)
    };
    let select = "SELECT \"Name\", \"Active\" FROM \"People\" WHERE \"Email\" = 'a@x.com'";

    p.process(&InsertData::new("People").row(row("A", false)).into())
        .await
        .unwrap();

    // Every non-match column by default.
    let all = UpsertData::new("People", &["Email"]).unwrap().row(row("B", true)).unwrap();
    p.process(&all.into()).await.unwrap();
    assert_eq!(
        p.query(select).await.unwrap(),
        vec![vec![Value::String("B".to_string()), Value::Int(1)]]
    );

    // Only the named columns.
    let named = UpsertData::new("People", &["Email"])
        .unwrap()
        .row(row("C", false))
        .unwrap()
        .update_columns(&["Name"])
        .unwrap();
    p.process(&named.into()).await.unwrap();
    assert_eq!(
        p.query(select).await.unwrap(),
        vec![vec![Value::String("C".to_string()), Value::Int(1)]]
    );

    // An update column the row does not carry is refused before any SQL.
    let partial = UpsertData::new("People", &["Email"])
        .unwrap()
        .row(DataRow::new().set("Email", "a@x.com").set("Name", "X"))
        .unwrap()
        .update_columns(&["Name", "Active"]);
    assert!(matches!(partial, Err(MigrateError::Validation(_))));

    // Existing rows untouched, new rows inserted.
    let ignore = UpsertData::new("People", &["Email"])
        .unwrap()
        .row(row("D", false))
        .unwrap()
        .row(DataRow::new().set("Email", "b@x.com").set("Name", "E"))
        .unwrap()
        .ignore_insert_if_exists()
        .unwrap();
    p.process(&ignore.into()).await.unwrap();
    assert_eq!(
        p.query(select).await.unwrap(),
        vec![vec![Value::String("C".to_string()), Value::Int(1)]]
    );
    assert_eq!(
        p.query("SELECT COUNT(*) FROM \"People\"").await.unwrap(),
        vec![vec![Value::Int(2)]]
    );
}

#[tokio::test]
async fn test_out_of_order_versions_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("app.db").display());

    let driver = SqlxDriver::connect(&url).await.unwrap();
    let set = MigrationSet::new().with(people(1));
    let mut runner = Runner::new(Processor::new(driver, &Options::default()), set);
    runner.migrate_up(None).await.unwrap();
    runner.into_processor().close().await.unwrap();

    // Another branch applied version 3 before 2 existed.
    let driver = SqlxDriver::connect(&url).await.unwrap();
    let set = MigrationSet::new().with(people(1)).with(orders(3));
    let mut runner = Runner::new(Processor::new(driver, &Options::default()), set);
    assert_eq!(runner.migrate_up(None).await.unwrap(), vec![3]);
    runner.into_processor().close().await.unwrap();

    let driver = SqlxDriver::connect(&url).await.unwrap();
    let set = MigrationSet::new()
        .with(people(1))
        .with(orders(2))
        .with(order_notes(3));
    let mut runner = Runner::new(Processor::new(driver, &Options::default()), set);
    assert!(matches!(
        runner.validate_version_order().await,
        Err(MigrateError::VersionOrder(_))
    ));
    // Older unapplied versions are skipped, never run out of order.
    assert_eq!(runner.migrate_up(None).await.unwrap(), Vec::<i64>::new());
}

#[tokio::test]
async fn test_rollback_step_counts() {
    let set = MigrationSet::new()
        .with(people(1))
        .with(orders(2))
        .with(order_notes(3));
    let mut runner = sqlite_runner(set).await;
    runner.migrate_up(None).await.unwrap();

    assert_eq!(runner.rollback(0).await.unwrap(), Vec::<i64>::new());
    assert_eq!(versions(&mut runner).await, vec![1, 2, 3]);

    // More steps than applied migrations reverts everything.
    assert_eq!(runner.rollback(5).await.unwrap(), vec![3, 2, 1]);
    assert!(versions(&mut runner).await.is_empty());
    let p = runner.processor_mut();
    assert!(!p.table_exists(None, "People").await.unwrap());
    assert!(!p.table_exists(None, "Orders").await.unwrap());

    runner.migrate_up(None).await.unwrap();
    assert_eq!(runner.rollback(3).await.unwrap(), vec![3, 2, 1]);
    assert!(versions(&mut runner).await.is_empty());
}

#[tokio::test]
async fn test_guarded_migration_needs_explicit_down() {
    let guarded = Scripted {
        version: 1,
        description: "create t when missing",
        up: |ctx| {
            ctx.when(SchemaCondition::table_exists("T").not(), |c| {
                c.push(CreateTable::new("T").column(ColumnDef::new("Id", ColumnType::int32())))
            })
        },
    };
    let mut runner = sqlite_runner(MigrationSet::new().with(guarded)).await;
    assert_eq!(runner.migrate_up(None).await.unwrap(), vec![1]);

    let err = runner.migrate_down(0).await.unwrap_err();
    match err {
        MigrateError::Migration { version, source, .. } => {
            assert_eq!(version, 1);
            assert!(matches!(*source, MigrateError::Validation(_)));
        }
        other => panic!("expected migration error, got {:?}", other),
    }

    assert!(runner.processor_mut().table_exists(None, "T").await.unwrap());
    assert_eq!(versions(&mut runner).await, vec![1]);
}
