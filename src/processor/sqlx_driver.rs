//! [`Driver`] over a single sqlx connection.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::mysql::MySqlConnection;
use sqlx::postgres::PgConnection;
use sqlx::sqlite::SqliteConnection;
use sqlx::{Connection, Executor, Row as _};

use crate::ast::Value;
use crate::error::{DriverError, MigrateError, Result};
use crate::processor::{Driver, Row};
use crate::transpiler::Dialect;

/// Decode every column of a sqlx row into [`Value`]s. Types are tried from
/// the narrowest check outwards; NULL decodes on the first attempt.
macro_rules! decode_row {
    ($row:expr) => {{
        let row = $row;
        (0..row.len())
            .map(|i| {
                if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
                    return Value::from(v);
                }
                if let Ok(v) = row.try_get::<Option<i32>, _>(i) {
                    return Value::from(v);
                }
                if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
                    return Value::from(v);
                }
                if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
                    return Value::from(v);
                }
                if let Ok(v) = row.try_get::<Option<String>, _>(i) {
                    return Value::from(v);
                }
                if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(i) {
                    return Value::from(v);
                }
                if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(i) {
                    return Value::from(v.map(|t| t.naive_utc()));
                }
                Value::Null
            })
            .collect::<Row>()
    }};
}

pub enum SqlxDriver {
    Postgres(PgConnection),
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
}

impl SqlxDriver {
    /// Open a connection; the URL scheme picks the backend.
    pub async fn connect(url: &str) -> Result<Self> {
        let scheme = url.split(':').next().unwrap_or_default();
        let driver = match scheme {
            "postgres" | "postgresql" => {
                SqlxDriver::Postgres(PgConnection::connect(url).await.map_err(connection)?)
            }
            "mysql" | "mariadb" => {
                SqlxDriver::MySql(MySqlConnection::connect(url).await.map_err(connection)?)
            }
            "sqlite" => SqlxDriver::Sqlite(SqliteConnection::connect(url).await.map_err(connection)?),
            other => {
                return Err(MigrateError::Config(format!(
                    "Unsupported database scheme: {} (expected postgres, mysql or sqlite)",
                    other
                )));
            }
        };
        Ok(driver)
    }

    /// Runs `sql` over the unprepared text protocol.
    async fn raw(&mut self, sql: &str) -> std::result::Result<u64, DriverError> {
        let affected = match self {
            SqlxDriver::Postgres(conn) => Executor::execute(&mut *conn, sql).await?.rows_affected(),
            SqlxDriver::MySql(conn) => Executor::execute(&mut *conn, sql).await?.rows_affected(),
            SqlxDriver::Sqlite(conn) => Executor::execute(&mut *conn, sql).await?.rows_affected(),
        };
        Ok(affected)
    }
}

fn connection(e: sqlx::Error) -> MigrateError {
    MigrateError::Connection(Box::new(e))
}

impl Driver for SqlxDriver {
    fn dialect(&self) -> Dialect {
        match self {
            SqlxDriver::Postgres(_) => Dialect::Postgres,
            SqlxDriver::MySql(_) => Dialect::MySql,
            SqlxDriver::Sqlite(_) => Dialect::Sqlite,
        }
    }

    async fn begin(&mut self) -> std::result::Result<(), DriverError> {
        let sql = match self {
            SqlxDriver::MySql(_) => "START TRANSACTION",
            _ => "BEGIN",
        };
        self.raw(sql).await.map(|_| ())
    }

    async fn commit(&mut self) -> std::result::Result<(), DriverError> {
        self.raw("COMMIT").await.map(|_| ())
    }

    async fn rollback(&mut self) -> std::result::Result<(), DriverError> {
        self.raw("ROLLBACK").await.map(|_| ())
    }

    async fn execute(&mut self, sql: &str) -> std::result::Result<u64, DriverError> {
        self.raw(sql).await
    }

    async fn query(&mut self, sql: &str) -> std::result::Result<Vec<Row>, DriverError> {
        let rows = match self {
            SqlxDriver::Postgres(conn) => sqlx::query(sql)
                .fetch_all(&mut *conn)
                .await?
                .iter()
                .map(|row| decode_row!(row))
                .collect(),
            SqlxDriver::MySql(conn) => sqlx::query(sql)
                .fetch_all(&mut *conn)
                .await?
                .iter()
                .map(|row| decode_row!(row))
                .collect(),
            SqlxDriver::Sqlite(conn) => sqlx::query(sql)
                .fetch_all(&mut *conn)
                .await?
                .iter()
                .map(|row| decode_row!(row))
                .collect(),
        };
        Ok(rows)
    }

    async fn close(self) -> std::result::Result<(), DriverError> {
        match self {
            SqlxDriver::Postgres(conn) => conn.close().await?,
            SqlxDriver::MySql(conn) => conn.close().await?,
            SqlxDriver::Sqlite(conn) => conn.close().await?,
        }
        Ok(())
    }
}
