//! A scripted in-memory driver that records what it is asked to run.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlshift::ast::Value;
use sqlshift::error::DriverError;
use sqlshift::processor::{Driver, Row};
use sqlshift::transpiler::Dialect;

#[derive(Default)]
pub struct Script {
    /// Every call, in order. Queries are prefixed with `QUERY `.
    pub log: Vec<String>,
    /// Statements containing this text fail.
    pub fail_on: Option<String>,
    /// Every query fails.
    pub fail_queries: bool,
    /// Queries containing the key answer with the rows.
    pub answers: Vec<(String, Vec<Row>)>,
    /// Each statement takes this long.
    pub delay: Option<Duration>,
}

#[derive(Clone)]
pub struct FakeDriver {
    dialect: Dialect,
    pub script: Arc<Mutex<Script>>,
}

impl FakeDriver {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    pub fn fail_on(self, text: &str) -> Self {
        self.script.lock().unwrap().fail_on = Some(text.to_string());
        self
    }

    pub fn fail_queries(self) -> Self {
        self.script.lock().unwrap().fail_queries = true;
        self
    }

    pub fn answer(self, query_contains: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .answers
            .push((query_contains.to_string(), vec![vec![Value::Int(1)]]));
        self
    }

    pub fn delay(self, delay: Duration) -> Self {
        self.script.lock().unwrap().delay = Some(delay);
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.script.lock().unwrap().log.clone()
    }

    /// Logged statements, without queries.
    pub fn executed(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter(|l| !l.starts_with("QUERY "))
            .collect()
    }
}

impl Driver for FakeDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn begin(&mut self) -> Result<(), DriverError> {
        self.script.lock().unwrap().log.push("BEGIN".to_string());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        self.script.lock().unwrap().log.push("COMMIT".to_string());
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        self.script.lock().unwrap().log.push("ROLLBACK".to_string());
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, DriverError> {
        let (delay, fails) = {
            let mut script = self.script.lock().unwrap();
            script.log.push(sql.to_string());
            let fails = script.fail_on.as_deref().is_some_and(|f| sql.contains(f));
            (script.delay, fails)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fails {
            return Err("statement rejected".into());
        }
        Ok(1)
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, DriverError> {
        let mut script = self.script.lock().unwrap();
        script.log.push(format!("QUERY {}", sql));
        if script.fail_queries {
            return Err("catalog unavailable".into());
        }
        Ok(script
            .answers
            .iter()
            .find(|(key, _)| sql.contains(key.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn close(self) -> Result<(), DriverError> {
        Ok(())
    }
}
