//! The table that records applied migrations.
//!
//! The table is described with the expression model, so it is created with
//! the same generator as every migration and lands in dialect-correct DDL.

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use crate::ast::{
    ColumnDef, ColumnType, ConditionalExpression, CreateSchema, CreateTable, DataRow, DeleteData,
    Expression, InsertData, RowFilter, SchemaCondition, Value,
};
use crate::config::VersionTableOptions;
use crate::error::{MigrateError, Result};
use crate::processor::Row;
use crate::transpiler::SqlGenerator;

/// One applied migration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationRecord {
    pub version: i64,
    pub applied_on: Option<NaiveDateTime>,
    pub description: String,
}

impl MigrationRecord {
    /// Decode a row selected by [`VersionTable::select_sql`].
    pub fn from_row(row: &Row) -> Result<Self> {
        let version = match row.first() {
            Some(Value::Int(v)) => *v,
            Some(Value::Decimal(s)) | Some(Value::String(s)) => s.trim().parse().map_err(|_| {
                MigrateError::VersionOrder(format!("Unreadable version value '{}'", s))
            })?,
            other => {
                return Err(MigrateError::VersionOrder(format!(
                    "Unreadable version value {:?}",
                    other
                )));
            }
        };
        let applied_on = match row.get(1) {
            Some(Value::DateTime(dt)) => Some(*dt),
            Some(Value::String(s)) => parse_timestamp(s),
            _ => None,
        };
        let description = match row.get(2) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        Ok(Self { version, applied_on, description })
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text.trim(), format).ok())
}

#[derive(Debug, Clone)]
pub struct VersionTable {
    options: VersionTableOptions,
}

impl VersionTable {
    pub fn new(options: VersionTableOptions) -> Self {
        Self { options }
    }

    pub fn schema(&self) -> Option<&str> {
        self.options.schema.as_deref()
    }

    pub fn table(&self) -> &str {
        &self.options.table
    }

    /// Create the schema and table when they are missing.
    pub fn bootstrap(&self) -> Vec<Expression> {
        let mut expressions = Vec::new();
        if let Some(schema) = self.schema() {
            expressions.push(
                ConditionalExpression {
                    condition: SchemaCondition::schema_exists(schema).not(),
                    expressions: vec![CreateSchema { schema: schema.to_string() }.into()],
                }
                .into(),
            );
        }

        let mut table = CreateTable::new(self.table())
            .column(ColumnDef::new(&self.options.version_column, ColumnType::int64()).primary_key())
            .column(ColumnDef::new(&self.options.applied_on_column, ColumnType::datetime()).nullable())
            .column(
                ColumnDef::new(&self.options.description_column, ColumnType::string(Some(1024)))
                    .nullable(),
            );
        table.schema = self.options.schema.clone();

        let mut exists = SchemaCondition::table_exists(self.table());
        if let Some(schema) = self.schema() {
            exists = exists.in_schema(schema);
        }
        expressions.push(
            ConditionalExpression {
                condition: exists.not(),
                expressions: vec![table.into()],
            }
            .into(),
        );
        expressions
    }

    pub fn select_sql(&self, generator: &dyn SqlGenerator) -> String {
        format!(
            "SELECT {}, {}, {} FROM {} ORDER BY {}",
            generator.quote(&self.options.version_column),
            generator.quote(&self.options.applied_on_column),
            generator.quote(&self.options.description_column),
            generator.table_name(self.schema(), self.table()),
            generator.quote(&self.options.version_column),
        )
    }

    pub fn record(&self, version: i64, description: &str) -> Expression {
        let mut insert = InsertData::new(self.table()).row(
            DataRow::new()
                .set(&self.options.version_column, version)
                .set(&self.options.applied_on_column, Utc::now().naive_utc())
                .set(&self.options.description_column, description),
        );
        insert.schema = self.options.schema.clone();
        insert.into()
    }

    pub fn remove(&self, version: i64) -> Expression {
        DeleteData {
            schema: self.options.schema.clone(),
            table: self.table().to_string(),
            filters: vec![RowFilter::Where(
                DataRow::new().set(&self.options.version_column, version),
            )],
        }
        .into()
    }
}
