//! Catalog queries behind the existence predicates.
//!
//! Every query returns at least one row when the object exists and none when
//! it does not. Names are substituted as escaped string literals in the form
//! the catalog stores them (see [`Quoter::catalog_name`]).
//!
//! [`Quoter::catalog_name`]: crate::transpiler::Quoter::catalog_name

use crate::ast::{SchemaCondition, Value};
use crate::error::{MigrateError, Result};
use crate::transpiler::{Dialect, SqlGenerator};

/// The existence query for one leaf predicate.
pub fn existence_query(generator: &dyn SqlGenerator, condition: &SchemaCondition) -> Result<String> {
    let catalog = Catalog { generator };
    match condition {
        SchemaCondition::SchemaExists { schema } => catalog.schema_exists(schema),
        SchemaCondition::TableExists { schema, table } => {
            catalog.table_exists(schema.as_deref(), table)
        }
        SchemaCondition::ColumnExists { schema, table, column } => {
            catalog.column_exists(schema.as_deref(), table, column)
        }
        SchemaCondition::IndexExists { schema, table, index } => {
            catalog.index_exists(schema.as_deref(), table, index)
        }
        SchemaCondition::ConstraintExists { schema, table, constraint } => {
            catalog.constraint_exists(schema.as_deref(), table, constraint)
        }
        SchemaCondition::SequenceExists { schema, sequence } => {
            catalog.sequence_exists(schema.as_deref(), sequence)
        }
        SchemaCondition::DefaultValueExists { schema, table, column, default } => {
            catalog.default_value_exists(schema.as_deref(), table, column, default)
        }
        SchemaCondition::Not(_) | SchemaCondition::All(_) | SchemaCondition::Any(_) => {
            Err(MigrateError::Validation(format!(
                "{} is a composite condition, not a catalog lookup",
                condition
            )))
        }
    }
}

struct Catalog<'a> {
    generator: &'a dyn SqlGenerator,
}

impl Catalog<'_> {
    fn dialect(&self) -> Dialect {
        self.generator.dialect()
    }

    fn lit(&self, name: &str) -> String {
        self.generator.quoter().catalog_literal(name)
    }

    /// Schema literal, or the session's current schema when none is given.
    fn schema(&self, schema: Option<&str>) -> String {
        match schema {
            Some(name) => self.lit(name),
            None => match self.dialect() {
                Dialect::Postgres => "current_schema()".to_string(),
                Dialect::MySql => "DATABASE()".to_string(),
                Dialect::Sqlite => "'main'".to_string(),
                Dialect::SqlServer => "SCHEMA_NAME()".to_string(),
                Dialect::Oracle => "USER".to_string(),
            },
        }
    }

    /// SQLite keeps each attached database's catalog in `<schema>.sqlite_master`.
    fn sqlite_master(&self, schema: Option<&str>) -> String {
        match schema {
            Some(name) => format!("{}.sqlite_master", self.generator.quote(name)),
            None => "sqlite_master".to_string(),
        }
    }

    fn schema_exists(&self, schema: &str) -> Result<String> {
        let name = self.lit(schema);
        Ok(match self.dialect() {
            Dialect::Postgres | Dialect::MySql => format!(
                "SELECT 1 FROM information_schema.schemata WHERE schema_name = {}",
                name
            ),
            Dialect::Sqlite => format!("SELECT 1 FROM pragma_database_list WHERE name = {}", name),
            Dialect::SqlServer => format!("SELECT 1 FROM sys.schemas WHERE name = {}", name),
            Dialect::Oracle => format!("SELECT 1 FROM ALL_USERS WHERE USERNAME = {}", name),
        })
    }

    fn table_exists(&self, schema: Option<&str>, table: &str) -> Result<String> {
        let table = self.lit(table);
        Ok(match self.dialect() {
            Dialect::Postgres | Dialect::MySql | Dialect::SqlServer => format!(
                "SELECT 1 FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {}",
                self.schema(schema),
                table
            ),
            Dialect::Sqlite => format!(
                "SELECT 1 FROM {} WHERE type = 'table' AND name = {}",
                self.sqlite_master(schema),
                table
            ),
            Dialect::Oracle => format!(
                "SELECT 1 FROM ALL_TABLES WHERE OWNER = {} AND TABLE_NAME = {}",
                self.schema(schema),
                table
            ),
        })
    }

    fn column_exists(&self, schema: Option<&str>, table: &str, column: &str) -> Result<String> {
        let (table, column) = (self.lit(table), self.lit(column));
        Ok(match self.dialect() {
            Dialect::Postgres | Dialect::MySql | Dialect::SqlServer => format!(
                "SELECT 1 FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {} AND COLUMN_NAME = {}",
                self.schema(schema),
                table,
                column
            ),
            Dialect::Sqlite => format!(
                "SELECT 1 FROM pragma_table_info({}, {}) WHERE name = {}",
                table,
                self.schema(schema),
                column
            ),
            Dialect::Oracle => format!(
                "SELECT 1 FROM ALL_TAB_COLUMNS WHERE OWNER = {} AND TABLE_NAME = {} AND COLUMN_NAME = {}",
                self.schema(schema),
                table,
                column
            ),
        })
    }

    fn index_exists(&self, schema: Option<&str>, table: &str, index: &str) -> Result<String> {
        let index_lit = self.lit(index);
        Ok(match self.dialect() {
            Dialect::Postgres => format!(
                "SELECT 1 FROM pg_indexes WHERE schemaname = {} AND tablename = {} AND indexname = {}",
                self.schema(schema),
                self.lit(table),
                index_lit
            ),
            Dialect::MySql => format!(
                "SELECT 1 FROM information_schema.statistics WHERE table_schema = {} AND table_name = {} AND index_name = {}",
                self.schema(schema),
                self.lit(table),
                index_lit
            ),
            Dialect::Sqlite => format!(
                "SELECT 1 FROM {} WHERE type = 'index' AND tbl_name = {} AND name = {}",
                self.sqlite_master(schema),
                self.lit(table),
                index_lit
            ),
            Dialect::SqlServer => {
                let object = self.generator.table_name(Some(schema.unwrap_or("dbo")), table);
                format!(
                    "SELECT 1 FROM sys.indexes WHERE object_id = OBJECT_ID({}) AND name = {}",
                    self.generator.quoter().quote_string(&object),
                    index_lit
                )
            }
            Dialect::Oracle => format!(
                "SELECT 1 FROM ALL_INDEXES WHERE OWNER = {} AND TABLE_NAME = {} AND INDEX_NAME = {}",
                self.schema(schema),
                self.lit(table),
                index_lit
            ),
        })
    }

    fn constraint_exists(&self, schema: Option<&str>, table: &str, constraint: &str) -> Result<String> {
        Ok(match self.dialect() {
            Dialect::Postgres | Dialect::MySql | Dialect::SqlServer => format!(
                "SELECT 1 FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS WHERE CONSTRAINT_SCHEMA = {} AND TABLE_NAME = {} AND CONSTRAINT_NAME = {}",
                self.schema(schema),
                self.lit(table),
                self.lit(constraint)
            ),
            // No constraint catalog: match the name inside the stored CREATE TABLE text.
            Dialect::Sqlite => format!(
                "SELECT 1 FROM {} WHERE type = 'table' AND name = {} AND sql LIKE {}",
                self.sqlite_master(schema),
                self.lit(table),
                self.generator
                    .quoter()
                    .quote_string(&format!("%CONSTRAINT%{}%", constraint))
            ),
            Dialect::Oracle => format!(
                "SELECT 1 FROM ALL_CONSTRAINTS WHERE OWNER = {} AND TABLE_NAME = {} AND CONSTRAINT_NAME = {}",
                self.schema(schema),
                self.lit(table),
                self.lit(constraint)
            ),
        })
    }

    fn sequence_exists(&self, schema: Option<&str>, sequence: &str) -> Result<String> {
        let sequence = self.lit(sequence);
        match self.dialect() {
            Dialect::Postgres => Ok(format!(
                "SELECT 1 FROM information_schema.sequences WHERE sequence_schema = {} AND sequence_name = {}",
                self.schema(schema),
                sequence
            )),
            Dialect::SqlServer => Ok(format!(
                "SELECT 1 FROM sys.sequences WHERE schema_id = SCHEMA_ID({}) AND name = {}",
                self.schema(schema),
                sequence
            )),
            Dialect::Oracle => Ok(format!(
                "SELECT 1 FROM ALL_SEQUENCES WHERE SEQUENCE_OWNER = {} AND SEQUENCE_NAME = {}",
                self.schema(schema),
                sequence
            )),
            dialect @ (Dialect::MySql | Dialect::Sqlite) => {
                Err(MigrateError::unsupported("sequence lookup", dialect))
            }
        }
    }

    /// Compares the stored default text against the value as this dialect
    /// renders it. Catalogs wrap defaults differently (`('x')`, `'x'::text`),
    /// so the comparison is a containment match.
    fn default_value_exists(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
        default: &Value,
    ) -> Result<String> {
        let rendered = self.generator.format_value(default)?;
        let pattern = self
            .generator
            .quoter()
            .quote_string(&format!("%{}%", rendered));
        let (table_lit, column_lit) = (self.lit(table), self.lit(column));
        match self.dialect() {
            Dialect::Postgres | Dialect::MySql => Ok(format!(
                "SELECT 1 FROM information_schema.columns WHERE table_schema = {} AND table_name = {} AND column_name = {} AND column_default LIKE {}",
                self.schema(schema),
                table_lit,
                column_lit,
                pattern
            )),
            Dialect::Sqlite => Ok(format!(
                "SELECT 1 FROM pragma_table_info({}, {}) WHERE name = {} AND dflt_value LIKE {}",
                table_lit,
                self.schema(schema),
                column_lit,
                pattern
            )),
            Dialect::SqlServer => {
                let object = self.generator.table_name(Some(schema.unwrap_or("dbo")), table);
                Ok(format!(
                    "SELECT 1 FROM sys.default_constraints d JOIN sys.columns c ON c.object_id = d.parent_object_id AND c.column_id = d.parent_column_id WHERE d.parent_object_id = OBJECT_ID({}) AND c.name = {} AND d.definition LIKE {}",
                    self.generator.quoter().quote_string(&object),
                    column_lit,
                    pattern
                ))
            }
            Dialect::Oracle => Err(MigrateError::unsupported("default value lookup", Dialect::Oracle)),
        }
    }
}
