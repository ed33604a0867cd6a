//! SQLite generator.
//!
//! SQLite has type affinity rather than sized types, and `ALTER TABLE` only
//! knows how to add, drop and rename. Everything else is a capability gap.

use tracing::debug;

use crate::ast::*;
use crate::config::Options;
use crate::error::Result;
use crate::transpiler::traits::terminate;
use crate::transpiler::{Dialect, GeneratorBase, SqlGenerator, TypeMap};

pub struct SqliteGenerator {
    base: GeneratorBase,
}

impl SqliteGenerator {
    pub fn new(options: &Options) -> Self {
        Self {
            base: GeneratorBase {
                dialect: Dialect::Sqlite,
                quoter: Dialect::Sqlite.quoter(options.force_quote),
                types: type_map(),
                compatibility: options.compatibility,
            },
        }
    }

    /// `INTEGER PRIMARY KEY AUTOINCREMENT` has to sit on the column itself.
    fn inline_identity_key(columns: &[ColumnDef]) -> bool {
        let keys = columns.iter().filter(|c| c.primary_key).count();
        keys == 1 && columns.iter().any(|c| c.primary_key && c.identity)
    }
}

fn type_map() -> TypeMap {
    TypeMap::new(Dialect::Sqlite)
        .set(DbType::AnsiString, "TEXT")
        .set(DbType::AnsiStringFixedLength, "TEXT")
        .set(DbType::Binary, "BLOB")
        .set(DbType::Boolean, "INTEGER")
        .set(DbType::Byte, "INTEGER")
        .set(DbType::Currency, "NUMERIC")
        .set(DbType::Date, "DATETIME")
        .set(DbType::DateTime, "DATETIME")
        .set(DbType::DateTime2, "DATETIME")
        .set(DbType::DateTimeOffset, "DATETIME")
        .set(DbType::Decimal, "NUMERIC")
        .set(DbType::Double, "REAL")
        .set(DbType::Guid, "UNIQUEIDENTIFIER")
        .set(DbType::Int16, "INTEGER")
        .set(DbType::Int32, "INTEGER")
        .set(DbType::Int64, "INTEGER")
        .set(DbType::Single, "REAL")
        .set(DbType::String, "TEXT")
        .set(DbType::StringFixedLength, "TEXT")
        .set(DbType::Time, "DATETIME")
        .set(DbType::Xml, "TEXT")
}

impl SqlGenerator for SqliteGenerator {
    fn base(&self) -> &GeneratorBase {
        &self.base
    }

    /// Stays strict in loose mode: the result is a value inside a larger
    /// statement, and an empty value would leave `DEFAULT` with nothing after it.
    fn system_method(&self, method: SystemMethod) -> Result<String> {
        match method {
            SystemMethod::CurrentDateTime => Ok("(datetime('now','localtime'))".to_string()),
            SystemMethod::CurrentUtcDateTime => Ok("CURRENT_TIMESTAMP".to_string()),
            SystemMethod::NewGuid | SystemMethod::CurrentUser => Err(
                crate::error::MigrateError::unsupported(format!("{:?}", method), self.dialect()),
            ),
        }
    }

    fn identity_clause(&self, column: &ColumnDef) -> Result<String> {
        if column.primary_key {
            Ok("PRIMARY KEY AUTOINCREMENT".to_string())
        } else {
            self.unsupported("IDENTITY without PRIMARY KEY")
        }
    }

    fn bool_literal(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    fn datetime_literal(&self, value: &chrono::NaiveDateTime) -> String {
        format!("'{}'", value.format("%Y-%m-%d %H:%M:%S"))
    }

    fn computed_clause(&self, _column: &ColumnDef, _expression: &str) -> Result<String> {
        self.unsupported("COMPUTED COLUMN")
    }

    fn primary_key_constraint(&self, table: &str, columns: &[ColumnDef]) -> Option<String> {
        if Self::inline_identity_key(columns) {
            return None;
        }
        let keys: Vec<String> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| self.quote(&c.name))
            .collect();
        if keys.is_empty() {
            return None;
        }
        let name = columns
            .iter()
            .find_map(|c| c.primary_key_name.clone())
            .unwrap_or_else(|| format!("PK_{}", table));
        Some(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            self.quote(&name),
            keys.join(", ")
        ))
    }

    fn description_statements(
        &self,
        _schema: Option<&str>,
        table: &str,
        description: Option<&str>,
        columns: &[ColumnDef],
    ) -> Result<Vec<String>> {
        if description.is_some() || columns.iter().any(|c| c.description.is_some()) {
            debug!(table, "SQLite has no object comments; descriptions dropped");
        }
        Ok(Vec::new())
    }

    fn create_schema(&self, _e: &CreateSchema) -> Result<String> {
        self.unsupported("CREATE SCHEMA")
    }

    fn delete_schema(&self, _e: &DeleteSchema) -> Result<String> {
        self.unsupported("DROP SCHEMA")
    }

    fn create_column(&self, e: &CreateColumn) -> Result<String> {
        if e.column.primary_key {
            return self.unsupported("ADD COLUMN with PRIMARY KEY");
        }
        Ok(terminate(vec![format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.table_name(e.schema.as_deref(), &e.table),
            self.column_definition(&e.table, &e.column)?
        )]))
    }

    fn alter_column(&self, _e: &AlterColumn) -> Result<String> {
        self.unsupported("ALTER COLUMN")
    }

    fn rename_table(&self, e: &RenameTable) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} RENAME TO {}",
            self.table_name(e.schema.as_deref(), &e.old_name),
            self.quote(&e.new_name)
        )]))
    }

    /// The index name carries the schema; the table may not.
    fn create_index(&self, e: &IndexDef) -> Result<String> {
        let unique = if e.unique { "UNIQUE " } else { "" };
        Ok(terminate(vec![format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            self.table_name(e.schema.as_deref(), &e.name),
            self.quote(&e.table),
            self.index_columns(e)
        )]))
    }

    fn create_constraint(&self, _e: &ConstraintDef) -> Result<String> {
        self.unsupported("ADD CONSTRAINT")
    }

    fn delete_constraint(&self, _e: &DeleteConstraint) -> Result<String> {
        self.unsupported("DROP CONSTRAINT")
    }

    fn create_foreign_key(&self, _e: &ForeignKeyDef) -> Result<String> {
        self.unsupported("ADD FOREIGN KEY")
    }

    fn delete_foreign_key(&self, _e: &DeleteForeignKey) -> Result<String> {
        self.unsupported("DROP FOREIGN KEY")
    }

    fn alter_default_value(&self, _e: &AlterDefaultValue) -> Result<String> {
        self.unsupported("ALTER DEFAULT")
    }

    fn delete_default_constraint(&self, _e: &DeleteDefaultConstraint) -> Result<String> {
        self.unsupported("DROP DEFAULT")
    }

    fn create_sequence(&self, _e: &SequenceDef) -> Result<String> {
        self.unsupported("CREATE SEQUENCE")
    }

    fn delete_sequence(&self, _e: &DeleteSequence) -> Result<String> {
        self.unsupported("DROP SEQUENCE")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn generator() -> SqliteGenerator {
        SqliteGenerator::new(&Options::default())
    }

    #[test]
    fn test_identity_key_is_inline() {
        let expr = CreateTable::new("T")
            .column(ColumnDef::new("id", ColumnType::int32()).primary_key().identity())
            .column(ColumnDef::new("name", ColumnType::string(Some(100))));
        let sql = generator().generate(&expr.into()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"T\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \"name\" TEXT);"
        );
    }

    #[test]
    fn test_composite_key_is_table_level() {
        let expr = CreateTable::new("T")
            .column(ColumnDef::new("a", ColumnType::int32()).primary_key())
            .column(ColumnDef::new("b", ColumnType::int32()).primary_key());
        let sql = generator().generate(&expr.into()).unwrap();
        assert!(sql.contains("CONSTRAINT \"PK_T\" PRIMARY KEY (\"a\", \"b\")"));
    }

    #[test]
    fn test_alter_column_is_a_capability_gap() {
        let expr = AlterColumn {
            schema: None,
            table: "T".to_string(),
            column: ColumnDef::new("c", ColumnType::int32()),
        };
        let err = generator().generate(&expr.into()).unwrap_err();
        assert_eq!(err.to_string(), "ALTER COLUMN is not supported by SQLite");
    }

    #[test]
    fn test_upsert_uses_on_conflict() {
        let upsert = UpsertData::new("People", &["Email"])
            .unwrap()
            .row(DataRow::new().set("Email", "a@x.com").set("Active", true))
            .unwrap();
        let sql = generator().generate(&upsert.into()).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"People\" (\"Email\", \"Active\") VALUES ('a@x.com', 1) \
             ON CONFLICT (\"Email\") DO UPDATE SET \"Active\" = excluded.\"Active\";"
        );
    }

    #[test]
    fn test_new_guid_default_is_rejected() {
        let expr = CreateTable::new("T")
            .column(ColumnDef::new("id", ColumnType::guid()).default(SystemMethod::NewGuid));
        assert!(generator().generate(&expr.into()).is_err());
    }

    #[test]
    fn test_new_guid_default_is_rejected_in_loose_mode() {
        let options = Options {
            compatibility: crate::transpiler::CompatibilityMode::Loose,
            ..Options::default()
        };
        let expr = CreateTable::new("T")
            .column(ColumnDef::new("id", ColumnType::guid()).default(SystemMethod::NewGuid));
        let err = SqliteGenerator::new(&options).generate(&expr.into()).unwrap_err();
        assert_eq!(err.to_string(), "NewGuid is not supported by SQLite");
    }
}
