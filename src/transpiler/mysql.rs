//! MySQL / MariaDB generator.

use crate::ast::*;
use crate::config::Options;
use crate::error::Result;
use crate::transpiler::traits::terminate;
use crate::transpiler::{Dialect, GeneratorBase, SqlGenerator, TypeMap};

pub struct MySqlGenerator {
    base: GeneratorBase,
}

impl MySqlGenerator {
    pub fn new(options: &Options) -> Self {
        Self {
            base: GeneratorBase {
                dialect: Dialect::MySql,
                quoter: Dialect::MySql.quoter(options.force_quote),
                types: type_map(),
                compatibility: options.compatibility,
            },
        }
    }
}

fn type_map() -> TypeMap {
    TypeMap::new(Dialect::MySql)
        .set(DbType::AnsiString, "VARCHAR(255)")
        .set_sized(DbType::AnsiString, "VARCHAR($size)", 16_383)
        .set_sized(DbType::AnsiString, "TEXT", 65_535)
        .set_sized(DbType::AnsiString, "MEDIUMTEXT", 16_777_215)
        .set_sized(DbType::AnsiString, "LONGTEXT", i32::MAX as u32)
        .set(DbType::AnsiStringFixedLength, "CHAR(255)")
        .set_sized(DbType::AnsiStringFixedLength, "CHAR($size)", 255)
        .set(DbType::Binary, "LONGBLOB")
        .set_sized(DbType::Binary, "VARBINARY($size)", 8_000)
        .set_sized(DbType::Binary, "MEDIUMBLOB", 16_777_215)
        .set_sized(DbType::Binary, "LONGBLOB", i32::MAX as u32)
        .set(DbType::Boolean, "TINYINT(1)")
        .set(DbType::Byte, "TINYINT UNSIGNED")
        .set(DbType::Currency, "DECIMAL(19,4)")
        .set(DbType::Date, "DATE")
        .set(DbType::DateTime, "DATETIME")
        .set(DbType::DateTime2, "DATETIME(6)")
        .set(DbType::DateTimeOffset, "TIMESTAMP")
        .set(DbType::Decimal, "DECIMAL(19,5)")
        .set_sized(DbType::Decimal, "DECIMAL($size,$scale)", 65)
        .set(DbType::Double, "DOUBLE")
        .set(DbType::Guid, "CHAR(36)")
        .set(DbType::Int16, "SMALLINT")
        .set(DbType::Int32, "INTEGER")
        .set(DbType::Int64, "BIGINT")
        .set(DbType::Single, "FLOAT")
        .set(DbType::String, "VARCHAR(255)")
        .set_sized(DbType::String, "VARCHAR($size)", 16_383)
        .set_sized(DbType::String, "TEXT", 65_535)
        .set_sized(DbType::String, "MEDIUMTEXT", 16_777_215)
        .set_sized(DbType::String, "LONGTEXT", i32::MAX as u32)
        .set(DbType::StringFixedLength, "CHAR(255)")
        .set_sized(DbType::StringFixedLength, "CHAR($size)", 255)
        .set(DbType::Time, "TIME")
        .set(DbType::Xml, "TEXT")
}

impl SqlGenerator for MySqlGenerator {
    fn base(&self) -> &GeneratorBase {
        &self.base
    }

    fn system_method(&self, method: SystemMethod) -> Result<String> {
        Ok(match method {
            SystemMethod::CurrentDateTime => "CURRENT_TIMESTAMP",
            SystemMethod::CurrentUtcDateTime => "UTC_TIMESTAMP()",
            SystemMethod::NewGuid => "(UUID())",
            SystemMethod::CurrentUser => "CURRENT_USER()",
        }
        .to_string())
    }

    fn identity_clause(&self, _column: &ColumnDef) -> Result<String> {
        Ok("AUTO_INCREMENT".to_string())
    }

    fn datetime_literal(&self, value: &chrono::NaiveDateTime) -> String {
        format!("'{}'", value.format("%Y-%m-%d %H:%M:%S"))
    }

    fn column_definition(&self, _table: &str, column: &ColumnDef) -> Result<String> {
        let mut parts = vec![self.quote(&column.name)];
        match &column.computed {
            Some(expression) => {
                parts.push(format!("{} AS ({})", self.column_type(column)?, expression));
            }
            None => parts.push(self.column_type(column)?),
        }
        if let Some(nullability) = self.nullability(column) {
            parts.push(nullability.to_string());
        }
        if column.identity {
            parts.push(self.identity_clause(column)?);
        }
        if let Some(default) = &column.default {
            parts.push(format!("DEFAULT {}", self.format_value(default)?));
        }
        if column.unique && !column.primary_key {
            parts.push("UNIQUE".to_string());
        }
        if let Some(text) = &column.description {
            parts.push(format!("COMMENT {}", self.string_literal(text)));
        }
        Ok(parts.join(" "))
    }

    fn table_options(&self, description: Option<&str>) -> Result<String> {
        Ok(match description {
            Some(text) => format!(" ENGINE = INNODB COMMENT {}", self.string_literal(text)),
            None => " ENGINE = INNODB".to_string(),
        })
    }

    /// Descriptions are inline `COMMENT` clauses on MySQL.
    fn description_statements(
        &self,
        _schema: Option<&str>,
        _table: &str,
        _description: Option<&str>,
        _columns: &[ColumnDef],
    ) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn create_schema(&self, _e: &CreateSchema) -> Result<String> {
        self.unsupported("CREATE SCHEMA")
    }

    fn delete_schema(&self, _e: &DeleteSchema) -> Result<String> {
        self.unsupported("DROP SCHEMA")
    }

    fn alter_table(&self, e: &AlterTable) -> Result<String> {
        match &e.description {
            Some(text) => Ok(terminate(vec![format!(
                "ALTER TABLE {} COMMENT {}",
                self.table_name(e.schema.as_deref(), &e.table),
                self.string_literal(text)
            )])),
            None => Ok(String::new()),
        }
    }

    fn rename_table(&self, e: &RenameTable) -> Result<String> {
        Ok(terminate(vec![format!(
            "RENAME TABLE {} TO {}",
            self.table_name(e.schema.as_deref(), &e.old_name),
            self.table_name(e.schema.as_deref(), &e.new_name)
        )]))
    }

    fn alter_column(&self, e: &AlterColumn) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.table_name(e.schema.as_deref(), &e.table),
            self.column_definition(&e.table, &e.column)?
        )]))
    }

    fn delete_index(&self, e: &DeleteIndex) -> Result<String> {
        Ok(terminate(vec![format!(
            "DROP INDEX {} ON {}",
            self.quote(&e.name),
            self.table_name(e.schema.as_deref(), &e.table)
        )]))
    }

    fn delete_constraint(&self, e: &DeleteConstraint) -> Result<String> {
        let table = self.table_name(e.schema.as_deref(), &e.table);
        Ok(terminate(vec![match e.kind {
            ConstraintKind::PrimaryKey => format!("ALTER TABLE {} DROP PRIMARY KEY", table),
            ConstraintKind::Unique => {
                format!("ALTER TABLE {} DROP INDEX {}", table, self.quote(&e.name))
            }
        }]))
    }

    fn delete_foreign_key(&self, e: &DeleteForeignKey) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.table_name(e.schema.as_deref(), &e.table),
            self.quote(&e.name)
        )]))
    }

    fn alter_default_value(&self, e: &AlterDefaultValue) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} ALTER {} SET DEFAULT {}",
            self.table_name(e.schema.as_deref(), &e.table),
            self.quote(&e.column),
            self.format_value(&e.default)?
        )]))
    }

    fn delete_default_constraint(&self, e: &DeleteDefaultConstraint) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} ALTER {} DROP DEFAULT",
            self.table_name(e.schema.as_deref(), &e.table),
            self.quote(&e.column)
        )]))
    }

    fn create_sequence(&self, _e: &SequenceDef) -> Result<String> {
        self.unsupported("CREATE SEQUENCE")
    }

    fn delete_sequence(&self, _e: &DeleteSequence) -> Result<String> {
        self.unsupported("DROP SEQUENCE")
    }

    /// No MERGE: an `UPDATE` of the matched row followed by an `INSERT`
    /// guarded by `NOT EXISTS`. Ignore mode emits only the guarded insert.
    fn upsert_data(&self, e: &UpsertData) -> Result<String> {
        let table = self.table_name(e.schema.as_deref(), &e.table);
        let mut statements = Vec::new();

        for row in &e.rows {
            let match_row: DataRow = e
                .match_columns
                .iter()
                .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                .collect();
            let matched = self.where_clause(&match_row)?;

            let update = match e.update_assignments(row) {
                UpdateAssignments::FromSource(columns) => {
                    columns.iter().filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone()))).collect()
                }
                UpdateAssignments::Literal(values) => values,
                UpdateAssignments::None => DataRow::new(),
            };
            if !update.is_empty() {
                statements.push(format!(
                    "UPDATE {} SET {} WHERE {}",
                    table,
                    self.set_clause(&update)?,
                    matched
                ));
            }

            let columns: Vec<String> = row.columns().map(|c| self.quote(c)).collect();
            let projection = row
                .iter()
                .map(|(c, v)| Ok(format!("{} AS {}", self.format_value(v)?, self.quote(c))))
                .collect::<Result<Vec<_>>>()?;
            statements.push(format!(
                "INSERT INTO {} ({}) SELECT {} FROM DUAL WHERE NOT EXISTS (SELECT 1 FROM {} WHERE {})",
                table,
                columns.join(", "),
                projection.join(", "),
                table,
                matched
            ));
        }
        Ok(terminate(statements))
    }
}
