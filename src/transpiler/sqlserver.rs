//! SQL Server generator.

use crate::ast::*;
use crate::config::Options;
use crate::error::Result;
use crate::transpiler::traits::{merge_upsert, terminate};
use crate::transpiler::{Dialect, GeneratorBase, SqlGenerator, TypeMap};

pub struct SqlServerGenerator {
    base: GeneratorBase,
}

impl SqlServerGenerator {
    pub fn new(options: &Options) -> Self {
        Self {
            base: GeneratorBase {
                dialect: Dialect::SqlServer,
                quoter: Dialect::SqlServer.quoter(options.force_quote),
                types: type_map(),
                compatibility: options.compatibility,
            },
        }
    }

    /// Defaults are named constraints on SQL Server.
    fn default_constraint_name(table: &str, column: &str) -> String {
        format!("DF_{}_{}", table, column)
    }

    /// T-SQL that looks up and drops whatever default constraint sits on a
    /// column, whatever it was named. `tag` keeps variable names distinct when
    /// several of these share one batch.
    fn drop_default_batch(&self, schema: Option<&str>, table: &str, column: &str, tag: usize) -> String {
        let qualified = self.table_name(schema, table);
        let object = self.string_literal(&qualified);
        format!(
            "DECLARE @default{tag} sysname, @sql{tag} nvarchar(max);\n\
             SELECT @default{tag} = name FROM sys.default_constraints \
             WHERE parent_object_id = OBJECT_ID({object}) \
             AND parent_column_id = COLUMNPROPERTY(OBJECT_ID({object}), {column}, 'ColumnId');\n\
             IF @default{tag} IS NOT NULL\n\
             BEGIN\n\
             SET @sql{tag} = N'ALTER TABLE {escaped} DROP CONSTRAINT ' + QUOTENAME(@default{tag});\n\
             EXEC sp_executesql @sql{tag};\n\
             END",
            object = object,
            column = self.string_literal(column),
            escaped = qualified.replace('\'', "''"),
            tag = tag,
        )
    }

    fn extended_property(
        &self,
        schema: Option<&str>,
        table: &str,
        column: Option<&str>,
        text: &str,
    ) -> String {
        let mut sql = format!(
            "EXEC sys.sp_addextendedproperty @name = N'MS_Description', @value = {}, \
             @level0type = N'SCHEMA', @level0name = {}, @level1type = N'TABLE', @level1name = {}",
            self.string_literal(text),
            self.string_literal(schema.unwrap_or("dbo")),
            self.string_literal(table)
        );
        if let Some(column) = column {
            sql.push_str(&format!(
                ", @level2type = N'COLUMN', @level2name = {}",
                self.string_literal(column)
            ));
        }
        sql
    }
}

fn type_map() -> TypeMap {
    TypeMap::new(Dialect::SqlServer)
        .set(DbType::AnsiString, "VARCHAR(255)")
        .set_sized(DbType::AnsiString, "VARCHAR($size)", 8_000)
        .set_sized(DbType::AnsiString, "VARCHAR(MAX)", i32::MAX as u32)
        .set(DbType::AnsiStringFixedLength, "CHAR(255)")
        .set_sized(DbType::AnsiStringFixedLength, "CHAR($size)", 8_000)
        .set(DbType::Binary, "VARBINARY(8000)")
        .set_sized(DbType::Binary, "VARBINARY($size)", 8_000)
        .set_sized(DbType::Binary, "VARBINARY(MAX)", i32::MAX as u32)
        .set(DbType::Boolean, "BIT")
        .set(DbType::Byte, "TINYINT")
        .set(DbType::Currency, "MONEY")
        .set(DbType::Date, "DATE")
        .set(DbType::DateTime, "DATETIME")
        .set(DbType::DateTime2, "DATETIME2")
        .set(DbType::DateTimeOffset, "DATETIMEOFFSET")
        .set(DbType::Decimal, "DECIMAL(19,5)")
        .set_sized(DbType::Decimal, "DECIMAL($size,$scale)", 38)
        .set(DbType::Double, "FLOAT")
        .set(DbType::Guid, "UNIQUEIDENTIFIER")
        .set(DbType::Int16, "SMALLINT")
        .set(DbType::Int32, "INT")
        .set(DbType::Int64, "BIGINT")
        .set(DbType::Single, "REAL")
        .set(DbType::String, "NVARCHAR(255)")
        .set_sized(DbType::String, "NVARCHAR($size)", 4_000)
        .set_sized(DbType::String, "NVARCHAR(MAX)", 1_073_741_823)
        .set(DbType::StringFixedLength, "NCHAR(255)")
        .set_sized(DbType::StringFixedLength, "NCHAR($size)", 4_000)
        .set(DbType::Time, "TIME")
        .set(DbType::Xml, "XML")
}

impl SqlGenerator for SqlServerGenerator {
    fn base(&self) -> &GeneratorBase {
        &self.base
    }

    fn system_method(&self, method: SystemMethod) -> Result<String> {
        Ok(match method {
            SystemMethod::CurrentDateTime => "GETDATE()",
            SystemMethod::CurrentUtcDateTime => "GETUTCDATE()",
            SystemMethod::NewGuid => "NEWID()",
            SystemMethod::CurrentUser => "CURRENT_USER",
        }
        .to_string())
    }

    fn identity_clause(&self, _column: &ColumnDef) -> Result<String> {
        Ok("IDENTITY(1,1)".to_string())
    }

    fn bool_literal(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    fn string_literal(&self, value: &str) -> String {
        format!("N{}", self.quoter().quote_string(value))
    }

    fn computed_clause(&self, _column: &ColumnDef, expression: &str) -> Result<String> {
        Ok(format!("AS ({})", expression))
    }

    fn default_clause(&self, table: &str, column: &ColumnDef, value: &Value) -> Result<String> {
        Ok(format!(
            "CONSTRAINT {} DEFAULT {}",
            self.quote(&Self::default_constraint_name(table, &column.name)),
            self.format_value(value)?
        ))
    }

    fn description_statements(
        &self,
        schema: Option<&str>,
        table: &str,
        description: Option<&str>,
        columns: &[ColumnDef],
    ) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        if let Some(text) = description {
            statements.push(self.extended_property(schema, table, None, text));
        }
        for column in columns {
            if let Some(text) = &column.description {
                statements.push(self.extended_property(schema, table, Some(&column.name), text));
            }
        }
        Ok(statements)
    }

    fn add_column_keyword(&self) -> &'static str {
        "ADD"
    }

    fn rename_table(&self, e: &RenameTable) -> Result<String> {
        Ok(terminate(vec![format!(
            "EXEC sp_rename {}, {}",
            self.string_literal(&self.table_name(e.schema.as_deref(), &e.old_name)),
            self.string_literal(&e.new_name)
        )]))
    }

    fn rename_column(&self, e: &RenameColumn) -> Result<String> {
        let column = format!(
            "{}.{}",
            self.table_name(e.schema.as_deref(), &e.table),
            self.quote(&e.old_name)
        );
        Ok(terminate(vec![format!(
            "EXEC sp_rename {}, {}, 'COLUMN'",
            self.string_literal(&column),
            self.string_literal(&e.new_name)
        )]))
    }

    /// Type and nullability via ALTER COLUMN; a default is replaced by
    /// dropping the old constraint and adding a new one.
    fn alter_column(&self, e: &AlterColumn) -> Result<String> {
        let table = self.table_name(e.schema.as_deref(), &e.table);
        let mut definition = format!("{} {}", self.quote(&e.column.name), self.column_type(&e.column)?);
        if let Some(nullability) = self.nullability(&e.column) {
            definition.push(' ');
            definition.push_str(nullability);
        }
        let mut statements = vec![format!("ALTER TABLE {} ALTER COLUMN {}", table, definition)];
        if let Some(default) = &e.column.default {
            statements.push(self.drop_default_batch(e.schema.as_deref(), &e.table, &e.column.name, 0));
            statements.push(format!(
                "ALTER TABLE {} ADD {} FOR {}",
                table,
                self.default_clause(&e.table, &e.column, default)?,
                self.quote(&e.column.name)
            ));
        }
        Ok(terminate(statements))
    }

    /// Any default constraint has to go before the column can.
    fn delete_column(&self, e: &DeleteColumn) -> Result<String> {
        let table = self.table_name(e.schema.as_deref(), &e.table);
        let mut statements = Vec::new();
        for (i, column) in e.columns.iter().enumerate() {
            statements.push(self.drop_default_batch(e.schema.as_deref(), &e.table, column, i));
            statements.push(format!("ALTER TABLE {} DROP COLUMN {}", table, self.quote(column)));
        }
        Ok(terminate(statements))
    }

    fn delete_index(&self, e: &DeleteIndex) -> Result<String> {
        Ok(terminate(vec![format!(
            "DROP INDEX {} ON {}",
            self.quote(&e.name),
            self.table_name(e.schema.as_deref(), &e.table)
        )]))
    }

    fn foreign_key_rule(&self, clause: &str, rule: ForeignKeyRule) -> Result<String> {
        let action = match rule {
            ForeignKeyRule::None => return Ok(String::new()),
            ForeignKeyRule::Cascade => "CASCADE",
            ForeignKeyRule::SetNull => "SET NULL",
            ForeignKeyRule::SetDefault => "SET DEFAULT",
            ForeignKeyRule::Restrict => "NO ACTION",
        };
        Ok(format!(" {} {}", clause, action))
    }

    fn alter_default_value(&self, e: &AlterDefaultValue) -> Result<String> {
        let table = self.table_name(e.schema.as_deref(), &e.table);
        Ok(terminate(vec![
            self.drop_default_batch(e.schema.as_deref(), &e.table, &e.column, 0),
            format!(
                "ALTER TABLE {} ADD CONSTRAINT {} DEFAULT {} FOR {}",
                table,
                self.quote(&Self::default_constraint_name(&e.table, &e.column)),
                self.format_value(&e.default)?,
                self.quote(&e.column)
            ),
        ]))
    }

    fn delete_default_constraint(&self, e: &DeleteDefaultConstraint) -> Result<String> {
        Ok(terminate(vec![self.drop_default_batch(
            e.schema.as_deref(),
            &e.table,
            &e.column,
            0,
        )]))
    }

    fn upsert_data(&self, e: &UpsertData) -> Result<String> {
        merge_upsert(self, e, None, true)
    }
}
