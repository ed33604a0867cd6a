//! The generator contract and its ANSI defaults.
//!
//! Every dialect implements [`SqlGenerator`] and overrides only the pieces
//! where its syntax departs from the shared defaults below.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::ast::*;
use crate::error::{MigrateError, Result};
use crate::transpiler::{CompatibilityMode, Dialect, Quoter, TypeMap};

/// State every generator carries.
#[derive(Debug, Clone)]
pub struct GeneratorBase {
    pub dialect: Dialect,
    pub quoter: Quoter,
    pub types: TypeMap,
    pub compatibility: CompatibilityMode,
}

/// Join statements into one script, each terminated with `;`.
/// Empty statements (skipped operations) are dropped.
pub fn terminate(statements: Vec<String>) -> String {
    statements
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!("{};", s))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turns expressions into dialect SQL text.
///
/// `generate` is pure: it never touches a connection. Operations that can
/// produce more than one statement return them `;`-terminated, one per line.
pub trait SqlGenerator: Send + Sync {
    fn base(&self) -> &GeneratorBase;

    /// Database function for a [`SystemMethod`].
    fn system_method(&self, method: SystemMethod) -> Result<String>;

    /// Auto-increment clause placed after the column type.
    fn identity_clause(&self, column: &ColumnDef) -> Result<String>;

    fn dialect(&self) -> Dialect {
        self.base().dialect
    }

    fn quoter(&self) -> &Quoter {
        &self.base().quoter
    }

    fn quote(&self, name: &str) -> String {
        self.quoter().quote(name)
    }

    fn table_name(&self, schema: Option<&str>, table: &str) -> String {
        self.quoter().quote_qualified(schema, table)
    }

    /// Capability failure, honouring the configured compatibility mode.
    fn unsupported(&self, operation: &str) -> Result<String> {
        self.base().compatibility.handle(operation, self.dialect())
    }

    /// Generate SQL for one expression.
    fn generate(&self, expression: &Expression) -> Result<String> {
        match expression {
            Expression::CreateSchema(e) => self.create_schema(e),
            Expression::DeleteSchema(e) => self.delete_schema(e),
            Expression::CreateTable(e) => self.create_table(e),
            Expression::AlterTable(e) => self.alter_table(e),
            Expression::DeleteTable(e) => self.delete_table(e),
            Expression::RenameTable(e) => self.rename_table(e),
            Expression::CreateColumn(e) => self.create_column(e),
            Expression::AlterColumn(e) => self.alter_column(e),
            Expression::DeleteColumn(e) => self.delete_column(e),
            Expression::RenameColumn(e) => self.rename_column(e),
            Expression::CreateIndex(e) => self.create_index(e),
            Expression::DeleteIndex(e) => self.delete_index(e),
            Expression::CreateConstraint(e) => self.create_constraint(e),
            Expression::DeleteConstraint(e) => self.delete_constraint(e),
            Expression::CreateForeignKey(e) => self.create_foreign_key(e),
            Expression::DeleteForeignKey(e) => self.delete_foreign_key(e),
            Expression::AlterDefaultValue(e) => self.alter_default_value(e),
            Expression::DeleteDefaultConstraint(e) => self.delete_default_constraint(e),
            Expression::CreateSequence(e) => self.create_sequence(e),
            Expression::DeleteSequence(e) => self.delete_sequence(e),
            Expression::InsertData(e) => self.insert_data(e),
            Expression::UpdateData(e) => self.update_data(e),
            Expression::DeleteData(e) => self.delete_data(e),
            Expression::UpsertData(e) => self.upsert_data(e),
            Expression::ExecuteSql(e) => Ok(e.sql.clone()),
            Expression::Conditional(_) => Err(MigrateError::Validation(
                "Conditional expressions are evaluated against a live connection".to_string(),
            )),
        }
    }

    // ---------------------------------------------------------------- literals

    fn bool_literal(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }

    fn string_literal(&self, value: &str) -> String {
        self.quoter().quote_string(value)
    }

    fn datetime_literal(&self, value: &NaiveDateTime) -> String {
        format!("'{}'", value.format("%Y-%m-%dT%H:%M:%S"))
    }

    fn uuid_literal(&self, value: &Uuid) -> String {
        format!("'{}'", value)
    }

    fn format_value(&self, value: &Value) -> Result<String> {
        Ok(match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.bool_literal(*b),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Decimal(d) => d.clone(),
            Value::String(s) => self.string_literal(s),
            Value::DateTime(dt) => self.datetime_literal(dt),
            Value::Uuid(u) => self.uuid_literal(u),
            Value::Function(m) => self.system_method(*m)?,
            Value::Raw(sql) => sql.clone(),
        })
    }

    /// `a = 1 AND b IS NULL`
    fn where_clause(&self, row: &DataRow) -> Result<String> {
        let mut terms = Vec::with_capacity(row.len());
        for (column, value) in row.iter() {
            if value.is_null() {
                terms.push(format!("{} IS NULL", self.quote(column)));
            } else {
                terms.push(format!("{} = {}", self.quote(column), self.format_value(value)?));
            }
        }
        Ok(terms.join(" AND "))
    }

    // ----------------------------------------------------------------- columns

    fn column_type(&self, column: &ColumnDef) -> Result<String> {
        self.base().types.resolve(&column.column_type)
    }

    /// Everything after the column name for a computed column.
    fn computed_clause(&self, column: &ColumnDef, expression: &str) -> Result<String> {
        Ok(format!(
            "{} GENERATED ALWAYS AS ({}) STORED",
            self.column_type(column)?,
            expression
        ))
    }

    fn default_clause(&self, _table: &str, _column: &ColumnDef, value: &Value) -> Result<String> {
        Ok(format!("DEFAULT {}", self.format_value(value)?))
    }

    fn nullability(&self, column: &ColumnDef) -> Option<&'static str> {
        match column.nullable {
            Some(false) => Some("NOT NULL"),
            Some(true) => Some("NULL"),
            None => None,
        }
    }

    fn column_definition(&self, table: &str, column: &ColumnDef) -> Result<String> {
        let mut parts = vec![self.quote(&column.name)];
        match &column.computed {
            Some(expression) => parts.push(self.computed_clause(column, expression)?),
            None => {
                parts.push(self.column_type(column)?);
                if column.identity {
                    parts.push(self.identity_clause(column)?);
                }
            }
        }
        if let Some(default) = &column.default {
            parts.push(self.default_clause(table, column, default)?);
        }
        if let Some(nullability) = self.nullability(column) {
            parts.push(nullability.to_string());
        }
        if column.unique && !column.primary_key {
            parts.push("UNIQUE".to_string());
        }
        parts.retain(|p| !p.is_empty());
        Ok(parts.join(" "))
    }

    /// Table-level `CONSTRAINT ... PRIMARY KEY (...)` for a create-table.
    fn primary_key_constraint(&self, table: &str, columns: &[ColumnDef]) -> Option<String> {
        let keys: Vec<&ColumnDef> = columns.iter().filter(|c| c.primary_key).collect();
        if keys.is_empty() {
            return None;
        }
        let name = keys
            .iter()
            .find_map(|c| c.primary_key_name.clone())
            .unwrap_or_else(|| format!("PK_{}", table));
        let names: Vec<String> = keys.iter().map(|c| self.quote(&c.name)).collect();
        Some(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            self.quote(&name),
            names.join(", ")
        ))
    }

    /// Trailing text after the column list of CREATE TABLE.
    fn table_options(&self, _description: Option<&str>) -> Result<String> {
        Ok(String::new())
    }

    /// Statements attaching table and column descriptions.
    fn description_statements(
        &self,
        schema: Option<&str>,
        table: &str,
        description: Option<&str>,
        columns: &[ColumnDef],
    ) -> Result<Vec<String>> {
        let qualified = self.table_name(schema, table);
        let mut statements = Vec::new();
        if let Some(text) = description {
            statements.push(format!(
                "COMMENT ON TABLE {} IS {}",
                qualified,
                self.string_literal(text)
            ));
        }
        for column in columns {
            if let Some(text) = &column.description {
                statements.push(format!(
                    "COMMENT ON COLUMN {}.{} IS {}",
                    qualified,
                    self.quote(&column.name),
                    self.string_literal(text)
                ));
            }
        }
        Ok(statements)
    }

    // ------------------------------------------------------------------ schema

    fn create_schema(&self, e: &CreateSchema) -> Result<String> {
        Ok(terminate(vec![format!("CREATE SCHEMA {}", self.quote(&e.schema))]))
    }

    fn delete_schema(&self, e: &DeleteSchema) -> Result<String> {
        Ok(terminate(vec![format!("DROP SCHEMA {}", self.quote(&e.schema))]))
    }

    // ------------------------------------------------------------------ tables

    fn create_table(&self, e: &CreateTable) -> Result<String> {
        let mut definitions = e
            .columns
            .iter()
            .map(|c| self.column_definition(&e.table, c))
            .collect::<Result<Vec<_>>>()?;
        if let Some(pk) = self.primary_key_constraint(&e.table, &e.columns) {
            definitions.push(pk);
        }
        let mut statements = vec![format!(
            "CREATE TABLE {} ({}){}",
            self.table_name(e.schema.as_deref(), &e.table),
            definitions.join(", "),
            self.table_options(e.description.as_deref())?
        )];
        statements.extend(self.description_statements(
            e.schema.as_deref(),
            &e.table,
            e.description.as_deref(),
            &e.columns,
        )?);
        Ok(terminate(statements))
    }

    fn alter_table(&self, e: &AlterTable) -> Result<String> {
        Ok(terminate(self.description_statements(
            e.schema.as_deref(),
            &e.table,
            e.description.as_deref(),
            &[],
        )?))
    }

    fn delete_table(&self, e: &DeleteTable) -> Result<String> {
        let if_exists = if e.if_exists { "IF EXISTS " } else { "" };
        Ok(terminate(vec![format!(
            "DROP TABLE {}{}",
            if_exists,
            self.table_name(e.schema.as_deref(), &e.table)
        )]))
    }

    fn rename_table(&self, e: &RenameTable) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} RENAME TO {}",
            self.table_name(e.schema.as_deref(), &e.old_name),
            self.quote(&e.new_name)
        )]))
    }

    // ----------------------------------------------------------------- columns

    fn add_column_keyword(&self) -> &'static str {
        "ADD COLUMN"
    }

    fn create_column(&self, e: &CreateColumn) -> Result<String> {
        let table = self.table_name(e.schema.as_deref(), &e.table);
        let mut statements = vec![format!(
            "ALTER TABLE {} {} {}",
            table,
            self.add_column_keyword(),
            self.column_definition(&e.table, &e.column)?
        )];
        if let Some(pk) = self.primary_key_constraint(&e.table, std::slice::from_ref(&e.column)) {
            statements.push(format!("ALTER TABLE {} ADD {}", table, pk));
        }
        statements.extend(self.description_statements(
            e.schema.as_deref(),
            &e.table,
            None,
            std::slice::from_ref(&e.column),
        )?);
        Ok(terminate(statements))
    }

    /// PostgreSQL-style: one ALTER TABLE carrying type, nullability and default actions.
    fn alter_column(&self, e: &AlterColumn) -> Result<String> {
        let column = self.quote(&e.column.name);
        let mut actions = vec![format!(
            "ALTER COLUMN {} TYPE {}",
            column,
            self.column_type(&e.column)?
        )];
        match e.column.nullable {
            Some(false) => actions.push(format!("ALTER COLUMN {} SET NOT NULL", column)),
            Some(true) => actions.push(format!("ALTER COLUMN {} DROP NOT NULL", column)),
            None => {}
        }
        match &e.column.default {
            Some(value) => actions.push(format!(
                "ALTER COLUMN {} SET DEFAULT {}",
                column,
                self.format_value(value)?
            )),
            None => actions.push(format!("ALTER COLUMN {} DROP DEFAULT", column)),
        }
        Ok(terminate(vec![format!(
            "ALTER TABLE {} {}",
            self.table_name(e.schema.as_deref(), &e.table),
            actions.join(", ")
        )]))
    }

    fn delete_column(&self, e: &DeleteColumn) -> Result<String> {
        let table = self.table_name(e.schema.as_deref(), &e.table);
        Ok(terminate(
            e.columns
                .iter()
                .map(|c| format!("ALTER TABLE {} DROP COLUMN {}", table, self.quote(c)))
                .collect(),
        ))
    }

    fn rename_column(&self, e: &RenameColumn) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.table_name(e.schema.as_deref(), &e.table),
            self.quote(&e.old_name),
            self.quote(&e.new_name)
        )]))
    }

    // ----------------------------------------------------------------- indexes

    fn index_columns(&self, index: &IndexDef) -> String {
        index
            .columns
            .iter()
            .map(|c| {
                let direction = match c.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                format!("{} {}", self.quote(&c.name), direction)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn create_index(&self, e: &IndexDef) -> Result<String> {
        let unique = if e.unique { "UNIQUE " } else { "" };
        Ok(terminate(vec![format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            self.quote(&e.name),
            self.table_name(e.schema.as_deref(), &e.table),
            self.index_columns(e)
        )]))
    }

    fn delete_index(&self, e: &DeleteIndex) -> Result<String> {
        Ok(terminate(vec![format!(
            "DROP INDEX {}",
            self.table_name(e.schema.as_deref(), &e.name)
        )]))
    }

    // ------------------------------------------------------------- constraints

    fn create_constraint(&self, e: &ConstraintDef) -> Result<String> {
        let kind = match e.kind {
            ConstraintKind::PrimaryKey => "PRIMARY KEY",
            ConstraintKind::Unique => "UNIQUE",
        };
        let columns: Vec<String> = e.columns.iter().map(|c| self.quote(c)).collect();
        Ok(terminate(vec![format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {} ({})",
            self.table_name(e.schema.as_deref(), &e.table),
            self.quote(&e.name),
            kind,
            columns.join(", ")
        )]))
    }

    fn delete_constraint(&self, e: &DeleteConstraint) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.table_name(e.schema.as_deref(), &e.table),
            self.quote(&e.name)
        )]))
    }

    /// ` ON DELETE CASCADE` and friends; empty for [`ForeignKeyRule::None`].
    fn foreign_key_rule(&self, clause: &str, rule: ForeignKeyRule) -> Result<String> {
        let action = match rule {
            ForeignKeyRule::None => return Ok(String::new()),
            ForeignKeyRule::Cascade => "CASCADE",
            ForeignKeyRule::SetNull => "SET NULL",
            ForeignKeyRule::SetDefault => "SET DEFAULT",
            ForeignKeyRule::Restrict => "RESTRICT",
        };
        Ok(format!(" {} {}", clause, action))
    }

    fn create_foreign_key(&self, e: &ForeignKeyDef) -> Result<String> {
        let foreign: Vec<String> = e.foreign_columns.iter().map(|c| self.quote(c)).collect();
        let primary: Vec<String> = e.primary_columns.iter().map(|c| self.quote(c)).collect();
        Ok(terminate(vec![format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}){}{}",
            self.table_name(e.foreign_schema.as_deref(), &e.foreign_table),
            self.quote(&e.name),
            foreign.join(", "),
            self.table_name(e.primary_schema.as_deref(), &e.primary_table),
            primary.join(", "),
            self.foreign_key_rule("ON DELETE", e.on_delete)?,
            self.foreign_key_rule("ON UPDATE", e.on_update)?
        )]))
    }

    fn delete_foreign_key(&self, e: &DeleteForeignKey) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.table_name(e.schema.as_deref(), &e.table),
            self.quote(&e.name)
        )]))
    }

    // ---------------------------------------------------------------- defaults

    fn alter_default_value(&self, e: &AlterDefaultValue) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
            self.table_name(e.schema.as_deref(), &e.table),
            self.quote(&e.column),
            self.format_value(&e.default)?
        )]))
    }

    fn delete_default_constraint(&self, e: &DeleteDefaultConstraint) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
            self.table_name(e.schema.as_deref(), &e.table),
            self.quote(&e.column)
        )]))
    }

    // --------------------------------------------------------------- sequences

    fn create_sequence(&self, e: &SequenceDef) -> Result<String> {
        let mut sql = format!(
            "CREATE SEQUENCE {}",
            self.table_name(e.schema.as_deref(), &e.name)
        );
        if let Some(increment) = e.increment {
            sql.push_str(&format!(" INCREMENT BY {}", increment));
        }
        if let Some(min) = e.min_value {
            sql.push_str(&format!(" MINVALUE {}", min));
        }
        if let Some(max) = e.max_value {
            sql.push_str(&format!(" MAXVALUE {}", max));
        }
        if let Some(start) = e.start_with {
            sql.push_str(&format!(" START WITH {}", start));
        }
        if let Some(cache) = e.cache {
            sql.push_str(&format!(" CACHE {}", cache));
        }
        if e.cycle {
            sql.push_str(" CYCLE");
        }
        Ok(terminate(vec![sql]))
    }

    fn delete_sequence(&self, e: &DeleteSequence) -> Result<String> {
        Ok(terminate(vec![format!(
            "DROP SEQUENCE {}",
            self.table_name(e.schema.as_deref(), &e.name)
        )]))
    }

    // -------------------------------------------------------------------- data

    fn insert_statement(&self, table: &str, row: &DataRow) -> Result<String> {
        let columns: Vec<String> = row.columns().map(|c| self.quote(c)).collect();
        let values = row
            .iter()
            .map(|(_, v)| self.format_value(v))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            values.join(", ")
        ))
    }

    fn insert_data(&self, e: &InsertData) -> Result<String> {
        let table = self.table_name(e.schema.as_deref(), &e.table);
        let statements = e
            .rows
            .iter()
            .map(|row| self.insert_statement(&table, row))
            .collect::<Result<Vec<_>>>()?;
        Ok(terminate(statements))
    }

    fn set_clause(&self, row: &DataRow) -> Result<String> {
        let assignments = row
            .iter()
            .map(|(c, v)| Ok(format!("{} = {}", self.quote(c), self.format_value(v)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(assignments.join(", "))
    }

    fn update_data(&self, e: &UpdateData) -> Result<String> {
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.table_name(e.schema.as_deref(), &e.table),
            self.set_clause(&e.set)?
        );
        if let RowFilter::Where(row) = &e.filter {
            sql.push_str(&format!(" WHERE {}", self.where_clause(row)?));
        }
        Ok(terminate(vec![sql]))
    }

    fn delete_data(&self, e: &DeleteData) -> Result<String> {
        let table = self.table_name(e.schema.as_deref(), &e.table);
        let statements = e
            .filters
            .iter()
            .map(|filter| match filter {
                RowFilter::AllRows => Ok(format!("DELETE FROM {}", table)),
                RowFilter::Where(row) => {
                    Ok(format!("DELETE FROM {} WHERE {}", table, self.where_clause(row)?))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(terminate(statements))
    }

    /// `INSERT ... ON CONFLICT (match) DO UPDATE SET ... | DO NOTHING`, one per row.
    fn upsert_data(&self, e: &UpsertData) -> Result<String> {
        let table = self.table_name(e.schema.as_deref(), &e.table);
        let conflict: Vec<String> = e.match_columns.iter().map(|c| self.quote(c)).collect();
        let mut statements = Vec::with_capacity(e.rows.len());
        for row in &e.rows {
            let insert = self.insert_statement(&table, row)?;
            let action = match e.update_assignments(row) {
                assignments if assignments.is_empty() => "DO NOTHING".to_string(),
                UpdateAssignments::FromSource(columns) => {
                    let sets: Vec<String> = columns
                        .iter()
                        .map(|c| format!("{} = excluded.{}", self.quote(c), self.quote(c)))
                        .collect();
                    format!("DO UPDATE SET {}", sets.join(", "))
                }
                UpdateAssignments::Literal(values) => {
                    format!("DO UPDATE SET {}", self.set_clause(&values)?)
                }
                UpdateAssignments::None => "DO NOTHING".to_string(),
            };
            statements.push(format!(
                "{} ON CONFLICT ({}) {}",
                insert,
                conflict.join(", "),
                action
            ));
        }
        Ok(terminate(statements))
    }
}

/// MERGE-based upsert shared by SQL Server and Oracle.
///
/// `dual` is the FROM clause needed to select literals (`Some("DUAL")` on
/// Oracle), `alias_as` whether table aliases take the AS keyword.
pub fn merge_upsert(
    generator: &dyn SqlGenerator,
    e: &UpsertData,
    dual: Option<&str>,
    alias_as: bool,
) -> Result<String> {
    let table = generator.table_name(e.schema.as_deref(), &e.table);
    let alias = |name: &str| if alias_as { format!("AS {}", name) } else { name.to_string() };
    let mut statements = Vec::with_capacity(e.rows.len());

    for row in &e.rows {
        let projection = row
            .iter()
            .map(|(c, v)| Ok(format!("{} AS {}", generator.format_value(v)?, generator.quote(c))))
            .collect::<Result<Vec<_>>>()?;
        let from = dual.map(|d| format!(" FROM {}", d)).unwrap_or_default();
        let on: Vec<String> = e
            .match_columns
            .iter()
            .map(|c| {
                let c = generator.quote(c);
                format!("target.{} = source.{}", c, c)
            })
            .collect();

        let mut sql = format!(
            "MERGE INTO {} {} USING (SELECT {}{}) {} ON ({})",
            table,
            alias("target"),
            projection.join(", "),
            from,
            alias("source"),
            on.join(" AND ")
        );

        let sets = match e.update_assignments(row) {
            UpdateAssignments::FromSource(columns) => columns
                .iter()
                .map(|c| {
                    let c = generator.quote(c);
                    format!("target.{} = source.{}", c, c)
                })
                .collect::<Vec<_>>(),
            UpdateAssignments::Literal(values) => values
                .iter()
                .map(|(c, v)| Ok(format!("target.{} = {}", generator.quote(c), generator.format_value(v)?)))
                .collect::<Result<Vec<_>>>()?,
            UpdateAssignments::None => Vec::new(),
        };
        if !sets.is_empty() {
            sql.push_str(&format!(" WHEN MATCHED THEN UPDATE SET {}", sets.join(", ")));
        }

        let columns: Vec<String> = row.columns().map(|c| generator.quote(c)).collect();
        let sources: Vec<String> = columns.iter().map(|c| format!("source.{}", c)).collect();
        sql.push_str(&format!(
            " WHEN NOT MATCHED THEN INSERT ({}) VALUES ({})",
            columns.join(", "),
            sources.join(", ")
        ));
        statements.push(sql);
    }
    Ok(terminate(statements))
}
