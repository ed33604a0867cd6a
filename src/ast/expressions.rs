//! The closed set of schema and data operations.

use serde::{Deserialize, Serialize};

use crate::ast::{
    ColumnDef, ConstraintDef, ConstraintKind, DataRow, ForeignKeyDef, IndexDef, SchemaCondition,
    SequenceDef, UpsertData, Value,
};
use crate::error::{MigrateError, Result};

/// One atomic, dialect-independent schema or data operation.
///
/// Expressions are plain data. Generators and processors only ever borrow them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    CreateSchema(CreateSchema),
    DeleteSchema(DeleteSchema),
    CreateTable(CreateTable),
    AlterTable(AlterTable),
    DeleteTable(DeleteTable),
    RenameTable(RenameTable),
    CreateColumn(CreateColumn),
    AlterColumn(AlterColumn),
    DeleteColumn(DeleteColumn),
    RenameColumn(RenameColumn),
    CreateIndex(IndexDef),
    DeleteIndex(DeleteIndex),
    CreateConstraint(ConstraintDef),
    DeleteConstraint(DeleteConstraint),
    CreateForeignKey(ForeignKeyDef),
    DeleteForeignKey(DeleteForeignKey),
    AlterDefaultValue(AlterDefaultValue),
    DeleteDefaultConstraint(DeleteDefaultConstraint),
    CreateSequence(SequenceDef),
    DeleteSequence(DeleteSequence),
    InsertData(InsertData),
    UpdateData(UpdateData),
    DeleteData(DeleteData),
    UpsertData(UpsertData),
    ExecuteSql(ExecuteSql),
    Conditional(ConditionalExpression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSchema {
    pub schema: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteSchema {
    pub schema: String,
}

/// CREATE TABLE with its column list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTable {
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<ColumnDef>,
    pub description: Option<String>,
}

impl CreateTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            columns: Vec::new(),
            description: None,
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Table-level metadata change (currently the table description).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterTable {
    pub schema: Option<String>,
    pub table: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteTable {
    pub schema: Option<String>,
    pub table: String,
    pub if_exists: bool,
}

impl DeleteTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self { schema: None, table: table.into(), if_exists: false }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameTable {
    pub schema: Option<String>,
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateColumn {
    pub schema: Option<String>,
    pub table: String,
    pub column: ColumnDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterColumn {
    pub schema: Option<String>,
    pub table: String,
    pub column: ColumnDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteColumn {
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameColumn {
    pub schema: Option<String>,
    pub table: String,
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteIndex {
    pub schema: Option<String>,
    pub table: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteConstraint {
    pub schema: Option<String>,
    pub table: String,
    pub name: String,
    pub kind: ConstraintKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteForeignKey {
    pub schema: Option<String>,
    pub table: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterDefaultValue {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
    pub default: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteDefaultConstraint {
    pub schema: Option<String>,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteSequence {
    pub schema: Option<String>,
    pub name: String,
}

/// INSERT of one or more rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertData {
    pub schema: Option<String>,
    pub table: String,
    pub rows: Vec<DataRow>,
}

impl InsertData {
    pub fn new(table: impl Into<String>) -> Self {
        Self { schema: None, table: table.into(), rows: Vec::new() }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn row(mut self, row: DataRow) -> Self {
        self.rows.push(row);
        self
    }
}

/// Which rows an update or delete touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowFilter {
    AllRows,
    /// Column equality conjunction; a NULL value matches with IS NULL.
    Where(DataRow),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateData {
    pub schema: Option<String>,
    pub table: String,
    pub set: DataRow,
    pub filter: RowFilter,
}

/// DELETE; each filter becomes its own statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteData {
    pub schema: Option<String>,
    pub table: String,
    pub filters: Vec<RowFilter>,
}

/// Raw SQL, executed without generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteSql {
    pub sql: String,
}

/// Nested expressions guarded by a live schema condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalExpression {
    pub condition: SchemaCondition,
    pub expressions: Vec<Expression>,
}

macro_rules! impl_into_expression {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Expression {
                fn from(expr: $ty) -> Self {
                    Expression::$variant(expr)
                }
            }
        )*
    };
}

impl_into_expression! {
    CreateSchema => CreateSchema,
    DeleteSchema => DeleteSchema,
    CreateTable => CreateTable,
    AlterTable => AlterTable,
    DeleteTable => DeleteTable,
    RenameTable => RenameTable,
    CreateColumn => CreateColumn,
    AlterColumn => AlterColumn,
    DeleteColumn => DeleteColumn,
    RenameColumn => RenameColumn,
    IndexDef => CreateIndex,
    DeleteIndex => DeleteIndex,
    ConstraintDef => CreateConstraint,
    DeleteConstraint => DeleteConstraint,
    ForeignKeyDef => CreateForeignKey,
    DeleteForeignKey => DeleteForeignKey,
    AlterDefaultValue => AlterDefaultValue,
    DeleteDefaultConstraint => DeleteDefaultConstraint,
    SequenceDef => CreateSequence,
    DeleteSequence => DeleteSequence,
    InsertData => InsertData,
    UpdateData => UpdateData,
    DeleteData => DeleteData,
    UpsertData => UpsertData,
    ExecuteSql => ExecuteSql,
    ConditionalExpression => Conditional,
}

fn require(name: &str, what: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MigrateError::Validation(format!("{} cannot be empty", what)));
    }
    Ok(())
}

impl Expression {
    /// Operation name used in logs and capability errors.
    pub fn operation(&self) -> &'static str {
        match self {
            Expression::CreateSchema(_) => "CREATE SCHEMA",
            Expression::DeleteSchema(_) => "DROP SCHEMA",
            Expression::CreateTable(_) => "CREATE TABLE",
            Expression::AlterTable(_) => "ALTER TABLE",
            Expression::DeleteTable(_) => "DROP TABLE",
            Expression::RenameTable(_) => "RENAME TABLE",
            Expression::CreateColumn(_) => "ADD COLUMN",
            Expression::AlterColumn(_) => "ALTER COLUMN",
            Expression::DeleteColumn(_) => "DROP COLUMN",
            Expression::RenameColumn(_) => "RENAME COLUMN",
            Expression::CreateIndex(_) => "CREATE INDEX",
            Expression::DeleteIndex(_) => "DROP INDEX",
            Expression::CreateConstraint(_) => "ADD CONSTRAINT",
            Expression::DeleteConstraint(_) => "DROP CONSTRAINT",
            Expression::CreateForeignKey(_) => "ADD FOREIGN KEY",
            Expression::DeleteForeignKey(_) => "DROP FOREIGN KEY",
            Expression::AlterDefaultValue(_) => "ALTER DEFAULT",
            Expression::DeleteDefaultConstraint(_) => "DROP DEFAULT",
            Expression::CreateSequence(_) => "CREATE SEQUENCE",
            Expression::DeleteSequence(_) => "DROP SEQUENCE",
            Expression::InsertData(_) => "INSERT",
            Expression::UpdateData(_) => "UPDATE",
            Expression::DeleteData(_) => "DELETE",
            Expression::UpsertData(_) => "UPSERT",
            Expression::ExecuteSql(_) => "EXECUTE SQL",
            Expression::Conditional(_) => "CONDITIONAL",
        }
    }

    /// The object the expression acts on, for progress output.
    pub fn target(&self) -> String {
        match self {
            Expression::CreateSchema(e) => e.schema.clone(),
            Expression::DeleteSchema(e) => e.schema.clone(),
            Expression::CreateTable(e) => e.table.clone(),
            Expression::AlterTable(e) => e.table.clone(),
            Expression::DeleteTable(e) => e.table.clone(),
            Expression::RenameTable(e) => format!("{} -> {}", e.old_name, e.new_name),
            Expression::CreateColumn(e) => format!("{}.{}", e.table, e.column.name),
            Expression::AlterColumn(e) => format!("{}.{}", e.table, e.column.name),
            Expression::DeleteColumn(e) => format!("{}.{}", e.table, e.columns.join(",")),
            Expression::RenameColumn(e) => format!("{}.{} -> {}", e.table, e.old_name, e.new_name),
            Expression::CreateIndex(e) => format!("{} on {}", e.name, e.table),
            Expression::DeleteIndex(e) => format!("{} on {}", e.name, e.table),
            Expression::CreateConstraint(e) => format!("{} on {}", e.name, e.table),
            Expression::DeleteConstraint(e) => format!("{} on {}", e.name, e.table),
            Expression::CreateForeignKey(e) => format!("{} on {}", e.name, e.foreign_table),
            Expression::DeleteForeignKey(e) => format!("{} on {}", e.name, e.table),
            Expression::AlterDefaultValue(e) => format!("{}.{}", e.table, e.column),
            Expression::DeleteDefaultConstraint(e) => format!("{}.{}", e.table, e.column),
            Expression::CreateSequence(e) => e.name.clone(),
            Expression::DeleteSequence(e) => e.name.clone(),
            Expression::InsertData(e) => e.table.clone(),
            Expression::UpdateData(e) => e.table.clone(),
            Expression::DeleteData(e) => e.table.clone(),
            Expression::UpsertData(e) => e.table.clone(),
            Expression::ExecuteSql(e) => {
                let first = e.sql.lines().next().unwrap_or_default();
                first.chars().take(60).collect()
            }
            Expression::Conditional(e) => format!("{} nested", e.expressions.len()),
        }
    }

    /// Structural checks run when the expression is recorded.
    pub fn validate(&self) -> Result<()> {
        match self {
            Expression::CreateSchema(e) => require(&e.schema, "Schema name"),
            Expression::DeleteSchema(e) => require(&e.schema, "Schema name"),
            Expression::CreateTable(e) => {
                require(&e.table, "Table name")?;
                if e.columns.is_empty() {
                    return Err(MigrateError::Validation(format!(
                        "Table {} must define at least one column",
                        e.table
                    )));
                }
                for column in &e.columns {
                    require(&column.name, "Column name")?;
                }
                Ok(())
            }
            Expression::AlterTable(e) => require(&e.table, "Table name"),
            Expression::DeleteTable(e) => require(&e.table, "Table name"),
            Expression::RenameTable(e) => {
                require(&e.old_name, "Old table name")?;
                require(&e.new_name, "New table name")
            }
            Expression::CreateColumn(e) => {
                require(&e.table, "Table name")?;
                require(&e.column.name, "Column name")
            }
            Expression::AlterColumn(e) => {
                require(&e.table, "Table name")?;
                require(&e.column.name, "Column name")
            }
            Expression::DeleteColumn(e) => {
                require(&e.table, "Table name")?;
                if e.columns.is_empty() {
                    return Err(MigrateError::Validation(
                        "Delete column requires at least one column".to_string(),
                    ));
                }
                Ok(())
            }
            Expression::RenameColumn(e) => {
                require(&e.table, "Table name")?;
                require(&e.old_name, "Old column name")?;
                require(&e.new_name, "New column name")
            }
            Expression::CreateIndex(e) => {
                require(&e.name, "Index name")?;
                require(&e.table, "Table name")?;
                if e.columns.is_empty() {
                    return Err(MigrateError::Validation(format!(
                        "Index {} must cover at least one column",
                        e.name
                    )));
                }
                Ok(())
            }
            Expression::DeleteIndex(e) => require(&e.name, "Index name"),
            Expression::CreateConstraint(e) => {
                require(&e.name, "Constraint name")?;
                require(&e.table, "Table name")?;
                if e.columns.is_empty() {
                    return Err(MigrateError::Validation(format!(
                        "Constraint {} must cover at least one column",
                        e.name
                    )));
                }
                Ok(())
            }
            Expression::DeleteConstraint(e) => require(&e.name, "Constraint name"),
            Expression::CreateForeignKey(e) => {
                require(&e.name, "Foreign key name")?;
                if e.foreign_columns.is_empty()
                    || e.foreign_columns.len() != e.primary_columns.len()
                {
                    return Err(MigrateError::Validation(format!(
                        "Foreign key {} needs matching, non-empty column lists",
                        e.name
                    )));
                }
                Ok(())
            }
            Expression::DeleteForeignKey(e) => require(&e.name, "Foreign key name"),
            Expression::AlterDefaultValue(e) => require(&e.column, "Column name"),
            Expression::DeleteDefaultConstraint(e) => require(&e.column, "Column name"),
            Expression::CreateSequence(e) => require(&e.name, "Sequence name"),
            Expression::DeleteSequence(e) => require(&e.name, "Sequence name"),
            Expression::InsertData(e) => {
                require(&e.table, "Table name")?;
                if e.rows.iter().any(|r| r.is_empty()) {
                    return Err(MigrateError::Validation(format!(
                        "Insert into {} contains an empty row",
                        e.table
                    )));
                }
                Ok(())
            }
            Expression::UpdateData(e) => {
                require(&e.table, "Table name")?;
                if e.set.is_empty() {
                    return Err(MigrateError::Validation(format!(
                        "Update of {} sets no columns",
                        e.table
                    )));
                }
                Ok(())
            }
            Expression::DeleteData(e) => require(&e.table, "Table name"),
            Expression::UpsertData(e) => e.validate(),
            Expression::ExecuteSql(e) => require(&e.sql, "SQL text"),
            Expression::Conditional(e) => e.expressions.iter().try_for_each(Expression::validate),
        }
    }

    /// The inverse operation, for auto-reversing migrations.
    ///
    /// Fails for expressions whose prior state cannot be reconstructed
    /// (dropping a table loses its definition, updates lose old values).
    /// Conditional blocks fail too: their condition was evaluated against
    /// the schema before `up` ran and says nothing about the schema after.
    pub fn reverse(&self) -> Result<Expression> {
        let reversed = match self {
            Expression::CreateSchema(e) => DeleteSchema { schema: e.schema.clone() }.into(),
            Expression::CreateTable(e) => DeleteTable {
                schema: e.schema.clone(),
                table: e.table.clone(),
                if_exists: false,
            }
            .into(),
            Expression::RenameTable(e) => RenameTable {
                schema: e.schema.clone(),
                old_name: e.new_name.clone(),
                new_name: e.old_name.clone(),
            }
            .into(),
            Expression::CreateColumn(e) => DeleteColumn {
                schema: e.schema.clone(),
                table: e.table.clone(),
                columns: vec![e.column.name.clone()],
            }
            .into(),
            Expression::RenameColumn(e) => RenameColumn {
                schema: e.schema.clone(),
                table: e.table.clone(),
                old_name: e.new_name.clone(),
                new_name: e.old_name.clone(),
            }
            .into(),
            Expression::CreateIndex(e) => DeleteIndex {
                schema: e.schema.clone(),
                table: e.table.clone(),
                name: e.name.clone(),
            }
            .into(),
            Expression::CreateConstraint(e) => DeleteConstraint {
                schema: e.schema.clone(),
                table: e.table.clone(),
                name: e.name.clone(),
                kind: e.kind,
            }
            .into(),
            Expression::CreateForeignKey(e) => DeleteForeignKey {
                schema: e.foreign_schema.clone(),
                table: e.foreign_table.clone(),
                name: e.name.clone(),
            }
            .into(),
            Expression::CreateSequence(e) => DeleteSequence {
                schema: e.schema.clone(),
                name: e.name.clone(),
            }
            .into(),
            Expression::InsertData(e) => DeleteData {
                schema: e.schema.clone(),
                table: e.table.clone(),
                filters: e.rows.iter().cloned().map(RowFilter::Where).collect(),
            }
            .into(),
            other => {
                return Err(MigrateError::Validation(format!(
                    "{} ({}) cannot be reversed automatically; implement down()",
                    other.operation(),
                    other.target()
                )));
            }
        };
        Ok(reversed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ColumnType;

    #[test]
    fn test_create_table_requires_columns() {
        let expr: Expression = CreateTable::new("users").into();
        assert!(matches!(expr.validate(), Err(MigrateError::Validation(_))));
    }

    #[test]
    fn test_reverse_create_table() {
        let expr: Expression = CreateTable::new("users")
            .in_schema("app")
            .column(ColumnDef::new("id", ColumnType::int32()).primary_key())
            .into();
        let down = expr.reverse().unwrap();
        assert_eq!(
            down,
            Expression::DeleteTable(DeleteTable {
                schema: Some("app".to_string()),
                table: "users".to_string(),
                if_exists: false,
            })
        );
    }

    #[test]
    fn test_reverse_rename_swaps_names() {
        let expr: Expression = RenameColumn {
            schema: None,
            table: "users".to_string(),
            old_name: "mail".to_string(),
            new_name: "email".to_string(),
        }
        .into();
        match expr.reverse().unwrap() {
            Expression::RenameColumn(r) => {
                assert_eq!(r.old_name, "email");
                assert_eq!(r.new_name, "mail");
            }
            other => panic!("unexpected reverse: {:?}", other),
        }
    }

    #[test]
    fn test_reverse_insert_becomes_delete_per_row() {
        let expr: Expression = InsertData::new("roles")
            .row(DataRow::new().set("id", 1).set("name", "admin"))
            .row(DataRow::new().set("id", 2).set("name", "user"))
            .into();
        match expr.reverse().unwrap() {
            Expression::DeleteData(d) => assert_eq!(d.filters.len(), 2),
            other => panic!("unexpected reverse: {:?}", other),
        }
    }

    #[test]
    fn test_drop_table_is_irreversible() {
        let expr: Expression = DeleteTable::new("users").into();
        assert!(expr.reverse().is_err());
    }

    #[test]
    fn test_conditional_block_is_irreversible() {
        let expr: Expression = ConditionalExpression {
            condition: SchemaCondition::table_exists("users").not(),
            expressions: vec![CreateTable::new("users")
                .column(ColumnDef::new("id", ColumnType::int32()))
                .into()],
        }
        .into();
        let err = expr.reverse().unwrap_err();
        assert!(matches!(err, MigrateError::Validation(_)));
        assert!(err.to_string().contains("CONDITIONAL"));
    }
}
