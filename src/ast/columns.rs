//! Column, index, key and sequence definitions.

use serde::{Deserialize, Serialize};

use crate::ast::Value;

/// Abstract column types, resolved to native DDL by each dialect's type map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    AnsiString,
    AnsiStringFixedLength,
    Binary,
    Boolean,
    Byte,
    Currency,
    Date,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    Single,
    String,
    StringFixedLength,
    Time,
    Xml,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The declared type of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Abstract type with optional size (length or precision) and scale.
    Db {
        kind: DbType,
        size: Option<u32>,
        scale: Option<u32>,
    },
    /// Native type text passed through untouched.
    Custom(String),
}

impl ColumnType {
    pub fn of(kind: DbType) -> Self {
        ColumnType::Db { kind, size: None, scale: None }
    }

    pub fn sized(kind: DbType, size: u32) -> Self {
        ColumnType::Db { kind, size: Some(size), scale: None }
    }

    pub fn int16() -> Self {
        Self::of(DbType::Int16)
    }

    pub fn int32() -> Self {
        Self::of(DbType::Int32)
    }

    pub fn int64() -> Self {
        Self::of(DbType::Int64)
    }

    pub fn boolean() -> Self {
        Self::of(DbType::Boolean)
    }

    pub fn datetime() -> Self {
        Self::of(DbType::DateTime)
    }

    pub fn guid() -> Self {
        Self::of(DbType::Guid)
    }

    /// Unicode string; `None` picks the dialect default length.
    pub fn string(len: Option<u32>) -> Self {
        ColumnType::Db { kind: DbType::String, size: len, scale: None }
    }

    pub fn ansi_string(len: Option<u32>) -> Self {
        ColumnType::Db { kind: DbType::AnsiString, size: len, scale: None }
    }

    /// DECIMAL(precision, scale)
    pub fn decimal(precision: u32, scale: u32) -> Self {
        ColumnType::Db {
            kind: DbType::Decimal,
            size: Some(precision),
            scale: Some(scale),
        }
    }

    pub fn custom(sql: impl Into<String>) -> Self {
        ColumnType::Custom(sql.into())
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Db { kind, size: None, .. } => write!(f, "{}", kind),
            ColumnType::Db { kind, size: Some(size), scale: None } => write!(f, "{}({})", kind, size),
            ColumnType::Db { kind, size: Some(size), scale: Some(scale) } => {
                write!(f, "{}({}, {})", kind, size, scale)
            }
            ColumnType::Custom(sql) => write!(f, "{}", sql),
        }
    }
}

/// A column definition used by create-table, create-column and alter-column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    /// `None` leaves nullability to the dialect default (nullable).
    pub nullable: Option<bool>,
    pub default: Option<Value>,
    pub primary_key: bool,
    /// Explicit primary key constraint name
    pub primary_key_name: Option<String>,
    /// Auto-increment / identity column
    pub identity: bool,
    pub unique: bool,
    /// Expression for a computed (generated) column
    pub computed: Option<String>,
    pub description: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: None,
            default: None,
            primary_key: false,
            primary_key_name: None,
            identity: false,
            unique: false,
            computed: None,
            description: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = Some(false);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = Some(true);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = Some(false);
        self
    }

    pub fn primary_key_named(mut self, name: impl Into<String>) -> Self {
        self.primary_key_name = Some(name.into());
        self.primary_key()
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn computed(mut self, expression: impl Into<String>) -> Self {
        self.computed = Some(expression.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub name: String,
    pub direction: SortDirection,
}

/// Index definition (for create-index).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
}

impl IndexDef {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            table: table.into(),
            columns: Vec::new(),
            unique: false,
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(IndexColumn { name: name.into(), direction: SortDirection::Asc });
        self
    }

    pub fn column_desc(mut self, name: impl Into<String>) -> Self {
        self.columns.push(IndexColumn { name: name.into(), direction: SortDirection::Desc });
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
}

/// Table-level primary key or unique constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDef {
    pub name: String,
    pub kind: ConstraintKind,
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
}

impl ConstraintDef {
    pub fn primary_key(name: impl Into<String>, table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::PrimaryKey,
            schema: None,
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn unique(name: impl Into<String>, table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::Unique,
            schema: None,
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Referential action for ON DELETE / ON UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ForeignKeyRule {
    #[default]
    None,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

/// Foreign key from `foreign_table(foreign_columns)` to `primary_table(primary_columns)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub name: String,
    pub foreign_schema: Option<String>,
    pub foreign_table: String,
    pub foreign_columns: Vec<String>,
    pub primary_schema: Option<String>,
    pub primary_table: String,
    pub primary_columns: Vec<String>,
    pub on_delete: ForeignKeyRule,
    pub on_update: ForeignKeyRule,
}

impl ForeignKeyDef {
    pub fn new(
        name: impl Into<String>,
        foreign_table: impl Into<String>,
        foreign_columns: &[&str],
        primary_table: impl Into<String>,
        primary_columns: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            foreign_schema: None,
            foreign_table: foreign_table.into(),
            foreign_columns: foreign_columns.iter().map(|c| c.to_string()).collect(),
            primary_schema: None,
            primary_table: primary_table.into(),
            primary_columns: primary_columns.iter().map(|c| c.to_string()).collect(),
            on_delete: ForeignKeyRule::None,
            on_update: ForeignKeyRule::None,
        }
    }

    pub fn on_delete(mut self, rule: ForeignKeyRule) -> Self {
        self.on_delete = rule;
        self
    }

    pub fn on_update(mut self, rule: ForeignKeyRule) -> Self {
        self.on_update = rule;
        self
    }
}

/// Sequence definition (for create-sequence).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDef {
    pub name: String,
    pub schema: Option<String>,
    pub increment: Option<i64>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub start_with: Option<i64>,
    pub cache: Option<i64>,
    pub cycle: bool,
}

impl SequenceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            increment: None,
            min_value: None,
            max_value: None,
            start_with: None,
            cache: None,
            cycle: false,
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn increment(mut self, by: i64) -> Self {
        self.increment = Some(by);
        self
    }

    pub fn start_with(mut self, value: i64) -> Self {
        self.start_with = Some(value);
        self
    }

    pub fn min_value(mut self, value: i64) -> Self {
        self.min_value = Some(value);
        self
    }

    pub fn max_value(mut self, value: i64) -> Self {
        self.max_value = Some(value);
        self
    }

    pub fn cache(mut self, size: i64) -> Self {
        self.cache = Some(size);
        self
    }

    pub fn cycle(mut self) -> Self {
        self.cycle = true;
        self
    }
}
