use serde::{Deserialize, Serialize};

use crate::ast::Value;

/// A predicate over live schema facts, evaluated once at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaCondition {
    SchemaExists {
        schema: String,
    },
    TableExists {
        schema: Option<String>,
        table: String,
    },
    ColumnExists {
        schema: Option<String>,
        table: String,
        column: String,
    },
    IndexExists {
        schema: Option<String>,
        table: String,
        index: String,
    },
    ConstraintExists {
        schema: Option<String>,
        table: String,
        constraint: String,
    },
    SequenceExists {
        schema: Option<String>,
        sequence: String,
    },
    DefaultValueExists {
        schema: Option<String>,
        table: String,
        column: String,
        default: Value,
    },
    Not(Box<SchemaCondition>),
    /// True when every child is true (empty is true).
    All(Vec<SchemaCondition>),
    /// True when any child is true (empty is false).
    Any(Vec<SchemaCondition>),
}

impl SchemaCondition {
    pub fn schema_exists(schema: impl Into<String>) -> Self {
        SchemaCondition::SchemaExists { schema: schema.into() }
    }

    pub fn table_exists(table: impl Into<String>) -> Self {
        SchemaCondition::TableExists { schema: None, table: table.into() }
    }

    pub fn column_exists(table: impl Into<String>, column: impl Into<String>) -> Self {
        SchemaCondition::ColumnExists {
            schema: None,
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn index_exists(table: impl Into<String>, index: impl Into<String>) -> Self {
        SchemaCondition::IndexExists {
            schema: None,
            table: table.into(),
            index: index.into(),
        }
    }

    pub fn constraint_exists(table: impl Into<String>, constraint: impl Into<String>) -> Self {
        SchemaCondition::ConstraintExists {
            schema: None,
            table: table.into(),
            constraint: constraint.into(),
        }
    }

    pub fn sequence_exists(sequence: impl Into<String>) -> Self {
        SchemaCondition::SequenceExists { schema: None, sequence: sequence.into() }
    }

    pub fn default_value_exists(
        table: impl Into<String>,
        column: impl Into<String>,
        default: impl Into<Value>,
    ) -> Self {
        SchemaCondition::DefaultValueExists {
            schema: None,
            table: table.into(),
            column: column.into(),
            default: default.into(),
        }
    }

    /// Set the schema of a leaf predicate. Composites and schema checks are unchanged.
    pub fn in_schema(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            SchemaCondition::TableExists { schema, .. }
            | SchemaCondition::ColumnExists { schema, .. }
            | SchemaCondition::IndexExists { schema, .. }
            | SchemaCondition::ConstraintExists { schema, .. }
            | SchemaCondition::SequenceExists { schema, .. }
            | SchemaCondition::DefaultValueExists { schema, .. } => *schema = Some(name.into()),
            _ => {}
        }
        self
    }

    pub fn and(self, other: SchemaCondition) -> Self {
        match self {
            SchemaCondition::All(mut children) => {
                children.push(other);
                SchemaCondition::All(children)
            }
            first => SchemaCondition::All(vec![first, other]),
        }
    }

    pub fn or(self, other: SchemaCondition) -> Self {
        match self {
            SchemaCondition::Any(mut children) => {
                children.push(other);
                SchemaCondition::Any(children)
            }
            first => SchemaCondition::Any(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        SchemaCondition::Not(Box::new(self))
    }
}

impl std::fmt::Display for SchemaCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn qualified(schema: &Option<String>, name: &str) -> String {
            match schema {
                Some(s) => format!("{}.{}", s, name),
                None => name.to_string(),
            }
        }
        fn join(f: &mut std::fmt::Formatter<'_>, children: &[SchemaCondition], op: &str) -> std::fmt::Result {
            write!(f, "(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ")")
        }
        match self {
            SchemaCondition::SchemaExists { schema } => write!(f, "schema {} exists", schema),
            SchemaCondition::TableExists { schema, table } => {
                write!(f, "table {} exists", qualified(schema, table))
            }
            SchemaCondition::ColumnExists { schema, table, column } => {
                write!(f, "column {}.{} exists", qualified(schema, table), column)
            }
            SchemaCondition::IndexExists { schema, table, index } => {
                write!(f, "index {} on {} exists", index, qualified(schema, table))
            }
            SchemaCondition::ConstraintExists { schema, table, constraint } => {
                write!(f, "constraint {} on {} exists", constraint, qualified(schema, table))
            }
            SchemaCondition::SequenceExists { schema, sequence } => {
                write!(f, "sequence {} exists", qualified(schema, sequence))
            }
            SchemaCondition::DefaultValueExists { schema, table, column, default } => write!(
                f,
                "default {} on {}.{} exists",
                default.describe(),
                qualified(schema, table),
                column
            ),
            SchemaCondition::Not(inner) => write!(f, "not {}", inner),
            SchemaCondition::All(children) => join(f, children, "and"),
            SchemaCondition::Any(children) => join(f, children, "or"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_flattens() {
        let cond = SchemaCondition::table_exists("a")
            .and(SchemaCondition::table_exists("b"))
            .and(SchemaCondition::table_exists("c"));
        match cond {
            SchemaCondition::All(children) => assert_eq!(children.len(), 3),
            other => panic!("expected All, got {:?}", other),
        }
    }

    #[test]
    fn test_in_schema_sets_leaf() {
        let cond = SchemaCondition::column_exists("users", "email").in_schema("app");
        assert_eq!(cond.to_string(), "column app.users.email exists");
    }
}
