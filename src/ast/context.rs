//! Expression collector handed to `Migration::up` / `Migration::down`.

use crate::ast::{ConditionalExpression, Expression, ExecuteSql, SchemaCondition};
use crate::error::Result;

/// Records the expressions a migration produces, in order.
///
/// Every recorded expression is validated on entry, so a bad combination of
/// fields fails inside `up`/`down` before any SQL is generated.
#[derive(Debug, Default)]
pub struct MigrationContext {
    expressions: Vec<Expression>,
}

impl MigrationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one expression.
    pub fn push(&mut self, expression: impl Into<Expression>) -> Result<()> {
        let expression = expression.into();
        expression.validate()?;
        self.expressions.push(expression);
        Ok(())
    }

    /// Record raw SQL text (may hold several statements).
    pub fn execute_sql(&mut self, sql: impl Into<String>) -> Result<()> {
        self.push(ExecuteSql { sql: sql.into() })
    }

    /// Record a block of expressions that only run when `condition` holds
    /// against the live schema at execution time.
    pub fn when<F>(&mut self, condition: SchemaCondition, build: F) -> Result<()>
    where
        F: FnOnce(&mut MigrationContext) -> Result<()>,
    {
        let mut nested = MigrationContext::new();
        build(&mut nested)?;
        self.push(ConditionalExpression {
            condition,
            expressions: nested.into_expressions(),
        })
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn into_expressions(self) -> Vec<Expression> {
        self.expressions
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ColumnDef, ColumnType, CreateColumn, CreateTable};

    #[test]
    fn test_when_collects_nested_expressions() {
        let mut ctx = MigrationContext::new();
        ctx.when(SchemaCondition::table_exists("users"), |c| {
            c.push(CreateColumn {
                schema: None,
                table: "users".to_string(),
                column: ColumnDef::new("age", ColumnType::int32()),
            })
        })
        .unwrap();

        match &ctx.expressions()[0] {
            Expression::Conditional(cond) => assert_eq!(cond.expressions.len(), 1),
            other => panic!("expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_push_rejects_invalid_expression() {
        let mut ctx = MigrationContext::new();
        assert!(ctx.push(CreateTable::new("empty")).is_err());
        assert!(ctx.is_empty());
    }
}
