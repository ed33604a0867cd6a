//! Upsert (insert-or-update keyed by match columns).

use serde::{Deserialize, Serialize};

use crate::ast::DataRow;
use crate::error::{MigrateError, Result};

/// How matched rows are updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum UpdateSpec {
    /// Every non-match column of the row.
    #[default]
    AllNonMatch,
    /// Only these columns, valued from the source row. Match columns are skipped.
    Columns(Vec<String>),
    /// These explicit values, regardless of the row.
    Values(DataRow),
    /// Leave matched rows untouched.
    IgnoreIfExists,
}

/// Insert rows, updating the ones that already exist by `match_columns`.
///
/// The builder rejects conflicting update specifications immediately:
/// update-columns, update-values and ignore-if-exists are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertData {
    pub schema: Option<String>,
    pub table: String,
    pub match_columns: Vec<String>,
    pub rows: Vec<DataRow>,
    pub update: UpdateSpec,
}

impl UpsertData {
    pub fn new(table: impl Into<String>, match_columns: &[&str]) -> Result<Self> {
        let table = table.into();
        if match_columns.is_empty() {
            return Err(MigrateError::Validation(format!(
                "Upsert into {} requires at least one match column",
                table
            )));
        }
        let mut unique: Vec<String> = Vec::with_capacity(match_columns.len());
        for col in match_columns {
            if !unique.iter().any(|c| c == col) {
                unique.push(col.to_string());
            }
        }
        Ok(Self {
            schema: None,
            table,
            match_columns: unique,
            rows: Vec::new(),
            update: UpdateSpec::AllNonMatch,
        })
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Add a source row. Every match column must be present, and so must
    /// every update column when update columns are set.
    pub fn row(mut self, row: DataRow) -> Result<Self> {
        if let Some(missing) = self.match_columns.iter().find(|c| !row.contains(c)) {
            return Err(MigrateError::Validation(format!(
                "Upsert row for {} is missing match column {}",
                self.table, missing
            )));
        }
        if let UpdateSpec::Columns(columns) = &self.update {
            self.ensure_update_columns_present(columns, &row)?;
        }
        self.rows.push(row);
        Ok(self)
    }

    /// Update only these columns of a matched row, valued from the source
    /// row. Every row must carry every non-match column named here.
    pub fn update_columns(mut self, columns: &[&str]) -> Result<Self> {
        self.ensure_no_update_spec("update columns")?;
        if columns.is_empty() {
            return Err(MigrateError::Validation(
                "Upsert update columns cannot be empty".to_string(),
            ));
        }
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        for row in &self.rows {
            self.ensure_update_columns_present(&columns, row)?;
        }
        self.update = UpdateSpec::Columns(columns);
        Ok(self)
    }

    fn ensure_update_columns_present(&self, columns: &[String], row: &DataRow) -> Result<()> {
        match columns
            .iter()
            .find(|c| !self.is_match_column(c) && !row.contains(c))
        {
            Some(missing) => Err(MigrateError::Validation(format!(
                "Upsert row for {} has no value for update column {}",
                self.table, missing
            ))),
            None => Ok(()),
        }
    }

    pub fn update_values(mut self, values: DataRow) -> Result<Self> {
        self.ensure_no_update_spec("update values")?;
        if values.is_empty() {
            return Err(MigrateError::Validation(
                "Upsert update values cannot be empty".to_string(),
            ));
        }
        self.update = UpdateSpec::Values(values);
        Ok(self)
    }

    pub fn ignore_insert_if_exists(mut self) -> Result<Self> {
        self.ensure_no_update_spec("ignore insert if exists")?;
        self.update = UpdateSpec::IgnoreIfExists;
        Ok(self)
    }

    fn ensure_no_update_spec(&self, requested: &str) -> Result<()> {
        let current = match &self.update {
            UpdateSpec::AllNonMatch => return Ok(()),
            UpdateSpec::Columns(_) => "update columns",
            UpdateSpec::Values(_) => "update values",
            UpdateSpec::IgnoreIfExists => "ignore insert if exists",
        };
        Err(MigrateError::Validation(format!(
            "Upsert into {}: cannot combine {} with {}",
            self.table, requested, current
        )))
    }

    pub fn is_match_column(&self, column: &str) -> bool {
        self.match_columns.iter().any(|c| c == column)
    }

    /// The column → source-value assignments applied to a matched row.
    ///
    /// Empty when nothing should be updated (ignore mode, or every column is a
    /// match column).
    pub fn update_assignments(&self, row: &DataRow) -> UpdateAssignments {
        match &self.update {
            UpdateSpec::IgnoreIfExists => UpdateAssignments::None,
            UpdateSpec::Values(values) => UpdateAssignments::Literal(values.clone()),
            UpdateSpec::Columns(columns) => UpdateAssignments::FromSource(
                columns
                    .iter()
                    .filter(|c| !self.is_match_column(c))
                    .cloned()
                    .collect(),
            ),
            UpdateSpec::AllNonMatch => UpdateAssignments::FromSource(
                row.columns()
                    .filter(|c| !self.is_match_column(c))
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(MigrateError::Validation("Table name cannot be empty".to_string()));
        }
        if self.rows.is_empty() {
            return Err(MigrateError::Validation(format!(
                "Upsert into {} has no rows",
                self.table
            )));
        }
        if let UpdateSpec::Columns(columns) = &self.update {
            for row in &self.rows {
                self.ensure_update_columns_present(columns, row)?;
            }
        }
        Ok(())
    }
}

/// Resolved update clause for one row.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAssignments {
    None,
    /// Columns whose new value is taken from the matched source row.
    FromSource(Vec<String>),
    Literal(DataRow),
}

impl UpdateAssignments {
    pub fn is_empty(&self) -> bool {
        match self {
            UpdateAssignments::None => true,
            UpdateAssignments::FromSource(cols) => cols.is_empty(),
            UpdateAssignments::Literal(row) => row.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> DataRow {
        DataRow::new().set("Email", "a@x.com").set("Name", "A").set("Active", true)
    }

    #[test]
    fn test_default_updates_all_non_match_columns() {
        let upsert = UpsertData::new("People", &["Email"]).unwrap().row(person()).unwrap();
        assert_eq!(
            upsert.update_assignments(&upsert.rows[0]),
            UpdateAssignments::FromSource(vec!["Name".to_string(), "Active".to_string()])
        );
    }

    #[test]
    fn test_update_columns_skip_match_columns() {
        let upsert = UpsertData::new("People", &["Email"])
            .unwrap()
            .row(person())
            .unwrap()
            .update_columns(&["Email", "Name"])
            .unwrap();
        assert_eq!(
            upsert.update_assignments(&upsert.rows[0]),
            UpdateAssignments::FromSource(vec!["Name".to_string()])
        );
    }

    #[test]
    fn test_ignore_yields_no_update() {
        let upsert = UpsertData::new("People", &["Email"])
            .unwrap()
            .row(person())
            .unwrap()
            .ignore_insert_if_exists()
            .unwrap();
        assert!(upsert.update_assignments(&upsert.rows[0]).is_empty());
    }

    #[test]
    fn test_conflicting_update_specs_fail_fast() {
        let err = UpsertData::new("People", &["Email"])
            .unwrap()
            .update_columns(&["Name"])
            .unwrap()
            .update_values(DataRow::new().set("Name", "Z"))
            .unwrap_err();
        assert!(matches!(err, MigrateError::Validation(_)));

        let err = UpsertData::new("People", &["Email"])
            .unwrap()
            .ignore_insert_if_exists()
            .unwrap()
            .update_columns(&["Name"])
            .unwrap_err();
        assert!(matches!(err, MigrateError::Validation(_)));
    }

    #[test]
    fn test_update_column_missing_from_row_rejected() {
        // Row first, then the update columns.
        let err = UpsertData::new("People", &["Email"])
            .unwrap()
            .row(DataRow::new().set("Email", "a@x.com").set("Name", "B"))
            .unwrap()
            .update_columns(&["Name", "Active"])
            .unwrap_err();
        assert!(matches!(err, MigrateError::Validation(_)));
        assert!(err.to_string().contains("Active"));

        // Update columns first, then the row.
        let err = UpsertData::new("People", &["Email"])
            .unwrap()
            .update_columns(&["Name", "Active"])
            .unwrap()
            .row(DataRow::new().set("Email", "a@x.com").set("Name", "B"))
            .unwrap_err();
        assert!(matches!(err, MigrateError::Validation(_)));
        assert!(err.to_string().contains("Active"));
    }

    #[test]
    fn test_match_columns_may_be_named_as_update_columns() {
        let upsert = UpsertData::new("People", &["Email"])
            .unwrap()
            .update_columns(&["Email", "Name"])
            .unwrap()
            .row(DataRow::new().set("Email", "a@x.com").set("Name", "B"))
            .unwrap();
        assert_eq!(upsert.rows.len(), 1);
    }

    #[test]
    fn test_empty_match_columns_rejected() {
        assert!(UpsertData::new("People", &[]).is_err());
    }

    #[test]
    fn test_row_missing_match_column_rejected() {
        let err = UpsertData::new("People", &["Email"])
            .unwrap()
            .row(DataRow::new().set("Name", "A"))
            .unwrap_err();
        assert!(err.to_string().contains("Email"));
    }
}
