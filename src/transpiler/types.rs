//! Abstract column type → native DDL type.

use std::collections::HashMap;

use crate::ast::{ColumnType, DbType};
use crate::error::{MigrateError, Result};
use crate::transpiler::Dialect;

/// Per-dialect type table.
///
/// Each abstract type has an optional default template (used when no size is
/// given) and any number of sized templates keyed by the largest size they
/// accept. A sized request picks the smallest template whose limit fits;
/// sizes beyond every limit are an error, never clamped. Templates may use
/// `$size` and `$scale` placeholders.
#[derive(Debug, Clone)]
pub struct TypeMap {
    dialect: Dialect,
    defaults: HashMap<DbType, String>,
    sized: HashMap<DbType, Vec<(u32, String)>>,
}

impl TypeMap {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            defaults: HashMap::new(),
            sized: HashMap::new(),
        }
    }

    /// Builder: template used when no size is requested.
    pub fn set(mut self, kind: DbType, template: &str) -> Self {
        self.defaults.insert(kind, template.to_string());
        self
    }

    /// Builder: template for sizes up to and including `max_size`.
    pub fn set_sized(mut self, kind: DbType, template: &str, max_size: u32) -> Self {
        let entries = self.sized.entry(kind).or_default();
        entries.push((max_size, template.to_string()));
        entries.sort_by_key(|(max, _)| *max);
        self
    }

    pub fn resolve(&self, column_type: &ColumnType) -> Result<String> {
        match column_type {
            ColumnType::Custom(sql) => Ok(sql.clone()),
            ColumnType::Db { kind, size, scale } => self.get(*kind, *size, *scale),
        }
    }

    pub fn get(&self, kind: DbType, size: Option<u32>, scale: Option<u32>) -> Result<String> {
        let sized = self.sized.get(&kind);
        let default = self.defaults.get(&kind);
        if sized.is_none() && default.is_none() {
            return Err(self.unsupported(kind, size, scale));
        }

        let Some(size) = size else {
            if scale.is_some() {
                return Err(self.unsupported(kind, None, scale));
            }
            return match (default, sized) {
                (Some(template), _) => Ok(template.clone()),
                (None, _) => Err(self.unsupported(kind, None, None)),
            };
        };

        match sized {
            Some(entries) => {
                if let Some(scale) = scale {
                    if scale > size {
                        return Err(self.unsupported(kind, Some(size), Some(scale)));
                    }
                }
                entries
                    .iter()
                    .find(|(max, _)| size <= *max)
                    .map(|(_, template)| render(template, size, scale.unwrap_or(0)))
                    .ok_or_else(|| self.unsupported(kind, Some(size), scale))
            }
            // Types without sized variants (INTEGER, DATE, ...) ignore a length hint.
            None if scale.is_none() => Ok(default.cloned().unwrap_or_default()),
            None => Err(self.unsupported(kind, Some(size), scale)),
        }
    }

    fn unsupported(&self, kind: DbType, size: Option<u32>, scale: Option<u32>) -> MigrateError {
        let column_type = match (size, scale) {
            (Some(size), Some(scale)) => format!("{}({}, {})", kind, size, scale),
            (Some(size), None) => format!("{}({})", kind, size),
            (None, Some(scale)) => format!("{}(scale {})", kind, scale),
            (None, None) => kind.to_string(),
        };
        MigrateError::UnsupportedType { column_type, dialect: self.dialect }
    }
}

fn render(template: &str, size: u32, scale: u32) -> String {
    template
        .replace("$size", &size.to_string())
        .replace("$scale", &scale.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> TypeMap {
        TypeMap::new(Dialect::MySql)
            .set(DbType::String, "VARCHAR(255)")
            .set_sized(DbType::String, "TEXT", 65535)
            .set_sized(DbType::String, "VARCHAR($size)", 16383)
            .set(DbType::Int32, "INTEGER")
            .set(DbType::Decimal, "DECIMAL(19,5)")
            .set_sized(DbType::Decimal, "DECIMAL($size,$scale)", 65)
    }

    #[test]
    fn test_default_template() {
        assert_eq!(map().get(DbType::String, None, None).unwrap(), "VARCHAR(255)");
    }

    #[test]
    fn test_smallest_fitting_template_wins() {
        let m = map();
        assert_eq!(m.get(DbType::String, Some(100), None).unwrap(), "VARCHAR(100)");
        assert_eq!(m.get(DbType::String, Some(20000), None).unwrap(), "TEXT");
    }

    #[test]
    fn test_oversized_fails_instead_of_clamping() {
        let err = map().get(DbType::String, Some(70000), None).unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedType { .. }));
        assert!(err.to_string().contains("String(70000)"));
    }

    #[test]
    fn test_decimal_precision_and_scale() {
        let m = map();
        assert_eq!(m.get(DbType::Decimal, Some(10), Some(2)).unwrap(), "DECIMAL(10,2)");
        assert!(m.get(DbType::Decimal, Some(70), Some(2)).is_err());
        assert!(m.get(DbType::Decimal, Some(2), Some(5)).is_err());
    }

    #[test]
    fn test_unmapped_type_names_dialect() {
        let err = map().get(DbType::Xml, None, None).unwrap_err();
        assert_eq!(err.to_string(), "Type Xml is not supported by MySQL");
    }

    #[test]
    fn test_size_hint_ignored_for_unsized_types() {
        assert_eq!(map().get(DbType::Int32, Some(4), None).unwrap(), "INTEGER");
    }
}
