//! Migrations stored as plain SQL scripts.
//!
//! A migration is a pair of files in the migrations directory:
//!
//! ```text
//! V20260301120000__add_users.up.sql
//! V20260301120000__add_users.down.sql   (optional)
//! ```
//!
//! Each script becomes a single raw-SQL expression, so it may hold several
//! statements and uses the dialect's batch separator where it needs one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::ast::MigrationContext;
use crate::error::{MigrateError, Result};
use crate::runner::{Migration, MigrationSet};

#[derive(Debug, Clone, PartialEq)]
pub struct SqlFileMigration {
    pub version: i64,
    pub description: String,
    pub up_sql: String,
    pub down_sql: Option<String>,
}

impl Migration for SqlFileMigration {
    fn version(&self) -> i64 {
        self.version
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn up(&self, ctx: &mut MigrationContext) -> Result<()> {
        ctx.execute_sql(&self.up_sql)
    }

    fn down(&self, ctx: &mut MigrationContext) -> Result<()> {
        match &self.down_sql {
            Some(sql) => ctx.execute_sql(sql),
            None => Err(MigrateError::Validation(format!(
                "Migration {} has no .down.sql script",
                self.version
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Up,
    Down,
}

/// Split `V<version>__<description>.<up|down>.sql` into its parts.
fn parse_file_name(name: &str) -> Option<(i64, String, Script)> {
    let (stem, script) = if let Some(stem) = name.strip_suffix(".up.sql") {
        (stem, Script::Up)
    } else if let Some(stem) = name.strip_suffix(".down.sql") {
        (stem, Script::Down)
    } else {
        return None;
    };
    let rest = stem.strip_prefix('V').or_else(|| stem.strip_prefix('v'))?;
    let (version, description) = rest.split_once("__")?;
    let version = version.parse::<i64>().ok()?;
    Some((version, description.replace('_', " "), script))
}

/// Load every migration in `dir`, in version order.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<MigrationSet> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(MigrateError::Config(format!(
            "Migrations directory not found: {}",
            dir.display()
        )));
    }

    let mut ups: BTreeMap<i64, (String, PathBuf)> = BTreeMap::new();
    let mut downs: BTreeMap<i64, PathBuf> = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match parse_file_name(name) {
            Some((version, description, Script::Up)) => {
                if ups.insert(version, (description, path.clone())).is_some() {
                    return Err(MigrateError::VersionOrder(format!(
                        "Duplicate migration version {} ({})",
                        version,
                        path.display()
                    )));
                }
            }
            Some((version, _, Script::Down)) => {
                downs.insert(version, path.clone());
            }
            None if name.ends_with(".sql") => {
                warn!("Ignoring {}: expected V<version>__<description>.up.sql", name);
            }
            None => {}
        }
    }

    if let Some((version, path)) = downs.iter().find(|(v, _)| !ups.contains_key(v)) {
        return Err(MigrateError::Config(format!(
            "{} has no matching .up.sql for version {}",
            path.display(),
            version
        )));
    }

    let mut set = MigrationSet::new();
    for (version, (description, up_path)) in ups {
        let up_sql = std::fs::read_to_string(&up_path)?;
        let down_sql = match downs.get(&version) {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None => None,
        };
        debug!("Loaded migration {} from {}", version, up_path.display());
        set.add(SqlFileMigration {
            version,
            description,
            up_sql,
            down_sql,
        });
    }
    Ok(set)
}

/// Create an empty up/down pair stamped with the current UTC time.
pub fn scaffold(dir: impl AsRef<Path>, name: &str) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    let slug: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if slug.trim_matches('_').is_empty() {
        return Err(MigrateError::Config(format!("Invalid migration name: '{}'", name)));
    }

    std::fs::create_dir_all(dir)?;
    let version = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let up = dir.join(format!("V{}__{}.up.sql", version, slug));
    let down = dir.join(format!("V{}__{}.down.sql", version, slug));
    if up.exists() || down.exists() {
        return Err(MigrateError::Config(format!("{} already exists", up.display())));
    }

    std::fs::write(&up, format!("-- {}\n", name.trim()))?;
    std::fs::write(&down, format!("-- Revert: {}\n", name.trim()))?;
    Ok((up, down))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::migration::{build, Direction};
    use crate::ast::Expression;

    #[test]
    fn test_parse_file_name() {
        assert_eq!(
            parse_file_name("V3__add_users.up.sql"),
            Some((3, "add users".to_string(), Script::Up))
        );
        assert_eq!(
            parse_file_name("V3__add_users.down.sql").map(|p| p.2),
            Some(Script::Down)
        );
        assert_eq!(parse_file_name("add_users.sql"), None);
        assert_eq!(parse_file_name("Vx__bad.up.sql"), None);
    }

    #[test]
    fn test_load_dir_orders_and_pairs_scripts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("V2__second.up.sql"), "SELECT 2;").unwrap();
        std::fs::write(dir.path().join("V1__first.up.sql"), "SELECT 1;").unwrap();
        std::fs::write(dir.path().join("V1__first.down.sql"), "SELECT -1;").unwrap();
        std::fs::write(dir.path().join("README.md"), "notes").unwrap();

        let set = load_dir(dir.path()).unwrap();
        assert_eq!(set.versions(), vec![1, 2]);
        assert_eq!(set.get(1).unwrap().description(), "first");

        let down = build(set.get(1).unwrap(), Direction::Down).unwrap();
        assert!(matches!(&down[0], Expression::ExecuteSql(e) if e.sql == "SELECT -1;"));
        assert!(build(set.get(2).unwrap(), Direction::Down).is_err());
    }

    #[test]
    fn test_orphan_down_script_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("V5__gone.down.sql"), "SELECT 1;").unwrap();
        assert!(matches!(load_dir(dir.path()), Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_scaffold_creates_pair() {
        let dir = tempfile::tempdir().unwrap();
        let (up, down) = scaffold(dir.path().join("migrations"), "Add Users").unwrap();
        assert!(up.to_string_lossy().ends_with("__add_users.up.sql"));
        assert!(down.exists());

        let set = load_dir(dir.path().join("migrations")).unwrap();
        assert_eq!(set.len(), 1);
    }
}
