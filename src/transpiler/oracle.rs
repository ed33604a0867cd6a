//! Oracle generator (12c and later).

use crate::ast::*;
use crate::config::Options;
use crate::error::Result;
use crate::transpiler::traits::{merge_upsert, terminate};
use crate::transpiler::{Dialect, GeneratorBase, SqlGenerator, TypeMap};

pub struct OracleGenerator {
    base: GeneratorBase,
}

impl OracleGenerator {
    pub fn new(options: &Options) -> Self {
        Self {
            base: GeneratorBase {
                dialect: Dialect::Oracle,
                quoter: Dialect::Oracle.quoter(options.force_quote),
                types: type_map(),
                compatibility: options.compatibility,
            },
        }
    }
}

fn type_map() -> TypeMap {
    TypeMap::new(Dialect::Oracle)
        .set(DbType::AnsiString, "VARCHAR2(255 CHAR)")
        .set_sized(DbType::AnsiString, "VARCHAR2($size CHAR)", 4_000)
        .set_sized(DbType::AnsiString, "CLOB", i32::MAX as u32)
        .set(DbType::AnsiStringFixedLength, "CHAR(255 CHAR)")
        .set_sized(DbType::AnsiStringFixedLength, "CHAR($size CHAR)", 2_000)
        .set(DbType::Binary, "RAW(2000)")
        .set_sized(DbType::Binary, "RAW($size)", 2_000)
        .set_sized(DbType::Binary, "BLOB", i32::MAX as u32)
        .set(DbType::Boolean, "NUMBER(1,0)")
        .set(DbType::Byte, "NUMBER(3,0)")
        .set(DbType::Currency, "NUMBER(19,4)")
        .set(DbType::Date, "DATE")
        .set(DbType::DateTime, "TIMESTAMP(4)")
        .set(DbType::DateTime2, "TIMESTAMP(7)")
        .set(DbType::DateTimeOffset, "TIMESTAMP(4) WITH TIME ZONE")
        .set(DbType::Decimal, "NUMBER(19,5)")
        .set_sized(DbType::Decimal, "NUMBER($size,$scale)", 38)
        .set(DbType::Double, "DOUBLE PRECISION")
        .set(DbType::Guid, "RAW(16)")
        .set(DbType::Int16, "NUMBER(5,0)")
        .set(DbType::Int32, "NUMBER(10,0)")
        .set(DbType::Int64, "NUMBER(19,0)")
        .set(DbType::Single, "FLOAT(24)")
        .set(DbType::String, "NVARCHAR2(255)")
        .set_sized(DbType::String, "NVARCHAR2($size)", 2_000)
        .set_sized(DbType::String, "NCLOB", i32::MAX as u32)
        .set(DbType::StringFixedLength, "NCHAR(255)")
        .set_sized(DbType::StringFixedLength, "NCHAR($size)", 2_000)
        .set(DbType::Time, "DATE")
        .set(DbType::Xml, "XMLTYPE")
}

impl SqlGenerator for OracleGenerator {
    fn base(&self) -> &GeneratorBase {
        &self.base
    }

    fn system_method(&self, method: SystemMethod) -> Result<String> {
        Ok(match method {
            SystemMethod::CurrentDateTime => "LOCALTIMESTAMP",
            SystemMethod::CurrentUtcDateTime => "SYS_EXTRACT_UTC(SYSTIMESTAMP)",
            SystemMethod::NewGuid => "SYS_GUID()",
            SystemMethod::CurrentUser => "USER",
        }
        .to_string())
    }

    fn identity_clause(&self, _column: &ColumnDef) -> Result<String> {
        Ok("GENERATED BY DEFAULT ON NULL AS IDENTITY".to_string())
    }

    fn bool_literal(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    fn datetime_literal(&self, value: &chrono::NaiveDateTime) -> String {
        format!(
            "TO_TIMESTAMP('{}', 'YYYY-MM-DD HH24:MI:SS')",
            value.format("%Y-%m-%d %H:%M:%S")
        )
    }

    fn uuid_literal(&self, value: &uuid::Uuid) -> String {
        format!("HEXTORAW('{}')", value.simple().to_string().to_uppercase())
    }

    fn computed_clause(&self, column: &ColumnDef, expression: &str) -> Result<String> {
        Ok(format!(
            "{} GENERATED ALWAYS AS ({}) VIRTUAL",
            self.column_type(column)?,
            expression
        ))
    }

    fn create_schema(&self, _e: &CreateSchema) -> Result<String> {
        self.unsupported("CREATE SCHEMA")
    }

    fn delete_schema(&self, _e: &DeleteSchema) -> Result<String> {
        self.unsupported("DROP SCHEMA")
    }

    fn delete_table(&self, e: &DeleteTable) -> Result<String> {
        if e.if_exists {
            return self.unsupported("DROP TABLE IF EXISTS");
        }
        Ok(terminate(vec![format!(
            "DROP TABLE {}",
            self.table_name(e.schema.as_deref(), &e.table)
        )]))
    }

    fn add_column_keyword(&self) -> &'static str {
        "ADD"
    }

    fn alter_column(&self, e: &AlterColumn) -> Result<String> {
        let mut parts = vec![self.quote(&e.column.name), self.column_type(&e.column)?];
        match &e.column.default {
            Some(default) => parts.push(format!("DEFAULT {}", self.format_value(default)?)),
            None => parts.push("DEFAULT NULL".to_string()),
        }
        if let Some(nullability) = self.nullability(&e.column) {
            parts.push(nullability.to_string());
        }
        Ok(terminate(vec![format!(
            "ALTER TABLE {} MODIFY ({})",
            self.table_name(e.schema.as_deref(), &e.table),
            parts.join(" ")
        )]))
    }

    /// Oracle only knows ON DELETE CASCADE and ON DELETE SET NULL. Other
    /// rules follow the compatibility mode; loose mode leaves the clause out.
    fn foreign_key_rule(&self, clause: &str, rule: ForeignKeyRule) -> Result<String> {
        match (clause, rule) {
            (_, ForeignKeyRule::None) => Ok(String::new()),
            ("ON DELETE", ForeignKeyRule::Cascade) => Ok(" ON DELETE CASCADE".to_string()),
            ("ON DELETE", ForeignKeyRule::SetNull) => Ok(" ON DELETE SET NULL".to_string()),
            (clause, rule) => self.unsupported(&format!("{} {:?}", clause, rule)),
        }
    }

    fn alter_default_value(&self, e: &AlterDefaultValue) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} MODIFY {} DEFAULT {}",
            self.table_name(e.schema.as_deref(), &e.table),
            self.quote(&e.column),
            self.format_value(&e.default)?
        )]))
    }

    fn delete_default_constraint(&self, e: &DeleteDefaultConstraint) -> Result<String> {
        Ok(terminate(vec![format!(
            "ALTER TABLE {} MODIFY {} DEFAULT NULL",
            self.table_name(e.schema.as_deref(), &e.table),
            self.quote(&e.column)
        )]))
    }

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
        match e.cache {
            Some(cache) if cache > 1 => sql.push_str(&format!(" CACHE {}", cache)),
            Some(_) => sql.push_str(" NOCACHE"),
            None => {}
        }
        if e.cycle {
            sql.push_str(" CYCLE");
        }
        Ok(terminate(vec![sql]))
    }

    fn upsert_data(&self, e: &UpsertData) -> Result<String> {
        merge_upsert(self, e, Some("DUAL"), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateError;
    use crate::transpiler::CompatibilityMode;
    use pretty_assertions::assert_eq;

    fn generator() -> OracleGenerator {
        OracleGenerator::new(&Options::default())
    }

    #[test]
    fn test_plain_names_are_bare() {
        let expr = CreateTable::new("Users")
            .column(ColumnDef::new("Id", ColumnType::int32()).primary_key().identity());
        let sql = generator().generate(&expr.into()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE Users (Id NUMBER(10,0) GENERATED BY DEFAULT ON NULL AS IDENTITY NOT NULL, \
             CONSTRAINT PK_Users PRIMARY KEY (Id));"
        );
    }

    #[test]
    fn test_merge_selects_from_dual() {
        let upsert = UpsertData::new("People", &["Email"])
            .unwrap()
            .row(DataRow::new().set("Email", "a@x.com").set("Name", "A"))
            .unwrap();
        let sql = generator().generate(&upsert.into()).unwrap();
        assert_eq!(
            sql,
            "MERGE INTO People target USING (SELECT 'a@x.com' AS Email, 'A' AS Name FROM DUAL) source \
             ON (target.Email = source.Email) WHEN MATCHED THEN UPDATE SET target.Name = source.Name \
             WHEN NOT MATCHED THEN INSERT (Email, Name) VALUES (source.Email, source.Name);"
        );
    }

    #[test]
    fn test_on_update_rule_is_unsupported() {
        let fk = ForeignKeyDef::new("FK_a_b", "a", &["b_id"], "b", &["id"])
            .on_update(ForeignKeyRule::Cascade);
        let err = generator().generate(&fk.into()).unwrap_err();
        assert!(matches!(err, MigrateError::Unsupported { .. }));
    }

    #[test]
    fn test_loose_mode_drops_unsupported_rule() {
        let options = Options { compatibility: CompatibilityMode::Loose, ..Options::default() };
        let fk = ForeignKeyDef::new("FK_a_b", "a", &["b_id"], "b", &["id"])
            .on_delete(ForeignKeyRule::Cascade)
            .on_update(ForeignKeyRule::Cascade);
        let sql = OracleGenerator::new(&options).generate(&fk.into()).unwrap();
        assert!(sql.contains("ON DELETE CASCADE"));
        assert!(!sql.contains("ON UPDATE"));
    }

    #[test]
    fn test_drop_if_exists_is_a_capability_gap() {
        let err = generator()
            .generate(&DeleteTable::new("t").if_exists().into())
            .unwrap_err();
        assert_eq!(err.to_string(), "DROP TABLE IF EXISTS is not supported by Oracle");
    }

    #[test]
    fn test_reserved_word_stays_quoted() {
        let sql = generator().generate(&DeleteTable::new("USER").into()).unwrap();
        assert_eq!(sql, "DROP TABLE \"USER\";");
    }
}
