//! PostgreSQL generator.

use crate::ast::{ColumnDef, DbType, SystemMethod};
use crate::config::Options;
use crate::error::Result;
use crate::transpiler::{Dialect, GeneratorBase, SqlGenerator, TypeMap};

pub struct PostgresGenerator {
    base: GeneratorBase,
}

impl PostgresGenerator {
    pub fn new(options: &Options) -> Self {
        Self {
            base: GeneratorBase {
                dialect: Dialect::Postgres,
                quoter: Dialect::Postgres.quoter(options.force_quote),
                types: type_map(),
                compatibility: options.compatibility,
            },
        }
    }
}

fn type_map() -> TypeMap {
    TypeMap::new(Dialect::Postgres)
        .set(DbType::AnsiString, "text")
        .set_sized(DbType::AnsiString, "varchar($size)", 10_485_760)
        .set(DbType::AnsiStringFixedLength, "char(255)")
        .set_sized(DbType::AnsiStringFixedLength, "char($size)", 10_485_760)
        .set(DbType::Binary, "bytea")
        .set_sized(DbType::Binary, "bytea", i32::MAX as u32)
        .set(DbType::Boolean, "boolean")
        .set(DbType::Byte, "smallint")
        .set(DbType::Currency, "money")
        .set(DbType::Date, "date")
        .set(DbType::DateTime, "timestamp")
        .set(DbType::DateTime2, "timestamp")
        .set(DbType::DateTimeOffset, "timestamptz")
        .set(DbType::Decimal, "decimal(19,5)")
        .set_sized(DbType::Decimal, "decimal($size,$scale)", 1000)
        .set(DbType::Double, "float8")
        .set(DbType::Guid, "uuid")
        .set(DbType::Int16, "smallint")
        .set(DbType::Int32, "integer")
        .set(DbType::Int64, "bigint")
        .set(DbType::Single, "float4")
        .set(DbType::String, "text")
        .set_sized(DbType::String, "varchar($size)", 10_485_760)
        .set(DbType::StringFixedLength, "char(255)")
        .set_sized(DbType::StringFixedLength, "char($size)", 10_485_760)
        .set(DbType::Time, "time")
        .set(DbType::Xml, "xml")
}

impl SqlGenerator for PostgresGenerator {
    fn base(&self) -> &GeneratorBase {
        &self.base
    }

    fn system_method(&self, method: SystemMethod) -> Result<String> {
        Ok(match method {
            SystemMethod::CurrentDateTime => "now()",
            SystemMethod::CurrentUtcDateTime => "(now() at time zone 'UTC')",
            SystemMethod::NewGuid => "gen_random_uuid()",
            SystemMethod::CurrentUser => "current_user",
        }
        .to_string())
    }

    fn identity_clause(&self, _column: &ColumnDef) -> Result<String> {
        Ok("GENERATED BY DEFAULT AS IDENTITY".to_string())
    }
}
