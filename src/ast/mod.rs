pub mod columns;
pub mod conditions;
pub mod context;
pub mod expressions;
pub mod upsert;
pub mod values;

pub use self::columns::{
    ColumnDef, ColumnType, ConstraintDef, ConstraintKind, DbType, ForeignKeyDef, ForeignKeyRule,
    IndexColumn, IndexDef, SequenceDef, SortDirection,
};
pub use self::conditions::SchemaCondition;
pub use self::context::MigrationContext;
pub use self::expressions::{
    AlterColumn, AlterDefaultValue, AlterTable, ConditionalExpression, CreateColumn, CreateSchema,
    CreateTable, DeleteColumn, DeleteConstraint, DeleteData, DeleteDefaultConstraint,
    DeleteForeignKey, DeleteIndex, DeleteSchema, DeleteSequence, DeleteTable, ExecuteSql,
    Expression, InsertData, RenameColumn, RenameTable, RowFilter, UpdateData,
};
pub use self::upsert::{UpdateAssignments, UpdateSpec, UpsertData};
pub use self::values::{DataRow, SystemMethod, Value};
