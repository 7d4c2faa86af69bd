//! The lower-level clause algebra the organizer produces and the SQL
//! builder consumes. Unlike [`crate::ir::Clause`], every path reference
//! here has already been resolved against the schema registry into a
//! `(table, field)` pair, and every selector/value list is already
//! flattened to the shape the builder renders directly.

use std::sync::Arc;

use crate::ir::{ColumnKind, ExprOp};
use crate::path::Path;
use crate::registry::TableInfo;

/// Which kind of key a resolved column plays, driving the builder's
/// identifier prefix (`f_`/`p_`/`i_`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Simple,
    Primary,
    Index,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuilderClause {
    String(String),
    Int(i32),
    Float(f64),
    Bool(bool),
    All,
    Default,
    Column {
        table: Path,
        field: Path,
        key_kind: KeyKind,
        column_kind: ColumnKind,
    },
    Expression {
        op: ExprOp,
        operands: Vec<BuilderClause>,
    },
    Table(Path),
    Select(Box<BuilderSelect>),
    Insert(Box<BuilderInsert>),
    Update(Box<BuilderUpdate>),
    Delete(Box<BuilderDelete>),
    Truncate { table: Path },
    CreateTable(Arc<TableInfo>),
    DropTable(Arc<TableInfo>),
    AlterTable(Box<BuilderAlterTable>),
    StartTransaction { read_only: bool },
    CommitTransaction,
    RollbackTransaction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuilderAlterTable {
    pub table: Path,
    pub operations: Vec<AlterOperation>,
}

/// One column-level change inside an `ALTER TABLE`.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterOperation {
    AddColumn {
        field: Path,
        sql_type: String,
        required: bool,
        default_literal: Option<String>,
        primary_key: bool,
    },
    DropColumn {
        field: Path,
    },
    AlterColumn {
        field: Path,
        change: AlterColumnChange,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterColumnChange {
    SetType(String),
    SetDefault(String),
    DropDefault,
    SetRequired,
    DropRequired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuilderSelect {
    pub selectors: Vec<BuilderClause>,
    pub from: Path,
    pub where_clause: Option<BuilderClause>,
    pub group_by: Option<BuilderClause>,
    pub having: Option<BuilderClause>,
    pub order_by: Option<BuilderClause>,
    pub limit: Option<BuilderClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuilderInsert {
    pub table: Path,
    /// The widened, first-appearance-ordered column list every
    /// `values` row supplies a value for (filling gaps with `Default`).
    pub columns: Vec<BuilderClause>,
    pub values: Vec<Vec<BuilderClause>>,
    /// `Some` for an upsert: `(column, EXCLUDED.column)` pairs for the
    /// `ON CONFLICT ... DO UPDATE SET` clause.
    pub do_update: Option<Vec<(BuilderClause, BuilderClause)>>,
    /// The table's primary-key columns, rendered bare (no `t_` prefix) as
    /// the explicit `ON CONFLICT (...)` target. `Some` iff `do_update` is.
    pub conflict_target: Option<Vec<BuilderClause>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuilderUpdate {
    pub table: Path,
    pub assignments: Vec<(BuilderClause, BuilderClause)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuilderDelete {
    pub table: Path,
    pub where_clause: Option<BuilderClause>,
}

impl BuilderClause {
    pub fn column(table: Path, field: Path, key_kind: KeyKind, column_kind: ColumnKind) -> Self {
        BuilderClause::Column {
            table,
            field,
            key_kind,
            column_kind,
        }
    }
}
