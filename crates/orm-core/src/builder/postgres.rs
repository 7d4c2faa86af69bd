//! The PostgreSQL SQL emitter: walks a [`BuilderClause`] tree and renders
//! it to a query string. Grounded on the original implementation's
//! `TPostgresQueryBuilder`.

use std::sync::Arc;

use crate::error::{OrmError, OrmResult};
use crate::ir::ColumnKind;
use crate::organizer::{
    AlterColumnChange, AlterOperation, BuilderAlterTable, BuilderClause, BuilderDelete, BuilderInsert, BuilderSelect,
    BuilderUpdate, KeyKind,
};
use crate::path::Path;
use crate::registry::{SchemaRegistry, TableInfo};
use crate::types::format_float;

use super::ident;

/// The kind of the enclosing clause, tracked one level deep so a nested
/// `SELECT` knows whether it needs wrapping parentheses. Mirrors the
/// original's parenthesization stack without the RAII guard, which
/// doesn't translate to Rust's borrow checker: push/pop happens around a
/// closure instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseKind {
    Expression,
    Select,
    Insert,
    Update,
    Delete,
}

/// Renders a resolved clause tree to PostgreSQL text. Holds a registry
/// reference because `CREATE TABLE`/`ALTER TABLE` column definitions need
/// the full field descriptor (type, default, required), not just the
/// path the organizer already resolved.
pub struct PostgresBuilder<'a> {
    registry: &'a SchemaRegistry,
    stack: Vec<ClauseKind>,
}

impl<'a> PostgresBuilder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            stack: Vec::new(),
        }
    }

    /// Render one top-level clause to a SQL statement.
    pub fn build(&mut self, clause: &BuilderClause) -> OrmResult<String> {
        self.build_clause(clause)
    }

    fn with_stack<T>(&mut self, kind: ClauseKind, f: impl FnOnce(&mut Self) -> OrmResult<T>) -> OrmResult<T> {
        self.stack.push(kind);
        let result = f(self);
        self.stack.pop();
        result
    }

    /// Render an operand nested inside an expression, function call, or
    /// statement clause — always under an `Expression` stack frame, so a
    /// selector subquery or `IN (SELECT ...)` picks up its parens.
    fn operand(&mut self, clause: &BuilderClause) -> OrmResult<String> {
        self.with_stack(ClauseKind::Expression, |b| b.build_clause(clause))
    }

    fn operand_list(&mut self, clauses: &[BuilderClause]) -> OrmResult<String> {
        let mut parts = Vec::with_capacity(clauses.len());
        for c in clauses {
            parts.push(self.operand(c)?);
        }
        Ok(parts.join(", "))
    }

    fn build_clause(&mut self, clause: &BuilderClause) -> OrmResult<String> {
        match clause {
            BuilderClause::String(s) => Ok(ident::escape_string_literal(s)),
            BuilderClause::Int(i) => Ok(i.to_string()),
            BuilderClause::Float(f) => Ok(format_float(*f)),
            BuilderClause::Bool(b) => Ok(if *b { "TRUE".to_string() } else { "FALSE".to_string() }),
            BuilderClause::All => Ok("*".to_string()),
            BuilderClause::Default => Ok("DEFAULT".to_string()),
            BuilderClause::Column {
                table,
                field,
                key_kind,
                column_kind,
            } => Ok(self.build_column(table, field, *key_kind, *column_kind)),
            BuilderClause::Expression { op, operands } => self.build_expression(*op, operands),
            BuilderClause::Table(path) => Ok(ident::table_to_string(path)),
            BuilderClause::Select(select) => self.build_select(select),
            BuilderClause::Insert(insert) => self.build_insert(insert),
            BuilderClause::Update(update) => self.build_update(update),
            BuilderClause::Delete(delete) => self.build_delete(delete),
            BuilderClause::Truncate { table } => Ok(format!("TRUNCATE TABLE {}", ident::table_to_string(table))),
            BuilderClause::CreateTable(table) => self.build_create_table(table),
            BuilderClause::DropTable(table) => Ok(format!("DROP TABLE {}", ident::table_to_string(&table.path))),
            BuilderClause::AlterTable(alter) => Ok(self.build_alter_table(alter)),
            BuilderClause::StartTransaction { read_only } => Ok(if *read_only {
                "BEGIN READ ONLY".to_string()
            } else {
                "BEGIN".to_string()
            }),
            BuilderClause::CommitTransaction => Ok("COMMIT".to_string()),
            BuilderClause::RollbackTransaction => Ok("ROLLBACK".to_string()),
        }
    }

    fn build_column(&self, table: &Path, field: &Path, key_kind: KeyKind, column_kind: ColumnKind) -> String {
        let field_ident = ident::field_to_string(field, key_kind);
        match column_kind {
            ColumnKind::Excluded => format!("EXCLUDED.{field_ident}"),
            ColumnKind::Singular => {
                if table.is_empty() {
                    field_ident
                } else {
                    format!("{}.{field_ident}", ident::table_to_string(table))
                }
            }
        }
    }

    /// An `ON CONFLICT (...)` target column: bare field identifier, never
    /// table-prefixed, regardless of the column's own `column_kind`.
    fn build_conflict_target_column(&self, clause: &BuilderClause) -> OrmResult<String> {
        match clause {
            BuilderClause::Column { field, key_kind, .. } => Ok(ident::field_to_string(field, *key_kind)),
            other => Err(OrmError::malformed(format!(
                "conflict target must be a column, got {other:?}"
            ))),
        }
    }

    /// Every binary arithmetic/comparison/logical/pattern-match operator
    /// parenthesizes its whole output (spec.md §4.6's operator table).
    fn infix(&mut self, operands: &[BuilderClause], op: &str) -> OrmResult<String> {
        Ok(format!("({} {op} {})", self.operand(&operands[0])?, self.operand(&operands[1])?))
    }

    fn build_expression(&mut self, op: crate::ir::ExprOp, operands: &[BuilderClause]) -> OrmResult<String> {
        use crate::ir::ExprOp::*;

        let arity = op.arity();
        if !arity.contains(operands.len()) {
            return Err(OrmError::invalid_arity(op.name(), arity.describe(), operands.len()));
        }

        let sql = match op {
            Add => self.infix(operands, "+")?,
            Subtract => self.infix(operands, "-")?,
            Multiply => self.infix(operands, "*")?,
            Divide => self.infix(operands, "/")?,
            Modulo => self.infix(operands, "%")?,
            Exponent => format!("POWER({}, {})", self.operand(&operands[0])?, self.operand(&operands[1])?),
            Equals => self.infix(operands, "=")?,
            NotEquals => self.infix(operands, "<>")?,
            LessThan => self.infix(operands, "<")?,
            GreaterThan => self.infix(operands, ">")?,
            LessThanOrEquals => self.infix(operands, "<=")?,
            GreaterThanOrEquals => self.infix(operands, ">=")?,
            And => self.infix(operands, "AND")?,
            Or => self.infix(operands, "OR")?,
            Not => format!("NOT {}", self.operand(&operands[0])?),
            Like => self.infix(operands, "LIKE")?,
            Ilike => self.infix(operands, "ILIKE")?,
            SimilarTo => self.infix(operands, "SIMILAR TO")?,
            RegexpMatch => self.infix(operands, "~")?,
            IsNull => format!("{} IS NULL", self.operand(&operands[0])?),
            IsNotNull => format!("{} IS NOT NULL", self.operand(&operands[0])?),
            Between => format!(
                "({} BETWEEN {} AND {})",
                self.operand(&operands[0])?,
                self.operand(&operands[1])?,
                self.operand(&operands[2])?
            ),
            In => {
                let head = self.operand(&operands[0])?;
                let rest = self.operand_list(&operands[1..])?;
                format!("{head} IN ({rest})")
            }
            // The operand is always a `Select`, which parenthesizes
            // itself here (its immediate enclosing frame is `Expression`)
            // — an explicit wrap here would double up the parens.
            Exists => format!("EXISTS {}", self.operand(&operands[0])?),
            Count => format!("COUNT({})", self.operand(&operands[0])?),
            Sum => format!("SUM({})", self.operand(&operands[0])?),
            Avg => format!("AVG({})", self.operand(&operands[0])?),
            Min => format!("MIN({})", self.operand(&operands[0])?),
            Max => format!("MAX({})", self.operand(&operands[0])?),
            Abs => format!("ABS({})", self.operand(&operands[0])?),
            Round => {
                if operands.len() == 2 {
                    format!("ROUND({}, {})", self.operand(&operands[0])?, self.operand(&operands[1])?)
                } else {
                    format!("ROUND({})", self.operand(&operands[0])?)
                }
            }
            Ceil => format!("CEIL({})", self.operand(&operands[0])?),
            Floor => format!("FLOOR({})", self.operand(&operands[0])?),
            Sqrt => format!("SQRT({})", self.operand(&operands[0])?),
            Log => {
                if operands.len() == 2 {
                    format!("LOG({}, {})", self.operand(&operands[0])?, self.operand(&operands[1])?)
                } else {
                    format!("LOG({})", self.operand(&operands[0])?)
                }
            }
            Random => "RANDOM()".to_string(),
            Sin => format!("SIN({})", self.operand(&operands[0])?),
            Cos => format!("COS({})", self.operand(&operands[0])?),
            Tan => format!("TAN({})", self.operand(&operands[0])?),
            Concat => {
                let mut parts = Vec::with_capacity(operands.len());
                for o in operands {
                    parts.push(self.operand(o)?);
                }
                parts.join(" || ")
            }
            Substring => {
                if operands.len() == 3 {
                    format!(
                        "SUBSTRING({} FROM {} FOR {})",
                        self.operand(&operands[0])?,
                        self.operand(&operands[1])?,
                        self.operand(&operands[2])?
                    )
                } else {
                    format!("SUBSTRING({} FROM {})", self.operand(&operands[0])?, self.operand(&operands[1])?)
                }
            }
            Lower => format!("LOWER({})", self.operand(&operands[0])?),
            Upper => format!("UPPER({})", self.operand(&operands[0])?),
            Length => format!("LENGTH({})", self.operand(&operands[0])?),
            Replace => format!(
                "REPLACE({}, {}, {})",
                self.operand(&operands[0])?,
                self.operand(&operands[1])?,
                self.operand(&operands[2])?
            ),
            Trim => format!("TRIM({})", self.operand(&operands[0])?),
            Left => format!("LEFT({}, {})", self.operand(&operands[0])?, self.operand(&operands[1])?),
            Right => format!("RIGHT({}, {})", self.operand(&operands[0])?, self.operand(&operands[1])?),
            Position => format!("POSITION({} IN {})", self.operand(&operands[0])?, self.operand(&operands[1])?),
            SplitPart => format!(
                "SPLIT_PART({}, {}, {})",
                self.operand(&operands[0])?,
                self.operand(&operands[1])?,
                self.operand(&operands[2])?
            ),
            Case => self.build_case(operands)?,
            Coalesce => format!("COALESCE({})", self.operand_list(operands)?),
            Greatest => format!("GREATEST({})", self.operand_list(operands)?),
            Least => format!("LEAST({})", self.operand_list(operands)?),
        };
        Ok(sql)
    }

    /// `operands[0]` is always present: the scrutinee for a simple `CASE`,
    /// or [`BuilderClause::Default`] as the no-scrutinee sentinel for a
    /// searched `CASE`. What follows flattens `(condition, result)` pairs,
    /// with one trailing value — inferred from the remaining count's
    /// parity — as the `ELSE`.
    fn build_case(&mut self, operands: &[BuilderClause]) -> OrmResult<String> {
        let scrutinee = &operands[0];
        let rest = &operands[1..];
        let has_else = rest.len() % 2 == 1;
        let pair_count = if has_else { rest.len() - 1 } else { rest.len() };

        let mut sql = String::from("CASE");
        if !matches!(scrutinee, BuilderClause::Default) {
            sql.push(' ');
            sql.push_str(&self.operand(scrutinee)?);
        }

        let mut i = 0;
        while i < pair_count {
            let condition = self.operand(&rest[i])?;
            let result = self.operand(&rest[i + 1])?;
            sql.push_str(&format!(" WHEN {condition} THEN {result}"));
            i += 2;
        }
        if has_else {
            let else_value = self.operand(&rest[rest.len() - 1])?;
            sql.push_str(&format!(" ELSE {else_value}"));
        }
        sql.push_str(" END");
        Ok(sql)
    }

    fn build_select(&mut self, select: &BuilderSelect) -> OrmResult<String> {
        let needs_parens = matches!(
            self.stack.last(),
            Some(ClauseKind::Expression | ClauseKind::Select | ClauseKind::Update | ClauseKind::Insert | ClauseKind::Delete)
        );
        let sql = self.with_stack(ClauseKind::Select, |b| b.build_select_body(select))?;
        Ok(if needs_parens { format!("({sql})") } else { sql })
    }

    fn build_select_body(&mut self, select: &BuilderSelect) -> OrmResult<String> {
        let selectors = if select.selectors.is_empty() {
            "*".to_string()
        } else {
            self.operand_list(&select.selectors)?
        };
        let mut sql = format!("SELECT {selectors} FROM {}", ident::table_to_string(&select.from));
        if let Some(w) = &select.where_clause {
            sql.push_str(&format!(" WHERE {}", self.operand(w)?));
        }
        if let Some(g) = &select.group_by {
            sql.push_str(&format!(" GROUP BY {}", self.operand(g)?));
        }
        if let Some(h) = &select.having {
            sql.push_str(&format!(" HAVING {}", self.operand(h)?));
        }
        if let Some(o) = &select.order_by {
            sql.push_str(&format!(" ORDER BY {}", self.operand(o)?));
        }
        if let Some(l) = &select.limit {
            sql.push_str(&format!(" LIMIT {}", self.operand(l)?));
        }
        Ok(sql)
    }

    fn build_insert(&mut self, insert: &BuilderInsert) -> OrmResult<String> {
        self.with_stack(ClauseKind::Insert, |b| b.build_insert_body(insert))
    }

    fn build_insert_body(&mut self, insert: &BuilderInsert) -> OrmResult<String> {
        let table_ident = ident::table_to_string(&insert.table);
        if insert.columns.is_empty() {
            return Ok(format!("INSERT INTO {table_ident} DEFAULT VALUES"));
        }

        let columns_sql = self.operand_list(&insert.columns)?;
        let mut rows_sql = Vec::with_capacity(insert.values.len());
        for row in &insert.values {
            rows_sql.push(format!("({})", self.operand_list(row)?));
        }

        let mut sql = format!("INSERT INTO {table_ident} ({columns_sql}) VALUES {}", rows_sql.join(", "));

        if let Some(pairs) = &insert.do_update {
            let mut target_parts = Vec::new();
            if let Some(target) = &insert.conflict_target {
                for column in target {
                    target_parts.push(self.build_conflict_target_column(column)?);
                }
            }
            let mut set_parts = Vec::with_capacity(pairs.len());
            for (column, value) in pairs {
                set_parts.push(format!("{} = {}", self.operand(column)?, self.operand(value)?));
            }
            sql.push_str(&format!(
                " ON CONFLICT ({}) DO UPDATE SET {}",
                target_parts.join(", "),
                set_parts.join(", ")
            ));
        }

        Ok(sql)
    }

    fn build_update(&mut self, update: &BuilderUpdate) -> OrmResult<String> {
        self.with_stack(ClauseKind::Update, |b| b.build_update_body(update))
    }

    fn build_update_body(&mut self, update: &BuilderUpdate) -> OrmResult<String> {
        let table_ident = ident::table_to_string(&update.table);
        let mut sets = Vec::with_capacity(update.assignments.len());
        for (column, value) in &update.assignments {
            sets.push(format!("{} = {}", self.operand(column)?, self.operand(value)?));
        }
        Ok(format!("UPDATE {table_ident} SET {}", sets.join(", ")))
    }

    fn build_delete(&mut self, delete: &BuilderDelete) -> OrmResult<String> {
        self.with_stack(ClauseKind::Delete, |b| b.build_delete_body(delete))
    }

    fn build_delete_body(&mut self, delete: &BuilderDelete) -> OrmResult<String> {
        let table_ident = ident::table_to_string(&delete.table);
        let mut sql = format!("DELETE FROM {table_ident}");
        if let Some(w) = &delete.where_clause {
            sql.push_str(&format!(" WHERE {}", self.operand(w)?));
        }
        Ok(sql)
    }

    fn build_create_table(&self, table: &Arc<TableInfo>) -> OrmResult<String> {
        let table_ident = ident::table_to_string(&table.path);
        let mut columns = Vec::with_capacity(table.related_fields.len());
        for field_path in &table.related_fields {
            let field = self
                .registry
                .get_primitive_field(field_path)
                .ok_or_else(|| OrmError::unknown_path(field_path))?;
            // Field identifiers in a `CREATE TABLE` always use the simple
            // prefix, even for the primary-key column itself — `p_` is
            // reserved for referencing a primary key from outside its
            // own table's DDL (e.g. an `ON CONFLICT` target). The ident is
            // built from the field's path *relative to its table*, not its
            // full registry path, matching every other column reference.
            let (_, suffix) = field_path.split_at_table(table.path.size());
            let ident_name = ident::field_to_string(&suffix, KeyKind::Simple);
            let mut def = format!("{ident_name} {}", field.sql_type());
            if field.is_required {
                def.push_str(" NOT NULL");
            }
            if let Some(literal) = field.default_literal() {
                def.push_str(&format!(" DEFAULT {literal}"));
            }
            if field.is_primary_key {
                def.push_str(" PRIMARY KEY");
            }
            columns.push(def);
        }
        Ok(format!("CREATE TABLE {table_ident} ({})", columns.join(", ")))
    }

    fn build_alter_table(&self, alter: &BuilderAlterTable) -> String {
        let table_ident = ident::table_to_string(&alter.table);
        let mut statements = Vec::with_capacity(alter.operations.len());
        for operation in &alter.operations {
            let statement = match operation {
                AlterOperation::AddColumn {
                    field,
                    sql_type,
                    required,
                    default_literal,
                    primary_key,
                } => {
                    let ident_name = ident::field_to_string(field, KeyKind::Simple);
                    let mut def = format!("ADD COLUMN {ident_name} {sql_type}");
                    if *required {
                        def.push_str(" NOT NULL");
                    }
                    if let Some(literal) = default_literal {
                        def.push_str(&format!(" DEFAULT {literal}"));
                    }
                    if *primary_key {
                        def.push_str(" PRIMARY KEY");
                    }
                    format!("ALTER TABLE {table_ident} {def}")
                }
                AlterOperation::DropColumn { field } => {
                    let ident_name = ident::field_to_string(field, KeyKind::Simple);
                    format!("ALTER TABLE {table_ident} DROP COLUMN {ident_name}")
                }
                AlterOperation::AlterColumn { field, change } => {
                    let ident_name = ident::field_to_string(field, KeyKind::Simple);
                    let change_sql = match change {
                        AlterColumnChange::SetType(sql_type) => format!("ALTER COLUMN {ident_name} TYPE {sql_type}"),
                        AlterColumnChange::SetDefault(literal) => {
                            format!("ALTER COLUMN {ident_name} SET DEFAULT {literal}")
                        }
                        // The original implementation's `kDropDefault` branch
                        // duplicates `kDropRequired`'s "DROP NOT NULL" output;
                        // corrected here to the statement its name promises.
                        AlterColumnChange::DropDefault => format!("ALTER COLUMN {ident_name} DROP DEFAULT"),
                        AlterColumnChange::SetRequired => format!("ALTER COLUMN {ident_name} SET NOT NULL"),
                        AlterColumnChange::DropRequired => format!("ALTER COLUMN {ident_name} DROP NOT NULL"),
                    };
                    format!("ALTER TABLE {table_ident} {change_sql}")
                }
            };
            statements.push(statement);
        }
        statements.join("; ")
    }
}

/// Joins a batch of rendered statements the way the original's
/// `JoinQueries` does: `"; "` strictly between non-empty entries, never
/// trailing.
pub fn join_queries(queries: &[String]) -> String {
    queries
        .iter()
        .filter(|q| !q.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("; ")
}
