//! The user-facing query intermediate representation: a polymorphic
//! algebra of clauses that compose into arbitrary trees, round-trip to a
//! flat wire encoding (`codec`), and carry enough semantics for the
//! organizer to translate them into builder IR.

pub mod codec;
pub mod op;

use crate::attribute::Attribute;
use crate::path::Path;

pub use op::ExprOp;

/// `Column`'s reference kind: a plain reference, or a reference into the
/// `EXCLUDED` pseudo-row of an `ON CONFLICT` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Singular,
    Excluded,
}

/// One node of the query IR.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    String(String),
    Int(i32),
    Float(f64),
    Bool(bool),
    All,
    Default,
    Column { path: Path, kind: ColumnKind },
    Expression { op: ExprOp, operands: Vec<Clause> },
    Select(Box<SelectClause>),
    Insert(Box<InsertClause>),
    Update(Box<UpdateClause>),
    Delete(Box<DeleteClause>),
    Truncate { table_num: u32 },
    StartTransaction { read_only: bool },
    CommitTransaction,
    RollbackTransaction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectClause {
    pub table_num: u32,
    pub selectors: Vec<Clause>,
    pub where_clause: Option<Clause>,
    pub group_by: Option<Clause>,
    pub having: Option<Clause>,
    pub order_by: Option<Clause>,
    pub limit: Option<Clause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertClause {
    pub table_num: u32,
    pub subrequests: Vec<Vec<Attribute>>,
    pub update_if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateClause {
    pub table_num: u32,
    pub updates: Vec<Vec<Attribute>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteClause {
    pub table_num: u32,
    pub where_clause: Option<Clause>,
}

/// An ordered list of top-level clauses — the unit the wire codec and a
/// caller's transport layer exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub clauses: Vec<Clause>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clause(&mut self, clause: Clause) -> &mut Self {
        self.clauses.push(clause);
        self
    }
}

// ---------------------------------------------------------------------
// Literal / reference constructors
// ---------------------------------------------------------------------

/// Lift a native value or an existing clause into a `Clause`.
pub trait IntoClause {
    fn into_clause(self) -> Clause;
}

impl IntoClause for Clause {
    fn into_clause(self) -> Clause {
        self
    }
}

impl IntoClause for &Clause {
    fn into_clause(self) -> Clause {
        self.clone()
    }
}

impl IntoClause for i32 {
    fn into_clause(self) -> Clause {
        Clause::Int(self)
    }
}

impl IntoClause for f64 {
    fn into_clause(self) -> Clause {
        Clause::Float(self)
    }
}

impl IntoClause for bool {
    fn into_clause(self) -> Clause {
        Clause::Bool(self)
    }
}

impl IntoClause for &str {
    fn into_clause(self) -> Clause {
        Clause::String(self.to_string())
    }
}

impl IntoClause for String {
    fn into_clause(self) -> Clause {
        Clause::String(self)
    }
}

impl IntoClause for Path {
    fn into_clause(self) -> Clause {
        Clause::Column {
            path: self,
            kind: ColumnKind::Singular,
        }
    }
}

/// `Val(x)`: lift a native value to the matching literal clause.
pub fn val(value: impl IntoClause) -> Clause {
    value.into_clause()
}

/// `Col(path)`: a plain column reference.
pub fn col(path: Path) -> Clause {
    Clause::Column {
        path,
        kind: ColumnKind::Singular,
    }
}

/// `Excluded(path)`: a reference into the `EXCLUDED` pseudo-row of an
/// `ON CONFLICT` clause.
pub fn excluded(path: Path) -> Clause {
    Clause::Column {
        path,
        kind: ColumnKind::Excluded,
    }
}

pub fn all() -> Clause {
    Clause::All
}

pub fn default_value() -> Clause {
    Clause::Default
}

impl Clause {
    pub fn expr(op: ExprOp, operands: Vec<Clause>) -> Clause {
        Clause::Expression { op, operands }
    }

    /// `path.get_table_path()`/`get_field()`'s counterpart: true when this
    /// clause is a `Column` reference (used by the organizer to detect
    /// message-valued selectors to expand).
    pub fn as_column(&self) -> Option<(&Path, ColumnKind)> {
        match self {
            Clause::Column { path, kind } => Some((path, *kind)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------
// Operator-overload DSL
// ---------------------------------------------------------------------

macro_rules! binary_op {
    ($trait_:ident, $method:ident, $op:expr) => {
        impl std::ops::$trait_<Clause> for Clause {
            type Output = Clause;
            fn $method(self, rhs: Clause) -> Clause {
                Clause::expr($op, vec![self, rhs])
            }
        }
    };
}

binary_op!(Add, add, ExprOp::Add);
binary_op!(Sub, sub, ExprOp::Subtract);
binary_op!(Mul, mul, ExprOp::Multiply);
binary_op!(Div, div, ExprOp::Divide);
binary_op!(Rem, rem, ExprOp::Modulo);
binary_op!(BitAnd, bitand, ExprOp::And);
binary_op!(BitOr, bitor, ExprOp::Or);

impl std::ops::Not for Clause {
    type Output = Clause;
    fn not(self) -> Clause {
        Clause::expr(ExprOp::Not, vec![self])
    }
}

/// `a == b`, `a != b`, … build `Expression` clauses rather than `bool`,
/// so these are plain methods (Rust's `PartialEq`/`PartialOrd` must
/// return `bool`).
impl Clause {
    pub fn eq_(self, rhs: Clause) -> Clause {
        Clause::expr(ExprOp::Equals, vec![self, rhs])
    }
    pub fn ne_(self, rhs: Clause) -> Clause {
        Clause::expr(ExprOp::NotEquals, vec![self, rhs])
    }
    pub fn lt_(self, rhs: Clause) -> Clause {
        Clause::expr(ExprOp::LessThan, vec![self, rhs])
    }
    pub fn le_(self, rhs: Clause) -> Clause {
        Clause::expr(ExprOp::LessThanOrEquals, vec![self, rhs])
    }
    pub fn gt_(self, rhs: Clause) -> Clause {
        Clause::expr(ExprOp::GreaterThan, vec![self, rhs])
    }
    pub fn ge_(self, rhs: Clause) -> Clause {
        Clause::expr(ExprOp::GreaterThanOrEquals, vec![self, rhs])
    }
    pub fn is_null(self) -> Clause {
        Clause::expr(ExprOp::IsNull, vec![self])
    }
    pub fn is_not_null(self) -> Clause {
        Clause::expr(ExprOp::IsNotNull, vec![self])
    }
    pub fn between(self, from: Clause, to: Clause) -> Clause {
        Clause::expr(ExprOp::Between, vec![self, from, to])
    }
    pub fn like(self, pattern: Clause) -> Clause {
        Clause::expr(ExprOp::Like, vec![self, pattern])
    }
    pub fn ilike(self, pattern: Clause) -> Clause {
        Clause::expr(ExprOp::Ilike, vec![self, pattern])
    }
    pub fn similar_to(self, pattern: Clause) -> Clause {
        Clause::expr(ExprOp::SimilarTo, vec![self, pattern])
    }
    pub fn regexp_match(self, pattern: Clause) -> Clause {
        Clause::expr(ExprOp::RegexpMatch, vec![self, pattern])
    }
}

// Free functions mirroring the DSL's free functions (`In`, `Exists`,
// `Max`, …). Each has the same signature whether its arguments are
// literals or expressions, since every argument is `impl IntoClause`.

pub fn in_(lhs: impl IntoClause, values: impl IntoIterator<Item = Clause>) -> Clause {
    let mut operands = vec![lhs.into_clause()];
    operands.extend(values);
    Clause::expr(ExprOp::In, operands)
}

pub fn exists(subquery: Clause) -> Clause {
    Clause::expr(ExprOp::Exists, vec![subquery])
}

macro_rules! unary_fn {
    ($name:ident, $op:expr) => {
        pub fn $name(a: impl IntoClause) -> Clause {
            Clause::expr($op, vec![a.into_clause()])
        }
    };
}

unary_fn!(max, ExprOp::Max);
unary_fn!(min, ExprOp::Min);
unary_fn!(sum, ExprOp::Sum);
unary_fn!(avg, ExprOp::Avg);
unary_fn!(count, ExprOp::Count);
unary_fn!(abs, ExprOp::Abs);
unary_fn!(ceil, ExprOp::Ceil);
unary_fn!(floor, ExprOp::Floor);
unary_fn!(sqrt, ExprOp::Sqrt);
unary_fn!(sin, ExprOp::Sin);
unary_fn!(cos, ExprOp::Cos);
unary_fn!(tan, ExprOp::Tan);
unary_fn!(lower, ExprOp::Lower);
unary_fn!(upper, ExprOp::Upper);
unary_fn!(len, ExprOp::Length);
unary_fn!(trim, ExprOp::Trim);

pub fn round(a: impl IntoClause) -> Clause {
    Clause::expr(ExprOp::Round, vec![a.into_clause()])
}

pub fn round_scale(a: impl IntoClause, scale: impl IntoClause) -> Clause {
    Clause::expr(ExprOp::Round, vec![a.into_clause(), scale.into_clause()])
}

pub fn log(a: impl IntoClause) -> Clause {
    Clause::expr(ExprOp::Log, vec![a.into_clause()])
}

pub fn log_base(base: impl IntoClause, x: impl IntoClause) -> Clause {
    Clause::expr(ExprOp::Log, vec![base.into_clause(), x.into_clause()])
}

pub fn rand() -> Clause {
    Clause::expr(ExprOp::Random, vec![])
}

pub fn pow(a: impl IntoClause, b: impl IntoClause) -> Clause {
    Clause::expr(ExprOp::Exponent, vec![a.into_clause(), b.into_clause()])
}

pub fn substr(a: impl IntoClause, from: impl IntoClause) -> Clause {
    Clause::expr(ExprOp::Substring, vec![a.into_clause(), from.into_clause()])
}

pub fn substr3(a: impl IntoClause, from: impl IntoClause, len: impl IntoClause) -> Clause {
    Clause::expr(
        ExprOp::Substring,
        vec![a.into_clause(), from.into_clause(), len.into_clause()],
    )
}

pub fn replace(a: impl IntoClause, from: impl IntoClause, to: impl IntoClause) -> Clause {
    Clause::expr(
        ExprOp::Replace,
        vec![a.into_clause(), from.into_clause(), to.into_clause()],
    )
}

pub fn left(a: impl IntoClause, n: impl IntoClause) -> Clause {
    Clause::expr(ExprOp::Left, vec![a.into_clause(), n.into_clause()])
}

pub fn right(a: impl IntoClause, n: impl IntoClause) -> Clause {
    Clause::expr(ExprOp::Right, vec![a.into_clause(), n.into_clause()])
}

pub fn pos(needle: impl IntoClause, haystack: impl IntoClause) -> Clause {
    Clause::expr(ExprOp::Position, vec![needle.into_clause(), haystack.into_clause()])
}

pub fn split_part(a: impl IntoClause, delim: impl IntoClause, n: impl IntoClause) -> Clause {
    Clause::expr(
        ExprOp::SplitPart,
        vec![a.into_clause(), delim.into_clause(), n.into_clause()],
    )
}

pub fn concat(parts: impl IntoIterator<Item = Clause>) -> Clause {
    Clause::expr(ExprOp::Concat, parts.into_iter().collect())
}

pub fn coalesce(values: impl IntoIterator<Item = Clause>) -> Clause {
    Clause::expr(ExprOp::Coalesce, values.into_iter().collect())
}

pub fn greatest(values: impl IntoIterator<Item = Clause>) -> Clause {
    Clause::expr(ExprOp::Greatest, values.into_iter().collect())
}

pub fn least(values: impl IntoIterator<Item = Clause>) -> Clause {
    Clause::expr(ExprOp::Least, values.into_iter().collect())
}

/// `Case().When(c).Then(r)...Else(x)`.
///
/// Resolves the operator table's structural ambiguity (spec.md §4.6's
/// `case_` row) by always carrying an explicit scrutinee slot: for a
/// searched `CASE` (no scrutinee) that slot is `Clause::Default`, which
/// the builder recognizes and omits. The remaining operands are
/// `WHEN`/`THEN` pairs plus an optional trailing `ELSE` value, whose
/// presence the builder infers from the parity of the operand count
/// after the scrutinee slot.
#[derive(Debug, Clone, Default)]
pub struct Case {
    scrutinee: Option<Clause>,
    arms: Vec<(Clause, Clause)>,
    else_value: Option<Clause>,
    pending_when: Option<Clause>,
}

impl Case {
    pub fn new() -> Self {
        Self::default()
    }

    /// A "simple" `CASE scrutinee WHEN value THEN result …` form.
    pub fn of(scrutinee: Clause) -> Self {
        Self {
            scrutinee: Some(scrutinee),
            ..Self::default()
        }
    }

    pub fn when(mut self, condition: Clause) -> Self {
        self.pending_when = Some(condition);
        self
    }

    pub fn then(mut self, result: Clause) -> Self {
        let condition = self
            .pending_when
            .take()
            .expect("Case::then must follow Case::when");
        self.arms.push((condition, result));
        self
    }

    pub fn otherwise(mut self, value: Clause) -> Self {
        self.else_value = Some(value);
        self
    }

    pub fn build(self) -> Clause {
        assert!(!self.arms.is_empty(), "Case requires at least one when/then arm");
        let mut operands = vec![self.scrutinee.unwrap_or(Clause::Default)];
        for (condition, result) in self.arms {
            operands.push(condition);
            operands.push(result);
        }
        if let Some(else_value) = self.else_value {
            operands.push(else_value);
        }
        Clause::expr(ExprOp::Case, operands)
    }
}

// ---------------------------------------------------------------------
// Select / Insert / Update / Delete / Truncate / transaction builders
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Select(SelectClause);

impl Select {
    pub fn new(table_num: u32) -> Self {
        Self(SelectClause {
            table_num,
            selectors: Vec::new(),
            where_clause: None,
            group_by: None,
            having: None,
            order_by: None,
            limit: None,
        })
    }

    pub fn selectors(mut self, selectors: impl IntoIterator<Item = Clause>) -> Self {
        self.0.selectors.extend(selectors);
        self
    }

    pub fn where_clause(mut self, condition: Clause) -> Self {
        self.0.where_clause = Some(condition);
        self
    }

    pub fn group_by(mut self, clause: Clause) -> Self {
        self.0.group_by = Some(clause);
        self
    }

    pub fn having(mut self, clause: Clause) -> Self {
        self.0.having = Some(clause);
        self
    }

    pub fn order_by(mut self, clause: Clause) -> Self {
        self.0.order_by = Some(clause);
        self
    }

    pub fn limit(mut self, clause: Clause) -> Self {
        self.0.limit = Some(clause);
        self
    }

    pub fn build(self) -> Clause {
        Clause::Select(Box::new(self.0))
    }
}

/// `Select(table, selectors...)`.
pub fn select(table_num: u32, selectors: impl IntoIterator<Item = Clause>) -> Select {
    Select::new(table_num).selectors(selectors)
}

#[derive(Debug, Clone)]
pub struct Insert(InsertClause);

impl Insert {
    pub fn new(table_num: u32) -> Self {
        Self(InsertClause {
            table_num,
            subrequests: Vec::new(),
            update_if_exists: false,
        })
    }

    pub fn add_subrequest(mut self, attributes: Vec<Attribute>) -> Self {
        self.0.subrequests.push(attributes);
        self
    }

    pub fn update_if_exists(mut self, value: bool) -> Self {
        self.0.update_if_exists = value;
        self
    }

    pub fn build(self) -> Clause {
        Clause::Insert(Box::new(self.0))
    }
}

pub fn insert(table_num: u32) -> Insert {
    Insert::new(table_num)
}

#[derive(Debug, Clone)]
pub struct Update(UpdateClause);

impl Update {
    pub fn new(table_num: u32) -> Self {
        Self(UpdateClause {
            table_num,
            updates: Vec::new(),
        })
    }

    pub fn add_update(mut self, attributes: Vec<Attribute>) -> Self {
        self.0.updates.push(attributes);
        self
    }

    pub fn build(self) -> Clause {
        Clause::Update(Box::new(self.0))
    }
}

pub fn update(table_num: u32) -> Update {
    Update::new(table_num)
}

#[derive(Debug, Clone)]
pub struct Delete(DeleteClause);

impl Delete {
    pub fn new(table_num: u32) -> Self {
        Self(DeleteClause {
            table_num,
            where_clause: None,
        })
    }

    pub fn where_clause(mut self, condition: Clause) -> Self {
        self.0.where_clause = Some(condition);
        self
    }

    pub fn build(self) -> Clause {
        Clause::Delete(Box::new(self.0))
    }
}

pub fn delete(table_num: u32) -> Delete {
    Delete::new(table_num)
}

pub fn truncate(table_num: u32) -> Clause {
    Clause::Truncate { table_num }
}

pub fn start_transaction(read_only: bool) -> Clause {
    Clause::StartTransaction { read_only }
}

pub fn commit_transaction() -> Clause {
    Clause::CommitTransaction
}

pub fn rollback_transaction() -> Clause {
    Clause::RollbackTransaction
}
