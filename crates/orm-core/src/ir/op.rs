//! The SQL operators and functions an [`crate::ir::Clause::Expression`]
//! may carry, per spec.md §4.6's operator table.

/// Discriminator for `Expression` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Exponent,
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEquals,
    GreaterThanOrEquals,
    And,
    Or,
    Not,
    Like,
    Ilike,
    SimilarTo,
    RegexpMatch,
    IsNull,
    IsNotNull,
    Between,
    In,
    Exists,
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Abs,
    Round,
    Ceil,
    Floor,
    Sqrt,
    Log,
    Random,
    Sin,
    Cos,
    Tan,
    Concat,
    Substring,
    Lower,
    Upper,
    Length,
    Replace,
    Trim,
    Left,
    Right,
    Position,
    SplitPart,
    Case,
    Coalesce,
    Greatest,
    Least,
}

/// The minimum and (when bounded) maximum operand count an operator
/// accepts, used by the builder to raise `InvalidArity` at emission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exact(n: usize) -> Self {
        Arity { min: n, max: Some(n) }
    }

    pub const fn at_least(n: usize) -> Self {
        Arity { min: n, max: None }
    }

    /// `round` and `log` accept either one or two operands; model that as
    /// a range rather than a separate enum variant per arity.
    pub const fn range(min: usize, max: usize) -> Self {
        Arity { min, max: Some(max) }
    }

    pub fn contains(&self, n: usize) -> bool {
        n >= self.min && self.max.map(|max| n <= max).unwrap_or(true)
    }

    pub fn describe(&self) -> String {
        match self.max {
            Some(max) if max == self.min => self.min.to_string(),
            Some(max) => format!("{}..={}", self.min, max),
            None => format!(">={}", self.min),
        }
    }
}

impl ExprOp {
    pub fn arity(&self) -> Arity {
        use ExprOp::*;
        match self {
            Add | Subtract | Multiply | Divide | Modulo | Exponent | Equals | NotEquals | LessThan
            | GreaterThan | LessThanOrEquals | GreaterThanOrEquals | And | Or | Like | Ilike | SimilarTo
            | RegexpMatch | Position => Arity::exact(2),
            Not | IsNull | IsNotNull | Exists | Count | Sum | Avg | Min | Max | Abs | Ceil | Floor | Sqrt
            | Sin | Cos | Tan | Lower | Upper | Length | Trim => Arity::exact(1),
            Round | Log => Arity::range(1, 2),
            Random => Arity::exact(0),
            Between => Arity::exact(3),
            In => Arity::at_least(2),
            Concat => Arity::at_least(2),
            Substring => Arity::range(2, 3),
            Replace | SplitPart => Arity::exact(3),
            Left | Right => Arity::exact(2),
            // A `Case` always carries an explicit scrutinee slot (see
            // `crate::ir::Case`): the slot itself plus at least one
            // `WHEN`/`THEN` pair is the minimum.
            Case => Arity::at_least(3),
            Coalesce | Greatest | Least => Arity::at_least(1),
        }
    }

    pub fn name(&self) -> &'static str {
        use ExprOp::*;
        match self {
            Add => "add",
            Subtract => "subtract",
            Multiply => "multiply",
            Divide => "divide",
            Modulo => "modulo",
            Exponent => "exponent",
            Equals => "equals",
            NotEquals => "not_equals",
            LessThan => "less_than",
            GreaterThan => "greater_than",
            LessThanOrEquals => "less_than_or_equals",
            GreaterThanOrEquals => "greater_than_or_equals",
            And => "and_",
            Or => "or_",
            Not => "not_",
            Like => "like",
            Ilike => "ilike",
            SimilarTo => "similar_to",
            RegexpMatch => "regexp_match",
            IsNull => "is_null",
            IsNotNull => "is_not_null",
            Between => "between",
            In => "in",
            Exists => "exists",
            Count => "count",
            Sum => "sum",
            Avg => "avg",
            Min => "min",
            Max => "max",
            Abs => "abs",
            Round => "round",
            Ceil => "ceil",
            Floor => "floor",
            Sqrt => "sqrt",
            Log => "log",
            Random => "random",
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Concat => "concat",
            Substring => "substring",
            Lower => "lower",
            Upper => "upper",
            Length => "length",
            Replace => "replace",
            Trim => "trim",
            Left => "left",
            Right => "right",
            Position => "position",
            SplitPart => "split_part",
            Case => "case_",
            Coalesce => "coalesce",
            Greatest => "greatest",
            Least => "least",
        }
    }

    /// All variants, used by the wire codec's discriminator table.
    pub const ALL: &'static [ExprOp] = &[
        ExprOp::Add,
        ExprOp::Subtract,
        ExprOp::Multiply,
        ExprOp::Divide,
        ExprOp::Modulo,
        ExprOp::Exponent,
        ExprOp::Equals,
        ExprOp::NotEquals,
        ExprOp::LessThan,
        ExprOp::GreaterThan,
        ExprOp::LessThanOrEquals,
        ExprOp::GreaterThanOrEquals,
        ExprOp::And,
        ExprOp::Or,
        ExprOp::Not,
        ExprOp::Like,
        ExprOp::Ilike,
        ExprOp::SimilarTo,
        ExprOp::RegexpMatch,
        ExprOp::IsNull,
        ExprOp::IsNotNull,
        ExprOp::Between,
        ExprOp::In,
        ExprOp::Exists,
        ExprOp::Count,
        ExprOp::Sum,
        ExprOp::Avg,
        ExprOp::Min,
        ExprOp::Max,
        ExprOp::Abs,
        ExprOp::Round,
        ExprOp::Ceil,
        ExprOp::Floor,
        ExprOp::Sqrt,
        ExprOp::Log,
        ExprOp::Random,
        ExprOp::Sin,
        ExprOp::Cos,
        ExprOp::Tan,
        ExprOp::Concat,
        ExprOp::Substring,
        ExprOp::Lower,
        ExprOp::Upper,
        ExprOp::Length,
        ExprOp::Replace,
        ExprOp::Trim,
        ExprOp::Left,
        ExprOp::Right,
        ExprOp::Position,
        ExprOp::SplitPart,
        ExprOp::Case,
        ExprOp::Coalesce,
        ExprOp::Greatest,
        ExprOp::Least,
    ];

    pub fn from_name(name: &str) -> Option<ExprOp> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_round_trips_through_name() {
        for op in ExprOp::ALL {
            assert_eq!(ExprOp::from_name(op.name()), Some(*op));
        }
    }

    #[test]
    fn binary_arithmetic_is_exactly_two() {
        assert_eq!(ExprOp::Add.arity(), Arity::exact(2));
        assert!(ExprOp::Add.arity().contains(2));
        assert!(!ExprOp::Add.arity().contains(1));
    }

    #[test]
    fn round_and_log_accept_one_or_two() {
        assert!(ExprOp::Round.arity().contains(1));
        assert!(ExprOp::Round.arity().contains(2));
        assert!(!ExprOp::Round.arity().contains(3));
    }

    #[test]
    fn variadic_operators_have_no_upper_bound() {
        assert!(ExprOp::In.arity().contains(2));
        assert!(ExprOp::In.arity().contains(50));
        assert!(!ExprOp::In.arity().contains(1));
    }
}
