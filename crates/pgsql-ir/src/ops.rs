//! Operator registry: canonical tokens for every operator the IR carries
//!
//! Expression and set-operation nodes never hold raw symbols. The planner
//! resolves a symbol once through [`Operator::lookup`] (or the sqlparser
//! bridge) and the renderer matches the resulting enum exhaustively.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Comparison operators, including the PostgreSQL pattern-match,
/// distinctness and type-test families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `~~` (LIKE)
    Like,
    /// `!~~` (NOT LIKE)
    NotLike,
    /// `~~*` (ILIKE)
    ILike,
    /// `!~~*` (NOT ILIKE)
    NotILike,
    /// `~`
    SimilarTo,
    /// `!~`
    NotSimilarTo,
    /// IS DISTINCT FROM
    IsDistinct,
    /// IS NOT DISTINCT FROM
    IsNotDistinct,
    /// IS OF (type test)
    IsOf,
    /// IS NOT OF
    IsNotOf,
}

impl ComparisonOp {
    /// The comparison that holds exactly when this one does not
    /// (ignoring NULL semantics).
    pub fn negate(self) -> Self {
        use ComparisonOp::*;
        match self {
            Eq => NotEq,
            NotEq => Eq,
            Lt => GtEq,
            GtEq => Lt,
            Gt => LtEq,
            LtEq => Gt,
            Like => NotLike,
            NotLike => Like,
            ILike => NotILike,
            NotILike => ILike,
            SimilarTo => NotSimilarTo,
            NotSimilarTo => SimilarTo,
            IsDistinct => IsNotDistinct,
            IsNotDistinct => IsDistinct,
            IsOf => IsNotOf,
            IsNotOf => IsOf,
        }
    }

    /// True for the LIKE / ILIKE / similarity family
    pub fn is_pattern_match(self) -> bool {
        use ComparisonOp::*;
        matches!(
            self,
            Like | NotLike | ILike | NotILike | SimilarTo | NotSimilarTo
        )
    }
}

/// Set operators combining two select queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOp {
    /// UNION
    Union,
    /// INTERSECT
    Intersect,
    /// EXCEPT
    Except,
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOp {
    /// `+`
    Add,
    /// `-` (also unary negation)
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `^`
    Pow,
}

/// Boolean connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    /// AND
    And,
    /// OR
    Or,
    /// NOT (unary)
    Not,
}

/// Operator token carried by binary, unary and postfix expression nodes
/// and by set operations.
///
/// Two tokens are equal exactly when they denote the same operator, so
/// consumers compare with `==` or `match`, never by rendering the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Comparison family
    Comparison(ComparisonOp),
    /// Set family
    Set(SetOp),
    /// Arithmetic family
    Arithmetic(ArithmeticOp),
    /// Boolean family
    Logical(LogicalOp),
    /// String concatenation (`||`)
    Concat,
}

impl Operator {
    /// Every token the registry knows about
    pub const ALL: [Operator; 29] = [
        Operator::Comparison(ComparisonOp::Eq),
        Operator::Comparison(ComparisonOp::NotEq),
        Operator::Comparison(ComparisonOp::Lt),
        Operator::Comparison(ComparisonOp::LtEq),
        Operator::Comparison(ComparisonOp::Gt),
        Operator::Comparison(ComparisonOp::GtEq),
        Operator::Comparison(ComparisonOp::Like),
        Operator::Comparison(ComparisonOp::NotLike),
        Operator::Comparison(ComparisonOp::ILike),
        Operator::Comparison(ComparisonOp::NotILike),
        Operator::Comparison(ComparisonOp::SimilarTo),
        Operator::Comparison(ComparisonOp::NotSimilarTo),
        Operator::Comparison(ComparisonOp::IsDistinct),
        Operator::Comparison(ComparisonOp::IsNotDistinct),
        Operator::Comparison(ComparisonOp::IsOf),
        Operator::Comparison(ComparisonOp::IsNotOf),
        Operator::Set(SetOp::Union),
        Operator::Set(SetOp::Intersect),
        Operator::Set(SetOp::Except),
        Operator::Arithmetic(ArithmeticOp::Add),
        Operator::Arithmetic(ArithmeticOp::Sub),
        Operator::Arithmetic(ArithmeticOp::Mul),
        Operator::Arithmetic(ArithmeticOp::Div),
        Operator::Arithmetic(ArithmeticOp::Mod),
        Operator::Arithmetic(ArithmeticOp::Pow),
        Operator::Logical(LogicalOp::And),
        Operator::Logical(LogicalOp::Or),
        Operator::Logical(LogicalOp::Not),
        Operator::Concat,
    ];

    /// The PostgreSQL spelling of this operator
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Comparison(op) => match op {
                ComparisonOp::Eq => "=",
                ComparisonOp::NotEq => "<>",
                ComparisonOp::Lt => "<",
                ComparisonOp::LtEq => "<=",
                ComparisonOp::Gt => ">",
                ComparisonOp::GtEq => ">=",
                ComparisonOp::Like => "~~",
                ComparisonOp::NotLike => "!~~",
                ComparisonOp::ILike => "~~*",
                ComparisonOp::NotILike => "!~~*",
                ComparisonOp::SimilarTo => "~",
                ComparisonOp::NotSimilarTo => "!~",
                ComparisonOp::IsDistinct => "IS DISTINCT",
                ComparisonOp::IsNotDistinct => "IS NOT DISTINCT",
                ComparisonOp::IsOf => "IS OF",
                ComparisonOp::IsNotOf => "IS NOT OF",
            },
            Operator::Set(op) => match op {
                SetOp::Union => "UNION",
                SetOp::Intersect => "INTERSECT",
                SetOp::Except => "EXCEPT",
            },
            Operator::Arithmetic(op) => match op {
                ArithmeticOp::Add => "+",
                ArithmeticOp::Sub => "-",
                ArithmeticOp::Mul => "*",
                ArithmeticOp::Div => "/",
                ArithmeticOp::Mod => "%",
                ArithmeticOp::Pow => "^",
            },
            Operator::Logical(op) => match op {
                LogicalOp::And => "AND",
                LogicalOp::Or => "OR",
                LogicalOp::Not => "NOT",
            },
            Operator::Concat => "||",
        }
    }

    /// Resolve a symbol to its canonical token.
    ///
    /// The returned reference points into a process-wide table built once,
    /// so two lookups of the same symbol yield the same address as well as
    /// equal values. Keyword operators match case-insensitively.
    pub fn intern(symbol: &str) -> Option<&'static Operator> {
        let registry = registry();
        registry
            .get(symbol)
            .or_else(|| registry.get(symbol.to_uppercase().as_str()))
    }

    /// Resolve a symbol to its canonical token by value
    pub fn lookup(symbol: &str) -> Option<Operator> {
        Self::intern(symbol).copied()
    }

    /// Check if this is a comparison operator
    pub fn is_comparison(&self) -> bool {
        matches!(self, Operator::Comparison(_))
    }

    /// Check if this is a set operator
    pub fn is_set_op(&self) -> bool {
        matches!(self, Operator::Set(_))
    }

    /// Check if this is a boolean connective
    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::Logical(_))
    }
}

impl From<ComparisonOp> for Operator {
    fn from(op: ComparisonOp) -> Self {
        Operator::Comparison(op)
    }
}

impl From<SetOp> for Operator {
    fn from(op: SetOp) -> Self {
        Operator::Set(op)
    }
}

impl From<ArithmeticOp> for Operator {
    fn from(op: ArithmeticOp) -> Self {
        Operator::Arithmetic(op)
    }
}

impl From<LogicalOp> for Operator {
    fn from(op: LogicalOp) -> Self {
        Operator::Logical(op)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

fn registry() -> &'static HashMap<&'static str, Operator> {
    static REGISTRY: OnceLock<HashMap<&'static str, Operator>> = OnceLock::new();
    REGISTRY.get_or_init(|| Operator::ALL.iter().map(|op| (op.symbol(), *op)).collect())
}

/// ORDER BY direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// No explicit direction
    #[default]
    Default,
    /// ASC
    Asc,
    /// DESC
    Desc,
}

/// NULLS FIRST / NULLS LAST
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    /// NULLS FIRST
    First,
    /// NULLS LAST
    Last,
}

/// Join kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JoinKind {
    /// Inner join
    #[default]
    Inner,
    /// Left outer join
    Left,
    /// Right outer join
    Right,
    /// Full outer join
    Full,
    /// Cross join (cartesian product)
    Cross,
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "INNER"),
            JoinKind::Left => write!(f, "LEFT"),
            JoinKind::Right => write!(f, "RIGHT"),
            JoinKind::Full => write!(f, "FULL"),
            JoinKind::Cross => write!(f, "CROSS"),
        }
    }
}

/// ON CONFLICT action of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictAction {
    /// DO NOTHING
    Nothing,
    /// DO UPDATE
    Update,
}

#[cfg(test)]
#[path = "ops_test.rs"]
mod tests;
