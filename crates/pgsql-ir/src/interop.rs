//! Bridge from sqlparser AST tokens to IR tokens
//!
//! Planners that start from a parsed statement resolve its operators and
//! join kinds here instead of re-spelling symbols. Anything without an IR
//! counterpart comes back as `None` with a warning.

use crate::ops::{ArithmeticOp, ComparisonOp, JoinKind, LogicalOp, Operator, SetOp};
use sqlparser::ast::{BinaryOperator, JoinOperator, SetOperator, UnaryOperator};

impl Operator {
    /// Map a sqlparser binary operator
    pub fn from_sqlparser(op: &BinaryOperator) -> Option<Self> {
        use BinaryOperator as BO;
        let mapped: Operator = match op {
            BO::Eq => ComparisonOp::Eq.into(),
            BO::NotEq => ComparisonOp::NotEq.into(),
            BO::Lt => ComparisonOp::Lt.into(),
            BO::LtEq => ComparisonOp::LtEq.into(),
            BO::Gt => ComparisonOp::Gt.into(),
            BO::GtEq => ComparisonOp::GtEq.into(),
            BO::PGLikeMatch => ComparisonOp::Like.into(),
            BO::PGNotLikeMatch => ComparisonOp::NotLike.into(),
            BO::PGILikeMatch => ComparisonOp::ILike.into(),
            BO::PGNotILikeMatch => ComparisonOp::NotILike.into(),
            BO::PGRegexMatch => ComparisonOp::SimilarTo.into(),
            BO::PGRegexNotMatch => ComparisonOp::NotSimilarTo.into(),
            BO::And => LogicalOp::And.into(),
            BO::Or => LogicalOp::Or.into(),
            BO::Plus => ArithmeticOp::Add.into(),
            BO::Minus => ArithmeticOp::Sub.into(),
            BO::Multiply => ArithmeticOp::Mul.into(),
            BO::Divide => ArithmeticOp::Div.into(),
            BO::Modulo => ArithmeticOp::Mod.into(),
            BO::StringConcat => Operator::Concat,
            other => {
                log::warn!("Binary operator {other} has no IR token");
                return None;
            }
        };
        Some(mapped)
    }

    /// Map a sqlparser unary operator
    pub fn from_sqlparser_unary(op: &UnaryOperator) -> Option<Self> {
        match op {
            UnaryOperator::Not => Some(LogicalOp::Not.into()),
            UnaryOperator::Minus => Some(ArithmeticOp::Sub.into()),
            UnaryOperator::Plus => Some(ArithmeticOp::Add.into()),
            other => {
                log::warn!("Unary operator {other} has no IR token");
                None
            }
        }
    }
}

impl SetOp {
    /// Map a sqlparser set operator; `MINUS` and friends have no
    /// PostgreSQL spelling
    pub fn from_sqlparser(op: &SetOperator) -> Option<Self> {
        match op {
            SetOperator::Union => Some(SetOp::Union),
            SetOperator::Intersect => Some(SetOp::Intersect),
            SetOperator::Except => Some(SetOp::Except),
            other => {
                log::warn!("Set operator {other} has no IR token");
                None
            }
        }
    }
}

impl JoinKind {
    /// Map a sqlparser join operator, ignoring its constraint
    pub fn from_sqlparser(op: &JoinOperator) -> Option<Self> {
        match op {
            JoinOperator::Join(_) | JoinOperator::Inner(_) => Some(JoinKind::Inner),
            JoinOperator::Left(_) | JoinOperator::LeftOuter(_) => Some(JoinKind::Left),
            JoinOperator::Right(_) | JoinOperator::RightOuter(_) => Some(JoinKind::Right),
            JoinOperator::FullOuter(_) => Some(JoinKind::Full),
            JoinOperator::CrossJoin(_) => Some(JoinKind::Cross),
            other => {
                log::warn!("Unrecognized join operator {:?}, no IR join kind", other);
                None
            }
        }
    }
}
