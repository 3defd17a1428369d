//! Expression nodes, i.e. everything that is not a relation or a statement

use crate::error::{IrError, IrResult};
use crate::fields::{define_node, FieldDecl, Fields, NodeFields, Value};
use crate::node::{ExprId, NodeKind, NodeRef, RelId};
use crate::ops::{NullsOrder, Operator, SortDirection};

/// A literal value in the IR
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Null literal
    Null,
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Float literal
    Float(f64),
    /// String literal
    String(String),
}

define_node! {
    /// Named argument list (`name(args...)`)
    pub struct ArgList {
        name: Option<String>,
        args: Vec<ExprId>,
    }
}

define_node! {
    /// Binary operator application
    pub struct BinOp {
        left: ExprId,
        op: Operator,
        right: ExprId,
        /// Either side contains an aggregate
        aggregates: bool,
        strong: bool,
    }
}

define_node! {
    /// Variable reference
    pub struct Var {
        name: String,
    }
}

define_node! {
    pub struct Ident {
        name: String,
    }
}

define_node! {
    /// Variable standing for a path in the source query
    pub struct PathVar {
        name: String,
    }
}

define_node! {
    /// Verbatim SQL text
    pub struct LiteralExpr {
        expr: String,
    }
}

define_node! {
    /// Constant, optionally bound to a query parameter slot
    pub struct Constant {
        value: LiteralValue = LiteralValue::Null,
        index: Option<i64>,
        expr: Option<ExprId>,
        type_name: Option<String>,
        origin_field: Option<String>,
    }
}

define_node! {
    pub struct UnaryOp {
        op: Operator,
        operand: ExprId,
    }
}

define_node! {
    pub struct PostfixOp {
        op: Operator,
        operand: ExprId,
    }
}

define_node! {
    pub struct Predicate {
        expr: Option<ExprId>,
    }
}

define_node! {
    /// `expr IS NULL`
    pub struct NullTest {
        expr: ExprId,
    }
}

define_node! {
    /// Target list entry
    pub struct SelectExpr {
        expr: ExprId,
        alias: Option<String>,
        filter_expr: Option<ExprId>,
    }
}

define_node! {
    /// Aliased FROM item
    pub struct FromExpr {
        expr: RelId,
        alias: Option<String>,
    }
}

define_node! {
    /// Column definition list of a set-returning function (`AS alias(cols)`)
    pub struct FuncAlias {
        alias: String,
        elements: Vec<ExprId>,
    }
}

define_node! {
    pub struct TableFuncElement {
        name: String,
        type_name: Option<ExprId>,
    }
}

define_node! {
    pub struct Exists {
        expr: ExprId,
    }
}

define_node! {
    /// Column reference.
    ///
    /// `origin` and `origin_field` record where the column was first
    /// materialized before subquery flattening moved it.
    pub struct FieldRef {
        table: Option<RelId>,
        /// `None` selects all columns
        field: Option<String>,
        origin: Option<RelId>,
        origin_field: Option<String>,
        indirection: Vec<ExprId>,
    }
}

define_node! {
    pub struct Sequence {
        elements: Vec<ExprId>,
    }
}

define_node! {
    /// ORDER BY item
    pub struct SortExpr {
        expr: ExprId,
        direction: SortDirection = SortDirection::Default,
        nulls_order: Option<NullsOrder>,
    }
}

define_node! {
    pub struct FunctionCall {
        name: String,
        args: Vec<ExprId>,
        /// Window specification (`OVER ...`)
        over: Option<ExprId>,
        aggregates: bool,
        /// Render without parentheses (`CURRENT_TIMESTAMP`)
        noparens: bool,
        agg_sort: Vec<ExprId>,
        agg_filter: Option<ExprId>,
    }
}

define_node! {
    pub struct WindowDef {
        partition: Vec<ExprId>,
        orderby: Vec<ExprId>,
        frame: Option<String>,
    }
}

define_node! {
    /// Placeholder that renders to nothing
    pub struct Ignore {}
}

define_node! {
    pub struct Array {
        elements: Vec<ExprId>,
    }
}

define_node! {
    pub struct TypeCast {
        expr: ExprId,
        /// A [`Type`] node
        type_name: ExprId,
    }
}

define_node! {
    /// Positional query parameter (`$n`)
    pub struct ParamRef {
        param: i64,
    }
}

define_node! {
    pub struct Indirection {
        expr: ExprId,
        indirection: Vec<ExprId>,
    }
}

define_node! {
    /// ROW(...) constructor
    pub struct RowExpr {
        args: Vec<ExprId>,
        origin_field: Option<String>,
    }
}

define_node! {
    /// Type name with modifiers
    pub struct Type {
        name: String,
        typmods: Vec<ExprId>,
        array_bounds: Vec<i64>,
        setof: bool,
    }
}

define_node! {
    /// `.*`
    pub struct StarIndirection {}
}

define_node! {
    /// `[upper]` or `[lower:upper]`
    pub struct IndexIndirection {
        lower: Option<ExprId>,
        upper: ExprId,
    }
}

define_node! {
    pub struct CaseExpr {
        arg: Option<ExprId>,
        /// [`CaseWhen`] branches
        args: Vec<ExprId>,
        default: Option<ExprId>,
        filter_expr: Option<ExprId>,
    }
}

define_node! {
    pub struct CaseWhen {
        expr: ExprId,
        result: ExprId,
    }
}

define_node! {
    pub struct CollateClause {
        expr: ExprId,
        collation_name: String,
    }
}

define_node! {
    /// Non-owning reference to a CTE
    pub struct CteRef {
        cte: RelId,
    }
}

define_node! {
    /// Non-owning reference to one output column of a CTE
    pub struct CteAttrRef {
        cte: RelId,
        attr: String,
    }
}

define_node! {
    /// `expr = value` assignment of an UPDATE
    pub struct UpdateExpr {
        expr: ExprId,
        value: ExprId,
    }
}

define_node! {
    /// Relation used in expression position (scalar subquery, EXISTS operand)
    pub struct Subquery {
        query: RelId,
    }
}

macro_rules! define_exprs {
    ($( $Kind:ident ),* $(,)?) => {
        /// Expression node.
        ///
        /// Variant names match [`NodeKind`] names one to one.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Expr {
            $( $Kind($Kind), )*
        }

        impl Expr {
            pub fn kind(&self) -> NodeKind {
                match self {
                    $( Expr::$Kind(_) => NodeKind::$Kind, )*
                }
            }

            /// Field table of an expression kind; `None` for other families
            pub fn declared_fields(kind: NodeKind) -> Option<&'static [FieldDecl]> {
                match kind {
                    $( NodeKind::$Kind => Some(<$Kind as NodeFields>::FIELDS), )*
                    _ => None,
                }
            }

            pub fn get_field(&self, name: &str) -> Option<Value> {
                match self {
                    $( Expr::$Kind(node) => node.get_field(name), )*
                }
            }

            pub fn set_field(&mut self, name: &str, value: Value) -> IrResult<()> {
                let (known, node) = match self {
                    $( Expr::$Kind(node) => (node.set_field(name, value)?, <$Kind as NodeFields>::NAME), )*
                };
                if known {
                    Ok(())
                } else {
                    Err(IrError::UnknownField {
                        node,
                        field: name.to_string(),
                    })
                }
            }

            /// Handles of every node this expression refers to
            pub fn children(&self) -> Vec<NodeRef> {
                let mut out = Vec::new();
                match self {
                    $( Expr::$Kind(node) => node.collect_refs(&mut out), )*
                }
                out
            }

            /// Build an expression of `kind` from named fields.
            /// Returns `None` when `kind` is not an expression kind.
            pub(crate) fn from_fields(kind: NodeKind, fields: Fields) -> Option<IrResult<Expr>> {
                match kind {
                    $( NodeKind::$Kind => Some($Kind::from_fields(fields).map(Expr::$Kind)), )*
                    _ => None,
                }
            }
        }

        $(
            impl From<$Kind> for Expr {
                fn from(node: $Kind) -> Self {
                    Expr::$Kind(node)
                }
            }
        )*
    };
}

define_exprs! {
    ArgList, BinOp, Var, Ident, PathVar, LiteralExpr, Constant, UnaryOp,
    PostfixOp, Predicate, NullTest, SelectExpr, FromExpr, FuncAlias,
    TableFuncElement, Exists, FieldRef, Sequence, SortExpr, FunctionCall,
    WindowDef, Ignore, Array, TypeCast, ParamRef, Indirection, RowExpr,
    Type, StarIndirection, IndexIndirection, CaseExpr, CaseWhen,
    CollateClause, CteRef, CteAttrRef, UpdateExpr, Subquery,
}

impl Expr {
    /// The CTE this expression refers to, for CTE reference kinds
    pub fn referenced_cte(&self) -> Option<RelId> {
        match self {
            Expr::CteRef(r) => Some(r.cte),
            Expr::CteAttrRef(r) => Some(r.cte),
            _ => None,
        }
    }
}
