//! Node handles and the closed set of node kinds.
//!
//! Nodes live in the arenas of a [`QueryTree`](crate::QueryTree) and refer to
//! each other through generational indices. A handle identifies a node; two
//! fields holding the same handle share that node. Handles are non-owning:
//! removing a node from the tree turns every remaining handle to it into a
//! dangling one, which the tree reports instead of resolving.

use crate::dml::Statement;
use crate::expr::Expr;
use crate::relation::Relation;
use typed_generational_arena::{Index, NonzeroGeneration};

/// Generational arena key for nodes of type `T`
pub type Key<T> = Index<T, usize, NonzeroGeneration<usize>>;

/// Handle to an expression-level node
pub type ExprId = Key<Expr>;

/// Handle to a row-producing relation node
pub type RelId = Key<Relation>;

/// Handle to a DML statement node
pub type StmtId = Key<Statement>;

/// Handle to any node in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Expr(ExprId),
    Relation(RelId),
    Statement(StmtId),
}

impl NodeRef {
    /// The arena family this handle points into
    pub fn family(&self) -> NodeFamily {
        match self {
            NodeRef::Expr(_) => NodeFamily::Expr,
            NodeRef::Relation(_) => NodeFamily::Relation,
            NodeRef::Statement(_) => NodeFamily::Statement,
        }
    }
}

impl From<ExprId> for NodeRef {
    fn from(id: ExprId) -> Self {
        NodeRef::Expr(id)
    }
}

impl From<RelId> for NodeRef {
    fn from(id: RelId) -> Self {
        NodeRef::Relation(id)
    }
}

impl From<StmtId> for NodeRef {
    fn from(id: StmtId) -> Self {
        NodeRef::Statement(id)
    }
}

/// The three node families, each stored in its own arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeFamily {
    /// Expressions and clause fragments
    Expr,
    /// Row-producing nodes carrying a bond registry
    Relation,
    /// INSERT / UPDATE / DELETE
    Statement,
}

impl NodeFamily {
    pub fn name(self) -> &'static str {
        match self {
            NodeFamily::Expr => "expression",
            NodeFamily::Relation => "relation",
            NodeFamily::Statement => "statement",
        }
    }
}

impl std::fmt::Display for NodeFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! node_kinds {
    ($( $family:ident => [ $( $Kind:ident ),* $(,)? ] ),* $(,)?) => {
        /// Every node kind the IR can hold.
        ///
        /// The set is closed: the renderer can match it exhaustively and the
        /// planner names a kind when building nodes by field name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NodeKind {
            $( $( $Kind, )* )*
        }

        impl NodeKind {
            /// All kinds, grouped by family
            pub const ALL: &'static [NodeKind] = &[ $( $( NodeKind::$Kind, )* )* ];

            pub fn name(self) -> &'static str {
                match self {
                    $( $( NodeKind::$Kind => stringify!($Kind), )* )*
                }
            }

            /// Arena family nodes of this kind are stored in
            pub fn family(self) -> NodeFamily {
                match self {
                    $( $( NodeKind::$Kind => NodeFamily::$family, )* )*
                }
            }
        }
    };
}

node_kinds! {
    Expr => [
        ArgList, BinOp, Var, Ident, PathVar, LiteralExpr, Constant, UnaryOp,
        PostfixOp, Predicate, NullTest, SelectExpr, FromExpr, FuncAlias,
        TableFuncElement, Exists, FieldRef, Sequence, SortExpr, FunctionCall,
        WindowDef, Ignore, Array, TypeCast, ParamRef, Indirection, RowExpr,
        Type, StarIndirection, IndexIndirection, CaseExpr, CaseWhen,
        CollateClause, CteRef, CteAttrRef, UpdateExpr, Subquery,
    ],
    Relation => [
        PseudoRelation, Table, TableQuery, SelectQuery, Composite, Cte, Join,
    ],
    Statement => [Insert, Update, Delete],
}

impl NodeKind {
    /// Look a kind up by its name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
