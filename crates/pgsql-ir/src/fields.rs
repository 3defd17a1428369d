//! Field declarations and dynamic field access for IR nodes
//!
//! Every node kind is a plain Rust struct, but the planner may also build
//! and inspect nodes by field name. [`define_node!`] generates both from one
//! declaration: the struct itself and a [`NodeFields`] impl carrying the
//! field table (name, type, default, nullability) plus name-based
//! `get`/`set`/construction that enforce it.
//!
//! Requiredness follows the Rust type of the field: `Option<_>` is nullable
//! and defaults to `None`, collections and `bool` default to empty/`false`,
//! anything else must be supplied unless the declaration names a default.

use crate::dml::OnConflict;
use crate::error::{IrError, IrResult};
use crate::expr::LiteralValue;
use crate::names::{BondKey, ConceptName};
use crate::node::{ExprId, NodeRef, RelId};
use crate::ops::{ConflictAction, JoinKind, NullsOrder, Operator, SetOp, SortDirection};
use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeSet;
use std::hash::Hash;
use std::marker::PhantomData;

/// Declared semantic type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Boolean flag
    Bool,
    /// Integer
    Int,
    /// String / identifier
    Str,
    /// Constant literal
    Literal,
    /// Handle to an expression node
    Expr,
    /// Handle to a relation node
    Relation,
    /// Operator token
    Operator,
    /// Sort direction token
    SortDirection,
    /// Nulls-order token
    NullsOrder,
    /// Join kind token
    JoinKind,
    /// Conflict action token
    ConflictAction,
    /// Inline ON CONFLICT clause
    OnConflict,
    /// Ordered sequence
    List,
    /// Set (ordered or not)
    Set,
    /// Ordered key/value mapping
    Map,
    /// Two-element tuple
    Pair,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Str => "string",
            FieldType::Literal => "literal",
            FieldType::Expr => "expression",
            FieldType::Relation => "relation",
            FieldType::Operator => "operator",
            FieldType::SortDirection => "sort direction",
            FieldType::NullsOrder => "nulls order",
            FieldType::JoinKind => "join kind",
            FieldType::ConflictAction => "conflict action",
            FieldType::OnConflict => "on-conflict clause",
            FieldType::List => "list",
            FieldType::Set => "set",
            FieldType::Map => "map",
            FieldType::Pair => "pair",
        };
        f.write_str(name)
    }
}

/// Declaration of a single node field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl {
    /// Field name as used by `get`/`set`/construction
    pub name: &'static str,
    /// Declared type
    pub ty: FieldType,
    /// Must be supplied at construction
    pub required: bool,
    /// Accepts [`Value::Null`]
    pub nullable: bool,
}

impl FieldDecl {
    /// Declaration derived from the field's Rust type
    pub const fn of<T: FieldValue>(name: &'static str) -> Self {
        FieldDecl {
            name,
            ty: T::TYPE,
            required: T::REQUIRED,
            nullable: T::NULLABLE,
        }
    }

    /// Same declaration with an explicit default
    pub const fn defaulted(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Dynamically typed field value used by name-based access
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Expr(ExprId),
    Relation(RelId),
    Operator(Operator),
    SortDirection(SortDirection),
    NullsOrder(NullsOrder),
    JoinKind(JoinKind),
    ConflictAction(ConflictAction),
    OnConflict(Box<OnConflict>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Short name of the value's shape, used in type-mismatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Expr(_) => "expression",
            Value::Relation(_) => "relation",
            Value::Operator(_) => "operator",
            Value::SortDirection(_) => "sort direction",
            Value::NullsOrder(_) => "nulls order",
            Value::JoinKind(_) => "join kind",
            Value::ConflictAction(_) => "conflict action",
            Value::OnConflict(_) => "on-conflict clause",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_expr(&self) -> Option<ExprId> {
        match self {
            Value::Expr(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<RelId> {
        match self {
            Value::Relation(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Push every node handle contained in this value
    pub fn collect_refs(&self, out: &mut Vec<NodeRef>) {
        match self {
            Value::Expr(id) => out.push(NodeRef::Expr(*id)),
            Value::Relation(id) => out.push(NodeRef::Relation(*id)),
            Value::OnConflict(clause) => NodeFields::collect_refs(clause.as_ref(), out),
            Value::List(items) => items.iter().for_each(|v| v.collect_refs(out)),
            Value::Map(entries) => entries.iter().for_each(|(k, v)| {
                k.collect_refs(out);
                v.collect_refs(out);
            }),
            _ => {}
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<ExprId> for Value {
    fn from(v: ExprId) -> Self {
        Value::Expr(v)
    }
}

impl From<RelId> for Value {
    fn from(v: RelId) -> Self {
        Value::Relation(v)
    }
}

impl From<Operator> for Value {
    fn from(v: Operator) -> Self {
        Value::Operator(v)
    }
}

impl From<SetOp> for Value {
    fn from(v: SetOp) -> Self {
        Value::Operator(Operator::Set(v))
    }
}

impl From<JoinKind> for Value {
    fn from(v: JoinKind) -> Self {
        Value::JoinKind(v)
    }
}

impl From<OnConflict> for Value {
    fn from(v: OnConflict) -> Self {
        Value::OnConflict(Box::new(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

/// Field values supplied by name, in insertion order
pub type Fields = IndexMap<String, Value>;

/// Build a [`Fields`] map from `(name, value)` pairs
pub fn fields<K, I>(entries: I) -> Fields
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Conversion between a field's Rust type and [`Value`]
pub trait FieldValue: Sized {
    /// Declared type reported in field tables and errors
    const TYPE: FieldType;
    /// Whether construction fails when the field is omitted
    const REQUIRED: bool = true;
    /// Whether [`Value::Null`] is accepted
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    /// Convert back, handing the offending value back on mismatch
    fn from_value(value: Value) -> Result<Self, Value>;

    /// Value used when the field is omitted at construction
    fn default_value() -> Option<Self> {
        None
    }

    /// Push every node handle held by this value
    fn collect_refs(&self, _out: &mut Vec<NodeRef>) {}
}

impl FieldValue for bool {
    const TYPE: FieldType = FieldType::Bool;
    const REQUIRED: bool = false;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        }
    }

    fn default_value() -> Option<Self> {
        Some(false)
    }
}

impl FieldValue for i64 {
    const TYPE: FieldType = FieldType::Int;

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(other),
        }
    }
}

impl FieldValue for String {
    const TYPE: FieldType = FieldType::Str;

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl FieldValue for ConceptName {
    const TYPE: FieldType = FieldType::Str;

    fn to_value(&self) -> Value {
        Value::Str(self.as_str().to_string())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Str(s) if !s.is_empty() => Ok(ConceptName::new(s)),
            other => Err(other),
        }
    }
}

impl FieldValue for BondKey {
    const TYPE: FieldType = FieldType::Str;

    fn to_value(&self) -> Value {
        Value::Str(self.as_str().to_string())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Str(s) => Ok(BondKey::from(s)),
            other => Err(other),
        }
    }
}

macro_rules! token_field {
    ($Token:ty, $variant:ident) => {
        impl FieldValue for $Token {
            const TYPE: FieldType = FieldType::$variant;

            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }

            fn from_value(value: Value) -> Result<Self, Value> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }
        }
    };
}

token_field!(Operator, Operator);
token_field!(SortDirection, SortDirection);
token_field!(NullsOrder, NullsOrder);
token_field!(JoinKind, JoinKind);
token_field!(ConflictAction, ConflictAction);

impl FieldValue for SetOp {
    const TYPE: FieldType = FieldType::Operator;

    fn to_value(&self) -> Value {
        Value::Operator(Operator::Set(*self))
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Operator(Operator::Set(op)) => Ok(op),
            other => Err(other),
        }
    }
}

impl FieldValue for ExprId {
    const TYPE: FieldType = FieldType::Expr;

    fn to_value(&self) -> Value {
        Value::Expr(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Expr(id) => Ok(id),
            other => Err(other),
        }
    }

    fn collect_refs(&self, out: &mut Vec<NodeRef>) {
        out.push(NodeRef::Expr(*self));
    }
}

impl FieldValue for RelId {
    const TYPE: FieldType = FieldType::Relation;

    fn to_value(&self) -> Value {
        Value::Relation(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Relation(id) => Ok(id),
            other => Err(other),
        }
    }

    fn collect_refs(&self, out: &mut Vec<NodeRef>) {
        out.push(NodeRef::Relation(*self));
    }
}

impl FieldValue for LiteralValue {
    const TYPE: FieldType = FieldType::Literal;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            LiteralValue::Null => Value::Null,
            LiteralValue::Boolean(b) => Value::Bool(*b),
            LiteralValue::Integer(i) => Value::Int(*i),
            LiteralValue::Float(f) => Value::Float(*f),
            LiteralValue::String(s) => Value::Str(s.clone()),
        }
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null => Ok(LiteralValue::Null),
            Value::Bool(b) => Ok(LiteralValue::Boolean(b)),
            Value::Int(i) => Ok(LiteralValue::Integer(i)),
            Value::Float(f) => Ok(LiteralValue::Float(f)),
            Value::Str(s) => Ok(LiteralValue::String(s)),
            other => Err(other),
        }
    }
}

impl FieldValue for OnConflict {
    const TYPE: FieldType = FieldType::OnConflict;

    fn to_value(&self) -> Value {
        Value::OnConflict(Box::new(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::OnConflict(clause) => Ok(*clause),
            other => Err(other),
        }
    }

    fn collect_refs(&self, out: &mut Vec<NodeRef>) {
        NodeFields::collect_refs(self, out);
    }
}

/// `None` is stored as [`Value::Null`], so the inner type must not encode
/// null itself or `Some(null)` would read back as `None`.
struct NonNullInner<T>(PhantomData<T>);

impl<T: FieldValue> NonNullInner<T> {
    const CHECK: () = assert!(
        !T::NULLABLE,
        "Option<T> field requires a T that cannot encode null"
    );
}

impl<T: FieldValue> FieldValue for Option<T> {
    const TYPE: FieldType = T::TYPE;
    const REQUIRED: bool = false;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        let () = NonNullInner::<T>::CHECK;
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        let () = NonNullInner::<T>::CHECK;
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn default_value() -> Option<Self> {
        Some(None)
    }

    fn collect_refs(&self, out: &mut Vec<NodeRef>) {
        if let Some(v) = self {
            v.collect_refs(out);
        }
    }
}

/// Convert every element of a list value, stopping at the first mismatch
fn list_items<T: FieldValue>(value: Value) -> Result<impl Iterator<Item = T>, Value> {
    match value {
        Value::List(items) => items
            .into_iter()
            .map(T::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Vec::into_iter),
        other => Err(other),
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    const TYPE: FieldType = FieldType::List;
    const REQUIRED: bool = false;

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(T::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        list_items(value).map(Iterator::collect)
    }

    fn default_value() -> Option<Self> {
        Some(Vec::new())
    }

    fn collect_refs(&self, out: &mut Vec<NodeRef>) {
        self.iter().for_each(|v| v.collect_refs(out));
    }
}

impl<T: FieldValue + Hash + Eq> FieldValue for IndexSet<T> {
    const TYPE: FieldType = FieldType::Set;
    const REQUIRED: bool = false;

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(T::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        list_items(value).map(Iterator::collect)
    }

    fn default_value() -> Option<Self> {
        Some(IndexSet::new())
    }

    fn collect_refs(&self, out: &mut Vec<NodeRef>) {
        self.iter().for_each(|v| v.collect_refs(out));
    }
}

impl<T: FieldValue + Ord> FieldValue for BTreeSet<T> {
    const TYPE: FieldType = FieldType::Set;
    const REQUIRED: bool = false;

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(T::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        list_items(value).map(Iterator::collect)
    }

    fn default_value() -> Option<Self> {
        Some(BTreeSet::new())
    }
}

impl<K: FieldValue + Hash + Eq, V: FieldValue> FieldValue for IndexMap<K, V> {
    const TYPE: FieldType = FieldType::Map;
    const REQUIRED: bool = false;

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| -> Result<(K, V), Value> {
                    Ok((K::from_value(k)?, V::from_value(v)?))
                })
                .collect(),
            other => Err(other),
        }
    }

    fn default_value() -> Option<Self> {
        Some(IndexMap::new())
    }

    fn collect_refs(&self, out: &mut Vec<NodeRef>) {
        for (k, v) in self {
            k.collect_refs(out);
            v.collect_refs(out);
        }
    }
}

impl<A: FieldValue, B: FieldValue> FieldValue for (A, B) {
    const TYPE: FieldType = FieldType::Pair;

    fn to_value(&self) -> Value {
        Value::List(vec![self.0.to_value(), self.1.to_value()])
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::List(items) if items.len() == 2 => {
                let mut items = items.into_iter();
                match (items.next(), items.next()) {
                    (Some(a), Some(b)) => Ok((A::from_value(a)?, B::from_value(b)?)),
                    _ => Err(Value::Null),
                }
            }
            other => Err(other),
        }
    }

    fn collect_refs(&self, out: &mut Vec<NodeRef>) {
        self.0.collect_refs(out);
        self.1.collect_refs(out);
    }
}

/// Name-based access generated for every node struct by [`define_node!`]
pub trait NodeFields: Sized {
    /// Node kind name used in error messages
    const NAME: &'static str;
    /// Declared fields, in declaration order
    const FIELDS: &'static [FieldDecl];

    /// Read a field by name; `None` if the name is not declared
    fn get_field(&self, name: &str) -> Option<Value>;

    /// Write a field by name. Returns `Ok(false)` if the name is not
    /// declared, an error if the value has the wrong type.
    fn set_field(&mut self, name: &str, value: Value) -> IrResult<bool>;

    /// Remove this node's declared fields from `fields` and build the node,
    /// leaving undeclared names behind for the caller to report.
    fn take_fields(fields: &mut Fields) -> IrResult<Self>;

    /// Push every node handle referenced by this node's fields
    fn collect_refs(&self, out: &mut Vec<NodeRef>);

    /// Build the node from a complete field map
    fn from_fields(mut fields: Fields) -> IrResult<Self> {
        reject_undeclared(&fields, Self::NAME, &[Self::FIELDS])?;
        Self::take_fields(&mut fields)
    }
}

/// Fail with `UnknownField` on the first name not covered by `tables`
pub(crate) fn reject_undeclared(
    fields: &Fields,
    node: &'static str,
    tables: &[&[FieldDecl]],
) -> IrResult<()> {
    let declared = |name: &str| tables.iter().flat_map(|t| t.iter()).any(|d| d.name == name);
    match fields.keys().find(|name| !declared(name)) {
        Some(name) => Err(IrError::UnknownField {
            node,
            field: name.clone(),
        }),
        None => Ok(()),
    }
}

/// Convert a supplied value to the field's Rust type
pub(crate) fn convert<T: FieldValue>(node: &'static str, field: &str, value: Value) -> IrResult<T> {
    T::from_value(value).map_err(|found| IrError::TypeMismatch {
        node,
        field: field.to_string(),
        expected: T::TYPE,
        found: found.type_name(),
    })
}

/// Take a declared field, falling back to the type's default
pub(crate) fn take_field<T: FieldValue>(
    fields: &mut Fields,
    node: &'static str,
    name: &'static str,
) -> IrResult<T> {
    match fields.shift_remove(name) {
        Some(value) => convert(node, name, value),
        None => T::default_value().ok_or(IrError::MissingField { node, field: name }),
    }
}

/// Take a declared field that has an explicit default
pub(crate) fn take_field_or<T: FieldValue>(
    fields: &mut Fields,
    node: &'static str,
    name: &'static str,
    default: impl FnOnce() -> T,
) -> IrResult<T> {
    match fields.shift_remove(name) {
        Some(value) => convert(node, name, value),
        None => Ok(default()),
    }
}

/// Declare a node struct together with its [`NodeFields`] impl.
///
/// ```ignore
/// define_node! {
///     /// Binary operator application
///     pub struct BinOpNode {
///         left: ExprId,
///         op: Operator,
///         right: ExprId,
///         kind: JoinKind = JoinKind::Inner,
///     }
/// }
/// ```
macro_rules! define_node {
    (@decl $field:ident : $ty:ty = $default:expr) => {
        $crate::fields::FieldDecl::of::<$ty>(stringify!($field)).defaulted()
    };
    (@decl $field:ident : $ty:ty) => {
        $crate::fields::FieldDecl::of::<$ty>(stringify!($field))
    };
    (@take $fields:ident, $field:ident : $ty:ty = $default:expr) => {
        $crate::fields::take_field_or::<$ty>($fields, Self::NAME, stringify!($field), || $default)?
    };
    (@take $fields:ident, $field:ident : $ty:ty) => {
        $crate::fields::take_field::<$ty>($fields, Self::NAME, stringify!($field))?
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty $(= $default:expr)? ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $Name {
            $( $(#[$fmeta])* pub $field: $ty, )*
        }

        impl $crate::fields::NodeFields for $Name {
            const NAME: &'static str = stringify!($Name);
            const FIELDS: &'static [$crate::fields::FieldDecl] = &[
                $( $crate::fields::define_node!(@decl $field : $ty $(= $default)?), )*
            ];

            #[allow(unused_variables)]
            fn get_field(&self, name: &str) -> Option<$crate::fields::Value> {
                match name {
                    $( stringify!($field) => Some($crate::fields::FieldValue::to_value(&self.$field)), )*
                    _ => None,
                }
            }

            #[allow(unused_variables)]
            fn set_field(
                &mut self,
                name: &str,
                value: $crate::fields::Value,
            ) -> $crate::error::IrResult<bool> {
                match name {
                    $(
                        stringify!($field) => {
                            self.$field = $crate::fields::convert::<$ty>(Self::NAME, name, value)?;
                            Ok(true)
                        }
                    )*
                    _ => Ok(false),
                }
            }

            #[allow(unused_variables)]
            fn take_fields(
                fields: &mut $crate::fields::Fields,
            ) -> $crate::error::IrResult<Self> {
                Ok(Self {
                    $( $field: $crate::fields::define_node!(@take fields, $field : $ty $(= $default)?), )*
                })
            }

            #[allow(unused_variables)]
            fn collect_refs(&self, out: &mut Vec<$crate::node::NodeRef>) {
                $( $crate::fields::FieldValue::collect_refs(&self.$field, out); )*
            }
        }
    };
}

pub(crate) use define_node;

#[cfg(test)]
#[path = "fields_test.rs"]
mod tests;
