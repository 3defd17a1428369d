//! Error types for pgsql-ir

use crate::fields::FieldType;
use thiserror::Error;

/// IR error type
///
/// Every variant except the config/IO ones signals a malformed tree built by
/// the planner or a rewrite pass. They are raised at the point of construction
/// or field access and must not be swallowed before rendering.
#[derive(Error, Debug)]
pub enum IrError {
    /// IR001: Field name not declared by the node kind
    #[error("[IR001] Unknown field '{field}' for node '{node}'")]
    UnknownField { node: &'static str, field: String },

    /// IR002: Required field omitted at construction
    #[error("[IR002] Missing required field '{field}' for node '{node}'")]
    MissingField {
        node: &'static str,
        field: &'static str,
    },

    /// IR003: Supplied value does not match the declared field type
    #[error("[IR003] Field '{node}.{field}' expects {expected}, got {found}")]
    TypeMismatch {
        node: &'static str,
        field: String,
        expected: FieldType,
        found: &'static str,
    },

    /// IR004: Field is fixed after construction
    #[error("[IR004] Field '{node}.{field}' is immutable after construction")]
    ImmutableField {
        node: &'static str,
        field: &'static str,
    },

    /// IR005: Node handle no longer resolves to a live arena slot
    #[error("[IR005] Dangling {family} handle {handle}")]
    DanglingNode { family: &'static str, handle: String },

    /// IR006: Node handle resolves to a node of the wrong family or kind
    #[error("[IR006] Expected {expected}, found {found}")]
    WrongNodeFamily {
        expected: &'static str,
        found: &'static str,
    },

    /// IR007: Config file not found
    #[error("[IR007] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// IR008: Config file failed to parse
    #[error("[IR008] Config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// IR009: IO error with file path context
    #[error("[IR009] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

impl IrError {
    /// True for the unknown-field / missing-field family of errors
    pub fn is_field_error(&self) -> bool {
        matches!(
            self,
            IrError::UnknownField { .. } | IrError::MissingField { .. }
        )
    }

    /// True when a value violated a declared field type
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, IrError::TypeMismatch { .. })
    }
}

/// Result type alias for IrError
pub type IrResult<T> = Result<T, IrError>;
