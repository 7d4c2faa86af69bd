//! Error types for orm-core.

use thiserror::Error;

/// Result type alias for orm-core operations.
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types surfaced by the schema registry, query IR, organizer, and
/// SQL builder.
///
/// Every variant carries the offending path/table/operator so the
/// `#[error("...")]` message is self-describing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrmError {
    /// A table config references an IDL type name not found in the
    /// descriptor pool.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    /// A path fails to resolve in the registry.
    #[error("unknown path: {0}")]
    UnknownPath(String),

    /// A name-based path fragment is not registered under its prefix.
    #[error("unknown path segment '{segment}' under prefix '{prefix}'")]
    UnknownPathSegment { prefix: String, segment: String },

    /// An index into a path is out of range.
    #[error("unknown index {index} into path of size {size}")]
    UnknownIndex { index: usize, size: usize },

    /// Two roots share a table number or snake_case name.
    #[error("duplicate registration: {0}")]
    DuplicateRegistration(String),

    /// An expression's operand count violates the operator contract at
    /// emission time.
    #[error("invalid arity for operator {op}: expected {expected}, got {actual}")]
    InvalidArity {
        op: String,
        expected: String,
        actual: usize,
    },

    /// An expression carries a discriminator unknown to the builder.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// ALTER with an undefined alteration kind.
    #[error("unsupported DDL operation: {0}")]
    UnsupportedDDL(String),

    /// Decoding the wire envelope failed due to bad indices, unknown
    /// discriminators, or arity violations.
    #[error("malformed query envelope: {0}")]
    MalformedQueryEnvelope(String),

    /// Configuration ingestion failed (file open, JSON syntax).
    #[error("failed to load configuration: {0}")]
    LoadFailure(String),
}

impl OrmError {
    pub fn unknown_path(path: impl std::fmt::Display) -> Self {
        Self::UnknownPath(path.to_string())
    }

    pub fn unknown_schema(name: impl Into<String>) -> Self {
        Self::UnknownSchema(name.into())
    }

    pub fn duplicate_registration(detail: impl Into<String>) -> Self {
        Self::DuplicateRegistration(detail.into())
    }

    pub fn invalid_arity(op: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        Self::InvalidArity {
            op: op.into(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedQueryEnvelope(detail.into())
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::LoadFailure(err.to_string())
    }
}

impl From<std::io::Error> for OrmError {
    fn from(err: std::io::Error) -> Self {
        Self::LoadFailure(err.to_string())
    }
}
