//! Error types for quarry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// A filter, projection or update shape the parser does not recognize.
    /// Carries the rendered source expression.
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// The entity has no resolvable table name.
    #[error("no table mapping for entity '{0}'")]
    MissingTableMapping(String),

    /// Unknown dialect selector value.
    #[error("dialect '{0}' is not supported")]
    DialectNotSupported(String),

    /// Internal invariant: the parameter index assigned during parsing does
    /// not match the index consumed during emission. Must never occur in
    /// correct code.
    #[error("parameter alignment violation: placeholder @p{expected} bound at position {actual}")]
    ParameterAlignmentViolation { expected: usize, actual: usize },
}

impl QueryError {
    /// Create an unsupported-expression error from anything displayable.
    pub fn unsupported(expr: impl std::fmt::Display) -> Self {
        Self::UnsupportedExpression(expr.to_string())
    }
}

/// Result type alias for quarry operations.
pub type QueryResult<T> = Result<T, QueryError>;
