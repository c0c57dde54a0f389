use thiserror::Error;

/// Errors raised while building collections, registering domains or
/// operations, and dispatching chained calls.
///
/// Every variant names the domain, operation, field or column at fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TascError {
    /// A column length does not match the collection index.
    #[error("shape mismatch: column '{column}' has {actual} values but the index has {expected} steps")]
    Shape {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// The domain was never registered with the factory.
    #[error("unknown domain '{domain}'")]
    UnknownDomain { domain: String },

    /// The domain is already registered and no override was requested.
    #[error("domain '{domain}' is already registered")]
    DuplicateDomain { domain: String },

    /// A domain constructor needs a field that was not supplied or inferred.
    #[error("domain '{domain}' requires field '{field}'")]
    MissingRequiredField { domain: String, field: String },

    /// The (domain, operation) key is already taken and no override was requested.
    #[error("operation '{operation}' is already registered for domain '{domain}'")]
    OperationConflict { domain: String, operation: String },

    /// No entry for the operation in the active domain or in core.
    #[error("unknown operation '{operation}' for domain '{domain}'")]
    UnknownOperation { operation: String, domain: String },

    /// The operation exists, but only for other domains.
    #[error(
        "operation '{operation}' is not available in domain '{domain}' (registered for: {})",
        .available.join(", ")
    )]
    DomainMismatch {
        operation: String,
        domain: String,
        available: Vec<String>,
    },

    #[error("column '{column}' not found")]
    ColumnNotFound { column: String },

    #[error("column '{column}' already exists")]
    DuplicateColumn { column: String },

    /// A numeric column was required.
    #[error("column '{column}' is not numeric")]
    ColumnType { column: String },

    #[error("position {position} is out of range for length {len}")]
    IndexOutOfRange { position: usize, len: usize },

    /// An argument failed binding or validation.
    #[error("invalid argument '{parameter}' for '{operation}': {message}")]
    InvalidArgument {
        operation: String,
        parameter: String,
        message: String,
    },

    /// The operation's output kind does not fit the entry point used to call it.
    #[error("operation '{operation}' produces {actual}, expected {expected}")]
    UnexpectedOutput {
        operation: String,
        expected: String,
        actual: String,
    },

    /// The name is handled by the chain itself and cannot be registered.
    #[error("operation name '{operation}' is reserved")]
    ReservedOperation { operation: String },
}

impl TascError {
    /// Shorthand for an [`TascError::InvalidArgument`].
    pub fn invalid_argument(
        operation: impl Into<String>,
        parameter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            operation: operation.into(),
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TascError>;
