//! Error types for ewiz.

use thiserror::Error;

/// The main error type for ewiz operations.
#[derive(Debug, Error)]
pub enum EwizError {
    /// Connection parameters are missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The lookup type has no rendering rule.
    #[error("Lookup type '{lookup}' {}", lookup_phrase(.negated))]
    UnsupportedLookup { lookup: String, negated: bool },

    /// The remote REST interface cannot perform this operation.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A filter value has the wrong shape for its lookup.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A non-nullable field was left empty.
    #[error("Integrity error: can't set {0} (a non-nullable field) to an empty value")]
    Integrity(String),

    /// A record or filter names a field the model does not declare.
    #[error("Unknown field '{field}' on {model}")]
    UnknownField { model: String, field: String },

    /// The request never produced an HTTP response.
    #[error("Connection error: {0}")]
    Connectivity(String),

    /// The server answered a query with a non-success status.
    #[error("An error occurred while attempting to query the database:\n\t{0}")]
    Query(String),

    /// A create request was rejected.
    #[error("{table} - An INSERT error has occurred:\n\t{message}")]
    Insert { table: String, message: String },

    /// An update request was rejected.
    #[error("{table} - An UPDATE error has occurred:\n\t{message}")]
    Update { table: String, message: String },

    /// A response line does not follow the `EWREST_` grammar.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The caller used the executor in a way it cannot compile.
    #[error("Compiler assumption violated: {0}")]
    CompilerAssumption(String),

    /// Config file could not be parsed.
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EwizError {
    /// Create an unsupported lookup error.
    pub fn lookup(lookup: impl Into<String>, negated: bool) -> Self {
        Self::UnsupportedLookup {
            lookup: lookup.into(),
            negated,
        }
    }

    /// Create an unknown field error.
    pub fn unknown_field(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            model: model.into(),
            field: field.into(),
        }
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

fn lookup_phrase(negated: &bool) -> &'static str {
    if *negated {
        "can't be negated"
    } else {
        "isn't supported"
    }
}

/// Result type alias for ewiz operations.
pub type EwizResult<T> = Result<T, EwizError>;
