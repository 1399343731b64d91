use thiserror::Error;

/// Result type for type-level parsing and validation.
pub type TypesResult<T> = Result<T, TypesError>;

/// Errors raised while parsing or validating gate types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid mode: {0:?}")]
    InvalidMode(String),

    #[error("invalid toggle variant: {0:?}")]
    InvalidToggle(String),

    #[error("message must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
