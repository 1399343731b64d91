use qgate_store::StoreError;
use qgate_types::TypesError;
use thiserror::Error;

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;

/// Errors surfaced by the gate engine.
#[derive(Debug, Error)]
pub enum GateError {
    /// Invalid configuration, including a mode value that cannot be
    /// interpreted at runtime.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Persisted record could not be decoded.
    #[error("corrupt gate record: {0}")]
    Corrupt(String),

    #[error("gate {0} is not registered")]
    UnknownGate(String),

    #[error("gate {0} is already registered")]
    DuplicateGate(String),

    /// The gate worker has shut down.
    #[error("gate {0} is closed")]
    Closed(String),
}

impl From<TypesError> for GateError {
    fn from(e: TypesError) -> Self {
        match e {
            TypesError::NotAnObject(_) => GateError::Corrupt(e.to_string()),
            other => GateError::Config(other.to_string()),
        }
    }
}
