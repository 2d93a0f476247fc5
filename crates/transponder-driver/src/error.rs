/// Errors from driver operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// A schema or data call referenced a type the store does not know.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A data call referenced an instance the store does not know.
    #[error("unknown instance: {0}")]
    UnknownInstance(String),

    /// Instances cannot be created for an abstract type.
    #[error("cannot instantiate abstract type: {0}")]
    AbstractType(String),

    /// The value handed in as a seed cannot be turned into an instance.
    #[error("invalid seed: expected entity or id, got {0}")]
    InvalidSeed(&'static str),

    /// The store rejected the call.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
