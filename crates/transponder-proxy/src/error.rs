use transponder_dispatch::DispatchError;
use transponder_driver::DriverError;
use transponder_types::ShapeId;

/// Errors from materializing proxies and calling their methods.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("unknown shape: {0}")]
    UnknownShape(ShapeId),

    /// No method of that name takes that many arguments.
    #[error("{shape} has no method {method}/{arity}")]
    NoSuchMethod {
        shape: ShapeId,
        method: String,
        arity: usize,
    },

    /// Several overloads take that many arguments; call by key instead.
    #[error("{shape} has {candidates} methods {method}/{arity}")]
    AmbiguousMethod {
        shape: ShapeId,
        method: String,
        arity: usize,
        candidates: usize,
    },
}

/// Result alias for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;
