use std::fmt;

use transponder_driver::DriverError;
use transponder_types::{BodyError, MethodKey};

use crate::rule::RuleKind;

/// A declarative marker cannot be turned into a rule.
///
/// Always reported while rules are built, never deferred to call time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No terminal or wrapping strategy is bound to the marker's tag.
    #[error("marker '{marker}' on {method} declares neither a terminal nor a wrapping strategy")]
    UnboundMarker { marker: String, method: MethodKey },

    /// A `Delegate`/`Advice` marker names a strategy the catalog does not know.
    #[error("marker '{marker}' names unknown strategy '{strategy}'")]
    UnknownStrategy { marker: String, strategy: String },

    /// A `Delegate` names a wrapping strategy, or an `Advice` a terminal one.
    #[error("strategy '{strategy}' is not a {expected} strategy")]
    KindMismatch { strategy: String, expected: RuleKind },

    /// Too many rules match at least one method for subset enumeration.
    #[error("{live} live rules exceed the limit of {limit}")]
    TooManyRules { live: usize, limit: usize },
}

/// Errors from dispatch compilation and from invoking compiled methods.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No rule and no method body implements the method.
    #[error("method {0} is not implemented")]
    Unimplemented(MethodKey),

    /// The method needs an entity instance but the receiver has none.
    #[error("method {0} requires a bound entity instance")]
    Unbound(MethodKey),

    /// No query text fits the driver's dialect.
    #[error("no '{tag}' query on {method} fits dialect '{dialect}'")]
    NoQuery {
        tag: String,
        method: MethodKey,
        dialect: String,
    },

    /// A strategy was applied to a method it cannot handle.
    #[error("invocation error in '{strategy}': {message}")]
    Invocation { strategy: String, message: String },

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("method body failed: {0}")]
    Body(#[source] BodyError),
}

impl DispatchError {
    pub fn invocation(strategy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            strategy: strategy.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal => f.write_str("terminal"),
            Self::Wrapping => f.write_str("wrapping"),
        }
    }
}

/// Result alias for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
