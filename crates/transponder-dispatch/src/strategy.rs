//! Implementation strategies and their composition.
//!
//! A [`Handler`] fully implements a method (terminal). An [`Interceptor`]
//! runs around an inner handler (wrapping). The compiler composes one
//! terminal base with any number of interceptors into a [`Chain`], which is
//! itself a handler.

use std::sync::Arc;

use transponder_driver::Driver;
use transponder_types::{EntityRef, MethodDecl, Receiver, Value};

use crate::error::{DispatchError, DispatchResult};
use crate::rule::RuleKind;

/// The object a compiled method is invoked on.
///
/// Implemented by generated proxies. Strategies reach the driver and the
/// bound entity instance through it.
pub trait Target {
    /// The target viewed as a receiver, for running method bodies.
    fn receiver(&self) -> &dyn Receiver;

    fn driver(&self) -> &dyn Driver;

    /// Entity instance the target is bound to, if any.
    fn seed(&self) -> Option<EntityRef>;

    /// Bind the target to another entity instance.
    fn rebind(&self, seed: EntityRef);
}

/// One invocation of a compiled method.
pub struct Call<'a> {
    pub method: &'a MethodDecl,
    pub args: &'a [Value],
    pub target: &'a dyn Target,
}

impl<'a> Call<'a> {
    pub fn new(method: &'a MethodDecl, args: &'a [Value], target: &'a dyn Target) -> Self {
        Self {
            method,
            args,
            target,
        }
    }

    pub fn driver(&self) -> &dyn Driver {
        self.target.driver()
    }

    /// The bound entity instance, or `Unbound` if there is none.
    pub fn seed(&self) -> DispatchResult<EntityRef> {
        self.target
            .seed()
            .ok_or_else(|| DispatchError::Unbound(self.method.key.clone()))
    }
}

/// Terminal strategy: fully handles a method.
pub trait Handler: Send + Sync {
    fn name(&self) -> &str;

    fn invoke(&self, call: &Call<'_>) -> DispatchResult<Value>;
}

/// Wrapping strategy: runs before and/or after an inner handler.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str;

    fn intercept(&self, call: &Call<'_>, next: &dyn Handler) -> DispatchResult<Value>;
}

/// A rule's implementation strategy.
#[derive(Clone)]
pub enum Strategy {
    Terminal(Arc<dyn Handler>),
    Wrapping(Arc<dyn Interceptor>),
}

impl Strategy {
    pub fn terminal(handler: impl Handler + 'static) -> Self {
        Self::Terminal(Arc::new(handler))
    }

    pub fn wrapping(interceptor: impl Interceptor + 'static) -> Self {
        Self::Wrapping(Arc::new(interceptor))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Terminal(h) => h.name(),
            Self::Wrapping(i) => i.name(),
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Terminal(_) => RuleKind::Terminal,
            Self::Wrapping(_) => RuleKind::Wrapping,
        }
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Strategy({}: {})", self.kind(), self.name())
    }
}

/// A base strategy wrapped by interceptors, outermost first.
pub struct Chain {
    base: Strategy,
    layers: Vec<Arc<dyn Interceptor>>,
}

impl Chain {
    pub fn new(base: Strategy, layers: Vec<Arc<dyn Interceptor>>) -> Self {
        Self { base, layers }
    }

    /// Strategy names from the outermost layer down to the base.
    pub fn names(&self) -> Vec<String> {
        self.layers
            .iter()
            .map(|l| l.name().to_string())
            .chain(std::iter::once(self.base.name().to_string()))
            .collect()
    }

    fn invoke_from(&self, depth: usize, call: &Call<'_>) -> DispatchResult<Value> {
        if let Some(layer) = self.layers.get(depth) {
            let next = Next {
                chain: self,
                depth: depth + 1,
            };
            return layer.intercept(call, &next);
        }
        match &self.base {
            Strategy::Terminal(handler) => handler.invoke(call),
            // No terminal rule applies: the wrapper runs around the
            // method's own body, if it has one.
            Strategy::Wrapping(interceptor) => interceptor.intercept(call, &OwnBody),
        }
    }
}

impl Handler for Chain {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn invoke(&self, call: &Call<'_>) -> DispatchResult<Value> {
        self.invoke_from(0, call)
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Chain({})", self.names().join(" > "))
    }
}

struct Next<'c> {
    chain: &'c Chain,
    depth: usize,
}

impl Handler for Next<'_> {
    fn name(&self) -> &str {
        "next"
    }

    fn invoke(&self, call: &Call<'_>) -> DispatchResult<Value> {
        self.chain.invoke_from(self.depth, call)
    }
}

/// Runs the invoked method's own body, or fails as unimplemented.
pub(crate) struct OwnBody;

impl Handler for OwnBody {
    fn name(&self) -> &str {
        "body"
    }

    fn invoke(&self, call: &Call<'_>) -> DispatchResult<Value> {
        match &call.method.body {
            Some(body) => body
                .call(call.target.receiver(), call.args)
                .map_err(DispatchError::Body),
            None => Err(DispatchError::Unimplemented(call.method.key.clone())),
        }
    }
}
