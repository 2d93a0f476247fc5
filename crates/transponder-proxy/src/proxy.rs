use std::sync::Arc;

use parking_lot::RwLock;
use transponder_dispatch::builtins::BodyHandler;
use transponder_dispatch::{Call, CompiledDispatch, Handler, Target};
use transponder_driver::Driver;
use transponder_types::{BodyError, EntityRef, MethodDecl, MethodKey, Receiver, ShapeId, Value};

use crate::error::{ProxyError, ProxyResult};

/// A materialized shape implementation.
///
/// Every call is looked up in the compiled dispatch table and run through
/// the chain bound to it. Methods without a chain run their own body.
pub struct Proxy {
    shape: ShapeId,
    dispatch: Arc<CompiledDispatch>,
    driver: Arc<dyn Driver>,
    seed: RwLock<Option<EntityRef>>,
}

impl Proxy {
    pub fn new(
        shape: ShapeId,
        dispatch: Arc<CompiledDispatch>,
        driver: Arc<dyn Driver>,
        seed: Option<EntityRef>,
    ) -> Self {
        Self {
            shape,
            dispatch,
            driver,
            seed: RwLock::new(seed),
        }
    }

    pub fn shape(&self) -> &ShapeId {
        &self.shape
    }

    /// Entity instance the proxy is currently bound to.
    pub fn seed(&self) -> Option<EntityRef> {
        self.seed.read().clone()
    }

    pub fn dispatch(&self) -> &Arc<CompiledDispatch> {
        &self.dispatch
    }

    /// Invoke a method by its full signature.
    pub fn invoke(&self, key: &MethodKey, args: &[Value]) -> ProxyResult<Value> {
        let method = self
            .dispatch
            .method(key)
            .ok_or_else(|| ProxyError::NoSuchMethod {
                shape: self.shape.clone(),
                method: key.name.clone(),
                arity: key.params.len(),
            })?;
        self.run(method, args)
    }

    /// Invoke the method called `name` that takes `args.len()` arguments.
    pub fn call(&self, name: &str, args: Vec<Value>) -> ProxyResult<Value> {
        let method = self.resolve(name, args.len())?;
        self.run(method, &args)
    }

    fn resolve<'a>(&'a self, name: &'a str, arity: usize) -> ProxyResult<&'a MethodDecl> {
        let mut candidates = self
            .dispatch
            .methods_named(name)
            .filter(|m| m.key.params.len() == arity);
        let Some(first) = candidates.next() else {
            return Err(ProxyError::NoSuchMethod {
                shape: self.shape.clone(),
                method: name.to_string(),
                arity,
            });
        };
        let others = candidates.count();
        if others > 0 {
            return Err(ProxyError::AmbiguousMethod {
                shape: self.shape.clone(),
                method: name.to_string(),
                arity,
                candidates: others + 1,
            });
        }
        Ok(first)
    }

    fn run(&self, method: &MethodDecl, args: &[Value]) -> ProxyResult<Value> {
        let call = Call::new(method, args, self);
        let value = match self.dispatch.chain(&method.key) {
            Some(chain) => chain.invoke(&call)?,
            None => BodyHandler::own().invoke(&call)?,
        };
        Ok(value)
    }
}

impl Receiver for Proxy {
    fn shape(&self) -> &ShapeId {
        &self.shape
    }

    fn seed(&self) -> Option<EntityRef> {
        Proxy::seed(self)
    }

    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, BodyError> {
        Proxy::call(self, method, args).map_err(Into::into)
    }
}

impl Target for Proxy {
    fn receiver(&self) -> &dyn Receiver {
        self
    }

    fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    fn seed(&self) -> Option<EntityRef> {
        Proxy::seed(self)
    }

    fn rebind(&self, seed: EntityRef) {
        *self.seed.write() = Some(seed);
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("shape", &self.shape)
            .field("seed", &self.seed())
            .field("methods", &self.dispatch.methods().len())
            .finish()
    }
}
