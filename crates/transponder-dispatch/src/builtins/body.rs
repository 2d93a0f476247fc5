use std::sync::Arc;

use transponder_types::{MethodBody, Value};

use crate::error::{DispatchError, DispatchResult};
use crate::strategy::{Call, Handler, OwnBody};

/// Runs a method body as a terminal strategy.
///
/// The catalog's `body` strategy runs the invoked method's own body. A
/// handler built with [`BodyHandler::fixed`] runs the given body instead,
/// whatever method it is bound to.
pub struct BodyHandler {
    name: String,
    body: Option<Arc<dyn MethodBody>>,
}

impl BodyHandler {
    pub fn own() -> Self {
        Self {
            name: "body".to_string(),
            body: None,
        }
    }

    pub fn fixed(name: impl Into<String>, body: Arc<dyn MethodBody>) -> Self {
        Self {
            name: name.into(),
            body: Some(body),
        }
    }
}

impl Handler for BodyHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, call: &Call<'_>) -> DispatchResult<Value> {
        match &self.body {
            Some(body) => body
                .call(call.target.receiver(), call.args)
                .map_err(DispatchError::Body),
            None => OwnBody.invoke(call),
        }
    }
}
