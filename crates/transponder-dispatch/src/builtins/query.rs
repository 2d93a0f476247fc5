use std::sync::Arc;

use tracing::debug;
use transponder_driver::Params;
use transponder_types::{QuerySpec, Value, ValueShape};

use crate::error::{DispatchError, DispatchResult};
use crate::strategy::{Call, Handler};
use crate::translate::QueryTranslator;

/// Query text for the driver's dialect among the method's `tag` markers.
fn select(
    translator: &dyn QueryTranslator,
    tag: &str,
    call: &Call<'_>,
) -> DispatchResult<QuerySpec> {
    let candidates = call.method.query_specs(tag);
    let dialect = call.driver().dialect();
    translator
        .translate(&candidates, dialect)
        .ok_or_else(|| DispatchError::NoQuery {
            tag: tag.to_string(),
            method: call.method.key.clone(),
            dialect: dialect.to_string(),
        })
}

/// Named parameters: declared parameter names bound to the arguments, plus
/// `this` when the target is bound to an instance.
pub fn bind_params(call: &Call<'_>) -> Params {
    let mut params: Params = call
        .method
        .param_names
        .iter()
        .cloned()
        .zip(call.args.iter().cloned())
        .collect();
    if let Some(seed) = call.target.seed() {
        params.insert("this".to_string(), Value::Entity(seed));
    }
    params
}

/// Runs the method's query; collections return every row, anything else the
/// first row or `Null`.
pub struct QueryHandler {
    translator: Arc<dyn QueryTranslator>,
}

impl QueryHandler {
    pub fn new(translator: Arc<dyn QueryTranslator>) -> Self {
        Self { translator }
    }
}

impl Handler for QueryHandler {
    fn name(&self) -> &str {
        "query"
    }

    fn invoke(&self, call: &Call<'_>) -> DispatchResult<Value> {
        let spec = select(self.translator.as_ref(), "query", call)?;
        let params = bind_params(call);
        debug!(method = %call.method.key, text = %spec.text, "query");

        let driver = call.driver();
        match call.method.key.returns {
            ValueShape::List(_) | ValueShape::Set(_) => Ok(Value::List(driver.query(
                &spec.language,
                &spec.text,
                &params,
            )?)),
            _ => Ok(driver
                .query_single(&spec.language, &spec.text, &params)?
                .unwrap_or(Value::Null)),
        }
    }
}

/// Resolves a single instance and rebinds the target to it.
///
/// Returns whether a match was found for `bool` methods, the matched entity
/// for entity-shaped methods, and `Null` otherwise. A miss leaves the target
/// bound as it was.
pub struct LookupHandler {
    translator: Arc<dyn QueryTranslator>,
}

impl LookupHandler {
    pub fn new(translator: Arc<dyn QueryTranslator>) -> Self {
        Self { translator }
    }
}

impl Handler for LookupHandler {
    fn name(&self) -> &str {
        "lookup"
    }

    fn invoke(&self, call: &Call<'_>) -> DispatchResult<Value> {
        let spec = select(self.translator.as_ref(), "lookup", call)?;
        let params = bind_params(call);
        let driver = call.driver();

        let found = driver.query_single(&spec.language, &spec.text, &params)?;
        let entity = match found {
            Some(row) => {
                let entity = match call.target.seed() {
                    Some(current) => driver.replace_seed(&current, &row)?,
                    None => driver.wrap_entity_instance(&row)?,
                };
                call.target.rebind(entity.clone());
                Some(entity)
            }
            None => None,
        };
        debug!(method = %call.method.key, found = entity.is_some(), "lookup");

        Ok(match (&call.method.key.returns, entity) {
            (ValueShape::Bool, entity) => Value::Bool(entity.is_some()),
            (ValueShape::Shape(_), Some(entity)) => Value::Entity(entity),
            _ => Value::Null,
        })
    }
}

/// Runs the method's command and returns the driver's result.
pub struct CommandHandler {
    translator: Arc<dyn QueryTranslator>,
}

impl CommandHandler {
    pub fn new(translator: Arc<dyn QueryTranslator>) -> Self {
        Self { translator }
    }
}

impl Handler for CommandHandler {
    fn name(&self) -> &str {
        "command"
    }

    fn invoke(&self, call: &Call<'_>) -> DispatchResult<Value> {
        let spec = select(self.translator.as_ref(), "command", call)?;
        let params = bind_params(call);
        Ok(call
            .driver()
            .command(&spec.language, &spec.text, &params)?)
    }
}
