use transponder_types::{Value, ValueShape};

use crate::error::{DispatchError, DispatchResult};
use crate::strategy::{Call, Handler};

fn property_name(strategy: &str, call: &Call<'_>) -> DispatchResult<String> {
    call.method.property_name().ok_or_else(|| {
        DispatchError::invocation(
            strategy,
            format!("{} does not address a property", call.method.key),
        )
    })
}

/// Reads the property a getter addresses from the bound instance.
pub struct GetProperty;

impl Handler for GetProperty {
    fn name(&self) -> &str {
        "get"
    }

    fn invoke(&self, call: &Call<'_>) -> DispatchResult<Value> {
        let property = property_name(self.name(), call)?;
        let seed = call.seed()?;
        Ok(call.driver().get_property_value(&seed, &property)?)
    }
}

/// Writes a setter's argument to the property it addresses.
///
/// Setters declared to return an entity shape return the receiver's own
/// instance, so calls can be chained.
pub struct SetProperty;

impl Handler for SetProperty {
    fn name(&self) -> &str {
        "set"
    }

    fn invoke(&self, call: &Call<'_>) -> DispatchResult<Value> {
        let property = property_name(self.name(), call)?;
        let value = call.args.first().cloned().ok_or_else(|| {
            DispatchError::invocation(self.name(), format!("{} needs a value", call.method.key))
        })?;
        let seed = call.seed()?;
        call.driver().set_property_value(&seed, &property, value)?;
        match call.method.key.returns {
            ValueShape::Shape(_) => Ok(Value::Entity(seed)),
            _ => Ok(Value::Null),
        }
    }
}
