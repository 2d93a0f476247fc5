use transponder_types::{EntityRef, Value};

use crate::defs::{IndexDef, Params, PropertyDef, RelationshipDef, TypeDef};
use crate::error::DriverResult;

/// Store-specific adapter consumed by the describer and by generated proxies.
///
/// All implementations must satisfy these invariants:
/// - Calls are synchronous; none of them suspend or retry internally.
/// - `create_property` is only issued for a type already created through
///   `create_type`, but its `linked_type` may name a type created later.
/// - `setup_relationship` may name a linked type that is never created; the
///   driver applies whatever default it has for that case.
pub trait Driver: Send + Sync {
    // ---- Schema ----

    fn create_type(&self, def: &TypeDef) -> DriverResult<()>;

    fn create_property(&self, def: &PropertyDef) -> DriverResult<()>;

    fn create_index(&self, def: &IndexDef) -> DriverResult<()>;

    fn setup_relationship(&self, def: &RelationshipDef) -> DriverResult<()>;

    // ---- Instances ----

    /// Read a property of an instance. Unset properties read as `Null`.
    fn get_property_value(&self, instance: &EntityRef, property: &str) -> DriverResult<Value>;

    fn set_property_value(
        &self,
        instance: &EntityRef,
        property: &str,
        value: Value,
    ) -> DriverResult<()>;

    /// Create a new, empty instance of the named type.
    fn new_entity_instance(&self, type_name: &str) -> DriverResult<EntityRef>;

    /// Resolve a store-level value (an entity or an id) into an instance handle.
    fn wrap_entity_instance(&self, seed: &Value) -> DriverResult<EntityRef>;

    /// Rebind a wrapper currently bound to `current` onto `seed`.
    ///
    /// The default resolves the new seed and ignores the old binding.
    fn replace_seed(&self, current: &EntityRef, seed: &Value) -> DriverResult<EntityRef> {
        let _ = current;
        self.wrap_entity_instance(seed)
    }

    // ---- Queries ----

    fn query(&self, language: &str, text: &str, params: &Params) -> DriverResult<Vec<Value>>;

    /// First result of `query`, if any.
    fn query_single(
        &self,
        language: &str,
        text: &str,
        params: &Params,
    ) -> DriverResult<Option<Value>> {
        Ok(self.query(language, text, params)?.into_iter().next())
    }

    fn command(&self, language: &str, text: &str, params: &Params) -> DriverResult<Value>;

    /// Dialect tag used to pick between dialect-specific query texts.
    fn dialect(&self) -> &str;

    // ---- Privilege ----

    /// Enter an elevated-privilege scope. Scopes nest.
    fn enter_privileged(&self) -> DriverResult<()> {
        Ok(())
    }

    /// Leave the innermost elevated-privilege scope.
    fn exit_privileged(&self) {}
}
