use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use tracing::debug;
use transponder_types::{EntityRef, Value};

use crate::defs::{DriverCall, IndexDef, Params, PropertyDef, RelationshipDef, TypeDef};
use crate::error::{DriverError, DriverResult};
use crate::traits::Driver;

/// In-memory, map-based driver.
///
/// Intended for tests and embedding. Every call is appended to a call log so
/// tests can assert emission order. Queries cannot be evaluated; they are
/// answered from results registered up front with [`Self::register_query`].
pub struct InMemoryDriver {
    dialect: String,
    inner: RwLock<DriverState>,
}

#[derive(Default)]
struct DriverState {
    calls: Vec<DriverCall>,
    types: BTreeMap<String, TypeDef>,
    properties: BTreeMap<String, Vec<PropertyDef>>,
    relationships: Vec<RelationshipDef>,
    records: HashMap<String, Record>,
    canned_queries: HashMap<(String, String), Vec<Value>>,
    canned_commands: HashMap<(String, String), Value>,
    failing_types: HashSet<String>,
    privilege_depth: u32,
}

struct Record {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl InMemoryDriver {
    /// Create an empty driver reporting the `"memory"` dialect.
    pub fn new() -> Self {
        Self::with_dialect("memory")
    }

    pub fn with_dialect(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            inner: RwLock::new(DriverState::default()),
        }
    }

    // ---------------------------------------------------------------
    // Test setup
    // ---------------------------------------------------------------

    /// Answer `query(language, text, ..)` with `results`.
    pub fn register_query(&self, language: &str, text: &str, results: Vec<Value>) {
        let mut state = self.inner.write().expect("lock poisoned");
        state
            .canned_queries
            .insert((language.to_string(), text.to_string()), results);
    }

    /// Answer `command(language, text, ..)` with `result`.
    pub fn register_command(&self, language: &str, text: &str, result: Value) {
        let mut state = self.inner.write().expect("lock poisoned");
        state
            .canned_commands
            .insert((language.to_string(), text.to_string()), result);
    }

    /// Make `create_type` fail for the named type.
    pub fn fail_on_type(&self, type_name: &str) {
        let mut state = self.inner.write().expect("lock poisoned");
        state.failing_types.insert(type_name.to_string());
    }

    // ---------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.inner.read().expect("lock poisoned").calls.clone()
    }

    /// Schema calls made so far, in order.
    pub fn schema_calls(&self) -> Vec<DriverCall> {
        self.inner
            .read()
            .expect("lock poisoned")
            .calls
            .iter()
            .filter(|c| c.is_schema())
            .cloned()
            .collect()
    }

    pub fn type_def(&self, name: &str) -> Option<TypeDef> {
        self.inner.read().expect("lock poisoned").types.get(name).cloned()
    }

    /// Sorted names of all created types.
    pub fn type_names(&self) -> Vec<String> {
        self.inner
            .read()
            .expect("lock poisoned")
            .types
            .keys()
            .cloned()
            .collect()
    }

    /// Properties of a type in creation order.
    pub fn properties_of(&self, type_name: &str) -> Vec<PropertyDef> {
        self.inner
            .read()
            .expect("lock poisoned")
            .properties
            .get(type_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn relationships(&self) -> Vec<RelationshipDef> {
        self.inner.read().expect("lock poisoned").relationships.clone()
    }

    pub fn instance_count(&self) -> usize {
        self.inner.read().expect("lock poisoned").records.len()
    }

    /// Remove all recorded calls, keeping schema and data.
    pub fn clear_calls(&self) {
        self.inner.write().expect("lock poisoned").calls.clear();
    }
}

impl Default for InMemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for InMemoryDriver {
    fn create_type(&self, def: &TypeDef) -> DriverResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        if state.failing_types.contains(&def.name) {
            return Err(DriverError::Backend(format!(
                "refused to create type {}",
                def.name
            )));
        }
        state.calls.push(DriverCall::CreateType(def.clone()));
        state.types.insert(def.name.clone(), def.clone());
        debug!(type_name = %def.name, "created type");
        Ok(())
    }

    fn create_property(&self, def: &PropertyDef) -> DriverResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        if !state.types.contains_key(&def.type_name) {
            return Err(DriverError::UnknownType(def.type_name.clone()));
        }
        state.calls.push(DriverCall::CreateProperty(def.clone()));
        state
            .properties
            .entry(def.type_name.clone())
            .or_default()
            .push(def.clone());
        Ok(())
    }

    fn create_index(&self, def: &IndexDef) -> DriverResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        if !state.types.contains_key(&def.type_name) {
            return Err(DriverError::UnknownType(def.type_name.clone()));
        }
        state.calls.push(DriverCall::CreateIndex(def.clone()));
        Ok(())
    }

    fn setup_relationship(&self, def: &RelationshipDef) -> DriverResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        // A missing linked type is recorded as-is; the name acts as a
        // placeholder until a type of that name is created.
        state.calls.push(DriverCall::SetupRelationship(def.clone()));
        state.relationships.push(def.clone());
        Ok(())
    }

    fn get_property_value(&self, instance: &EntityRef, property: &str) -> DriverResult<Value> {
        let state = self.inner.read().expect("lock poisoned");
        let record = state
            .records
            .get(&instance.id)
            .ok_or_else(|| DriverError::UnknownInstance(instance.to_string()))?;
        Ok(record.fields.get(property).cloned().unwrap_or(Value::Null))
    }

    fn set_property_value(
        &self,
        instance: &EntityRef,
        property: &str,
        value: Value,
    ) -> DriverResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        let record = state
            .records
            .get_mut(&instance.id)
            .ok_or_else(|| DriverError::UnknownInstance(instance.to_string()))?;
        record.fields.insert(property.to_string(), value);
        Ok(())
    }

    fn new_entity_instance(&self, type_name: &str) -> DriverResult<EntityRef> {
        let mut state = self.inner.write().expect("lock poisoned");
        let def = state
            .types
            .get(type_name)
            .ok_or_else(|| DriverError::UnknownType(type_name.to_string()))?;
        if def.is_abstract {
            return Err(DriverError::AbstractType(type_name.to_string()));
        }
        let id = uuid::Uuid::now_v7().to_string();
        state.records.insert(
            id.clone(),
            Record {
                type_name: type_name.to_string(),
                fields: BTreeMap::new(),
            },
        );
        Ok(EntityRef::new(id, type_name))
    }

    fn wrap_entity_instance(&self, seed: &Value) -> DriverResult<EntityRef> {
        let id = match seed {
            Value::Entity(entity) => entity.id.as_str(),
            Value::Text(id) => id.as_str(),
            other => return Err(DriverError::InvalidSeed(other.kind())),
        };
        let state = self.inner.read().expect("lock poisoned");
        let record = state
            .records
            .get(id)
            .ok_or_else(|| DriverError::UnknownInstance(id.to_string()))?;
        Ok(EntityRef::new(id, record.type_name.clone()))
    }

    fn query(&self, language: &str, text: &str, params: &Params) -> DriverResult<Vec<Value>> {
        let mut state = self.inner.write().expect("lock poisoned");
        let privileged = state.privilege_depth > 0;
        state.calls.push(DriverCall::Query {
            language: language.to_string(),
            text: text.to_string(),
            params: params.clone(),
            privileged,
        });
        Ok(state
            .canned_queries
            .get(&(language.to_string(), text.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn command(&self, language: &str, text: &str, params: &Params) -> DriverResult<Value> {
        let mut state = self.inner.write().expect("lock poisoned");
        let privileged = state.privilege_depth > 0;
        state.calls.push(DriverCall::Command {
            language: language.to_string(),
            text: text.to_string(),
            params: params.clone(),
            privileged,
        });
        Ok(state
            .canned_commands
            .get(&(language.to_string(), text.to_string()))
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn dialect(&self) -> &str {
        &self.dialect
    }

    fn enter_privileged(&self) -> DriverResult<()> {
        self.inner.write().expect("lock poisoned").privilege_depth += 1;
        Ok(())
    }

    fn exit_privileged(&self) {
        let mut state = self.inner.write().expect("lock poisoned");
        state.privilege_depth = state.privilege_depth.saturating_sub(1);
    }
}

impl std::fmt::Debug for InMemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read().expect("lock poisoned");
        f.debug_struct("InMemoryDriver")
            .field("dialect", &self.dialect)
            .field("types", &state.types.len())
            .field("records", &state.records.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transponder_types::ValueShape;

    fn type_def(name: &str) -> TypeDef {
        TypeDef {
            name: name.into(),
            is_abstract: false,
            owner: None,
            supertypes: Vec::new(),
        }
    }

    fn prop(type_name: &str, name: &str, order: u32) -> PropertyDef {
        PropertyDef {
            type_name: type_name.into(),
            name: name.into(),
            value_shape: ValueShape::Text,
            linked_type: None,
            order,
            markers: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    #[test]
    fn schema_calls_are_recorded_in_order() {
        let driver = InMemoryDriver::new();
        driver.create_type(&type_def("Person")).unwrap();
        driver.create_property(&prop("Person", "name", 0)).unwrap();
        driver
            .setup_relationship(&RelationshipDef {
                type_name: "Person".into(),
                property: "friend".into(),
                linked_type: "Person".into(),
                inverse: None,
            })
            .unwrap();

        let calls = driver.schema_calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], DriverCall::CreateType(_)));
        assert!(matches!(calls[1], DriverCall::CreateProperty(_)));
        assert!(matches!(calls[2], DriverCall::SetupRelationship(_)));
        assert_eq!(driver.properties_of("Person").len(), 1);
    }

    #[test]
    fn property_requires_existing_type() {
        let driver = InMemoryDriver::new();
        let err = driver.create_property(&prop("Ghost", "name", 0)).unwrap_err();
        assert!(matches!(err, DriverError::UnknownType(t) if t == "Ghost"));
    }

    #[test]
    fn relationship_to_missing_type_is_accepted() {
        let driver = InMemoryDriver::new();
        driver
            .setup_relationship(&RelationshipDef {
                type_name: "A".into(),
                property: "b".into(),
                linked_type: "Missing".into(),
                inverse: None,
            })
            .unwrap();
        assert_eq!(driver.relationships()[0].linked_type, "Missing");
    }

    #[test]
    fn injected_type_failure() {
        let driver = InMemoryDriver::new();
        driver.fail_on_type("Broken");
        assert!(driver.create_type(&type_def("Broken")).is_err());
        assert!(driver.type_def("Broken").is_none());
    }

    // -----------------------------------------------------------------------
    // Instances
    // -----------------------------------------------------------------------

    #[test]
    fn instance_roundtrip() {
        let driver = InMemoryDriver::new();
        driver.create_type(&type_def("Person")).unwrap();
        let person = driver.new_entity_instance("Person").unwrap();
        assert_eq!(person.type_name, "Person");

        assert_eq!(driver.get_property_value(&person, "name").unwrap(), Value::Null);
        driver
            .set_property_value(&person, "name", Value::from("Ada"))
            .unwrap();
        assert_eq!(
            driver.get_property_value(&person, "name").unwrap(),
            Value::from("Ada")
        );

        let wrapped = driver.wrap_entity_instance(&Value::Text(person.id.clone())).unwrap();
        assert_eq!(wrapped, person);
    }

    #[test]
    fn abstract_and_unknown_types_cannot_be_instantiated() {
        let driver = InMemoryDriver::new();
        driver
            .create_type(&TypeDef {
                is_abstract: true,
                ..type_def("Base")
            })
            .unwrap();
        assert!(matches!(
            driver.new_entity_instance("Base"),
            Err(DriverError::AbstractType(_))
        ));
        assert!(matches!(
            driver.new_entity_instance("Nope"),
            Err(DriverError::UnknownType(_))
        ));
    }

    #[test]
    fn wrap_rejects_non_entity_seed() {
        let driver = InMemoryDriver::new();
        assert!(matches!(
            driver.wrap_entity_instance(&Value::Int(1)),
            Err(DriverError::InvalidSeed("int"))
        ));
    }

    // -----------------------------------------------------------------------
    // Queries and privilege
    // -----------------------------------------------------------------------

    #[test]
    fn canned_queries_and_privilege_flag() {
        let driver = InMemoryDriver::new();
        driver.register_query("sql", "select", vec![Value::Int(1), Value::Int(2)]);

        let params = Params::new();
        assert_eq!(driver.query("sql", "select", &params).unwrap().len(), 2);
        assert_eq!(
            driver.query_single("sql", "select", &params).unwrap(),
            Some(Value::Int(1))
        );
        assert!(driver.query("sql", "other", &params).unwrap().is_empty());

        driver.enter_privileged().unwrap();
        driver.command("sql", "delete", &params).unwrap();
        driver.exit_privileged();

        let privileged: Vec<bool> = driver
            .calls()
            .iter()
            .filter_map(|c| match c {
                DriverCall::Query { privileged, .. } | DriverCall::Command { privileged, .. } => {
                    Some(*privileged)
                }
                _ => None,
            })
            .collect();
        assert_eq!(privileged, vec![false, false, false, true]);
    }
}
