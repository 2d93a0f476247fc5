use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use transponder_driver::RelationshipDef;
use transponder_types::ShapeId;

/// Shapes already described into the driver, and the type names they got.
///
/// Outlives a single batch: a shape recorded here is never described again.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    shapes: BTreeMap<ShapeId, String>,
    types: BTreeSet<String>,
    /// Relationships left pending by a batch that ended without closing.
    #[serde(default)]
    parked: Vec<RelationshipDef>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, shape: ShapeId, type_name: impl Into<String>) {
        let type_name = type_name.into();
        self.types.insert(type_name.clone());
        self.shapes.insert(shape, type_name);
    }

    /// Type name a shape was described as.
    pub fn type_name(&self, shape: &ShapeId) -> Option<&str> {
        self.shapes.get(shape).map(String::as_str)
    }

    pub fn is_described(&self, shape: &ShapeId) -> bool {
        self.shapes.contains_key(shape)
    }

    /// Whether some described shape produced a type of this name.
    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.contains(type_name)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn shapes(&self) -> impl Iterator<Item = (&ShapeId, &str)> {
        self.shapes.iter().map(|(id, name)| (id, name.as_str()))
    }

    pub fn park(&mut self, relationships: impl IntoIterator<Item = RelationshipDef>) {
        self.parked.extend(relationships);
    }

    pub fn parked(&self) -> &[RelationshipDef] {
        &self.parked
    }

    pub fn take_parked(&mut self) -> Vec<RelationshipDef> {
        std::mem::take(&mut self.parked)
    }
}
