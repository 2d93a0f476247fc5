use serde::{Deserialize, Serialize};
use transponder_driver::RelationshipDef;
use transponder_types::{ShapeId, ValueShape};

/// A stored property as described into the driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub order: u32,
    pub value_shape: ValueShape,
    pub linked_type: Option<String>,
}

/// An entity type as described into the driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub shape: ShapeId,
    pub type_name: String,
    pub is_abstract: bool,
    pub supertypes: Vec<String>,
    pub properties: Vec<PropertyDescriptor>,
    /// Names of the indexes created for the type.
    pub indexes: Vec<String>,
}

impl EntityDescriptor {
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Outcome of one description batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DescribeReport {
    /// Entities described in this batch, in completion order.
    pub described: Vec<EntityDescriptor>,
    /// Relationships whose target was never described, set up anyway by a
    /// non-strict close.
    pub unsatisfied: Vec<RelationshipDef>,
}

impl DescribeReport {
    pub fn entity(&self, type_name: &str) -> Option<&EntityDescriptor> {
        self.described.iter().find(|e| e.type_name == type_name)
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.described.iter().map(|e| e.type_name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.described.is_empty() && self.unsatisfied.is_empty()
    }
}
