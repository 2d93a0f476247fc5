use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use transponder_types::{IndexKind, Marker, Value, ValueShape};

/// Named query/command parameters.
pub type Params = BTreeMap<String, Value>;

/// Arguments of `create_type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub is_abstract: bool,
    pub owner: Option<String>,
    pub supertypes: Vec<String>,
}

/// Arguments of `create_property`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub type_name: String,
    pub name: String,
    pub value_shape: ValueShape,
    pub linked_type: Option<String>,
    /// Stable position of the property within its type.
    pub order: u32,
    /// Markers of the accessor the property was declared through.
    pub markers: Vec<Marker>,
}

/// Arguments of `create_index`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub type_name: String,
    pub name: String,
    pub kind: IndexKind,
    pub markers: Vec<Marker>,
    pub properties: Vec<String>,
}

/// Arguments of `setup_relationship`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDef {
    pub type_name: String,
    pub property: String,
    pub linked_type: String,
    pub inverse: Option<String>,
}

/// One recorded driver call, as kept by [`InMemoryDriver`](crate::InMemoryDriver).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DriverCall {
    CreateType(TypeDef),
    CreateProperty(PropertyDef),
    CreateIndex(IndexDef),
    SetupRelationship(RelationshipDef),
    Query {
        language: String,
        text: String,
        params: Params,
        privileged: bool,
    },
    Command {
        language: String,
        text: String,
        params: Params,
        privileged: bool,
    },
}

impl DriverCall {
    /// Returns `true` for the four schema calls issued by the describer.
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            Self::CreateType(_)
                | Self::CreateProperty(_)
                | Self::CreateIndex(_)
                | Self::SetupRelationship(_)
        )
    }
}
