use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::method::MethodDecl;

/// Identifier of a declared shape.
///
/// Shape ids are the keys of the [`ShapeCatalog`](crate::ShapeCatalog). They
/// are distinct from the type names a shape is described under: a shape may
/// carry a [`TypeMarker`] that renames it on the driver side.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(String);

impl ShapeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeId({})", self.0)
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShapeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ShapeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Declared shape of a parameter, return value, or property.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueShape {
    Void,
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    DateTime,
    Any,
    /// Reference to another declared shape (possibly not yet registered).
    Shape(ShapeId),
    List(Box<ValueShape>),
    Set(Box<ValueShape>),
    /// Key shape, value shape.
    Map(Box<ValueShape>, Box<ValueShape>),
}

impl ValueShape {
    pub fn shape(id: impl Into<ShapeId>) -> Self {
        Self::Shape(id.into())
    }

    pub fn list_of(inner: ValueShape) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn set_of(inner: ValueShape) -> Self {
        Self::Set(Box::new(inner))
    }

    pub fn map_of(key: ValueShape, value: ValueShape) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// The shape id this value shape refers to directly, if any.
    pub fn shape_ref(&self) -> Option<&ShapeId> {
        match self {
            Self::Shape(id) => Some(id),
            _ => None,
        }
    }

    /// Element shape of a collection, or the value shape of a map.
    pub fn element(&self) -> Option<&ValueShape> {
        match self {
            Self::List(inner) | Self::Set(inner) => Some(inner),
            Self::Map(_, value) => Some(value),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Set(_) | Self::Map(..))
    }
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Text => f.write_str("text"),
            Self::Bytes => f.write_str("bytes"),
            Self::DateTime => f.write_str("datetime"),
            Self::Any => f.write_str("any"),
            Self::Shape(id) => write!(f, "{id}"),
            Self::List(inner) => write!(f, "list<{inner}>"),
            Self::Set(inner) => write!(f, "set<{inner}>"),
            Self::Map(k, v) => write!(f, "map<{k}, {v}>"),
        }
    }
}

/// Whether a shape describes a persisted record or a data-access object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Entity,
    Dao,
}

/// Type-level metadata of an entity shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMarker {
    /// Driver-side type name. Defaults to the shape id.
    pub name: Option<String>,
    pub is_abstract: bool,
    /// Opaque owner tag forwarded to the driver's `create_type`.
    pub owner: Option<String>,
    /// Supertype names that have no declared shape of their own.
    pub extra_supertypes: Vec<String>,
}

/// Kind of index requested from the driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    #[default]
    NotUnique,
    Unique,
    FullText,
    Dictionary,
}

/// Entity-level index over a list of property names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDecl {
    pub name: String,
    pub kind: IndexKind,
    pub properties: Vec<String>,
}

impl IndexDecl {
    pub fn new(
        name: impl Into<String>,
        kind: IndexKind,
        properties: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }
}

/// An entity or data-access-object shape.
///
/// Methods are kept in declaration order; that order drives property
/// ordering during description and rule expansion order during dispatch
/// compilation.
#[derive(Clone, Debug)]
pub struct ShapeDecl {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub type_marker: TypeMarker,
    /// Directly declared supertype shapes, in declaration order.
    pub supertypes: Vec<ShapeId>,
    pub methods: Vec<MethodDecl>,
    pub indexes: Vec<IndexDecl>,
}

impl ShapeDecl {
    /// Start building an entity shape.
    pub fn entity(id: impl Into<ShapeId>) -> ShapeBuilder {
        ShapeBuilder::new(id.into(), ShapeKind::Entity)
    }

    /// Start building a data-access-object shape.
    pub fn dao(id: impl Into<ShapeId>) -> ShapeBuilder {
        ShapeBuilder::new(id.into(), ShapeKind::Dao)
    }

    pub fn is_entity(&self) -> bool {
        self.kind == ShapeKind::Entity
    }

    /// The driver-side type name this shape is described under.
    pub fn type_name(&self) -> &str {
        self.type_marker
            .name
            .as_deref()
            .unwrap_or_else(|| self.id.as_str())
    }

    /// Methods that take part in property discovery: neither default nor static.
    pub fn accessor_candidates(&self) -> impl Iterator<Item = &MethodDecl> {
        self.methods.iter().filter(|m| !m.is_default && !m.is_static)
    }
}

/// Fluent builder for [`ShapeDecl`].
pub struct ShapeBuilder {
    decl: ShapeDecl,
}

impl ShapeBuilder {
    fn new(id: ShapeId, kind: ShapeKind) -> Self {
        Self {
            decl: ShapeDecl {
                id,
                kind,
                type_marker: TypeMarker::default(),
                supertypes: Vec::new(),
                methods: Vec::new(),
                indexes: Vec::new(),
            },
        }
    }

    pub fn type_name(mut self, name: impl Into<String>) -> Self {
        self.decl.type_marker.name = Some(name.into());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.decl.type_marker.is_abstract = true;
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.decl.type_marker.owner = Some(owner.into());
        self
    }

    pub fn extends(mut self, supertype: impl Into<ShapeId>) -> Self {
        self.decl.supertypes.push(supertype.into());
        self
    }

    pub fn extra_supertype(mut self, name: impl Into<String>) -> Self {
        self.decl.type_marker.extra_supertypes.push(name.into());
        self
    }

    pub fn method(mut self, mut method: MethodDecl) -> Self {
        method.declared_in = self.decl.id.clone();
        self.decl.methods.push(method);
        self
    }

    pub fn index(mut self, index: IndexDecl) -> Self {
        self.decl.indexes.push(index);
        self
    }

    /// Validate and finish the declaration.
    pub fn build(self) -> TypeResult<ShapeDecl> {
        let decl = self.decl;
        if decl.id.as_str().is_empty() {
            return Err(TypeError::EmptyShapeId);
        }
        let mut seen = HashSet::new();
        for method in &decl.methods {
            if !seen.insert(&method.key) {
                return Err(TypeError::DuplicateMethod {
                    shape: decl.id.clone(),
                    method: method.key.to_string(),
                });
            }
        }
        if let Some(index) = decl.indexes.iter().find(|i| i.properties.is_empty()) {
            return Err(TypeError::EmptyIndex {
                shape: decl.id.clone(),
                index: index.name.clone(),
            });
        }
        Ok(decl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_of_collections() {
        let person = ValueShape::shape("Person");
        assert_eq!(ValueShape::list_of(person.clone()).element(), Some(&person));
        assert_eq!(ValueShape::set_of(person.clone()).element(), Some(&person));
        assert_eq!(
            ValueShape::map_of(ValueShape::Text, person.clone()).element(),
            Some(&person)
        );
        assert_eq!(ValueShape::Text.element(), None);
        assert_eq!(person.shape_ref(), Some(&ShapeId::new("Person")));
    }

    #[test]
    fn display_nested_shape() {
        let s = ValueShape::map_of(ValueShape::Text, ValueShape::list_of(ValueShape::Int));
        assert_eq!(s.to_string(), "map<text, list<int>>");
    }

    #[test]
    fn type_name_defaults_to_id() {
        let plain = ShapeDecl::entity("Person").build().unwrap();
        assert_eq!(plain.type_name(), "Person");
        let renamed = ShapeDecl::entity("Person").type_name("OPerson").build().unwrap();
        assert_eq!(renamed.type_name(), "OPerson");
    }

    #[test]
    fn builder_stamps_declaring_shape() {
        let decl = ShapeDecl::entity("Person")
            .method(MethodDecl::getter("getName", ValueShape::Text))
            .build()
            .unwrap();
        assert_eq!(decl.methods[0].declared_in, ShapeId::new("Person"));
    }

    #[test]
    fn builder_rejects_duplicate_methods() {
        let err = ShapeDecl::entity("Person")
            .method(MethodDecl::getter("getName", ValueShape::Text))
            .method(MethodDecl::getter("getName", ValueShape::Text))
            .build()
            .unwrap_err();
        assert!(matches!(err, TypeError::DuplicateMethod { .. }));
    }

    #[test]
    fn builder_rejects_empty_index_and_id() {
        let err = ShapeDecl::entity("Person")
            .index(IndexDecl::new("empty", IndexKind::Unique, Vec::<String>::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, TypeError::EmptyIndex { .. }));
        assert_eq!(
            ShapeDecl::dao("").build().unwrap_err(),
            TypeError::EmptyShapeId
        );
    }

    #[test]
    fn accessor_candidates_skip_default_and_static() {
        let decl = ShapeDecl::entity("Person")
            .method(MethodDecl::getter("getName", ValueShape::Text))
            .method(MethodDecl::new("describe").returns(ValueShape::Text).default_method())
            .method(MethodDecl::new("count").returns(ValueShape::Int).static_method())
            .build()
            .unwrap();
        let names: Vec<_> = decl
            .accessor_candidates()
            .map(|m| m.key.name.as_str())
            .collect();
        assert_eq!(names, vec!["getName"]);
    }
}
