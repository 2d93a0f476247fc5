use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::marker::{Marker, QuerySpec};
use crate::shape::{ShapeId, ValueShape};
use crate::value::{EntityRef, Value};

/// Identity of a method: name, ordered parameter shapes, return shape.
///
/// Used as a map key throughout dispatch compilation and proxy invocation.
/// Never mutated after construction.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodKey {
    pub name: String,
    pub params: Vec<ValueShape>,
    pub returns: ValueShape,
}

/// Accessor convention a method name follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    /// `getX()` with a non-void return.
    Getter,
    /// `isX()` returning bool.
    BoolGetter,
    /// `setX(value)`.
    Setter,
}

impl AccessorKind {
    pub fn is_read(self) -> bool {
        matches!(self, Self::Getter | Self::BoolGetter)
    }
}

impl MethodKey {
    pub fn new(name: impl Into<String>, params: Vec<ValueShape>, returns: ValueShape) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
        }
    }

    /// Classify the method by accessor naming convention and derive the
    /// property name it addresses.
    pub fn accessor(&self) -> Option<(AccessorKind, String)> {
        let name = self.name.as_str();
        if let Some(rest) = name.strip_prefix("get") {
            if self.params.is_empty() && self.returns != ValueShape::Void {
                return decapitalize(rest).map(|p| (AccessorKind::Getter, p));
            }
        }
        if let Some(rest) = name.strip_prefix("is") {
            if self.params.is_empty() && self.returns == ValueShape::Bool {
                return decapitalize(rest).map(|p| (AccessorKind::BoolGetter, p));
            }
        }
        if let Some(rest) = name.strip_prefix("set") {
            if self.params.len() == 1 {
                return decapitalize(rest).map(|p| (AccessorKind::Setter, p));
            }
        }
        None
    }

    /// Shape of the value an accessor reads or writes.
    pub fn accessor_value_shape(&self, kind: AccessorKind) -> &ValueShape {
        match kind {
            AccessorKind::Getter | AccessorKind::BoolGetter => &self.returns,
            AccessorKind::Setter => &self.params[0],
        }
    }
}

/// `Name` -> `name`, `URL` -> `URL`; empty or lowercase-led remainders are
/// not accessors.
fn decapitalize(rest: &str) -> Option<String> {
    let mut chars = rest.chars();
    let first = chars.next()?;
    if first.is_lowercase() {
        return None;
    }
    if chars.clone().next().is_some_and(char::is_uppercase) {
        return Some(rest.to_string());
    }
    Some(first.to_lowercase().chain(chars).collect())
}

impl fmt::Debug for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodKey({self})")
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ") -> {}", self.returns)
    }
}

/// Error type returned by method bodies.
pub type BodyError = Box<dyn std::error::Error + Send + Sync>;

/// The object a method body runs against.
///
/// Implemented by generated proxies so that a default method body can call
/// back into the other methods of its own shape.
pub trait Receiver {
    /// Shape the receiver implements.
    fn shape(&self) -> &ShapeId;

    /// Entity instance the receiver is bound to, if any.
    fn seed(&self) -> Option<EntityRef>;

    /// Call another method of the receiver by name.
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, BodyError>;
}

/// A method's own implementation (a "default method").
pub trait MethodBody: Send + Sync {
    fn call(&self, this: &dyn Receiver, args: &[Value]) -> Result<Value, BodyError>;
}

impl<F> MethodBody for F
where
    F: Fn(&dyn Receiver, &[Value]) -> Result<Value, BodyError> + Send + Sync,
{
    fn call(&self, this: &dyn Receiver, args: &[Value]) -> Result<Value, BodyError> {
        self(this, args)
    }
}

/// One declared method of a shape.
#[derive(Clone)]
pub struct MethodDecl {
    pub key: MethodKey,
    /// Parameter names, parallel to `key.params`. Used to bind query parameters.
    pub param_names: Vec<String>,
    pub markers: Vec<Marker>,
    /// Shape that declared this method; stamped by the shape builder.
    pub declared_in: ShapeId,
    pub is_default: bool,
    pub is_static: bool,
    pub body: Option<Arc<dyn MethodBody>>,
}

impl MethodDecl {
    /// A method taking no parameters and returning nothing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: MethodKey::new(name, Vec::new(), ValueShape::Void),
            param_names: Vec::new(),
            markers: Vec::new(),
            declared_in: ShapeId::new(""),
            is_default: false,
            is_static: false,
            body: None,
        }
    }

    pub fn getter(name: impl Into<String>, shape: ValueShape) -> Self {
        Self::new(name).returns(shape)
    }

    pub fn setter(name: impl Into<String>, shape: ValueShape) -> Self {
        Self::new(name).param("value", shape)
    }

    pub fn param(mut self, name: impl Into<String>, shape: ValueShape) -> Self {
        self.param_names.push(name.into());
        self.key.params.push(shape);
        self
    }

    pub fn returns(mut self, shape: ValueShape) -> Self {
        self.key.returns = shape;
        self
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Attach a body; the method becomes a default method.
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&dyn Receiver, &[Value]) -> Result<Value, BodyError> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self.is_default = true;
        self
    }

    pub fn default_method(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn has_marker(&self, tag: &str) -> bool {
        self.markers.iter().any(|m| m.tag() == tag)
    }

    pub fn accessor(&self) -> Option<(AccessorKind, String)> {
        self.key.accessor()
    }

    pub fn is_getter(&self) -> bool {
        self.accessor().is_some_and(|(kind, _)| kind.is_read())
    }

    pub fn is_setter(&self) -> bool {
        self.accessor()
            .is_some_and(|(kind, _)| kind == AccessorKind::Setter)
    }

    /// The `Property` marker's fields, if one is present.
    pub fn property_marker(&self) -> Option<(Option<&str>, Option<&str>, Option<&str>)> {
        self.markers.iter().find_map(|m| match m {
            Marker::Property {
                name,
                linked,
                inverse,
            } => Some((name.as_deref(), linked.as_deref(), inverse.as_deref())),
            _ => None,
        })
    }

    /// Property this method addresses: explicit marker name, else the
    /// accessor-derived name.
    pub fn property_name(&self) -> Option<String> {
        if let Some((Some(name), _, _)) = self.property_marker() {
            return Some(name.to_string());
        }
        self.accessor().map(|(_, name)| name)
    }

    /// Query specs of every marker carrying the given tag, in declaration order.
    pub fn query_specs(&self, tag: &str) -> Vec<&QuerySpec> {
        self.markers
            .iter()
            .filter(|m| m.tag() == tag)
            .filter_map(|m| match m {
                Marker::Query(q) | Marker::Lookup(q) | Marker::Command(q) => Some(q),
                _ => None,
            })
            .collect()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.markers.iter().find_map(|m| match m {
            Marker::DefaultValue(v) => Some(v),
            _ => None,
        })
    }
}

impl fmt::Debug for MethodDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDecl")
            .field("key", &self.key)
            .field("declared_in", &self.declared_in)
            .field("markers", &self.markers)
            .field("is_default", &self.is_default)
            .field("is_static", &self.is_static)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}
