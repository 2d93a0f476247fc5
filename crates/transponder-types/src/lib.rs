//! Foundation types for Transponder.
//!
//! This crate provides the shape model every other Transponder crate builds
//! on: how a data-access contract is declared, how its methods are keyed, and
//! the values that flow through generated implementations.
//!
//! # Key Types
//!
//! - [`MethodKey`]: Identity of a method: name, parameter shapes, return shape
//! - [`ValueShape`]: Declared shape of a parameter, return value, or property
//! - [`Marker`]: Declarative method-level metadata (property, query, default, ...)
//! - [`MethodDecl`]: One declared method of a shape, with its markers and body
//! - [`ShapeDecl`]: An entity or data-access-object shape
//! - [`ShapeCatalog`]: Registry resolving shape ids, including forward references
//! - [`Value`]: Runtime value passed to and returned from shape methods

pub mod catalog;
pub mod error;
pub mod marker;
pub mod method;
pub mod shape;
pub mod value;

pub use catalog::ShapeCatalog;
pub use error::{TypeError, TypeResult};
pub use marker::{Marker, QuerySpec};
pub use method::{AccessorKind, BodyError, MethodBody, MethodDecl, MethodKey, Receiver};
pub use shape::{
    IndexDecl, IndexKind, ShapeBuilder, ShapeDecl, ShapeId, ShapeKind, TypeMarker, ValueShape,
};
pub use value::{EntityRef, Value};
