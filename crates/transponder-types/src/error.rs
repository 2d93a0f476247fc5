use thiserror::Error;

use crate::shape::ShapeId;

/// Errors produced while declaring or registering shapes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("shape id must not be empty")]
    EmptyShapeId,

    #[error("shape already registered: {0}")]
    DuplicateShape(ShapeId),

    #[error("shape {shape} declares method {method} twice")]
    DuplicateMethod { shape: ShapeId, method: String },

    #[error("shape {shape} has an index with no properties: {index}")]
    EmptyIndex { shape: ShapeId, index: String },
}

/// Result alias for shape model operations.
pub type TypeResult<T> = Result<T, TypeError>;
