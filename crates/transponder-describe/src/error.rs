//! Error types for entity description.

use transponder_driver::DriverError;
use transponder_types::ShapeId;

/// Errors that abort a description batch.
#[derive(Debug, thiserror::Error)]
pub enum DescribeError {
    /// A shape was asked to describe itself while already in progress,
    /// typically through a cyclic supertype chain.
    #[error("re-entrant description of {shape} (in progress: {path})")]
    Reentrancy {
        shape: ShapeId,
        /// Shapes on the description stack, outermost first.
        path: String,
    },

    /// Relationships still pending when the batch closed strictly.
    #[error("unsatisfied dependencies on undescribed types: {}", .missing.join(", "))]
    UnsatisfiedDependencies {
        /// Missing target type names, sorted and deduplicated.
        missing: Vec<String>,
    },

    #[error("unknown shape: {0}")]
    UnknownShape(ShapeId),

    #[error("shape {0} is not an entity shape")]
    NotAnEntity(ShapeId),

    /// The description stack did not unwind to the shape being finished.
    #[error("description stack out of balance at {0}")]
    Unbalanced(ShapeId),

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Convenience alias for description results.
pub type DescribeResult<T> = Result<T, DescribeError>;
