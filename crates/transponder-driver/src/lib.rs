//! Storage driver contract for Transponder.
//!
//! The driver is the only component that talks to a concrete store. The
//! entity describer drives its schema half (types, properties, indexes,
//! relationships); generated proxies drive its data half (property values,
//! instances, queries, commands).
//!
//! # Backends
//!
//! All backends implement the [`Driver`] trait:
//!
//! - [`InMemoryDriver`] -- map-based store that records every call, for tests
//!   and embedding
//!
//! # Design Rules
//!
//! 1. Every call is synchronous and may fail with a [`DriverError`].
//! 2. Callers treat any failure as fatal: no retries, no rollback.
//! 3. Schema calls carry names, not handles; a linked type name may refer to
//!    a type that does not exist yet.

pub mod defs;
pub mod error;
pub mod memory;
pub mod traits;

pub use defs::{DriverCall, IndexDef, Params, PropertyDef, RelationshipDef, TypeDef};
pub use error::{DriverError, DriverResult};
pub use memory::InMemoryDriver;
pub use traits::Driver;
