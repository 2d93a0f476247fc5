//! Dependency-ordered entity describer for Transponder.
//!
//! Entity shapes form an arbitrary graph: self-references, mutual pairs and
//! diamonds are all legal. The [`Describer`] turns any set of them into
//! driver schema calls so that the resulting schema does not depend on the
//! order in which shapes were requested.
//!
//! # Quick Start
//!
//! ```rust
//! use transponder_describe::{Describer, SchemaRegistry};
//! use transponder_driver::InMemoryDriver;
//! use transponder_types::{MethodDecl, ShapeCatalog, ShapeDecl, ShapeId, ValueShape};
//!
//! let catalog = ShapeCatalog::from_shapes([ShapeDecl::entity("Node")
//!     .method(MethodDecl::getter("getParent", ValueShape::shape("Node")))
//!     .build()
//!     .unwrap()])
//! .unwrap();
//! let driver = InMemoryDriver::new();
//! let mut registry = SchemaRegistry::new();
//!
//! let mut describer = Describer::new(&catalog, &driver, &mut registry);
//! describer.describe(&[ShapeId::new("Node")]).unwrap();
//! let report = describer.close(true).unwrap();
//!
//! assert_eq!(report.type_names(), vec!["Node"]);
//! assert_eq!(driver.relationships().len(), 1);
//! ```

pub mod context;
pub mod describer;
pub mod error;
pub mod registry;
pub mod report;

pub use context::{DescriptionContext, Frame, PendingProperty, PendingRelationship};
pub use describer::Describer;
pub use error::{DescribeError, DescribeResult};
pub use registry::SchemaRegistry;
pub use report::{DescribeReport, EntityDescriptor, PropertyDescriptor};
