//! High-level SDK for Transponder.
//!
//! [`Transponder`] is the batch API: describe entity shapes into a driver's
//! schema, then create, provide or look up proxies that implement shapes on
//! top of that driver.
//!
//! ```rust
//! use std::sync::Arc;
//! use transponder_driver::InMemoryDriver;
//! use transponder_sdk::Transponder;
//! use transponder_types::{MethodDecl, ShapeDecl, ShapeId, Value, ValueShape};
//!
//! let transponder = Transponder::from_shapes(
//!     [ShapeDecl::entity("Person")
//!         .method(MethodDecl::getter("getName", ValueShape::Text))
//!         .method(MethodDecl::setter("setName", ValueShape::Text))
//!         .build()
//!         .unwrap()],
//!     Arc::new(InMemoryDriver::new()),
//! )
//! .unwrap();
//!
//! let person = ShapeId::new("Person");
//! let ada = transponder.describe(&[person.clone()]).unwrap().create(&person, None).unwrap();
//! ada.call("setName", vec![Value::from("Ada")]).unwrap();
//! assert_eq!(ada.call("getName", vec![]).unwrap(), Value::from("Ada"));
//! ```

pub mod config;
pub mod error;
pub mod transponder;

pub use config::TransponderConfig;
pub use error::{SdkError, SdkResult};
pub use transponder::Transponder;

// Re-export key types
pub use transponder_describe::{DescribeReport, SchemaRegistry};
pub use transponder_dispatch::{PassThroughTranslator, QueryTranslator, RuleSet, Strategy};
pub use transponder_driver::{Driver, InMemoryDriver};
pub use transponder_proxy::{CacheStats, Proxy};
pub use transponder_types::{Marker, MethodDecl, ShapeCatalog, ShapeDecl, ShapeId, Value, ValueShape};
