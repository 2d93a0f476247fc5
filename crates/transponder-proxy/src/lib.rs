//! Proxy materializer for Transponder.
//!
//! A [`Materializer`] turns a shape (plus optional capability shapes) into a
//! [`Proxy`]: an object whose every method call is answered by the compiled
//! dispatch chain for that method. Compiled dispatch is shared between all
//! proxies of the same shape and capability set through a [`DispatchCache`].
//!
//! ```rust
//! use std::sync::Arc;
//! use transponder_driver::{Driver, InMemoryDriver, TypeDef};
//! use transponder_proxy::{Materializer, MaterializerConfig};
//! use transponder_types::{MethodDecl, ShapeCatalog, ShapeDecl, ShapeId, Value, ValueShape};
//!
//! let catalog = ShapeCatalog::from_shapes([ShapeDecl::entity("Person")
//!     .method(MethodDecl::getter("getName", ValueShape::Text))
//!     .method(MethodDecl::setter("setName", ValueShape::Text))
//!     .build()
//!     .unwrap()])
//! .unwrap();
//! let driver = Arc::new(InMemoryDriver::new());
//! driver
//!     .create_type(&TypeDef {
//!         name: "Person".into(),
//!         is_abstract: false,
//!         owner: None,
//!         supertypes: Vec::new(),
//!     })
//!     .unwrap();
//! let seed = driver.new_entity_instance("Person").unwrap();
//!
//! let materializer =
//!     Materializer::new(Arc::new(catalog), driver, &MaterializerConfig::default());
//! let ada = materializer
//!     .materialize(&ShapeId::new("Person"), Some(seed))
//!     .unwrap();
//! ada.call("setName", vec![Value::from("Ada")]).unwrap();
//! assert_eq!(ada.call("getName", vec![]).unwrap(), Value::from("Ada"));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod materializer;
pub mod proxy;

pub use cache::{CacheKey, CacheStats, DispatchCache};
pub use config::CacheConfig;
pub use error::{ProxyError, ProxyResult};
pub use materializer::{Materializer, MaterializerConfig};
pub use proxy::Proxy;
