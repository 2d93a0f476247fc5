//! Dispatch rule compiler for Transponder.
//!
//! Every method of a generated implementation is served by a composed
//! strategy: one terminal strategy that produces the result, wrapped by any
//! number of wrapping strategies (default values, privilege elevation,
//! caller-supplied advice). This crate decides which composition serves
//! which method.
//!
//! # Pipeline
//!
//! 1. [`MethodView`] flattens a shape hierarchy into one declaration per
//!    method signature.
//! 2. [`StrategyCatalog::expand`] turns declarative markers into [`Rule`]s,
//!    one per distinct marker, plus override rules.
//! 3. [`compile`] enumerates subsets of the live rules and binds every
//!    method to the chain built from exactly the rules that match it.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use transponder_dispatch::{DispatchConfig, MethodView, PassThroughTranslator, RuleSet, StrategyCatalog};
//! use transponder_types::{Marker, MethodDecl, ShapeCatalog, ShapeDecl, ShapeId, Value, ValueShape};
//!
//! let shapes = ShapeCatalog::from_shapes([ShapeDecl::entity("Person")
//!     .method(
//!         MethodDecl::getter("getName", ValueShape::Text)
//!             .marker(Marker::DefaultValue(Value::from("anonymous"))),
//!     )
//!     .build()
//!     .unwrap()])
//! .unwrap();
//!
//! let view = MethodView::build(&shapes, &ShapeId::new("Person"), &[]);
//! let catalog = StrategyCatalog::builtin(Arc::new(PassThroughTranslator));
//! let compiled = catalog
//!     .compile(&view, true, &RuleSet::new(), &DispatchConfig::default())
//!     .unwrap();
//!
//! let key = &view.methods()[0].key;
//! assert_eq!(compiled.layers(key).unwrap(), vec!["default-value", "get"]);
//! ```

pub mod builtins;
pub mod catalog;
pub mod compiler;
pub mod config;
pub mod error;
pub mod rule;
pub mod strategy;
pub mod translate;
pub mod view;

pub use catalog::StrategyCatalog;
pub use compiler::{compile, CompileStats, CompiledDispatch};
pub use config::{DispatchConfig, MAX_LIVE_RULES};
pub use error::{ConfigError, DispatchError, DispatchResult};
pub use rule::{Matcher, Priority, Rule, RuleKind, RuleSet};
pub use strategy::{Call, Chain, Handler, Interceptor, Strategy, Target};
pub use translate::{PassThroughTranslator, QueryTranslator};
pub use view::MethodView;
