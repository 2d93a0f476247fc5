use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};
use transponder_describe::{DescribeError, DescribeReport, Describer, SchemaRegistry};
use transponder_dispatch::{QueryTranslator, RuleSet, Strategy};
use transponder_driver::Driver;
use transponder_proxy::{CacheStats, Materializer, Proxy};
use transponder_types::{ShapeCatalog, ShapeDecl, ShapeId, Value};

use crate::config::TransponderConfig;
use crate::error::SdkResult;

/// High-level Transponder API.
///
/// Owns the shape catalog, the driver, the schema registry that remembers
/// what has been described, and the materializer that hands out proxies.
pub struct Transponder {
    catalog: Arc<ShapeCatalog>,
    driver: Arc<dyn Driver>,
    registry: Mutex<SchemaRegistry>,
    materializer: Materializer,
    config: TransponderConfig,
}

impl Transponder {
    pub fn new(catalog: ShapeCatalog, driver: Arc<dyn Driver>) -> Self {
        Self::with_config(catalog, driver, TransponderConfig::default())
    }

    pub fn with_config(
        catalog: ShapeCatalog,
        driver: Arc<dyn Driver>,
        config: TransponderConfig,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let materializer = Materializer::new(
            Arc::clone(&catalog),
            Arc::clone(&driver),
            &config.materializer(),
        );
        Self {
            catalog,
            driver,
            registry: Mutex::new(SchemaRegistry::new()),
            materializer,
            config,
        }
    }

    /// Build the catalog from shape declarations.
    pub fn from_shapes(
        shapes: impl IntoIterator<Item = ShapeDecl>,
        driver: Arc<dyn Driver>,
    ) -> SdkResult<Self> {
        Ok(Self::new(ShapeCatalog::from_shapes(shapes)?, driver))
    }

    pub fn catalog(&self) -> &ShapeCatalog {
        &self.catalog
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn config(&self) -> &TransponderConfig {
        &self.config
    }

    // ---- Schema ----

    /// Describe entity shapes into the driver as one batch, closing it with
    /// the configured strictness.
    pub fn describe(&self, shapes: &[ShapeId]) -> SdkResult<&Self> {
        self.describe_with(shapes, self.config.strict_close)?;
        Ok(self)
    }

    /// Describe entity shapes as one batch and report what was emitted.
    ///
    /// Shapes described by an earlier batch are skipped.
    pub fn describe_with(&self, shapes: &[ShapeId], strict: bool) -> SdkResult<DescribeReport> {
        let mut registry = self.registry.lock();
        let mut describer = Describer::new(&self.catalog, self.driver.as_ref(), &mut registry);
        describer.describe(shapes)?;
        let report = describer.close(strict)?;
        info!(
            requested = shapes.len(),
            described = report.described.len(),
            unsatisfied = report.unsatisfied.len(),
            "describe batch closed"
        );
        Ok(report)
    }

    pub fn is_described(&self, shape: &ShapeId) -> bool {
        self.registry.lock().is_described(shape)
    }

    /// Snapshot of everything described so far.
    pub fn registry(&self) -> SchemaRegistry {
        self.registry.lock().clone()
    }

    /// Type name of an entity shape, describing it first if needed.
    fn type_name_of(&self, shape: &ShapeId) -> SdkResult<String> {
        if let Some(name) = self.registry.lock().type_name(shape) {
            return Ok(name.to_string());
        }
        debug!(shape = %shape, "describing on first use");
        self.describe(std::slice::from_ref(shape))?;
        let name = self
            .registry
            .lock()
            .type_name(shape)
            .map(str::to_string)
            .ok_or_else(|| DescribeError::UnknownShape(shape.clone()))?;
        Ok(name)
    }

    // ---- Instances ----

    /// Create a new entity instance and return a proxy bound to it.
    ///
    /// `type_name` selects a store type other than the shape's own, such
    /// as a subtype created outside the catalog.
    pub fn create(&self, shape: &ShapeId, type_name: Option<&str>) -> SdkResult<Proxy> {
        let described = self.type_name_of(shape)?;
        let type_name = type_name.unwrap_or(described.as_str());
        let seed = self.driver.new_entity_instance(type_name)?;
        debug!(shape = %shape, instance = %seed, "created instance");
        Ok(self.materializer.materialize(shape, Some(seed))?)
    }

    /// Proxy for an existing instance. `seed` is anything the driver can
    /// resolve: an entity value or an id.
    pub fn provide(&self, seed: &Value, shape: &ShapeId) -> SdkResult<Proxy> {
        let seed = self.driver.wrap_entity_instance(seed)?;
        Ok(self.materializer.materialize(shape, Some(seed))?)
    }

    /// Proxy for a data-access-object shape.
    pub fn dao(&self, shape: &ShapeId) -> SdkResult<Proxy> {
        Ok(self.materializer.materialize(shape, None)?)
    }

    /// Proxy for a shape combined with extra capability shapes.
    pub fn dao_with(&self, shape: &ShapeId, capabilities: &[ShapeId]) -> SdkResult<Proxy> {
        Ok(self.materializer.materialize_with(shape, capabilities, None)?)
    }

    // ---- Dispatch configuration ----

    pub fn set_translator(&self, translator: Arc<dyn QueryTranslator>) -> &Self {
        self.materializer.set_translator(translator);
        self
    }

    pub fn register_strategy(&self, name: impl Into<String>, strategy: Strategy) -> &Self {
        self.materializer.register_strategy(name, strategy);
        self
    }

    pub fn bind_tag(&self, tag: impl Into<String>, strategy: impl Into<String>) -> &Self {
        self.materializer.bind_tag(tag, strategy);
        self
    }

    pub fn add_rules(&self, rules: RuleSet) -> &Self {
        self.materializer.add_rules(rules);
        self
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.materializer.cache_stats()
    }
}

impl std::fmt::Debug for Transponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transponder")
            .field("shapes", &self.catalog.len())
            .field("described", &self.registry.lock().len())
            .field("config", &self.config)
            .finish()
    }
}
