//! Builds proxies from shapes, sharing compiled dispatch through the cache.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use transponder_dispatch::{
    CompiledDispatch, DispatchConfig, MethodView, PassThroughTranslator, QueryTranslator, RuleSet,
    Strategy, StrategyCatalog,
};
use transponder_driver::Driver;
use transponder_types::{EntityRef, ShapeCatalog, ShapeId};

use crate::cache::{CacheKey, CacheStats, DispatchCache};
use crate::config::CacheConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::Proxy;

/// Configuration of a [`Materializer`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializerConfig {
    pub cache: CacheConfig,
    pub dispatch: DispatchConfig,
}

/// Produces proxies for shapes.
///
/// Compiled dispatch is cached per (shape, capability set). Anything that
/// changes how methods compile (strategies, tag bindings, the query
/// translator) invalidates the whole cache.
pub struct Materializer {
    catalog: Arc<ShapeCatalog>,
    driver: Arc<dyn Driver>,
    strategies: RwLock<StrategyCatalog>,
    rules: RwLock<RuleSet>,
    cache: DispatchCache,
    dispatch: DispatchConfig,
}

impl Materializer {
    pub fn new(
        catalog: Arc<ShapeCatalog>,
        driver: Arc<dyn Driver>,
        config: &MaterializerConfig,
    ) -> Self {
        Self {
            catalog,
            driver,
            strategies: RwLock::new(StrategyCatalog::builtin(Arc::new(PassThroughTranslator))),
            rules: RwLock::new(RuleSet::new()),
            cache: DispatchCache::new(&config.cache),
            dispatch: config.dispatch.clone(),
        }
    }

    pub fn catalog(&self) -> &Arc<ShapeCatalog> {
        &self.catalog
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    // ---------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------

    /// Replace the query translator. Every cached dispatch is dropped.
    pub fn set_translator(&self, translator: Arc<dyn QueryTranslator>) {
        let mut strategies = self.strategies.write();
        info!(translator = translator.name(), "replacing query translator");
        strategies.set_translator(translator);
        self.cache.invalidate();
    }

    /// Register a named strategy, usable from `Delegate`/`Advice` markers
    /// and tag bindings.
    pub fn register_strategy(&self, name: impl Into<String>, strategy: Strategy) {
        let mut strategies = self.strategies.write();
        strategies.register(name, strategy);
        self.cache.invalidate();
    }

    /// Route markers tagged `tag` to a registered strategy.
    pub fn bind_tag(&self, tag: impl Into<String>, strategy: impl Into<String>) {
        let mut strategies = self.strategies.write();
        strategies.bind_tag(tag, strategy);
        self.cache.invalidate();
    }

    /// Append caller rules, applied after marker rules for every shape.
    pub fn add_rules(&self, rules: RuleSet) {
        let _strategies = self.strategies.write();
        self.rules.write().extend(rules);
        self.cache.invalidate();
    }

    // ---------------------------------------------------------------
    // Materialization
    // ---------------------------------------------------------------

    /// Compiled dispatch for a shape and its extra capabilities.
    pub fn dispatch_for(
        &self,
        shape: &ShapeId,
        capabilities: &[ShapeId],
    ) -> ProxyResult<Arc<CompiledDispatch>> {
        for id in std::iter::once(shape).chain(capabilities) {
            if !self.catalog.contains(id) {
                return Err(ProxyError::UnknownShape(id.clone()));
            }
        }
        let key = CacheKey::new(shape.clone(), capabilities.iter().cloned());
        let compiled = self.cache.get_or_compile(&key, || {
            let view = MethodView::build(&self.catalog, &key.shape, &key.capability_list());
            let entity = self.catalog.is_entity(&key.shape);
            debug!(key = %key, methods = view.len(), entity, "compiling dispatch");
            let strategies = self.strategies.read();
            let rules = self.rules.read();
            strategies.compile(&view, entity, &rules, &self.dispatch)
        })?;
        Ok(compiled)
    }

    /// A proxy for `shape`, optionally bound to an entity instance.
    pub fn materialize(&self, shape: &ShapeId, seed: Option<EntityRef>) -> ProxyResult<Proxy> {
        self.materialize_with(shape, &[], seed)
    }

    /// A proxy implementing `shape` plus extra capability shapes.
    pub fn materialize_with(
        &self,
        shape: &ShapeId,
        capabilities: &[ShapeId],
        seed: Option<EntityRef>,
    ) -> ProxyResult<Proxy> {
        let dispatch = self.dispatch_for(shape, capabilities)?;
        Ok(Proxy::new(
            shape.clone(),
            dispatch,
            Arc::clone(&self.driver),
            seed,
        ))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Materializer")
            .field("shapes", &self.catalog.len())
            .field("strategies", &*self.strategies.read())
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use transponder_dispatch::{Call, DispatchError, DispatchResult, Handler, Interceptor, Matcher};
    use transponder_driver::{DriverCall, InMemoryDriver, TypeDef};
    use transponder_types::{
        Marker, MethodDecl, QuerySpec, ShapeDecl, Value, ValueShape,
    };

    fn shapes() -> ShapeCatalog {
        ShapeCatalog::from_shapes([
            ShapeDecl::entity("Person")
                .method(MethodDecl::getter("getName", ValueShape::Text))
                .method(MethodDecl::setter("setName", ValueShape::Text))
                .method(
                    MethodDecl::getter("getNickname", ValueShape::Text)
                        .marker(Marker::DefaultValue(Value::from("none"))),
                )
                .method(
                    MethodDecl::new("greeting")
                        .returns(ValueShape::Text)
                        .body(|this, _| {
                            let name = this.call("getName", Vec::new())?;
                            Ok(Value::from(format!("hello {}", name.as_text().unwrap_or("?"))))
                        }),
                )
                .method(MethodDecl::new("forgotten").returns(ValueShape::Text))
                .build()
                .unwrap(),
            ShapeDecl::dao("People")
                .method(
                    MethodDecl::new("count")
                        .returns(ValueShape::Int)
                        .marker(Marker::query("sql", "select count(*) from person"))
                        .marker(Marker::Query(
                            QuerySpec::new("sql", "select count(*) from person_v2")
                                .for_dialect("v2"),
                        )),
                )
                .method(
                    MethodDecl::new("purge")
                        .returns(ValueShape::Int)
                        .marker(Marker::command("sql", "delete from person"))
                        .marker(Marker::Sudo),
                )
                .method(
                    MethodDecl::new("find")
                        .param("name", ValueShape::Text)
                        .returns(ValueShape::Text),
                )
                .method(
                    MethodDecl::new("find")
                        .param("id", ValueShape::Int)
                        .returns(ValueShape::Text),
                )
                .build()
                .unwrap(),
            ShapeDecl::dao("Shouting")
                .method(
                    MethodDecl::getter("getName", ValueShape::Text)
                        .marker(Marker::OverrideByThis)
                        .body(|_, _| Ok(Value::from("LOUD"))),
                )
                .build()
                .unwrap(),
        ])
        .unwrap()
    }

    fn setup() -> (Arc<InMemoryDriver>, Materializer) {
        let driver = Arc::new(InMemoryDriver::new());
        driver
            .create_type(&TypeDef {
                name: "Person".into(),
                is_abstract: false,
                owner: None,
                supertypes: Vec::new(),
            })
            .unwrap();
        let materializer = Materializer::new(
            Arc::new(shapes()),
            driver.clone(),
            &MaterializerConfig::default(),
        );
        (driver, materializer)
    }

    fn person(driver: &InMemoryDriver, materializer: &Materializer) -> Proxy {
        let seed = driver.new_entity_instance("Person").unwrap();
        materializer
            .materialize(&ShapeId::new("Person"), Some(seed))
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    #[test]
    fn entity_accessors_and_default_methods() {
        let (driver, materializer) = setup();
        let ada = person(&driver, &materializer);

        ada.call("setName", vec![Value::from("Ada")]).unwrap();
        assert_eq!(ada.call("getName", vec![]).unwrap(), Value::from("Ada"));
        assert_eq!(ada.call("getNickname", vec![]).unwrap(), Value::from("none"));
        assert_eq!(ada.call("greeting", vec![]).unwrap(), Value::from("hello Ada"));
    }

    #[test]
    fn abstract_method_without_rule_is_unimplemented() {
        let (driver, materializer) = setup();
        let ada = person(&driver, &materializer);
        let err = ada.call("forgotten", vec![]).unwrap_err();
        assert!(matches!(
            err,
            ProxyError::Dispatch(DispatchError::Unimplemented(_))
        ));
    }

    #[test]
    fn dao_queries_and_privileged_commands() {
        let (driver, materializer) = setup();
        driver.register_query("sql", "select count(*) from person", vec![Value::Int(2)]);
        driver.register_command("sql", "delete from person", Value::Int(2));
        let people = materializer.materialize(&ShapeId::new("People"), None).unwrap();

        assert_eq!(people.call("count", vec![]).unwrap(), Value::Int(2));
        assert_eq!(people.call("purge", vec![]).unwrap(), Value::Int(2));
        let privileged: Vec<bool> = driver
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                DriverCall::Command { privileged, .. } => Some(privileged),
                _ => None,
            })
            .collect();
        assert_eq!(privileged, vec![true]);
    }

    #[test]
    fn overloads_need_a_key() {
        let (_driver, materializer) = setup();
        let people = materializer.materialize(&ShapeId::new("People"), None).unwrap();

        assert!(matches!(
            people.call("find", vec![Value::from("x")]),
            Err(ProxyError::AmbiguousMethod { candidates: 2, .. })
        ));
        assert!(matches!(
            people.call("count", vec![Value::Int(1)]),
            Err(ProxyError::NoSuchMethod { arity: 1, .. })
        ));
    }

    #[test]
    fn capabilities_override_by_this() {
        let (driver, materializer) = setup();
        let seed = driver.new_entity_instance("Person").unwrap();
        let loud = materializer
            .materialize_with(&ShapeId::new("Person"), &[ShapeId::new("Shouting")], Some(seed))
            .unwrap();
        loud.call("setName", vec![Value::from("Ada")]).unwrap();
        assert_eq!(loud.call("getName", vec![]).unwrap(), Value::from("LOUD"));
        assert_eq!(loud.call("greeting", vec![]).unwrap(), Value::from("hello LOUD"));
    }

    #[test]
    fn unknown_shapes_are_rejected() {
        let (_driver, materializer) = setup();
        assert!(matches!(
            materializer.materialize(&ShapeId::new("Ghost"), None),
            Err(ProxyError::UnknownShape(_))
        ));
        assert!(matches!(
            materializer.materialize_with(&ShapeId::new("Person"), &[ShapeId::new("Ghost")], None),
            Err(ProxyError::UnknownShape(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Cache
    // -----------------------------------------------------------------------

    #[test]
    fn proxies_share_compiled_dispatch() {
        let (driver, materializer) = setup();
        let a = person(&driver, &materializer);
        let b = person(&driver, &materializer);
        assert!(Arc::ptr_eq(a.dispatch(), b.dispatch()));
        assert_ne!(a.seed(), b.seed());
        let stats = materializer.cache_stats();
        assert_eq!((stats.compiles, stats.hits), (1, 1));
    }

    struct Fixed;

    impl Handler for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn invoke(&self, _call: &Call<'_>) -> DispatchResult<Value> {
            Ok(Value::from("fixed"))
        }
    }

    #[test]
    fn concurrent_materialization_compiles_once() {
        const THREADS: usize = 8;
        let (_driver, materializer) = setup();
        // The compiler evaluates each matcher once per method, so the
        // counter reads the number of compiles.
        let evaluations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evaluations);
        let mut rules = RuleSet::new();
        rules.terminal(
            Matcher::new("counted", move |m| {
                if m.name() == "count" {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                false
            }),
            Fixed,
        );
        materializer.add_rules(rules);
        let barrier = Barrier::new(THREADS);

        let proxies: Vec<Proxy> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        materializer
                            .materialize(&ShapeId::new("People"), None)
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(evaluations.load(Ordering::SeqCst), 1);
        assert!(proxies
            .windows(2)
            .all(|w| Arc::ptr_eq(w[0].dispatch(), w[1].dispatch())));
        assert_eq!(materializer.cache_stats().compiles, 1);
    }

    struct V2Translator;

    impl QueryTranslator for V2Translator {
        fn name(&self) -> &str {
            "v2"
        }

        fn translate(&self, candidates: &[&QuerySpec], _dialect: &str) -> Option<QuerySpec> {
            PassThroughTranslator.translate(candidates, "v2")
        }
    }

    #[test]
    fn translator_swap_invalidates_cache() {
        let (driver, materializer) = setup();
        driver.register_query("sql", "select count(*) from person", vec![Value::Int(1)]);
        driver.register_query("sql", "select count(*) from person_v2", vec![Value::Int(9)]);

        let before = materializer.materialize(&ShapeId::new("People"), None).unwrap();
        assert_eq!(before.call("count", vec![]).unwrap(), Value::Int(1));

        materializer.set_translator(Arc::new(V2Translator));
        assert_eq!(materializer.cache_stats().entries, 0);

        let after = materializer.materialize(&ShapeId::new("People"), None).unwrap();
        assert!(!Arc::ptr_eq(before.dispatch(), after.dispatch()));
        assert_eq!(after.call("count", vec![]).unwrap(), Value::Int(9));
        // Proxies built before the swap keep the translator they compiled with.
        assert_eq!(before.call("count", vec![]).unwrap(), Value::Int(1));
    }

    struct Audit(Arc<AtomicUsize>);

    impl Interceptor for Audit {
        fn name(&self) -> &str {
            "audit"
        }

        fn intercept(&self, call: &Call<'_>, next: &dyn Handler) -> DispatchResult<Value> {
            self.0.fetch_add(1, Ordering::SeqCst);
            next.invoke(call)
        }
    }

    #[test]
    fn custom_markers_bind_after_registration() {
        let catalog = ShapeCatalog::from_shapes([ShapeDecl::dao("Jobs")
            .method(
                MethodDecl::new("run")
                    .returns(ValueShape::Text)
                    .marker(Marker::custom("audited"))
                    .body(|_, _| Ok(Value::from("ran"))),
            )
            .build()
            .unwrap()])
        .unwrap();
        let materializer = Materializer::new(
            Arc::new(catalog),
            Arc::new(InMemoryDriver::new()),
            &MaterializerConfig::default(),
        );
        let jobs = ShapeId::new("Jobs");
        assert!(matches!(
            materializer.materialize(&jobs, None),
            Err(ProxyError::Dispatch(DispatchError::Config(_)))
        ));

        let count = Arc::new(AtomicUsize::new(0));
        materializer.register_strategy("audit", Strategy::wrapping(Audit(Arc::clone(&count))));
        materializer.bind_tag("audited", "audit");
        let proxy = materializer.materialize(&jobs, None).unwrap();
        assert_eq!(proxy.call("run", vec![]).unwrap(), Value::from("ran"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
