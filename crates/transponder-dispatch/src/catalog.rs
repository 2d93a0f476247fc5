//! Strategy catalog and marker expansion.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;
use transponder_types::{Marker, MethodDecl};

use crate::builtins::{
    BodyHandler, CommandHandler, DefaultValueAdvice, GetProperty, LookupHandler, QueryHandler,
    SetProperty, SudoAdvice,
};
use crate::compiler::{compile, CompiledDispatch};
use crate::config::DispatchConfig;
use crate::error::{ConfigError, DispatchResult};
use crate::rule::{Matcher, Priority, Rule, RuleKind, RuleSet};
use crate::strategy::Strategy;
use crate::translate::QueryTranslator;
use crate::view::MethodView;

/// Named strategies plus the marker tags bound to them.
///
/// Query-backed strategies capture the translator given at construction.
#[derive(Clone)]
pub struct StrategyCatalog {
    translator: Arc<dyn QueryTranslator>,
    named: HashMap<String, Strategy>,
    by_tag: HashMap<String, String>,
}

impl StrategyCatalog {
    /// Catalog with every built-in strategy and tag binding.
    pub fn builtin(translator: Arc<dyn QueryTranslator>) -> Self {
        let mut catalog = Self {
            translator: Arc::clone(&translator),
            named: HashMap::new(),
            by_tag: HashMap::new(),
        };
        catalog
            .register("get", Strategy::terminal(GetProperty))
            .register("set", Strategy::terminal(SetProperty))
            .register("body", Strategy::terminal(BodyHandler::own()))
            .register(
                "query",
                Strategy::terminal(QueryHandler::new(Arc::clone(&translator))),
            )
            .register(
                "lookup",
                Strategy::terminal(LookupHandler::new(Arc::clone(&translator))),
            )
            .register("command", Strategy::terminal(CommandHandler::new(translator)))
            .register("default-value", Strategy::wrapping(DefaultValueAdvice))
            .register("sudo", Strategy::wrapping(SudoAdvice));
        for tag in ["query", "lookup", "command", "default-value", "sudo"] {
            catalog.bind_tag(tag, tag);
        }
        catalog
    }

    pub fn translator(&self) -> &Arc<dyn QueryTranslator> {
        &self.translator
    }

    /// Swap the translator, rebuilding the query-backed built-ins.
    /// Other registrations are kept.
    pub fn set_translator(&mut self, translator: Arc<dyn QueryTranslator>) -> &mut Self {
        self.translator = Arc::clone(&translator);
        self.register(
            "query",
            Strategy::terminal(QueryHandler::new(Arc::clone(&translator))),
        )
        .register(
            "lookup",
            Strategy::terminal(LookupHandler::new(Arc::clone(&translator))),
        )
        .register("command", Strategy::terminal(CommandHandler::new(translator)))
    }

    /// Register a strategy under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, strategy: Strategy) -> &mut Self {
        self.named.insert(name.into(), strategy);
        self
    }

    /// Route markers tagged `tag` to the strategy registered as `strategy`.
    pub fn bind_tag(&mut self, tag: impl Into<String>, strategy: impl Into<String>) -> &mut Self {
        self.by_tag.insert(tag.into(), strategy.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Strategy> {
        self.named.get(name)
    }

    /// The strategy a dispatch marker on `method` stands for.
    pub fn resolve(&self, marker: &Marker, method: &MethodDecl) -> Result<Strategy, ConfigError> {
        match marker {
            Marker::Delegate { strategy } => self.named_of_kind(marker, strategy, RuleKind::Terminal),
            Marker::Advice { strategy } => self.named_of_kind(marker, strategy, RuleKind::Wrapping),
            other => {
                let name = self.by_tag.get(other.tag()).ok_or_else(|| {
                    ConfigError::UnboundMarker {
                        marker: other.tag().to_string(),
                        method: method.key.clone(),
                    }
                })?;
                self.named
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownStrategy {
                        marker: other.tag().to_string(),
                        strategy: name.clone(),
                    })
            }
        }
    }

    fn named_of_kind(
        &self,
        marker: &Marker,
        name: &str,
        expected: RuleKind,
    ) -> Result<Strategy, ConfigError> {
        let strategy = self
            .named
            .get(name)
            .ok_or_else(|| ConfigError::UnknownStrategy {
                marker: marker.tag().to_string(),
                strategy: name.to_string(),
            })?;
        if strategy.kind() != expected {
            return Err(ConfigError::KindMismatch {
                strategy: name.to_string(),
                expected,
            });
        }
        Ok(strategy.clone())
    }

    /// Accessor conventions for entity shapes: getters read and setters
    /// write stored properties. Methods with a body keep their body.
    pub fn entity_defaults(&self) -> Result<RuleSet, ConfigError> {
        let mut rules = RuleSet::new();
        for (matcher, name) in [(Matcher::getters(), "get"), (Matcher::setters(), "set")] {
            let strategy = self.get(name).cloned().ok_or_else(|| ConfigError::UnknownStrategy {
                marker: "accessor".to_string(),
                strategy: name.to_string(),
            })?;
            let matcher = matcher.and(Matcher::new("abstract", |m| m.body.is_none()));
            rules.push(
                Rule::new(matcher, strategy)
                    .with_priority(Priority::DEFAULTS)
                    .with_origin(format!("entity {name}ter convention")),
            );
        }
        Ok(rules)
    }

    /// Rules implied by the dispatch markers of `methods`.
    ///
    /// One rule per distinct marker, in first-seen order, matching every
    /// method that carries it. Declarations marked `override-by-this` then
    /// re-emit their terminal strategy (a terminal marker, else their body)
    /// for their exact signature at override priority.
    pub fn expand(&self, methods: &[MethodDecl]) -> Result<RuleSet, ConfigError> {
        let mut rules = RuleSet::new();
        let mut seen = HashSet::new();
        for method in methods {
            for marker in method.markers.iter().filter(|m| m.is_dispatch()) {
                let key = marker.rule_key();
                if !seen.insert(key.clone()) {
                    continue;
                }
                let strategy = self.resolve(marker, method)?;
                debug!(rule = %key, strategy = strategy.name(), "expanded marker rule");
                let origin = format!("marker {key} first seen on {}", method.key);
                rules.push(Rule::new(Matcher::rule_key(key), strategy).with_origin(origin));
            }
        }

        for method in methods.iter().filter(|m| m.has_marker("override-by-this")) {
            let mut terminal = None;
            for marker in method.markers.iter().filter(|m| m.is_dispatch()) {
                let strategy = self.resolve(marker, method)?;
                if strategy.kind() == RuleKind::Terminal {
                    terminal = Some(strategy);
                }
            }
            let terminal = match (terminal, &method.body) {
                (Some(strategy), _) => strategy,
                (None, Some(body)) => Strategy::terminal(BodyHandler::fixed(
                    format!("body of {}", method.declared_in),
                    Arc::clone(body),
                )),
                (None, None) => continue,
            };
            debug!(method = %method.key, strategy = terminal.name(), "override rule");
            rules.push(
                Rule::new(Matcher::signature(method.key.clone()), terminal)
                    .with_priority(Priority::OVERRIDE)
                    .with_origin(format!("override by {}", method.declared_in)),
            );
        }
        Ok(rules)
    }

    /// Expand and compile a method view.
    pub fn compile(
        &self,
        view: &MethodView,
        entity: bool,
        extra: &RuleSet,
        config: &DispatchConfig,
    ) -> DispatchResult<CompiledDispatch> {
        let mut rules = if entity {
            self.entity_defaults()?
        } else {
            RuleSet::new()
        };
        rules.extend(self.expand(view.methods())?);
        rules.extend(extra.clone());
        compile(view.methods(), &rules, config)
    }
}

impl std::fmt::Debug for StrategyCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.named.keys().collect();
        names.sort();
        f.debug_struct("StrategyCatalog")
            .field("translator", &self.translator.name())
            .field("strategies", &names)
            .finish()
    }
}
