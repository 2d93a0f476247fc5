use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use transponder_types::{MethodDecl, MethodKey, ShapeId};

use crate::strategy::{Handler, Interceptor, Strategy};

/// Whether a rule's strategy fully handles a method or wraps another one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    Terminal,
    Wrapping,
}

/// Predicate over a method declaration.
#[derive(Clone)]
pub struct Matcher {
    label: String,
    predicate: Arc<dyn Fn(&MethodDecl) -> bool + Send + Sync>,
}

impl Matcher {
    pub fn new(
        label: impl Into<String>,
        predicate: impl Fn(&MethodDecl) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn any() -> Self {
        Self::new("any", |_| true)
    }

    pub fn getters() -> Self {
        Self::new("getter", MethodDecl::is_getter)
    }

    pub fn setters() -> Self {
        Self::new("setter", MethodDecl::is_setter)
    }

    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(format!("named {name}"), move |m| m.key.name == name)
    }

    /// Methods carrying a marker with the given tag.
    pub fn tagged(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self::new(format!("tagged {tag}"), move |m| m.has_marker(&tag))
    }

    /// Methods carrying a dispatch marker whose rule key is `key`.
    pub fn rule_key(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(format!("marker {key}"), move |m| {
            m.markers
                .iter()
                .any(|mk| mk.is_dispatch() && mk.rule_key() == key)
        })
    }

    /// Exactly one method signature.
    pub fn signature(key: MethodKey) -> Self {
        Self::new(format!("signature {key}"), move |m| m.key == key)
    }

    pub fn declared_in(shape: ShapeId) -> Self {
        Self::new(format!("declared in {shape}"), move |m| m.declared_in == shape)
    }

    pub fn and(self, other: Matcher) -> Self {
        let label = format!("({} and {})", self.label, other.label);
        Self::new(label, move |m| self.matches(m) && other.matches(m))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        let label = format!("not {}", self.label);
        Self::new(label, move |m| !self.matches(m))
    }

    pub fn matches(&self, method: &MethodDecl) -> bool {
        (self.predicate)(method)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({})", self.label)
    }
}

/// Rule priority. Rules are ordered by priority first, then by append order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority(pub u32);

impl Priority {
    /// Conventions applied before any declared marker (entity accessors).
    pub const DEFAULTS: Self = Self(0);
    /// Rules expanded from markers, and caller rules unless stated otherwise.
    pub const NORMAL: Self = Self(100);
    /// Rules re-emitted for `OverrideByThis` declarations.
    pub const OVERRIDE: Self = Self(200);
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// A predicate paired with the strategy that implements matching methods.
#[derive(Clone, Debug)]
pub struct Rule {
    pub matcher: Matcher,
    pub strategy: Strategy,
    pub priority: Priority,
    /// Where the rule came from, for logs.
    pub origin: String,
}

impl Rule {
    pub fn new(matcher: Matcher, strategy: Strategy) -> Self {
        let origin = format!("{} -> {}", matcher.label(), strategy.name());
        Self {
            matcher,
            strategy,
            priority: Priority::NORMAL,
            origin,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn kind(&self) -> RuleKind {
        self.strategy.kind()
    }
}

/// Append-only, ordered list of rules for one compilation request.
///
/// When two rules of equal priority both match a method, the later one takes
/// precedence as the terminal base and ends up outermost among wrappers.
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Append a terminal rule. The kind follows from the handler type.
    pub fn terminal(&mut self, matcher: Matcher, handler: impl Handler + 'static) -> &mut Self {
        self.push(Rule::new(matcher, Strategy::terminal(handler)));
        self
    }

    /// Append a wrapping rule around whatever the lower rules produce.
    pub fn wrapping(
        &mut self,
        matcher: Matcher,
        interceptor: impl Interceptor + 'static,
    ) -> &mut Self {
        self.push(Rule::new(matcher, Strategy::wrapping(interceptor)));
        self
    }

    pub fn extend(&mut self, other: RuleSet) {
        self.rules.extend(other.rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Rules in effective order: by priority, append order within a priority.
    pub fn ordered(&self) -> Vec<&Rule> {
        let mut ordered: Vec<&Rule> = self.rules.iter().collect();
        ordered.sort_by_key(|r| r.priority);
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testing::{Named, Wrap};
    use transponder_types::{Marker, ValueShape};

    #[test]
    fn matcher_combinators() {
        let getter = MethodDecl::getter("getName", ValueShape::Text);
        let setter = MethodDecl::setter("setName", ValueShape::Text);

        assert!(Matcher::getters().matches(&getter));
        assert!(!Matcher::getters().matches(&setter));
        assert!(Matcher::getters().not().matches(&setter));
        assert!(Matcher::any().and(Matcher::setters()).matches(&setter));
        assert!(Matcher::signature(getter.key.clone()).matches(&getter));
        assert!(!Matcher::signature(getter.key.clone()).matches(&setter));
        assert_eq!(
            Matcher::getters().and(Matcher::named("getName")).label(),
            "(getter and named getName)"
        );
    }

    #[test]
    fn rule_key_matcher_ignores_descriptive_markers() {
        let m = MethodDecl::getter("getName", ValueShape::Text)
            .marker(Marker::property("title"))
            .marker(Marker::Sudo);
        assert!(Matcher::rule_key("sudo").matches(&m));
        assert!(!Matcher::rule_key("property").matches(&m));
        assert!(Matcher::tagged("property").matches(&m));
    }

    #[test]
    fn helpers_take_the_kind_from_the_strategy_type() {
        let mut rules = RuleSet::new();
        rules
            .terminal(Matcher::any(), Named("base"))
            .wrapping(Matcher::getters(), Wrap("trace"));
        let kinds: Vec<_> = rules.iter().map(|r| (r.strategy.name(), r.kind())).collect();
        assert_eq!(
            kinds,
            vec![("base", RuleKind::Terminal), ("trace", RuleKind::Wrapping)]
        );
    }

    #[test]
    fn ordered_is_stable_within_priority() {
        let mut rules = RuleSet::new();
        rules.push(Rule::new(Matcher::any(), Strategy::terminal(Named("a"))));
        rules.push(
            Rule::new(Matcher::any(), Strategy::terminal(Named("low")))
                .with_priority(Priority::DEFAULTS),
        );
        rules.push(Rule::new(Matcher::any(), Strategy::terminal(Named("b"))));
        rules.push(
            Rule::new(Matcher::any(), Strategy::terminal(Named("high")))
                .with_priority(Priority::OVERRIDE),
        );
        let names: Vec<_> = rules.ordered().iter().map(|r| r.strategy.name()).collect();
        assert_eq!(names, vec!["low", "a", "b", "high"]);
    }
}
