//! Subset-enumeration dispatch compiler.
//!
//! Given the methods of a shape and an ordered rule set, compute for every
//! method one [`Chain`]: the most specific terminal strategy wrapped by every
//! applicable wrapping strategy.
//!
//! # Algorithm
//!
//! Rules are put in effective order (priority, then append order) and
//! indexed `0..n`. Rules that match no method are dropped up front: any
//! subset containing one could never match anything. The remaining *live*
//! rules are enumerated as non-empty subsets in increasing bitmask order.
//! For each subset:
//!
//! 1. The base is the highest-index terminal rule in the subset, or the
//!    highest-index rule if the subset has no terminal.
//! 2. Every other wrapping rule in the subset wraps the base, higher index
//!    outside lower index.
//! 3. The chain is bound to every method all rules of the subset match,
//!    replacing earlier bindings.
//!
//! A superset always has a larger bitmask than its subsets, so the binding
//! that survives for a method is the one built from *exactly* the set of
//! rules matching it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use transponder_types::{MethodDecl, MethodKey};

use crate::config::DispatchConfig;
use crate::error::{ConfigError, DispatchResult};
use crate::rule::{Rule, RuleSet};
use crate::strategy::{Chain, Interceptor, Strategy};

/// Final mapping from method to composed strategy for one shape.
///
/// Immutable once produced. Methods no rule matches have no chain; invoking
/// them falls back to their own body, or fails as unimplemented.
pub struct CompiledDispatch {
    methods: Vec<MethodDecl>,
    index: HashMap<MethodKey, usize>,
    bindings: HashMap<MethodKey, Arc<Chain>>,
    stats: CompileStats,
}

/// Counters describing one compilation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub methods: usize,
    pub rules: usize,
    pub live_rules: usize,
    pub subsets_visited: u64,
    pub subsets_bound: u64,
}

impl CompiledDispatch {
    /// Declared methods of the compiled shape, in view order.
    pub fn methods(&self) -> &[MethodDecl] {
        &self.methods
    }

    pub fn method(&self, key: &MethodKey) -> Option<&MethodDecl> {
        self.index.get(key).map(|&i| &self.methods[i])
    }

    /// The composed chain bound to a method, if any rule matched it.
    pub fn chain(&self, key: &MethodKey) -> Option<&Arc<Chain>> {
        self.bindings.get(key)
    }

    /// Strategy names bound to a method, outermost first.
    pub fn layers(&self, key: &MethodKey) -> Option<Vec<String>> {
        self.chain(key).map(|c| c.names())
    }

    /// Methods with a given name.
    pub fn methods_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a MethodDecl> + 'a {
        self.methods.iter().filter(move |m| m.key.name == name)
    }

    pub fn stats(&self) -> CompileStats {
        self.stats
    }
}

impl std::fmt::Debug for CompiledDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledDispatch")
            .field("methods", &self.methods.len())
            .field("bound", &self.bindings.len())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Compile `rules` against `methods`.
///
/// Fails only when the number of live rules exceeds the configured limit.
pub fn compile(
    methods: &[MethodDecl],
    rules: &RuleSet,
    config: &DispatchConfig,
) -> DispatchResult<CompiledDispatch> {
    let ordered = rules.ordered();

    // Liveness: which rules match at least one method.
    let hits: Vec<Vec<bool>> = ordered
        .iter()
        .map(|rule| methods.iter().map(|m| rule.matcher.matches(m)).collect())
        .collect();
    let live: Vec<usize> = (0..ordered.len())
        .filter(|&r| hits[r].iter().any(|&h| h))
        .collect();

    let limit = config.live_rule_limit();
    if live.len() > limit {
        return Err(ConfigError::TooManyRules {
            live: live.len(),
            limit,
        }
        .into());
    }

    // Bit j of a method's mask is set when live rule j matches it.
    let method_masks: Vec<u64> = (0..methods.len())
        .map(|m| {
            live.iter()
                .enumerate()
                .filter(|&(_, &r)| hits[r][m])
                .fold(0u64, |mask, (j, _)| mask | (1 << j))
        })
        .collect();

    let live_rules: Vec<&Rule> = live.iter().map(|&r| ordered[r]).collect();
    let mut bindings = HashMap::new();
    let mut stats = CompileStats {
        methods: methods.len(),
        rules: ordered.len(),
        live_rules: live.len(),
        ..CompileStats::default()
    };

    let subsets: u64 = if live.is_empty() {
        0
    } else {
        (1u64 << live.len()) - 1
    };
    for subset in 1..=subsets {
        stats.subsets_visited += 1;
        let matched: Vec<usize> = method_masks
            .iter()
            .enumerate()
            .filter(|&(_, &mask)| mask & subset == subset)
            .map(|(m, _)| m)
            .collect();
        if matched.is_empty() {
            continue;
        }

        let chain = Arc::new(compose(&live_rules, subset));
        for m in matched {
            bindings.insert(methods[m].key.clone(), Arc::clone(&chain));
        }
        stats.subsets_bound += 1;
    }

    for (key, chain) in &bindings {
        debug!(method = %key, chain = ?chain, "bound method");
    }
    info!(
        methods = stats.methods,
        rules = stats.rules,
        live = stats.live_rules,
        bound = bindings.len(),
        "compiled dispatch"
    );

    let index = methods
        .iter()
        .enumerate()
        .map(|(i, m)| (m.key.clone(), i))
        .collect();
    Ok(CompiledDispatch {
        methods: methods.to_vec(),
        index,
        bindings,
        stats,
    })
}

/// Build the chain for one subset of live rules.
fn compose(rules: &[&Rule], subset: u64) -> Chain {
    let included: Vec<usize> = (0..rules.len())
        .rev()
        .filter(|&j| subset & (1 << j) != 0)
        .collect();

    // `included` is non-empty and runs high to low.
    let base = included
        .iter()
        .copied()
        .find(|&j| matches!(rules[j].strategy, Strategy::Terminal(_)))
        .unwrap_or(included[0]);

    let layers: Vec<Arc<dyn Interceptor>> = included
        .iter()
        .filter(|&&j| j != base)
        .filter_map(|&j| match &rules[j].strategy {
            Strategy::Wrapping(interceptor) => Some(Arc::clone(interceptor)),
            Strategy::Terminal(_) => None,
        })
        .collect();

    Chain::new(rules[base].strategy.clone(), layers)
}
