use serde::{Deserialize, Serialize};

/// Hard ceiling on live rules: subsets are enumerated as `u64` bitmasks.
pub const MAX_LIVE_RULES: usize = 63;

/// Configuration for dispatch compilation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum number of rules that may match at least one method of a
    /// compiled shape. Compilation visits `2^live - 1` subsets, so this
    /// bounds the work per shape. Clamped to [`MAX_LIVE_RULES`].
    pub max_live_rules: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { max_live_rules: 20 }
    }
}

impl DispatchConfig {
    /// The effective limit after clamping.
    pub fn live_rule_limit(&self) -> usize {
        self.max_live_rules.min(MAX_LIVE_RULES)
    }
}
