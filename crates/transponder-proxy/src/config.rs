use serde::{Deserialize, Serialize};

/// Configuration for the compiled-dispatch cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of compiled dispatch tables kept. The least recently
    /// used one is evicted beyond this and recompiled on its next request.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

impl CacheConfig {
    /// The effective capacity; at least one entry is always kept.
    pub fn effective_capacity(&self) -> usize {
        self.capacity.max(1)
    }
}
