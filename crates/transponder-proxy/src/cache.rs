//! Compiled-dispatch cache.
//!
//! Keyed by a main shape plus the set of extra capability shapes. Each key
//! owns a [`OnceCell`] slot: the first requester compiles, concurrent
//! requesters for the same key block on that compile and share its result.
//! The map lock is never held while compiling.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use transponder_dispatch::{CompiledDispatch, DispatchResult};
use transponder_types::ShapeId;

use crate::config::CacheConfig;

/// Main shape plus extra capability shapes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub shape: ShapeId,
    pub capabilities: BTreeSet<ShapeId>,
}

impl CacheKey {
    pub fn new(shape: ShapeId, capabilities: impl IntoIterator<Item = ShapeId>) -> Self {
        Self {
            shape,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn capability_list(&self) -> Vec<ShapeId> {
        self.capabilities.iter().cloned().collect()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.shape)?;
        for capability in &self.capabilities {
            write!(f, "+{capability}")?;
        }
        Ok(())
    }
}

/// Cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub compiles: u64,
    pub evictions: u64,
    pub entries: usize,
}

type Cell = Arc<OnceCell<Arc<CompiledDispatch>>>;

struct Slot {
    cell: Cell,
    last_used: u64,
}

#[derive(Default)]
struct Slots {
    map: HashMap<CacheKey, Slot>,
    tick: u64,
}

pub struct DispatchCache {
    capacity: usize,
    slots: Mutex<Slots>,
    hits: AtomicU64,
    compiles: AtomicU64,
    evictions: AtomicU64,
}

impl DispatchCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            capacity: config.effective_capacity(),
            slots: Mutex::new(Slots::default()),
            hits: AtomicU64::new(0),
            compiles: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// The cached dispatch for `key`, running `compile` at most once per
    /// resolved entry. A failed compile caches nothing.
    pub fn get_or_compile<F>(&self, key: &CacheKey, compile: F) -> DispatchResult<Arc<CompiledDispatch>>
    where
        F: FnOnce() -> DispatchResult<CompiledDispatch>,
    {
        let cell = self.slot(key);
        if let Some(compiled) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "dispatch cache hit");
            return Ok(Arc::clone(compiled));
        }

        let mut compiled_here = false;
        let compiled = cell.get_or_try_init(|| {
            compiled_here = true;
            compile().map(Arc::new)
        })?;
        if compiled_here {
            self.compiles.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "compiled dispatch");
            self.evict();
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Arc::clone(compiled))
    }

    fn slot(&self, key: &CacheKey) -> Cell {
        let mut slots = self.slots.lock();
        slots.tick += 1;
        let tick = slots.tick;
        let slot = slots.map.entry(key.clone()).or_insert_with(|| Slot {
            cell: Arc::new(OnceCell::new()),
            last_used: tick,
        });
        slot.last_used = tick;
        Arc::clone(&slot.cell)
    }

    /// Drop least recently used resolved entries beyond capacity.
    fn evict(&self) {
        let mut slots = self.slots.lock();
        loop {
            let resolved = slots.map.values().filter(|s| s.cell.get().is_some()).count();
            if resolved <= self.capacity {
                return;
            }
            let oldest = slots
                .map
                .iter()
                .filter(|(_, s)| s.cell.get().is_some())
                .min_by_key(|(_, s)| s.last_used)
                .map(|(k, _)| k.clone());
            let Some(oldest) = oldest else {
                return;
            };
            slots.map.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            warn!(key = %oldest, capacity = self.capacity, "evicted compiled dispatch");
        }
    }

    /// Forget every entry. Compiles already in flight finish but are not kept.
    pub fn invalidate(&self) {
        let mut slots = self.slots.lock();
        let dropped = slots.map.len();
        slots.map.clear();
        debug!(dropped, "invalidated dispatch cache");
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.slots
            .lock()
            .map
            .get(key)
            .is_some_and(|s| s.cell.get().is_some())
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .slots
            .lock()
            .map
            .values()
            .filter(|s| s.cell.get().is_some())
            .count();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries,
        }
    }
}

impl std::fmt::Debug for DispatchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchCache")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}
