//! Bounded least-recently-used cache of contingency outcomes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Identity of a sampled contingency: failed units per circuit under
/// contingency (in contingency-list order) and per-generator failure flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContingencyKey {
    pub circuit_failures: Vec<usize>,
    pub generator_failures: Vec<bool>,
}

impl ContingencyKey {
    /// No equipment failed.
    pub fn is_intact(&self) -> bool {
        self.circuit_failures.iter().all(|&r| r == 0) && !self.generator_failures.iter().any(|&f| f)
    }
}

struct Entry {
    shed: f64,
    stamp: u64,
}

/// Maps contingency keys to total shed load, evicting the least recently
/// used entry once `capacity` is exceeded. Capacity 0 stores nothing.
pub struct ContingencyCache {
    capacity: usize,
    entries: HashMap<ContingencyKey, Entry>,
    recency: BTreeMap<u64, ContingencyKey>,
    clock: u64,
    hits: usize,
    misses: usize,
    evictions: usize,
}

impl ContingencyCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity.min(4096)),
            recency: BTreeMap::new(),
            clock: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Look up a key, refreshing its recency on a hit.
    pub fn get(&mut self, key: &ContingencyKey) -> Option<f64> {
        let stamp = self.tick();
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.recency.remove(&entry.stamp);
                entry.stamp = stamp;
                self.recency.insert(stamp, key.clone());
                self.hits += 1;
                Some(entry.shed)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: ContingencyKey, shed: f64) {
        if self.capacity == 0 {
            return;
        }
        let stamp = self.tick();
        if let Some(old) = self.entries.insert(key.clone(), Entry { shed, stamp }) {
            self.recency.remove(&old.stamp);
        }
        self.recency.insert(stamp, key);

        while self.entries.len() > self.capacity {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            self.evictions += 1;
            debug!(evictions = self.evictions, "evicted least recently used contingency");
        }
    }

    pub fn contains(&self, key: &ContingencyKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn evictions(&self) -> usize {
        self.evictions
    }
}
