//! In-memory availability cache.
//!
//! Holds exactly one snapshot: the observations from the most recent
//! successful refresh, keyed by lowercased street name. A refresh swaps
//! in a whole new snapshot; entries are never patched individually, so
//! readers see either the previous snapshot or the new one in full.
//!
//! The lock only guards an `Arc` pointer. Building the new map happens
//! before it is taken, and readers clone the pointer and release it
//! before touching any entries.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{Observation, StreetKey};

/// One complete generation of cached observations.
#[derive(Debug, Default)]
struct Snapshot {
    /// Number of `replace` calls that produced this snapshot (0 = initial empty).
    generation: u64,
    entries: HashMap<StreetKey, Observation>,
}

/// Cache of the latest known observation per street.
#[derive(Debug, Default)]
pub struct AvailabilityCache {
    current: RwLock<Arc<Snapshot>>,
}

impl AvailabilityCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole cache with `observations`.
    ///
    /// When two observations share a key, the later one wins. Returns the
    /// generation number of the new snapshot.
    pub async fn replace(&self, observations: Vec<Observation>) -> u64 {
        let entries = build_map(observations);

        let mut guard = self.current.write().await;
        let generation = guard.generation + 1;
        *guard = Arc::new(Snapshot {
            generation,
            entries,
        });

        generation
    }

    /// Every cached observation, sorted by street key.
    pub async fn get_all(&self) -> Vec<Observation> {
        let snapshot = self.snapshot().await;

        let mut entries: Vec<_> = snapshot.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, obs)| obs.clone()).collect()
    }

    /// Look up the observation for a street key.
    pub async fn get_by_key(&self, key: &StreetKey) -> Option<Observation> {
        self.snapshot().await.entries.get(key).cloned()
    }

    /// Look up the observation for a street name, ignoring case.
    pub async fn get(&self, street_name: &str) -> Option<Observation> {
        self.get_by_key(&StreetKey::new(street_name)).await
    }

    /// Number of streets in the current snapshot.
    pub async fn len(&self) -> usize {
        self.snapshot().await.entries.len()
    }

    /// Whether the current snapshot is empty.
    pub async fn is_empty(&self) -> bool {
        self.snapshot().await.entries.is_empty()
    }

    /// Generation number of the current snapshot.
    pub async fn generation(&self) -> u64 {
        self.snapshot().await.generation
    }

    async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read().await)
    }
}

/// Build the street key → observation map.
fn build_map(observations: Vec<Observation>) -> HashMap<StreetKey, Observation> {
    observations
        .into_iter()
        .map(|obs| (obs.key(), obs))
        .collect()
}
