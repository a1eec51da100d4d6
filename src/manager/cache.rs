//! Resolution cache for `ConfigManager`
//!
//! The cache is one immutable snapshot behind an `ArcSwap`. Readers load the
//! current snapshot without locking; reload swaps in an empty one. Inserts
//! carry the generation they resolved under and are dropped if a reload
//! happened in between, so a value resolved before a reload never lands in
//! the snapshot that replaced it.

use super::Resolved;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Snapshot {
    generation: u64,
    /// `None` records a key that resolved to unset
    entries: HashMap<String, Option<Resolved>>,
}

pub(super) struct ResolutionCache {
    current: ArcSwap<Snapshot>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    /// Generation of the live snapshot; pass it back to [`Self::insert`]
    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Cached resolution, or `None` on a miss
    pub fn lookup(&self, key: &str) -> Option<Option<Resolved>> {
        self.current.load().entries.get(key).cloned()
    }

    /// Record a resolution made under `generation`
    ///
    /// Every insert copies the snapshot map; use [`Self::insert_all`] when
    /// resolving many keys at once.
    pub fn insert(&self, generation: u64, key: &str, resolved: Option<Resolved>) {
        self.insert_all(generation, &[(key.to_string(), resolved)]);
    }

    /// Record several resolutions made under `generation` with one swap.
    /// Keys already cached keep their first value.
    pub fn insert_all(&self, generation: u64, resolved: &[(String, Option<Resolved>)]) {
        self.current.rcu(|snapshot| {
            let fresh: Vec<_> = resolved
                .iter()
                .filter(|(key, _)| !snapshot.entries.contains_key(key))
                .collect();
            if snapshot.generation != generation || fresh.is_empty() {
                return Arc::clone(snapshot);
            }
            let mut entries = snapshot.entries.clone();
            entries.extend(fresh.into_iter().cloned());
            Arc::new(Snapshot {
                generation,
                entries,
            })
        });
    }

    /// Swap in an empty snapshot under a new generation
    pub fn invalidate(&self) {
        self.current.rcu(|snapshot| Snapshot {
            generation: snapshot.generation + 1,
            entries: HashMap::new(),
        });
    }

    pub fn len(&self) -> usize {
        self.current.load().entries.len()
    }
}
