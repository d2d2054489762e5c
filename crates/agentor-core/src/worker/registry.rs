//! Worker registry -- a named collection of available worker adapters,
//! ported directly from `harness::HarnessRegistry`.
//!
//! Worker registration is static for an orchestrator's lifetime (§6), but
//! the registry itself supports `register`/replace at any time, so a
//! future dynamic-registration mode is additive rather than breaking.

use std::collections::HashMap;

use super::trait_def::Worker;

/// A collection of registered [`Worker`] implementations, keyed by name.
#[derive(Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, Box<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker under its capability's `name`. If a worker with
    /// the same name is already registered, it is replaced and the old
    /// one returned.
    pub fn register(&mut self, worker: impl Worker + 'static) -> Option<Box<dyn Worker>> {
        let name = worker.capabilities().name.clone();
        self.workers.insert(name, Box::new(worker))
    }

    pub fn get(&self, name: &str) -> Option<&dyn Worker> {
        self.workers.get(name).map(|b| b.as_ref())
    }

    pub fn list(&self) -> Vec<&str> {
        self.workers.keys().map(|s| s.as_str()).collect()
    }

    /// All registered workers, for capability matching during dispatch.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Worker> {
        self.workers.values().map(|b| b.as_ref())
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl std::fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("workers", &self.workers.keys().collect::<Vec<_>>())
            .finish()
    }
}
