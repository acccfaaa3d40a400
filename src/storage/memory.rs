use dashmap::DashMap;
use std::sync::Arc;

/// Keyed in-memory store. Cloning shares the underlying map.
#[derive(Clone, Debug)]
pub struct MemoryStore<T: Clone> {
    entries: Arc<DashMap<String, T>>,
}

impl<T: Clone> MemoryStore<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::with_capacity(capacity)),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.entries.get(key).map(|value| value.value().clone())
    }

    pub fn set(&self, key: &str, value: T) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn del(&self, key: &str) -> Option<T> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Runs `update` under the entry's lock. Returns whatever `update` returns,
    /// or `false` when the key is absent.
    pub fn update<F>(&self, key: &str, update: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        match self.entries.get_mut(key) {
            Some(mut entry) => update(entry.value_mut()),
            None => false,
        }
    }

    /// Keeps the entries for which `keep` holds and returns how many were dropped.
    pub fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|_, value| keep(value));
        before.saturating_sub(self.entries.len())
    }
}
