use crate::errors::StoreError;
use lru::LruCache;
use std::{
    num::NonZeroUsize,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

/// A cache of objects indexed by a project (namespace) name
///
/// Unlike the per-request image stream cache, a store outlives requests and
/// is shared between them, so implementations synchronise internally.
pub trait ProjectObjectListStore<T>: Send + Sync {
    fn add(&self, namespace: &str, obj: T) -> Result<(), StoreError>;
    fn get(&self, namespace: &str) -> Option<T>;
}

/// In-process [ProjectObjectListStore] with expiring entries
///
/// At capacity, adding a namespace evicts the least recently used one.
pub struct InMemoryProjectStore<T> {
    entries: Mutex<LruCache<String, (Instant, T)>>,
    ttl: Duration,
}

impl<T: Clone + Send> InMemoryProjectStore<T> {
    /// A zero capacity is treated as one
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        InMemoryProjectStore {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, (Instant, T)>> {
        match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<T: Clone + Send> ProjectObjectListStore<T> for InMemoryProjectStore<T> {
    fn add(&self, namespace: &str, obj: T) -> Result<(), StoreError> {
        let mut entries = self.lock();
        if let Some((evicted, _)) = entries.push(namespace.to_owned(), (Instant::now(), obj)) {
            if evicted != namespace {
                log::debug!("evicted namespace {} from project store", evicted);
            }
        }
        Ok(())
    }

    fn get(&self, namespace: &str) -> Option<T> {
        let mut entries = self.lock();
        match entries.get(namespace) {
            None => return None,
            Some((added, obj)) if added.elapsed() < self.ttl => return Some(obj.clone()),
            Some(_) => {}
        }
        entries.pop(namespace);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get() {
        let store = InMemoryProjectStore::new(Duration::from_secs(60), 2);
        assert!(store.is_empty());
        store.add("a", 1).unwrap();
        store.add("b", 2).unwrap();
        assert_eq!(store.get("a"), Some(1));
        assert_eq!(store.get("c"), None);
        store.add("a", 10).unwrap();
        assert_eq!(store.get("a"), Some(10));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn full_store_evicts_least_recently_used() {
        let store = InMemoryProjectStore::new(Duration::from_secs(300), 2);
        store.add("cold", 1).unwrap();
        store.add("warm", 2).unwrap();
        assert_eq!(store.get("cold"), Some(1));

        store.add("hot", 3).unwrap();
        assert_eq!(store.get("hot"), Some(3));
        assert_eq!(store.get("cold"), Some(1));
        assert_eq!(store.get("warm"), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn new_namespace_replaces_idle_one() {
        let store = InMemoryProjectStore::new(Duration::from_secs(300), 1);
        store.add("cold", 1).unwrap();
        for _ in 0..3 {
            if store.get("hot").is_none() {
                store.add("hot", 2).unwrap();
            }
        }
        assert_eq!(store.get("hot"), Some(2));
        assert_eq!(store.get("cold"), None);
    }

    #[test]
    fn entries_expire() {
        let store = InMemoryProjectStore::new(Duration::from_secs(0), 1);
        store.add("a", 1).unwrap();
        assert_eq!(store.get("a"), None);
        assert!(store.is_empty());
        store.add("b", 2).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let store = InMemoryProjectStore::new(Duration::from_secs(60), 0);
        store.add("a", 1).unwrap();
        assert_eq!(store.get("a"), Some(1));
    }
}
