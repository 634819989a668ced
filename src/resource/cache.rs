//! Keyed Memoization Cache
//!
//! Two independent memoization layers ride on this one type: a process-wide
//! cache for expensive type-level lookups ([`ComputeCache::global`]) and a
//! per-resource instance cache for derived computations (cleared on
//! `update()`). Keys are stable registration-time names.
//!
//! Access is double-checked per key: look up the slot, lock only that slot,
//! re-check, then compute and store. Unrelated keys never serialize against
//! each other.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::{Arc, OnceLock};
use tracing::warn;

type Slot = Arc<Mutex<Option<Arc<dyn Any + Send + Sync>>>>;

// =============================================================================
// Compute Cache
// =============================================================================

/// Per-key double-checked memoization cache
#[derive(Debug, Default)]
pub struct ComputeCache {
    slots: DashMap<String, Slot>,
}

impl ComputeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache for type-level lookups
    pub fn global() -> &'static ComputeCache {
        static GLOBAL: OnceLock<ComputeCache> = OnceLock::new();
        GLOBAL.get_or_init(ComputeCache::new)
    }

    /// Return the cached value for `key`, computing and storing it on miss
    ///
    /// The closure runs at most once per key across concurrent callers;
    /// callers for other keys proceed independently.
    pub fn get_or_compute<T, F>(&self, key: &str, compute: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let slot = self
            .slots
            .entry(key.to_string())
            .or_default()
            .value()
            .clone();

        let mut guard = slot.lock();
        if let Some(stored) = guard.as_ref() {
            match stored.clone().downcast::<T>() {
                Ok(value) => return value,
                Err(_) => {
                    warn!(key, "cached value type changed, recomputing");
                }
            }
        }
        let value = Arc::new(compute());
        *guard = Some(value.clone());
        value
    }

    /// Peek without computing
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let slot = self.slots.get(key)?.value().clone();
        let guard = slot.lock();
        guard.as_ref().and_then(|v| v.clone().downcast::<T>().ok())
    }

    /// Forget one key
    pub fn remove(&self, key: &str) {
        self.slots.remove(key);
    }

    /// Forget everything
    pub fn clear(&self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_computes_once_per_key() {
        let cache = ComputeCache::new();
        let calls = AtomicUsize::new(0);

        let first = cache.get_or_compute("answer", || {
            calls.fetch_add(1, Ordering::SeqCst);
            42u32
        });
        let second = cache.get_or_compute("answer", || {
            calls.fetch_add(1, Ordering::SeqCst);
            7u32
        });

        assert_eq!(*first, 42);
        assert_eq!(*second, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let cache = ComputeCache::new();
        cache.get_or_compute("a", || 1u32);
        cache.get_or_compute("b", || 2u32);
        assert_eq!(cache.get::<u32>("a").as_deref(), Some(&1));
        assert_eq!(cache.get::<u32>("b").as_deref(), Some(&2));
    }

    #[test]
    fn test_clear_forgets_everything() {
        let cache = ComputeCache::new();
        cache.get_or_compute("a", || 1u32);
        cache.clear();
        assert!(cache.get::<u32>("a").is_none());
        let recomputed = cache.get_or_compute("a", || 9u32);
        assert_eq!(*recomputed, 9);
    }

    #[test]
    fn test_concurrent_callers_single_compute() {
        let cache = Arc::new(ComputeCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                std::thread::spawn(move || {
                    let value = cache.get_or_compute("shared", || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        "computed".to_string()
                    });
                    assert_eq!(*value, "computed");
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
