//! In-memory session tier.
//!
//! Entries are keyed by `(CacheKey, TypeId)`: a typed read only ever sees
//! values that were stored as that type, so heterogeneous payloads share one
//! map without fallible casts. The map is a bounded LRU; when it is full the
//! least recently used entry is dropped, so a miss here never proves that
//! data does not exist.

use std::any::{Any, TypeId};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use tracing::trace;

use super::CacheKey;
use crate::clock::Clock;

type SlotKey = (CacheKey, TypeId);

struct Slot {
    value: Arc<dyn Any + Send + Sync>,
    cached_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

/// A value read from the session tier together with its timestamps.
#[derive(Debug, Clone)]
pub struct SessionEntry<T> {
    pub value: T,
    pub cached_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct SessionCache {
    lru: Mutex<LruCache<SlotKey, Slot>>,
    clock: Arc<dyn Clock>,
}

impl SessionCache {
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            lru: Mutex::new(LruCache::new(cap)),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<SlotKey, Slot>> {
        self.lru.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot_key<T: 'static>(key: &CacheKey) -> SlotKey {
        (key.clone(), TypeId::of::<T>())
    }

    pub fn set<T>(&self, key: &CacheKey, value: T)
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = self.clock.now();
        self.restore(key, value, now, None);
    }

    pub fn set_with_expiry<T>(&self, key: &CacheKey, value: T, ttl: Duration)
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = self.clock.now();
        self.restore(key, value, now, Some(now + ttl));
    }

    /// Insert with explicit timestamps, used when repopulating from disk so
    /// the entry keeps the age and expiry it had when it was written.
    pub fn restore<T>(
        &self,
        key: &CacheKey,
        value: T,
        cached_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) where
        T: Clone + Send + Sync + 'static,
    {
        let slot = Slot {
            value: Arc::new(value),
            cached_at,
            expires_at,
        };
        let mut lru = self.lock();
        if let Some(((evicted, _), _)) = lru.push(Self::slot_key::<T>(key), slot) {
            if &evicted != key {
                trace!(key = %evicted, "Session entry evicted");
            }
        }
    }

    /// Plain lookup, ignoring expiry.
    pub fn get<T>(&self, key: &CacheKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.get_entry::<T>(key).map(|entry| entry.value)
    }

    pub fn get_entry<T>(&self, key: &CacheKey) -> Option<SessionEntry<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut lru = self.lock();
        let slot = lru.get(&Self::slot_key::<T>(key))?;
        Self::read_slot(slot)
    }

    /// Lookup that only returns entries whose recorded expiry has not passed.
    /// An expired entry is evicted as a side effect.
    pub fn get_if_fresh<T>(&self, key: &CacheKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.get_fresh_entry::<T>(key).map(|entry| entry.value)
    }

    pub fn get_fresh_entry<T>(&self, key: &CacheKey) -> Option<SessionEntry<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = self.clock.now();
        let slot_key = Self::slot_key::<T>(key);
        let mut lru = self.lock();

        let expired = lru
            .peek(&slot_key)?
            .expires_at
            .is_some_and(|expires_at| expires_at <= now);
        if expired {
            trace!(key = %key, "Session entry expired");
            lru.pop(&slot_key);
            return None;
        }

        let slot = lru.get(&slot_key)?;
        Self::read_slot(slot)
    }

    fn read_slot<T>(slot: &Slot) -> Option<SessionEntry<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let value = slot.value.downcast_ref::<T>()?.clone();
        Some(SessionEntry {
            value,
            cached_at: slot.cached_at,
            expires_at: slot.expires_at,
        })
    }

    /// Remove every entry stored under `key`, whatever its type.
    pub fn remove(&self, key: &CacheKey) {
        let mut lru = self.lock();
        let matching: Vec<SlotKey> = lru
            .iter()
            .filter(|((k, _), _)| k == key)
            .map(|(slot_key, _)| slot_key.clone())
            .collect();
        for slot_key in matching {
            lru.pop(&slot_key);
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache(capacity: usize) -> (SessionCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (SessionCache::new(capacity, clock.clone()), clock)
    }

    #[test]
    fn test_set_then_get() {
        let (cache, _) = cache(8);
        let key = CacheKey::dashboard_stats();
        cache.set(&key, vec![1, 2, 3]);
        assert_eq!(cache.get::<Vec<i32>>(&key), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_set_overwrites() {
        let (cache, _) = cache(8);
        let key = CacheKey::custom("k");
        cache.set(&key, "old".to_string());
        cache.set(&key, "new".to_string());
        assert_eq!(cache.get::<String>(&key).as_deref(), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_typed_reads_never_cross_types() {
        let (cache, _) = cache(8);
        let key = CacheKey::custom("k");
        cache.set(&key, 5_u32);
        assert_eq!(cache.get::<String>(&key), None);
        assert_eq!(cache.get::<u32>(&key), Some(5));
    }

    #[test]
    fn test_get_if_fresh_evicts_expired() {
        let (cache, clock) = cache(8);
        let key = CacheKey::custom("k");
        cache.set_with_expiry(&key, 1_u8, Duration::seconds(300));

        assert_eq!(cache.get_if_fresh::<u8>(&key), Some(1));
        clock.advance(Duration::seconds(301));
        // Plain get ignores expiry
        assert_eq!(cache.get::<u8>(&key), Some(1));
        assert_eq!(cache.get_if_fresh::<u8>(&key), None);
        // ... and the fresh-only lookup dropped it
        assert_eq!(cache.get::<u8>(&key), None);
    }

    #[test]
    fn test_no_expiry_is_always_fresh() {
        let (cache, clock) = cache(8);
        let key = CacheKey::custom("k");
        cache.set(&key, 1_u8);
        clock.advance(Duration::days(30));
        assert_eq!(cache.get_if_fresh::<u8>(&key), Some(1));
    }

    #[test]
    fn test_remove_drops_every_type_under_key() {
        let (cache, _) = cache(8);
        let key = CacheKey::custom("k");
        let other = CacheKey::custom("other");
        cache.set(&key, 1_u8);
        cache.set(&key, "one".to_string());
        cache.set(&other, 2_u8);

        cache.remove(&key);
        assert_eq!(cache.get::<u8>(&key), None);
        assert_eq!(cache.get::<String>(&key), None);
        assert_eq!(cache.get::<u8>(&other), Some(2));

        // Removing again is harmless
        cache.remove(&key);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_eviction_when_full() {
        let (cache, _) = cache(2);
        let a = CacheKey::custom("a");
        let b = CacheKey::custom("b");
        let c = CacheKey::custom("c");
        cache.set(&a, 1_u8);
        cache.set(&b, 2_u8);
        // Touch a so b becomes least recently used
        assert_eq!(cache.get::<u8>(&a), Some(1));
        cache.set(&c, 3_u8);

        assert_eq!(cache.get::<u8>(&b), None);
        assert_eq!(cache.get::<u8>(&a), Some(1));
        assert_eq!(cache.get::<u8>(&c), Some(3));
    }

    #[test]
    fn test_zero_capacity_still_holds_one() {
        let (cache, _) = cache(0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_clear() {
        let (cache, _) = cache(8);
        cache.set(&CacheKey::custom("a"), 1_u8);
        cache.set(&CacheKey::custom("b"), 2_u8);
        cache.clear();
        assert!(cache.is_empty());
    }
}
