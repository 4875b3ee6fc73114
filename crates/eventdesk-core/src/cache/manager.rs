use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{CacheKey, SessionCache};
use crate::clock::Clock;
use crate::store::{DiskStore, StoreError};

/// Anything that can live in both tiers.
pub trait Cacheable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to persist cache entry: {0}")]
    Store(#[from] StoreError),
}

/// On-disk envelope for every cached value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T, cached_at: DateTime<Utc>) -> Self {
        Self { data, cached_at }
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age_minutes(now);
        if minutes < 1 {
            // Also covers clock skew (negative ages)
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            let remaining_mins = minutes % 60;
            if remaining_mins >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            let remaining_hours = (minutes % 1440) / 60;
            if remaining_hours >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.cached_at + max_age <= now
    }
}

/// Sidecar record holding the absolute expiry of a TTL-bearing key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExpiryRecord {
    key: CacheKey,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Memory,
    Disk,
}

/// A value found in the cache, with enough metadata to tell how old it is.
#[derive(Debug, Clone)]
pub struct CacheHit<T> {
    pub value: T,
    pub cached_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub tier: Tier,
}

/// Sequence number taken before a remote fetch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WriteTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// A write or invalidation that started later already landed.
    Superseded,
}

pub struct CacheManager {
    store: DiskStore,
    session: SessionCache,
    clock: Arc<dyn Clock>,
    next_ticket: AtomicU64,
    /// Highest accepted ticket (or invalidation) per key. The lock also
    /// serializes ticketed writes against invalidations.
    watermarks: Mutex<HashMap<CacheKey, u64>>,
    /// Tickets at or below this were issued before the last full reset.
    floor: AtomicU64,
    /// Serializes the value file and its sidecar as one unit. Taken after
    /// `watermarks` when both are needed.
    writes: Mutex<()>,
}

impl CacheManager {
    pub fn new(store: DiskStore, memory_capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            session: SessionCache::new(memory_capacity, clock.clone()),
            clock,
            next_ticket: AtomicU64::new(1),
            watermarks: Mutex::new(HashMap::new()),
            floor: AtomicU64::new(0),
            writes: Mutex::new(()),
        }
    }

    pub fn session(&self) -> &SessionCache {
        &self.session
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn watermarks(&self) -> MutexGuard<'_, HashMap<CacheKey, u64>> {
        self.watermarks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Read =====

    /// Look up `key`.
    ///
    /// With `max_age`, only a value that is inside its recorded expiry and
    /// younger than `max_age` is returned. Without it, whatever is cached is
    /// returned, expired or not. Storage failures are treated as misses.
    pub fn get<T: Cacheable>(&self, key: &CacheKey, max_age: Option<Duration>) -> Option<T> {
        self.get_entry(key, max_age).map(|hit| hit.value)
    }

    pub fn get_entry<T: Cacheable>(
        &self,
        key: &CacheKey,
        max_age: Option<Duration>,
    ) -> Option<CacheHit<T>> {
        let now = self.clock.now();

        let memory = match max_age {
            Some(max_age) => self
                .session
                .get_fresh_entry::<T>(key)
                .filter(|entry| entry.cached_at + max_age > now),
            None => self.session.get_entry::<T>(key),
        };
        if let Some(entry) = memory {
            debug!(key = %key, "Cache hit (memory)");
            return Some(CacheHit {
                value: entry.value,
                cached_at: entry.cached_at,
                expires_at: entry.expires_at,
                tier: Tier::Memory,
            });
        }

        let expires_at = self.load_expiry(key);
        if max_age.is_some() && expires_at.is_some_and(|expires_at| expires_at <= now) {
            debug!(key = %key, "Cache entry expired");
            return None;
        }

        let cached: CachedData<T> = match self.store.load(&key.file_stem()) {
            Ok(cached) => cached,
            Err(StoreError::NotFound(_)) => {
                debug!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring unreadable cache entry");
                return None;
            }
        };

        if let Some(max_age) = max_age {
            if cached.is_older_than(max_age, now) {
                debug!(key = %key, age_minutes = cached.age_minutes(now), "Cache entry too old");
                return None;
            }
        }

        debug!(key = %key, "Cache hit (disk)");
        self.session
            .restore(key, cached.data.clone(), cached.cached_at, expires_at);

        Some(CacheHit {
            value: cached.data,
            cached_at: cached.cached_at,
            expires_at,
            tier: Tier::Disk,
        })
    }

    fn load_expiry(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        match self.store.load::<ExpiryRecord>(&key.expiry_stem()) {
            Ok(record) => Some(record.expires_at),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring unreadable expiry record");
                None
            }
        }
    }

    /// True if a persisted value exists for `key`.
    pub fn exists(&self, key: &CacheKey) -> bool {
        self.store.exists(&key.file_stem())
    }

    /// Human readable age of the persisted value, e.g. "12m ago".
    pub fn cache_age(&self, key: &CacheKey) -> Option<String> {
        match self.store.load::<CachedData<serde_json::Value>>(&key.file_stem()) {
            Ok(cached) => Some(cached.age_display(self.clock.now())),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => {
                debug!(key = %key, error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    // ===== Write =====

    /// Write through to both tiers with no expiry.
    ///
    /// The memory tier is written first and is not rolled back if the disk
    /// write fails.
    pub fn set<T: Cacheable>(&self, key: &CacheKey, value: &T) -> Result<(), CacheError> {
        self.write(key, value, None)
    }

    /// Write through with an expiry. The disk copy itself never expires; the
    /// expiry lives in a sidecar record consulted by bounded reads.
    pub fn set_with_ttl<T: Cacheable>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.write(key, value, Some(ttl))
    }

    pub fn begin_write(&self) -> WriteTicket {
        WriteTicket(self.next_ticket.fetch_add(1, Ordering::SeqCst))
    }

    /// Write unless something that started after `ticket` has already
    /// written or invalidated `key`.
    pub fn set_with_ticket<T: Cacheable>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
        ticket: WriteTicket,
    ) -> Result<WriteOutcome, CacheError> {
        let mut watermarks = self.watermarks();
        let last = watermarks.get(key).copied().unwrap_or(0);
        if ticket.0 <= last || ticket.0 <= self.floor.load(Ordering::SeqCst) {
            debug!(key = %key, ticket = ticket.0, last, "Dropping superseded cache write");
            return Ok(WriteOutcome::Superseded);
        }
        watermarks.insert(key.clone(), ticket.0);
        self.write(key, value, ttl)?;
        Ok(WriteOutcome::Written)
    }

    fn write<T: Cacheable>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let _writes = self.writes();
        let now = self.clock.now();

        match ttl {
            Some(ttl) => self.session.set_with_expiry(key, value.clone(), ttl),
            None => self.session.set(key, value.clone()),
        }

        self.store
            .save(&key.file_stem(), &CachedData::new(value, now))?;

        match ttl {
            Some(ttl) => {
                let record = ExpiryRecord {
                    key: key.clone(),
                    expires_at: now + ttl,
                };
                if let Err(e) = self.store.save(&key.expiry_stem(), &record) {
                    // An older sidecar must not outlive the value it described
                    if let Err(delete_err) = self.store.delete(&key.expiry_stem()) {
                        warn!(key = %key, error = %delete_err, "Failed to remove old expiry record");
                    }
                    return Err(e.into());
                }
            }
            None => {
                if let Err(e) = self.store.delete(&key.expiry_stem()) {
                    warn!(key = %key, error = %e, "Failed to remove old expiry record");
                }
            }
        }

        debug!(key = %key, ttl_secs = ?ttl.map(|t| t.num_seconds()), "Cache entry written");
        Ok(())
    }

    // ===== Invalidation =====

    /// Remove `key` from both tiers. Never fails; nothing cached is fine.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut watermarks = self.watermarks();
        let mark = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        watermarks.insert(key.clone(), mark);
        let _writes = self.writes();

        self.session.remove(key);
        for stem in [key.file_stem(), key.expiry_stem()] {
            if let Err(e) = self.store.delete(&stem) {
                warn!(key = %key, error = %e, "Failed to delete cached file");
            }
        }
        debug!(key = %key, "Cache entry invalidated");
    }

    /// Drop everything in both tiers. Meant for an explicit user reset.
    pub fn clear_all(&self) -> Result<(), CacheError> {
        let mut watermarks = self.watermarks();
        let floor = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        self.floor.store(floor, Ordering::SeqCst);
        watermarks.clear();
        let _writes = self.writes();

        self.session.clear();
        let removed = self.store.clear_all()?;
        info!(removed, "Cleared all cached data");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
