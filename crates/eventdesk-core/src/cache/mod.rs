//! Local caching module for offline data access.
//!
//! Two tiers sit behind `CacheManager`:
//! - `SessionCache`: bounded, memory-only, process lifetime
//! - `DiskStore`: JSON files that survive restarts
//!
//! Values are written through to both tiers. Reads bounded by a maximum age
//! only return fresh data; unbounded reads also return expired entries so
//! services can fall back to them when the backend is unreachable.

pub mod keys;
pub mod manager;
pub mod session;

pub use keys::CacheKey;
pub use manager::{
    CacheError, CacheHit, CacheManager, Cacheable, CachedData, Tier, WriteOutcome, WriteTicket,
};
pub use session::{SessionCache, SessionEntry};
