//! Domain services sitting between the UI and the backend.
//!
//! Each service owns one cache key family and its freshness window, and is
//! the only writer of that family. Reads go through `fetch_with_cache`:
//! cached value if fresh, otherwise the backend, otherwise the last cached
//! value regardless of age. Mutations invalidate the keys they make stale,
//! only after the backend accepted them.

pub mod dashboard;
pub mod registration;
pub mod visitor;

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::cache::{CacheKey, CacheManager, Cacheable, WriteOutcome};

pub use dashboard::DashboardService;
pub use registration::RegistrationService;
pub use visitor::VisitorService;

/// Whether services talk to the backend or serve built-in sample data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppMode {
    #[default]
    Live,
    Demo,
}

/// Where a returned value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Built-in sample data; neither cache nor network was touched.
    Demo,
    /// Cached value inside its freshness window.
    Cache,
    /// Just fetched from the backend.
    Remote,
    /// The backend failed and this is the last cached value, possibly expired.
    StaleCache,
}

/// A value plus where it came from, so the UI can flag outdated data.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub source: DataSource,
    pub cached_at: Option<DateTime<Utc>>,
}

impl<T> Fetched<T> {
    pub fn new(value: T, source: DataSource, cached_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value,
            source,
            cached_at,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.source == DataSource::StaleCache
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            value: f(self.value),
            source: self.source,
            cached_at: self.cached_at,
        }
    }
}

pub(crate) async fn fetch_with_cache<T, F, Fut>(
    cache: &CacheManager,
    key: &CacheKey,
    window: Duration,
    fetch: F,
) -> Result<Fetched<T>, ApiError>
where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    if let Some(hit) = cache.get_entry::<T>(key, Some(window)) {
        return Ok(Fetched::new(hit.value, DataSource::Cache, Some(hit.cached_at)));
    }

    let ticket = cache.begin_write();
    match fetch().await {
        Ok(value) => {
            match cache.set_with_ticket(key, &value, Some(window), ticket) {
                Ok(WriteOutcome::Written) => {}
                Ok(WriteOutcome::Superseded) => {
                    debug!(key = %key, "Newer data already cached, not overwriting");
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to cache fetched data");
                }
            }
            Ok(Fetched::new(value, DataSource::Remote, None))
        }
        Err(err) => match cache.get_entry::<T>(key, None) {
            Some(hit) => {
                warn!(
                    key = %key,
                    error = %err,
                    cached_at = %hit.cached_at,
                    "Fetch failed, serving cached data"
                );
                Ok(Fetched::new(hit.value, DataSource::StaleCache, Some(hit.cached_at)))
            }
            None => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetched_helpers() {
        let fetched = Fetched::new(vec![1, 2], DataSource::StaleCache, None);
        assert!(fetched.is_stale());
        let mapped = fetched.map(|v| v.len());
        assert_eq!(mapped.value, 2);
        assert_eq!(mapped.source, DataSource::StaleCache);

        let fresh = Fetched::new(1, DataSource::Remote, None);
        assert!(!fresh.is_stale());
        assert_eq!(fresh.into_value(), 1);
    }

    #[test]
    fn test_app_mode_default_is_live() {
        assert_eq!(AppMode::default(), AppMode::Live);
    }
}
