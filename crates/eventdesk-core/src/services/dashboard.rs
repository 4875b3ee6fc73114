use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::{fetch_with_cache, AppMode, DataSource, Fetched};
use crate::api::{ApiError, Backend};
use crate::cache::{CacheKey, CacheManager};
use crate::demo;
use crate::models::DashboardStats;

pub struct DashboardService {
    cache: Arc<CacheManager>,
    backend: Arc<dyn Backend>,
    mode: AppMode,
    ttl: Duration,
}

impl DashboardService {
    pub fn new(
        cache: Arc<CacheManager>,
        backend: Arc<dyn Backend>,
        mode: AppMode,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            backend,
            mode,
            ttl,
        }
    }

    pub fn cache_key() -> CacheKey {
        CacheKey::dashboard_stats()
    }

    /// Today's counts, from 00:00 UTC.
    pub async fn stats(&self) -> Result<Fetched<DashboardStats>, ApiError> {
        let since = start_of_day(self.cache.now());
        if self.mode == AppMode::Demo {
            return Ok(Fetched::new(demo::dashboard_stats(since), DataSource::Demo, None));
        }

        let key = Self::cache_key();
        fetch_with_cache(&self.cache, &key, self.ttl, || {
            self.backend.fetch_dashboard_stats(since)
        })
        .await
    }

    pub fn invalidate(&self) {
        self.cache.invalidate(&Self::cache_key());
    }
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(now)
}
