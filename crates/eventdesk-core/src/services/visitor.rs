use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use super::{fetch_with_cache, AppMode, DataSource, Fetched};
use crate::api::{ApiError, Backend};
use crate::cache::{CacheKey, CacheManager};
use crate::demo;
use crate::models::{RegistrationId, Visitor, VisitorId};

pub struct VisitorService {
    cache: Arc<CacheManager>,
    backend: Arc<dyn Backend>,
    mode: AppMode,
    ttl: Duration,
}

impl VisitorService {
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

    pub fn cache_key(registration_id: RegistrationId) -> CacheKey {
        CacheKey::visitors_for_registration(registration_id)
    }

    pub async fn list(
        &self,
        registration_id: RegistrationId,
    ) -> Result<Fetched<Vec<Visitor>>, ApiError> {
        if self.mode == AppMode::Demo {
            return Ok(Fetched::new(
                demo::visitors(registration_id),
                DataSource::Demo,
                None,
            ));
        }

        let key = Self::cache_key(registration_id);
        fetch_with_cache(&self.cache, &key, self.ttl, || {
            self.backend.fetch_visitors(registration_id)
        })
        .await
    }

    /// Mark a visitor as checked in (or undo it).
    pub async fn set_completed(
        &self,
        registration_id: RegistrationId,
        visitor_id: VisitorId,
        completed: bool,
    ) -> Result<(), ApiError> {
        if self.mode == AppMode::Demo {
            return Ok(());
        }

        self.backend
            .set_visitor_completed(visitor_id, completed)
            .await?;
        info!(registration_id, visitor_id, completed, "Visitor status updated");

        self.cache.invalidate(&Self::cache_key(registration_id));
        self.cache.invalidate(&CacheKey::dashboard_stats());
        Ok(())
    }

    /// Flip the visitor's check-in flag; returns the new value.
    pub async fn toggle(&self, visitor: &Visitor) -> Result<bool, ApiError> {
        let completed = !visitor.is_completed;
        self.set_completed(visitor.registration_id, visitor.id, completed)
            .await?;
        Ok(completed)
    }

    pub fn invalidate(&self, registration_id: RegistrationId) {
        self.cache.invalidate(&Self::cache_key(registration_id));
    }
}
