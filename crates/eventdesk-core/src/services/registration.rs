use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use super::{fetch_with_cache, AppMode, DataSource, Fetched};
use crate::api::{ApiError, Backend};
use crate::cache::{CacheKey, CacheManager};
use crate::demo;
use crate::models::{EventId, NewRegistration, RegistrationId, RegistrationSummary};

pub struct RegistrationService {
    cache: Arc<CacheManager>,
    backend: Arc<dyn Backend>,
    mode: AppMode,
    ttl: Duration,
}

impl RegistrationService {
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

    pub fn cache_key(event_id: EventId) -> CacheKey {
        CacheKey::registrations_for_event(event_id)
    }

    /// Registrations for an event, newest first.
    pub async fn list(
        &self,
        event_id: EventId,
    ) -> Result<Fetched<Vec<RegistrationSummary>>, ApiError> {
        if self.mode == AppMode::Demo {
            return Ok(Fetched::new(
                demo::registrations(event_id),
                DataSource::Demo,
                None,
            ));
        }

        let key = Self::cache_key(event_id);
        let backend = &self.backend;
        fetch_with_cache(&self.cache, &key, self.ttl, || async move {
            let mut registrations = backend.fetch_registrations(event_id).await?;
            registrations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok::<_, ApiError>(registrations)
        })
        .await
    }

    pub async fn create(&self, registration: &NewRegistration) -> Result<RegistrationId, ApiError> {
        registration.validate()?;
        if self.mode == AppMode::Demo {
            return Ok(demo::DEMO_REGISTRATION_ID);
        }

        let id = self.backend.create_registration(registration).await?;
        info!(
            registration_id = id,
            event_id = registration.event_id,
            persons = registration.persons.len(),
            "Registration created"
        );

        self.cache.invalidate(&Self::cache_key(registration.event_id));
        self.cache.invalidate(&CacheKey::dashboard_stats());
        Ok(id)
    }

    pub async fn delete(
        &self,
        event_id: EventId,
        registration_id: RegistrationId,
    ) -> Result<(), ApiError> {
        if self.mode == AppMode::Demo {
            return Ok(());
        }

        self.backend.delete_registration(registration_id).await?;
        info!(registration_id, event_id, "Registration deleted");

        self.cache.invalidate(&Self::cache_key(event_id));
        self.cache
            .invalidate(&CacheKey::visitors_for_registration(registration_id));
        self.cache.invalidate(&CacheKey::dashboard_stats());
        Ok(())
    }

    pub fn invalidate(&self, event_id: EventId) {
        self.cache.invalidate(&Self::cache_key(event_id));
    }
}
