//! Application root: one cache manager and the services built on it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError, Backend};
use crate::cache::{CacheError, CacheManager};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::models::{DashboardStats, EventId, RegistrationSummary};
use crate::services::{DashboardService, Fetched, RegistrationService, VisitorService};
use crate::store::DiskStore;

pub struct AdminContext {
    pub cache: Arc<CacheManager>,
    pub dashboard: DashboardService,
    pub registrations: RegistrationService,
    pub visitors: VisitorService,
}

impl AdminContext {
    pub fn new(
        config: &Config,
        cache_dir: PathBuf,
        backend: Arc<dyn Backend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let settings = &config.cache;
        let mode = config.mode();
        debug!(?cache_dir, ?mode, "Building admin context");

        let cache = Arc::new(CacheManager::new(
            DiskStore::new(cache_dir),
            settings.memory_capacity,
            clock,
        ));

        Self {
            dashboard: DashboardService::new(
                cache.clone(),
                backend.clone(),
                mode,
                settings.dashboard_ttl(),
            ),
            registrations: RegistrationService::new(
                cache.clone(),
                backend.clone(),
                mode,
                settings.registrations_ttl(),
            ),
            visitors: VisitorService::new(cache.clone(), backend, mode, settings.visitors_ttl()),
            cache,
        }
    }

    /// Context talking to the configured backend with the wall clock.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache_dir = config
            .cache_dir()
            .unwrap_or_else(|_| PathBuf::from("./cache"));

        let backend_url = config.backend_url.clone().unwrap_or_default();
        let anon_key = config.anon_key.clone().unwrap_or_default();
        if !config.demo_mode && backend_url.is_empty() {
            anyhow::bail!("No backend URL configured (set EVENTDESK_BACKEND_URL or enable demo mode)");
        }

        let mut client =
            ApiClient::new(backend_url, anon_key).context("Failed to create API client")?;
        if let Some(token) = config.access_token.clone() {
            client.set_token(token);
        }

        Ok(Self::new(
            config,
            cache_dir,
            Arc::new(client),
            Arc::new(SystemClock),
        ))
    }

    /// Fetch the dashboard and an event's registrations concurrently.
    pub async fn warm(
        &self,
        event_id: EventId,
    ) -> (
        Result<Fetched<DashboardStats>, ApiError>,
        Result<Fetched<Vec<RegistrationSummary>>, ApiError>,
    ) {
        futures::join!(self.dashboard.stats(), self.registrations.list(event_id))
    }

    /// User-triggered "clear all data".
    pub fn clear_all_data(&self) -> Result<(), CacheError> {
        info!("Clearing all cached data");
        self.cache.clear_all()
    }
}
