// Shared by several test binaries; not every helper is used by each.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use eventdesk_core::models::{
    DashboardStats, EventId, FoodPreference, NewRegistration, RegistrationId,
    RegistrationSummary, VisitType, Visitor, VisitorId,
};
use eventdesk_core::{AdminContext, ApiError, Backend, Config, ManualClock};

#[derive(Default)]
struct State {
    stats: DashboardStats,
    registrations: HashMap<EventId, Vec<RegistrationSummary>>,
    visitors: HashMap<RegistrationId, Vec<Visitor>>,
    next_id: RegistrationId,
}

/// In-memory backend with a failure switch and call counters.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
    failing: AtomicBool,
    pub stats_calls: AtomicUsize,
    pub registration_calls: AtomicUsize,
    pub visitor_calls: AtomicUsize,
    pub mutation_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().next_id = 100;
        backend
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_stats(&self, stats: DashboardStats) {
        self.state.lock().unwrap().stats = stats;
    }

    pub fn set_registrations(&self, event_id: EventId, registrations: Vec<RegistrationSummary>) {
        self.state
            .lock()
            .unwrap()
            .registrations
            .insert(event_id, registrations);
    }

    pub fn set_visitors(&self, registration_id: RegistrationId, visitors: Vec<Visitor>) {
        self.state
            .lock()
            .unwrap()
            .visitors
            .insert(registration_id, visitors);
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ApiError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ApiError::Unavailable("network unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn fetch_dashboard_stats(&self, since: DateTime<Utc>) -> Result<DashboardStats, ApiError> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut stats = self.state.lock().unwrap().stats.clone();
        stats.since = Some(since);
        Ok(stats)
    }

    async fn fetch_registrations(
        &self,
        event_id: EventId,
    ) -> Result<Vec<RegistrationSummary>, ApiError> {
        self.registration_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .registrations
            .get(&event_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_registration(
        &self,
        registration: &NewRegistration,
    ) -> Result<RegistrationId, ApiError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state
            .registrations
            .entry(registration.event_id)
            .or_default()
            .insert(
                0,
                RegistrationSummary {
                    id,
                    name: registration.name.clone(),
                    created_at: Utc::now(),
                },
            );
        state.stats.total_registrations += 1;
        Ok(id)
    }

    async fn delete_registration(&self, registration_id: RegistrationId) -> Result<(), ApiError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut state = self.state.lock().unwrap();
        for registrations in state.registrations.values_mut() {
            registrations.retain(|r| r.id != registration_id);
        }
        state.visitors.remove(&registration_id);
        Ok(())
    }

    async fn fetch_visitors(&self, registration_id: RegistrationId) -> Result<Vec<Visitor>, ApiError> {
        self.visitor_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .visitors
            .get(&registration_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_visitor_completed(
        &self,
        visitor_id: VisitorId,
        completed: bool,
    ) -> Result<(), ApiError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let visitor = state
            .visitors
            .values_mut()
            .flat_map(|v| v.iter_mut())
            .find(|v| v.id == visitor_id)
            .ok_or_else(|| ApiError::NotFound(format!("visitor {}", visitor_id)))?;
        visitor.is_completed = completed;
        Ok(())
    }
}

pub struct Harness {
    pub ctx: AdminContext,
    pub backend: Arc<FakeBackend>,
    pub clock: Arc<ManualClock>,
    pub dir: TempDir,
}

pub fn harness() -> Harness {
    harness_with(Config::default())
}

pub fn harness_with(config: Config) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FakeBackend::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap(),
    ));
    let ctx = AdminContext::new(&config, dir.path().join("cache"), backend.clone(), clock.clone());
    Harness {
        ctx,
        backend,
        clock,
        dir,
    }
}

pub fn stats(total_registrations: u32) -> DashboardStats {
    DashboardStats {
        total_registrations,
        total_visitors: total_registrations * 2,
        ..Default::default()
    }
}

pub fn summary(id: RegistrationId, name: &str, minutes: i64) -> RegistrationSummary {
    RegistrationSummary {
        id,
        name: name.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes),
    }
}

pub fn visitor(id: VisitorId, registration_id: RegistrationId, is_completed: bool) -> Visitor {
    Visitor {
        id,
        registration_id,
        name: format!("Visitor {}", id),
        is_completed,
        visit_type: VisitType::SingleDay,
        food_preference: FoodPreference::Vegetarian,
    }
}
