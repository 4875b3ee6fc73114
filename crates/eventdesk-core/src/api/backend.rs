use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::ApiError;
use crate::models::{
    DashboardStats, EventId, NewRegistration, RegistrationId, RegistrationSummary, Visitor,
    VisitorId,
};

/// Remote source of truth for everything the services cache.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Aggregate counts for everything since `since`.
    async fn fetch_dashboard_stats(&self, since: DateTime<Utc>) -> Result<DashboardStats, ApiError>;

    /// Registrations for an event, newest first.
    async fn fetch_registrations(
        &self,
        event_id: EventId,
    ) -> Result<Vec<RegistrationSummary>, ApiError>;

    async fn create_registration(
        &self,
        registration: &NewRegistration,
    ) -> Result<RegistrationId, ApiError>;

    async fn delete_registration(&self, registration_id: RegistrationId) -> Result<(), ApiError>;

    async fn fetch_visitors(&self, registration_id: RegistrationId)
        -> Result<Vec<Visitor>, ApiError>;

    async fn set_visitor_completed(
        &self,
        visitor_id: VisitorId,
        completed: bool,
    ) -> Result<(), ApiError>;
}
