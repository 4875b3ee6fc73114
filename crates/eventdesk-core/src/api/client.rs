//! API client for the hosted event backend.
//!
//! The backend exposes PostgREST-style table endpoints under `/rest/v1/` and
//! RPC functions under `/rest/v1/rpc/`. Every request carries the project's
//! anon key; signed-in requests also carry the user's access token.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use super::{ApiError, Backend};
use crate::models::{
    DashboardStats, EventId, NewRegistration, RegistrationId, RegistrationSummary, Visitor,
    VisitorId,
};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

const REGISTRATION_COLUMNS: &str = "id,name,created_at";
const VISITOR_COLUMNS: &str = "id,registration_id,name,is_completed,visit_type,food_preference";

/// RPC functions return either a single row or a one-row set depending on
/// how they were declared.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcRows<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> RpcRows<T> {
    fn into_first(self) -> Option<T> {
        match self {
            RpcRows::One(row) => Some(row),
            RpcRows::Many(rows) => rows.into_iter().next(),
        }
    }

    /// The first row, or `InvalidResponse` naming the function if there is none.
    fn require_first(self, function: &str) -> Result<T, ApiError> {
        self.into_first()
            .ok_or_else(|| ApiError::InvalidResponse(format!("{} returned no rows", function)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CreatedRegistration {
    Id(RegistrationId),
    Row { id: RegistrationId },
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            access_token: None,
        })
    }

    pub fn set_token(&mut self, token: String) {
        self.access_token = Some(token);
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .header(header::ACCEPT, "application/json")
    }

    /// Send a request, retrying with exponential backoff while rate limited.
    /// `build` is called once per attempt.
    async fn send(&self, url: &str, build: impl Fn() -> RequestBuilder) -> Result<Response, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build().send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
    }

    async fn parse<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let response = self
            .send(url, || self.request(Method::GET, url).query(query))
            .await?;
        Self::parse(url, response).await
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        function: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let url = self.rpc_url(function);
        let response = self
            .send(&url, || self.request(Method::POST, &url).json(body))
            .await?;
        Self::parse(&url, response).await
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn fetch_dashboard_stats(&self, since: DateTime<Utc>) -> Result<DashboardStats, ApiError> {
        let body = serde_json::json!({ "since": since });
        let rows: RpcRows<DashboardStats> = self.rpc("get_dashboard_stats", &body).await?;
        let mut stats = rows.require_first("get_dashboard_stats")?;
        if stats.since.is_none() {
            stats.since = Some(since);
        }
        debug!(total_registrations = stats.total_registrations, "Dashboard stats fetched");
        Ok(stats)
    }

    async fn fetch_registrations(
        &self,
        event_id: EventId,
    ) -> Result<Vec<RegistrationSummary>, ApiError> {
        let url = self.table_url("registrations");
        let query = [
            ("select", REGISTRATION_COLUMNS.to_string()),
            ("event_id", format!("eq.{}", event_id)),
            ("order", "created_at.desc".to_string()),
        ];
        let registrations: Vec<RegistrationSummary> = self.get(&url, &query).await?;
        debug!(event_id, count = registrations.len(), "Registrations fetched");
        Ok(registrations)
    }

    async fn create_registration(
        &self,
        registration: &NewRegistration,
    ) -> Result<RegistrationId, ApiError> {
        let body = serde_json::json!({ "payload": registration });
        let rows: RpcRows<CreatedRegistration> = self.rpc("create_registration", &body).await?;
        let id = match rows.require_first("create_registration")? {
            CreatedRegistration::Id(id) | CreatedRegistration::Row { id } => id,
        };
        debug!(registration_id = id, "Registration created");
        Ok(id)
    }

    async fn delete_registration(&self, registration_id: RegistrationId) -> Result<(), ApiError> {
        let url = self.table_url("registrations");
        let query = [("id", format!("eq.{}", registration_id))];
        self.send(&url, || {
            self.request(Method::DELETE, &url)
                .query(&query)
                .header("Prefer", "return=minimal")
        })
        .await?;
        Ok(())
    }

    async fn fetch_visitors(&self, registration_id: RegistrationId) -> Result<Vec<Visitor>, ApiError> {
        let url = self.table_url("visitors");
        let query = [
            ("select", VISITOR_COLUMNS.to_string()),
            ("registration_id", format!("eq.{}", registration_id)),
            ("order", "id.asc".to_string()),
        ];
        self.get(&url, &query).await
    }

    async fn set_visitor_completed(
        &self,
        visitor_id: VisitorId,
        completed: bool,
    ) -> Result<(), ApiError> {
        let url = self.table_url("visitors");
        let query = [("id", format!("eq.{}", visitor_id))];
        let body = serde_json::json!({ "is_completed": completed });
        self.send(&url, || {
            self.request(Method::PATCH, &url)
                .query(&query)
                .header("Prefer", "return=minimal")
                .json(&body)
        })
        .await?;
        Ok(())
    }
}
