//! Core library for eventdesk.
//!
//! This crate holds everything below the UI of the event registration and
//! check-in admin tool:
//!
//! - `store`: JSON files on disk, one per cache key
//! - `cache`: the in-memory session tier and the `CacheManager` that
//!   composes it with the disk store
//! - `services`: dashboard, registration and visitor services with
//!   fetch-with-cache, stale fallback and invalidation on mutation
//! - `api`: the `Backend` seam and the REST `ApiClient`
//! - `models`, `config`, `context`, `demo`, `clock`

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod demo;
pub mod models;
pub mod services;
pub mod store;

pub use api::{ApiClient, ApiError, Backend};
pub use cache::{CacheError, CacheKey, CacheManager};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheSettings, Config};
pub use context::AdminContext;
pub use services::{AppMode, DataSource, Fetched};
pub use store::{DiskStore, StoreError};
