//! Backend access.
//!
//! `Backend` is the seam the services talk to. `ApiClient` implements it
//! against a PostgREST-style REST/RPC backend; tests and demo tooling supply
//! their own implementations.

pub mod backend;
pub mod client;
pub mod error;

pub use backend::Backend;
pub use client::ApiClient;
pub use error::ApiError;
