//! Data models mirroring the backend tables.
//!
//! - `DashboardStats`: today's aggregate counts
//! - `RegistrationSummary`, `NewRegistration`: registrations for an event
//! - `Visitor`: one person attached to a registration, with check-in flag
//! - Shared enums: `VisitType`, `FoodPreference`, `PaymentMethod`

pub mod dashboard;
pub mod registration;
pub mod visitor;

pub use dashboard::DashboardStats;
pub use registration::{
    ContactInfo, NewRegistration, PaymentInfo, PaymentMethod, PersonEntry, RegistrationId,
    RegistrationSummary, ValidationError,
};
pub use visitor::{FoodPreference, VisitType, Visitor, VisitorId};

/// Identifier of an event.
pub type EventId = i64;
