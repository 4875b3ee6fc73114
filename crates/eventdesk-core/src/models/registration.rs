use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{EventId, FoodPreference, VisitType};

pub type RegistrationId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RegistrationSummary {
    pub id: RegistrationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Online,
    Waived,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "Cash"),
            PaymentMethod::Online => write!(f, "Online"),
            PaymentMethod::Waived => write!(f, "Waived"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PersonEntry {
    pub name: String,
    pub visit_type: VisitType,
    pub food_preference: FoodPreference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    /// Minor currency units.
    pub amount: i64,
    pub reference: Option<String>,
}

/// Payload for creating a registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewRegistration {
    pub event_id: EventId,
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
    pub persons: Vec<PersonEntry>,
    pub payment: PaymentInfo,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Registration name is required")]
    MissingName,

    #[error("At least one person is required")]
    NoPersons,

    #[error("Person {0} has no name")]
    UnnamedPerson(usize),

    #[error("Payment amount cannot be negative")]
    NegativeAmount,
}

impl NewRegistration {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.persons.is_empty() {
            return Err(ValidationError::NoPersons);
        }
        if let Some(index) = self.persons.iter().position(|p| p.name.trim().is_empty()) {
            return Err(ValidationError::UnnamedPerson(index + 1));
        }
        if self.payment.amount < 0 {
            return Err(ValidationError::NegativeAmount);
        }
        Ok(())
    }
}
