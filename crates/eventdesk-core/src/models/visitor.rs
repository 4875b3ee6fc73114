use serde::{Deserialize, Serialize};

use super::RegistrationId;

pub type VisitorId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum VisitType {
    SingleDay,
    MultiDay,
}

impl std::fmt::Display for VisitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisitType::SingleDay => write!(f, "Single day"),
            VisitType::MultiDay => write!(f, "Multi day"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum FoodPreference {
    Vegetarian,
    NonVegetarian,
    NoMeal,
}

impl std::fmt::Display for FoodPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FoodPreference::Vegetarian => write!(f, "Veg"),
            FoodPreference::NonVegetarian => write!(f, "Non-veg"),
            FoodPreference::NoMeal => write!(f, "No meal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Visitor {
    pub id: VisitorId,
    pub registration_id: RegistrationId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_completed: bool,
    pub visit_type: VisitType,
    pub food_preference: FoodPreference,
}

impl Visitor {
    pub fn status_label(&self) -> &'static str {
        if self.is_completed {
            "Checked in"
        } else {
            "Pending"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visitor_from_backend_row() {
        let json = r#"{
            "id": 41,
            "registration_id": 17,
            "name": "Ravi",
            "is_completed": true,
            "visit_type": "multi_day",
            "food_preference": "non_vegetarian"
        }"#;
        let visitor: Visitor = serde_json::from_str(json).unwrap();
        assert_eq!(visitor.id, 41);
        assert_eq!(visitor.visit_type, VisitType::MultiDay);
        assert_eq!(visitor.food_preference, FoodPreference::NonVegetarian);
        assert_eq!(visitor.status_label(), "Checked in");
    }

    #[test]
    fn test_missing_flag_defaults_to_pending() {
        let json = r#"{
            "id": 1,
            "registration_id": 2,
            "visit_type": "single_day",
            "food_preference": "no_meal"
        }"#;
        let visitor: Visitor = serde_json::from_str(json).unwrap();
        assert!(!visitor.is_completed);
        assert_eq!(visitor.name, "");
    }
}
