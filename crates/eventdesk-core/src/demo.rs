//! Built-in sample data served in demo mode, so the front-end can run
//! without a backend. Nothing here touches the cache.

use chrono::{DateTime, TimeZone, Utc};

use crate::models::{
    DashboardStats, EventId, FoodPreference, RegistrationId, RegistrationSummary, VisitType,
    Visitor,
};

/// Id returned by registration creation in demo mode.
pub const DEMO_REGISTRATION_ID: RegistrationId = 9000;

const DEMO_NAMES: [&str; 4] = [
    "Sharma family",
    "Okafor household",
    "Lindqvist group",
    "Tanaka family",
];

fn demo_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn dashboard_stats(since: DateTime<Utc>) -> DashboardStats {
    DashboardStats {
        since: Some(since),
        total_registrations: 4,
        total_visitors: 11,
        checked_in_visitors: 6,
        single_day_visitors: 7,
        multi_day_visitors: 4,
        vegetarian_meals: 5,
        non_vegetarian_meals: 4,
        no_meal: 2,
        cash_payments: 2,
        online_payments: 1,
        waived_payments: 1,
        amount_collected: 150_000,
    }
}

/// Registrations for any event, newest first.
pub fn registrations(_event_id: EventId) -> Vec<RegistrationSummary> {
    let epoch = demo_epoch();
    DEMO_NAMES
        .iter()
        .enumerate()
        .rev()
        .map(|(i, name)| RegistrationSummary {
            id: DEMO_REGISTRATION_ID + 1 + i as RegistrationId,
            name: name.to_string(),
            created_at: epoch + chrono::Duration::minutes(17 * i as i64),
        })
        .collect()
}

pub fn visitors(registration_id: RegistrationId) -> Vec<Visitor> {
    let people = [
        ("Meera", VisitType::SingleDay, FoodPreference::Vegetarian, true),
        ("Arjun", VisitType::MultiDay, FoodPreference::NonVegetarian, false),
        ("Kavya", VisitType::SingleDay, FoodPreference::NoMeal, false),
    ];
    people
        .iter()
        .enumerate()
        .map(|(i, (name, visit_type, food_preference, is_completed))| Visitor {
            id: registration_id.wrapping_mul(10).wrapping_add(i as i64),
            registration_id,
            name: name.to_string(),
            is_completed: *is_completed,
            visit_type: *visit_type,
            food_preference: *food_preference,
        })
        .collect()
}
