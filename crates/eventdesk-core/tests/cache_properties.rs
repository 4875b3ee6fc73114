//! Behaviour of the cache manager across both tiers.

mod common;

use std::sync::Arc;

use chrono::Duration;
use eventdesk_core::cache::{CacheKey, CacheManager, Tier};
use eventdesk_core::models::DashboardStats;
use eventdesk_core::{DiskStore, ManualClock};

use common::stats;

fn manager(dir: &std::path::Path) -> (CacheManager, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    (
        CacheManager::new(DiskStore::new(dir), 32, clock.clone()),
        clock,
    )
}

#[test]
fn write_then_read_returns_the_value() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = manager(dir.path());

    let keys = [
        CacheKey::dashboard_stats(),
        CacheKey::registrations_for_event(2024),
        CacheKey::visitors_for_registration(17),
        CacheKey::custom("odd/key with spaces"),
    ];
    for (i, key) in keys.iter().enumerate() {
        cache.set(key, &stats(i as u32)).unwrap();
    }
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(cache.get::<DashboardStats>(key, None), Some(stats(i as u32)));
    }
}

#[test]
fn dashboard_scenario_expires_but_stays_available() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, clock) = manager(dir.path());
    let key = CacheKey::dashboard_stats();
    let window = Duration::seconds(300);

    cache.set_with_ttl(&key, &stats(5), window).unwrap();
    let fresh = cache.get::<DashboardStats>(&key, Some(window)).unwrap();
    assert_eq!(fresh.total_registrations, 5);

    clock.advance(Duration::seconds(301));
    assert_eq!(cache.get::<DashboardStats>(&key, Some(window)), None);

    let stale = cache.get::<DashboardStats>(&key, None).unwrap();
    assert_eq!(stale.total_registrations, 5);
}

#[test]
fn invalidating_a_key_that_was_never_cached() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = manager(dir.path());
    let key = CacheKey::registrations_for_event(2024);

    assert!(!cache.exists(&key));
    cache.invalidate(&key);
    assert!(!cache.exists(&key));
    cache.invalidate(&key);
    assert!(!cache.exists(&key));
}

#[test]
fn memory_eviction_falls_back_to_disk_and_repopulates() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = manager(dir.path());
    let key = CacheKey::visitors_for_registration(3);

    cache.set(&key, &stats(9)).unwrap();
    cache.session().clear();

    let hit = cache.get_entry::<DashboardStats>(&key, None).unwrap();
    assert_eq!(hit.value, stats(9));
    assert_eq!(hit.tier, Tier::Disk);
    assert_eq!(
        cache.session().get::<DashboardStats>(&key),
        Some(stats(9))
    );
    assert_eq!(
        cache.get_entry::<DashboardStats>(&key, None).unwrap().tier,
        Tier::Memory
    );
}

#[test]
fn persisted_data_survives_a_new_manager() {
    let dir = tempfile::tempdir().unwrap();
    let key = CacheKey::registrations_for_event(7);
    {
        let (cache, _) = manager(dir.path());
        cache
            .set_with_ttl(&key, &stats(2), Duration::minutes(30))
            .unwrap();
    }

    let (cache, _) = manager(dir.path());
    assert_eq!(
        cache.get::<DashboardStats>(&key, Some(Duration::minutes(30))),
        Some(stats(2))
    );
}

#[test]
fn expiry_sidecar_is_written_next_to_the_value() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = manager(dir.path());

    cache
        .set_with_ttl(
            &CacheKey::registrations_for_event(2024),
            &stats(1),
            Duration::minutes(30),
        )
        .unwrap();

    assert!(dir.path().join("registrations_event_2024.json").exists());
    assert!(dir.path().join("registrations_event_2024.expiry.json").exists());
}

#[test]
fn deleting_the_root_is_like_clear_all() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("cache");
    let (cache, _) = manager(&root);
    let key = CacheKey::dashboard_stats();
    cache.set(&key, &stats(1)).unwrap();

    std::fs::remove_dir_all(&root).unwrap();
    cache.session().clear();
    assert_eq!(cache.get::<DashboardStats>(&key, None), None);

    // Writes recreate the root
    cache.set(&key, &stats(2)).unwrap();
    assert!(cache.exists(&key));
}
