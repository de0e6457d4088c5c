//! End-to-end tests driving the detection pipeline against `MemoryDb`, covering
//! the lettered scenarios from spec §8 that need more than one component wired
//! together (field processor + detectors + alert filter + persistence).

use chrono::{DateTime, Utc};

use buffalogs_rs::alert_filter;
use buffalogs_rs::db::DatabaseConnection;
use buffalogs_rs::detectors::NormalizedEvent;
use buffalogs_rs::field_processor::process_user_events;
use buffalogs_rs::models::{Config, NewLogin, NewUser, RiskScore};
use buffalogs_rs::risk_aggregator::update_risk_scores;

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn event(id: &str, country: &str, agent: &str, lat: f64, lon: f64, ts: DateTime<Utc>) -> NormalizedEvent {
    NormalizedEvent {
        id: id.to_string(),
        index: "cloud-test-2023-5-3".to_string(),
        ip: "10.0.0.1".to_string(),
        latitude: lat,
        longitude: lon,
        country: country.to_string(),
        user_agent: agent.to_string(),
        timestamp: ts,
    }
}

fn open_config() -> Config {
    Config {
        id: 1,
        allowed_countries: Vec::new(),
        vip_users: Vec::new(),
        alert_is_vip_only: false,
        alert_minimum_risk_score: None,
    }
}

/// Seeds a prior Login directly (bypassing the field processor), so a test can
/// exercise the detectors against an established history without the seeding
/// event itself contributing any alerts.
async fn seed_prior_login(
    db: &DatabaseConnection,
    user_id: uuid::Uuid,
    country: &str,
    agent: &str,
    lat: f64,
    lon: f64,
    timestamp: DateTime<Utc>,
) {
    db.upsert_login(NewLogin::new(
        user_id,
        timestamp,
        lat,
        lon,
        country.to_string(),
        agent.to_string(),
        "cloud-test-2023-5-3".to_string(),
        timestamp,
    ))
    .await
    .unwrap();
}

#[tokio::test]
async fn scenario_a_impossible_travel_raises_three_alerts() {
    let db = DatabaseConnection::new_memory();
    let now = ts("2023-05-03T06:00:00Z");
    let user = db.create_user(NewUser::for_username("Aisha Delgado", now)).await.unwrap();
    let config = open_config();

    seed_prior_login(&db, user.id, "India", "Chromium", 28.6, 77.2, ts("2023-05-03T06:50:03.768Z")).await;

    let candidate = event(
        "2",
        "United States",
        "Firefox",
        40.7,
        -74.0,
        ts("2023-05-03T06:55:31.768Z"),
    );

    process_user_events(&db, &user, &config, 300.0, &[candidate]).await.unwrap();

    let count = db.count_unfiltered_alerts_for_user(user.id).await.unwrap();
    assert_eq!(count, 3, "expected NewDevice + NewCountry + ImpTravel, per Scenario A");
}

#[tokio::test]
async fn scenario_b_new_device_only() {
    let db = DatabaseConnection::new_memory();
    let now = ts("2023-05-03T06:00:00Z");
    let user = db.create_user(NewUser::for_username("Lorena Goldoni", now)).await.unwrap();
    let config = open_config();

    seed_prior_login(&db, user.id, "Sudan", "Chromium", 15.5, 32.5, ts("2023-05-03T06:00:00Z")).await;

    let candidate = event("2", "Sudan", "Firefox", 15.51, 32.51, ts("2023-05-03T06:30:00Z"));
    process_user_events(&db, &user, &config, 300.0, &[candidate]).await.unwrap();

    let count = db.count_unfiltered_alerts_for_user(user.id).await.unwrap();
    assert_eq!(count, 1, "only NewDevice should fire: same country, plausible velocity");
}

#[tokio::test]
async fn scenario_c_upsert_refreshes_existing_login_instead_of_duplicating() {
    let db = DatabaseConnection::new_memory();
    let now = ts("2023-05-03T06:00:00Z");
    let user = db.create_user(NewUser::for_username("Bob", now)).await.unwrap();
    let config = open_config();

    let t1 = ts("2023-05-03T06:00:00Z");
    let t2 = ts("2023-05-03T06:05:00Z");
    let first = event("1", "India", "A", 10.0, 10.0, t1);
    let second = event("2", "India", "A", 20.0, 20.0, t2);

    process_user_events(&db, &user, &config, 300.0, &[first]).await.unwrap();
    process_user_events(&db, &user, &config, 300.0, &[second]).await.unwrap();

    let logins = db.find_logins_for_user(user.id).await.unwrap();
    assert_eq!(logins.len(), 1, "same (user_agent, country, index) must upsert, not duplicate");
    assert_eq!(logins[0].timestamp, t2);
    assert_eq!(logins[0].latitude, 20.0);
    assert_eq!(logins[0].longitude, 20.0);
}

#[tokio::test]
async fn scenario_d_vip_filter_composes_with_allowed_country_filter() {
    let cfg = Config {
        id: 1,
        allowed_countries: vec!["Italy".to_string(), "Romania".to_string()],
        vip_users: vec!["Aisha Delgado".to_string()],
        alert_is_vip_only: true,
        alert_minimum_risk_score: None,
    };

    let db = DatabaseConnection::new_memory();
    let now = Utc::now();
    let aisha = db.create_user(NewUser::for_username("Aisha Delgado", now)).await.unwrap();
    let bob = db.create_user(NewUser::for_username("Bob", now)).await.unwrap();

    assert!(alert_filter::classify(&cfg, &aisha, "United States").is_empty());

    let bob_us = alert_filter::classify(&cfg, &bob, "United States");
    assert_eq!(bob_us.len(), 1);

    let bob_italy = alert_filter::classify(&cfg, &bob, "Italy");
    assert_eq!(bob_italy.len(), 2);
}

#[tokio::test]
async fn scenario_f_risk_aggregation_reflects_unfiltered_alert_count() {
    let db = DatabaseConnection::new_memory();
    let now = ts("2023-05-03T06:00:00Z");
    let user = db.create_user(NewUser::for_username("Carla", now)).await.unwrap();
    let config = open_config();

    seed_prior_login(&db, user.id, "Italy", "Chromium", 41.9, 12.5, ts("2023-05-03T06:00:00Z")).await;

    // Two further new-country events, spaced months apart so velocity never
    // crosses the impossible-travel threshold; only NewCountry should fire.
    let events = [
        event("2", "Spain", "Chromium", 40.4, -3.7, ts("2023-06-03T06:00:00Z")),
        event("3", "Japan", "Chromium", 35.6, 139.7, ts("2023-07-03T06:00:00Z")),
    ];

    for e in events {
        process_user_events(&db, &user, &config, 300.0, std::slice::from_ref(&e)).await.unwrap();
    }

    let count = db.count_unfiltered_alerts_for_user(user.id).await.unwrap();
    assert_eq!(count, 2, "two NewCountry alerts, no ImpTravel given the wide time gaps");

    update_risk_scores(&db).await.unwrap();

    let updated = db.find_user_by_username("Carla").await.unwrap().unwrap();
    assert_eq!(updated.risk_score(), RiskScore::Low);
}

#[tokio::test]
async fn known_ip_and_known_login_suppresses_all_alerts_p4() {
    let db = DatabaseConnection::new_memory();
    let now = ts("2023-05-03T06:00:00Z");
    let user = db.create_user(NewUser::for_username("Dana", now)).await.unwrap();
    let config = open_config();

    let first = event("1", "Italy", "Chromium", 41.9, 12.5, ts("2023-05-03T06:00:00Z"));
    process_user_events(&db, &user, &config, 300.0, &[first.clone()]).await.unwrap();

    assert!(db.users_ip_exists(user.id, "10.0.0.1").await.unwrap());

    let repeat = event("2", "Italy", "Chromium", 41.9, 12.5, ts("2023-05-03T06:05:00Z"));
    process_user_events(&db, &user, &config, 300.0, &[repeat]).await.unwrap();

    let count = db.count_unfiltered_alerts_for_user(user.id).await.unwrap();
    assert_eq!(count, 2, "first event still alerts (NewDevice+NewCountry); the known-IP repeat must not");
}

#[tokio::test]
async fn malformed_event_is_skipped_without_persisting_login_or_alert() {
    let db = DatabaseConnection::new_memory();
    let now = ts("2023-05-03T06:00:00Z");
    let user = db.create_user(NewUser::for_username("Eve", now)).await.unwrap();

    let raw = buffalogs_rs::db::RawEvent {
        id: "bad".to_string(),
        index: "cloud-test-2023-5-3".to_string(),
        ip: "10.0.0.1".to_string(),
        lat: 0.0,
        lon: 0.0,
        country: "Italy".to_string(),
        agent: "Chromium".to_string(),
        timestamp: "not-a-timestamp".to_string(),
    };

    assert!(buffalogs_rs::field_processor::normalize(&raw).is_none());

    let logins = db.find_logins_for_user(user.id).await.unwrap();
    assert!(logins.is_empty());
}
