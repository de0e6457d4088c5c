//! §4.6: per-user event processing. Runs detectors against prior Login state,
//! filters and persists the resulting Alerts, then upserts Login and UsersIP.

use chrono::Utc;
use log::warn;

use crate::alert_filter;
use crate::db::DatabaseConnection;
use crate::detectors::{all_detectors, NormalizedEvent};
use crate::errors::DetectorError;
use crate::models::{Config, NewAlert, NewLogin, NewUsersIp, User};

/// Processes one user's chronologically-ordered event sequence for a single sub-window.
/// Events must already be sorted by timestamp ascending (the scheduler's responsibility).
pub async fn process_user_events(
    db: &DatabaseConnection,
    user: &User,
    config: &Config,
    velocity_max_kmh: f64,
    events: &[NormalizedEvent],
) -> Result<(), DetectorError> {
    let detectors = all_detectors(velocity_max_kmh);

    for event in events {
        let known_ip = db.users_ip_exists(user.id, &event.ip).await?;
        let logins = db.find_logins_for_user(user.id).await?;
        let already_known_login = logins
            .iter()
            .any(|l| l.user_agent == event.user_agent && l.country == event.country && l.index == event.index);

        // P4: a fully known (ip, login-key) pair suppresses every detector for this event.
        if !(known_ip && already_known_login) {
            for detector in &detectors {
                if let Some(pending) = detector.evaluate(user, event, &logins) {
                    let filter_type = alert_filter::classify(config, user, &event.country);
                    let new_alert = NewAlert::new(
                        user.id,
                        pending.name,
                        pending.description,
                        event.to_raw_json(),
                        filter_type,
                        Utc::now(),
                    );
                    db.insert_alert(new_alert).await?;
                }
            }
        }

        let now = Utc::now();
        let new_login = NewLogin::new(
            user.id,
            event.timestamp,
            event.latitude,
            event.longitude,
            event.country.clone(),
            event.user_agent.clone(),
            event.index.clone(),
            now,
        );
        db.upsert_login(new_login).await?;

        let new_ip = NewUsersIp::new(user.id, event.ip.clone(), now);
        db.upsert_users_ip(new_ip).await?;
    }

    Ok(())
}

/// Parses a raw upstream event into a `NormalizedEvent`, or skips it with a logged
/// warning per §4.6/§7's `MalformedEvent` policy. Returns `None` for a skip.
pub fn normalize(raw: &crate::db::RawEvent) -> Option<NormalizedEvent> {
    let timestamp = match crate::geo::parse_timestamp(&raw.timestamp) {
        Ok(ts) => ts,
        Err(err) => {
            warn!("skipping malformed event {}: {err}", raw.id);
            return None;
        }
    };

    Some(NormalizedEvent {
        id: raw.id.clone(),
        index: raw.index.clone(),
        ip: raw.ip.clone(),
        latitude: raw.lat,
        longitude: raw.lon,
        country: raw.country.clone(),
        user_agent: raw.agent.clone(),
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::RawEvent;

    #[test]
    fn normalize_rejects_bad_timestamp() {
        let raw = RawEvent {
            id: "1".to_string(),
            index: "idx".to_string(),
            ip: "1.2.3.4".to_string(),
            lat: 0.0,
            lon: 0.0,
            country: "Italy".to_string(),
            agent: "Chromium".to_string(),
            timestamp: "not-a-timestamp".to_string(),
        };
        assert!(normalize(&raw).is_none());
    }

    #[test]
    fn normalize_accepts_valid_timestamp() {
        let raw = RawEvent {
            id: "1".to_string(),
            index: "idx".to_string(),
            ip: "1.2.3.4".to_string(),
            lat: 0.0,
            lon: 0.0,
            country: "Italy".to_string(),
            agent: "Chromium".to_string(),
            timestamp: "2023-05-03T06:50:03.768Z".to_string(),
        };
        assert!(normalize(&raw).is_some());
    }
}
