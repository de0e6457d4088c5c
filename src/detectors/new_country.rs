use crate::models::{AlertName, Login, User};

use super::{Detector, NormalizedEvent, PendingAlert};

/// §4.3: alerts when the candidate event's (non-empty) country has never been seen
/// for this user. An empty country is "not checkable" and never alerts.
pub struct NewCountryDetector;

impl Detector for NewCountryDetector {
    fn evaluate(&self, user: &User, event: &NormalizedEvent, logins: &[Login]) -> Option<PendingAlert> {
        if event.country.is_empty() {
            return None;
        }

        let seen_before = logins.iter().any(|l| l.country == event.country);
        if seen_before {
            return None;
        }

        Some(PendingAlert {
            name: AlertName::NewCountry,
            description: format!(
                "Login from new country for User: {}, at: {}, from: {}",
                user.username,
                event.timestamp.to_rfc3339(),
                event.country,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(username: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            risk_score: "No risk".to_string(),
            created_at: Utc::now(),
            updated: Utc::now(),
        }
    }

    fn login(user_id: Uuid, country: &str) -> Login {
        Login {
            id: Uuid::new_v4(),
            user_id,
            timestamp: Utc::now(),
            latitude: 0.0,
            longitude: 0.0,
            country: country.to_string(),
            user_agent: "Chromium".to_string(),
            index: "idx".to_string(),
            updated: Utc::now(),
        }
    }

    fn event(country: &str) -> NormalizedEvent {
        NormalizedEvent {
            id: "evt".to_string(),
            index: "idx".to_string(),
            ip: "1.2.3.4".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            country: country.to_string(),
            user_agent: "Chromium".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn alerts_on_unseen_country() {
        let u = user("Aisha Delgado");
        let history = vec![login(u.id, "India")];
        let candidate = event("United States");
        let alert = NewCountryDetector.evaluate(&u, &candidate, &history).expect("expected alert");
        assert_eq!(alert.name.as_str(), "New Country");
        assert!(alert.description.contains("from: United States"));
    }

    #[test]
    fn no_alert_on_seen_country() {
        let u = user("Lorena Goldoni");
        let history = vec![login(u.id, "Sudan")];
        let candidate = event("Sudan");
        assert!(NewCountryDetector.evaluate(&u, &candidate, &history).is_none());
    }

    #[test]
    fn no_alert_on_empty_country() {
        let u = user("Lorena Goldoni");
        let history: Vec<Login> = vec![];
        let candidate = event("");
        assert!(NewCountryDetector.evaluate(&u, &candidate, &history).is_none());
    }
}
