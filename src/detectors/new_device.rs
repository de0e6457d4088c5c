use crate::models::{AlertName, Login, User};

use super::{Detector, NormalizedEvent, PendingAlert};

/// §4.2: alerts when the candidate event's user-agent has never been seen for this user.
pub struct NewDeviceDetector;

impl Detector for NewDeviceDetector {
    fn evaluate(&self, user: &User, event: &NormalizedEvent, logins: &[Login]) -> Option<PendingAlert> {
        let seen_before = logins.iter().any(|l| l.user_agent == event.user_agent);
        if seen_before {
            return None;
        }

        Some(PendingAlert {
            name: AlertName::NewDevice,
            description: format!(
                "Login from new device for User: {}, at: {}",
                user.username,
                event.timestamp.to_rfc3339(),
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

    fn login(user_id: Uuid, user_agent: &str) -> Login {
        Login {
            id: Uuid::new_v4(),
            user_id,
            timestamp: Utc::now(),
            latitude: 0.0,
            longitude: 0.0,
            country: "Sudan".to_string(),
            user_agent: user_agent.to_string(),
            index: "idx".to_string(),
            updated: Utc::now(),
        }
    }

    fn event(user_agent: &str) -> NormalizedEvent {
        NormalizedEvent {
            id: "evt".to_string(),
            index: "idx".to_string(),
            ip: "1.2.3.4".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            country: "Sudan".to_string(),
            user_agent: user_agent.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn alerts_on_unseen_user_agent() {
        let u = user("Lorena Goldoni");
        let history = vec![login(u.id, "Chromium")];
        let candidate = event("Firefox");
        let alert = NewDeviceDetector.evaluate(&u, &candidate, &history).expect("expected alert");
        assert_eq!(alert.name.as_str(), "New Device");
        assert!(alert.description.starts_with("Login from new device for User: Lorena Goldoni, at:"));
    }

    #[test]
    fn no_alert_on_seen_user_agent() {
        let u = user("Lorena Goldoni");
        let history = vec![login(u.id, "Chromium")];
        let candidate = event("Chromium");
        assert!(NewDeviceDetector.evaluate(&u, &candidate, &history).is_none());
    }
}
