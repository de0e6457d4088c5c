use crate::geo::{round_velocity, velocity, GeoPoint};
use crate::models::{AlertName, Login, User};

use super::{Detector, NormalizedEvent, PendingAlert};

/// §4.4: compares the candidate event against the most recent strictly-prior Login
/// and alerts if the implied ground velocity exceeds `velocity_max_kmh`.
pub struct ImpossibleTravelDetector {
    pub velocity_max_kmh: f64,
}

impl Detector for ImpossibleTravelDetector {
    fn evaluate(&self, user: &User, event: &NormalizedEvent, logins: &[Login]) -> Option<PendingAlert> {
        let prior = most_recent_prior(logins, event.timestamp)?;

        let prior_point = GeoPoint::new(prior.latitude, prior.longitude);
        let candidate_point = GeoPoint::new(event.latitude, event.longitude);
        let v = velocity(prior_point, prior.timestamp, candidate_point, event.timestamp);

        if v <= self.velocity_max_kmh {
            return None;
        }

        Some(PendingAlert {
            name: AlertName::ImpTravel,
            description: format!(
                "Impossible Travel detected for User: {}, at: {}, from: {}, previous country: {}, distance covered at {} Km/h",
                user.username,
                event.timestamp.to_rfc3339(),
                event.country,
                prior.country,
                round_velocity(v),
            ),
        })
    }
}

/// Most recent Login strictly before `ts`; ties broken by lexicographically
/// greatest user_agent, per §4.4's tie-break rule.
fn most_recent_prior(logins: &[Login], ts: chrono::DateTime<chrono::Utc>) -> Option<&Login> {
    logins
        .iter()
        .filter(|l| l.timestamp < ts)
        .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.user_agent.cmp(&b.user_agent)))
}
