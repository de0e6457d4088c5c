//! The three anomaly detectors (§4.2–§4.4) and the small trait they share.

pub mod impossible_travel;
pub mod new_country;
pub mod new_device;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::models::{AlertName, Login, User};

/// A normalized authentication event, already past timestamp/field validation (§4.1, §6).
#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub id: String,
    pub index: String,
    pub ip: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

impl NormalizedEvent {
    pub fn to_raw_json(&self) -> JsonValue {
        serde_json::json!({
            "id": self.id,
            "index": self.index,
            "ip": self.ip,
            "lat": self.latitude,
            "lon": self.longitude,
            "country": self.country,
            "agent": self.user_agent,
            "timestamp": self.timestamp.to_rfc3339(),
        })
    }
}

/// A detector's verdict before alert-filtering and persistence (§4.6 step 3).
pub struct PendingAlert {
    pub name: AlertName,
    pub description: String,
}

/// Implemented by the three detector unit structs; dispatched through a
/// `Vec<Box<dyn Detector>>` the way the teacher's `Database` enum dispatches
/// over its two backing stores, except here the set is closed and stateless (§9).
pub trait Detector {
    fn evaluate(&self, user: &User, event: &NormalizedEvent, logins: &[Login]) -> Option<PendingAlert>;
}

pub fn all_detectors(velocity_max_kmh: f64) -> Vec<Box<dyn Detector + Send + Sync>> {
    vec![
        Box::new(new_device::NewDeviceDetector),
        Box::new(new_country::NewCountryDetector),
        Box::new(impossible_travel::ImpossibleTravelDetector { velocity_max_kmh }),
    ]
}
