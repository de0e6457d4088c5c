use crate::schema::users;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Per-user risk label, written by the risk aggregator (`risk_aggregator::update_risk_level`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskScore {
    NoRisk,
    Low,
    Medium,
    High,
}

impl RiskScore {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskScore::NoRisk => "No risk",
            RiskScore::Low => "Low",
            RiskScore::Medium => "Medium",
            RiskScore::High => "High",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "Low" => RiskScore::Low,
            "Medium" => RiskScore::Medium,
            "High" => RiskScore::High,
            _ => RiskScore::NoRisk,
        }
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for RiskScore {
    fn default() -> Self {
        RiskScore::NoRisk
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub risk_score: String,
    pub created_at: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl User {
    pub fn risk_score(&self) -> RiskScore {
        RiskScore::from_str_lossy(&self.risk_score)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub risk_score: String,
    pub created_at: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl NewUser {
    pub fn for_username(username: &str, now: DateTime<Utc>) -> Self {
        NewUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            risk_score: RiskScore::NoRisk.as_str().to_string(),
            created_at: now,
            updated: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_score_round_trips_through_its_display_string() {
        for score in [RiskScore::NoRisk, RiskScore::Low, RiskScore::Medium, RiskScore::High] {
            assert_eq!(RiskScore::from_str_lossy(score.as_str()), score);
        }
    }

    #[test]
    fn unknown_risk_score_string_defaults_to_no_risk() {
        assert_eq!(RiskScore::from_str_lossy("garbage"), RiskScore::NoRisk);
    }
}
