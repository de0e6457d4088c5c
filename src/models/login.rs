use crate::schema::logins;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A canonical login record, keyed per §3 by (user, user_agent, country, index).
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = logins)]
pub struct Login {
    pub id: Uuid,
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub user_agent: String,
    pub index: String,
    pub updated: DateTime<Utc>,
}

impl Login {
    pub fn key(&self) -> (Uuid, &str, &str, &str) {
        (self.user_id, self.user_agent.as_str(), self.country.as_str(), self.index.as_str())
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = logins)]
pub struct NewLogin {
    pub id: Uuid,
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub user_agent: String,
    pub index: String,
    pub updated: DateTime<Utc>,
}

impl NewLogin {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        timestamp: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        country: String,
        user_agent: String,
        index: String,
        now: DateTime<Utc>,
    ) -> Self {
        NewLogin {
            id: Uuid::new_v4(),
            user_id,
            timestamp,
            latitude,
            longitude,
            country,
            user_agent,
            index,
            updated: now,
        }
    }
}
