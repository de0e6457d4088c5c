use crate::schema::configs;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The process-wide policy singleton (§3). There is exactly one row, `id = 1`.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = configs)]
pub struct Config {
    pub id: i32,
    pub allowed_countries: Vec<String>,
    pub vip_users: Vec<String>,
    pub alert_is_vip_only: bool,
    pub alert_minimum_risk_score: Option<String>,
}

impl Config {
    pub const SINGLETON_ID: i32 = 1;

    pub fn allowed_countries_set(&self) -> HashSet<&str> {
        self.allowed_countries.iter().map(String::as_str).collect()
    }

    pub fn vip_users_set(&self) -> HashSet<&str> {
        self.vip_users.iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = configs)]
pub struct NewConfig {
    pub id: i32,
    pub allowed_countries: Vec<String>,
    pub vip_users: Vec<String>,
    pub alert_is_vip_only: bool,
    pub alert_minimum_risk_score: Option<String>,
}

impl NewConfig {
    pub fn from_detection_config(detection: &crate::config::DetectionConfig) -> Self {
        NewConfig {
            id: Config::SINGLETON_ID,
            allowed_countries: detection.allowed_countries.iter().cloned().collect(),
            vip_users: detection.vip_users.iter().cloned().collect(),
            alert_is_vip_only: detection.alert_is_vip_only,
            alert_minimum_risk_score: None,
        }
    }
}
