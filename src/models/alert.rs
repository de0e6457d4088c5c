use crate::schema::alerts;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertName {
    ImpTravel,
    NewDevice,
    NewCountry,
}

impl AlertName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertName::ImpTravel => "Imp Travel",
            AlertName::NewDevice => "New Device",
            AlertName::NewCountry => "New Country",
        }
    }
}

impl fmt::Display for AlertName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reason an alert is excluded from risk aggregation. Order matters: per §4.5,
/// `IS_VIP_FILTER` is always appended before `ALLOWED_COUNTRY_FILTER` when both apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    IsVipFilter,
    AllowedCountryFilter,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::IsVipFilter => "is_vip_filter",
            FilterType::AllowedCountryFilter => "allowed_country_filter",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = alerts)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub login_raw_data: JsonValue,
    pub is_filtered: bool,
    pub filter_type: Vec<String>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = alerts)]
pub struct NewAlert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub login_raw_data: JsonValue,
    pub is_filtered: bool,
    pub filter_type: Vec<String>,
    pub updated: DateTime<Utc>,
}

impl NewAlert {
    pub fn new(
        user_id: Uuid,
        name: AlertName,
        description: String,
        login_raw_data: JsonValue,
        filter_type: Vec<FilterType>,
        now: DateTime<Utc>,
    ) -> Self {
        let is_filtered = !filter_type.is_empty();
        NewAlert {
            id: Uuid::new_v4(),
            user_id,
            name: name.as_str().to_string(),
            description,
            login_raw_data,
            is_filtered,
            filter_type: filter_type.iter().map(|f| f.as_str().to_string()).collect(),
            updated: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_type_strings_match_scenario_d() {
        assert_eq!(FilterType::IsVipFilter.as_str(), "is_vip_filter");
        assert_eq!(FilterType::AllowedCountryFilter.as_str(), "allowed_country_filter");
    }

    #[test]
    fn alert_name_strings_match_description_format() {
        assert_eq!(AlertName::ImpTravel.as_str(), "Imp Travel");
        assert_eq!(AlertName::NewDevice.as_str(), "New Device");
        assert_eq!(AlertName::NewCountry.as_str(), "New Country");
    }
}
