use crate::schema::users_ips;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Records that an IP has ever been observed for a User, per §3's UsersIP entity.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = users_ips)]
pub struct UsersIp {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ip: String,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users_ips)]
pub struct NewUsersIp {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ip: String,
    pub updated: DateTime<Utc>,
}

impl NewUsersIp {
    pub fn new(user_id: Uuid, ip: String, now: DateTime<Utc>) -> Self {
        NewUsersIp {
            id: Uuid::new_v4(),
            user_id,
            ip,
            updated: now,
        }
    }
}
