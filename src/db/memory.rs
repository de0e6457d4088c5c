use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::DetectorError;
use crate::models::{
    Alert, Config, Login, NewAlert, NewConfig, NewLogin, NewTaskSettings, NewUser, NewUsersIp,
    TaskSettings, User, UsersIp,
};

/// In-memory backing store for tests and local development, mirroring the shape
/// of the teacher's `MemoryDb`: one `Mutex<HashMap<..>>` per entity, keyed by id.
pub struct MemoryDb {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
    logins: Arc<Mutex<HashMap<Uuid, Login>>>,
    users_ips: Arc<Mutex<HashMap<Uuid, UsersIp>>>,
    alerts: Arc<Mutex<HashMap<Uuid, Alert>>>,
    config: Arc<Mutex<Option<Config>>>,
    task_settings: Arc<Mutex<HashMap<String, TaskSettings>>>,
    next_task_id: Arc<Mutex<i32>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        MemoryDb {
            users: Arc::new(Mutex::new(HashMap::new())),
            logins: Arc::new(Mutex::new(HashMap::new())),
            users_ips: Arc::new(Mutex::new(HashMap::new())),
            alerts: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(Mutex::new(None)),
            task_settings: Arc::new(Mutex::new(HashMap::new())),
            next_task_id: Arc::new(Mutex::new(1)),
        }
    }

    // User
    pub async fn create_user(&self, user: NewUser) -> Result<User, DetectorError> {
        let user = User {
            id: user.id,
            username: user.username,
            risk_score: user.risk_score,
            created_at: user.created_at,
            updated: user.updated,
        };
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(user)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DetectorError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    pub async fn find_or_create_user(&self, username: &str, now: DateTime<Utc>) -> Result<User, DetectorError> {
        if let Some(user) = self.find_user_by_username(username).await? {
            return Ok(user);
        }
        self.create_user(NewUser::for_username(username, now)).await
    }

    pub async fn update_user_risk_score(&self, user_id: Uuid, risk_score: &str, now: DateTime<Utc>) -> Result<(), DetectorError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(DetectorError::UserNotFound)?;
        user.risk_score = risk_score.to_string();
        user.updated = now;
        Ok(())
    }

    pub async fn all_users(&self) -> Result<Vec<User>, DetectorError> {
        Ok(self.users.lock().unwrap().values().cloned().collect())
    }

    /// §3: a User is deleted only when its own `updated` watermark is stale AND it
    /// has no remaining dependents. Call after the dependent tables have already had
    /// their own stale rows removed, so "remaining dependents" means "still-fresh ones".
    pub async fn delete_stale_users_without_dependents(&self, cutoff: DateTime<Utc>) -> Result<u64, DetectorError> {
        let stale_ids: Vec<Uuid> = self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.updated < cutoff)
            .map(|u| u.id)
            .collect();

        let logins = self.logins.lock().unwrap();
        let alerts = self.alerts.lock().unwrap();
        let users_ips = self.users_ips.lock().unwrap();

        let deletable: Vec<Uuid> = stale_ids
            .into_iter()
            .filter(|id| {
                !logins.values().any(|l| l.user_id == *id)
                    && !alerts.values().any(|a| a.user_id == *id)
                    && !users_ips.values().any(|r| r.user_id == *id)
            })
            .collect();
        drop(logins);
        drop(alerts);
        drop(users_ips);

        let mut users = self.users.lock().unwrap();
        for id in &deletable {
            users.remove(id);
        }
        Ok(deletable.len() as u64)
    }

    // Login
    pub async fn find_logins_for_user(&self, user_id: Uuid) -> Result<Vec<Login>, DetectorError> {
        let mut v: Vec<Login> = self
            .logins
            .lock()
            .unwrap()
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        v.sort_by_key(|l| l.timestamp);
        Ok(v)
    }

    pub async fn upsert_login(&self, new_login: NewLogin) -> Result<Login, DetectorError> {
        let mut logins = self.logins.lock().unwrap();
        let existing = logins.values_mut().find(|l| {
            l.user_id == new_login.user_id
                && l.user_agent == new_login.user_agent
                && l.country == new_login.country
                && l.index == new_login.index
        });

        if let Some(login) = existing {
            login.timestamp = new_login.timestamp;
            login.latitude = new_login.latitude;
            login.longitude = new_login.longitude;
            login.updated = new_login.updated;
            return Ok(login.clone());
        }

        let login = Login {
            id: new_login.id,
            user_id: new_login.user_id,
            timestamp: new_login.timestamp,
            latitude: new_login.latitude,
            longitude: new_login.longitude,
            country: new_login.country,
            user_agent: new_login.user_agent,
            index: new_login.index,
            updated: new_login.updated,
        };
        logins.insert(login.id, login.clone());
        Ok(login)
    }

    pub async fn delete_logins_updated_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DetectorError> {
        let mut logins = self.logins.lock().unwrap();
        let before = logins.len();
        logins.retain(|_, l| l.updated >= cutoff);
        Ok((before - logins.len()) as u64)
    }

    // UsersIP
    pub async fn users_ip_exists(&self, user_id: Uuid, ip: &str) -> Result<bool, DetectorError> {
        Ok(self
            .users_ips
            .lock()
            .unwrap()
            .values()
            .any(|r| r.user_id == user_id && r.ip == ip))
    }

    pub async fn upsert_users_ip(&self, new_ip: NewUsersIp) -> Result<UsersIp, DetectorError> {
        let mut ips = self.users_ips.lock().unwrap();
        if let Some(existing) = ips.values_mut().find(|r| r.user_id == new_ip.user_id && r.ip == new_ip.ip) {
            existing.updated = new_ip.updated;
            return Ok(existing.clone());
        }
        let record = UsersIp {
            id: new_ip.id,
            user_id: new_ip.user_id,
            ip: new_ip.ip,
            updated: new_ip.updated,
        };
        ips.insert(record.id, record.clone());
        Ok(record)
    }

    pub async fn delete_users_ips_updated_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DetectorError> {
        let mut ips = self.users_ips.lock().unwrap();
        let before = ips.len();
        ips.retain(|_, r| r.updated >= cutoff);
        Ok((before - ips.len()) as u64)
    }

    // Alert
    pub async fn insert_alert(&self, new_alert: NewAlert) -> Result<Alert, DetectorError> {
        let alert = Alert {
            id: new_alert.id,
            user_id: new_alert.user_id,
            name: new_alert.name,
            description: new_alert.description,
            login_raw_data: new_alert.login_raw_data,
            is_filtered: new_alert.is_filtered,
            filter_type: new_alert.filter_type,
            updated: new_alert.updated,
        };
        self.alerts.lock().unwrap().insert(alert.id, alert.clone());
        Ok(alert)
    }

    pub async fn count_unfiltered_alerts_for_user(&self, user_id: Uuid) -> Result<u64, DetectorError> {
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.user_id == user_id && !a.is_filtered)
            .count() as u64)
    }

    pub async fn delete_alerts_updated_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DetectorError> {
        let mut alerts = self.alerts.lock().unwrap();
        let before = alerts.len();
        alerts.retain(|_, a| a.updated >= cutoff);
        Ok((before - alerts.len()) as u64)
    }

    // Config
    pub async fn get_config(&self) -> Result<Option<Config>, DetectorError> {
        Ok(self.config.lock().unwrap().clone())
    }

    pub async fn put_config(&self, new_config: NewConfig) -> Result<Config, DetectorError> {
        let config = Config {
            id: new_config.id,
            allowed_countries: new_config.allowed_countries,
            vip_users: new_config.vip_users,
            alert_is_vip_only: new_config.alert_is_vip_only,
            alert_minimum_risk_score: new_config.alert_minimum_risk_score,
        };
        *self.config.lock().unwrap() = Some(config.clone());
        Ok(config)
    }

    // TaskSettings
    pub async fn get_task_settings(&self, task_name: &str) -> Result<Option<TaskSettings>, DetectorError> {
        Ok(self.task_settings.lock().unwrap().get(task_name).cloned())
    }

    pub async fn put_task_settings(&self, new_task: NewTaskSettings) -> Result<TaskSettings, DetectorError> {
        let mut settings = self.task_settings.lock().unwrap();
        let id = settings
            .get(&new_task.task_name)
            .map(|t| t.id)
            .unwrap_or_else(|| {
                let mut next_id = self.next_task_id.lock().unwrap();
                let id = *next_id;
                *next_id += 1;
                id
            });
        let record = TaskSettings {
            id,
            task_name: new_task.task_name.clone(),
            start_date: new_task.start_date,
            end_date: new_task.end_date,
        };
        settings.insert(new_task.task_name, record.clone());
        Ok(record)
    }
}
