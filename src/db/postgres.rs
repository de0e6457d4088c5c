use diesel::{
    prelude::*,
    r2d2::{ConnectionManager, Pool, PooledConnection},
    PgConnection,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::DetectorError;
use crate::models::{
    Alert, Config, Login, NewAlert, NewConfig, NewLogin, NewTaskSettings, NewUser, NewUsersIp,
    TaskSettings, User, UsersIp,
};
use crate::schema::{alerts, configs, logins, task_settings, users, users_ips};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgConn = PooledConnection<ConnectionManager<PgConnection>>;

pub struct PostgresDb {
    pool: PgPool,
}

impl PostgresDb {
    pub fn new(pool: PgPool) -> Self {
        PostgresDb { pool }
    }

    fn get_conn(&self) -> Result<PgConn, DetectorError> {
        self.pool
            .get()
            .map_err(|e| DetectorError::DatabaseError(format!("failed to get database connection: {e}")))
    }

    // User
    pub async fn create_user(&self, user: NewUser) -> Result<User, DetectorError> {
        let conn = self.get_conn()?;
        tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            diesel::insert_into(users::table).values(&user).get_result::<User>(&mut conn)
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DetectorError> {
        let username = username.to_string();
        let conn = self.get_conn()?;
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            users::table
                .filter(users::username.eq(username))
                .first::<User>(&mut conn)
                .optional()
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)?;
        Ok(result)
    }

    pub async fn find_or_create_user(&self, username: &str, now: DateTime<Utc>) -> Result<User, DetectorError> {
        if let Some(user) = self.find_user_by_username(username).await? {
            return Ok(user);
        }
        self.create_user(NewUser::for_username(username, now)).await
    }

    pub async fn update_user_risk_score(&self, user_id: Uuid, risk_score: &str, now: DateTime<Utc>) -> Result<(), DetectorError> {
        let risk_score = risk_score.to_string();
        let conn = self.get_conn()?;
        tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            diesel::update(users::table.find(user_id))
                .set((users::risk_score.eq(risk_score), users::updated.eq(now)))
                .execute(&mut conn)
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)?;
        Ok(())
    }

    pub async fn all_users(&self) -> Result<Vec<User>, DetectorError> {
        let conn = self.get_conn()?;
        tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            users::table.load::<User>(&mut conn)
        })
            .await
            .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
            .map_err(DetectorError::from)
    }

    /// §3: a User is deleted only when stale AND it has no remaining dependent
    /// Login/Alert/UsersIP rows. Run after those tables' own stale rows are gone, so a
    /// `NOT EXISTS` against them reflects "no still-fresh dependents" rather than "none ever".
    pub async fn delete_stale_users_without_dependents(&self, cutoff: DateTime<Utc>) -> Result<u64, DetectorError> {
        let conn = self.get_conn()?;
        let affected = tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            diesel::delete(
                users::table.filter(
                    users::updated.lt(cutoff)
                        .and(diesel::dsl::not(diesel::dsl::exists(
                            logins::table.filter(logins::user_id.eq(users::id)),
                        )))
                        .and(diesel::dsl::not(diesel::dsl::exists(
                            alerts::table.filter(alerts::user_id.eq(users::id)),
                        )))
                        .and(diesel::dsl::not(diesel::dsl::exists(
                            users_ips::table.filter(users_ips::user_id.eq(users::id)),
                        ))),
                ),
            )
            .execute(&mut conn)
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)?;
        Ok(affected as u64)
    }

    // Login
    pub async fn find_logins_for_user(&self, user_id: Uuid) -> Result<Vec<Login>, DetectorError> {
        let conn = self.get_conn()?;
        tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            logins::table
                .filter(logins::user_id.eq(user_id))
                .order(logins::timestamp.asc())
                .load::<Login>(&mut conn)
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)
    }

    pub async fn upsert_login(&self, new_login: NewLogin) -> Result<Login, DetectorError> {
        let conn = self.get_conn()?;
        tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            let existing = logins::table
                .filter(logins::user_id.eq(new_login.user_id))
                .filter(logins::user_agent.eq(&new_login.user_agent))
                .filter(logins::country.eq(&new_login.country))
                .filter(logins::index.eq(&new_login.index))
                .first::<Login>(&mut conn)
                .optional()?;

            if let Some(existing) = existing {
                diesel::update(logins::table.find(existing.id))
                    .set((
                        logins::timestamp.eq(new_login.timestamp),
                        logins::latitude.eq(new_login.latitude),
                        logins::longitude.eq(new_login.longitude),
                        logins::updated.eq(new_login.updated),
                    ))
                    .get_result::<Login>(&mut conn)
            } else {
                diesel::insert_into(logins::table)
                    .values(&new_login)
                    .get_result::<Login>(&mut conn)
            }
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)
    }

    pub async fn delete_logins_updated_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DetectorError> {
        let conn = self.get_conn()?;
        let affected = tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            diesel::delete(logins::table.filter(logins::updated.lt(cutoff))).execute(&mut conn)
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)?;
        Ok(affected as u64)
    }

    // UsersIP
    pub async fn users_ip_exists(&self, user_id: Uuid, ip: &str) -> Result<bool, DetectorError> {
        let ip = ip.to_string();
        let conn = self.get_conn()?;
        let count = tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            users_ips::table
                .filter(users_ips::user_id.eq(user_id))
                .filter(users_ips::ip.eq(ip))
                .count()
                .get_result::<i64>(&mut conn)
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)?;
        Ok(count > 0)
    }

    pub async fn upsert_users_ip(&self, new_ip: NewUsersIp) -> Result<UsersIp, DetectorError> {
        let conn = self.get_conn()?;
        tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            let existing = users_ips::table
                .filter(users_ips::user_id.eq(new_ip.user_id))
                .filter(users_ips::ip.eq(&new_ip.ip))
                .first::<UsersIp>(&mut conn)
                .optional()?;

            if let Some(existing) = existing {
                diesel::update(users_ips::table.find(existing.id))
                    .set(users_ips::updated.eq(new_ip.updated))
                    .get_result::<UsersIp>(&mut conn)
            } else {
                diesel::insert_into(users_ips::table)
                    .values(&new_ip)
                    .get_result::<UsersIp>(&mut conn)
            }
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)
    }

    pub async fn delete_users_ips_updated_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DetectorError> {
        let conn = self.get_conn()?;
        let affected = tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            diesel::delete(users_ips::table.filter(users_ips::updated.lt(cutoff))).execute(&mut conn)
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)?;
        Ok(affected as u64)
    }

    // Alert
    pub async fn insert_alert(&self, new_alert: NewAlert) -> Result<Alert, DetectorError> {
        let conn = self.get_conn()?;
        tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            diesel::insert_into(alerts::table).values(&new_alert).get_result::<Alert>(&mut conn)
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)
    }

    pub async fn count_unfiltered_alerts_for_user(&self, user_id: Uuid) -> Result<u64, DetectorError> {
        let conn = self.get_conn()?;
        let count = tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            alerts::table
                .filter(alerts::user_id.eq(user_id))
                .filter(alerts::is_filtered.eq(false))
                .count()
                .get_result::<i64>(&mut conn)
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)?;
        Ok(count as u64)
    }

    pub async fn delete_alerts_updated_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DetectorError> {
        let conn = self.get_conn()?;
        let affected = tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            diesel::delete(alerts::table.filter(alerts::updated.lt(cutoff))).execute(&mut conn)
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)?;
        Ok(affected as u64)
    }

    // Config
    pub async fn get_config(&self) -> Result<Option<Config>, DetectorError> {
        let conn = self.get_conn()?;
        tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            configs::table.find(Config::SINGLETON_ID).first::<Config>(&mut conn).optional()
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)
    }

    pub async fn put_config(&self, new_config: NewConfig) -> Result<Config, DetectorError> {
        let conn = self.get_conn()?;
        tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            diesel::insert_into(configs::table)
                .values(&new_config)
                .on_conflict(configs::id)
                .do_update()
                .set((
                    configs::allowed_countries.eq(&new_config.allowed_countries),
                    configs::vip_users.eq(&new_config.vip_users),
                    configs::alert_is_vip_only.eq(new_config.alert_is_vip_only),
                    configs::alert_minimum_risk_score.eq(&new_config.alert_minimum_risk_score),
                ))
                .get_result::<Config>(&mut conn)
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)
    }

    // TaskSettings
    pub async fn get_task_settings(&self, task_name: &str) -> Result<Option<TaskSettings>, DetectorError> {
        let task_name = task_name.to_string();
        let conn = self.get_conn()?;
        tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            task_settings::table
                .filter(task_settings::task_name.eq(task_name))
                .first::<TaskSettings>(&mut conn)
                .optional()
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)
    }

    pub async fn put_task_settings(&self, new_task: NewTaskSettings) -> Result<TaskSettings, DetectorError> {
        let conn = self.get_conn()?;
        tokio::task::spawn_blocking(move || {
            let mut conn = conn;
            let existing = task_settings::table
                .filter(task_settings::task_name.eq(&new_task.task_name))
                .first::<TaskSettings>(&mut conn)
                .optional()?;

            if let Some(existing) = existing {
                diesel::update(task_settings::table.find(existing.id))
                    .set((
                        task_settings::start_date.eq(new_task.start_date),
                        task_settings::end_date.eq(new_task.end_date),
                    ))
                    .get_result::<TaskSettings>(&mut conn)
            } else {
                diesel::insert_into(task_settings::table)
                    .values(&new_task)
                    .get_result::<TaskSettings>(&mut conn)
            }
        })
        .await
        .map_err(|e| DetectorError::DatabaseError(format!("task join error: {e}")))?
        .map_err(DetectorError::from)
    }
}
