pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use r2d2::Error as R2D2Error;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Settings;
use crate::errors::DetectorError;
use crate::models::{
    Alert, Config, Login, NewAlert, NewConfig, NewLogin, NewTaskSettings, NewUser, NewUsersIp,
    TaskSettings, User, UsersIp,
};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// A raw event as returned by the upstream log store, before §4.6's normalization
/// and validation. The query layer itself is an out-of-scope external collaborator
/// (§1); this trait is the seam the scheduler depends on to fetch it.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub id: String,
    pub index: String,
    pub ip: String,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    pub agent: String,
    pub timestamp: String,
}

#[async_trait::async_trait]
pub trait LogStore: Send + Sync {
    async fn fetch(
        &self,
        username: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>, DetectorError>;
}

/// A `LogStore` that never returns events. The real query layer (the original
/// system backs it with Elasticsearch) is an out-of-scope external collaborator
/// (§1); this stands in for it so the scheduler has something to drive against
/// until that integration is wired up.
pub struct NullLogStore;

#[async_trait::async_trait]
impl LogStore for NullLogStore {
    async fn fetch(
        &self,
        _username: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>, DetectorError> {
        Ok(Vec::new())
    }
}

/// Enum-dispatch facade over the repository implementations, mirroring the teacher's
/// `Database`/`DatabaseConnection` split: every method matches on the variant and
/// delegates. Detectors and the field processor depend only on `DatabaseConnection`,
/// never on Diesel or an in-memory `HashMap` directly (§9 design notes).
pub enum Database {
    Postgres(postgres::PostgresDb),
    Memory(memory::MemoryDb),
}

pub struct DatabaseConnection {
    db: Database,
}

impl DatabaseConnection {
    pub fn new_postgres(pool: PgPool) -> Self {
        Self { db: Database::Postgres(postgres::PostgresDb::new(pool)) }
    }

    pub fn new_memory() -> Self {
        Self { db: Database::Memory(memory::MemoryDb::new()) }
    }

    // User
    pub async fn create_user(&self, user: NewUser) -> Result<User, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.create_user(user).await,
            Database::Memory(db) => db.create_user(user).await,
        }
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.find_user_by_username(username).await,
            Database::Memory(db) => db.find_user_by_username(username).await,
        }
    }

    pub async fn find_or_create_user(&self, username: &str, now: DateTime<Utc>) -> Result<User, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.find_or_create_user(username, now).await,
            Database::Memory(db) => db.find_or_create_user(username, now).await,
        }
    }

    pub async fn update_user_risk_score(&self, user_id: Uuid, risk_score: &str, now: DateTime<Utc>) -> Result<(), DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.update_user_risk_score(user_id, risk_score, now).await,
            Database::Memory(db) => db.update_user_risk_score(user_id, risk_score, now).await,
        }
    }

    pub async fn all_users(&self) -> Result<Vec<User>, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.all_users().await,
            Database::Memory(db) => db.all_users().await,
        }
    }

    pub async fn delete_stale_users_without_dependents(&self, cutoff: DateTime<Utc>) -> Result<u64, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.delete_stale_users_without_dependents(cutoff).await,
            Database::Memory(db) => db.delete_stale_users_without_dependents(cutoff).await,
        }
    }

    // Login
    pub async fn find_logins_for_user(&self, user_id: Uuid) -> Result<Vec<Login>, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.find_logins_for_user(user_id).await,
            Database::Memory(db) => db.find_logins_for_user(user_id).await,
        }
    }

    pub async fn upsert_login(&self, new_login: NewLogin) -> Result<Login, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.upsert_login(new_login).await,
            Database::Memory(db) => db.upsert_login(new_login).await,
        }
    }

    pub async fn delete_logins_updated_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.delete_logins_updated_before(cutoff).await,
            Database::Memory(db) => db.delete_logins_updated_before(cutoff).await,
        }
    }

    // UsersIP
    pub async fn users_ip_exists(&self, user_id: Uuid, ip: &str) -> Result<bool, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.users_ip_exists(user_id, ip).await,
            Database::Memory(db) => db.users_ip_exists(user_id, ip).await,
        }
    }

    pub async fn upsert_users_ip(&self, new_ip: NewUsersIp) -> Result<UsersIp, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.upsert_users_ip(new_ip).await,
            Database::Memory(db) => db.upsert_users_ip(new_ip).await,
        }
    }

    pub async fn delete_users_ips_updated_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.delete_users_ips_updated_before(cutoff).await,
            Database::Memory(db) => db.delete_users_ips_updated_before(cutoff).await,
        }
    }

    // Alert
    pub async fn insert_alert(&self, new_alert: NewAlert) -> Result<Alert, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.insert_alert(new_alert).await,
            Database::Memory(db) => db.insert_alert(new_alert).await,
        }
    }

    pub async fn count_unfiltered_alerts_for_user(&self, user_id: Uuid) -> Result<u64, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.count_unfiltered_alerts_for_user(user_id).await,
            Database::Memory(db) => db.count_unfiltered_alerts_for_user(user_id).await,
        }
    }

    pub async fn delete_alerts_updated_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.delete_alerts_updated_before(cutoff).await,
            Database::Memory(db) => db.delete_alerts_updated_before(cutoff).await,
        }
    }

    // Config
    pub async fn get_config(&self) -> Result<Option<Config>, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.get_config().await,
            Database::Memory(db) => db.get_config().await,
        }
    }

    pub async fn put_config(&self, new_config: NewConfig) -> Result<Config, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.put_config(new_config).await,
            Database::Memory(db) => db.put_config(new_config).await,
        }
    }

    // TaskSettings
    pub async fn get_task_settings(&self, task_name: &str) -> Result<Option<TaskSettings>, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.get_task_settings(task_name).await,
            Database::Memory(db) => db.get_task_settings(task_name).await,
        }
    }

    pub async fn put_task_settings(&self, new_task: NewTaskSettings) -> Result<TaskSettings, DetectorError> {
        match &self.db {
            Database::Postgres(db) => db.put_task_settings(new_task).await,
            Database::Memory(db) => db.put_task_settings(new_task).await,
        }
    }
}

pub fn init_db(settings: &Settings) -> Result<Arc<DatabaseConnection>, DetectorError> {
    let database_url = &settings.database.url;

    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(settings.database.pool_size)
        .build(manager)
        .map_err(|e: R2D2Error| {
            DetectorError::DatabaseError(format!("failed to create connection pool: {e}"))
        })?;

    Ok(Arc::new(DatabaseConnection::new_postgres(pool)))
}
