//! §4.8: deletes entities whose `updated` watermark has aged past the retention horizon.
//! Dependents (Logins, Alerts, UsersIPs) are deleted before Users (§9 design notes) —
//! reversing the order would let a User-cascade remove rows an operator might want to
//! inspect first.

use chrono::{Duration, Utc};
use log::info;

use crate::db::DatabaseConnection;
use crate::errors::DetectorError;

pub async fn run(db: &DatabaseConnection, retention_days: i64) -> Result<(), DetectorError> {
    let cutoff = Utc::now() - Duration::days(retention_days);

    let deleted_logins = db.delete_logins_updated_before(cutoff).await?;
    let deleted_alerts = db.delete_alerts_updated_before(cutoff).await?;
    let deleted_ips = db.delete_users_ips_updated_before(cutoff).await?;
    let deleted_users = db.delete_stale_users_without_dependents(cutoff).await?;

    info!(
        "retention cleanup: removed {deleted_logins} logins, {deleted_alerts} alerts, \
         {deleted_ips} user-ips, {deleted_users} users older than {retention_days}d"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewLogin, NewUser};

    #[tokio::test]
    async fn stale_user_with_no_dependents_is_deleted() {
        let db = DatabaseConnection::new_memory();
        let long_ago = Utc::now() - Duration::days(200);
        let user = db.create_user(NewUser::for_username("Ghost", long_ago)).await.unwrap();

        run(&db, 90).await.unwrap();

        assert!(db.find_user_by_username(&user.username).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_user_with_a_fresh_dependent_login_survives() {
        let db = DatabaseConnection::new_memory();
        let long_ago = Utc::now() - Duration::days(200);
        let user = db.create_user(NewUser::for_username("Active", long_ago)).await.unwrap();

        // The user's own `updated` watermark is stale, but a Login for them was
        // just refreshed — §3 says the user must survive until its dependents do too.
        db.upsert_login(NewLogin::new(
            user.id,
            Utc::now(),
            0.0,
            0.0,
            "Italy".to_string(),
            "Chromium".to_string(),
            "idx".to_string(),
            Utc::now(),
        ))
        .await
        .unwrap();

        run(&db, 90).await.unwrap();

        assert!(db.find_user_by_username(&user.username).await.unwrap().is_some());
    }
}
