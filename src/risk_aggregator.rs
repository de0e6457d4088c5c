//! §4.7: maps a user's unfiltered alert count to a risk label and persists it.

use chrono::Utc;

use crate::db::DatabaseConnection;
use crate::errors::DetectorError;
use crate::models::RiskScore;

/// Count → label mapping from §4.7 / Scenario F.
pub fn risk_score_for_count(count: u64) -> RiskScore {
    match count {
        0 => RiskScore::NoRisk,
        1..=2 => RiskScore::Low,
        3..=4 => RiskScore::Medium,
        _ => RiskScore::High,
    }
}

/// Recomputes and persists the risk label for every monitored user. Idempotent:
/// running twice with an unchanged alert set writes the same label both times.
pub async fn update_risk_scores(db: &DatabaseConnection) -> Result<(), DetectorError> {
    let users = db.all_users().await?;
    for user in users {
        let count = db.count_unfiltered_alerts_for_user(user.id).await?;
        let label = risk_score_for_count(count);
        db.update_user_risk_score(user.id, label.as_str(), Utc::now()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_f_boundaries() {
        assert_eq!(risk_score_for_count(0), RiskScore::NoRisk);
        assert_eq!(risk_score_for_count(1), RiskScore::Low);
        assert_eq!(risk_score_for_count(2), RiskScore::Low);
        assert_eq!(risk_score_for_count(3), RiskScore::Medium);
        assert_eq!(risk_score_for_count(4), RiskScore::Medium);
        assert_eq!(risk_score_for_count(5), RiskScore::High);
        assert_eq!(risk_score_for_count(100), RiskScore::High);
    }
}
