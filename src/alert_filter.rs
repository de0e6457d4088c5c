//! §4.5: tags a pending alert with zero or more filter reasons per the global Config.

use log::warn;

use crate::models::{Config, FilterType, User};

/// Evaluates both filter rules independently; `IS_VIP_FILTER` is always appended
/// before `ALLOWED_COUNTRY_FILTER` when both apply (order is significant, §9 open
/// question — resolved in DESIGN.md in favor of "yes, observationally significant").
pub fn classify(config: &Config, user: &User, event_country: &str) -> Vec<FilterType> {
    let mut filter_type = Vec::new();

    let alert_is_vip_only = if config.alert_is_vip_only && config.vip_users.is_empty() {
        warn!(
            "config invariant violated: alert_is_vip_only=true but vip_users is empty; \
             treating alert_is_vip_only as false for this invocation"
        );
        false
    } else {
        config.alert_is_vip_only
    };

    if alert_is_vip_only && !config.vip_users.iter().any(|u| u == &user.username) {
        filter_type.push(FilterType::IsVipFilter);
    }

    if config.allowed_countries.iter().any(|c| c == event_country) {
        filter_type.push(FilterType::AllowedCountryFilter);
    }

    filter_type
}
