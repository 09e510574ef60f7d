use agent_incentives::workflows::incentives::rules;
use agent_incentives::workflows::incentives::IncentiveEngine;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: Arc<IncentiveEngine>,
}

/// Accepts the same date spellings as the rule sheets (`2025-03-01`,
/// `2025.03.01`, `20250301`, ...).
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    rules::parse_date(raw).ok_or_else(|| format!("failed to parse '{raw}' as a date (YYYY-MM-DD)"))
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_accept_sheet_spellings() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date");
        assert_eq!(parse_date("2025-03-01"), Ok(expected));
        assert_eq!(parse_date(" 2025.03.01 "), Ok(expected));
        assert!(parse_date("next tuesday").is_err());
    }
}
