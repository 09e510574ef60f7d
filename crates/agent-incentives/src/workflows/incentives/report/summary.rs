use super::views::{AwardSummary, CompanySummary};
use crate::workflows::incentives::domain::AwardResult;
use std::collections::BTreeSet;

const IN_PROGRESS_THRESHOLD: f64 = 50.0;

pub fn summarize_awards(results: &[AwardResult]) -> AwardSummary {
    let mut awards = BTreeSet::new();
    let mut achieved = BTreeSet::new();
    let mut summary = AwardSummary::default();

    for result in results {
        awards.insert((result.company.as_str(), result.award_name.as_str()));
        if result.is_errored() {
            summary.errored_count += 1;
            continue;
        }
        if !result.is_selected {
            continue;
        }
        summary.total_final_payout += result.final_payout;
        summary.total_expected_payout += result.expected_payout;
        if result.final_payout > 0.0 {
            achieved.insert((result.company.as_str(), result.award_name.as_str()));
        }
    }

    summary.award_count = awards.len();
    summary.achieved_count = achieved.len();
    summary.average_achievement = mean_achievement(results);
    summary
}

/// Firm-wide status of the selected results.
pub fn summarize_company(results: &[AwardResult]) -> CompanySummary {
    let mut summary = CompanySummary::default();
    for result in results
        .iter()
        .filter(|result| result.is_selected && !result.is_errored())
    {
        if result.final_payout > 0.0 {
            summary.confirmed_count += 1;
            summary.confirmed_payout += result.final_payout;
        } else if result.achievement_rate >= IN_PROGRESS_THRESHOLD {
            summary.in_progress_count += 1;
        }
        if result.achievement_rate < IN_PROGRESS_THRESHOLD {
            summary.not_achieved_count += 1;
        }
    }

    summary.agent_count = results
        .iter()
        .map(|result| result.agent_id.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    summary.average_achievement = mean_achievement(results);
    summary
}

fn mean_achievement(results: &[AwardResult]) -> f64 {
    let rates: Vec<f64> = results
        .iter()
        .filter(|result| !result.is_errored())
        .map(|result| result.achievement_rate)
        .filter(|rate| rate.is_finite())
        .collect();
    if rates.is_empty() {
        0.0
    } else {
        rates.iter().sum::<f64>() / rates.len() as f64
    }
}
