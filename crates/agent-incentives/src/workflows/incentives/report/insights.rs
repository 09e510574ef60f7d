use super::trend::daily_totals;
use super::views::{GoldenOpportunity, MissedOpportunity, MomentumPivot, Urgency};
use crate::workflows::incentives::domain::{AwardResult, ContractRecord};
use crate::workflows::incentives::evaluation::TierLadder;

const MOMENTUM_WINDOW: usize = 7;
const PIVOT_DROP_PCT: f64 = -30.0;

/// Awards at 80 to 100 percent of their next tier, best return first.
pub fn missed_opportunities(results: &[AwardResult]) -> Vec<MissedOpportunity> {
    let mut missed: Vec<MissedOpportunity> = results
        .iter()
        .filter(|result| !result.is_errored())
        .filter(|result| (80.0..100.0).contains(&result.achievement_rate))
        .filter(|result| result.shortfall_amount > 0.0)
        .filter_map(|result| {
            let next_target = result.next_target?;
            let ladder = TierLadder::new(result.tiers.iter().copied());
            let next_reward = reward_at(&ladder, next_target);
            let extra_reward = if result.achieved_tier_index.is_none() {
                next_reward
            } else {
                (next_reward - result.raw_payout).max(0.0)
            };
            let roi_pct = extra_reward / result.shortfall_amount * 100.0;

            Some(MissedOpportunity {
                agent_id: result.agent_id.clone(),
                company: result.company.clone(),
                award_name: result.award_name.clone(),
                performance: result.performance_amount,
                next_target,
                achievement_rate: result.achievement_rate,
                shortfall: result.shortfall_amount,
                extra_reward,
                roi_pct,
                urgency: Urgency::from_roi(roi_pct),
            })
        })
        .collect();

    missed.sort_by(|a, b| b.roi_pct.total_cmp(&a.roi_pct));
    missed
}

/// Selected awards that pay nothing yet but are at least half way to a tier.
pub fn golden_opportunities(results: &[AwardResult]) -> Vec<GoldenOpportunity> {
    let mut golden: Vec<GoldenOpportunity> = results
        .iter()
        .filter(|result| result.is_selected && !result.is_errored())
        .filter(|result| result.raw_payout == 0.0)
        .filter(|result| (50.0..100.0).contains(&result.achievement_rate))
        .filter_map(|result| {
            let next_target = result.next_target?;
            let gap = (next_target - result.performance_amount).max(0.0);
            let expected_reward =
                reward_at(&TierLadder::new(result.tiers.iter().copied()), next_target);
            let roi = if gap > 0.0 { expected_reward / gap } else { 0.0 };

            Some(GoldenOpportunity {
                agent_id: result.agent_id.clone(),
                company: result.company.clone(),
                award_name: result.award_name.clone(),
                performance: result.performance_amount,
                next_target,
                achievement_rate: result.achievement_rate,
                gap,
                expected_reward,
                roi,
            })
        })
        .collect();

    golden.sort_by(|a, b| b.roi.total_cmp(&a.roi));
    golden
}

fn reward_at(ladder: &TierLadder, target: f64) -> f64 {
    ladder
        .tiers()
        .iter()
        .find(|tier| tier.target == target)
        .map(|tier| tier.reward)
        .unwrap_or_default()
}

/// First day on which the trailing seven-day mean of daily premium falls by
/// more than 30% against the day before. Needs at least seven trading days.
pub fn momentum_pivot(contracts: &[ContractRecord]) -> Option<MomentumPivot> {
    let daily = daily_totals(contracts);
    if daily.len() < MOMENTUM_WINDOW {
        return None;
    }

    let premiums: Vec<f64> = daily.iter().map(|day| day.premium).collect();
    let trailing: Vec<f64> = (0..premiums.len())
        .map(|position| {
            let from = (position + 1).saturating_sub(MOMENTUM_WINDOW);
            mean(&premiums[from..=position])
        })
        .collect();

    let pivot = (1..trailing.len()).find(|position| {
        let previous = trailing[position - 1];
        previous > 0.0 && (trailing[*position] - previous) / previous * 100.0 < PIVOT_DROP_PCT
    })?;

    let change = (trailing[pivot] - trailing[pivot - 1]) / trailing[pivot - 1] * 100.0;
    let before_from = pivot.saturating_sub(MOMENTUM_WINDOW);
    let after_to = (pivot + MOMENTUM_WINDOW).min(premiums.len());

    Some(MomentumPivot {
        pivot_date: daily[pivot].date,
        decline_pct: change.abs(),
        average_before: mean(&premiums[before_from..pivot]),
        average_after: mean(&premiums[pivot..after_to]),
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
