//! Post-run analysis pairing awards that already sit on their top tier with
//! awards at other companies that the same surplus premium would lift.

use super::config::EngineConfig;
use super::domain::{AwardRef, AwardResult, OptimizationRecommendation, Tier};
use super::evaluation::TierLadder;
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct AwardKey {
    agent_id: String,
    company: String,
    award_name: String,
    product_scope: String,
    analysis_period: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
struct AwardPosition {
    key: AwardKey,
    performance: f64,
    ladder: TierLadder,
}

impl AwardPosition {
    fn reference(&self) -> AwardRef {
        AwardRef {
            agent_id: self.key.agent_id.clone(),
            company: self.key.company.clone(),
            award_name: self.key.award_name.clone(),
            product_scope: self.key.product_scope.clone(),
            analysis_period: self.key.analysis_period,
            performance: self.performance,
        }
    }

    fn current_reward(&self) -> f64 {
        self.ladder
            .achieved(self.performance)
            .map(|(_, tier)| tier.reward)
            .unwrap_or_default()
    }
}

/// Recommends, for each saturated award, the single best opportunity award
/// to redirect surplus premium into.
pub fn recommend_transfers(
    results: &[AwardResult],
    config: &EngineConfig,
) -> Vec<OptimizationRecommendation> {
    let positions = collect_positions(results);

    let mut saturated = Vec::new();
    let mut opportunities = Vec::new();
    for position in &positions {
        let Some(top) = position.ladder.top() else {
            continue;
        };
        if position.performance >= config.saturation_tolerance * top.target {
            saturated.push((position, (position.performance - top.target).max(0.0)));
        } else if position.ladder.next_above(position.performance).is_some() {
            opportunities.push(position);
        }
    }

    let mut recommendations: Vec<OptimizationRecommendation> = saturated
        .iter()
        .filter_map(|(source, surplus)| {
            best_transfer(source, *surplus, &opportunities, &config.product_line_keywords)
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.marginal_gain
            .total_cmp(&a.marginal_gain)
            .then_with(|| a.saturated_ref.agent_id.cmp(&b.saturated_ref.agent_id))
    });
    tracing::debug!(
        saturated = saturated.len(),
        opportunities = opportunities.len(),
        recommendations = recommendations.len(),
        "cross-company optimization finished"
    );
    recommendations
}

/// One position per award; per-row results of the same award are merged
/// into a single ladder.
fn collect_positions(results: &[AwardResult]) -> Vec<AwardPosition> {
    let mut grouped: BTreeMap<AwardKey, (f64, Vec<Tier>)> = BTreeMap::new();
    for result in results.iter().filter(|result| !result.is_errored()) {
        let key = AwardKey {
            agent_id: result.agent_id.clone(),
            company: result.company.clone(),
            award_name: result.award_name.clone(),
            product_scope: result.product_scope.clone(),
            analysis_period: result.rule_end,
        };
        let entry = grouped.entry(key).or_insert((0.0, Vec::new()));
        entry.0 = entry.0.max(result.performance_amount);
        entry.1.extend(result.tiers.iter().copied());
        if result.tier_target > 0.0 {
            entry.1.push(Tier {
                target: result.tier_target,
                reward: result.base_reward,
            });
        }
    }

    grouped
        .into_iter()
        .map(|(key, (performance, tiers))| AwardPosition {
            key,
            performance,
            ladder: TierLadder::new(tiers),
        })
        .collect()
}

fn best_transfer(
    source: &AwardPosition,
    surplus: f64,
    opportunities: &[&AwardPosition],
    keywords: &[String],
) -> Option<OptimizationRecommendation> {
    let mut best: Option<OptimizationRecommendation> = None;

    for opportunity in opportunities.iter().filter(|opportunity| {
        opportunity.key.agent_id == source.key.agent_id
            && opportunity.key.company != source.key.company
            && opportunity.key.analysis_period == source.key.analysis_period
            && same_product_line(source, opportunity, keywords)
    }) {
        let simulated = opportunity.performance + surplus;
        let Some((_, reachable)) = opportunity
            .ladder
            .achieved(simulated)
            .filter(|(_, tier)| tier.target > opportunity.performance)
        else {
            continue;
        };

        let current_reward = opportunity.current_reward();
        let marginal_gain = reachable.reward - current_reward;
        if marginal_gain <= 0.0 {
            continue;
        }
        if best
            .as_ref()
            .is_some_and(|current| current.marginal_gain >= marginal_gain)
        {
            continue;
        }

        best = Some(OptimizationRecommendation {
            saturated_ref: source.reference(),
            opportunity_ref: opportunity.reference(),
            transferable_surplus: surplus,
            marginal_gain,
            target_tier: reachable,
            current_reward,
            optimized_reward: reachable.reward,
            gap_to_target: reachable.target - opportunity.performance,
            reaches_top_tier: opportunity
                .ladder
                .top()
                .is_some_and(|top| top.target == reachable.target),
        });
    }

    best
}

fn same_product_line(left: &AwardPosition, right: &AwardPosition, keywords: &[String]) -> bool {
    if left.key.product_scope == right.key.product_scope {
        return true;
    }
    let line = |position: &AwardPosition| {
        keywords
            .iter()
            .find(|keyword| position.key.award_name.contains(keyword.as_str()))
            .cloned()
            .unwrap_or_else(|| position.key.product_scope.clone())
    };
    line(left) == line(right)
}
