use super::period::{infer_conditions_by_rank, PeriodResolver, ResolvedPeriod};
use super::tiered::{evaluate_tiered, TierLadder};
use super::{checked_performance, Evaluation, EvaluationError};
use crate::workflows::incentives::config::is_all_companies;
use crate::workflows::incentives::domain::{
    AwardRule, CandidateTarget, ConsecutiveRuleSet, ContractRef, FallbackBranch,
    MatchConfidence, PeriodBreakdown, PeriodRule, Tier,
};
use crate::workflows::incentives::matching::{
    match_names, normalize_key, rank_candidates, MatchKind,
};
use crate::workflows::incentives::scope::{within_window, DateWindow};
use std::collections::{BTreeMap, BTreeSet};

/// Everything the consecutive evaluator needs for one award group.
pub(crate) struct ConsecutiveInput<'r, 'c> {
    pub company: &'r str,
    pub award_name: &'r str,
    pub rules: &'r [&'r AwardRule],
    /// Period rows located for the group; `None` when it declares none.
    pub source: Option<&'r PeriodSource>,
    /// Contracts already narrowed to the group's company and product scope,
    /// across all dates.
    pub contracts: &'r [ContractRef<'c>],
    pub query: DateWindow,
    pub resolver: PeriodResolver,
}

/// Period rows chosen for a group and where they came from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PeriodSource {
    pub rows: Vec<PeriodRule>,
    /// Company named by the matched sub-rules, used when the group itself is
    /// not tied to one company.
    pub company_hint: Option<String>,
    pub confidence: MatchConfidence,
}

pub(crate) fn evaluate_consecutive(
    input: &ConsecutiveInput<'_, '_>,
) -> Result<Evaluation, EvaluationError> {
    let in_query = within_window(input.contracts, &input.query);
    let ladder = TierLadder::new(
        input
            .rules
            .iter()
            .flat_map(|rule| rule.tiers.iter().copied()),
    );

    let Some(source) = input.source else {
        tracing::debug!(
            award = %input.award_name,
            company = %input.company,
            "no period structure; evaluating as tiered"
        );
        let mut evaluation = evaluate_tiered(input.award_name, &ladder, &in_query)?;
        evaluation.fallback = Some(FallbackBranch::NoPeriodStructure);
        return Ok(evaluation);
    };

    let chain = evaluate_chain(input, source)?;
    let carries_steps = input.rules.iter().any(|rule| rule.has_step_columns);
    if chain.raw_payout > 0.0 || !carries_steps || !earlier_periods_achieved(&chain) {
        return Ok(chain);
    }

    let tiered = evaluate_tiered(input.award_name, &ladder, &in_query)?;
    if tiered.raw_payout > 0.0 {
        tracing::debug!(
            award = %input.award_name,
            payout = tiered.raw_payout,
            "consecutive chain paid nothing; step columns pay"
        );
        return Ok(Evaluation {
            period_breakdown: chain.period_breakdown,
            confidence: chain.confidence,
            fallback: Some(FallbackBranch::ZeroConsecutivePayout),
            ..tiered
        });
    }

    Ok(chain)
}

/// Periods before the final one all reached a target. Gaps in the declared
/// indices count as missed.
fn earlier_periods_achieved(chain: &Evaluation) -> bool {
    let Some(final_index) = chain.period_breakdown.keys().next_back().copied() else {
        return false;
    };
    (1..final_index).all(|index| {
        chain
            .period_breakdown
            .get(&index)
            .is_some_and(|period| period.achieved_target > 0.0)
    })
}

/// Sub-rules from the dedicated sheet win over period rows on the main sheet.
pub(crate) fn period_source(
    company: &str,
    award_name: &str,
    rules: &[&AwardRule],
    rule_set: &ConsecutiveRuleSet,
) -> Option<PeriodSource> {
    if let Some(source) = lookup_rule_set(company, award_name, rule_set) {
        return Some(source);
    }

    let rows: Vec<PeriodRule> = rules
        .iter()
        .flat_map(|rule| rule.consecutive_periods.iter().cloned())
        .collect();
    if rows.is_empty() {
        None
    } else {
        Some(PeriodSource {
            rows,
            company_hint: None,
            confidence: MatchConfidence::Exact,
        })
    }
}

/// Finds the sheet rows for an award. Rows matching both names exactly are
/// preferred; otherwise the first award name reached by containment is used
/// and the match is flagged as heuristic.
pub(crate) fn lookup_rule_set(
    company: &str,
    award_name: &str,
    rule_set: &ConsecutiveRuleSet,
) -> Option<PeriodSource> {
    let mut matches: Vec<(usize, MatchKind)> = rank_candidates(
        award_name,
        rule_set.rows.iter().map(|row| row.award_name.as_str()),
    )
    .into_iter()
    .filter_map(|candidate| {
        let company_kind = if is_all_companies(company) {
            MatchKind::Exact
        } else {
            match_names(&rule_set.rows[candidate.index].company, company)?
        };
        Some((candidate.index, candidate.kind.max(company_kind)))
    })
    .collect();
    matches.sort_by_key(|(_, kind)| *kind);

    let exact: Vec<usize> = matches
        .iter()
        .filter(|(_, kind)| *kind == MatchKind::Exact)
        .map(|(index, _)| *index)
        .collect();

    let (chosen, confidence) = if !exact.is_empty() {
        (exact, MatchConfidence::Exact)
    } else {
        let (first, _) = matches.first()?;
        let anchor = normalize_key(&rule_set.rows[*first].award_name);
        let chosen: Vec<usize> = matches
            .iter()
            .map(|(index, _)| *index)
            .filter(|index| normalize_key(&rule_set.rows[*index].award_name) == anchor)
            .collect();
        tracing::warn!(
            award = %award_name,
            company = %company,
            matched = %rule_set.rows[*first].award_name,
            "consecutive rules matched by containment only"
        );
        (chosen, MatchConfidence::Heuristic)
    };

    let company_hint = chosen
        .iter()
        .map(|index| rule_set.rows[*index].company.trim())
        .find(|company| !company.is_empty())
        .map(str::to_string);

    Some(PeriodSource {
        rows: chosen
            .into_iter()
            .map(|index| rule_set.rows[index].period.clone())
            .collect(),
        company_hint,
        confidence,
    })
}

fn evaluate_chain(
    input: &ConsecutiveInput<'_, '_>,
    source: &PeriodSource,
) -> Result<Evaluation, EvaluationError> {
    let mut periods = input.resolver.resolve(&source.rows);
    for period in &periods {
        if let (Some(start), Some(end)) = (period.window.start, period.window.end) {
            if start > end {
                return Err(EvaluationError::InvalidPeriods {
                    award: input.award_name.to_string(),
                    detail: format!("period {} starts {start} after it ends {end}", period.index),
                });
            }
        }
    }

    let mut confidence = source.confidence;
    if infer_conditions_by_rank(&mut periods) {
        tracing::warn!(
            award = %input.award_name,
            company = %input.company,
            "previous-period conditions inferred by rank pairing"
        );
        confidence = confidence.combine(MatchConfidence::Heuristic);
    }

    let target_company = if is_all_companies(input.company) {
        source.company_hint.clone().unwrap_or_default()
    } else {
        input.company.to_string()
    };

    let mut breakdown = BTreeMap::new();
    let mut achieved: BTreeMap<u32, f64> = BTreeMap::new();
    let mut evidence = BTreeSet::new();
    for period in &periods {
        let in_period: Vec<ContractRef<'_>> = within_window(input.contracts, &period.window)
            .into_iter()
            .filter(|contract| {
                is_all_companies(&target_company)
                    || match_names(&contract.record.company, &target_company).is_some()
            })
            .collect();
        let performance = checked_performance(input.award_name, &in_period)?;
        let achieved_target = period.achieved_target(performance);

        evidence.extend(in_period.iter().map(|contract| contract.index));
        achieved.insert(period.index, achieved_target);
        breakdown.insert(
            period.index,
            PeriodBreakdown {
                start: period.window.start,
                end: period.window.end,
                performance,
                achieved_target,
                candidate_targets: candidate_targets(period),
            },
        );
    }

    let Some(final_period) = periods.last() else {
        return Err(EvaluationError::InvalidPeriods {
            award: input.award_name.to_string(),
            detail: "no periods declared".to_string(),
        });
    };
    let final_performance = breakdown
        .get(&final_period.index)
        .map(|period| period.performance)
        .unwrap_or_default();

    let granted = grant_final_reward(final_period, final_performance, &achieved);
    let ladder = TierLadder::new(final_period.rows.iter().map(|row| Tier {
        target: row.target,
        reward: row.reward,
    }));
    let assessment = ladder.assess(final_performance);
    let achieved_tier_index = granted.and_then(|row| {
        ladder
            .tiers()
            .iter()
            .position(|tier| tier.target == row.target)
            .map(|position| position + 1)
    });

    Ok(Evaluation {
        performance: final_performance,
        raw_payout: granted.map(|row| row.reward).unwrap_or_default(),
        achievement_rate: assessment.achievement_rate,
        next_target: assessment.next_target,
        shortfall: assessment.shortfall,
        achieved_tier_index,
        tiers: ladder.tiers().to_vec(),
        period_breakdown: breakdown,
        evidence: evidence.into_iter().collect(),
        confidence,
        fallback: None,
    })
}

/// Every earlier period must have reached some target. The final period's
/// rows are then tried from the largest reward down; the first row whose own
/// target and previous-period condition both hold is granted.
fn grant_final_reward<'p>(
    final_period: &'p ResolvedPeriod,
    final_performance: f64,
    achieved: &BTreeMap<u32, f64>,
) -> Option<&'p PeriodRule> {
    let mut weakest_prior = f64::INFINITY;
    for index in 1..final_period.index {
        let target = achieved.get(&index).copied().unwrap_or_default();
        if target <= 0.0 {
            return None;
        }
        weakest_prior = weakest_prior.min(target);
    }

    let mut rows: Vec<&PeriodRule> = final_period.rows.iter().collect();
    rows.sort_by(|a, b| b.reward.total_cmp(&a.reward));
    rows.into_iter().find(|row| {
        let prior_ok = row
            .explicit_condition()
            .map_or(true, |condition| weakest_prior >= condition);
        let current_ok = row.target <= 0.0 || final_performance >= row.target;
        prior_ok && current_ok
    })
}

fn candidate_targets(period: &ResolvedPeriod) -> Vec<CandidateTarget> {
    let mut candidates: Vec<CandidateTarget> = period
        .rows
        .iter()
        .map(|row| CandidateTarget {
            target: row.target,
            reward: row.reward,
            prev_period_condition: row.explicit_condition(),
        })
        .collect();
    candidates.sort_by(|a, b| {
        a.target
            .total_cmp(&b.target)
            .then_with(|| a.reward.total_cmp(&b.reward))
    });
    candidates.dedup();
    candidates
}
