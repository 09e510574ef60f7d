use super::competition::resolve_competing_awards;
use super::config::{is_all_companies, EngineConfig};
use super::domain::{
    AwardGroupKey, AwardResult, AwardRule, AwardType, ConsecutiveRuleSet, ContractRecord,
    ContractRef, MatchConfidence, OptimizationRecommendation,
};
use super::evaluation::{
    evaluate_consecutive, evaluate_rate, evaluate_tiered, period_source, ConsecutiveInput,
    Evaluation, EvaluationError, PeriodResolver, PeriodSource, TierLadder,
};
use super::optimizer::recommend_transfers;
use super::scope::{for_company, for_products, within_window, DateWindow};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query window and optional company restriction for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationQuery {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    pub company_filter: Option<String>,
}

impl CalculationQuery {
    pub fn new(period_start: NaiveDate, period_end: NaiveDate) -> Self {
        Self {
            period_start,
            period_end,
            company_filter: None,
        }
    }

    pub fn with_company_filter(mut self, company: impl Into<String>) -> Self {
        self.company_filter = Some(company.into());
        self
    }

    pub fn window(&self) -> DateWindow {
        DateWindow::closed(self.period_start, self.period_end)
    }

    fn admits(&self, company: &str) -> bool {
        match self.company_filter.as_deref() {
            None => true,
            Some(filter) if is_all_companies(filter) => true,
            Some(filter) => company == filter.trim(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalculationError {
    #[error("period end {end} precedes period start {start}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalculationRun {
    pub results: Vec<AwardResult>,
    pub recommendations: Vec<OptimizationRecommendation>,
}

/// Rules sharing company, award name and type.
struct AwardGroup<'r> {
    key: AwardGroupKey,
    rules: Vec<&'r AwardRule>,
    /// Earliest start to latest end over the rules and their periods.
    window: DateWindow,
    periods: Option<PeriodSource>,
}

impl AwardGroup<'_> {
    fn lead(&self) -> Result<&AwardRule, EvaluationError> {
        self.rules
            .first()
            .copied()
            .ok_or_else(|| EvaluationError::EmptyGroup(self.key.award_name.clone()))
    }

    /// `[start or period_start, min(period_end, end)]`, or `None` when the
    /// award has not started by the end of the query.
    fn evaluation_window(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        query: &CalculationQuery,
    ) -> Option<DateWindow> {
        if start.is_some_and(|start| start > query.period_end) {
            return None;
        }
        Some(DateWindow::closed(
            start.unwrap_or(query.period_start),
            end.map_or(query.period_end, |end| end.min(query.period_end)),
        ))
    }
}

/// Runs every award rule for every agent in a contract set.
pub struct IncentiveEngine {
    config: EngineConfig,
    pool: Option<rayon::ThreadPool>,
}

impl IncentiveEngine {
    pub fn new(config: EngineConfig) -> Self {
        let pool = if config.worker_threads > 1 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.worker_threads)
                .build()
                .ok()
        } else {
            None
        };
        Self { config, pool }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluates all awards, resolves competing awards per agent, and derives
    /// cross-company recommendations from the combined results.
    pub fn calculate(
        &self,
        contracts: &[ContractRecord],
        rules: &[AwardRule],
        consecutive: &ConsecutiveRuleSet,
        query: &CalculationQuery,
    ) -> Result<CalculationRun, CalculationError> {
        let results = self.evaluate_awards(contracts, rules, consecutive, query)?;
        let recommendations = recommend_transfers(&results, &self.config);
        Ok(CalculationRun {
            results,
            recommendations,
        })
    }

    /// Results ordered by agent, company, award name and row target.
    pub fn evaluate_awards(
        &self,
        contracts: &[ContractRecord],
        rules: &[AwardRule],
        consecutive: &ConsecutiveRuleSet,
        query: &CalculationQuery,
    ) -> Result<Vec<AwardResult>, CalculationError> {
        if query.period_end < query.period_start {
            return Err(CalculationError::InvalidWindow {
                start: query.period_start,
                end: query.period_end,
            });
        }

        let resolver = PeriodResolver::new(
            query.period_start,
            query.period_end,
            self.config.year_rollover_grace_days,
        );
        let groups = plan_groups(rules, consecutive, query, &resolver);

        let mut by_agent: BTreeMap<&str, Vec<ContractRef<'_>>> = BTreeMap::new();
        for contract in ContractRef::index_all(contracts) {
            by_agent
                .entry(contract.record.agent_id.as_str())
                .or_default()
                .push(contract);
        }
        let workloads: Vec<(&str, Vec<ContractRef<'_>>)> = by_agent.into_iter().collect();
        tracing::debug!(
            agents = workloads.len(),
            groups = groups.len(),
            parallel = self.pool.is_some(),
            "evaluating awards"
        );

        let run = AgentRun {
            groups: &groups,
            query,
            resolver,
        };
        let per_agent: Vec<Vec<AwardResult>> = match &self.pool {
            Some(pool) if workloads.len() > 1 => pool.install(|| {
                workloads
                    .into_par_iter()
                    .map(|(agent, contracts)| run.evaluate_agent(agent, &contracts))
                    .collect()
            }),
            _ => workloads
                .into_iter()
                .map(|(agent, contracts)| run.evaluate_agent(agent, &contracts))
                .collect(),
        };

        let mut results: Vec<AwardResult> = per_agent.into_iter().flatten().collect();
        results.sort_by(|a, b| {
            a.agent_id
                .cmp(&b.agent_id)
                .then_with(|| a.company.cmp(&b.company))
                .then_with(|| a.award_name.cmp(&b.award_name))
                .then_with(|| a.tier_target.total_cmp(&b.tier_target))
        });
        Ok(results)
    }
}

fn plan_groups<'r>(
    rules: &'r [AwardRule],
    consecutive: &ConsecutiveRuleSet,
    query: &CalculationQuery,
    resolver: &PeriodResolver,
) -> Vec<AwardGroup<'r>> {
    let mut grouped: BTreeMap<AwardGroupKey, Vec<&AwardRule>> = BTreeMap::new();
    for rule in rules.iter().filter(|rule| query.admits(&rule.company)) {
        grouped.entry(rule.group_key()).or_default().push(rule);
    }

    let query_window = query.window();
    grouped
        .into_iter()
        .filter_map(|(key, rules)| {
            let periods = (key.award_type == AwardType::Consecutive)
                .then(|| period_source(&key.company, &key.award_name, &rules, consecutive))
                .flatten();

            let mut starts: Vec<NaiveDate> = rules.iter().filter_map(|rule| rule.rule_start).collect();
            let mut ends: Vec<NaiveDate> = rules.iter().filter_map(|rule| rule.rule_end).collect();
            if let Some(source) = &periods {
                starts.extend(source.rows.iter().filter_map(|row| row.start).map(|date| resolver.correct_year(date)));
                ends.extend(source.rows.iter().filter_map(|row| row.end).map(|date| resolver.correct_year(date)));
            }
            let window = DateWindow::new(starts.into_iter().min(), ends.into_iter().max());

            if !window.overlaps(&query_window) {
                tracing::debug!(
                    company = %key.company,
                    award = %key.award_name,
                    "award window outside query; skipping"
                );
                return None;
            }

            Some(AwardGroup {
                key,
                rules,
                window,
                periods,
            })
        })
        .collect()
}

/// Shared, read-only state for evaluating one agent at a time.
struct AgentRun<'g, 'r> {
    groups: &'g [AwardGroup<'r>],
    query: &'g CalculationQuery,
    resolver: PeriodResolver,
}

impl AgentRun<'_, '_> {
    fn evaluate_agent(&self, agent: &str, contracts: &[ContractRef<'_>]) -> Vec<AwardResult> {
        let mut results = Vec::new();
        for group in self.groups {
            match self.evaluate_group(agent, group, contracts) {
                Ok(mut group_results) => results.append(&mut group_results),
                Err(err) => {
                    tracing::warn!(
                        agent,
                        company = %group.key.company,
                        award = %group.key.award_name,
                        error = %err,
                        "award evaluation failed"
                    );
                    results.push(failed_result(agent, group, &err));
                }
            }
        }
        resolve_competing_awards(results)
    }

    fn evaluate_group(
        &self,
        agent: &str,
        group: &AwardGroup<'_>,
        contracts: &[ContractRef<'_>],
    ) -> Result<Vec<AwardResult>, EvaluationError> {
        let in_company = if is_all_companies(&group.key.company) {
            contracts.to_vec()
        } else {
            for_company(contracts, &group.key.company)
        };

        match group.key.award_type {
            AwardType::Rate | AwardType::Tiered => self.evaluate_rows(agent, group, &in_company),
            AwardType::Summed => self.evaluate_summed(agent, group, &in_company),
            AwardType::Consecutive => self.evaluate_consecutive_group(agent, group, &in_company),
        }
    }

    /// Each row is evaluated on its own; only the best-paying row keeps its
    /// payout.
    fn evaluate_rows(
        &self,
        agent: &str,
        group: &AwardGroup<'_>,
        contracts: &[ContractRef<'_>],
    ) -> Result<Vec<AwardResult>, EvaluationError> {
        let mut results = Vec::with_capacity(group.rules.len());
        for rule in &group.rules {
            let Some(window) =
                AwardGroup::evaluation_window(rule.rule_start, rule.rule_end, self.query)
            else {
                continue;
            };
            let scoped = within_window(&for_products(contracts, &rule.product_filter), &window);

            let evaluation = match rule.award_type {
                AwardType::Rate => evaluate_rate(rule, &scoped)?,
                _ => evaluate_tiered(
                    &rule.award_name,
                    &TierLadder::new(rule.tiers.iter().copied()),
                    &scoped,
                )?,
            };
            let base_reward = match rule.award_type {
                AwardType::Rate => evaluation.raw_payout,
                _ => rule.base_reward.unwrap_or_default(),
            };
            results.push(self.assemble(
                agent,
                rule,
                evaluation,
                RowFacts {
                    rule_start: rule.rule_start,
                    rule_end: rule.rule_end,
                    tier_target: rule.base_target.unwrap_or_default(),
                    base_reward,
                },
            ));
        }

        keep_best_row(&mut results);
        results.sort_by(|a, b| a.tier_target.total_cmp(&b.tier_target));
        Ok(results)
    }

    fn evaluate_summed(
        &self,
        agent: &str,
        group: &AwardGroup<'_>,
        contracts: &[ContractRef<'_>],
    ) -> Result<Vec<AwardResult>, EvaluationError> {
        let lead = group.lead()?;
        let Some(window) =
            AwardGroup::evaluation_window(group.window.start, group.window.end, self.query)
        else {
            return Ok(Vec::new());
        };
        let scoped = within_window(&for_products(contracts, &lead.product_filter), &window);
        let ladder = TierLadder::new(
            group
                .rules
                .iter()
                .flat_map(|rule| rule.tiers.iter().copied()),
        );

        let evaluation = evaluate_tiered(&group.key.award_name, &ladder, &scoped)?;
        let base_reward = evaluation.raw_payout;
        Ok(vec![self.assemble(
            agent,
            lead,
            evaluation,
            RowFacts {
                rule_start: group.window.start,
                rule_end: group.window.end,
                tier_target: 0.0,
                base_reward,
            },
        )])
    }

    fn evaluate_consecutive_group(
        &self,
        agent: &str,
        group: &AwardGroup<'_>,
        contracts: &[ContractRef<'_>],
    ) -> Result<Vec<AwardResult>, EvaluationError> {
        let lead = group.lead()?;
        if group
            .window
            .start
            .is_some_and(|start| start > self.query.period_end)
        {
            return Ok(Vec::new());
        }

        let scoped = for_products(contracts, &lead.product_filter);
        let input = ConsecutiveInput {
            company: &group.key.company,
            award_name: &group.key.award_name,
            rules: &group.rules,
            source: group.periods.as_ref(),
            contracts: &scoped,
            query: self.query.window(),
            resolver: self.resolver,
        };
        let evaluation = evaluate_consecutive(&input)?;
        if evaluation.confidence == MatchConfidence::Heuristic {
            tracing::debug!(agent, award = %group.key.award_name, "consecutive result is heuristic");
        }

        let base_reward = evaluation
            .tiers
            .iter()
            .map(|tier| tier.reward)
            .fold(evaluation.raw_payout, f64::max);
        Ok(vec![self.assemble(
            agent,
            lead,
            evaluation,
            RowFacts {
                rule_start: group.window.start,
                rule_end: group.window.end,
                tier_target: 0.0,
                base_reward,
            },
        )])
    }

    fn assemble(
        &self,
        agent: &str,
        rule: &AwardRule,
        evaluation: Evaluation,
        facts: RowFacts,
    ) -> AwardResult {
        let mut result = AwardResult {
            agent_id: agent.to_string(),
            rule_id: rule.id.clone(),
            company: rule.company.clone(),
            award_name: rule.award_name.clone(),
            award_type: rule.award_type,
            comparison_group: rule.comparison_group.clone(),
            product_scope: rule.product_filter.label(),
            rule_start: facts.rule_start,
            rule_end: facts.rule_end,
            tier_target: facts.tier_target,
            base_reward: facts.base_reward,
            tiers: evaluation.tiers,
            rate_percent: rule.rate_percent,
            performance_amount: evaluation.performance,
            raw_payout: evaluation.raw_payout,
            expected_payout: evaluation.raw_payout,
            final_payout: evaluation.raw_payout,
            is_payout_due: true,
            achievement_rate: evaluation.achievement_rate,
            next_target: evaluation.next_target,
            shortfall_amount: evaluation.shortfall,
            achieved_tier_index: evaluation.achieved_tier_index,
            period_breakdown: evaluation.period_breakdown,
            evidence_contracts: evaluation.evidence,
            is_selected: true,
            confidence: evaluation.confidence,
            fallback: evaluation.fallback,
            error: None,
        };
        result.apply_payout_gate(self.query.period_end);
        result
    }
}

/// Row-level values that depend on how the group was evaluated.
struct RowFacts {
    rule_start: Option<NaiveDate>,
    rule_end: Option<NaiveDate>,
    tier_target: f64,
    base_reward: f64,
}

/// Zeroes every payout except the best row's, when the best row pays.
fn keep_best_row(results: &mut [AwardResult]) {
    let best = results
        .iter()
        .enumerate()
        .fold(None::<usize>, |best, (position, result)| match best {
            Some(current) if results[current].raw_payout >= result.raw_payout => Some(current),
            _ => Some(position),
        })
        .filter(|position| results[*position].raw_payout > 0.0);

    let Some(best) = best else {
        return;
    };
    for (position, result) in results.iter_mut().enumerate() {
        if position != best {
            result.raw_payout = 0.0;
            result.expected_payout = 0.0;
            result.final_payout = 0.0;
        }
    }
}

fn failed_result(agent: &str, group: &AwardGroup<'_>, err: &EvaluationError) -> AwardResult {
    let lead = group.rules.first();
    AwardResult {
        agent_id: agent.to_string(),
        rule_id: lead.map(|rule| rule.id.clone()).unwrap_or_default(),
        company: group.key.company.clone(),
        award_name: group.key.award_name.clone(),
        award_type: group.key.award_type,
        comparison_group: None,
        product_scope: lead
            .map(|rule| rule.product_filter.label())
            .unwrap_or_default(),
        rule_start: group.window.start,
        rule_end: group.window.end,
        tier_target: 0.0,
        base_reward: 0.0,
        tiers: Vec::new(),
        rate_percent: None,
        performance_amount: 0.0,
        raw_payout: 0.0,
        expected_payout: 0.0,
        final_payout: 0.0,
        is_payout_due: false,
        achievement_rate: 0.0,
        next_target: None,
        shortfall_amount: 0.0,
        achieved_tier_index: None,
        period_breakdown: BTreeMap::new(),
        evidence_contracts: Vec::new(),
        is_selected: false,
        confidence: MatchConfidence::Exact,
        fallback: None,
        error: Some(err.to_string()),
    }
}
