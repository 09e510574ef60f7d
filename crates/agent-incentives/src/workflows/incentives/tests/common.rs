use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::workflows::incentives::domain::{
    AwardResult, AwardRule, AwardType, ContractRecord, MatchConfidence, PeriodRule, ProductFilter,
    Tier,
};

pub(crate) fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).expect("valid date")
}

/// A selected, due result with nothing computed yet.
pub(crate) fn sample_result(agent: &str, company: &str, award: &str) -> AwardResult {
    AwardResult {
        agent_id: agent.to_string(),
        rule_id: format!("{company}/{award}"),
        company: company.to_string(),
        award_name: award.to_string(),
        award_type: AwardType::Tiered,
        comparison_group: None,
        product_scope: "all".to_string(),
        rule_start: None,
        rule_end: None,
        tier_target: 0.0,
        base_reward: 0.0,
        tiers: Vec::new(),
        rate_percent: None,
        performance_amount: 0.0,
        raw_payout: 0.0,
        expected_payout: 0.0,
        final_payout: 0.0,
        is_payout_due: true,
        achievement_rate: 0.0,
        next_target: None,
        shortfall_amount: 0.0,
        achieved_tier_index: None,
        period_breakdown: BTreeMap::new(),
        evidence_contracts: Vec::new(),
        is_selected: true,
        confidence: MatchConfidence::Exact,
        fallback: None,
        error: None,
    }
}

pub(crate) fn contract(
    agent: &str,
    company: &str,
    product: &str,
    when: NaiveDate,
    premium: f64,
) -> ContractRecord {
    ContractRecord {
        date: when,
        company: company.to_string(),
        product_name: product.to_string(),
        product_category: String::new(),
        premium_amount: premium,
        agent_id: agent.to_string(),
        policyholder_id: format!("holder-{agent}"),
    }
}

pub(crate) fn march_rule(company: &str, award: &str, award_type: AwardType) -> AwardRule {
    AwardRule {
        id: format!("{company}/{award}"),
        company: company.to_string(),
        award_name: award.to_string(),
        award_type,
        product_filter: ProductFilter::All,
        comparison_group: None,
        rule_start: Some(date(3, 1)),
        rule_end: Some(date(3, 31)),
        rate_percent: None,
        tiers: Vec::new(),
        consecutive_periods: Vec::new(),
        base_target: None,
        base_reward: None,
        has_step_columns: false,
    }
}

pub(crate) fn rate_rule(company: &str, award: &str, rate_percent: f64) -> AwardRule {
    AwardRule {
        rate_percent: Some(rate_percent),
        ..march_rule(company, award, AwardType::Rate)
    }
}

pub(crate) fn tiered_rule(company: &str, award: &str, tiers: &[(f64, f64)]) -> AwardRule {
    let tiers: Vec<Tier> = tiers
        .iter()
        .map(|(target, reward)| Tier {
            target: *target,
            reward: *reward,
        })
        .collect();
    AwardRule {
        base_target: tiers.first().map(|tier| tier.target),
        base_reward: tiers.first().map(|tier| tier.reward),
        has_step_columns: tiers.len() > 1,
        tiers,
        ..march_rule(company, award, AwardType::Tiered)
    }
}

pub(crate) fn period(index: u32, start: NaiveDate, end: NaiveDate, target: f64, reward: f64) -> PeriodRule {
    PeriodRule {
        period_index: index,
        start: Some(start),
        end: Some(end),
        target,
        reward,
        prev_period_condition: None,
    }
}

