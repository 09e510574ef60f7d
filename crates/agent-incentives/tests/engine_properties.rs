use agent_incentives::workflows::incentives::{
    AwardResult, AwardRule, AwardType, CalculationQuery, ConsecutivePeriodRow, ConsecutiveRuleSet,
    ContractRecord, EngineConfig, IncentiveEngine, PeriodRule, ProductFilter, Tier,
};
use chrono::{Duration, NaiveDate};

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).expect("valid date")
}

fn contract(agent: &str, company: &str, when: NaiveDate, premium: f64) -> ContractRecord {
    ContractRecord {
        date: when,
        company: company.to_string(),
        product_name: "무배당 건강보험".to_string(),
        product_category: "인보험".to_string(),
        premium_amount: premium,
        agent_id: agent.to_string(),
        policyholder_id: String::new(),
    }
}

fn rule(company: &str, award: &str, award_type: AwardType) -> AwardRule {
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

fn ladder_rule(company: &str, award: &str, tiers: &[(f64, f64)]) -> AwardRule {
    AwardRule {
        tiers: tiers
            .iter()
            .map(|(target, reward)| Tier {
                target: *target,
                reward: *reward,
            })
            .collect(),
        has_step_columns: true,
        ..rule(company, award, AwardType::Tiered)
    }
}

fn evaluate(
    contracts: &[ContractRecord],
    rules: &[AwardRule],
    consecutive: &ConsecutiveRuleSet,
    query: &CalculationQuery,
) -> Vec<AwardResult> {
    IncentiveEngine::new(EngineConfig::default())
        .evaluate_awards(contracts, rules, consecutive, query)
        .expect("run succeeds")
}

/// Deterministic premium sequence covering below, between and above tiers.
fn premiums() -> impl Iterator<Item = f64> {
    (0..40).map(|step| f64::from(step) * 7_500.0 + 1.0)
}

#[test]
fn tiered_shortfall_and_achievement_stay_in_range() {
    let rules = vec![ladder_rule(
        "KB손해보험",
        "계단",
        &[(50_000.0, 5_000.0), (100_000.0, 12_000.0), (250_000.0, 40_000.0)],
    )];
    let query = CalculationQuery::new(date(3, 1), date(3, 31));

    for premium in premiums() {
        let contracts = vec![contract("kim", "KB손해보험", date(3, 10), premium)];
        let results = evaluate(&contracts, &rules, &ConsecutiveRuleSet::default(), &query);
        let result = &results[0];

        assert!(result.shortfall_amount >= 0.0, "premium {premium}");
        if result.next_target.is_some() {
            assert!(result.achievement_rate <= 100.0, "premium {premium}");
        } else {
            assert_eq!(result.shortfall_amount, 0.0);
        }
    }
}

#[test]
fn rate_payout_scales_with_premium() {
    let mut kb_rate = rule("KB손해보험", "정률", AwardType::Rate);
    kb_rate.rate_percent = Some(7.5);
    let rules = vec![kb_rate];
    let query = CalculationQuery::new(date(3, 1), date(3, 31));

    let base = vec![
        contract("kim", "KB손해보험", date(3, 3), 40_000.0),
        contract("kim", "KB손해보험", date(3, 9), 60_000.0),
    ];
    let base_payout = evaluate(&base, &rules, &ConsecutiveRuleSet::default(), &query)[0].raw_payout;

    for factor in [0.5, 2.0, 3.0, 10.0] {
        let scaled: Vec<ContractRecord> = base
            .iter()
            .map(|record| ContractRecord {
                premium_amount: record.premium_amount * factor,
                ..record.clone()
            })
            .collect();
        let payout = evaluate(&scaled, &rules, &ConsecutiveRuleSet::default(), &query)[0].raw_payout;
        assert!((payout - base_payout * factor).abs() < 1e-6, "factor {factor}");
    }
}

#[test]
fn unfinished_awards_never_pay_out() {
    let mut rate = rule("KB손해보험", "정률", AwardType::Rate);
    rate.rate_percent = Some(10.0);
    let rules = vec![rate, ladder_rule("KB손해보험", "계단", &[(10_000.0, 3_000.0)])];
    let contracts = vec![contract("kim", "KB손해보험", date(3, 2), 50_000.0)];

    for day in 2..31 {
        let query = CalculationQuery::new(date(3, 1), date(3, day));
        for result in evaluate(&contracts, &rules, &ConsecutiveRuleSet::default(), &query) {
            assert_eq!(result.final_payout, 0.0, "day {day}");
            assert_eq!(result.expected_payout, result.raw_payout, "day {day}");
            assert!(!result.is_payout_due);
        }
    }
}

#[test]
fn consecutive_payouts_require_every_earlier_period() {
    let award = "연속 가동";
    let periods = [(100_000.0, 0.0), (150_000.0, 60_000.0), (200_000.0, 150_000.0)];
    let starts = [date(3, 1), date(4, 1), date(5, 1)];
    let rule_set = ConsecutiveRuleSet::new(
        periods
            .iter()
            .zip(starts)
            .enumerate()
            .map(|(index, ((target, reward), start))| ConsecutivePeriodRow {
                company: "KB손해보험".to_string(),
                award_name: award.to_string(),
                period: PeriodRule {
                    period_index: index as u32 + 1,
                    start: Some(start),
                    end: Some(start + Duration::days(27)),
                    target: *target,
                    reward: *reward,
                    prev_period_condition: None,
                },
            })
            .collect(),
    );
    let mut consecutive = rule("KB손해보험", award, AwardType::Consecutive);
    consecutive.rule_end = Some(date(5, 31));
    let stepped = AwardRule {
        tiers: periods
            .iter()
            .map(|(target, reward)| Tier {
                target: *target,
                reward: *reward,
            })
            .collect(),
        has_step_columns: true,
        ..consecutive.clone()
    };
    let query = CalculationQuery::new(date(3, 1), date(5, 31));

    let mut contracts = Vec::new();
    for (agent_number, premium) in premiums().step_by(3).enumerate() {
        let agent = format!("agent-{agent_number:02}");
        for (month, factor) in [(3, 1.0), (4, 1.5), (5, 2.0)] {
            contracts.push(contract(&agent, "KB손해보험", date(month, 10), premium * factor * 4.0));
        }
    }

    for award_rule in [consecutive, stepped] {
        let results = evaluate(&contracts, &[award_rule], &rule_set, &query);
        assert!(results.iter().any(|result| result.final_payout > 0.0));
        for result in results.iter().filter(|result| result.final_payout > 0.0) {
            for index in 1..3 {
                assert!(
                    result.period_breakdown[&index].achieved_target > 0.0,
                    "{} skipped period {index}",
                    result.agent_id
                );
            }
        }
    }
}

#[test]
fn recommendations_always_cross_companies() {
    let companies = ["KB손해보험", "삼성화재", "메리츠화재"];
    let rules: Vec<AwardRule> = companies
        .iter()
        .flat_map(|company| {
            [
                ladder_rule(
                    company,
                    "인보험 시상",
                    &[(300_000.0, 30_000.0), (600_000.0, 90_000.0)],
                ),
                ladder_rule(
                    company,
                    "인보험 추가",
                    &[(200_000.0, 10_000.0), (400_000.0, 50_000.0)],
                ),
            ]
        })
        .collect();

    let mut contracts = Vec::new();
    for (agent_number, premium) in premiums().step_by(5).enumerate() {
        let agent = format!("agent-{agent_number:02}");
        for (position, company) in companies.iter().enumerate() {
            let scale = [12.0, 4.0, 1.5][(agent_number + position) % 3];
            contracts.push(contract(&agent, company, date(3, 12), premium * scale));
        }
    }

    let run = IncentiveEngine::new(EngineConfig::default())
        .calculate(
            &contracts,
            &rules,
            &ConsecutiveRuleSet::default(),
            &CalculationQuery::new(date(3, 1), date(3, 31)),
        )
        .expect("run succeeds");

    assert!(!run.recommendations.is_empty());
    for recommendation in &run.recommendations {
        assert_ne!(
            recommendation.saturated_ref.company,
            recommendation.opportunity_ref.company
        );
        assert_eq!(
            recommendation.saturated_ref.agent_id,
            recommendation.opportunity_ref.agent_id
        );
        assert!(recommendation.marginal_gain > 0.0);
    }
}
