use super::common::*;
use crate::workflows::incentives::domain::{AwardResult, ContractRecord, Tier};
use crate::workflows::incentives::report::{
    daily_totals, golden_opportunities, missed_opportunities, momentum_pivot,
    product_statistics, summarize_awards, summarize_company, weekly_performance,
    CoachingReport, Urgency,
};

fn progress(
    company: &str,
    award: &str,
    performance: f64,
    tiers: &[(f64, f64)],
) -> AwardResult {
    let ladder = crate::workflows::incentives::TierLadder::new(
        tiers
            .iter()
            .map(|(target, reward)| Tier { target: *target, reward: *reward }),
    );
    let assessment = ladder.assess(performance);
    let mut result = sample_result("kim", company, award);
    result.performance_amount = performance;
    result.tiers = ladder.tiers().to_vec();
    result.raw_payout = assessment.payout;
    result.expected_payout = assessment.payout;
    result.final_payout = assessment.payout;
    result.achievement_rate = assessment.achievement_rate;
    result.next_target = assessment.next_target;
    result.shortfall_amount = assessment.shortfall;
    result.achieved_tier_index = assessment.achieved_tier_index;
    result
}

#[test]
fn missed_opportunities_rank_by_return_on_the_shortfall() {
    let results = vec![
        progress("KB손해보험", "계단 시상", 80_000.0, &[(50_000.0, 5_000.0), (100_000.0, 12_000.0)]),
        progress("삼성화재", "첫 단계", 90_000.0, &[(100_000.0, 50_000.0)]),
        progress("메리츠화재", "먼 목표", 10_000.0, &[(100_000.0, 50_000.0)]),
    ];

    let missed = missed_opportunities(&results);
    assert_eq!(missed.len(), 2);

    assert_eq!(missed[0].award_name, "첫 단계");
    assert_eq!(missed[0].extra_reward, 50_000.0);
    assert_eq!(missed[0].roi_pct, 500.0);
    assert_eq!(missed[0].urgency, Urgency::High);

    assert_eq!(missed[1].award_name, "계단 시상");
    assert_eq!(missed[1].extra_reward, 7_000.0);
    assert!((missed[1].roi_pct - 35.0).abs() < 1e-9);
    assert_eq!(missed[1].urgency, Urgency::Low);
}

#[test]
fn golden_opportunities_need_a_selected_award_that_pays_nothing_yet() {
    let mut lost = progress("DB손해보험", "택1 탈락", 70_000.0, &[(100_000.0, 40_000.0)]);
    lost.is_selected = false;
    let results = vec![
        progress("KB손해보험", "절반 달성", 60_000.0, &[(100_000.0, 30_000.0)]),
        progress("삼성화재", "이미 지급", 120_000.0, &[(100_000.0, 30_000.0), (200_000.0, 60_000.0)]),
        progress("메리츠화재", "초기", 20_000.0, &[(100_000.0, 30_000.0)]),
        lost,
    ];

    let golden = golden_opportunities(&results);
    assert_eq!(golden.len(), 1);
    assert_eq!(golden[0].award_name, "절반 달성");
    assert_eq!(golden[0].gap, 40_000.0);
    assert_eq!(golden[0].expected_reward, 30_000.0);
    assert_eq!(golden[0].roi, 0.75);
}

#[test]
fn summaries_count_selected_results_only() {
    let paid = progress("KB손해보험", "지급", 120_000.0, &[(100_000.0, 10_000.0)]);
    let mut loser = progress("KB손해보험", "탈락", 150_000.0, &[(100_000.0, 20_000.0)]);
    loser.is_selected = false;
    loser.final_payout = 0.0;
    let halfway = progress("삼성화재", "진행", 60_000.0, &[(100_000.0, 10_000.0)]);
    let behind = progress("메리츠화재", "미달", 20_000.0, &[(100_000.0, 10_000.0)]);
    let mut broken = sample_result("park", "DB손해보험", "오류");
    broken.error = Some("invalid period structure".to_string());
    broken.is_selected = false;
    let results = vec![paid, loser, halfway, behind, broken];

    let awards = summarize_awards(&results);
    assert_eq!(awards.total_final_payout, 10_000.0);
    assert_eq!(awards.award_count, 5);
    assert_eq!(awards.achieved_count, 1);
    assert_eq!(awards.errored_count, 1);

    let company = summarize_company(&results);
    assert_eq!(company.confirmed_count, 1);
    assert_eq!(company.confirmed_payout, 10_000.0);
    assert_eq!(company.in_progress_count, 1);
    assert_eq!(company.not_achieved_count, 1);
    assert_eq!(company.agent_count, 2);
    assert_eq!(company.average_achievement, 70.0);
}

#[test]
fn momentum_pivot_flags_the_first_sharp_drop() {
    let mut contracts = vec![contract("kim", "KB손해보험", "건강보험", date(3, 1), 1_000_000.0)];
    contracts.extend(
        (2..=7).map(|day| contract("kim", "KB손해보험", "건강보험", date(3, day), 10_000.0)),
    );

    let pivot = momentum_pivot(&contracts).expect("sharp drop detected");
    assert_eq!(pivot.pivot_date, date(3, 2));
    assert!((pivot.decline_pct - 49.5).abs() < 1e-9);
    assert_eq!(pivot.average_before, 1_000_000.0);
    assert_eq!(pivot.average_after, 10_000.0);
}

#[test]
fn momentum_pivot_needs_a_week_of_steady_data() {
    let short: Vec<ContractRecord> = (1..=6)
        .map(|day| contract("kim", "KB손해보험", "건강보험", date(3, day), 10_000.0))
        .collect();
    assert!(momentum_pivot(&short).is_none());

    let steady: Vec<ContractRecord> = (1..=10)
        .map(|day| contract("kim", "KB손해보험", "건강보험", date(3, day), 10_000.0))
        .collect();
    assert!(momentum_pivot(&steady).is_none());
}

#[test]
fn trends_bucket_by_day_week_and_category() {
    let mut contracts = vec![
        contract("kim", "KB손해보험", "건강보험", date(3, 1), 10_000.0),
        contract("kim", "KB손해보험", "건강보험", date(3, 1), 30_000.0),
        contract("kim", "KB손해보험", "화재보험", date(3, 8), 5_000.0),
        contract("kim", "KB손해보험", "건강보험", date(3, 29), 7_000.0),
    ];
    contracts[0].product_category = "인보험".to_string();
    contracts[1].product_category = "인보험".to_string();

    let daily = daily_totals(&contracts);
    assert_eq!(daily.len(), 3);
    assert_eq!(daily[0].premium, 40_000.0);
    assert_eq!(daily[2].cumulative, 52_000.0);

    let weeks = weekly_performance(&contracts, date(3, 1));
    let counts: Vec<usize> = weeks.iter().map(|week| week.contract_count).collect();
    assert_eq!(counts, vec![2, 1, 0, 0]);
    assert_eq!(weeks[3].end, date(3, 28));

    let stats = product_statistics(&contracts);
    assert_eq!(stats.len(), 2);
    let person = stats
        .iter()
        .find(|entry| entry.category == "인보험")
        .expect("category present");
    assert_eq!(person.contract_count, 2);
    assert_eq!(person.premium_mean, 20_000.0);
    assert!(stats.iter().any(|entry| entry.category == "기타"));
}

#[test]
fn coaching_report_renders_one_agent() {
    let results = vec![
        progress("삼성화재", "첫 단계", 90_000.0, &[(100_000.0, 50_000.0)]),
        {
            let mut other = progress("KB손해보험", "다른 설계사", 95_000.0, &[(100_000.0, 10_000.0)]);
            other.agent_id = "park".to_string();
            other
        },
    ];
    let contracts = vec![contract("kim", "삼성화재", "건강보험", date(3, 3), 90_000.0)];

    let report = CoachingReport::build("kim", date(3, 31), &results, &contracts, &[]);
    assert_eq!(report.missed.len(), 1);
    assert!(report.pivot.is_none());

    let markdown = report.to_string();
    assert!(markdown.starts_with("# Incentive report for 2025-03-31"));
    assert!(markdown.contains("### [삼성화재] 첫 단계"));
    assert!(markdown.contains("Concentrate on 첫 단계"));
    assert!(!markdown.contains("다른 설계사"));
}
