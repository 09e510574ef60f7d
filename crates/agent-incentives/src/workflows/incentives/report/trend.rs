use super::views::{DailyTotal, ProductStatistics, WeeklyPerformance};
use crate::workflows::incentives::domain::ContractRecord;
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

const UNCLASSIFIED: &str = "기타";

/// Premium per contract date, oldest first, with a running total.
pub fn daily_totals(contracts: &[ContractRecord]) -> Vec<DailyTotal> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for contract in contracts {
        *by_day.entry(contract.date).or_default() += contract.premium_amount;
    }

    let mut cumulative = 0.0;
    by_day
        .into_iter()
        .map(|(date, premium)| {
            cumulative += premium;
            DailyTotal {
                date,
                premium,
                cumulative,
            }
        })
        .collect()
}

/// Four consecutive seven-day weeks from `period_start`.
pub fn weekly_performance(
    contracts: &[ContractRecord],
    period_start: NaiveDate,
) -> Vec<WeeklyPerformance> {
    (0..4)
        .map(|week| {
            let start = period_start + Duration::days(i64::from(week) * 7);
            let end = start + Duration::days(6);
            let in_week: Vec<&ContractRecord> = contracts
                .iter()
                .filter(|contract| contract.date >= start && contract.date <= end)
                .collect();
            WeeklyPerformance {
                week: week + 1,
                start,
                end,
                contract_count: in_week.len(),
                premium_total: in_week.iter().map(|contract| contract.premium_amount).sum(),
            }
        })
        .collect()
}

pub fn product_statistics(contracts: &[ContractRecord]) -> Vec<ProductStatistics> {
    let mut by_category: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for contract in contracts {
        let category = match contract.product_category.trim() {
            "" => UNCLASSIFIED,
            tagged => tagged,
        };
        let entry = by_category.entry(category).or_default();
        entry.0 += 1;
        entry.1 += contract.premium_amount;
    }

    by_category
        .into_iter()
        .map(|(category, (contract_count, premium_total))| ProductStatistics {
            category: category.to_string(),
            contract_count,
            premium_total,
            premium_mean: premium_total / contract_count as f64,
        })
        .collect()
}
