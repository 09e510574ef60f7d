use crate::workflows::incentives::domain::PeriodRule;
use crate::workflows::incentives::scope::DateWindow;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

/// One declared period of a consecutive award.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPeriod {
    pub index: u32,
    pub window: DateWindow,
    pub rows: Vec<PeriodRule>,
}

impl ResolvedPeriod {
    /// Largest row target the performance meets; 0 when none is met.
    pub fn achieved_target(&self, performance: f64) -> f64 {
        self.rows
            .iter()
            .map(|row| row.target)
            .filter(|target| *target <= performance)
            .fold(0.0, f64::max)
    }
}

/// Maps period rows onto contract windows inside a query window.
#[derive(Debug, Clone, Copy)]
pub struct PeriodResolver {
    query_start: NaiveDate,
    query_end: NaiveDate,
    grace: Duration,
}

impl PeriodResolver {
    pub fn new(query_start: NaiveDate, query_end: NaiveDate, grace_days: i64) -> Self {
        Self {
            query_start,
            query_end,
            grace: Duration::days(grace_days.max(0)),
        }
    }

    /// Dates past the query end plus the grace period are taken to be
    /// year-end periods typed with the wrong year.
    pub fn correct_year(&self, date: NaiveDate) -> NaiveDate {
        if date <= self.query_end + self.grace {
            return date;
        }
        date.with_year(date.year() - 1)
            .unwrap_or_else(|| date - Duration::days(365))
    }

    /// Groups rows by period index (ascending). Each window spans the
    /// earliest start to the latest end of its rows.
    pub fn resolve(&self, rows: &[PeriodRule]) -> Vec<ResolvedPeriod> {
        let mut by_index: BTreeMap<u32, Vec<PeriodRule>> = BTreeMap::new();
        for row in rows {
            by_index.entry(row.period_index).or_default().push(row.clone());
        }

        by_index
            .into_iter()
            .map(|(index, rows)| {
                let start = rows.iter().filter_map(|row| row.start).min();
                let end = rows.iter().filter_map(|row| row.end).max();
                let window = DateWindow::closed(
                    self.correct_year(start.unwrap_or(self.query_start)),
                    self.correct_year(end.unwrap_or(self.query_end)),
                );
                ResolvedPeriod {
                    index,
                    window,
                    rows,
                }
            })
            .collect()
    }
}

/// Fills missing previous-period conditions by pairing adjacent periods:
/// the previous period's rows sorted by target ascending against the current
/// period's rows sorted by reward ascending, only where the row counts match.
///
/// Returns whether any condition was inferred. Groups declaring any explicit
/// condition are left untouched.
pub(crate) fn infer_conditions_by_rank(periods: &mut [ResolvedPeriod]) -> bool {
    let has_explicit = periods
        .iter()
        .flat_map(|period| period.rows.iter())
        .any(|row| row.explicit_condition().is_some());
    if has_explicit || periods.len() < 2 {
        return false;
    }

    let mut inferred = false;
    for position in 1..periods.len() {
        let (before, after) = periods.split_at_mut(position);
        let previous = &before[position - 1];
        let current = &mut after[0];
        if previous.index + 1 != current.index || previous.rows.len() != current.rows.len() {
            continue;
        }

        let mut previous_targets: Vec<f64> = previous.rows.iter().map(|row| row.target).collect();
        previous_targets.sort_by(f64::total_cmp);

        let mut order: Vec<usize> = (0..current.rows.len()).collect();
        order.sort_by(|a, b| current.rows[*a].reward.total_cmp(&current.rows[*b].reward));

        for (row_position, target) in order.into_iter().zip(previous_targets) {
            current.rows[row_position].prev_period_condition = Some(target);
        }
        inferred = true;
    }

    inferred
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn row(period_index: u32, target: f64, reward: f64) -> PeriodRule {
        PeriodRule {
            period_index,
            start: None,
            end: None,
            target,
            reward,
            prev_period_condition: None,
        }
    }

    #[test]
    fn windows_span_rows_and_fall_back_to_query() {
        let resolver = PeriodResolver::new(date(2025, 1, 1), date(2025, 2, 28), 31);
        let mut first = row(1, 100.0, 10.0);
        first.start = Some(date(2025, 1, 1));
        first.end = Some(date(2025, 1, 15));
        let mut second = row(1, 200.0, 20.0);
        second.end = Some(date(2025, 1, 31));

        let periods = resolver.resolve(&[row(2, 100.0, 10.0), first, second]);
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].index, 1);
        assert_eq!(periods[0].window, DateWindow::closed(date(2025, 1, 1), date(2025, 1, 31)));
        assert_eq!(periods[1].window, DateWindow::closed(date(2025, 1, 1), date(2025, 2, 28)));
    }

    #[test]
    fn far_future_dates_move_back_one_year() {
        let resolver = PeriodResolver::new(date(2025, 1, 1), date(2025, 1, 31), 31);
        assert_eq!(resolver.correct_year(date(2025, 12, 1)), date(2024, 12, 1));
        assert_eq!(resolver.correct_year(date(2025, 3, 4)), date(2024, 3, 4));
        assert_eq!(resolver.correct_year(date(2025, 3, 3)), date(2025, 3, 3));
    }

    #[test]
    fn achieved_target_is_largest_met_target() {
        let period = ResolvedPeriod {
            index: 1,
            window: DateWindow::new(None, None),
            rows: vec![row(1, 100.0, 1.0), row(1, 300.0, 3.0), row(1, 200.0, 2.0)],
        };
        assert_eq!(period.achieved_target(250.0), 200.0);
        assert_eq!(period.achieved_target(50.0), 0.0);
    }

    #[test]
    fn rank_pairing_matches_ascending_targets_to_ascending_rewards() {
        let resolver = PeriodResolver::new(date(2025, 1, 1), date(2025, 2, 28), 31);
        let mut periods = resolver.resolve(&[
            row(1, 200_000.0, 0.0),
            row(1, 100_000.0, 0.0),
            row(2, 100_000.0, 90_000.0),
            row(2, 100_000.0, 40_000.0),
        ]);

        assert!(infer_conditions_by_rank(&mut periods));
        let second: Vec<(f64, Option<f64>)> = periods[1]
            .rows
            .iter()
            .map(|row| (row.reward, row.prev_period_condition))
            .collect();
        assert_eq!(
            second,
            vec![(90_000.0, Some(200_000.0)), (40_000.0, Some(100_000.0))]
        );
    }

    #[test]
    fn rank_pairing_skips_uneven_periods_and_explicit_groups() {
        let resolver = PeriodResolver::new(date(2025, 1, 1), date(2025, 2, 28), 31);
        let mut uneven = resolver.resolve(&[
            row(1, 100_000.0, 0.0),
            row(2, 100_000.0, 40_000.0),
            row(2, 200_000.0, 90_000.0),
        ]);
        assert!(!infer_conditions_by_rank(&mut uneven));

        let mut explicit_row = row(2, 100_000.0, 40_000.0);
        explicit_row.prev_period_condition = Some(50_000.0);
        let mut explicit = resolver.resolve(&[row(1, 100_000.0, 0.0), explicit_row]);
        assert!(!infer_conditions_by_rank(&mut explicit));
        assert_eq!(explicit[1].rows[0].prev_period_condition, Some(50_000.0));
    }
}
