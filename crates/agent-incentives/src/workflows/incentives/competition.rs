use super::domain::AwardResult;
use std::collections::BTreeMap;

/// Keeps only the best-paying award of each comparison group.
///
/// Groups are keyed by agent and comparison group; results without a group
/// and groups with a single member pass through unchanged. The member with
/// the highest raw payout wins (first in input order on ties) and keeps its
/// gated payout; every other member pays nothing. When no member pays,
/// nobody is selected.
pub fn resolve_competing_awards(results: Vec<AwardResult>) -> Vec<AwardResult> {
    let mut groups: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for (position, result) in results.iter().enumerate() {
        if let Some(group) = comparison_key(result) {
            groups
                .entry((result.agent_id.clone(), group))
                .or_default()
                .push(position);
        }
    }

    let mut winners: Vec<Option<bool>> = vec![None; results.len()];
    for members in groups.values().filter(|members| members.len() > 1) {
        let winner = members
            .iter()
            .copied()
            .filter(|position| !results[*position].is_errored())
            .fold(None::<usize>, |best, position| match best {
                Some(current) if results[current].raw_payout >= results[position].raw_payout => {
                    Some(current)
                }
                _ => Some(position),
            })
            .filter(|position| results[*position].raw_payout > 0.0);

        for position in members {
            winners[*position] = Some(winner == Some(*position));
        }
    }

    results
        .into_iter()
        .zip(winners)
        .map(|(result, outcome)| match outcome {
            None => result,
            Some(true) => AwardResult {
                is_selected: true,
                final_payout: if result.is_payout_due {
                    result.raw_payout
                } else {
                    0.0
                },
                ..result
            },
            Some(false) => AwardResult {
                is_selected: false,
                final_payout: 0.0,
                ..result
            },
        })
        .collect()
}

fn comparison_key(result: &AwardResult) -> Option<String> {
    result
        .comparison_group
        .as_deref()
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::incentives::tests::common::sample_result;

    fn competing(agent: &str, name: &str, group: Option<&str>, raw: f64) -> AwardResult {
        let mut result = sample_result(agent, "KB손해보험", name);
        result.comparison_group = group.map(str::to_string);
        result.raw_payout = raw;
        result.expected_payout = raw;
        result.final_payout = raw;
        result
    }

    #[test]
    fn only_the_best_member_of_a_group_pays() {
        let resolved = resolve_competing_awards(vec![
            competing("a", "A", Some("택1"), 10_000.0),
            competing("a", "B", Some("택1"), 30_000.0),
            competing("a", "C", Some("택1"), 20_000.0),
            competing("a", "D", None, 5_000.0),
        ]);

        let payouts: Vec<(bool, f64)> = resolved
            .iter()
            .map(|result| (result.is_selected, result.final_payout))
            .collect();
        assert_eq!(
            payouts,
            vec![
                (false, 0.0),
                (true, 30_000.0),
                (false, 0.0),
                (true, 5_000.0),
            ]
        );
    }

    #[test]
    fn ties_go_to_the_first_member() {
        let resolved = resolve_competing_awards(vec![
            competing("a", "A", Some("g"), 10_000.0),
            competing("a", "B", Some("g"), 10_000.0),
        ]);
        assert!(resolved[0].is_selected);
        assert!(!resolved[1].is_selected);
        assert_eq!(resolved[1].final_payout, 0.0);
    }

    #[test]
    fn groups_are_scoped_per_agent_and_singletons_pass_through() {
        let resolved = resolve_competing_awards(vec![
            competing("a", "A", Some("g"), 10_000.0),
            competing("b", "B", Some("g"), 20_000.0),
        ]);
        assert!(resolved.iter().all(|result| result.is_selected));
        assert_eq!(resolved[0].final_payout, 10_000.0);
    }

    #[test]
    fn nobody_is_selected_when_nothing_pays() {
        let resolved = resolve_competing_awards(vec![
            competing("a", "A", Some("g"), 0.0),
            competing("a", "B", Some("g"), 0.0),
        ]);
        assert!(resolved.iter().all(|result| !result.is_selected));
    }

    #[test]
    fn deferred_winner_keeps_zero_final_payout() {
        let mut deferred = competing("a", "A", Some("g"), 40_000.0);
        deferred.is_payout_due = false;
        deferred.final_payout = 0.0;

        let resolved = resolve_competing_awards(vec![
            deferred,
            competing("a", "B", Some("g"), 10_000.0),
        ]);
        assert!(resolved[0].is_selected);
        assert_eq!(resolved[0].final_payout, 0.0);
        assert_eq!(resolved[0].expected_payout, 40_000.0);
        assert_eq!(resolved[1].final_payout, 0.0);
    }
}
