use super::{checked_performance, ratio_pct, Evaluation, EvaluationError};
use crate::workflows::incentives::domain::{evidence_of, ContractRef, Tier};

/// Ascending, de-duplicated list of (target, reward) steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierLadder {
    tiers: Vec<Tier>,
}

impl TierLadder {
    /// Drops tiers with non-positive or non-finite values, then keeps the
    /// highest reward for each distinct target.
    pub fn new<I>(tiers: I) -> Self
    where
        I: IntoIterator<Item = Tier>,
    {
        let mut usable: Vec<Tier> = tiers
            .into_iter()
            .filter(|tier| tier.target.is_finite() && tier.reward.is_finite() && tier.target > 0.0)
            .collect();
        usable.sort_by(|a, b| {
            a.target
                .total_cmp(&b.target)
                .then_with(|| b.reward.total_cmp(&a.reward))
        });
        usable.dedup_by(|later, kept| later.target == kept.target);
        Self { tiers: usable }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn top(&self) -> Option<Tier> {
        self.tiers.last().copied()
    }

    /// Highest tier whose target the performance meets, with its 0-based position.
    pub fn achieved(&self, performance: f64) -> Option<(usize, Tier)> {
        self.tiers
            .iter()
            .rposition(|tier| tier.target <= performance)
            .map(|position| (position, self.tiers[position]))
    }

    pub fn next_above(&self, performance: f64) -> Option<Tier> {
        self.tiers
            .iter()
            .find(|tier| tier.target > performance)
            .copied()
    }

    pub fn assess(&self, performance: f64) -> TierAssessment {
        let Some(first) = self.tiers.first() else {
            return TierAssessment::default();
        };

        match self.achieved(performance) {
            None => TierAssessment {
                payout: 0.0,
                achieved_tier_index: None,
                next_target: Some(first.target),
                shortfall: (first.target - performance).max(0.0),
                achievement_rate: ratio_pct(performance, first.target),
            },
            Some((position, tier)) => match self.next_above(performance) {
                Some(next) => TierAssessment {
                    payout: tier.reward,
                    achieved_tier_index: Some(position + 1),
                    next_target: Some(next.target),
                    shortfall: (next.target - performance).max(0.0),
                    achievement_rate: ratio_pct(performance, next.target).min(100.0),
                },
                None => TierAssessment {
                    payout: tier.reward,
                    achieved_tier_index: Some(position + 1),
                    next_target: None,
                    shortfall: 0.0,
                    achievement_rate: 100.0,
                },
            },
        }
    }
}

/// Where a performance sits on a ladder.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TierAssessment {
    pub payout: f64,
    /// 1-based position of the achieved tier.
    pub achieved_tier_index: Option<usize>,
    pub next_target: Option<f64>,
    pub shortfall: f64,
    pub achievement_rate: f64,
}

pub(crate) fn evaluate_tiered(
    award: &str,
    ladder: &TierLadder,
    contracts: &[ContractRef<'_>],
) -> Result<Evaluation, EvaluationError> {
    let performance = checked_performance(award, contracts)?;
    let assessment = ladder.assess(performance);

    Ok(Evaluation {
        performance,
        raw_payout: assessment.payout,
        achievement_rate: assessment.achievement_rate,
        next_target: assessment.next_target,
        shortfall: assessment.shortfall,
        achieved_tier_index: assessment.achieved_tier_index,
        tiers: ladder.tiers().to_vec(),
        evidence: evidence_of(contracts),
        ..Evaluation::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder(pairs: &[(f64, f64)]) -> TierLadder {
        TierLadder::new(
            pairs
                .iter()
                .map(|(target, reward)| Tier { target: *target, reward: *reward }),
        )
    }

    #[test]
    fn between_tiers_pays_lower_tier_and_reports_gap() {
        let assessment = ladder(&[(50_000.0, 5_000.0), (100_000.0, 12_000.0)]).assess(80_000.0);

        assert_eq!(assessment.payout, 5_000.0);
        assert_eq!(assessment.achieved_tier_index, Some(1));
        assert_eq!(assessment.next_target, Some(100_000.0));
        assert_eq!(assessment.shortfall, 20_000.0);
        assert_eq!(assessment.achievement_rate, 80.0);
    }

    #[test]
    fn below_first_tier_measures_against_first_target() {
        let assessment = ladder(&[(100_000.0, 12_000.0), (50_000.0, 5_000.0)]).assess(20_000.0);

        assert_eq!(assessment.payout, 0.0);
        assert_eq!(assessment.achieved_tier_index, None);
        assert_eq!(assessment.next_target, Some(50_000.0));
        assert_eq!(assessment.shortfall, 30_000.0);
        assert_eq!(assessment.achievement_rate, 40.0);
    }

    #[test]
    fn beyond_top_tier_is_complete() {
        let assessment = ladder(&[(50_000.0, 5_000.0), (100_000.0, 12_000.0)]).assess(150_000.0);

        assert_eq!(assessment.payout, 12_000.0);
        assert_eq!(assessment.achieved_tier_index, Some(2));
        assert_eq!(assessment.next_target, None);
        assert_eq!(assessment.shortfall, 0.0);
        assert_eq!(assessment.achievement_rate, 100.0);
    }

    #[test]
    fn rewards_are_flat_not_cumulative() {
        let assessment = ladder(&[
            (10_000.0, 1_000.0),
            (20_000.0, 3_000.0),
            (30_000.0, 6_000.0),
        ])
        .assess(30_000.0);
        assert_eq!(assessment.payout, 6_000.0);
    }

    #[test]
    fn duplicates_keep_best_reward_and_invalid_tiers_are_dropped() {
        let built = ladder(&[
            (50_000.0, 5_000.0),
            (50_000.0, 7_000.0),
            (0.0, 1_000.0),
            (-10.0, 1_000.0),
            (f64::NAN, 1_000.0),
            (80_000.0, 9_000.0),
        ]);
        assert_eq!(
            built.tiers(),
            &[
                Tier { target: 50_000.0, reward: 7_000.0 },
                Tier { target: 80_000.0, reward: 9_000.0 },
            ]
        );
    }

    #[test]
    fn empty_ladder_pays_nothing() {
        let assessment = TierLadder::default().assess(500_000.0);
        assert_eq!(assessment, TierAssessment::default());
    }
}
