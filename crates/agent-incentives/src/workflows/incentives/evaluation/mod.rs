mod consecutive;
mod period;
mod rate;
mod tiered;

pub use period::{PeriodResolver, ResolvedPeriod};
pub use tiered::{TierAssessment, TierLadder};

pub(crate) use consecutive::{evaluate_consecutive, period_source, ConsecutiveInput, PeriodSource};
pub(crate) use rate::evaluate_rate;
pub(crate) use tiered::evaluate_tiered;

use super::domain::{
    total_premium, ContractRef, FallbackBranch, MatchConfidence, PeriodBreakdown, Tier,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("award group '{0}' has no rules")]
    EmptyGroup(String),
    #[error("non-finite {field} while evaluating '{award}'")]
    NonFinite { award: String, field: &'static str },
    #[error("invalid period structure for '{award}': {detail}")]
    InvalidPeriods { award: String, detail: String },
}

/// What an evaluator computed before gating and competition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub performance: f64,
    pub raw_payout: f64,
    pub achievement_rate: f64,
    pub next_target: Option<f64>,
    pub shortfall: f64,
    pub achieved_tier_index: Option<usize>,
    pub tiers: Vec<Tier>,
    pub period_breakdown: BTreeMap<u32, PeriodBreakdown>,
    pub evidence: Vec<usize>,
    pub confidence: MatchConfidence,
    pub fallback: Option<FallbackBranch>,
}

/// `numerator / denominator * 100`, or 0 when the denominator is not positive.
pub(crate) fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

pub(crate) fn checked_performance(
    award: &str,
    contracts: &[ContractRef<'_>],
) -> Result<f64, EvaluationError> {
    let performance = total_premium(contracts);
    if performance.is_finite() {
        Ok(performance)
    } else {
        Err(EvaluationError::NonFinite {
            award: award.to_string(),
            field: "performance",
        })
    }
}
