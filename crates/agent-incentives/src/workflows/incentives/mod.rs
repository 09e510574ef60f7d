//! Incentive calculation for insurance agent award programs.
//!
//! Rule rows are normalized into [`AwardRule`]s, evaluated per agent and award
//! group, gated on payout timing, and reduced over comparison groups. The
//! combined results feed the cross-company optimizer and the reports.

mod batch;
mod competition;
pub mod config;
pub mod domain;
pub mod evaluation;
pub mod matching;
mod optimizer;
mod payout;
pub mod report;
pub mod rules;
pub mod scope;

#[cfg(test)]
pub(crate) mod tests;

pub use batch::{CalculationError, CalculationQuery, CalculationRun, IncentiveEngine};
pub use competition::resolve_competing_awards;
pub use config::EngineConfig;
pub use domain::{
    AwardGroupKey, AwardRef, AwardResult, AwardRule, AwardType, CandidateTarget,
    ConsecutivePeriodRow, ConsecutiveRuleSet, ContractRecord, ContractRef, FallbackBranch,
    MatchConfidence, OptimizationRecommendation, PeriodBreakdown, PeriodRule, ProductFilter, Tier,
};
pub use evaluation::{EvaluationError, TierLadder};
pub use optimizer::recommend_transfers;
pub use payout::{attribute_payout, PayoutDecision};
pub use rules::{
    NormalizedConsecutiveRules, NormalizedRules, RawRuleRow, RuleNormalizer, SkipReason,
    SkippedRow,
};
