use super::{checked_performance, Evaluation, EvaluationError};
use crate::workflows::incentives::domain::{evidence_of, AwardRule, ContractRef};

/// Pays a percentage of the premium written in scope.
pub(crate) fn evaluate_rate(
    rule: &AwardRule,
    contracts: &[ContractRef<'_>],
) -> Result<Evaluation, EvaluationError> {
    let performance = checked_performance(&rule.award_name, contracts)?;

    let raw_payout = match rule.rate_percent.filter(|rate| *rate > 0.0) {
        Some(rate) => performance * (rate / 100.0),
        None => {
            tracing::warn!(
                rule = %rule.id,
                award = %rule.award_name,
                rate = ?rule.rate_percent,
                "rate award has no positive rate; paying nothing"
            );
            0.0
        }
    };

    Ok(Evaluation {
        performance,
        raw_payout,
        achievement_rate: if performance > 0.0 { 100.0 } else { 0.0 },
        evidence: evidence_of(contracts),
        ..Evaluation::default()
    })
}
