use super::domain::AwardResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether a computed payout is recognized in the queried window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutDecision {
    pub expected_payout: f64,
    pub final_payout: f64,
    pub is_payout_due: bool,
}

/// A payout is due once the query reaches the award's end date. Awards
/// without an end date are always due.
pub fn attribute_payout(
    raw_payout: f64,
    rule_end: Option<NaiveDate>,
    period_end: NaiveDate,
) -> PayoutDecision {
    let is_payout_due = rule_end.map_or(true, |end| period_end >= end);
    PayoutDecision {
        expected_payout: raw_payout,
        final_payout: if is_payout_due { raw_payout } else { 0.0 },
        is_payout_due,
    }
}

impl AwardResult {
    pub(crate) fn apply_payout_gate(&mut self, period_end: NaiveDate) {
        let decision = attribute_payout(self.raw_payout, self.rule_end, period_end);
        self.expected_payout = decision.expected_payout;
        self.final_payout = decision.final_payout;
        self.is_payout_due = decision.is_payout_due;
    }
}
