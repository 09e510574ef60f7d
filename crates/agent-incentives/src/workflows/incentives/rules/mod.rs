//! Rule sheet normalization: header aliases, cell parsing and the row to
//! [`AwardRule`](super::domain::AwardRule) transform.

mod aliases;
mod cells;
mod normalizer;

pub use cells::{parse_amount, parse_date, parse_index};
pub use normalizer::{
    NormalizedConsecutiveRules, NormalizedRules, RawRuleRow, RuleNormalizer, SkipReason,
    SkippedRow,
};
