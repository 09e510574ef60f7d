use serde::{Deserialize, Serialize};

/// Product-line tokens looked up in award names when pairing awards across
/// companies.
pub const DEFAULT_PRODUCT_LINE_KEYWORDS: &[&str] = &["인보험", "재물", "펫", "단체", "장기"];

/// Company filter values that mean "every company".
pub const ALL_COMPANIES_LABELS: &[&str] = &["전체", "all", "*"];

/// Tunables for a calculation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Agents evaluated concurrently; `1` keeps the run on the calling thread.
    pub worker_threads: usize,
    /// Share of the top tier target at which an award counts as saturated.
    pub saturation_tolerance: f64,
    /// Period dates later than `period_end` plus this many days are moved back
    /// one year.
    pub year_rollover_grace_days: i64,
    pub product_line_keywords: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 1,
            saturation_tolerance: 0.98,
            year_rollover_grace_days: 31,
            product_line_keywords: DEFAULT_PRODUCT_LINE_KEYWORDS
                .iter()
                .map(|keyword| keyword.to_string())
                .collect(),
        }
    }
}

pub(crate) fn is_all_companies(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || ALL_COMPANIES_LABELS
            .iter()
            .any(|label| trimmed.eq_ignore_ascii_case(label))
}
