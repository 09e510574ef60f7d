use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One sales contract attributed to an agent.
///
/// Records reach the engine already cleaned: dates are present and premiums
/// are positive. The engine never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub date: NaiveDate,
    pub company: String,
    pub product_name: String,
    #[serde(default)]
    pub product_category: String,
    pub premium_amount: f64,
    pub agent_id: String,
    #[serde(default)]
    pub policyholder_id: String,
}

/// Borrowed view of a contract together with its position in the run input.
#[derive(Debug, Clone, Copy)]
pub struct ContractRef<'a> {
    pub index: usize,
    pub record: &'a ContractRecord,
}

impl<'a> ContractRef<'a> {
    pub fn index_all(contracts: &'a [ContractRecord]) -> Vec<ContractRef<'a>> {
        contracts
            .iter()
            .enumerate()
            .map(|(index, record)| ContractRef { index, record })
            .collect()
    }
}

pub(crate) fn total_premium(contracts: &[ContractRef<'_>]) -> f64 {
    contracts
        .iter()
        .map(|contract| contract.record.premium_amount)
        .sum()
}

pub(crate) fn evidence_of(contracts: &[ContractRef<'_>]) -> Vec<usize> {
    contracts.iter().map(|contract| contract.index).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardType {
    Rate,
    Tiered,
    Consecutive,
    Summed,
}

impl AwardType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rate => "Rate",
            Self::Tiered => "Tiered",
            Self::Consecutive => "Consecutive",
            Self::Summed => "Summed",
        }
    }

    /// Accepts the sheet spellings (`정률형`, `계단형`, `연속형`, `합산형`) and
    /// their English names.
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned: String = raw.split_whitespace().collect::<String>().to_lowercase();
        match cleaned.as_str() {
            "정률형" | "정률" | "rate" => Some(Self::Rate),
            "계단형" | "계단" | "tiered" | "step" | "tier" => Some(Self::Tiered),
            "연속형" | "연속" | "consecutive" => Some(Self::Consecutive),
            "합산형" | "합산" | "summed" | "sum" => Some(Self::Summed),
            _ => None,
        }
    }

    /// Grouped types are evaluated once per award group instead of per row.
    pub const fn evaluates_as_group(self) -> bool {
        matches!(self, Self::Consecutive | Self::Summed)
    }
}

impl fmt::Display for AwardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which contracts count toward an award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProductFilter {
    All,
    /// Product names containing any keyword qualify.
    Keywords(Vec<String>),
    /// Contracts tagged with this category qualify.
    Category(String),
}

impl ProductFilter {
    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Keywords(keywords) => keywords.join("|"),
            Self::Category(category) => category.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub target: f64,
    pub reward: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRule {
    pub period_index: u32,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub target: f64,
    pub reward: f64,
    pub prev_period_condition: Option<f64>,
}

impl PeriodRule {
    pub(crate) fn explicit_condition(&self) -> Option<f64> {
        self.prev_period_condition.filter(|value| *value > 0.0)
    }
}

/// Canonical form of one award rule row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardRule {
    pub id: String,
    pub company: String,
    pub award_name: String,
    pub award_type: AwardType,
    pub product_filter: ProductFilter,
    pub comparison_group: Option<String>,
    pub rule_start: Option<NaiveDate>,
    pub rule_end: Option<NaiveDate>,
    pub rate_percent: Option<f64>,
    /// Step ladder declared by this row (step columns plus the row target).
    pub tiers: Vec<Tier>,
    pub consecutive_periods: Vec<PeriodRule>,
    /// The row's own target, used to order rows for presentation.
    pub base_target: Option<f64>,
    /// The reward this row pays when its target is met.
    pub base_reward: Option<f64>,
    /// Whether the row declared any per-step columns.
    pub has_step_columns: bool,
}

impl AwardRule {
    pub fn group_key(&self) -> AwardGroupKey {
        AwardGroupKey {
            company: self.company.clone(),
            award_name: self.award_name.clone(),
            award_type: self.award_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AwardGroupKey {
    pub company: String,
    pub award_name: String,
    pub award_type: AwardType,
}

/// Multi-period rows loaded from a dedicated consecutive-award sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsecutivePeriodRow {
    pub company: String,
    pub award_name: String,
    pub period: PeriodRule,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsecutiveRuleSet {
    pub rows: Vec<ConsecutivePeriodRow>,
}

impl ConsecutiveRuleSet {
    pub fn new(rows: Vec<ConsecutivePeriodRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// How much trust a caller can put in a heuristic step of the calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    #[default]
    Exact,
    Heuristic,
}

impl MatchConfidence {
    pub fn combine(self, other: Self) -> Self {
        self.max(other)
    }
}

/// Named fallback branches of the consecutive evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackBranch {
    NoPeriodStructure,
    ZeroConsecutivePayout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTarget {
    pub target: f64,
    pub reward: f64,
    pub prev_period_condition: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBreakdown {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub performance: f64,
    pub achieved_target: f64,
    pub candidate_targets: Vec<CandidateTarget>,
}

/// Outcome of one (agent, award rule or group) evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardResult {
    pub agent_id: String,
    pub rule_id: String,
    pub company: String,
    pub award_name: String,
    pub award_type: AwardType,
    pub comparison_group: Option<String>,
    pub product_scope: String,
    pub rule_start: Option<NaiveDate>,
    pub rule_end: Option<NaiveDate>,
    pub tier_target: f64,
    pub base_reward: f64,
    pub tiers: Vec<Tier>,
    pub rate_percent: Option<f64>,
    pub performance_amount: f64,
    pub raw_payout: f64,
    pub expected_payout: f64,
    pub final_payout: f64,
    pub is_payout_due: bool,
    pub achievement_rate: f64,
    pub next_target: Option<f64>,
    pub shortfall_amount: f64,
    pub achieved_tier_index: Option<usize>,
    pub period_breakdown: BTreeMap<u32, PeriodBreakdown>,
    pub evidence_contracts: Vec<usize>,
    pub is_selected: bool,
    pub confidence: MatchConfidence,
    pub fallback: Option<FallbackBranch>,
    pub error: Option<String>,
}

impl AwardResult {
    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }

    /// Highest reward on the evaluated ladder whose target the performance meets.
    pub fn current_tier_reward(&self) -> f64 {
        self.tiers
            .iter()
            .filter(|tier| tier.target <= self.performance_amount)
            .map(|tier| tier.reward)
            .fold(0.0, f64::max)
    }
}

/// Reference to one award inside a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardRef {
    pub agent_id: String,
    pub company: String,
    pub award_name: String,
    pub product_scope: String,
    pub analysis_period: Option<NaiveDate>,
    pub performance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecommendation {
    pub saturated_ref: AwardRef,
    pub opportunity_ref: AwardRef,
    pub transferable_surplus: f64,
    pub marginal_gain: f64,
    pub target_tier: Tier,
    pub current_reward: f64,
    pub optimized_reward: f64,
    pub gap_to_target: f64,
    pub reaches_top_tier: bool,
}

impl OptimizationRecommendation {
    pub fn message(&self) -> String {
        format!(
            "{} surplus of {:.0} can lift {} '{}' to the {:.0} tier (+{:.0})",
            self.saturated_ref.company,
            self.transferable_surplus,
            self.opportunity_ref.company,
            self.opportunity_ref.award_name,
            self.target_tier.target,
            self.marginal_gain
        )
    }
}
