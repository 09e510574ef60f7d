use super::aliases::{ColumnMap, RuleField, MAX_STEPS};
use super::cells::{non_empty, parse_amount, parse_date, parse_index};
use crate::workflows::incentives::domain::{
    AwardRule, AwardType, ConsecutivePeriodRow, ConsecutiveRuleSet, PeriodRule, ProductFilter,
    Tier,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One spreadsheet row as header → cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRuleRow(pub BTreeMap<String, String>);

impl RawRuleRow {
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.0.get(header).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    MissingCompany,
    MissingAwardName,
    UnknownAwardType(String),
    MissingPeriodIndex,
    MissingTarget,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingCompany => f.write_str("company is missing"),
            SkipReason::MissingAwardName => f.write_str("award name is missing"),
            SkipReason::UnknownAwardType(raw) if raw.is_empty() => {
                f.write_str("award type is missing")
            }
            SkipReason::UnknownAwardType(raw) => write!(f, "unknown award type '{raw}'"),
            SkipReason::MissingPeriodIndex => f.write_str("period index is missing"),
            SkipReason::MissingTarget => f.write_str("target is missing"),
        }
    }
}

/// A row the normalizer left out, with its 1-based position in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedRules {
    pub rules: Vec<AwardRule>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedConsecutiveRules {
    pub rule_set: ConsecutiveRuleSet,
    pub skipped: Vec<SkippedRow>,
}

/// Turns raw rule rows into canonical [`AwardRule`]s.
pub struct RuleNormalizer;

impl RuleNormalizer {
    pub fn normalize_rules(rows: &[RawRuleRow]) -> NormalizedRules {
        let columns = ColumnMap::resolve(rows.iter().flat_map(|row| row.0.keys()));
        let mut normalized = NormalizedRules::default();

        for (position, row) in rows.iter().enumerate() {
            let view = RowView {
                row,
                columns: &columns,
            };
            match normalize_rule_row(&view, position + 1) {
                Ok(rule) => normalized.rules.push(rule),
                Err(reason) => {
                    tracing::debug!(row = position + 1, %reason, "skipping rule row");
                    normalized.skipped.push(SkippedRow {
                        row: position + 1,
                        reason,
                    });
                }
            }
        }

        normalized
    }

    pub fn normalize_consecutive(rows: &[RawRuleRow]) -> NormalizedConsecutiveRules {
        let columns = ColumnMap::resolve(rows.iter().flat_map(|row| row.0.keys()));
        let mut normalized = NormalizedConsecutiveRules::default();

        for (position, row) in rows.iter().enumerate() {
            let view = RowView {
                row,
                columns: &columns,
            };
            match normalize_consecutive_row(&view) {
                Ok(period_row) => normalized.rule_set.rows.push(period_row),
                Err(reason) => {
                    tracing::debug!(row = position + 1, %reason, "skipping consecutive rule row");
                    normalized.skipped.push(SkippedRow {
                        row: position + 1,
                        reason,
                    });
                }
            }
        }

        normalized
    }
}

struct RowView<'a> {
    row: &'a RawRuleRow,
    columns: &'a ColumnMap,
}

impl RowView<'_> {
    fn text(&self, field: RuleField) -> Option<String> {
        self.columns
            .headers(field)
            .filter_map(|header| self.row.get(header))
            .find_map(non_empty)
    }

    fn amount(&self, field: RuleField) -> Option<f64> {
        self.columns
            .headers(field)
            .filter_map(|header| self.row.get(header))
            .find_map(parse_amount)
    }

    fn date(&self, field: RuleField) -> Option<NaiveDate> {
        self.columns
            .headers(field)
            .filter_map(|header| self.row.get(header))
            .find_map(parse_date)
    }

    fn period_index(&self) -> Option<u32> {
        self.columns
            .headers(RuleField::PeriodIndex)
            .filter_map(|header| self.row.get(header))
            .find_map(parse_index)
    }

    fn step_tiers(&self) -> Vec<Tier> {
        (1..=MAX_STEPS)
            .filter_map(|step| {
                let target = self.amount(RuleField::StepTarget(step))?;
                let reward = self.amount(RuleField::StepReward(step))?;
                (target > 0.0).then_some(Tier { target, reward })
            })
            .collect()
    }

    fn declares_steps(&self) -> bool {
        (1..=MAX_STEPS).any(|step| {
            self.amount(RuleField::StepTarget(step)).is_some()
                || self.amount(RuleField::StepReward(step)).is_some()
        })
    }

    /// Row target, or the first positive step target when the row leaves it
    /// blank or zero.
    fn filled_target(&self) -> Option<f64> {
        positive_or_else(self.amount(RuleField::Target), || {
            self.first_positive_step(RuleField::StepTarget)
        })
    }

    fn filled_reward(&self) -> Option<f64> {
        positive_or_else(self.amount(RuleField::Reward), || {
            self.first_positive_step(RuleField::StepReward)
        })
    }

    fn first_positive_step(&self, field: fn(u8) -> RuleField) -> Option<f64> {
        (1..=MAX_STEPS)
            .filter_map(|step| self.amount(field(step)))
            .find(|value| *value > 0.0)
    }

    /// A period needs a target. Its reward falls back to the first step
    /// reward given, then to zero.
    fn period(&self, period_index: u32) -> Result<PeriodRule, SkipReason> {
        let target = self.filled_target().ok_or(SkipReason::MissingTarget)?;
        let reward = self
            .filled_reward()
            .or_else(|| (1..=MAX_STEPS).find_map(|step| self.amount(RuleField::StepReward(step))))
            .unwrap_or_default();
        Ok(PeriodRule {
            period_index,
            start: self.date(RuleField::Start),
            end: self.date(RuleField::End),
            target,
            reward,
            prev_period_condition: self.amount(RuleField::PrevPeriodCondition),
        })
    }
}

fn positive_or_else(value: Option<f64>, fallback: impl FnOnce() -> Option<f64>) -> Option<f64> {
    match value {
        Some(value) if value > 0.0 => Some(value),
        other => fallback().or(other),
    }
}

fn normalize_rule_row(view: &RowView<'_>, row_number: usize) -> Result<AwardRule, SkipReason> {
    let company = view.text(RuleField::Company).ok_or(SkipReason::MissingCompany)?;
    let award_name = view
        .text(RuleField::AwardName)
        .ok_or(SkipReason::MissingAwardName)?;
    let raw_type = view.text(RuleField::AwardType).unwrap_or_default();
    let award_type =
        AwardType::parse(&raw_type).ok_or_else(|| SkipReason::UnknownAwardType(raw_type.clone()))?;

    let base_target = view.amount(RuleField::Target);
    let base_reward = view.amount(RuleField::Reward);

    let mut tiers = view.step_tiers();
    if let (Some(target), Some(reward)) = (base_target, base_reward) {
        if target > 0.0 {
            tiers.push(Tier { target, reward });
        }
    }

    let consecutive_periods = match (award_type, view.period_index()) {
        (AwardType::Consecutive, Some(index)) => view.period(index).map(|period| vec![period])?,
        _ => Vec::new(),
    };

    Ok(AwardRule {
        id: view
            .text(RuleField::Id)
            .unwrap_or_else(|| format!("{company}/{award_name}/{row_number}")),
        product_filter: product_filter(view),
        comparison_group: view.text(RuleField::ComparisonGroup),
        rule_start: view.date(RuleField::Start),
        rule_end: view.date(RuleField::End),
        rate_percent: view.amount(RuleField::RatePercent),
        has_step_columns: view.declares_steps(),
        company,
        award_name,
        award_type,
        tiers,
        consecutive_periods,
        base_target,
        base_reward,
    })
}

fn normalize_consecutive_row(view: &RowView<'_>) -> Result<ConsecutivePeriodRow, SkipReason> {
    let award_name = view
        .text(RuleField::AwardName)
        .ok_or(SkipReason::MissingAwardName)?;
    let period_index = view.period_index().ok_or(SkipReason::MissingPeriodIndex)?;

    Ok(ConsecutivePeriodRow {
        company: view.text(RuleField::Company).unwrap_or_default(),
        award_name,
        period: view.period(period_index)?,
    })
}

fn product_filter(view: &RowView<'_>) -> ProductFilter {
    if let Some(products) = view.text(RuleField::IncludedProducts) {
        let keywords: Vec<String> = products
            .split('|')
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
            .map(str::to_string)
            .collect();
        if !keywords.is_empty() {
            return ProductFilter::Keywords(keywords);
        }
    }

    view.text(RuleField::ProductCategory)
        .map(ProductFilter::Category)
        .unwrap_or(ProductFilter::All)
}
