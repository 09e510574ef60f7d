use crate::workflows::incentives::matching::normalize_key;
use std::collections::HashMap;
use std::sync::OnceLock;

pub(crate) const MAX_STEPS: u8 = 9;

/// Canonical rule field a sheet header maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RuleField {
    Id,
    Company,
    AwardName,
    AwardType,
    IncludedProducts,
    ProductCategory,
    ComparisonGroup,
    Start,
    End,
    RatePercent,
    Target,
    Reward,
    PeriodIndex,
    PrevPeriodCondition,
    StepTarget(u8),
    StepReward(u8),
}

const FIELD_ALIASES: &[(RuleField, &[&str])] = &[
    (RuleField::Id, &["시상ID", "rule_id", "id"]),
    (RuleField::Company, &["회사", "원수사", "보험사", "제휴사", "company"]),
    (RuleField::AwardName, &["시상명", "최종시상명", "award_name", "award"]),
    (RuleField::AwardType, &["유형", "시상유형", "award_type", "type"]),
    (
        RuleField::IncludedProducts,
        &["포함상품", "대상상품", "included_products", "products"],
    ),
    (
        RuleField::ProductCategory,
        &["상품구분", "상품 구분", "상품종류", "product_category", "category"],
    ),
    (
        RuleField::ComparisonGroup,
        &["비교시상", "비교 시상", "comparison_group"],
    ),
    (RuleField::Start, &["시작일", "rule_start", "start_date", "start"]),
    (RuleField::End, &["종료일", "rule_end", "end_date", "end"]),
    (RuleField::RatePercent, &["지급률", "지급률(%)", "rate_percent", "rate"]),
    (RuleField::Target, &["목표실적", "목표", "target"]),
    (RuleField::Reward, &["보상금액", "보상", "reward"]),
    (
        RuleField::PeriodIndex,
        &["구간번호", "연속단계", "period_index", "period"],
    ),
    (
        RuleField::PrevPeriodCondition,
        &["이전구간조건", "직전구간조건", "prev_period_condition"],
    ),
];

struct AliasTable {
    exact: HashMap<&'static str, (RuleField, usize)>,
    normalized: HashMap<String, (RuleField, usize)>,
}

static ALIAS_TABLE: OnceLock<AliasTable> = OnceLock::new();

fn alias_table() -> &'static AliasTable {
    ALIAS_TABLE.get_or_init(|| {
        let mut exact = HashMap::new();
        let mut normalized = HashMap::new();
        for (field, aliases) in FIELD_ALIASES {
            for (priority, alias) in aliases.iter().enumerate() {
                exact.entry(*alias).or_insert((*field, priority));
                normalized
                    .entry(normalize_key(alias))
                    .or_insert((*field, priority));
            }
        }
        AliasTable { exact, normalized }
    })
}

/// Resolves one header to its canonical field and the alias priority within
/// that field (lower wins).
pub(crate) fn resolve_header(header: &str) -> Option<(RuleField, usize)> {
    let table = alias_table();
    if let Some(hit) = table.exact.get(header.trim()) {
        return Some(*hit);
    }

    let key = normalize_key(header);
    if let Some(hit) = table.normalized.get(&key) {
        return Some(*hit);
    }

    step_field(&key).map(|field| (field, 0))
}

/// `1단계목표`, `2단계보상`, `step3_target`, `step3reward`.
fn step_field(key: &str) -> Option<RuleField> {
    if let Some(rest) = key.strip_prefix("step") {
        let (digits, suffix) = split_step_number(rest)?;
        return match suffix {
            "target" => Some(RuleField::StepTarget(digits)),
            "reward" => Some(RuleField::StepReward(digits)),
            _ => None,
        };
    }

    let (digits, suffix) = split_step_number(key)?;
    match suffix {
        "단계목표" => Some(RuleField::StepTarget(digits)),
        "단계보상" => Some(RuleField::StepReward(digits)),
        _ => None,
    }
}

fn split_step_number(value: &str) -> Option<(u8, &str)> {
    let first = value.chars().next()?;
    let step = first.to_digit(10)? as u8;
    if !(1..=MAX_STEPS).contains(&step) {
        return None;
    }
    let rest = &value[first.len_utf8()..];
    if rest.starts_with(|ch: char| ch.is_ascii_digit()) {
        return None;
    }
    Some((step, rest))
}

/// Header positions per canonical field, ordered by alias priority.
#[derive(Debug, Default)]
pub(crate) struct ColumnMap {
    columns: HashMap<RuleField, Vec<(usize, String)>>,
}

impl ColumnMap {
    pub(crate) fn resolve<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut columns: HashMap<RuleField, Vec<(usize, String)>> = HashMap::new();
        for header in headers {
            if let Some((field, priority)) = resolve_header(header) {
                columns
                    .entry(field)
                    .or_default()
                    .push((priority, header.clone()));
            }
        }
        for headers in columns.values_mut() {
            headers.sort();
            headers.dedup();
        }
        Self { columns }
    }

    /// Source headers for a field, best alias first.
    pub(crate) fn headers(&self, field: RuleField) -> impl Iterator<Item = &str> + '_ {
        self.columns
            .get(&field)
            .into_iter()
            .flatten()
            .map(|(_, header)| header.as_str())
    }

    pub(crate) fn has_steps(&self) -> bool {
        self.columns
            .keys()
            .any(|field| matches!(field, RuleField::StepTarget(_) | RuleField::StepReward(_)))
    }
}
