use super::domain::{ContractRecord, ContractRef, ProductFilter};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Product-name keywords standing in for a category when a contract was
/// never classified upstream.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("인보험", &["인", "생명", "상해", "질병", "암", "건강"]),
    ("펫보험", &["펫", "애완", "반려"]),
    ("재물보험", &["재물", "화재", "재산", "건물"]),
    ("단체보험", &["단체"]),
    ("실손보험", &["실손"]),
    ("자동차보험", &["자동차"]),
    ("본인계약", &[]),
];

impl ProductFilter {
    pub fn matches(&self, contract: &ContractRecord) -> bool {
        match self {
            ProductFilter::All => true,
            ProductFilter::Keywords(keywords) => keywords
                .iter()
                .any(|keyword| contract.product_name.contains(keyword.as_str())),
            ProductFilter::Category(category) => {
                let tagged = contract.product_category.trim();
                if !tagged.is_empty() {
                    return tagged == category.trim();
                }
                category_keywords_match(category.trim(), &contract.product_name)
            }
        }
    }
}

fn category_keywords_match(category: &str, product_name: &str) -> bool {
    match CATEGORY_KEYWORDS.iter().find(|(name, _)| *name == category) {
        Some((_, keywords)) => keywords.iter().any(|keyword| product_name.contains(keyword)),
        None => product_name.contains(category),
    }
}

/// Inclusive date range; an open bound accepts every date on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn closed(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }

    pub fn overlaps(&self, other: &DateWindow) -> bool {
        let starts_before_other_ends = match (self.start, other.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        };
        let ends_after_other_starts = match (self.end, other.start) {
            (Some(end), Some(start)) => end >= start,
            _ => true,
        };
        starts_before_other_ends && ends_after_other_starts
    }
}

pub(crate) fn within_window<'a>(
    contracts: &[ContractRef<'a>],
    window: &DateWindow,
) -> Vec<ContractRef<'a>> {
    contracts
        .iter()
        .filter(|contract| window.contains(contract.record.date))
        .copied()
        .collect()
}

pub(crate) fn for_products<'a>(
    contracts: &[ContractRef<'a>],
    filter: &ProductFilter,
) -> Vec<ContractRef<'a>> {
    contracts
        .iter()
        .filter(|contract| filter.matches(contract.record))
        .copied()
        .collect()
}

pub(crate) fn for_company<'a>(contracts: &[ContractRef<'a>], company: &str) -> Vec<ContractRef<'a>> {
    contracts
        .iter()
        .filter(|contract| contract.record.company == company)
        .copied()
        .collect()
}
