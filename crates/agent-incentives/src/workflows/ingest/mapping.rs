use super::normalizer::{compact, normalize_header};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Contract sheet columns the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ContractField {
    Date,
    Company,
    ProductName,
    Category,
    ProductKind,
    ContractKind,
    Premium,
    Agent,
    Policyholder,
}

static CONTRACT_HEADER_MAP: OnceLock<HashMap<String, (ContractField, usize)>> = OnceLock::new();

/// Canonical field and alias priority (lower wins) for a contract header.
pub(crate) fn contract_field(header: &str) -> Option<(ContractField, usize)> {
    contract_header_map()
        .get(&normalize_header(header).to_lowercase())
        .copied()
}

pub(crate) fn is_company_header(header: &str) -> bool {
    matches!(contract_field(header), Some((ContractField::Company, _)))
}

fn contract_header_map() -> &'static HashMap<String, (ContractField, usize)> {
    CONTRACT_HEADER_MAP.get_or_init(|| {
        const HEADER_TO_FIELD: &[(ContractField, &[&str])] = &[
            (
                ContractField::Date,
                &["접수일", "계약일자", "접수일자", "일자", "date"],
            ),
            (
                ContractField::Company,
                &["회사", "원수사", "보험사", "제휴사", "company"],
            ),
            (ContractField::ProductName, &["상품명", "product_name"]),
            (ContractField::Category, &["분류", "product_category"]),
            (ContractField::ProductKind, &["상품종류", "product_kind"]),
            (ContractField::ContractKind, &["계약종류", "contract_kind"]),
            (ContractField::Premium, &["보험료", "premium", "premium_amount"]),
            (
                ContractField::Agent,
                &["모집인명", "설계사", "사원명", "agent_id", "agent"],
            ),
            (
                ContractField::Policyholder,
                &["계약자", "policyholder_id", "policyholder"],
            ),
        ];

        let mut map = HashMap::new();
        for (field, headers) in HEADER_TO_FIELD {
            for (priority, header) in headers.iter().enumerate() {
                map.insert(normalize_header(header).to_lowercase(), (*field, priority));
            }
        }
        map
    })
}

const COMPANY_KEYWORDS: &[(&str, &str)] = &[
    ("KB", "KB손해보험"),
    ("삼성", "삼성화재"),
    ("메리츠", "메리츠화재"),
    ("현대", "현대해상"),
    ("한화", "한화손해보험"),
    ("흥국", "흥국화재"),
    ("DB", "DB손해보험"),
    ("롯데", "롯데손해보험"),
];

/// Maps insurer spellings (`KB손보`, `삼성 화재`, ...) onto one canonical
/// name. Unknown names come back with spaces and underscores removed.
pub fn standardize_company(name: &str) -> String {
    let cleaned = compact(name);
    COMPANY_KEYWORDS
        .iter()
        .find(|(keyword, _)| cleaned.contains(keyword))
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(cleaned)
}

/// Insurer named inside a product name, for sheets without a company column.
pub(crate) fn company_from_product(product_name: &str) -> Option<&'static str> {
    COMPANY_KEYWORDS
        .iter()
        .find(|(keyword, _)| product_name.contains(keyword))
        .map(|(_, canonical)| *canonical)
}
