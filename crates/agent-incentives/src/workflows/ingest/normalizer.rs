pub(crate) fn normalize_header(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cell text with every space and underscore removed.
pub(crate) fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '_')
        .collect()
}

/// Fields the category classifier looks at.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ProductDescriptor<'a> {
    pub(crate) product_name: &'a str,
    pub(crate) product_kind: &'a str,
    pub(crate) contract_kind: &'a str,
    pub(crate) agent: &'a str,
    pub(crate) policyholder: &'a str,
}

/// Assigns a product category from product keywords. Checks run in a fixed
/// order; `화재` is consulted late because insurer names contain it.
pub(crate) fn classify_product(descriptor: &ProductDescriptor<'_>) -> &'static str {
    let name = compact(descriptor.product_name);
    let kind = compact(descriptor.product_kind);
    let contract_kind = compact(descriptor.contract_kind);
    let agent = descriptor.agent.trim();
    let policyholder = descriptor.policyholder.trim();

    if !agent.is_empty() && agent == policyholder {
        return "본인계약";
    }
    if name.contains('펫') || kind.contains('펫') {
        return "펫보험";
    }
    if name.contains("실손") || kind.contains("실손") {
        return "실손보험";
    }
    if [&name, &kind, &contract_kind]
        .iter()
        .any(|value| value.contains("자동차"))
    {
        return "자동차보험";
    }
    if name.contains("단체") || kind.contains("단체") {
        return "단체보험";
    }
    if kind.contains("보장성") {
        return "인보험";
    }
    if kind.contains("재물성") || ["재산", "배상"].iter().any(|keyword| name.contains(keyword)) {
        return "재물보험";
    }
    if name.contains("화재") {
        return "재물보험";
    }
    if ["건강", "암", "상해", "질병", "종신", "생명"]
        .iter()
        .any(|keyword| name.contains(keyword))
    {
        return "인보험";
    }
    "기타"
}
