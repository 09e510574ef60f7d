use agent_incentives::error::AppError;
use agent_incentives::workflows::incentives::report::{
    summarize_awards, summarize_company, AwardSummary, CompanySummary,
};
use agent_incentives::workflows::incentives::{
    AwardResult, CalculationQuery, CalculationRun, ConsecutiveRuleSet, ContractRecord,
    IncentiveEngine, OptimizationRecommendation,
};
use agent_incentives::workflows::ingest::{
    standardize_company, ContractImporter, ImportStats, RuleImporter,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Read;

/// Rows the rule normalizers left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct RuleImportStats {
    pub(crate) rules: usize,
    pub(crate) skipped_rules: usize,
    pub(crate) consecutive_rows: usize,
    pub(crate) skipped_consecutive_rows: usize,
}

/// Everything one calculation produced, shared by the CLI and the HTTP API.
#[derive(Debug, Serialize)]
pub(crate) struct CalculationOutcome {
    pub(crate) period_start: NaiveDate,
    pub(crate) period_end: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) company_filter: Option<String>,
    pub(crate) contract_import: ImportStats,
    pub(crate) rule_import: RuleImportStats,
    pub(crate) summary: AwardSummary,
    pub(crate) company_summary: CompanySummary,
    pub(crate) results: Vec<AwardResult>,
    pub(crate) recommendations: Vec<OptimizationRecommendation>,
    #[serde(skip)]
    pub(crate) contracts: Vec<ContractRecord>,
}

impl CalculationOutcome {
    /// Narrows the outcome to one agent. Summaries are recomputed.
    pub(crate) fn retain_agent(&mut self, agent_id: &str) {
        self.results.retain(|result| result.agent_id == agent_id);
        self.recommendations
            .retain(|recommendation| recommendation.saturated_ref.agent_id == agent_id);
        self.contracts.retain(|contract| contract.agent_id == agent_id);
        self.summary = summarize_awards(&self.results);
        self.company_summary = summarize_company(&self.results);
    }

    pub(crate) fn agents(&self) -> BTreeSet<&str> {
        self.results
            .iter()
            .map(|result| result.agent_id.as_str())
            .collect()
    }
}

pub(crate) fn calculate_from_csv<C, R, S>(
    engine: &IncentiveEngine,
    contracts: C,
    rules: R,
    consecutive_rules: Option<S>,
    period_start: NaiveDate,
    period_end: NaiveDate,
    company_filter: Option<&str>,
) -> Result<CalculationOutcome, AppError>
where
    C: Read,
    R: Read,
    S: Read,
{
    let contract_import = ContractImporter::from_reader(contracts)?;
    let normalized = RuleImporter::rules_from_reader(rules)?;
    let mut rule_import = RuleImportStats {
        rules: normalized.rules.len(),
        skipped_rules: normalized.skipped.len(),
        ..RuleImportStats::default()
    };
    let consecutive = match consecutive_rules {
        Some(reader) => {
            let normalized = RuleImporter::consecutive_from_reader(reader)?;
            rule_import.consecutive_rows = normalized.rule_set.rows.len();
            rule_import.skipped_consecutive_rows = normalized.skipped.len();
            normalized.rule_set
        }
        None => ConsecutiveRuleSet::default(),
    };

    let company_filter = company_filter.map(standardize_company);
    let mut query = CalculationQuery::new(period_start, period_end);
    if let Some(company) = &company_filter {
        query = query.with_company_filter(company.clone());
    }

    let CalculationRun {
        results,
        recommendations,
    } = engine.calculate(
        &contract_import.contracts,
        &normalized.rules,
        &consecutive,
        &query,
    )?;
    tracing::info!(
        contracts = contract_import.stats.imported,
        rules = rule_import.rules,
        results = results.len(),
        recommendations = recommendations.len(),
        "calculation complete"
    );

    Ok(CalculationOutcome {
        period_start,
        period_end,
        company_filter,
        contract_import: contract_import.stats,
        rule_import,
        summary: summarize_awards(&results),
        company_summary: summarize_company(&results),
        results,
        recommendations,
        contracts: contract_import.contracts,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub(crate) const CONTRACTS_CSV: &str = "\
접수일,원수사,상품명,보험료,모집인명,계약자
2025-03-05,KB손보,무배당 건강보험,100000,kim,cust-1
2025-03-06,삼성 화재,간편 건강보험,500000,kim,cust-2
2025-03-07,KB손보,간편 건강보험,40000,lee,cust-3
";

    pub(crate) const RULES_CSV: &str = "\
회사,시상명,유형,지급률,시작일,종료일
KB손해보험,3월 정률,정률형,10,2025-03-01,2025-03-31
";
}
