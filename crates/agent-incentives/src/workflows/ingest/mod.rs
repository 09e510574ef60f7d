//! CSV adapters feeding contract and rule sheets into the incentive engine.

mod mapping;
mod normalizer;
mod parser;

pub use mapping::standardize_company;

use crate::workflows::incentives::rules::{parse_amount, parse_date};
use crate::workflows::incentives::{
    ContractRecord, NormalizedConsecutiveRules, NormalizedRules, RawRuleRow, RuleNormalizer,
};
use mapping::{company_from_product, contract_field, is_company_header, ContractField};
use normalizer::{classify_product, ProductDescriptor};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

const UNKNOWN_COMPANY: &str = "기타보험사";

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read input file: {}", err),
            ImportError::Csv(err) => write!(f, "invalid CSV data: {}", err),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Row accounting for one contract import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub rows_read: usize,
    pub imported: usize,
    pub missing_date: usize,
    pub non_positive_premium: usize,
    pub self_contracts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContractImport {
    pub contracts: Vec<ContractRecord>,
    pub stats: ImportStats,
}

pub struct ContractImporter;

impl ContractImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ContractImport, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<ContractImport, ImportError> {
        let rows = parser::parse_rows(reader)?;
        let mut import = ContractImport::default();

        for row in &rows {
            import.stats.rows_read += 1;
            let cells = ContractCells::resolve(row);

            let Some(date) = cells.get(ContractField::Date).and_then(parse_date) else {
                import.stats.missing_date += 1;
                continue;
            };
            let premium_amount = cells
                .get(ContractField::Premium)
                .and_then(parse_amount)
                .unwrap_or_default();
            if premium_amount <= 0.0 {
                import.stats.non_positive_premium += 1;
                continue;
            }

            let product_name = cells.get(ContractField::ProductName).unwrap_or_default();
            let agent_id = cells.get(ContractField::Agent).unwrap_or_default();
            let policyholder_id = cells.get(ContractField::Policyholder).unwrap_or_default();
            if !agent_id.is_empty() && agent_id == policyholder_id {
                import.stats.self_contracts += 1;
            }

            let company = match cells.get(ContractField::Company) {
                Some(company) => standardize_company(company),
                None => company_from_product(product_name)
                    .unwrap_or(UNKNOWN_COMPANY)
                    .to_string(),
            };
            let product_category = match cells.get(ContractField::Category) {
                Some(category) => category.to_string(),
                None => classify_product(&ProductDescriptor {
                    product_name,
                    product_kind: cells.get(ContractField::ProductKind).unwrap_or_default(),
                    contract_kind: cells.get(ContractField::ContractKind).unwrap_or_default(),
                    agent: agent_id,
                    policyholder: policyholder_id,
                })
                .to_string(),
            };

            import.contracts.push(ContractRecord {
                date,
                company,
                product_name: product_name.to_string(),
                product_category,
                premium_amount,
                agent_id: agent_id.to_string(),
                policyholder_id: policyholder_id.to_string(),
            });
        }

        import.stats.imported = import.contracts.len();
        tracing::info!(
            rows = import.stats.rows_read,
            imported = import.stats.imported,
            missing_date = import.stats.missing_date,
            non_positive_premium = import.stats.non_positive_premium,
            "contracts imported"
        );
        Ok(import)
    }
}

/// Non-empty cells of one contract row, keyed by field; the best-ranked
/// alias wins when a sheet carries several.
struct ContractCells<'a> {
    cells: HashMap<ContractField, (usize, &'a str)>,
}

impl<'a> ContractCells<'a> {
    fn resolve(row: &'a BTreeMap<String, String>) -> Self {
        let mut cells: HashMap<ContractField, (usize, &'a str)> = HashMap::new();
        for (header, cell) in row {
            let Some((field, priority)) = contract_field(header) else {
                continue;
            };
            if cell.trim().is_empty() {
                continue;
            }
            let entry = cells.entry(field).or_insert((priority, cell.as_str()));
            if priority < entry.0 {
                *entry = (priority, cell.as_str());
            }
        }
        Self { cells }
    }

    fn get(&self, field: ContractField) -> Option<&'a str> {
        self.cells.get(&field).map(|(_, cell)| *cell).map(str::trim)
    }
}

/// Reads rule sheets as raw rows for [`RuleNormalizer`].
pub struct RuleImporter;

impl RuleImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawRuleRow>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Company cells are standardized the same way contract companies are.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<RawRuleRow>, ImportError> {
        let rows = parser::parse_rows(reader)?
            .into_iter()
            .map(|mut row| {
                for (header, cell) in row.iter_mut() {
                    if is_company_header(header) && !cell.is_empty() {
                        *cell = standardize_company(cell);
                    }
                }
                RawRuleRow(row)
            })
            .collect();
        Ok(rows)
    }

    pub fn rules_from_reader<R: Read>(reader: R) -> Result<NormalizedRules, ImportError> {
        let normalized = RuleNormalizer::normalize_rules(&Self::from_reader(reader)?);
        if !normalized.skipped.is_empty() {
            tracing::warn!(skipped = normalized.skipped.len(), "rule rows skipped");
        }
        Ok(normalized)
    }

    pub fn consecutive_from_reader<R: Read>(
        reader: R,
    ) -> Result<NormalizedConsecutiveRules, ImportError> {
        let normalized = RuleNormalizer::normalize_consecutive(&Self::from_reader(reader)?);
        if !normalized.skipped.is_empty() {
            tracing::warn!(
                skipped = normalized.skipped.len(),
                "consecutive rule rows skipped"
            );
        }
        Ok(normalized)
    }
}
