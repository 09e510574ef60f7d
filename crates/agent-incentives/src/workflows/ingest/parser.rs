use super::normalizer::normalize_header;
use std::collections::BTreeMap;
use std::io::Read;

/// Reads a headed CSV into one header → cell map per row. Headers are
/// cleaned of byte order marks; cells are trimmed.
pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<BTreeMap<String, String>>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let row: BTreeMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header.clone(), cell.to_string()))
            .collect();
        if row.values().all(|cell| cell.is_empty()) {
            continue;
        }
        rows.push(row);
    }

    Ok(rows)
}
