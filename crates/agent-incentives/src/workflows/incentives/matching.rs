//! Loose name matching for cross-referencing award and company names typed
//! by hand in different sheets (`KB손보` vs `KB 손해보험`, `연속_시상` vs
//! `연속시상`).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Containment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NameCandidate {
    pub index: usize,
    pub kind: MatchKind,
}

pub fn normalize_key(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_ascii_punctuation() && *ch != '\u{feff}')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Compares two names after normalization. Empty names never match.
pub fn match_names(left: &str, right: &str) -> Option<MatchKind> {
    let left = normalize_key(left);
    let right = normalize_key(right);
    if left.is_empty() || right.is_empty() {
        return None;
    }

    if left == right {
        Some(MatchKind::Exact)
    } else if left.contains(&right) || right.contains(&left) {
        Some(MatchKind::Containment)
    } else {
        None
    }
}

/// Ranks every matching candidate: exact matches first, then containment,
/// input order within each kind.
pub fn rank_candidates<'a, I>(needle: &str, haystack: I) -> Vec<NameCandidate>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidates: Vec<NameCandidate> = haystack
        .into_iter()
        .enumerate()
        .filter_map(|(index, name)| {
            match_names(needle, name).map(|kind| NameCandidate { index, kind })
        })
        .collect();
    candidates.sort_by_key(|candidate| candidate.kind);
    candidates
}
