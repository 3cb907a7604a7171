//! Consensus Extractor: four independent detectors per
//! critical field, voted into a [`ConsensusResult`].

mod amount;
mod date;
mod vendor;

pub use date::normalize_date;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const HEADER_ZONE_LINES_PERCENT: f64 = 0.15;
pub const HEADER_ZONE_MIN_LINES: usize = 5;
pub const FOOTER_ZONE_LINES_PERCENT: f64 = 0.80;

pub const SUBTOTAL_KEYWORDS: &[&str] = &["subtotal", "sub total", "sub-total"];
pub const TOTAL_KEYWORDS: &[&str] = &[
    "grand total",
    "net total",
    "amount due",
    "balance due",
    "total",
    "balance",
    "payable",
    "pay",
    "sum",
    "gross",
];

/// One candidate value proposed by one detector for one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorResult {
    pub detector_name: String,
    pub value: Option<String>,
    pub confidence: f64,
    pub evidence: String,
    pub line: Option<usize>,
}

impl DetectorResult {
    #[cfg(test)]
    fn empty(name: &str) -> Self {
        DetectorResult {
            detector_name: name.to_string(),
            value: None,
            confidence: 0.0,
            evidence: String::new(),
            line: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusLevel {
    Strong,
    Moderate,
    Weak,
    None,
}

impl ConsensusLevel {
    /// `level` is a pure function of `(agreement_count, total_detectors)`.
    pub fn from_counts(agreement_count: usize, _total_detectors: usize) -> Self {
        match agreement_count {
            0 => ConsensusLevel::None,
            1 => ConsensusLevel::Weak,
            2 => ConsensusLevel::Moderate,
            _ => ConsensusLevel::Strong,
        }
    }

    pub fn needs_confirmation(self) -> bool {
        matches!(self, ConsensusLevel::Weak | ConsensusLevel::None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub field_name: String,
    pub final_value: Option<String>,
    pub level: ConsensusLevel,
    pub agreement_count: usize,
    pub total_detectors: usize,
    pub detector_results: Vec<DetectorResult>,
    pub agreeing_detectors: Vec<String>,
    pub dissenting_detectors: Vec<String>,
    /// (value, votes), descending by votes.
    pub all_candidates: Vec<(String, usize)>,
    pub needs_confirmation: bool,
    pub confirmation_reason: Option<String>,
}

/// Normalizes a raw detector value for vote comparison: decimals rounded to
/// 2 places, strings trimmed and lowercased, dates already canonical.
fn normalize_for_vote(field_name: &str, raw: &str) -> String {
    if field_name == "total_amount" {
        if let Ok(v) = raw.replace(',', "").parse::<f64>() {
            return format!("{:.2}", v);
        }
    }
    raw.trim().to_lowercase()
}

/// Builds a [`ConsensusResult`] by voting the four detector outputs for one field.
fn build_consensus(field_name: &str, results: Vec<DetectorResult>) -> ConsensusResult {
    let total_detectors = results.len();
    let mut votes: HashMap<String, (usize, String)> = HashMap::new();
    // Insertion order preserved so ties break by first-detector-to-propose.
    let mut order: Vec<String> = Vec::new();

    for r in &results {
        if let Some(v) = &r.value {
            let key = normalize_for_vote(field_name, v);
            let entry = votes.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                (0, v.clone())
            });
            entry.0 += 1;
        }
    }

    let mut all_candidates: Vec<(String, usize)> = order
        .into_iter()
        .map(|k| {
            let (count, original) = votes.get(&k).unwrap().clone();
            (original, count)
        })
        .collect();
    all_candidates.sort_by(|a, b| b.1.cmp(&a.1));

    let (final_value, agreement_count) = match all_candidates.first() {
        Some((value, count)) => (Some(value.clone()), *count),
        None => (None, 0),
    };

    let level = ConsensusLevel::from_counts(agreement_count, total_detectors);
    let needs_confirmation = level.needs_confirmation();

    let winning_normalized = final_value
        .as_deref()
        .map(|v| normalize_for_vote(field_name, v));
    let mut agreeing = Vec::new();
    let mut dissenting = Vec::new();
    for r in &results {
        match (&r.value, &winning_normalized) {
            (Some(v), Some(winner)) if &normalize_for_vote(field_name, v) == winner => {
                agreeing.push(r.detector_name.clone())
            }
            (Some(_), _) => dissenting.push(r.detector_name.clone()),
            (None, _) => {}
        }
    }

    let confirmation_reason = if needs_confirmation {
        Some(match level {
            ConsensusLevel::None => format!("no detector produced a value for {field_name}"),
            ConsensusLevel::Weak => format!("only one detector agreed on {field_name}"),
            _ => unreachable!(),
        })
    } else {
        None
    };

    ConsensusResult {
        field_name: field_name.to_string(),
        final_value,
        level,
        agreement_count,
        total_detectors,
        detector_results: results,
        agreeing_detectors: agreeing,
        dissenting_detectors: dissenting,
        all_candidates,
        needs_confirmation,
        confirmation_reason,
    }
}

/// Runs all four total_amount detectors and votes.
pub fn extract_total_amount(text: &str) -> ConsensusResult {
    let results = vec![
        amount::regex_detector(text),
        amount::proximity_detector(text),
        amount::position_detector(text),
        amount::statistical_detector(text),
    ];
    build_consensus("total_amount", results)
}

/// Runs all four date detectors and votes.
pub fn extract_date(text: &str) -> ConsensusResult {
    let results = vec![
        date::regex_detector(text),
        date::proximity_detector(text),
        date::position_detector(text),
        date::statistical_detector(text),
    ];
    build_consensus("date", results)
}

/// Runs all four vendor detectors and votes.
pub fn extract_vendor(text: &str) -> ConsensusResult {
    let results = vec![
        vendor::regex_detector(text),
        vendor::proximity_detector(text),
        vendor::position_detector(text),
        vendor::statistical_detector(text),
    ];
    build_consensus("vendor", results)
}

pub(crate) fn lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

pub(crate) fn header_zone_end(total_lines: usize) -> usize {
    ((total_lines as f64 * HEADER_ZONE_LINES_PERCENT) as usize).max(HEADER_ZONE_MIN_LINES)
}

pub(crate) fn footer_zone_start(total_lines: usize) -> usize {
    (total_lines as f64 * FOOTER_ZONE_LINES_PERCENT) as usize
}

pub(crate) fn contains_subtotal_keyword(s: &str) -> bool {
    let lower = s.to_lowercase();
    SUBTOTAL_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

pub(crate) fn contains_total_keyword(s: &str) -> bool {
    let lower = s.to_lowercase();
    TOTAL_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// True when a numeric-looking string is plausibly a bare year (1900-2100).
pub(crate) fn looks_like_year(value: f64) -> bool {
    (1900.0..=2100.0).contains(&value) && value.fract() == 0.0
}

pub(crate) fn looks_like_time(s: &str) -> bool {
    static TIME_RE: std::sync::LazyLock<regex::Regex> =
        std::sync::LazyLock::new(|| regex::Regex::new(r"^\d{1,2}:\d{2}(:\d{2})?$").unwrap());
    TIME_RE.is_match(s.trim())
}
