//! Confidence Scorer: five weighted categories combine
//! into a transparent, auditable breakdown. Never invents a number it
//! cannot derive from its inputs.

use crate::document_intelligence::consensus::{ConsensusLevel, ConsensusResult};
use serde::{Deserialize, Serialize};

const WEIGHT_OCR: f64 = 0.20;
const WEIGHT_CONSENSUS: f64 = 0.30;
const WEIGHT_LAYOUT: f64 = 0.15;
const WEIGHT_BUSINESS: f64 = 0.20;
const WEIGHT_MEMORY: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Verified,
    High,
    Medium,
    Low,
    VeryLow,
    Unreliable,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.95 {
            ConfidenceLevel::Verified
        } else if score >= 0.80 {
            ConfidenceLevel::High
        } else if score >= 0.60 {
            ConfidenceLevel::Medium
        } else if score >= 0.40 {
            ConfidenceLevel::Low
        } else if score >= 0.20 {
            ConfidenceLevel::VeryLow
        } else {
            ConfidenceLevel::Unreliable
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceFactor {
    pub name: String,
    pub category: String,
    pub score: f64,
    pub weight: f64,
    pub evidence: String,
    pub is_penalty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub overall_score: f64,
    pub level: ConfidenceLevel,
    pub factors: Vec<ConfidenceFactor>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub explanation: String,
}

/// Everything the scorer needs, gathered by the orchestrator.
pub struct ScoringInputs<'a> {
    pub ocr_confidence: f64,
    pub low_confidence_word_count: usize,
    pub critical_results: Vec<&'a ConsensusResult>,
    pub layout_line_count: usize,
    pub fields_in_expected_zones: bool,
    pub total_amount: Option<f64>,
    pub date_year: Option<i32>,
    pub vendor_len: Option<usize>,
    pub document_type: &'a str,
    pub missing_required_fields: usize,
    pub memory_similarity: Option<f64>,
    pub user_confirmed_this_result: bool,
    pub known_pattern: bool,
}

fn consensus_field_score(level: ConsensusLevel) -> f64 {
    match level {
        ConsensusLevel::Strong => 1.0,
        ConsensusLevel::Moderate => 0.7,
        ConsensusLevel::Weak => 0.4,
        ConsensusLevel::None => 0.2,
    }
}

fn score_ocr(inputs: &ScoringInputs, factors: &mut Vec<ConfidenceFactor>) -> f64 {
    let mut score = (inputs.ocr_confidence / 100.0).clamp(0.0, 1.0);
    let mut penalty = 0.0;
    if inputs.low_confidence_word_count > 10 {
        penalty = 0.15;
    } else if inputs.low_confidence_word_count > 5 {
        penalty = 0.08;
    }
    if penalty > 0.0 {
        factors.push(ConfidenceFactor {
            name: "low_confidence_words".to_string(),
            category: "ocr".to_string(),
            score: -penalty,
            weight: WEIGHT_OCR,
            evidence: format!("{} low-confidence words", inputs.low_confidence_word_count),
            is_penalty: true,
        });
    }
    score -= penalty;
    factors.push(ConfidenceFactor {
        name: "ocr_confidence".to_string(),
        category: "ocr".to_string(),
        score,
        weight: WEIGHT_OCR,
        evidence: format!("OCR average confidence {:.1}%", inputs.ocr_confidence),
        is_penalty: false,
    });
    score.clamp(0.0, 1.0)
}

fn score_consensus(inputs: &ScoringInputs, factors: &mut Vec<ConfidenceFactor>) -> f64 {
    if inputs.critical_results.is_empty() {
        return 0.2;
    }
    let per_field: Vec<f64> = inputs
        .critical_results
        .iter()
        .map(|r| consensus_field_score(r.level))
        .collect();
    let base = per_field.iter().sum::<f64>() / per_field.len() as f64;

    let weak_or_none = inputs
        .critical_results
        .iter()
        .filter(|r| matches!(r.level, ConsensusLevel::Weak | ConsensusLevel::None))
        .count();
    let penalty = (0.25 * weak_or_none as f64).min(0.5);

    for r in &inputs.critical_results {
        factors.push(ConfidenceFactor {
            name: format!("consensus_{}", r.field_name),
            category: "consensus".to_string(),
            score: consensus_field_score(r.level),
            weight: WEIGHT_CONSENSUS / inputs.critical_results.len() as f64,
            evidence: format!("{} consensus on {}", format!("{:?}", r.level).to_lowercase(), r.field_name),
            is_penalty: false,
        });
    }
    if penalty > 0.0 {
        factors.push(ConfidenceFactor {
            name: "conflicting_values".to_string(),
            category: "consensus".to_string(),
            score: -penalty,
            weight: WEIGHT_CONSENSUS,
            evidence: format!("{weak_or_none} field(s) with weak/no consensus"),
            is_penalty: true,
        });
    }

    (base - penalty).clamp(0.0, 1.0)
}

fn score_layout(inputs: &ScoringInputs, factors: &mut Vec<ConfidenceFactor>) -> f64 {
    let mut score = 0.5;
    if inputs.layout_line_count >= 1 {
        score += 0.25;
    }
    if inputs.fields_in_expected_zones {
        score += 0.25;
    }
    factors.push(ConfidenceFactor {
        name: "layout_quality".to_string(),
        category: "layout".to_string(),
        score,
        weight: WEIGHT_LAYOUT,
        evidence: format!(
            "{} line(s) analyzed, fields in expected zones: {}",
            inputs.layout_line_count, inputs.fields_in_expected_zones
        ),
        is_penalty: false,
    });
    score.clamp(0.0, 1.0)
}

fn score_business(inputs: &ScoringInputs, factors: &mut Vec<ConfidenceFactor>) -> f64 {
    let mut score = 0.7;
    let mut notes = Vec::new();

    if let Some(total) = inputs.total_amount {
        if total <= 0.0 {
            score -= 0.2;
            notes.push("total <= 0".to_string());
        }
        if total > 100_000_000.0 {
            score -= 0.1;
            notes.push("total implausibly large".to_string());
        }
    }
    if let Some(year) = inputs.date_year {
        if year > 2030 {
            score -= 0.2;
            notes.push("date year > 2030".to_string());
        }
        if year < 2010 {
            score -= 0.15;
            notes.push("date year < 2010".to_string());
        }
    }
    if let Some(len) = inputs.vendor_len {
        if len < 3 || len > 100 {
            score -= 0.1;
            notes.push("vendor name length out of range".to_string());
        }
    }
    if matches!(inputs.document_type, "receipt" | "invoice") && inputs.missing_required_fields > 0 {
        score -= 0.1 * inputs.missing_required_fields as f64;
        notes.push(format!("{} required field(s) missing", inputs.missing_required_fields));
    }

    factors.push(ConfidenceFactor {
        name: "business_plausibility".to_string(),
        category: "business".to_string(),
        score,
        weight: WEIGHT_BUSINESS,
        evidence: if notes.is_empty() {
            "no business-rule violations".to_string()
        } else {
            notes.join("; ")
        },
        is_penalty: false,
    });

    score.clamp(0.0, 1.0)
}

fn score_memory(inputs: &ScoringInputs, factors: &mut Vec<ConfidenceFactor>) -> f64 {
    let score = if inputs.user_confirmed_this_result {
        1.0
    } else {
        match inputs.memory_similarity {
            Some(sim) if sim >= 0.9 => 0.9,
            Some(sim) if sim >= 0.6 => 0.7,
            Some(sim) => 0.5 + 0.2 * sim,
            None => 0.5,
        }
    };
    factors.push(ConfidenceFactor {
        name: "memory_match".to_string(),
        category: "memory".to_string(),
        score,
        weight: WEIGHT_MEMORY,
        evidence: match inputs.memory_similarity {
            Some(sim) => format!("memory similarity {sim:.2}"),
            None => "no memory match".to_string(),
        },
        is_penalty: false,
    });
    score
}

/// Produces a full [`ConfidenceBreakdown`] from gathered [`ScoringInputs`].
pub fn score(inputs: ScoringInputs) -> ConfidenceBreakdown {
    let mut factors = Vec::new();

    let ocr = score_ocr(&inputs, &mut factors);
    let consensus = score_consensus(&inputs, &mut factors);
    let layout = score_layout(&inputs, &mut factors);
    let business = score_business(&inputs, &mut factors);
    let memory = score_memory(&inputs, &mut factors);

    let mut overall = ocr * WEIGHT_OCR
        + consensus * WEIGHT_CONSENSUS
        + layout * WEIGHT_LAYOUT
        + business * WEIGHT_BUSINESS
        + memory * WEIGHT_MEMORY;

    if inputs.user_confirmed_this_result {
        overall += 0.20;
        factors.push(ConfidenceFactor {
            name: "user_confirmed".to_string(),
            category: "boost".to_string(),
            score: 0.20,
            weight: 1.0,
            evidence: "user confirmed this extraction".to_string(),
            is_penalty: false,
        });
    }
    if inputs.known_pattern {
        overall += 0.10;
        factors.push(ConfidenceFactor {
            name: "known_pattern".to_string(),
            category: "boost".to_string(),
            score: 0.10,
            weight: 1.0,
            evidence: "matches a previously learned pattern".to_string(),
            is_penalty: false,
        });
    }

    let overall_score = overall.clamp(0.0, 1.0);
    let level = ConfidenceLevel::from_score(overall_score);

    let warnings: Vec<String> = factors
        .iter()
        .filter(|f| f.is_penalty)
        .map(|f| f.evidence.clone())
        .collect();
    let suggestions = if level as u8 >= ConfidenceLevel::Low as u8 {
        vec!["Ask the user to confirm low-confidence fields before filing.".to_string()]
    } else {
        Vec::new()
    };

    let explanation = format!(
        "overall score {overall_score:.2} ({level:?}) from ocr={ocr:.2}, consensus={consensus:.2}, layout={layout:.2}, business={business:.2}, memory={memory:.2}"
    );

    ConfidenceBreakdown {
        overall_score,
        level,
        factors,
        warnings,
        suggestions,
        explanation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_intelligence::consensus::{ConsensusLevel as CL, ConsensusResult};

    fn consensus(field: &str, level: CL) -> ConsensusResult {
        ConsensusResult {
            field_name: field.to_string(),
            final_value: Some("x".to_string()),
            level,
            agreement_count: 0,
            total_detectors: 4,
            detector_results: vec![],
            agreeing_detectors: vec![],
            dissenting_detectors: vec![],
            all_candidates: vec![],
            needs_confirmation: false,
            confirmation_reason: None,
        }
    }

    fn base_inputs<'a>(results: Vec<&'a ConsensusResult>) -> ScoringInputs<'a> {
        ScoringInputs {
            ocr_confidence: 95.0,
            low_confidence_word_count: 0,
            critical_results: results,
            layout_line_count: 10,
            fields_in_expected_zones: true,
            total_amount: Some(150.0),
            date_year: Some(2024),
            vendor_len: Some(8),
            document_type: "receipt",
            missing_required_fields: 0,
            memory_similarity: None,
            user_confirmed_this_result: false,
            known_pattern: false,
        }
    }

    #[test]
    fn strong_consensus_yields_high_or_verified() {
        let a = consensus("total_amount", CL::Strong);
        let b = consensus("date", CL::Strong);
        let c = consensus("vendor", CL::Strong);
        let breakdown = score(base_inputs(vec![&a, &b, &c]));
        assert!(breakdown.overall_score >= 0.80);
    }

    #[test]
    fn weak_consensus_lowers_score() {
        let a = consensus("total_amount", CL::Weak);
        let b = consensus("date", CL::None);
        let breakdown = score(base_inputs(vec![&a, &b]));
        assert!(breakdown.overall_score < 0.80);
        assert!(!breakdown.warnings.is_empty());
    }

    #[test]
    fn user_confirmation_boosts_and_forces_level() {
        let a = consensus("total_amount", CL::Weak);
        let without_confirmation = score(base_inputs(vec![&a]));

        let mut inputs = base_inputs(vec![&a]);
        inputs.user_confirmed_this_result = true;
        let breakdown = score(inputs);

        assert!(breakdown.overall_score > without_confirmation.overall_score);
        assert!(matches!(
            breakdown.level,
            ConfidenceLevel::High | ConfidenceLevel::Verified
        ));
    }

    #[test]
    fn level_thresholds_match_spec() {
        assert_eq!(ConfidenceLevel::from_score(0.95), ConfidenceLevel::Verified);
        assert_eq!(ConfidenceLevel::from_score(0.80), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.60), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.40), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.20), ConfidenceLevel::VeryLow);
        assert_eq!(ConfidenceLevel::from_score(0.0), ConfidenceLevel::Unreliable);
    }
}
