//! Confirmation Planner: turns weak consensus, missing
//! fields, and low overall confidence into concrete requests for a human.

use crate::document_intelligence::confidence::ConfidenceBreakdown;
use crate::document_intelligence::consensus::ConsensusResult;
use serde::{Deserialize, Serialize};

const MAX_CANDIDATES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldPriority {
    Critical,
    High,
    Medium,
}

fn priority_for(field_name: &str) -> FieldPriority {
    match field_name {
        "total_amount" => FieldPriority::Critical,
        "date" | "vendor" | "invoice_number" => FieldPriority::High,
        _ => FieldPriority::Medium,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfirmationRequest {
    pub field_name: String,
    pub priority: FieldPriority,
    pub reason_tag: String,
    pub reason: String,
    pub candidates: Vec<(String, usize)>,
    pub context_excerpt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub requests: Vec<FieldConfirmationRequest>,
}

impl ConfirmationRequest {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

fn keywords_for(field_name: &str) -> &'static [&'static str] {
    match field_name {
        "total_amount" => &["total", "amount", "sum", "pay"],
        "date" => &["date", "dated"],
        "currency" => &["kes", "usd", "eur", "ksh", "$", "€"],
        _ => &[],
    }
}

/// Lines surrounding the field's expected location, chosen by keyword; for
/// `vendor` this is simply the first 5 lines of the document.
fn context_excerpt(text: &str, field_name: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if field_name == "vendor" {
        return lines.iter().take(5).cloned().collect::<Vec<_>>().join("\n");
    }
    let keywords = keywords_for(field_name);
    if keywords.is_empty() {
        return lines.iter().take(5).cloned().collect::<Vec<_>>().join("\n");
    }
    for (idx, line) in lines.iter().enumerate() {
        let lower = line.to_lowercase();
        if keywords.iter().any(|kw| lower.contains(kw)) {
            let from = idx.saturating_sub(1);
            let to = (idx + 2).min(lines.len());
            return lines[from..to].join("\n");
        }
    }
    String::new()
}

/// One request per field whose ConsensusResult needs confirmation.
fn field_requests(text: &str, results: &[&ConsensusResult]) -> Vec<FieldConfirmationRequest> {
    results
        .iter()
        .filter(|r| r.needs_confirmation)
        .map(|r| FieldConfirmationRequest {
            field_name: r.field_name.clone(),
            priority: priority_for(&r.field_name),
            reason_tag: "WEAK_CONSENSUS".to_string(),
            reason: r
                .confirmation_reason
                .clone()
                .unwrap_or_else(|| format!("low agreement on {}", r.field_name)),
            candidates: r.all_candidates.iter().take(MAX_CANDIDATES).cloned().collect(),
            context_excerpt: context_excerpt(text, &r.field_name),
        })
        .collect()
}

fn missing_critical_requests(
    text: &str,
    results: &[&ConsensusResult],
    required_fields: &[&str],
) -> Vec<FieldConfirmationRequest> {
    required_fields
        .iter()
        .filter(|name| {
            !results
                .iter()
                .any(|r| &r.field_name == *name && r.final_value.is_some())
        })
        .map(|name| FieldConfirmationRequest {
            field_name: name.to_string(),
            priority: priority_for(name),
            reason_tag: "MISSING_CRITICAL_FIELD".to_string(),
            reason: format!("no value could be extracted for {name}"),
            candidates: Vec::new(),
            context_excerpt: context_excerpt(text, name),
        })
        .collect()
}

fn low_confidence_requests(
    text: &str,
    results: &[&ConsensusResult],
    critical_fields: &[&str],
) -> Vec<FieldConfirmationRequest> {
    critical_fields
        .iter()
        .filter_map(|name| results.iter().find(|r| &r.field_name == name))
        .map(|r| FieldConfirmationRequest {
            field_name: r.field_name.clone(),
            priority: priority_for(&r.field_name),
            reason_tag: "LOW_CONFIDENCE".to_string(),
            reason: "overall extraction confidence is below the review threshold".to_string(),
            candidates: r.all_candidates.iter().take(MAX_CANDIDATES).cloned().collect(),
            context_excerpt: context_excerpt(text, &r.field_name),
        })
        .collect()
}

/// Builds the full confirmation plan for a document.
pub fn plan(
    text: &str,
    results: &[&ConsensusResult],
    required_fields: &[&str],
    breakdown: &ConfidenceBreakdown,
    confidence_threshold: f64,
) -> ConfirmationRequest {
    let mut requests = field_requests(text, results);
    requests.extend(missing_critical_requests(text, results, required_fields));

    if breakdown.overall_score < confidence_threshold {
        let critical_fields = ["total_amount", "date", "vendor"];
        for r in low_confidence_requests(text, results, &critical_fields) {
            if !requests.iter().any(|existing| existing.field_name == r.field_name) {
                requests.push(r);
            }
        }
    }

    requests.sort_by_key(|r| r.priority);
    ConfirmationRequest { requests }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_intelligence::confidence::ConfidenceLevel;

    fn consensus(field: &str, needs_confirmation: bool, final_value: Option<&str>) -> ConsensusResult {
        ConsensusResult {
            field_name: field.to_string(),
            final_value: final_value.map(|v| v.to_string()),
            level: crate::document_intelligence::consensus::ConsensusLevel::Weak,
            agreement_count: 1,
            total_detectors: 4,
            detector_results: vec![],
            agreeing_detectors: vec![],
            dissenting_detectors: vec![],
            all_candidates: vec![("150.00".to_string(), 1)],
            needs_confirmation,
            confirmation_reason: Some("only one detector agreed".to_string()),
        }
    }

    fn breakdown(score: f64) -> ConfidenceBreakdown {
        ConfidenceBreakdown {
            overall_score: score,
            level: ConfidenceLevel::from_score(score),
            factors: vec![],
            warnings: vec![],
            suggestions: vec![],
            explanation: String::new(),
        }
    }

    #[test]
    fn weak_consensus_field_gets_a_request() {
        let r = consensus("total_amount", true, Some("150.00"));
        let plan = plan("TOTAL 150.00", &[&r], &["total_amount"], &breakdown(0.8), 0.60);
        assert_eq!(plan.requests.len(), 1);
        assert_eq!(plan.requests[0].reason_tag, "WEAK_CONSENSUS");
    }

    #[test]
    fn missing_required_field_is_flagged() {
        let r = consensus("total_amount", false, None);
        let plan = plan("no amount here", &[&r], &["total_amount"], &breakdown(0.8), 0.60);
        assert!(plan
            .requests
            .iter()
            .any(|req| req.reason_tag == "MISSING_CRITICAL_FIELD"));
    }

    #[test]
    fn low_overall_confidence_adds_requests_for_critical_fields() {
        let r = consensus("total_amount", false, Some("150.00"));
        let plan = plan("TOTAL 150.00", &[&r], &[], &breakdown(0.3), 0.60);
        assert!(plan.requests.iter().any(|req| req.reason_tag == "LOW_CONFIDENCE"));
    }

    #[test]
    fn requests_ordered_by_priority() {
        let a = consensus("currency", true, None);
        let b = consensus("total_amount", true, None);
        let plan = plan("text", &[&a, &b], &[], &breakdown(0.8), 0.60);
        assert_eq!(plan.requests[0].field_name, "total_amount");
    }
}
