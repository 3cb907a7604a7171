//! Orchestrator state machine: drives one document
//! through cleaning, layout, consensus extraction, scoring and planning.

use crate::document_intelligence::confidence::{self, ConfidenceBreakdown, ScoringInputs};
use crate::document_intelligence::confirmation::{self, ConfirmationRequest};
use crate::document_intelligence::config::EngineConfig;
use crate::document_intelligence::consensus::{self, ConsensusResult};
use crate::document_intelligence::field_extractor::{self, DocumentType, ExtractedFields};
use crate::document_intelligence::fingerprint::{self, DocumentFingerprint};
use crate::document_intelligence::layout::{self, LayoutAnalysis};
use crate::document_intelligence::memory::{FieldPosition, LearningMemory};
use crate::document_intelligence::ocr_source::{DocumentHint, OcrSource};
use crate::document_intelligence::text_cleaner;
use crate::document_intelligence::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Preprocess,
    Ocr,
    Clean,
    Layout,
    MemoryLookup,
    ConsensusExtract,
    BuildFields,
    Classify,
    Score,
    ConfirmationPlan,
    MemoryUpdate,
    Done,
    EmptyText,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMatchSummary {
    pub found: bool,
    pub score: f64,
    pub explanation: String,
}

/// The single wire-visible output of the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_id: String,
    pub document_type: String,
    pub raw_text: String,
    pub cleaned_text: String,
    pub extracted_fields: ExtractedFields,
    pub total_amount: Option<String>,
    pub date: Option<String>,
    pub vendor: Option<String>,
    pub currency: Option<String>,
    pub consensus_details: HashMap<String, ConsensusResult>,
    pub confidence: f64,
    pub confidence_level: String,
    pub confidence_explanation: String,
    pub confidence_breakdown: ConfidenceBreakdown,
    pub needs_confirmation: bool,
    pub confirmation_request: Option<ConfirmationRequest>,
    pub memory_match: MemoryMatchSummary,
    pub layout_analysis: Option<LayoutAnalysis>,
    pub fingerprint: Option<DocumentFingerprint>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub notes: Vec<String>,
    pub visited_states: Vec<State>,
    pub success: bool,
    pub error: Option<String>,
}

const REQUIRED_RECEIPT_INVOICE_FIELDS: &[&str] = &["total_amount", "date", "vendor"];

pub struct Orchestrator {
    config: EngineConfig,
    ocr_source: Box<dyn OcrSource>,
    memory: Option<LearningMemory>,
}

impl Orchestrator {
    pub fn new(config: EngineConfig, ocr_source: Box<dyn OcrSource>) -> Result<Self> {
        let memory = if config.enable_learning {
            Some(LearningMemory::open_with_capacity(
                &config.memory_storage_path,
                config.max_memory_entries,
            )?)
        } else {
            None
        };
        Ok(Orchestrator {
            config,
            ocr_source,
            memory,
        })
    }

    /// Runs one document through the full pipeline, never returning `Err` —
    /// any unexpected failure becomes a `FAILED` [`ExtractionResult`].
    pub fn process(
        &self,
        document_id: &str,
        image_identifier: &str,
        document_hint: DocumentHint,
        lang: &str,
    ) -> ExtractionResult {
        let mut visited = vec![State::Preprocess, State::Ocr];

        let ocr_output = self
            .ocr_source
            .recognize(image_identifier, document_hint, lang);

        if ocr_output.primary_text.trim().is_empty() {
            visited.push(State::EmptyText);
            warn!(document_id, "OCR produced empty text");
            return empty_text_result(document_id, visited);
        }

        visited.push(State::Clean);
        let cleaning = text_cleaner::clean(&ocr_output.primary_text);

        visited.push(State::Layout);
        let layout_analysis = if ocr_output.words.is_empty() {
            layout::analyze(&crate::document_intelligence::word::simulate_words_from_text(
                &cleaning.cleaned_text,
            ))
        } else {
            layout::analyze(&ocr_output.words)
        };

        visited.push(State::MemoryLookup);
        let document_type_guess = field_extractor::detect_document_type(&cleaning.cleaned_text);
        let currency = field_extractor::detect_currency(&cleaning.cleaned_text);
        // Vendor isn't known until ConsensusExtract runs, so the lookup probe
        // and the entry persisted at MemoryUpdate both omit it from the
        // fingerprint: keeping the two consistent matters more than the
        // vendor weight in similarity(), which only ever sees stored entries.
        let memory_match = self.memory.as_ref().and_then(|m| {
            let probe = fingerprint::build(
                &cleaning.cleaned_text,
                document_type_guess.as_str(),
                None,
                currency.as_deref(),
                !layout_analysis.tables.is_empty(),
            );
            m.find_match(&probe)
        });

        visited.push(State::ConsensusExtract);
        let total_amount_consensus = consensus::extract_total_amount(&cleaning.cleaned_text);
        let date_consensus = consensus::extract_date(&cleaning.cleaned_text);
        let vendor_consensus = consensus::extract_vendor(&cleaning.cleaned_text);

        visited.push(State::BuildFields);
        let mut extracted_fields =
            field_extractor::extract(&cleaning.cleaned_text, document_type_guess);

        visited.push(State::Classify);
        let document_type = document_type_guess;
        extracted_fields.identifiers.entry("document_type".to_string()).or_insert_with(|| document_type.as_str().to_string());

        visited.push(State::Score);
        let missing_required = if matches!(document_type, DocumentType::Receipt | DocumentType::Invoice) {
            REQUIRED_RECEIPT_INVOICE_FIELDS
                .iter()
                .filter(|name| match *name {
                    &"total_amount" => total_amount_consensus.final_value.is_none(),
                    &"date" => date_consensus.final_value.is_none(),
                    &"vendor" => vendor_consensus.final_value.is_none(),
                    _ => false,
                })
                .count()
        } else {
            0
        };

        let date_year = date_consensus
            .final_value
            .as_ref()
            .and_then(|d| d.get(0..4))
            .and_then(|y| y.parse::<i32>().ok());
        let total_amount_value = total_amount_consensus
            .final_value
            .as_ref()
            .and_then(|v| v.parse::<f64>().ok());
        let vendor_len = vendor_consensus.final_value.as_ref().map(|v| v.chars().count());

        let fields_in_expected_zones = layout_analysis
            .get_header_text()
            .to_lowercase()
            .contains(&vendor_consensus.final_value.clone().unwrap_or_default().to_lowercase());

        let critical_results = vec![&total_amount_consensus, &date_consensus, &vendor_consensus];

        let breakdown = confidence::score(ScoringInputs {
            ocr_confidence: ocr_output.average_confidence,
            low_confidence_word_count: ocr_output.low_confidence_words.len(),
            critical_results: critical_results.clone(),
            layout_line_count: layout_analysis.lines.len(),
            fields_in_expected_zones,
            total_amount: total_amount_value,
            date_year,
            vendor_len,
            document_type: document_type.as_str(),
            missing_required_fields: missing_required,
            memory_similarity: memory_match.as_ref().map(|m| m.similarity),
            user_confirmed_this_result: false,
            known_pattern: memory_match.is_some(),
        });

        visited.push(State::ConfirmationPlan);
        let confirmation = confirmation::plan(
            &cleaning.cleaned_text,
            &critical_results,
            REQUIRED_RECEIPT_INVOICE_FIELDS,
            &breakdown,
            self.config.confidence_threshold,
        );
        let needs_confirmation = !confirmation.is_empty();

        visited.push(State::MemoryUpdate);
        if let Some(memory) = &self.memory {
            let fp = fingerprint::build(
                &cleaning.cleaned_text,
                document_type.as_str(),
                None,
                currency.as_deref(),
                !layout_analysis.tables.is_empty(),
            );
            let positions = vec![FieldPosition {
                field_name: "vendor".to_string(),
                zone: "header".to_string(),
                line_percentage: 0.0,
                alignment: "unknown".to_string(),
                near_keywords: vec![],
            }];
            if let Err(e) = memory.learn_from_document(fp, positions, false, "1970-01-01") {
                warn!(document_id, error = %e, "failed to persist learning memory");
            }
        }

        visited.push(State::Done);
        info!(document_id, score = breakdown.overall_score, "document processed");

        let mut consensus_details = HashMap::new();
        consensus_details.insert("total_amount".to_string(), total_amount_consensus.clone());
        consensus_details.insert("date".to_string(), date_consensus.clone());
        consensus_details.insert("vendor".to_string(), vendor_consensus.clone());

        ExtractionResult {
            document_id: document_id.to_string(),
            document_type: document_type.as_str().to_string(),
            raw_text: ocr_output.primary_text,
            cleaned_text: cleaning.cleaned_text,
            extracted_fields,
            total_amount: total_amount_consensus.final_value.clone(),
            date: date_consensus.final_value.clone(),
            vendor: vendor_consensus.final_value.clone(),
            currency,
            consensus_details,
            confidence: breakdown.overall_score,
            confidence_level: format!("{:?}", breakdown.level),
            confidence_explanation: breakdown.explanation.clone(),
            confidence_breakdown: breakdown,
            needs_confirmation,
            confirmation_request: if needs_confirmation { Some(confirmation) } else { None },
            memory_match: MemoryMatchSummary {
                found: memory_match.is_some(),
                score: memory_match.as_ref().map(|m| m.similarity).unwrap_or(0.0),
                explanation: memory_match
                    .as_ref()
                    .map(|m| format!("matched learned entry with similarity {:.2}", m.similarity))
                    .unwrap_or_else(|| "no matching learned entry".to_string()),
            },
            layout_analysis: Some(layout_analysis),
            fingerprint: None,
            warnings: Vec::new(),
            suggestions: Vec::new(),
            notes: Vec::new(),
            visited_states: visited,
            success: true,
            error: None,
        }
    }

    /// Applies user-confirmed corrections to a prior result, recording them
    /// in Learning Memory, and returns a new VERIFIED result.
    pub fn apply_user_corrections(
        &self,
        original: &ExtractionResult,
        corrections: &HashMap<String, String>,
    ) -> Result<ExtractionResult> {
        let mut updated = original.clone();
        for (field, value) in corrections {
            match field.as_str() {
                "total_amount" => updated.total_amount = Some(value.clone()),
                "date" => updated.date = Some(value.clone()),
                "vendor" => updated.vendor = Some(value.clone()),
                "currency" => updated.currency = Some(value.clone()),
                _ => {}
            }
        }

        if let Some(memory) = &self.memory {
            let fp = fingerprint::build(
                &updated.cleaned_text,
                &updated.document_type,
                None,
                updated.currency.as_deref(),
                false,
            );
            for (field, corrected_value) in corrections {
                let original_value = match field.as_str() {
                    "total_amount" => original.total_amount.clone(),
                    "date" => original.date.clone(),
                    "vendor" => original.vendor.clone(),
                    _ => None,
                }
                .unwrap_or_default();
                memory.record_correction(
                    &fp.hash,
                    crate::document_intelligence::memory::UserCorrection {
                        field_name: field.clone(),
                        original_value,
                        corrected_value: corrected_value.clone(),
                        document_type: updated.document_type.clone(),
                        vendor_name: updated.vendor.clone(),
                        timestamp: "1970-01-01".to_string(),
                        correction_count: 1,
                    },
                )?;
            }
            memory.learn_from_document(fp, vec![], true, "1970-01-01")?;
        }

        updated.confidence = 1.0;
        updated.confidence_level = "Verified".to_string();
        updated.needs_confirmation = false;
        updated.confirmation_request = None;
        Ok(updated)
    }
}

fn empty_text_result(document_id: &str, visited: Vec<State>) -> ExtractionResult {
    ExtractionResult {
        document_id: document_id.to_string(),
        document_type: DocumentType::Unknown.as_str().to_string(),
        raw_text: String::new(),
        cleaned_text: String::new(),
        extracted_fields: ExtractedFields::default(),
        total_amount: None,
        date: None,
        vendor: None,
        currency: None,
        consensus_details: HashMap::new(),
        confidence: 0.0,
        confidence_level: "Unreliable".to_string(),
        confidence_explanation: "OCR produced no text".to_string(),
        confidence_breakdown: ConfidenceBreakdown {
            overall_score: 0.0,
            level: crate::document_intelligence::confidence::ConfidenceLevel::Unreliable,
            factors: vec![],
            warnings: vec!["OCR produced no text".to_string()],
            suggestions: vec!["Re-scan the document with better lighting or resolution.".to_string()],
            explanation: "OCR produced no text".to_string(),
        },
        needs_confirmation: true,
        confirmation_request: None,
        memory_match: MemoryMatchSummary {
            found: false,
            score: 0.0,
            explanation: "no OCR text to match".to_string(),
        },
        layout_analysis: None,
        fingerprint: None,
        warnings: vec!["OCR produced no text".to_string()],
        suggestions: Vec::new(),
        notes: Vec::new(),
        visited_states: visited,
        success: true,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_intelligence::ocr_source::PlainTextOcrSource;

    fn orchestrator(dir: &std::path::Path) -> Orchestrator {
        let config = EngineConfig::builder()
            .memory_storage_path(dir.join("memory.json"))
            .build();
        Orchestrator::new(config, Box::new(PlainTextOcrSource)).unwrap()
    }

    #[test]
    fn empty_text_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let result = orch.process("doc-1", "", DocumentHint::Receipt, "eng");
        assert!(result.visited_states.contains(&State::EmptyText));
        assert!(result.needs_confirmation);
    }

    #[test]
    fn clear_receipt_reaches_done_with_strong_consensus() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let text = "ACME SUPPLIES LTD\nReceipt #1\nDate: 01/02/2024\nItem 100.00\nTOTAL 150.00";
        let result = orch.process("doc-2", text, DocumentHint::Receipt, "eng");
        assert!(result.visited_states.contains(&State::Done));
        assert_eq!(result.total_amount.as_deref(), Some("150.00"));
        assert_eq!(result.vendor.as_deref(), Some("ACME SUPPLIES LTD"));
    }

    #[test]
    fn apply_user_corrections_yields_verified_result() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let text = "ACME LTD\nTOTAL 150.00";
        let result = orch.process("doc-3", text, DocumentHint::Receipt, "eng");
        let mut corrections = HashMap::new();
        corrections.insert("total_amount".to_string(), "160.00".to_string());
        let corrected = orch.apply_user_corrections(&result, &corrections).unwrap();
        assert_eq!(corrected.total_amount.as_deref(), Some("160.00"));
        assert_eq!(corrected.confidence_level, "Verified");
        assert!(!corrected.needs_confirmation);
    }

    #[test]
    fn audit_trail_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let result = orch.process("doc-4", "ACME LTD\nTOTAL 150.00", DocumentHint::Receipt, "eng");
        let expected_prefix = [State::Preprocess, State::Ocr, State::Clean];
        assert_eq!(&result.visited_states[..3], &expected_prefix);
    }
}
