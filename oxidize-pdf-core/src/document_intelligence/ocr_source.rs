//! The `OcrSource` trait boundary: the core never talks to
//! an actual image/OCR pipeline directly, only through this trait, so tests
//! and callers can supply a stub.

use crate::document_intelligence::word::OcrWord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentHint {
    Receipt,
    Invoice,
    Handwritten,
    Form,
    Unknown,
}

/// What a preprocessing/OCR pipeline hands back to the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrOutput {
    pub primary_text: String,
    pub words: Vec<OcrWord>,
    pub low_confidence_words: Vec<OcrWord>,
    pub average_confidence: f64,
}

/// External collaborator boundary standing in for the out-of-scope
/// preprocessing and OCR engine.
pub trait OcrSource: Send + Sync {
    fn recognize(&self, image_identifier: &str, document_hint: DocumentHint, lang: &str) -> OcrOutput;
}

/// A deterministic [`OcrSource`] used by tests and the developer CLI: treats
/// the `image_identifier` as literal already-recognized text.
pub struct PlainTextOcrSource;

impl OcrSource for PlainTextOcrSource {
    fn recognize(&self, image_identifier: &str, _document_hint: DocumentHint, _lang: &str) -> OcrOutput {
        let words = crate::document_intelligence::word::simulate_words_from_text(image_identifier);
        let average_confidence = if words.is_empty() {
            0.0
        } else {
            words.iter().map(|w| w.confidence).sum::<f64>() / words.len() as f64
        };
        let low_confidence_words = words.iter().filter(|w| w.is_low_confidence()).cloned().collect();
        OcrOutput {
            primary_text: image_identifier.to_string(),
            words,
            low_confidence_words,
            average_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_source_echoes_input() {
        let source = PlainTextOcrSource;
        let out = source.recognize("TOTAL 150.00", DocumentHint::Receipt, "eng");
        assert_eq!(out.primary_text, "TOTAL 150.00");
        assert!(!out.words.is_empty());
    }

    #[test]
    fn empty_input_yields_zero_confidence() {
        let source = PlainTextOcrSource;
        let out = source.recognize("", DocumentHint::Unknown, "eng");
        assert_eq!(out.average_confidence, 0.0);
    }
}
