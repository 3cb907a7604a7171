//! A single OCR-recognized word with its bounding box.

use serde::{Deserialize, Serialize};

/// One word as delivered by the upstream OCR engine. Immutable once
/// constructed — the engine never mutates a word in place, only copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// OCR confidence in [0, 100].
    pub confidence: f64,
    pub line_num: u32,
    pub word_num: u32,
    pub block_num: u32,
}

impl OcrWord {
    pub fn new(
        text: impl Into<String>,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        confidence: f64,
        line_num: u32,
    ) -> Self {
        OcrWord {
            text: text.into(),
            left,
            top,
            width,
            height,
            confidence,
            line_num,
            word_num: 0,
            block_num: 0,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    pub fn is_low_confidence(&self) -> bool {
        self.confidence < 60.0
    }
}

/// Splits plain text into synthetic [`OcrWord`]s when no bounding boxes are
/// available, using a fixed character width and line height.
/// This degrades zone quality but preserves the Layout Analyzer's API.
pub fn simulate_words_from_text(text: &str) -> Vec<OcrWord> {
    const CHAR_WIDTH: f64 = 8.0;
    const LINE_HEIGHT: f64 = 20.0;
    const TOP_MARGIN: f64 = 10.0;

    let mut words = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        let top = TOP_MARGIN + line_idx as f64 * LINE_HEIGHT;
        let mut cursor = 0.0_f64;
        for (word_idx, token) in line.split_whitespace().enumerate() {
            let width = token.chars().count() as f64 * CHAR_WIDTH;
            let mut word = OcrWord::new(
                token,
                cursor,
                top,
                width,
                LINE_HEIGHT,
                80.0,
                line_idx as u32,
            );
            word.word_num = word_idx as u32;
            words.push(word);
            cursor += width + CHAR_WIDTH;
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_helpers() {
        let w = OcrWord::new("TOTAL", 10.0, 20.0, 40.0, 10.0, 95.0, 0);
        assert_eq!(w.right(), 50.0);
        assert_eq!(w.bottom(), 30.0);
        assert_eq!(w.center_y(), 25.0);
        assert!(!w.is_low_confidence());
    }

    #[test]
    fn low_confidence_threshold() {
        let w = OcrWord::new("blur", 0.0, 0.0, 1.0, 1.0, 59.9, 0);
        assert!(w.is_low_confidence());
    }

    #[test]
    fn simulate_words_preserves_line_count() {
        let text = "ACME LTD\nTOTAL 150.00";
        let words = simulate_words_from_text(text);
        let lines: std::collections::HashSet<u32> = words.iter().map(|w| w.line_num).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(words.iter().filter(|w| w.line_num == 0).count(), 2);
        assert_eq!(words.iter().filter(|w| w.line_num == 1).count(), 2);
    }
}
