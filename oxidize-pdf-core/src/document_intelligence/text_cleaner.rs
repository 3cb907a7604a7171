//! Deterministic OCR text cleaning.
//!
//! Never hallucinates: every rewrite is one of a fixed list of regex
//! substitutions, and every substitution that actually fires is recorded.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningResult {
    pub original_text: String,
    pub cleaned_text: String,
    pub corrections: Vec<Correction>,
}

impl CleaningResult {
    pub fn correction_count(&self) -> usize {
        self.corrections.len()
    }
}

// The `regex` crate has no lookaround, unlike the Python original's `re`.
// Confusable-character rules are rewritten as capture-group substitutions:
// the flanking digit (or `$`) is matched and re-emitted alongside the fix.
static CHAR_CONFUSIONS: LazyLock<Vec<(Regex, &'static str, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)([0-9])O([0-9])").unwrap(), "${1}0${2}", "O\u{2192}0 in numbers"),
        (Regex::new(r"(?i)([0-9])O(\s|$|,|\.)").unwrap(), "${1}0${2}", "O\u{2192}0 at number end"),
        (Regex::new(r"(?i)\$O").unwrap(), "$$0", "O\u{2192}0 after $"),
        (Regex::new(r"(?i)([0-9])l([0-9])").unwrap(), "${1}1${2}", "l\u{2192}1 in numbers"),
        (Regex::new(r"(?i)\$l").unwrap(), "$$1", "l\u{2192}1 after $"),
        (Regex::new(r"(?i)([0-9])S([0-9])").unwrap(), "${1}5${2}", "S\u{2192}5 in numbers"),
        (Regex::new(r"(?i)([0-9])I([0-9])").unwrap(), "${1}1${2}", "I\u{2192}1 in numbers"),
        (Regex::new(r"(?i)([0-9])B([0-9])").unwrap(), "${1}8${2}", "B\u{2192}8 in numbers"),
        (Regex::new(r"(?i)\bTOTAI\b").unwrap(), "TOTAL", "TOTAI\u{2192}TOTAL"),
        (Regex::new(r"(?i)\bT0TAL\b").unwrap(), "TOTAL", "T0TAL\u{2192}TOTAL"),
        (Regex::new(r"(?i)\bSUBTOTAI\b").unwrap(), "SUBTOTAL", "SUBTOTAI\u{2192}SUBTOTAL"),
        (Regex::new(r"(?i)\bAM0UNT\b").unwrap(), "AMOUNT", "AM0UNT\u{2192}AMOUNT"),
        (Regex::new(r"(?i)\bBAIANCE\b").unwrap(), "BALANCE", "BAIANCE\u{2192}BALANCE"),
        (Regex::new(r"(?i)\bRECE1PT\b").unwrap(), "RECEIPT", "RECE1PT\u{2192}RECEIPT"),
        (Regex::new(r"(?i)\bINV0ICE\b").unwrap(), "INVOICE", "INV0ICE\u{2192}INVOICE"),
    ]
});

static CURRENCY_PATTERNS: LazyLock<Vec<(Regex, &'static str, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)\bKSHS\.?\s*").unwrap(), "KES ", "KSHS\u{2192}KES"),
        (Regex::new(r"(?i)\bKSH\.?\s*").unwrap(), "KES ", "KSH\u{2192}KES"),
        (Regex::new(r"(?i)\bKes\.?\s*").unwrap(), "KES ", "Kes\u{2192}KES"),
        (Regex::new(r"(?i)\bUS\$\s*").unwrap(), "USD ", "US$\u{2192}USD"),
        (Regex::new(r"(?i)\bUSD\s*\$").unwrap(), "USD ", "USD$\u{2192}USD"),
        (Regex::new(r"\$\s+(\d)").unwrap(), "$$$1", "remove space after $"),
    ]
});

static DECIMAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.\s+(\d{2})\b").unwrap());
// `\b` after the two digits already excludes a following digit (both are word
// characters), so the comma-decimal rule needs no extra lookahead.
static DECIMAL_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+),(\d{2})\b").unwrap());
static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());
static MULTI_BLANK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Cleans raw OCR text, applying the rules in §4.1 in order.
pub fn clean(text: &str) -> CleaningResult {
    let original = text.to_string();
    let mut corrections = Vec::new();

    let mut cleaned = clean_whitespace(text, &mut corrections);
    cleaned = fix_char_confusions(&cleaned, &mut corrections);
    cleaned = normalize_currency(&cleaned, &mut corrections);
    cleaned = fix_decimals(&cleaned, &mut corrections);
    cleaned = final_normalize(&cleaned);

    CleaningResult {
        original_text: original,
        cleaned_text: cleaned,
        corrections,
    }
}

fn clean_whitespace(text: &str, corrections: &mut Vec<Correction>) -> String {
    let collapsed = MULTI_SPACE.replace_all(text, " ");
    let capped = MULTI_BLANK_LINE.replace_all(&collapsed, "\n\n");
    let trimmed: String = capped
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    if trimmed != text {
        corrections.push(Correction {
            kind: "whitespace".to_string(),
            description: "normalized whitespace".to_string(),
        });
    }
    trimmed
}

fn fix_char_confusions(text: &str, corrections: &mut Vec<Correction>) -> String {
    let mut cleaned = text.to_string();
    for (pattern, replacement, description) in CHAR_CONFUSIONS.iter() {
        let replaced = pattern.replace_all(&cleaned, *replacement).into_owned();
        if replaced != cleaned {
            corrections.push(Correction {
                kind: "char_confusion".to_string(),
                description: description.to_string(),
            });
            cleaned = replaced;
        }
    }
    cleaned
}

fn normalize_currency(text: &str, corrections: &mut Vec<Correction>) -> String {
    let mut cleaned = text.to_string();
    for (pattern, replacement, description) in CURRENCY_PATTERNS.iter() {
        let replaced = pattern.replace_all(&cleaned, *replacement).into_owned();
        if replaced != cleaned {
            corrections.push(Correction {
                kind: "currency".to_string(),
                description: description.to_string(),
            });
            cleaned = replaced;
        }
    }
    cleaned
}

fn fix_decimals(text: &str, corrections: &mut Vec<Correction>) -> String {
    let mut cleaned = text.to_string();

    let replaced = DECIMAL_SPACE.replace_all(&cleaned, "$1.$2").into_owned();
    if replaced != cleaned {
        corrections.push(Correction {
            kind: "decimal".to_string(),
            description: "fixed space in decimal".to_string(),
        });
        cleaned = replaced;
    }

    let replaced = DECIMAL_COMMA.replace_all(&cleaned, "$1.$2").into_owned();
    if replaced != cleaned {
        corrections.push(Correction {
            kind: "decimal".to_string(),
            description: "converted comma decimal to period".to_string(),
        });
        cleaned = replaced;
    }

    cleaned
}

fn final_normalize(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        let result = clean("TOTAL:    150.00\n\n\n\nthanks   ");
        assert!(!result.cleaned_text.contains("    "));
        assert!(!result.cleaned_text.contains("\n\n\n"));
    }

    #[test]
    fn fixes_numeric_char_confusion() {
        let result = clean("Total: $1O0 for 5O items");
        assert_eq!(result.cleaned_text, "Total: $100 for 50 items");
        assert!(result.correction_count() > 0);
    }

    #[test]
    fn leaves_po_box_untouched() {
        let result = clean("P.O. Box 123, Nairobi");
        assert_eq!(result.cleaned_text, "P.O. Box 123, Nairobi");
        assert_eq!(result.correction_count(), 0);
    }

    #[test]
    fn fixes_garbled_keywords() {
        assert_eq!(clean("TOTAI due").cleaned_text, "TOTAL due");
        assert_eq!(clean("SUBTOTAI: 10").cleaned_text, "SUBTOTAL: 10");
        assert_eq!(clean("AM0UNT due").cleaned_text, "AMOUNT due");
        assert_eq!(clean("BAIANCE: 5").cleaned_text, "BALANCE: 5");
        assert_eq!(clean("RECE1PT #1").cleaned_text, "RECEIPT #1");
        assert_eq!(clean("INV0ICE #1").cleaned_text, "INVOICE #1");
    }

    #[test]
    fn normalizes_currency_codes() {
        assert_eq!(clean("KSH 100").cleaned_text, "KES 100");
        assert_eq!(clean("KSHS 100").cleaned_text, "KES 100");
        assert_eq!(clean("US$ 100").cleaned_text, "USD 100");
    }

    #[test]
    fn fixes_decimal_space() {
        assert_eq!(clean("10. 00").cleaned_text, "10.00");
    }

    #[test]
    fn fixes_comma_decimal_only_two_digits() {
        assert_eq!(clean("10,00").cleaned_text, "10.00");
        // Three digits after the comma looks like a thousands separator, not a decimal.
        assert_eq!(clean("1,000").cleaned_text, "1,000");
    }

    #[test]
    fn crlf_normalized_to_lf() {
        let result = clean("line one\r\nline two\r\n");
        assert!(!result.cleaned_text.contains('\r'));
    }

    #[test]
    fn never_touches_unrelated_text() {
        let result = clean("ACME LTD\nVendor of fine widgets since 1990");
        assert_eq!(result.cleaned_text, "ACME LTD\nVendor of fine widgets since 1990");
        assert_eq!(result.correction_count(), 0);
    }
}
