//! vendor detectors.

use super::{header_zone_end, lines, DetectorResult};
use std::sync::LazyLock;

const BUSINESS_SUFFIXES: &[&str] = &[
    "ltd", "limited", "inc", "llc", "corp", "corporation", "co.", "company", "plc", "llp",
];

const BUSINESS_CATEGORY_WORDS: &[&str] = &[
    "store", "shop", "market", "restaurant", "cafe", "hotel", "bank",
];

const SKIP_PREFIXES: &[&str] = &[
    "tel", "phone", "fax", "email", "www.", "http", "receipt", "invoice", "order", "date", "time",
];

fn is_bare_number(s: &str) -> bool {
    let trimmed = s.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
}

fn looks_like_date_line(s: &str) -> bool {
    super::date::normalize_date(s).is_some()
}

fn matches_skip_pattern(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    if lower.is_empty() || is_bare_number(&lower) || looks_like_date_line(&lower) {
        return true;
    }
    SKIP_PREFIXES.iter().any(|p| lower.starts_with(p))
}

fn has_business_suffix(line: &str) -> bool {
    let lower = line.to_lowercase();
    BUSINESS_SUFFIXES
        .iter()
        .any(|s| lower.split_whitespace().any(|w| w.trim_end_matches(',') == *s))
}

fn has_business_category_word(line: &str) -> bool {
    let lower = line.to_lowercase();
    BUSINESS_CATEGORY_WORDS.iter().any(|w| lower.contains(w))
}

static ALL_CAPS: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[A-Z0-9 &.,'\-]+$").unwrap());

fn is_all_caps(line: &str) -> bool {
    let letters: String = line.chars().filter(|c| c.is_alphabetic()).collect();
    !letters.is_empty() && ALL_CAPS.is_match(line.trim())
}

fn eligible(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.chars().count() >= 3
        && trimmed.chars().any(|c| c.is_alphabetic())
        && !matches_skip_pattern(trimmed)
}

fn no_value(name: &str) -> DetectorResult {
    DetectorResult {
        detector_name: name.to_string(),
        value: None,
        confidence: 0.0,
        evidence: String::new(),
        line: None,
    }
}

/// First line anywhere carrying a recognized business suffix.
pub fn regex_detector(text: &str) -> DetectorResult {
    for (idx, line) in lines(text).iter().enumerate() {
        let trimmed = line.trim();
        if eligible(trimmed) && has_business_suffix(trimmed) {
            return DetectorResult {
                detector_name: "regex".to_string(),
                value: Some(trimmed.to_string()),
                confidence: 0.90,
                evidence: "line carries a business suffix".to_string(),
                line: Some(idx),
            };
        }
    }
    no_value("regex")
}

/// First eligible line within the first 10 lines.
pub fn proximity_detector(text: &str) -> DetectorResult {
    for (idx, line) in lines(text).iter().enumerate().take(10) {
        let trimmed = line.trim();
        if eligible(trimmed) {
            return DetectorResult {
                detector_name: "proximity".to_string(),
                value: Some(trimmed.to_string()),
                confidence: 0.80,
                evidence: "first plausible line in document opening".to_string(),
                line: Some(idx),
            };
        }
    }
    no_value("proximity")
}

/// First ALL-CAPS header-zone line; falls back to the first non-skip header line.
pub fn position_detector(text: &str) -> DetectorResult {
    let all_lines = lines(text);
    let header_end = header_zone_end(all_lines.len());
    let header = &all_lines[..header_end.min(all_lines.len())];

    for (idx, line) in header.iter().enumerate() {
        let trimmed = line.trim();
        if eligible(trimmed) && is_all_caps(trimmed) {
            return DetectorResult {
                detector_name: "position".to_string(),
                value: Some(trimmed.to_string()),
                confidence: 0.85,
                evidence: "ALL-CAPS line in header zone".to_string(),
                line: Some(idx),
            };
        }
    }
    for (idx, line) in header.iter().enumerate() {
        let trimmed = line.trim();
        if eligible(trimmed) {
            return DetectorResult {
                detector_name: "position".to_string(),
                value: Some(trimmed.to_string()),
                confidence: 0.70,
                evidence: "first eligible header-zone line".to_string(),
                line: Some(idx),
            };
        }
    }
    no_value("position")
}

/// Weighted score within the first 15 lines: ALL-CAPS (+0.3), business
/// category word (+0.2), length in [5,40] (+0.1), earliness `(15-i)/15*0.2`.
pub fn statistical_detector(text: &str) -> DetectorResult {
    let all_lines = lines(text);
    let mut best: Option<(usize, &str, f64)> = None;

    for (i, line) in all_lines.iter().enumerate().take(15) {
        let trimmed = line.trim();
        if !eligible(trimmed) {
            continue;
        }
        let mut score = 0.0;
        if is_all_caps(trimmed) {
            score += 0.3;
        }
        if has_business_category_word(trimmed) {
            score += 0.2;
        }
        if (5..=40).contains(&trimmed.chars().count()) {
            score += 0.1;
        }
        score += (15.0 - i as f64) / 15.0 * 0.2;

        match best {
            Some((_, _, b)) if b >= score => {}
            _ => best = Some((i, trimmed, score)),
        }
    }

    match best {
        Some((idx, line, score)) => DetectorResult {
            detector_name: "statistical".to_string(),
            value: Some(line.to_string()),
            confidence: 0.65,
            evidence: format!("highest weighted score ({score:.2}) in document opening"),
            line: Some(idx),
        },
        None => no_value("statistical"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_detector_finds_business_suffix() {
        let text = "ACME SUPPLIES LTD\nReceipt #1\nTotal 150.00";
        let r = regex_detector(text);
        assert_eq!(r.value.as_deref(), Some("ACME SUPPLIES LTD"));
    }

    #[test]
    fn proximity_skips_skip_patterns() {
        let text = "RECEIPT #1\nACME LTD\nTotal 150.00";
        let r = proximity_detector(text);
        assert_eq!(r.value.as_deref(), Some("ACME LTD"));
    }

    #[test]
    fn position_prefers_all_caps_header_line() {
        let text = "Tel: 0700000000\nACME LTD\nTotal 150.00";
        let r = position_detector(text);
        assert_eq!(r.value.as_deref(), Some("ACME LTD"));
    }

    #[test]
    fn statistical_prefers_all_caps_category_word() {
        let text = "ACME MARKET\nTotal 150.00";
        let r = statistical_detector(text);
        assert_eq!(r.value.as_deref(), Some("ACME MARKET"));
    }

    #[test]
    fn short_lines_are_ineligible() {
        assert!(!eligible("12"));
        assert!(!eligible("01/02/2024"));
    }
}
