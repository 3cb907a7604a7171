//! total_amount detectors.

use super::{
    contains_subtotal_keyword, contains_total_keyword, footer_zone_start, lines, looks_like_time,
    looks_like_year, DetectorResult,
};
use regex::Regex;
use std::sync::LazyLock;

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d][\d,]*\.?\d*").unwrap());

struct Candidate {
    value: f64,
    raw: String,
    start: usize,
    line: usize,
}

/// Finds every numeric token in `text` that isn't a bare year or a time,
/// annotated with its byte offset and line index.
fn candidates_in(text: &str) -> Vec<Candidate> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    for (line_idx, line) in text.lines().enumerate() {
        for m in AMOUNT_RE.find_iter(line) {
            let raw = m.as_str();
            if looks_like_time(raw) {
                continue;
            }
            let Ok(value) = raw.replace(',', "").parse::<f64>() else {
                continue;
            };
            if looks_like_year(value) {
                continue;
            }
            out.push(Candidate {
                value,
                raw: raw.to_string(),
                start: offset + m.start(),
                line: line_idx,
            });
        }
        offset += line.len() + 1;
    }
    out
}

fn is_subtotal_context(text: &str, start: usize) -> bool {
    let from = start.saturating_sub(20);
    let preceding = &text[from.min(text.len())..start.min(text.len())];
    contains_subtotal_keyword(preceding)
}

/// Matches a total keyword followed (eventually) by an amount not in subtotal context.
pub fn regex_detector(text: &str) -> DetectorResult {
    let candidates = candidates_in(text);
    let mut best: Option<(&Candidate, &str)> = None;

    for line in text.lines() {
        if !contains_total_keyword(line) {
            continue;
        }
        // matched keyword, used purely for evidence text
        let keyword = super::TOTAL_KEYWORDS
            .iter()
            .find(|kw| line.to_lowercase().contains(*kw))
            .copied()
            .unwrap_or("total");

        for c in candidates
            .iter()
            .filter(|c| text.lines().nth(c.line) == Some(line) && !is_subtotal_context(text, c.start))
        {
            match best {
                Some((b, _)) if b.value >= c.value => {}
                _ => best = Some((c, keyword)),
            }
        }
    }

    match best {
        Some((c, keyword)) => DetectorResult {
            detector_name: "regex".to_string(),
            value: Some(format!("{:.2}", c.value)),
            confidence: 0.85,
            evidence: format!("matched keyword '{keyword}'"),
            line: Some(c.line),
        },
        None => no_value("regex"),
    }
}

/// Scans line-by-line for a total keyword without a subtotal keyword, returns
/// the first remaining amount on that line.
pub fn proximity_detector(text: &str) -> DetectorResult {
    for (idx, line) in text.lines().enumerate() {
        if contains_total_keyword(line) && !contains_subtotal_keyword(line) {
            for m in AMOUNT_RE.find_iter(line) {
                let raw = m.as_str();
                if looks_like_time(raw) {
                    continue;
                }
                let Ok(value) = raw.replace(',', "").parse::<f64>() else {
                    continue;
                };
                if looks_like_year(value) {
                    continue;
                }
                return DetectorResult {
                    detector_name: "proximity".to_string(),
                    value: Some(format!("{:.2}", value)),
                    confidence: 0.90,
                    evidence: format!("first amount on line: \"{}\"", line.trim()),
                    line: Some(idx),
                };
            }
        }
    }
    no_value("proximity")
}

/// From the footer zone, the largest non-subtotal, non-date amount.
pub fn position_detector(text: &str) -> DetectorResult {
    let all_lines = lines(text);
    let footer_start = footer_zone_start(all_lines.len());
    let candidates = candidates_in(text);

    let best = candidates
        .iter()
        .filter(|c| c.line >= footer_start)
        .filter(|c| {
            all_lines
                .get(c.line)
                .map(|l| !contains_subtotal_keyword(l))
                .unwrap_or(true)
        })
        .max_by(|a, b| a.value.partial_cmp(&b.value).unwrap());

    match best {
        Some(c) => DetectorResult {
            detector_name: "position".to_string(),
            value: Some(format!("{:.2}", c.value)),
            confidence: 0.75,
            evidence: format!("largest amount in footer zone: \"{}\"", c.raw),
            line: Some(c.line),
        },
        None => no_value("position"),
    }
}

/// Across the whole document, the maximum amount in (0.5, 10_000_000),
/// excluding subtotal lines; confidence depends on separation from runner-up.
pub fn statistical_detector(text: &str) -> DetectorResult {
    let all_lines = lines(text);
    let mut values: Vec<(f64, usize)> = candidates_in(text)
        .into_iter()
        .filter(|c| c.value > 0.5 && c.value < 10_000_000.0)
        .filter(|c| {
            all_lines
                .get(c.line)
                .map(|l| !contains_subtotal_keyword(l))
                .unwrap_or(true)
        })
        .map(|c| (c.value, c.line))
        .collect();

    if values.is_empty() {
        return no_value("statistical");
    }

    values.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
    let (max_value, max_line) = values[0];
    let runner_up = values.get(1).map(|v| v.0);

    let confidence = match runner_up {
        Some(r) if r > 0.0 && max_value >= 1.5 * r => 0.80,
        Some(_) => 0.60,
        None => 0.70,
    };

    DetectorResult {
        detector_name: "statistical".to_string(),
        value: Some(format!("{:.2}", max_value)),
        confidence,
        evidence: "largest plausible amount in document".to_string(),
        line: Some(max_line),
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_detector_finds_total() {
        let text = "ACME LTD\nItem A 100.00\nTOTAL KES 150.00";
        let r = regex_detector(text);
        assert_eq!(r.value.as_deref(), Some("150.00"));
    }

    #[test]
    fn proximity_skips_subtotal_line() {
        let text = "SUBTOTAL 100.00\nTAX 16.00\nTOTAL 116.00";
        let r = proximity_detector(text);
        assert_eq!(r.value.as_deref(), Some("116.00"));
    }

    #[test]
    fn statistical_prefers_dominant_max() {
        let text = "line one 10.00\nline two 12.00\nline three 500.00";
        let r = statistical_detector(text);
        assert_eq!(r.value.as_deref(), Some("500.00"));
        assert_eq!(r.confidence, 0.80);
    }

    #[test]
    fn bare_years_never_accepted() {
        let text = "Copyright 2024\nAll rights reserved";
        let r = statistical_detector(text);
        assert!(r.value.is_none());
    }

    #[test]
    fn subtotal_preceding_context_excludes_amount() {
        let text = "SUBTOTAL: 100.00";
        assert!(is_subtotal_context(text, text.find("100.00").unwrap()));
    }
}
