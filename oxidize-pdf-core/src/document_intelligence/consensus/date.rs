//! date detectors.

use super::{header_zone_end, lines, DetectorResult};
use regex::Regex;
use std::sync::LazyLock;

/// Recognized date shapes, paired with a hint for how to interpret the
/// numeric groups. Mirrors the original's `DATE_PATTERNS` table.
#[derive(Clone, Copy)]
enum Format {
    DmyOrMdy,
    Ymd,
    DmyOrMdyShort,
    DMonY,
    MonDY,
}

static PATTERNS: LazyLock<Vec<(Regex, Format)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})\b").unwrap(),
            Format::DmyOrMdy,
        ),
        (
            Regex::new(r"\b(\d{4})[/.\-](\d{1,2})[/.\-](\d{1,2})\b").unwrap(),
            Format::Ymd,
        ),
        (
            Regex::new(r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{2})\b").unwrap(),
            Format::DmyOrMdyShort,
        ),
        (
            Regex::new(r"(?i)\b(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+(\d{4})\b")
                .unwrap(),
            Format::DMonY,
        ),
        (
            Regex::new(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+(\d{1,2}),?\s+(\d{4})\b")
                .unwrap(),
            Format::MonDY,
        ),
    ]
});

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let months = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    months
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|i| i as u32 + 1)
}

fn expand_two_digit_year(yy: u32) -> u32 {
    if yy < 50 {
        2000 + yy
    } else {
        1900 + yy
    }
}

fn is_valid(day: u32, month: u32, year: u32) -> bool {
    (1..=31).contains(&day) && (1..=12).contains(&month) && (1900..=2100).contains(&year)
}

/// Normalizes a regex capture into `YYYY-MM-DD`, or `None` if out of range.
fn normalize_capture(caps: &regex::Captures, format: Format) -> Option<String> {
    let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();

    let (day, month, year) = match format {
        Format::DmyOrMdy => {
            // Defaults to day-first; swaps only when the second group can't
            // be a valid month, meaning it must be the day instead.
            let a = num(1)?;
            let b = num(2)?;
            let year = num(3)?;
            if b > 12 {
                (b, a, year)
            } else {
                (a, b, year)
            }
        }
        Format::Ymd => {
            let year = num(1)?;
            (num(3)?, num(2)?, year)
        }
        Format::DmyOrMdyShort => {
            let a = num(1)?;
            let b = num(2)?;
            let year = expand_two_digit_year(num(3)?);
            if b > 12 {
                (b, a, year)
            } else {
                (a, b, year)
            }
        }
        Format::DMonY => {
            let day = num(1)?;
            let month = month_from_name(caps.get(2)?.as_str())?;
            let year = num(3)?;
            (day, month, year)
        }
        Format::MonDY => {
            let month = month_from_name(caps.get(1)?.as_str())?;
            let day = num(2)?;
            let year = num(3)?;
            (day, month, year)
        }
    };

    if !is_valid(day, month, year) {
        return None;
    }
    Some(format!("{year:04}-{month:02}-{day:02}"))
}

/// Finds the first valid date in `s`, returning `(normalized, matched_text)`.
pub fn normalize_date(s: &str) -> Option<(String, String)> {
    for (pattern, format) in PATTERNS.iter() {
        if let Some(caps) = pattern.captures(s) {
            if let Some(normalized) = normalize_capture(&caps, *format) {
                return Some((normalized, caps.get(0).unwrap().as_str().to_string()));
            }
        }
    }
    None
}

fn all_dates(text: &str) -> Vec<(String, String, usize)> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let mut rest = line;
        let mut consumed = 0usize;
        while let Some((normalized, raw)) = normalize_date(rest) {
            out.push((normalized, raw.clone(), idx));
            let Some(pos) = rest.find(raw.as_str()) else {
                break;
            };
            let advance = pos + raw.len();
            if advance == 0 {
                break;
            }
            consumed += advance;
            if consumed >= line.len() {
                break;
            }
            rest = &line[consumed..];
        }
    }
    out
}

fn contains_date_keyword(s: &str) -> bool {
    let lower = s.to_lowercase();
    lower.contains("date") || lower.contains("dated")
}

/// First match of any recognized date pattern anywhere in the text.
pub fn regex_detector(text: &str) -> DetectorResult {
    match all_dates(text).into_iter().next() {
        Some((normalized, raw, line)) => DetectorResult {
            detector_name: "regex".to_string(),
            value: Some(normalized),
            confidence: 0.85,
            evidence: format!("matched date pattern \"{raw}\""),
            line: Some(line),
        },
        None => no_value("regex"),
    }
}

/// Finds a `date`/`dated` line, then scans that line and the next for a date.
pub fn proximity_detector(text: &str) -> DetectorResult {
    let all_lines = lines(text);
    for (idx, line) in all_lines.iter().enumerate() {
        if contains_date_keyword(line) {
            if let Some((normalized, _raw)) = normalize_date(line) {
                return DetectorResult {
                    detector_name: "proximity".to_string(),
                    value: Some(normalized),
                    confidence: 0.90,
                    evidence: format!("date near keyword on line: \"{}\"", line.trim()),
                    line: Some(idx),
                };
            }
            if let Some(next) = all_lines.get(idx + 1) {
                if let Some((normalized, _raw)) = normalize_date(next) {
                    return DetectorResult {
                        detector_name: "proximity".to_string(),
                        value: Some(normalized),
                        confidence: 0.90,
                        evidence: format!("date on line after keyword: \"{}\"", next.trim()),
                        line: Some(idx + 1),
                    };
                }
            }
        }
    }
    no_value("proximity")
}

/// From the header zone, the first valid date.
pub fn position_detector(text: &str) -> DetectorResult {
    let all_lines = lines(text);
    let header_end = header_zone_end(all_lines.len());

    for (idx, line) in all_lines.iter().enumerate().take(header_end) {
        if let Some((normalized, raw)) = normalize_date(line) {
            return DetectorResult {
                detector_name: "position".to_string(),
                value: Some(normalized),
                confidence: 0.75,
                evidence: format!("date in header zone: \"{raw}\""),
                line: Some(idx),
            };
        }
    }
    no_value("position")
}

/// The most-recent valid date anywhere, by lexicographic order of the
/// normalized `YYYY-MM-DD` string.
pub fn statistical_detector(text: &str) -> DetectorResult {
    let dates = all_dates(text);
    let best = dates
        .iter()
        .max_by(|a, b| a.0.cmp(&b.0));

    match best {
        Some((normalized, raw, line)) => DetectorResult {
            detector_name: "statistical".to_string(),
            value: Some(normalized.clone()),
            confidence: 0.65,
            evidence: format!("most recent date found (\"{raw}\")"),
            line: Some(*line),
        },
        None => no_value("statistical"),
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
    fn normalizes_dmy_slash() {
        let (normalized, _) = normalize_date("25/12/2023").unwrap();
        assert_eq!(normalized, "2023-12-25");
    }

    #[test]
    fn normalizes_ymd() {
        let (normalized, _) = normalize_date("2023-12-25").unwrap();
        assert_eq!(normalized, "2023-12-25");
    }

    #[test]
    fn accepts_dot_separator() {
        assert_eq!(normalize_date("2024.03.01").unwrap().0, "2024-03-01");
        assert_eq!(normalize_date("01.02.2024").unwrap().0, "2024-02-01");
    }

    #[test]
    fn two_digit_year_cutoff_at_fifty() {
        assert_eq!(normalize_date("01/01/49").unwrap().0, "2049-01-01");
        assert_eq!(normalize_date("01/01/50").unwrap().0, "1950-01-01");
    }

    #[test]
    fn normalizes_day_month_name_year() {
        let (normalized, _) = normalize_date("3 Jan 2024").unwrap();
        assert_eq!(normalized, "2024-01-03");
    }

    #[test]
    fn normalizes_month_name_day_year() {
        let (normalized, _) = normalize_date("Jan 3, 2024").unwrap();
        assert_eq!(normalized, "2024-01-03");
    }

    #[test]
    fn rejects_out_of_range_month() {
        assert!(normalize_date("35/15/2023").is_none());
    }

    #[test]
    fn proximity_prefers_date_keyword_line() {
        let text = "Invoice #123\nDate: 01/02/2024\nTotal: 150.00";
        let r = proximity_detector(text);
        assert_eq!(r.value.as_deref(), Some("2024-02-01"));
    }
}
