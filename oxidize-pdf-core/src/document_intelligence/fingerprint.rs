//! Document fingerprinting and similarity scoring.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentFingerprint {
    pub line_count_bucket: usize,
    pub header_keywords: Vec<String>,
    pub footer_keywords: Vec<String>,
    pub has_table: bool,
    pub approximate_word_count: usize,
    pub document_type: String,
    pub vendor_name: Option<String>,
    pub currency: Option<String>,
    pub hash: String,
}

fn bucket_line_count(line_count: usize) -> usize {
    ((line_count + 2) / 5) * 5
}

/// Top-10 alphabetic tokens (length > 3) by frequency, lowercased.
fn top_keywords(lines: &[&str]) -> Vec<String> {
    use std::collections::HashMap;
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for line in lines {
        for token in line.split_whitespace() {
            let cleaned: String = token
                .chars()
                .filter(|c| c.is_alphabetic())
                .collect::<String>()
                .to_lowercase();
            if cleaned.len() > 3 {
                let entry = counts.entry(cleaned.clone()).or_insert_with(|| {
                    order.push(cleaned.clone());
                    0
                });
                *entry += 1;
            }
        }
    }
    let mut ranked = order;
    ranked.sort_by(|a, b| counts[b].cmp(&counts[a]).then_with(|| a.cmp(b)));
    ranked.truncate(10);
    ranked
}

fn canonical_hash(
    line_count_bucket: usize,
    header_keywords: &[String],
    document_type: &str,
    vendor_name: Option<&str>,
) -> String {
    let mut top5: Vec<&str> = header_keywords.iter().take(5).map(|s| s.as_str()).collect();
    top5.sort_unstable();
    let canonical = format!(
        "{}|{}|{}|{}",
        line_count_bucket,
        top5.join(","),
        document_type,
        vendor_name.unwrap_or("")
    );
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Builds a fingerprint from the raw text and the fields already extracted.
pub fn build(
    text: &str,
    document_type: &str,
    vendor_name: Option<&str>,
    currency: Option<&str>,
    has_table: bool,
) -> DocumentFingerprint {
    let lines: Vec<&str> = text.lines().collect();
    let line_count = lines.len();
    let header_end = ((line_count as f64 * 0.15) as usize).max(1).min(line_count);
    let footer_start = ((line_count as f64 * 0.80) as usize).min(line_count);

    let header_keywords = top_keywords(&lines[..header_end]);
    let footer_keywords = top_keywords(&lines[footer_start..]);
    let line_count_bucket = bucket_line_count(line_count);
    let approximate_word_count = text.split_whitespace().count();

    let hash = canonical_hash(line_count_bucket, &header_keywords, document_type, vendor_name);

    DocumentFingerprint {
        line_count_bucket,
        header_keywords,
        footer_keywords,
        has_table,
        approximate_word_count,
        document_type: document_type.to_string(),
        vendor_name: vendor_name.map(|s| s.to_string()),
        currency: currency.map(|s| s.to_string()),
        hash,
    }
}

/// Similarity in [0,1] between two fingerprints.
pub fn similarity(a: &DocumentFingerprint, b: &DocumentFingerprint) -> f64 {
    if a.hash == b.hash {
        return 1.0;
    }

    let mut score = 0.0;
    if a.document_type == b.document_type {
        score += 0.3;
    }
    match (&a.vendor_name, &b.vendor_name) {
        (Some(x), Some(y)) if x.to_lowercase() == y.to_lowercase() => score += 0.4,
        _ => {}
    }
    let (lo, hi) = if a.line_count_bucket < b.line_count_bucket {
        (a.line_count_bucket, b.line_count_bucket)
    } else {
        (b.line_count_bucket, a.line_count_bucket)
    };
    if hi > 0 && lo as f64 / hi as f64 > 0.8 {
        score += 0.1;
    }
    let shared = a
        .header_keywords
        .iter()
        .filter(|k| b.header_keywords.contains(k))
        .count();
    score += 0.05 * shared as f64;
    if a.currency.is_some() && a.currency == b.currency {
        score += 0.05;
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_hashes_identically() {
        let text = "ACME LTD\nTOTAL 150.00";
        let f1 = build(text, "receipt", Some("ACME LTD"), Some("KES"), false);
        let f2 = build(text, "receipt", Some("ACME LTD"), Some("KES"), false);
        assert_eq!(f1.hash, f2.hash);
        assert_eq!(similarity(&f1, &f2), 1.0);
    }

    #[test]
    fn different_vendor_lowers_similarity() {
        let a = build("ACME LTD\nTOTAL 150.00", "receipt", Some("ACME LTD"), Some("KES"), false);
        let b = build("OTHER CO\nTOTAL 100.00", "receipt", Some("OTHER CO"), Some("KES"), false);
        assert!(similarity(&a, &b) < 1.0);
    }

    #[test]
    fn hash_is_stable_across_calls() {
        let text = "ACME LTD\nItem 10.00\nTOTAL 150.00";
        let f1 = build(text, "receipt", Some("ACME LTD"), None, false);
        let f2 = build(text, "receipt", Some("ACME LTD"), None, false);
        assert_eq!(f1.hash, f2.hash);
        assert_eq!(f1.hash.len(), 16);
    }

    #[test]
    fn same_document_type_contributes_base_similarity() {
        let a = build("ACME LTD\nTOTAL 150.00", "receipt", Some("ACME"), None, false);
        let b = build("DIFFERENT TEXT HERE\nTOTAL 9.00", "receipt", Some("ZZZ"), None, false);
        assert!(similarity(&a, &b) >= 0.3);
    }
}
