//! Layout Analyzer: groups OCR words into lines, assigns
//! zones, detects alignment, prominence, and tables.

use crate::document_intelligence::word::OcrWord;
use serde::{Deserialize, Serialize};

pub const HEADER_ZONE_PERCENT: f64 = 0.15;
pub const FOOTER_ZONE_PERCENT: f64 = 0.80;
pub const PROMINENCE_THRESHOLD: f64 = 1.3;
const MIN_TABLE_COLUMNS: usize = 2;
const MIN_TABLE_ROWS: usize = 2;
const COLUMN_TOLERANCE: f64 = 20.0;
const MIN_GAP_FOR_TABLE: f64 = 30.0;
const MARGIN: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    Header,
    Body,
    Footer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutLine {
    pub words: Vec<OcrWord>,
    pub zone: Zone,
    pub alignment: Alignment,
    pub avg_word_height: f64,
    pub is_prominent: bool,
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl LayoutLine {
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCell {
    pub text: String,
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedTable {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutAnalysis {
    pub page_width: f64,
    pub page_height: f64,
    pub header_end: f64,
    pub footer_start: f64,
    pub lines: Vec<LayoutLine>,
    pub tables: Vec<DetectedTable>,
}

impl LayoutAnalysis {
    pub fn get_header_text(&self) -> String {
        self.lines
            .iter()
            .filter(|l| l.zone == Zone::Header)
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn get_footer_text(&self) -> String {
        self.lines
            .iter()
            .filter(|l| l.zone == Zone::Footer)
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn get_prominent_text(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter(|l| l.is_prominent)
            .map(|l| l.text())
            .collect()
    }

    pub fn header_lines(&self) -> impl Iterator<Item = &LayoutLine> {
        self.lines.iter().filter(|l| l.zone == Zone::Header)
    }

    pub fn footer_lines(&self) -> impl Iterator<Item = &LayoutLine> {
        self.lines.iter().filter(|l| l.zone == Zone::Footer)
    }
}

/// Assigns a zone from a vertical center position relative to page height.
pub fn zone_for(center_y: f64, page_height: f64) -> Zone {
    if page_height <= 0.0 {
        return Zone::Body;
    }
    let ratio = center_y / page_height;
    if ratio <= HEADER_ZONE_PERCENT {
        Zone::Header
    } else if ratio >= FOOTER_ZONE_PERCENT {
        Zone::Footer
    } else {
        Zone::Body
    }
}

/// Runs the full layout analysis over an unordered bag of OCR words.
pub fn analyze(words: &[OcrWord]) -> LayoutAnalysis {
    if words.is_empty() {
        return LayoutAnalysis {
            page_width: 0.0,
            page_height: 0.0,
            header_end: 0.0,
            footer_start: 0.0,
            lines: Vec::new(),
            tables: Vec::new(),
        };
    }

    let page_width = words
        .iter()
        .map(|w| w.right())
        .fold(0.0_f64, f64::max)
        + MARGIN;
    let page_height = words
        .iter()
        .map(|w| w.bottom())
        .fold(0.0_f64, f64::max)
        + MARGIN;

    let mut by_line: std::collections::BTreeMap<u32, Vec<OcrWord>> = std::collections::BTreeMap::new();
    for w in words {
        by_line.entry(w.line_num).or_default().push(w.clone());
    }

    let mut raw_lines: Vec<Vec<OcrWord>> = Vec::new();
    for (_, mut line_words) in by_line {
        line_words.sort_by(|a, b| a.left.partial_cmp(&b.left).unwrap());
        raw_lines.push(line_words);
    }

    let heights: Vec<f64> = raw_lines
        .iter()
        .map(|line| line.iter().map(|w| w.height).sum::<f64>() / line.len() as f64)
        .collect();
    let median_height = median(&heights);

    let mut lines: Vec<LayoutLine> = raw_lines
        .into_iter()
        .map(|line_words| build_line(line_words, page_width, page_height, median_height))
        .collect();

    let tables = detect_tables(&lines);

    lines.sort_by(|a, b| a.top.partial_cmp(&b.top).unwrap());

    LayoutAnalysis {
        page_width,
        page_height,
        header_end: page_height * HEADER_ZONE_PERCENT,
        footer_start: page_height * FOOTER_ZONE_PERCENT,
        lines,
        tables,
    }
}

fn build_line(words: Vec<OcrWord>, page_width: f64, page_height: f64, median_height: f64) -> LayoutLine {
    let left = words.iter().map(|w| w.left).fold(f64::INFINITY, f64::min);
    let right = words.iter().map(|w| w.right()).fold(0.0_f64, f64::max);
    let top = words.iter().map(|w| w.top).fold(f64::INFINITY, f64::min);
    let bottom = words.iter().map(|w| w.bottom()).fold(0.0_f64, f64::max);
    let avg_word_height = words.iter().map(|w| w.height).sum::<f64>() / words.len() as f64;
    let center_y = (top + bottom) / 2.0;

    let left_margin = left;
    let right_margin = page_width - right;
    let alignment = if (left_margin - right_margin).abs() <= 50.0 {
        Alignment::Center
    } else if right_margin < 50.0 && left_margin > 100.0 {
        Alignment::Right
    } else {
        Alignment::Left
    };

    let is_prominent = median_height > 0.0 && avg_word_height > PROMINENCE_THRESHOLD * median_height;

    LayoutLine {
        words,
        zone: zone_for(center_y, page_height),
        alignment,
        avg_word_height,
        is_prominent,
        left,
        right,
        top,
        bottom,
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Heuristic table detection: clusters consecutive multi-word lines with a
/// wide inter-word gap whose column starts line up within tolerance.
fn detect_tables(lines: &[LayoutLine]) -> Vec<DetectedTable> {
    let mut candidates: Vec<&LayoutLine> = Vec::new();
    let mut tables = Vec::new();

    for line in lines {
        let has_gap = line
            .words
            .windows(2)
            .any(|pair| pair[1].left - pair[0].right() > MIN_GAP_FOR_TABLE);
        if line.words.len() >= MIN_TABLE_COLUMNS && has_gap {
            if let Some(first) = candidates.first() {
                if columns_match(first, line) {
                    candidates.push(line);
                    continue;
                } else {
                    flush_table(&candidates, &mut tables);
                    candidates = vec![line];
                }
            } else {
                candidates = vec![line];
            }
        } else {
            flush_table(&candidates, &mut tables);
            candidates.clear();
        }
    }
    flush_table(&candidates, &mut tables);
    tables
}

fn columns_match(reference: &LayoutLine, candidate: &LayoutLine) -> bool {
    if reference.words.len() != candidate.words.len() {
        return false;
    }
    reference
        .words
        .iter()
        .zip(candidate.words.iter())
        .all(|(a, b)| (a.left - b.left).abs() <= COLUMN_TOLERANCE)
}

fn flush_table(candidates: &[&LayoutLine], tables: &mut Vec<DetectedTable>) {
    if candidates.len() < MIN_TABLE_ROWS {
        return;
    }
    let cols = candidates[0].words.len();
    let mut cells = Vec::new();
    for (row, line) in candidates.iter().enumerate() {
        for (col, word) in line.words.iter().enumerate() {
            cells.push(TableCell {
                text: word.text.clone(),
                row,
                col,
            });
        }
    }
    tables.push(DetectedTable {
        rows: candidates.len(),
        cols,
        cells,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, left: f64, top: f64, line: u32) -> OcrWord {
        OcrWord::new(text, left, top, text.len() as f64 * 8.0, 20.0, 90.0, line)
    }

    #[test]
    fn empty_input_yields_empty_analysis() {
        let analysis = analyze(&[]);
        assert!(analysis.lines.is_empty());
        assert_eq!(analysis.page_height, 0.0);
    }

    #[test]
    fn header_and_footer_zones_assigned_by_position() {
        let words = vec![
            word("ACME", 0.0, 0.0, 0),
            word("TOTAL", 0.0, 780.0, 10),
        ];
        let analysis = analyze(&words);
        let header_zone = analysis
            .lines
            .iter()
            .find(|l| l.text() == "ACME")
            .unwrap()
            .zone;
        assert_eq!(header_zone, Zone::Header);
    }

    #[test]
    fn prominent_line_exceeds_threshold() {
        let mut words = vec![word("small", 0.0, 0.0, 0)];
        let mut big = word("BIG", 0.0, 30.0, 1);
        big.height = 50.0;
        words.push(big);
        let analysis = analyze(&words);
        let big_line = analysis.lines.iter().find(|l| l.text() == "BIG").unwrap();
        assert!(big_line.is_prominent);
    }

    #[test]
    fn table_requires_min_rows_and_columns() {
        let words = vec![
            word("Item", 0.0, 0.0, 0),
            word("Price", 100.0, 0.0, 0),
            word("Widget", 0.0, 20.0, 1),
            word("10.00", 100.0, 20.0, 1),
        ];
        let analysis = analyze(&words);
        assert_eq!(analysis.tables.len(), 1);
        assert_eq!(analysis.tables[0].rows, 2);
        assert_eq!(analysis.tables[0].cols, 2);
    }

    #[test]
    fn header_text_lookup() {
        let words = vec![word("ACME", 0.0, 0.0, 0), word("TOTAL", 0.0, 780.0, 10)];
        let analysis = analyze(&words);
        assert_eq!(analysis.get_header_text(), "ACME");
    }
}
