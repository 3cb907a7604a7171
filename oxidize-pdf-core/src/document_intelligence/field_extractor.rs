//! Non-consensus field extraction and document-type classification.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    BirthCertificate,
    NationalId,
    Passport,
    DrivingLicense,
    Invoice,
    Receipt,
    Form,
    Letter,
    Unknown,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::BirthCertificate => "birth_certificate",
            DocumentType::NationalId => "national_id",
            DocumentType::Passport => "passport",
            DocumentType::DrivingLicense => "driving_license",
            DocumentType::Invoice => "invoice",
            DocumentType::Receipt => "receipt",
            DocumentType::Form => "form",
            DocumentType::Letter => "letter",
            DocumentType::Unknown => "unknown",
        }
    }

    pub fn is_government_id(&self) -> bool {
        matches!(
            self,
            DocumentType::BirthCertificate
                | DocumentType::NationalId
                | DocumentType::Passport
                | DocumentType::DrivingLicense
        )
    }
}

/// Tagged extra fields, shaped by `document_type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub place_of_birth: Option<String>,
    pub id_number: Option<String>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub issuing_authority: Option<String>,
    pub institution_name: Option<String>,
    pub form_title: Option<String>,
    pub sender: Option<String>,
    pub subject: Option<String>,
    pub currency: Option<String>,
    #[serde(default)]
    pub identifiers: HashMap<String, String>,
}

/// Decides the document type by keyword priority.
pub fn detect_document_type(text: &str) -> DocumentType {
    let lower = text.to_lowercase();
    let has = |s: &str| lower.contains(s);

    if has("birth certificate") || has("certificate of birth") {
        return DocumentType::BirthCertificate;
    }
    if has("national id") || has("national identity card") || has("huduma namba") {
        return DocumentType::NationalId;
    }
    if has("passport") {
        return DocumentType::Passport;
    }
    if has("driving license") || has("driving licence") || has("driver's license") {
        return DocumentType::DrivingLicense;
    }
    let mentions_invoice_markers = has("invoice") || has("due date");
    let mentions_receipt_markers = has("receipt") || has("total") || has("amount");
    if mentions_invoice_markers {
        return DocumentType::Invoice;
    }
    if mentions_receipt_markers {
        return DocumentType::Receipt;
    }
    if has("form") || has("application") || has("registration") {
        return DocumentType::Form;
    }
    if has("dear ") || has("sincerely") || has("yours faithfully") || has("yours sincerely") {
        return DocumentType::Letter;
    }
    DocumentType::Unknown
}

struct LabelPattern {
    regex: Regex,
}

impl LabelPattern {
    fn new(labels: &[&str], value: &str) -> Self {
        let joined = labels.join("|");
        let pattern = format!(r"(?i)(?:{joined})\s*[:.]?\s*({value})");
        LabelPattern {
            regex: Regex::new(&pattern).unwrap(),
        }
    }

    fn find(&self, text: &str) -> Option<String> {
        self.regex
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    }
}

static NAME_VALUE: &str = r"[A-Z][A-Za-z'.\-]*(?:[ \t]+[A-Z][A-Za-z'.\-]*){0,4}";
static ALNUM_VALUE: &str = r"[A-Za-z0-9/\-]{3,20}";

static NAME_PATTERN: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::new(&["NAME", "FULL NAME", "NAME OF CHILD"], NAME_VALUE));
static DOB_PATTERN: LazyLock<LabelPattern> = LazyLock::new(|| {
    LabelPattern::new(&["DATE OF BIRTH", "BORN ON", "D\\.O\\.B\\."], r"[0-9/.\-]{6,12}")
});
static ID_NUMBER_PATTERN: LazyLock<LabelPattern> = LazyLock::new(|| {
    LabelPattern::new(&["CERTIFICATE NO", "ID NO", "ENTRY NO", "NO\\."], ALNUM_VALUE)
});
static FATHER_PATTERN: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::new(&["FATHER"], NAME_VALUE));
static MOTHER_PATTERN: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::new(&["MOTHER", "MAIDEN NAME"], NAME_VALUE));
static PLACE_OF_BIRTH_PATTERN: LazyLock<LabelPattern> = LazyLock::new(|| {
    LabelPattern::new(&["PLACE OF BIRTH", "DISTRICT", "SUB-COUNTY"], NAME_VALUE)
});

static ISSUING_AUTHORITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(republic of kenya|director of civil registration|registrar[a-z ]*)").unwrap()
});

static INSTITUTION_WORDS: &[&str] = &[
    "university", "school", "college", "institute", "academy", "hospital", "clinic",
];
static FORM_TITLE_WORDS: &[&str] = &["form", "registration", "application", "admission", "report"];

static REG_NO_PATTERN: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::new(&["reg no", "student no", "admission no"], ALNUM_VALUE));
static ID_NO_PATTERN: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::new(&["id no"], ALNUM_VALUE));
static SUBJECT_PATTERN: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::new(&["RE", "REF", "SUBJECT"], r".{3,80}"));

static CURRENCY_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)\bKES\b|\bKSH\b|\bKSHS\b").unwrap(), "KES"),
        (Regex::new(r"(?i)\$|USD").unwrap(), "USD"),
        (Regex::new(r"€|(?i)EUR").unwrap(), "EUR"),
        (Regex::new(r"£|(?i)GBP").unwrap(), "GBP"),
    ]
});

/// Scans cleaned text for a currency marker, defaulting to `KES` (East
/// Africa) when none is found.
pub fn detect_currency(text: &str) -> Option<String> {
    for (pattern, code) in CURRENCY_PATTERNS.iter() {
        if pattern.is_match(text) {
            return Some(code.to_string());
        }
    }
    Some("KES".to_string())
}

fn first_non_numeric_line(lines: &[&str], limit: usize) -> Option<String> {
    lines
        .iter()
        .take(limit)
        .find(|l| {
            let trimmed = l.trim();
            !trimmed.is_empty() && trimmed.chars().any(|c| c.is_alphabetic())
        })
        .map(|l| l.trim().to_string())
}

/// Extracts government-ID fields.
fn extract_government_id_fields(text: &str) -> ExtractedFields {
    ExtractedFields {
        full_name: NAME_PATTERN.find(text),
        date_of_birth: DOB_PATTERN.find(text),
        place_of_birth: PLACE_OF_BIRTH_PATTERN.find(text),
        id_number: ID_NUMBER_PATTERN.find(text),
        father_name: FATHER_PATTERN.find(text),
        mother_name: MOTHER_PATTERN.find(text),
        issuing_authority: ISSUING_AUTHORITY_RE
            .find(text)
            .map(|m| m.as_str().to_string()),
        ..Default::default()
    }
}

fn extract_form_fields(text: &str) -> ExtractedFields {
    let lines: Vec<&str> = text.lines().collect();
    let institution_name = lines
        .iter()
        .take(10)
        .find(|l| {
            let lower = l.to_lowercase();
            INSTITUTION_WORDS.iter().any(|w| lower.contains(w))
        })
        .map(|l| l.trim().to_string())
        .or_else(|| first_non_numeric_line(&lines, 5));

    let form_title = lines
        .iter()
        .find(|l| {
            let lower = l.to_lowercase();
            FORM_TITLE_WORDS.iter().any(|w| lower.contains(w))
        })
        .map(|l| l.trim().to_string());

    let mut identifiers = HashMap::new();
    if let Some(v) = REG_NO_PATTERN.find(text) {
        identifiers.insert("registration_number".to_string(), v);
    }
    if let Some(v) = ID_NO_PATTERN.find(text) {
        identifiers.insert("id_number".to_string(), v);
    }

    ExtractedFields {
        institution_name,
        form_title,
        identifiers,
        ..Default::default()
    }
}

fn extract_letter_fields(text: &str) -> ExtractedFields {
    let lines: Vec<&str> = text.lines().collect();
    ExtractedFields {
        sender: first_non_numeric_line(&lines, 5),
        subject: SUBJECT_PATTERN.find(text),
        ..Default::default()
    }
}

/// Extracts the document-type-specific fields beyond the consensus-voted
/// critical fields. Dispatches on `document_type`.
pub fn extract(text: &str, document_type: DocumentType) -> ExtractedFields {
    let mut fields = match document_type {
        dt if dt.is_government_id() => extract_government_id_fields(text),
        DocumentType::Form => extract_form_fields(text),
        DocumentType::Letter => extract_letter_fields(text),
        _ => ExtractedFields::default(),
    };
    fields.currency = detect_currency(text);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_birth_certificate() {
        assert_eq!(
            detect_document_type("REPUBLIC OF KENYA\nBIRTH CERTIFICATE\nName: Jane Doe"),
            DocumentType::BirthCertificate
        );
    }

    #[test]
    fn invoice_wins_over_receipt_when_both_markers_present() {
        let text = "RECEIPT\nINVOICE #123\nTOTAL 150.00";
        assert_eq!(detect_document_type(text), DocumentType::Invoice);
    }

    #[test]
    fn due_date_alone_classifies_as_invoice() {
        assert_eq!(detect_document_type("Due Date: 01/02/2024"), DocumentType::Invoice);
    }

    #[test]
    fn classifies_plain_receipt() {
        assert_eq!(detect_document_type("ACME LTD\nTOTAL: 150.00"), DocumentType::Receipt);
    }

    #[test]
    fn extracts_name_and_dob_from_birth_certificate() {
        let text = "BIRTH CERTIFICATE\nNAME: Jane Wanjiru Doe\nDATE OF BIRTH: 01/02/2000\nFATHER: John Doe";
        let fields = extract(text, DocumentType::BirthCertificate);
        assert_eq!(fields.full_name.as_deref(), Some("Jane Wanjiru Doe"));
        assert_eq!(fields.date_of_birth.as_deref(), Some("01/02/2000"));
        assert_eq!(fields.father_name.as_deref(), Some("John Doe"));
    }

    #[test]
    fn extracts_form_institution_and_title() {
        let text = "NAIROBI UNIVERSITY\nAPPLICATION FORM\nStudent No: A123";
        let fields = extract(text, DocumentType::Form);
        assert_eq!(fields.institution_name.as_deref(), Some("NAIROBI UNIVERSITY"));
        assert!(fields.form_title.is_some());
        assert_eq!(fields.identifiers.get("registration_number").map(|s| s.as_str()), Some("A123"));
    }

    #[test]
    fn unknown_document_type_still_runs_best_effort() {
        let fields = extract("some arbitrary text", DocumentType::Unknown);
        assert!(fields.full_name.is_none());
    }

    #[test]
    fn detects_currency_from_code() {
        assert_eq!(detect_currency("TOTAL KES 150.00").as_deref(), Some("KES"));
        assert_eq!(detect_currency("Total: $150.00").as_deref(), Some("USD"));
        assert_eq!(detect_currency("Total: €150.00").as_deref(), Some("EUR"));
    }

    #[test]
    fn currency_defaults_to_kes_when_unmarked() {
        assert_eq!(detect_currency("ACME LTD\nTOTAL 150.00").as_deref(), Some("KES"));
    }
}
