//! Learning Memory: a small persistent store of
//! fingerprints, remembered field positions, user corrections and vendor
//! rules, safe under concurrent readers and writers.

use crate::document_intelligence::fingerprint::{self, DocumentFingerprint};
use crate::document_intelligence::{DocIntelError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub const DEFAULT_MAX_ENTRIES: usize = 1000;
const MATCH_THRESHOLD: f64 = 0.6;
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldPosition {
    pub field_name: String,
    pub zone: String,
    pub line_percentage: f64,
    pub alignment: String,
    pub near_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCorrection {
    pub field_name: String,
    pub original_value: String,
    pub corrected_value: String,
    pub document_type: String,
    pub vendor_name: Option<String>,
    pub timestamp: String,
    pub correction_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorRule {
    pub vendor_name: String,
    pub field_name: String,
    pub extraction_hint: String,
    pub expected_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningMemoryEntry {
    pub fingerprint: DocumentFingerprint,
    #[serde(default)]
    pub field_positions: Vec<FieldPosition>,
    #[serde(default)]
    pub corrections: Vec<UserCorrection>,
    #[serde(default)]
    pub vendor_rules: Vec<VendorRule>,
    pub times_seen: u64,
    #[serde(default)]
    pub times_confirmed: u64,
    pub first_seen: String,
    pub last_seen: String,
}

impl LearningMemoryEntry {
    fn utility_score(&self) -> u64 {
        self.times_seen + 2 * self.times_confirmed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct MemoryStore {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    entries: Vec<LearningMemoryEntry>,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

/// The outcome of looking up a fingerprint against remembered entries.
pub struct MemoryMatch {
    pub entry: LearningMemoryEntry,
    pub similarity: f64,
}

impl MemoryMatch {
    /// Confidence boost this match contributes.
    pub fn confidence_boost(&self) -> f64 {
        if self.entry.times_confirmed > 0 && self.similarity >= 0.95 {
            0.25
        } else if self.similarity >= 0.95 {
            0.15
        } else {
            0.15 * self.similarity
        }
    }
}

pub struct LearningMemory {
    path: PathBuf,
    max_entries: usize,
    store: RwLock<MemoryStore>,
}

impl LearningMemory {
    /// Loads an existing store from `path`, or starts empty if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_capacity(path, DEFAULT_MAX_ENTRIES)
    }

    /// Like [`Self::open`], but caps the store at `max_entries` on each write.
    pub fn open_with_capacity(path: impl AsRef<Path>, max_entries: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let store = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            MemoryStore::default()
        };
        Ok(LearningMemory {
            path,
            max_entries,
            store: RwLock::new(store),
        })
    }

    pub fn len(&self) -> usize {
        self.store.read().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds the best matching entry with similarity ≥ [`MATCH_THRESHOLD`],
    /// checking same-vendor candidates first.
    pub fn find_match(&self, fp: &DocumentFingerprint) -> Option<MemoryMatch> {
        let store = self.store.read().unwrap();

        let vendor_candidates: Vec<&LearningMemoryEntry> = store
            .entries
            .iter()
            .filter(|e| {
                fp.vendor_name.is_some()
                    && e.fingerprint.vendor_name.as_deref().map(|v| v.to_lowercase())
                        == fp.vendor_name.as_deref().map(|v| v.to_lowercase())
            })
            .collect();

        let pool: Vec<&LearningMemoryEntry> = if vendor_candidates.is_empty() {
            store.entries.iter().collect()
        } else {
            vendor_candidates
        };

        pool.into_iter()
            .map(|e| (e, fingerprint::similarity(fp, &e.fingerprint)))
            .filter(|(_, sim)| *sim >= MATCH_THRESHOLD)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(e, sim)| MemoryMatch {
                entry: e.clone(),
                similarity: sim,
            })
    }

    /// Records a document sighting: creates a new entry or bumps `times_seen`.
    pub fn learn_from_document(
        &self,
        fp: DocumentFingerprint,
        field_positions: Vec<FieldPosition>,
        confirmed: bool,
        now: &str,
    ) -> Result<()> {
        {
            let mut store = self.store.write().unwrap();
            match store.entries.iter_mut().find(|e| e.fingerprint.hash == fp.hash) {
                Some(entry) => {
                    entry.times_seen += 1;
                    entry.last_seen = now.to_string();
                    if confirmed {
                        entry.times_confirmed += 1;
                    }
                }
                None => {
                    store.entries.push(LearningMemoryEntry {
                        fingerprint: fp,
                        field_positions,
                        corrections: Vec::new(),
                        vendor_rules: Vec::new(),
                        times_seen: 1,
                        times_confirmed: if confirmed { 1 } else { 0 },
                        first_seen: now.to_string(),
                        last_seen: now.to_string(),
                    });
                }
            }
            prune(&mut store.entries, self.max_entries);
        }
        self.persist()
    }

    /// Records or increments a user correction for `(field_name, original_value)`.
    pub fn record_correction(&self, fp_hash: &str, correction: UserCorrection) -> Result<()> {
        {
            let mut store = self.store.write().unwrap();
            let Some(entry) = store.entries.iter_mut().find(|e| e.fingerprint.hash == fp_hash) else {
                return Err(DocIntelError::InvariantViolation(format!(
                    "cannot record correction for unknown fingerprint {fp_hash}"
                )));
            };
            match entry.corrections.iter_mut().find(|c| {
                c.field_name == correction.field_name && c.original_value == correction.original_value
            }) {
                Some(existing) => existing.correction_count += 1,
                None => entry.corrections.push(correction),
            }
        }
        self.persist()
    }

    /// Upserts a vendor rule keyed by `(vendor_name, field_name)`.
    pub fn add_vendor_rule(&self, fp_hash: &str, rule: VendorRule) -> Result<()> {
        {
            let mut store = self.store.write().unwrap();
            let Some(entry) = store.entries.iter_mut().find(|e| e.fingerprint.hash == fp_hash) else {
                return Err(DocIntelError::InvariantViolation(format!(
                    "cannot add vendor rule for unknown fingerprint {fp_hash}"
                )));
            };
            match entry
                .vendor_rules
                .iter_mut()
                .find(|r| r.vendor_name == rule.vendor_name && r.field_name == rule.field_name)
            {
                Some(existing) => *existing = rule,
                None => entry.vendor_rules.push(rule),
            }
        }
        self.persist()
    }

    /// Atomically writes the store to disk (temp file + rename).
    fn persist(&self) -> Result<()> {
        let store = self.store.read().unwrap();
        let json = serde_json::to_vec_pretty(&*store)?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.persist(&self.path).map_err(|e| DocIntelError::MemoryIo(e.error))?;
        Ok(())
    }
}

/// Keeps at most `max_entries`, preserving the highest `times_seen + 2*times_confirmed`.
fn prune(entries: &mut Vec<LearningMemoryEntry>, max_entries: usize) {
    if entries.len() <= max_entries {
        return;
    }
    entries.sort_by(|a, b| b.utility_score().cmp(&a.utility_score()));
    entries.truncate(max_entries);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_intelligence::fingerprint::build;

    fn sample_fingerprint(vendor: &str) -> DocumentFingerprint {
        build(
            &format!("{vendor}\nTOTAL 150.00"),
            "receipt",
            Some(vendor),
            Some("KES"),
            false,
        )
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        {
            let mem = LearningMemory::open(&path).unwrap();
            mem.learn_from_document(sample_fingerprint("ACME LTD"), vec![], false, "2026-01-01")
                .unwrap();
        }
        let reopened = LearningMemory::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn repeated_sighting_increments_times_seen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let mem = LearningMemory::open(&path).unwrap();
        let fp = sample_fingerprint("ACME LTD");
        mem.learn_from_document(fp.clone(), vec![], false, "2026-01-01").unwrap();
        mem.learn_from_document(fp.clone(), vec![], true, "2026-01-02").unwrap();
        let found = mem.find_match(&fp).unwrap();
        assert_eq!(found.entry.times_seen, 2);
        assert_eq!(found.entry.times_confirmed, 1);
    }

    #[test]
    fn find_match_requires_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let mem = LearningMemory::open(&path).unwrap();
        mem.learn_from_document(sample_fingerprint("ACME LTD"), vec![], false, "2026-01-01")
            .unwrap();
        let unrelated = build("totally unrelated text\nno receipt shape", "letter", None, None, false);
        assert!(mem.find_match(&unrelated).is_none());
    }

    #[test]
    fn pruning_keeps_cap() {
        let mut entries = Vec::new();
        for i in 0..(DEFAULT_MAX_ENTRIES + 5) {
            entries.push(LearningMemoryEntry {
                fingerprint: sample_fingerprint(&format!("V{i}")),
                field_positions: vec![],
                corrections: vec![],
                vendor_rules: vec![],
                times_seen: i as u64,
                times_confirmed: 0,
                first_seen: "2026-01-01".into(),
                last_seen: "2026-01-01".into(),
            });
        }
        prune(&mut entries, DEFAULT_MAX_ENTRIES);
        assert_eq!(entries.len(), DEFAULT_MAX_ENTRIES);
    }
}
