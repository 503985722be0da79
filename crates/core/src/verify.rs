//! Comparison of already-populated records against fresh extractions.

use crate::normalize::{collapse_whitespace, digits_only};
use crate::{Confidence, ResolutionRecord, TextSource, ERROR_MARKER};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifyStatus {
    Match,
    Mismatch,
    NoFile,
}

impl VerifyStatus {
    pub fn label(self) -> &'static str {
        match self {
            VerifyStatus::Match => "MATCH",
            VerifyStatus::Mismatch => "MISMATCH",
            VerifyStatus::NoFile => "NO_FILE",
        }
    }
}

/// One disagreeing field, with both sides as they were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: &'static str,
    pub existing: String,
    pub extracted: String,
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: dataset {:?} vs document {:?}",
            self.field, self.existing, self.extracted
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationEntry {
    pub row_index: usize,
    pub resolution: String,
    pub status: VerifyStatus,
    pub file_name: Option<String>,
    pub existing_name: String,
    pub existing_id: String,
    pub extracted_name: Option<String>,
    pub extracted_id: Option<String>,
    pub confidence: Option<Confidence>,
    pub method: Option<String>,
    pub located_via: Option<TextSource>,
    pub differences: Vec<FieldDiff>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationSummary {
    pub checked: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub no_file: usize,
    pub cancelled: bool,
}

impl VerificationSummary {
    pub fn count(&mut self, status: VerifyStatus) {
        self.checked += 1;
        match status {
            VerifyStatus::Match => self.matched += 1,
            VerifyStatus::Mismatch => self.mismatched += 1,
            VerifyStatus::NoFile => self.no_file += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub generated_at: DateTime<Utc>,
    pub documents_loaded: usize,
    pub summary: VerificationSummary,
    pub entries: Vec<VerificationEntry>,
}

/// Rows with a key and both fields filled, none of them failed.
pub fn is_verifiable(record: &ResolutionRecord) -> bool {
    record.has_key()
        && !record.name.trim().is_empty()
        && !record.id.trim().is_empty()
        && !record.name.contains(ERROR_MARKER)
        && !record.id.contains(ERROR_MARKER)
}

/// Names compare case-folded without bracketed annotations; identifiers
/// compare by their digits. A field missing from the extraction disagrees.
pub fn compare(
    existing_name: &str,
    existing_id: &str,
    extracted_name: Option<&str>,
    extracted_id: Option<&str>,
) -> Vec<FieldDiff> {
    let mut differences = Vec::new();

    let name_matches =
        extracted_name.is_some_and(|name| comparable_name(name) == comparable_name(existing_name));
    if !name_matches {
        differences.push(FieldDiff {
            field: "name",
            existing: existing_name.to_string(),
            extracted: extracted_name.unwrap_or_default().to_string(),
        });
    }

    let id_matches = extracted_id.is_some_and(|id| digits_only(id) == digits_only(existing_id));
    if !id_matches {
        differences.push(FieldDiff {
            field: "id",
            existing: existing_id.to_string(),
            extracted: extracted_id.unwrap_or_default().to_string(),
        });
    }

    differences
}

fn comparable_name(name: &str) -> String {
    collapse_whitespace(&ANNOTATION_RE.replace_all(name, " ")).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_and_annotations_do_not_count() {
        assert!(compare("Jane Doe", "12345678", Some("JANE DOE"), Some("12345678")).is_empty());
        assert!(compare(
            "Jane  Doe [anchor_span/slow]",
            "12.345.678",
            Some("jane doe"),
            Some("12345678"),
        )
        .is_empty());
    }

    #[test]
    fn mismatches_report_both_sides() {
        let differences = compare("Jane Doe", "12345678", Some("John Doe"), Some("12345679"));
        assert_eq!(differences.len(), 2);
        assert_eq!(differences[0].field, "name");
        assert_eq!(differences[0].existing, "Jane Doe");
        assert_eq!(differences[0].extracted, "John Doe");
        assert_eq!(
            differences[1].to_string(),
            "id: dataset \"12345678\" vs document \"12345679\""
        );
    }

    #[test]
    fn missing_extracted_field_is_a_mismatch() {
        let differences = compare("Jane Doe", "12345678", Some("Jane Doe"), None);
        assert_eq!(differences.len(), 1);
        assert_eq!(differences[0].field, "id");
        assert_eq!(differences[0].extracted, "");
    }

    #[test]
    fn only_clean_complete_rows_are_verified() {
        let mut record = ResolutionRecord::new(0, "97");
        record.name = "Jane Doe".to_string();
        record.id = "12345678".to_string();
        assert!(is_verifiable(&record));

        record.id = "ERROR - not found".to_string();
        assert!(!is_verifiable(&record));

        record.key = " ".to_string();
        record.id = "12345678".to_string();
        assert!(!is_verifiable(&record));
    }
}
