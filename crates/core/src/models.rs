use crate::error::{RecordIssue, SourceError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Substring that marks a dataset cell as failed. Rows whose name cell
/// contains it are reprocessed and never verified.
pub const ERROR_MARKER: &str = "ERROR";

/// A resolution PDF, identified by its upper-cased base name without extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub name: String,
    pub file_name: String,
    pub path: PathBuf,
}

impl SourceDocument {
    pub fn new(file_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let file_name = file_name.into();
        Self {
            name: document_name(&file_name),
            file_name,
            path: path.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SourceError::MissingFileName(path.display().to_string()))?;

        Ok(Self::new(file_name, path))
    }
}

/// `rs-0097-Foo.pdf` -> `RS-0097-FOO`
pub fn document_name(file_name: &str) -> String {
    let trimmed = file_name.trim();
    let base = match trimmed.rfind('.') {
        Some(dot) if trimmed[dot + 1..].eq_ignore_ascii_case("pdf") => &trimmed[..dot],
        _ => trimmed,
    };
    base.to_uppercase()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        f.write_str(label)
    }
}

/// One extraction attempt. A result with neither field set means nothing was
/// extracted and carries no confidence or method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub name: Option<String>,
    pub id: Option<String>,
    pub confidence: Option<Confidence>,
    pub method: Option<String>,
}

impl ExtractionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn complete(
        name: impl Into<String>,
        id: impl Into<String>,
        confidence: Confidence,
        method: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            id: Some(id.into()),
            confidence: Some(confidence),
            method: Some(method.into()),
        }
    }

    /// Builds a result from optional fields; an empty pair collapses to
    /// [`ExtractionResult::empty`].
    pub fn from_fields(
        name: Option<String>,
        id: Option<String>,
        confidence: Confidence,
        method: impl Into<String>,
    ) -> Self {
        if name.is_none() && id.is_none() {
            return Self::empty();
        }
        Self {
            name,
            id,
            confidence: Some(confidence),
            method: Some(method.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.id.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.id.is_some()
    }

    /// Only a complete, high-confidence result is trusted without review.
    pub fn needs_review(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        !(self.is_complete() && self.confidence == Some(Confidence::High))
    }

    /// Caps the confidence at `ceiling`; empty results stay empty.
    pub fn capped_at(mut self, ceiling: Confidence) -> Self {
        if let Some(confidence) = self.confidence {
            self.confidence = Some(confidence.min(ceiling));
        }
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        if !self.is_empty() {
            self.method = Some(method.into());
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TextSource {
    Fast,
    Slow,
}

impl fmt::Display for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextSource::Fast => f.write_str("fast"),
            TextSource::Slow => f.write_str("slow"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseLocation {
    pub found: bool,
    pub page_index: Option<usize>,
    pub text: String,
    pub located_via: Option<TextSource>,
}

impl ClauseLocation {
    pub fn not_found() -> Self {
        Self {
            found: false,
            page_index: None,
            text: String::new(),
            located_via: None,
        }
    }

    pub fn at(page_index: usize, text: impl Into<String>, located_via: TextSource) -> Self {
        Self {
            found: true,
            page_index: Some(page_index),
            text: text.into(),
            located_via: Some(located_via),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    pub matched_document: Option<SourceDocument>,
    pub searched_key: String,
    /// Candidates sharing the searched number; empty on a hit.
    pub suggestions: Vec<String>,
    /// Arbitrary candidates shown when nothing shares the number.
    pub available_sample: Vec<String>,
}

/// One dataset row as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub row_index: usize,
    pub key: String,
    pub name: String,
    pub id: String,
    /// Audit tag written as a bracketed suffix of the name cell.
    pub status: Option<String>,
}

impl ResolutionRecord {
    pub fn new(row_index: usize, key: impl Into<String>) -> Self {
        Self {
            row_index,
            key: key.into(),
            name: String::new(),
            id: String::new(),
            status: None,
        }
    }

    pub fn has_key(&self) -> bool {
        !self.key.trim().is_empty()
    }

    /// Both target fields filled and neither carrying the error marker.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.id.trim().is_empty()
            && !self.name.contains(ERROR_MARKER)
            && !self.id.contains(ERROR_MARKER)
    }

    pub fn name_cell(&self) -> String {
        match &self.status {
            Some(status) if !self.name.contains(ERROR_MARKER) => {
                format!("{} [{status}]", self.name)
            }
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Success,
    Review,
    Partial,
    Error,
    NoFile,
}

impl Classification {
    pub fn of(result: &ExtractionResult) -> Self {
        match (result.is_complete(), result.is_empty()) {
            (true, _) if result.needs_review() => Classification::Review,
            (true, _) => Classification::Success,
            (false, false) => Classification::Partial,
            (false, true) => Classification::Error,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Classification::Success => "SUCCESS",
            Classification::Review => "REVIEW",
            Classification::Partial => "PARTIAL",
            Classification::Error => "ERROR",
            Classification::NoFile => "NO_FILE",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordReport {
    pub row_index: usize,
    pub resolution: String,
    pub classification: Classification,
    pub file_name: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    pub confidence: Option<Confidence>,
    pub needs_review: bool,
    pub method: Option<String>,
    pub page_index: Option<usize>,
    pub located_via: Option<TextSource>,
    pub issues: Vec<RecordIssue>,
    pub suggestions: Vec<String>,
    pub available_sample: Vec<String>,
    pub excerpt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub success: usize,
    pub review: usize,
    pub partial: usize,
    pub error: usize,
    pub no_file: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn count(&mut self, classification: Classification) {
        self.processed += 1;
        match classification {
            Classification::Success => self.success += 1,
            Classification::Review => self.review += 1,
            Classification::Partial => self.partial += 1,
            Classification::Error => self.error += 1,
            Classification::NoFile => self.no_file += 1,
        }
    }

    pub fn success_rate(&self) -> f64 {
        ratio(self.success, self.processed)
    }

    pub fn data_rate(&self) -> f64 {
        ratio(self.success + self.review + self.partial, self.processed)
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub documents_loaded: usize,
    pub summary: BatchSummary,
    pub records: Vec<RecordReport>,
}

#[derive(Debug, Clone)]
pub struct ProcessingOptions {
    pub key_column: String,
    pub name_column: String,
    pub id_column: String,
    pub document_prefix: String,
    pub key_pad_width: usize,
    pub key_separator: char,
    pub max_suggestions: usize,
    pub min_text_chars: usize,
    pub watermark: Option<String>,
    pub review_fast_only: bool,
    pub excerpt_chars: usize,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            key_column: "Resolución".to_string(),
            name_column: "Usuario".to_string(),
            id_column: "Identificacion".to_string(),
            document_prefix: "RS-".to_string(),
            key_pad_width: 4,
            key_separator: '-',
            max_suggestions: 10,
            min_text_chars: 30,
            watermark: Some("CARDER".to_string()),
            review_fast_only: true,
            excerpt_chars: 800,
        }
    }
}
