use crate::error::RecordIssue;
use crate::extractor::{
    diagnose_failure, extract_fallback_with_min_chars, extract_with_min_chars,
};
use crate::locator::locate;
use crate::matcher::RecordMatcher;
use crate::pages::{PageCleaner, PageReader};
use crate::progress::ProgressCallback;
use crate::traits::{Recognizer, TextLayer};
use crate::verify::{
    compare, is_verifiable, VerificationEntry, VerificationReport, VerificationSummary,
    VerifyStatus,
};
use crate::{
    BatchReport, BatchSummary, Classification, ClauseLocation, Confidence, ExtractionResult,
    MatchOutcome, ProcessingOptions, RecordReport, ResolutionRecord, SourceDocument, SourceError,
    TextSource,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

const NO_FILE_CELL: &str = "ERROR - no file";
const NOT_FOUND_CELL: &str = "ERROR - not found";
const NOT_EXTRACTED_CELL: &str = "ERROR - not extracted";

/// Everything learned from one document in one pass.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentExtraction {
    pub document: SourceDocument,
    pub location: ClauseLocation,
    pub result: ExtractionResult,
    /// The operative clause was not found and the first page was used.
    pub used_fallback: bool,
    pub text: String,
    pub text_source: Option<TextSource>,
    pub recognitions: usize,
    pub issues: Vec<RecordIssue>,
}

impl DocumentExtraction {
    /// `method/source` audit tag written next to the extracted name.
    pub fn status(&self) -> String {
        let method = self.result.method.as_deref().unwrap_or("none");
        match self.text_source {
            Some(source) => format!("{method}/{source}"),
            None => method.to_string(),
        }
    }
}

/// Drives matcher, locator and extractor over a dataset.
///
/// Records are handled strictly one at a time; the only suspension points are
/// the text layer and recognizer calls.
pub struct ResolutionProcessor<T, R>
where
    T: TextLayer,
    R: Recognizer,
{
    text_layer: T,
    recognizer: R,
    cleaner: PageCleaner,
    matcher: RecordMatcher,
    options: ProcessingOptions,
}

impl<T, R> ResolutionProcessor<T, R>
where
    T: TextLayer + Send + Sync,
    R: Recognizer + Send + Sync,
{
    pub fn new(text_layer: T, recognizer: R, options: ProcessingOptions) -> Result<Self, SourceError> {
        let cleaner = PageCleaner::new(options.watermark.as_deref())
            .map_err(|error| SourceError::InvalidArgument(format!("watermark: {error}")))?;

        Ok(Self {
            text_layer,
            recognizer,
            cleaner,
            matcher: RecordMatcher::from_options(&options),
            options,
        })
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    pub fn match_key(&self, key: &str, documents: &[SourceDocument]) -> MatchOutcome {
        self.matcher.match_key(key, documents)
    }

    /// Locates the operative clause of `document` and extracts its fields.
    pub async fn extract_document(&self, document: &SourceDocument) -> DocumentExtraction {
        let mut reader =
            PageReader::new(document, &self.text_layer, &self.recognizer, &self.cleaner);
        let location = locate(&mut reader).await;

        if !location.found {
            let (text, source) = reader.best_text(0).await;
            let result =
                extract_fallback_with_min_chars(&text, self.options.min_text_chars);
            debug!(document = %document.file_name, %source, "first page fallback");

            let mut issues = vec![RecordIssue::ClauseNotFound];
            issues.extend(result_issue(&result, &text));
            return DocumentExtraction {
                document: document.clone(),
                location,
                result,
                used_fallback: true,
                text,
                text_source: Some(source),
                recognitions: reader.recognitions(),
                issues,
            };
        }

        let page_index = location.page_index.unwrap_or_default();
        let source = location.located_via.unwrap_or(TextSource::Fast);
        let mut result = extract_with_min_chars(&location.text, self.options.min_text_chars);

        if !result.is_empty() && !result.is_complete() {
            let alternate = reader.alternate_text(page_index, source).await;
            let other = extract_with_min_chars(&alternate, self.options.min_text_chars);
            result = complete_from(result, other);
        }

        if source == TextSource::Fast && self.options.review_fast_only {
            result = result.capped_at(Confidence::Medium);
        }

        let issues = result_issue(&result, &location.text).into_iter().collect();
        DocumentExtraction {
            document: document.clone(),
            text: location.text.clone(),
            location,
            result,
            used_fallback: false,
            text_source: Some(source),
            recognitions: reader.recognitions(),
            issues,
        }
    }

    /// Fills name and id of every incomplete record in place. A failing
    /// record is reported and the batch moves on.
    pub async fn process_batch(
        &self,
        records: &mut [ResolutionRecord],
        documents: &[SourceDocument],
        progress: &dyn ProgressCallback,
    ) -> BatchReport {
        let mut summary = BatchSummary::default();
        let mut reports = Vec::new();
        progress.set_total(records.len() as u64);

        for record in records.iter_mut() {
            if !progress.should_continue() {
                warn!(row = record.row_index, "batch cancelled");
                summary.cancelled = true;
                break;
            }

            if record.has_key() {
                if record.is_complete() {
                    summary.skipped += 1;
                } else {
                    progress.set_message(record.key.clone());
                    let report = self.process_record(record, documents).await;
                    summary.count(report.classification);
                    reports.push(report);
                }
            }
            progress.inc(1);
        }

        progress.finish(format!(
            "{} processed, {} skipped",
            summary.processed, summary.skipped
        ));
        BatchReport {
            generated_at: Utc::now(),
            documents_loaded: documents.len(),
            summary,
            records: reports,
        }
    }

    async fn process_record(
        &self,
        record: &mut ResolutionRecord,
        documents: &[SourceDocument],
    ) -> RecordReport {
        let outcome = self.matcher.match_key(&record.key, documents);
        let Some(document) = outcome.matched_document else {
            record.name = NO_FILE_CELL.to_string();
            record.id = NO_FILE_CELL.to_string();
            record.status = None;
            info!(
                row = record.row_index,
                key = %record.key,
                searched = %outcome.searched_key,
                classification = Classification::NoFile.label(),
                "record classified"
            );
            return RecordReport {
                row_index: record.row_index,
                resolution: record.key.clone(),
                classification: Classification::NoFile,
                file_name: None,
                name: None,
                id: None,
                confidence: None,
                needs_review: false,
                method: None,
                page_index: None,
                located_via: None,
                issues: vec![RecordIssue::NoFile {
                    searched_key: outcome.searched_key,
                }],
                suggestions: outcome.suggestions,
                available_sample: outcome.available_sample,
                excerpt: None,
            };
        };

        let extraction = self.extract_document(&document).await;
        let result = &extraction.result;
        let classification = Classification::of(result);

        match classification {
            Classification::Error => {
                record.name = NOT_EXTRACTED_CELL.to_string();
                record.id = NOT_EXTRACTED_CELL.to_string();
                record.status = None;
            }
            _ => {
                record.name = result.name.clone().unwrap_or_else(|| NOT_FOUND_CELL.to_string());
                record.id = result.id.clone().unwrap_or_else(|| NOT_FOUND_CELL.to_string());
                record.status = Some(extraction.status());
            }
        }

        info!(
            row = record.row_index,
            key = %record.key,
            file = %document.file_name,
            classification = classification.label(),
            status = %extraction.status(),
            recognitions = extraction.recognitions,
            "record classified"
        );

        let excerpt = (classification != Classification::Success)
            .then(|| excerpt(&extraction.text, self.options.excerpt_chars))
            .filter(|text| !text.is_empty());

        RecordReport {
            row_index: record.row_index,
            resolution: record.key.clone(),
            classification,
            file_name: Some(document.file_name.clone()),
            name: result.name.clone(),
            id: result.id.clone(),
            confidence: result.confidence,
            needs_review: result.needs_review(),
            method: result.method.clone(),
            page_index: extraction.location.page_index,
            located_via: extraction.location.located_via,
            issues: extraction.issues.clone(),
            suggestions: Vec::new(),
            available_sample: Vec::new(),
            excerpt,
        }
    }

    /// Re-extracts every populated record and compares against its values.
    /// Records are left untouched.
    pub async fn verify_batch(
        &self,
        records: &[ResolutionRecord],
        documents: &[SourceDocument],
        progress: &dyn ProgressCallback,
    ) -> VerificationReport {
        let candidates: Vec<&ResolutionRecord> =
            records.iter().filter(|record| is_verifiable(record)).collect();
        let mut summary = VerificationSummary::default();
        let mut entries = Vec::new();
        progress.set_total(candidates.len() as u64);

        for record in candidates {
            if !progress.should_continue() {
                warn!(row = record.row_index, "verification cancelled");
                summary.cancelled = true;
                break;
            }
            progress.set_message(record.key.clone());

            let entry = self.verify_record(record, documents).await;
            info!(
                row = record.row_index,
                key = %record.key,
                status = entry.status.label(),
                "record verified"
            );
            summary.count(entry.status);
            entries.push(entry);
            progress.inc(1);
        }

        progress.finish(format!(
            "{} verified, {} mismatched",
            summary.checked, summary.mismatched
        ));
        VerificationReport {
            generated_at: Utc::now(),
            documents_loaded: documents.len(),
            summary,
            entries,
        }
    }

    async fn verify_record(
        &self,
        record: &ResolutionRecord,
        documents: &[SourceDocument],
    ) -> VerificationEntry {
        let outcome = self.matcher.match_key(&record.key, documents);
        let mut entry = VerificationEntry {
            row_index: record.row_index,
            resolution: record.key.clone(),
            status: VerifyStatus::NoFile,
            file_name: None,
            existing_name: record.name.clone(),
            existing_id: record.id.clone(),
            extracted_name: None,
            extracted_id: None,
            confidence: None,
            method: None,
            located_via: None,
            differences: Vec::new(),
            suggestions: outcome.suggestions,
        };
        let Some(document) = outcome.matched_document else {
            return entry;
        };

        let extraction = self.extract_document(&document).await;
        let result = extraction.result;
        entry.differences = compare(
            &record.name,
            &record.id,
            result.name.as_deref(),
            result.id.as_deref(),
        );
        entry.status = if entry.differences.is_empty() {
            VerifyStatus::Match
        } else {
            VerifyStatus::Mismatch
        };
        entry.file_name = Some(document.file_name);
        entry.extracted_name = result.name;
        entry.extracted_id = result.id;
        entry.confidence = result.confidence;
        entry.method = result.method;
        entry.located_via = extraction.text_source;
        entry
    }
}

/// Fills the field `primary` lacks from `other`; the merged pair is only
/// ever low confidence.
fn complete_from(primary: ExtractionResult, other: ExtractionResult) -> ExtractionResult {
    let fills_name = primary.name.is_none() && other.name.is_some();
    let fills_id = primary.id.is_none() && other.id.is_some();
    if !fills_name && !fills_id {
        return primary;
    }

    let method = format!(
        "{}+{}",
        primary.method.as_deref().unwrap_or("none"),
        other.method.as_deref().unwrap_or("none")
    );
    ExtractionResult::from_fields(
        primary.name.or(other.name),
        primary.id.or(other.id),
        Confidence::Low,
        method,
    )
}

fn result_issue(result: &ExtractionResult, text: &str) -> Option<RecordIssue> {
    match (&result.name, &result.id) {
        (Some(_), Some(_)) => None,
        (Some(_), None) => Some(RecordIssue::PartialExtraction {
            found: "name",
            missing: "id",
        }),
        (None, Some(_)) => Some(RecordIssue::PartialExtraction {
            found: "id",
            missing: "name",
        }),
        (None, None) => Some(RecordIssue::ExtractionFailed {
            reason: diagnose_failure(text),
        }),
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use crate::testing::{document, FakeRecognizer, FakeTextLayer};
    use std::sync::atomic::{AtomicU64, Ordering};

    const GRANT: &str = "RESUELVE: ARTÍCULO PRIMERO. Otorgar licencia a favor de la señora \
        MARÍA GARCÍA LÓPEZ, identificada con cédula de ciudadanía No. 12.345.678 expedida en Pereira.";

    const NAME_ONLY: &str = "RESUELVE: ARTÍCULO PRIMERO. Otorgar licencia a favor de JORGE IVÁN \
        SALAZAR, identificado como aparece en el expediente.";

    const ID_ONLY: &str = "RESUELVE: el titular con cédula de ciudadanía No. 75.080.900 queda notificado.";

    fn processor(
        layer: FakeTextLayer,
        recognizer: FakeRecognizer,
    ) -> ResolutionProcessor<FakeTextLayer, FakeRecognizer> {
        ResolutionProcessor::new(layer, recognizer, ProcessingOptions::default())
            .expect("default options")
    }

    fn record(row_index: usize, key: &str) -> ResolutionRecord {
        ResolutionRecord::new(row_index, key)
    }

    #[tokio::test]
    async fn fast_hit_resolves_on_one_recognition() {
        let layer = FakeTextLayer::default().with("RS-0001", &["CONSIDERANDO", GRANT, "anexo"]);
        let recognizer = FakeRecognizer::default().with(
            "RS-0001",
            &[Some("CONSIDERANDO"), Some(GRANT), Some("anexo")],
        );
        let processor = processor(layer, recognizer);

        let extraction = processor.extract_document(&document("RS-0001")).await;

        assert_eq!(extraction.location.page_index, Some(1));
        assert_eq!(extraction.result.name.as_deref(), Some("María García López"));
        assert_eq!(extraction.result.confidence, Some(Confidence::High));
        assert_eq!(extraction.status(), "anchor_span/slow");
        assert_eq!(extraction.recognitions, 1);
        assert_eq!(processor.recognizer.pages_recognized("RS-0001"), vec![1]);
    }

    #[tokio::test]
    async fn fast_only_result_is_downgraded_to_review() {
        let layer = FakeTextLayer::default().with("RS-0002", &[GRANT]);
        let recognizer = FakeRecognizer::default().with("RS-0002", &[None]);
        let processor = processor(layer, recognizer);

        let extraction = processor.extract_document(&document("RS-0002")).await;

        assert_eq!(extraction.result.confidence, Some(Confidence::Medium));
        assert!(extraction.result.needs_review());
        assert_eq!(extraction.status(), "anchor_span/fast");
    }

    #[tokio::test]
    async fn missing_field_is_filled_from_the_other_source() {
        let layer = FakeTextLayer::default().with("RS-0003", &[ID_ONLY]);
        let recognizer = FakeRecognizer::default().with("RS-0003", &[Some(NAME_ONLY)]);
        let processor = processor(layer, recognizer);

        let extraction = processor.extract_document(&document("RS-0003")).await;

        assert_eq!(extraction.result.name.as_deref(), Some("Jorge Iván Salazar"));
        assert_eq!(extraction.result.id.as_deref(), Some("75080900"));
        assert_eq!(extraction.result.confidence, Some(Confidence::Low));
        assert_eq!(
            extraction.result.method.as_deref(),
            Some("partial_name+partial_id")
        );
        assert_eq!(extraction.recognitions, 1);
    }

    #[tokio::test]
    async fn unlocated_clause_uses_first_page_fallback() {
        let first_page = "conceder al señor CARLOS ANDRÉS MEJÍA, identificado con cédula de \
            ciudadanía No. 10.123.456 el permiso";
        let layer = FakeTextLayer::default().with("RS-0004", &[first_page, "anexo"]);
        let recognizer = FakeRecognizer::default().with("RS-0004", &[Some(first_page), None]);
        let processor = processor(layer, recognizer);

        let extraction = processor.extract_document(&document("RS-0004")).await;

        assert!(extraction.used_fallback);
        assert!(!extraction.location.found);
        assert_eq!(extraction.result.name.as_deref(), Some("Carlos Andres Mejia"));
        assert_eq!(extraction.result.confidence, Some(Confidence::Low));
        assert!(extraction.issues.contains(&RecordIssue::ClauseNotFound));
        assert_eq!(processor.recognizer.pages_recognized("RS-0004"), vec![0, 1]);
    }

    #[tokio::test]
    async fn contracted_anchor_resolves_without_first_page_fallback() {
        let grant = "se otorga un permiso a favor del señor PEDRO PABLO ROJAS, identificado con \
            cédula de ciudadanía No. 9.876.543 para el predio";
        let layer = FakeTextLayer::default().with("RS-0005", &["portada del expediente", grant]);
        let recognizer = FakeRecognizer::default()
            .with("RS-0005", &[Some("portada del expediente"), Some(grant)]);
        let processor = processor(layer, recognizer);

        let extraction = processor.extract_document(&document("RS-0005")).await;

        assert!(extraction.location.found);
        assert!(!extraction.used_fallback);
        assert_eq!(extraction.location.page_index, Some(1));
        assert_eq!(extraction.result.name.as_deref(), Some("Pedro Pablo Rojas"));
        assert_eq!(extraction.result.id.as_deref(), Some("9876543"));
        assert_eq!(Classification::of(&extraction.result), Classification::Success);
    }

    #[tokio::test]
    async fn first_page_fallback_uses_configured_minimum() {
        let first_page = "conceder al señor CARLOS ANDRÉS MEJÍA, identificado con cédula de \
            ciudadanía No. 10.123.456 el permiso";
        let layer = FakeTextLayer::default().with("RS-0004", &[first_page]);
        let recognizer = FakeRecognizer::default().with("RS-0004", &[Some(first_page)]);
        let options = ProcessingOptions {
            min_text_chars: 500,
            ..ProcessingOptions::default()
        };
        let processor =
            ResolutionProcessor::new(layer, recognizer, options).expect("default watermark");

        let extraction = processor.extract_document(&document("RS-0004")).await;

        assert!(extraction.used_fallback);
        assert!(extraction.result.is_empty());
    }

    #[tokio::test]
    async fn batch_classifies_and_writes_back() {
        let layer = FakeTextLayer::default()
            .with("RS-0001", &[GRANT])
            .with("RS-0002", &[NAME_ONLY])
            .with("RS-0003", &["RESUELVE: archivar el expediente sin más trámite alguno."])
            .with("RS-0004", &[GRANT]);
        let recognizer = FakeRecognizer::default()
            .with("RS-0001", &[Some(GRANT)])
            .with("RS-0002", &[Some(NAME_ONLY)])
            .with("RS-0003", &[None])
            .with("RS-0004", &[None]);
        let processor = processor(layer, recognizer);
        let documents = vec![
            document("RS-0001"),
            document("RS-0002"),
            document("RS-0003"),
            document("RS-0004"),
        ];

        let mut done = record(4, "5");
        done.name = "Ana Ruiz [anchor_span/slow]".to_string();
        done.id = "12345678".to_string();
        let mut records = vec![
            record(0, "1"),
            record(1, "Res. 2"),
            record(2, "3"),
            record(3, "77"),
            done,
            record(5, ""),
            record(6, "4"),
        ];

        let report = processor
            .process_batch(&mut records, &documents, &NullProgress)
            .await;

        assert_eq!(report.summary.processed, 5);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.success, 1);
        assert_eq!(report.summary.review, 1);
        assert_eq!(report.summary.partial, 1);
        assert_eq!(report.summary.error, 1);
        assert_eq!(report.summary.no_file, 1);

        assert_eq!(records[0].name_cell(), "María García López [anchor_span/slow]");
        assert_eq!(records[0].id, "12345678");
        assert_eq!(records[1].name, "Jorge Iván Salazar");
        assert_eq!(records[1].id, NOT_FOUND_CELL);
        assert_eq!(records[2].name, NOT_EXTRACTED_CELL);
        assert_eq!(records[3].name_cell(), NO_FILE_CELL);
        assert_eq!(records[4].id, "12345678");
        assert_eq!(records[6].name_cell(), "María García López [anchor_span/fast]");
        assert_eq!(records[6].id, "12345678");
        assert_eq!(report.records[4].classification, Classification::Review);
        assert!(report.records[4].needs_review);

        let failed = &report.records[2];
        assert_eq!(failed.classification, Classification::Error);
        assert!(matches!(
            failed.issues.as_slice(),
            [RecordIssue::ExtractionFailed { reason }] if reason == "only 56 characters were read"
        ));
        assert_eq!(
            report.records[3].issues,
            vec![RecordIssue::NoFile {
                searched_key: "RS-0077".to_string()
            }]
        );
    }

    struct StopAfter {
        allowed: u64,
        seen: AtomicU64,
    }

    impl ProgressCallback for StopAfter {
        fn set_total(&self, _total: u64) {}
        fn inc(&self, delta: u64) {
            self.seen.fetch_add(delta, Ordering::SeqCst);
        }
        fn set_message(&self, _msg: String) {}
        fn finish(&self, _msg: String) {}
        fn should_continue(&self) -> bool {
            self.seen.load(Ordering::SeqCst) < self.allowed
        }
    }

    #[tokio::test]
    async fn batch_stops_between_records_when_cancelled() {
        let processor = processor(FakeTextLayer::default(), FakeRecognizer::default());
        let mut records = vec![record(0, "1"), record(1, "2"), record(2, "3")];
        let progress = StopAfter {
            allowed: 1,
            seen: AtomicU64::new(0),
        };

        let report = processor.process_batch(&mut records, &[], &progress).await;

        assert!(report.summary.cancelled);
        assert_eq!(report.summary.processed, 1);
        assert_eq!(records[1].name, "");
    }

    #[tokio::test]
    async fn verification_matches_case_insensitively() {
        let layer = FakeTextLayer::default().with("RS-0001", &[GRANT]);
        let recognizer = FakeRecognizer::default().with("RS-0001", &[Some(GRANT)]);
        let processor = processor(layer, recognizer);
        let documents = vec![document("RS-0001")];

        let mut same = record(0, "1");
        same.name = "MARÍA GARCÍA LÓPEZ [anchor_span/slow]".to_string();
        same.id = "12.345.678".to_string();
        let mut different = record(1, "0001");
        different.name = "María García López".to_string();
        different.id = "12345679".to_string();
        let mut missing = record(2, "2");
        missing.name = "Luis Cano".to_string();
        missing.id = "70111222".to_string();
        let mut failed = record(3, "1");
        failed.name = NO_FILE_CELL.to_string();
        failed.id = NO_FILE_CELL.to_string();

        let report = processor
            .verify_batch(&[same, different, missing, failed], &documents, &NullProgress)
            .await;

        assert_eq!(report.summary.checked, 3);
        assert_eq!(report.entries[0].status, VerifyStatus::Match);
        assert_eq!(report.entries[1].status, VerifyStatus::Mismatch);
        assert_eq!(report.entries[1].differences.len(), 1);
        assert_eq!(report.entries[1].differences[0].field, "id");
        assert_eq!(report.entries[2].status, VerifyStatus::NoFile);
    }

    #[test]
    fn excerpt_is_cut_on_char_boundary() {
        assert_eq!(excerpt("  ñandú  ", 3), "ñan...");
        assert_eq!(excerpt("corto", 800), "corto");
    }
}
