pub mod dataset;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod locator;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod pages;
pub mod progress;
pub mod report;
pub mod sources;
pub mod traits;
pub mod verify;

#[cfg(test)]
mod testing;

pub use dataset::Dataset;
pub use error::{DatasetError, RecordIssue, SourceError};
pub use extractor::{
    diagnose_failure, extract, extract_fallback, extract_fallback_with_min_chars,
    extract_with_min_chars, MIN_TEXT_CHARS,
};
pub use ingest::{discover_pdf_files, load_documents};
pub use locator::locate;
pub use matcher::RecordMatcher;
pub use models::{
    BatchReport, BatchSummary, Classification, ClauseLocation, Confidence, ExtractionResult,
    MatchOutcome, ProcessingOptions, RecordReport, ResolutionRecord, SourceDocument, TextSource,
    ERROR_MARKER,
};
pub use normalize::normalize;
pub use orchestrator::{DocumentExtraction, ResolutionProcessor};
pub use pages::{PageCleaner, PageReader};
pub use progress::{NullProgress, ProgressCallback};
pub use report::{render_batch, render_verification, to_json};
pub use sources::{
    HttpRecognizer, LazyRecognizer, LopdfTextLayer, NoRecognizer, OcrEndpointConfig,
};
pub use traits::{Recognizer, TextLayer};
pub use verify::{FieldDiff, VerificationReport, VerifyStatus};
