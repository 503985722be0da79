use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("page {page} out of range for document with {pages} page(s)")]
    PageOutOfRange { page: usize, pages: usize },

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("ocr failed: {0}")]
    OcrFailed(String),

    #[error("recognizer not configured: {0}")]
    NotConfigured(String),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset has no header row")]
    MissingHeader,

    #[error("dataset is missing required column {0:?}")]
    MissingColumn(String),
}

/// Per-record outcome problems. None of these abort a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
pub enum RecordIssue {
    #[error("no document found for {searched_key}")]
    NoFile { searched_key: String },

    #[error("operative clause not found; first page fallback used")]
    ClauseNotFound,

    #[error("no field pattern matched: {reason}")]
    ExtractionFailed { reason: String },

    #[error("only the {found} was found; missing {missing}")]
    PartialExtraction {
        found: &'static str,
        missing: &'static str,
    },

    #[error("candidate {field} rejected by strategy {strategy}")]
    FieldInvalid {
        field: &'static str,
        strategy: &'static str,
    },
}

pub type Result<T, E = SourceError> = std::result::Result<T, E>;
