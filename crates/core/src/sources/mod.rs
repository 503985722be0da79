pub mod embedded;
pub mod lazy;
pub mod ocr_http;

pub use self::embedded::LopdfTextLayer;
pub use self::lazy::LazyRecognizer;
pub use self::ocr_http::{HttpRecognizer, OcrEndpointConfig};

use crate::traits::Recognizer;
use crate::{SourceDocument, SourceError};
use async_trait::async_trait;

/// Recognizer used when no OCR endpoint is configured; the pipeline then runs
/// on embedded text alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRecognizer;

#[async_trait]
impl Recognizer for NoRecognizer {
    async fn recognize(
        &self,
        _document: &SourceDocument,
        _page_index: usize,
    ) -> Result<String, SourceError> {
        Err(SourceError::NotConfigured(
            "no OCR endpoint configured".to_string(),
        ))
    }
}
