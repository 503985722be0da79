use crate::{SourceDocument, SourceError};
use async_trait::async_trait;

/// Embedded text layer of a document: cheap, sometimes empty or incomplete.
#[async_trait]
pub trait TextLayer {
    async fn page_count(&self, document: &SourceDocument) -> Result<usize, SourceError>;

    /// Text of the zero-based `page_index`; empty when the page has no layer.
    async fn fast_text(
        &self,
        document: &SourceDocument,
        page_index: usize,
    ) -> Result<String, SourceError>;
}

/// Optical recognition of a rendered page: reliable but expensive.
#[async_trait]
pub trait Recognizer {
    async fn recognize(
        &self,
        document: &SourceDocument,
        page_index: usize,
    ) -> Result<String, SourceError>;
}
