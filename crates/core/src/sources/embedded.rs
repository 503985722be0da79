use crate::traits::TextLayer;
use crate::{SourceDocument, SourceError};
use async_trait::async_trait;
use lopdf::Document;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Embedded text layer read with `lopdf`.
///
/// Records are processed one after another, so only the most recently loaded
/// document is kept in memory.
#[derive(Default)]
pub struct LopdfTextLayer {
    last: Mutex<Option<(PathBuf, Arc<Document>)>>,
}

impl LopdfTextLayer {
    pub fn new() -> Self {
        Self::default()
    }

    async fn load(&self, path: &Path) -> Result<Arc<Document>, SourceError> {
        if let Some(document) = self.cached(path) {
            return Ok(document);
        }

        let owned = path.to_path_buf();
        let document = tokio::task::spawn_blocking(move || {
            Document::load(&owned).map_err(|error| SourceError::PdfParse(error.to_string()))
        })
        .await??;
        debug!(path = %path.display(), pages = document.get_pages().len(), "pdf loaded");

        let document = Arc::new(document);
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        *last = Some((path.to_path_buf(), Arc::clone(&document)));
        Ok(document)
    }

    fn cached(&self, path: &Path) -> Option<Arc<Document>> {
        let last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        last.as_ref()
            .filter(|(cached_path, _)| cached_path == path)
            .map(|(_, document)| Arc::clone(document))
    }
}

#[async_trait]
impl TextLayer for LopdfTextLayer {
    async fn page_count(&self, document: &SourceDocument) -> Result<usize, SourceError> {
        let loaded = self.load(&document.path).await?;
        Ok(loaded.get_pages().len())
    }

    async fn fast_text(
        &self,
        document: &SourceDocument,
        page_index: usize,
    ) -> Result<String, SourceError> {
        let loaded = self.load(&document.path).await?;
        let pages = loaded.get_pages().len();
        let page_number = u32::try_from(page_index + 1)
            .ok()
            .filter(|number| loaded.get_pages().contains_key(number))
            .ok_or(SourceError::PageOutOfRange {
                page: page_index + 1,
                pages,
            })?;

        tokio::task::spawn_blocking(move || {
            loaded
                .extract_text(&[page_number])
                .map_err(|error| SourceError::PdfParse(error.to_string()))
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn unreadable_pdf_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("RS-0001.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        let layer = LopdfTextLayer::new();
        let document = SourceDocument::from_path(&path)?;
        let result = layer.fast_text(&document, 0).await;

        assert!(matches!(result, Err(SourceError::PdfParse(_))));
        Ok(())
    }
}
