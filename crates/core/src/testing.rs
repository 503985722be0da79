//! In-memory collaborators for unit tests.

use crate::traits::{Recognizer, TextLayer};
use crate::{SourceDocument, SourceError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct FakeTextLayer {
    documents: HashMap<String, Vec<String>>,
}

impl FakeTextLayer {
    pub(crate) fn with(mut self, name: &str, pages: &[&str]) -> Self {
        self.documents
            .insert(name.to_string(), pages.iter().map(|page| page.to_string()).collect());
        self
    }
}

#[async_trait]
impl TextLayer for FakeTextLayer {
    async fn page_count(&self, document: &SourceDocument) -> Result<usize, SourceError> {
        self.documents
            .get(&document.name)
            .map(Vec::len)
            .ok_or_else(|| SourceError::PdfParse(format!("unknown document {}", document.name)))
    }

    async fn fast_text(
        &self,
        document: &SourceDocument,
        page_index: usize,
    ) -> Result<String, SourceError> {
        let pages = self
            .documents
            .get(&document.name)
            .ok_or_else(|| SourceError::PdfParse(format!("unknown document {}", document.name)))?;
        pages
            .get(page_index)
            .cloned()
            .ok_or(SourceError::PageOutOfRange {
                page: page_index + 1,
                pages: pages.len(),
            })
    }
}

/// Recognizer with scripted pages; `None` pages fail. Records every call.
#[derive(Default)]
pub(crate) struct FakeRecognizer {
    documents: HashMap<String, Vec<Option<String>>>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl FakeRecognizer {
    pub(crate) fn with(mut self, name: &str, pages: &[Option<&str>]) -> Self {
        self.documents.insert(
            name.to_string(),
            pages.iter().map(|page| page.map(str::to_string)).collect(),
        );
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn pages_recognized(&self, name: &str) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter(|(document, _)| document == name)
            .map(|(_, page)| page)
            .collect()
    }
}

#[async_trait]
impl Recognizer for FakeRecognizer {
    async fn recognize(
        &self,
        document: &SourceDocument,
        page_index: usize,
    ) -> Result<String, SourceError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((document.name.clone(), page_index));

        self.documents
            .get(&document.name)
            .and_then(|pages| pages.get(page_index))
            .cloned()
            .flatten()
            .ok_or_else(|| SourceError::OcrFailed(format!("page {} unreadable", page_index + 1)))
    }
}

pub(crate) fn document(name: &str) -> SourceDocument {
    SourceDocument::new(format!("{name}.pdf"), format!("/data/{name}.pdf"))
}
