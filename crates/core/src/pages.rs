use crate::traits::{Recognizer, TextLayer};
use crate::{SourceDocument, SourceError, TextSource};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

static NOISE_GLYPHS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[|¡¿]").expect("valid regex"));

static SPACE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]{3,}").expect("valid regex"));

static NEWLINE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Drops watermark lines and OCR noise from page text before it is searched.
#[derive(Debug, Clone, Default)]
pub struct PageCleaner {
    watermark: Option<Regex>,
}

impl PageCleaner {
    /// Lines containing `watermark`, even with its letters OCR-spaced
    /// (`C A R D E R`), are removed.
    pub fn new(watermark: Option<&str>) -> Result<Self, regex::Error> {
        let watermark = match watermark.map(str::trim).filter(|word| !word.is_empty()) {
            Some(word) => {
                let spaced = word
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| regex::escape(&c.to_string()))
                    .collect::<Vec<_>>()
                    .join(r"[ \t]*");
                Some(Regex::new(&format!(r"(?im)^[^\n]*{spaced}[^\n]*$"))?)
            }
            None => None,
        };
        Ok(Self { watermark })
    }

    pub fn clean(&self, text: &str) -> String {
        let text = match &self.watermark {
            Some(pattern) => pattern.replace_all(text, ""),
            None => text.into(),
        };
        let text = NOISE_GLYPHS_RE.replace_all(&text, "");
        let text = SPACE_RUN_RE.replace_all(&text, " ");
        NEWLINE_RUN_RE.replace_all(&text, "\n\n").trim().to_string()
    }
}

/// Reads the pages of one document for one processing pass.
///
/// Both sources are memoized per page, so recognition of a page runs at most
/// once however many phases ask for it. Collaborator failures are logged and
/// read as empty text.
pub struct PageReader<'a> {
    document: &'a SourceDocument,
    text_layer: &'a (dyn TextLayer + Send + Sync),
    recognizer: &'a (dyn Recognizer + Send + Sync),
    cleaner: &'a PageCleaner,
    page_count: Option<usize>,
    fast: HashMap<usize, String>,
    slow: HashMap<usize, Option<String>>,
}

impl<'a> PageReader<'a> {
    pub fn new(
        document: &'a SourceDocument,
        text_layer: &'a (dyn TextLayer + Send + Sync),
        recognizer: &'a (dyn Recognizer + Send + Sync),
        cleaner: &'a PageCleaner,
    ) -> Self {
        Self {
            document,
            text_layer,
            recognizer,
            cleaner,
            page_count: None,
            fast: HashMap::new(),
            slow: HashMap::new(),
        }
    }

    pub fn document(&self) -> &SourceDocument {
        self.document
    }

    pub async fn page_count(&mut self) -> usize {
        if let Some(count) = self.page_count {
            return count;
        }
        let count = match self.text_layer.page_count(self.document).await {
            Ok(count) => count,
            Err(error) => {
                warn!(document = %self.document.file_name, %error, "page count unavailable");
                0
            }
        };
        self.page_count = Some(count);
        count
    }

    pub async fn fast_text(&mut self, page_index: usize) -> String {
        if let Some(text) = self.fast.get(&page_index) {
            return text.clone();
        }
        let text = match self.text_layer.fast_text(self.document, page_index).await {
            Ok(raw) => self.cleaner.clean(&raw),
            Err(error) => {
                warn!(
                    document = %self.document.file_name,
                    page = page_index + 1,
                    %error,
                    "text layer read failed"
                );
                String::new()
            }
        };
        self.fast.insert(page_index, text.clone());
        text
    }

    /// Recognized text of a page, or `None` when recognition failed or read
    /// nothing.
    pub async fn recognized_text(&mut self, page_index: usize) -> Option<String> {
        if let Some(cached) = self.slow.get(&page_index) {
            return cached.clone();
        }
        debug!(document = %self.document.file_name, page = page_index + 1, "recognizing page");
        let text = match self.recognizer.recognize(self.document, page_index).await {
            Ok(raw) => Some(self.cleaner.clean(&raw)).filter(|text| !text.is_empty()),
            Err(error @ SourceError::NotConfigured(_)) => {
                debug!(document = %self.document.file_name, %error, "recognition skipped");
                None
            }
            Err(error) => {
                warn!(
                    document = %self.document.file_name,
                    page = page_index + 1,
                    %error,
                    "recognition failed"
                );
                None
            }
        };
        self.slow.insert(page_index, text.clone());
        text
    }

    /// Recognized text, falling back to the text layer.
    pub async fn best_text(&mut self, page_index: usize) -> (String, TextSource) {
        match self.recognized_text(page_index).await {
            Some(text) => (text, TextSource::Slow),
            None => (self.fast_text(page_index).await, TextSource::Fast),
        }
    }

    /// Text of the page from the source other than `source`; empty when that
    /// source has nothing.
    pub async fn alternate_text(&mut self, page_index: usize, source: TextSource) -> String {
        match source {
            TextSource::Slow => self.fast_text(page_index).await,
            TextSource::Fast => self.recognized_text(page_index).await.unwrap_or_default(),
        }
    }

    /// Number of distinct pages sent to the recognizer so far.
    pub fn recognitions(&self) -> usize {
        self.slow.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaner_drops_spaced_watermark_lines() {
        let cleaner = PageCleaner::new(Some("CARDER")).expect("watermark pattern");
        let text = "RESUELVE:\nC A R D E R\nARTÍCULO PRIMERO | otorgar\n\n\n\na favor de";
        assert_eq!(
            cleaner.clean(text),
            "RESUELVE:\n\nARTÍCULO PRIMERO  otorgar\n\na favor de"
        );
    }

    #[test]
    fn cleaner_without_watermark_only_collapses_noise() {
        let cleaner = PageCleaner::default();
        assert_eq!(cleaner.clean("  a     b ¿c  "), "a b c");
    }
}
