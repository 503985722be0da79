//! Finds the page holding the operative clause of a resolution.
//!
//! The search is cost-ordered. The embedded text of every page is scanned
//! first, and only the page it points at is sent to recognition. A page-by-page
//! recognition scan is the last resort, for documents whose text layer is
//! empty or misses the beneficiary line.

use crate::extractor::BENEFICIARY_ANCHOR_RE;
use crate::pages::PageReader;
use crate::{ClauseLocation, TextSource};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bR\s*E\s*S\s*U\s*E\s*L\s*V\s*E\s*:").expect("valid regex")
});

/// `RESUELVE:`, tolerating OCR letter spacing.
pub fn has_clause_marker(text: &str) -> bool {
    CLAUSE_RE.is_match(text)
}

pub fn has_beneficiary_anchor(text: &str) -> bool {
    BENEFICIARY_ANCHOR_RE.is_match(text)
}

pub async fn locate(reader: &mut PageReader<'_>) -> ClauseLocation {
    let pages = reader.page_count().await;
    if pages == 0 {
        return ClauseLocation::not_found();
    }

    let candidate = scan_fast(reader, pages).await;
    let escalated = match candidate {
        Some(page_index) => {
            let (text, via) = reader.best_text(page_index).await;
            debug!(
                document = %reader.document().file_name,
                page = page_index + 1,
                %via,
                "clause candidate re-read"
            );
            Some(ClauseLocation::at(page_index, text, via))
        }
        None => None,
    };

    if let Some(location) = &escalated {
        if has_beneficiary_anchor(&location.text) {
            return location.clone();
        }
    }

    debug!(document = %reader.document().file_name, "falling back to full recognition scan");
    match scan_recognized(reader, pages).await {
        Some(location) => location,
        None => escalated.unwrap_or_else(ClauseLocation::not_found),
    }
}

/// First page with clause and anchor, else first with the clause, else first
/// with the anchor.
async fn scan_fast(reader: &mut PageReader<'_>, pages: usize) -> Option<usize> {
    let mut clause_only = None;
    let mut anchor_only = None;

    for page_index in 0..pages {
        let text = reader.fast_text(page_index).await;
        let clause = has_clause_marker(&text);
        let anchor = has_beneficiary_anchor(&text);

        if clause && anchor {
            return Some(page_index);
        }
        if clause && clause_only.is_none() {
            clause_only = Some(page_index);
        }
        if anchor && anchor_only.is_none() {
            anchor_only = Some(page_index);
        }
    }

    clause_only.or(anchor_only)
}

async fn scan_recognized(reader: &mut PageReader<'_>, pages: usize) -> Option<ClauseLocation> {
    let mut anchor_only = None;

    for page_index in 0..pages {
        let Some(text) = reader.recognized_text(page_index).await else {
            continue;
        };
        let clause = has_clause_marker(&text);
        let anchor = has_beneficiary_anchor(&text);

        if clause && anchor {
            return Some(ClauseLocation::at(page_index, text, TextSource::Slow));
        }

        if clause {
            // The beneficiary line may sit at the top of the next page.
            if page_index + 1 < pages {
                if let Some(next) = reader.recognized_text(page_index + 1).await {
                    let joined = format!("{text}\n{next}");
                    if has_beneficiary_anchor(&joined) {
                        return Some(ClauseLocation::at(page_index, joined, TextSource::Slow));
                    }
                }
            }
            return Some(ClauseLocation::at(page_index, text, TextSource::Slow));
        }

        if anchor && anchor_only.is_none() {
            anchor_only = Some(ClauseLocation::at(page_index, text, TextSource::Slow));
        }
    }

    anchor_only
}
