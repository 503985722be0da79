use crate::{SourceDocument, SourceError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Loads every resolution PDF under `folder` whose name starts with `prefix`
/// (case-insensitive). When two files share a normalized name, the first in
/// path order wins.
pub fn load_documents(folder: &Path, prefix: &str) -> Result<Vec<SourceDocument>, SourceError> {
    let files = discover_pdf_files(folder);

    if files.is_empty() {
        return Err(SourceError::InvalidArgument(format!(
            "no pdf files found in {}",
            folder.display()
        )));
    }

    let prefix = prefix.to_uppercase();
    let mut seen = HashSet::new();
    let mut documents = Vec::new();
    let mut ignored = 0usize;

    for path in files {
        let document = SourceDocument::from_path(&path)?;
        if !document.name.starts_with(&prefix) {
            ignored += 1;
            continue;
        }
        if !seen.insert(document.name.clone()) {
            warn!(path = %path.display(), name = %document.name, "duplicate document name ignored");
            continue;
        }
        documents.push(document);
    }

    info!(
        folder = %folder.display(),
        loaded = documents.len(),
        ignored,
        "documents loaded"
    );
    Ok(documents)
}
