use crate::normalize::digits_only;
use crate::{MatchOutcome, ProcessingOptions, SourceDocument};

/// Pairs a dataset key such as `Res. 97` with the document `RS-0097-...`.
#[derive(Debug, Clone)]
pub struct RecordMatcher {
    prefix: String,
    pad_width: usize,
    separator: char,
    max_suggestions: usize,
}

impl RecordMatcher {
    pub fn new(
        prefix: impl Into<String>,
        pad_width: usize,
        separator: char,
        max_suggestions: usize,
    ) -> Self {
        Self {
            prefix: prefix.into().to_uppercase(),
            pad_width,
            separator,
            max_suggestions,
        }
    }

    pub fn from_options(options: &ProcessingOptions) -> Self {
        Self::new(
            options.document_prefix.as_str(),
            options.key_pad_width,
            options.key_separator,
            options.max_suggestions,
        )
    }

    /// Tries the zero-padded number first, then the number as written for
    /// files that were never padded.
    pub fn match_key(&self, key: &str, documents: &[SourceDocument]) -> MatchOutcome {
        let digits = digits_only(key);
        if digits.is_empty() {
            return MatchOutcome {
                matched_document: None,
                searched_key: key.trim().to_string(),
                suggestions: Vec::new(),
                available_sample: self.sample(documents),
            };
        }

        let padded = format!("{digits:0>width$}", width = self.pad_width);
        let unpadded = match digits.trim_start_matches('0') {
            "" => "0".to_string(),
            trimmed => trimmed.to_string(),
        };
        let searched_key = format!("{}{padded}", self.prefix);

        let matched = [&padded, &unpadded].into_iter().find_map(|number| {
            let wanted = format!("{}{number}", self.prefix);
            documents
                .iter()
                .find(|document| self.names_match(&document.name, &wanted))
        });

        if let Some(document) = matched {
            return MatchOutcome {
                matched_document: Some(document.clone()),
                searched_key,
                suggestions: Vec::new(),
                available_sample: Vec::new(),
            };
        }

        let suggestions: Vec<String> = documents
            .iter()
            .map(|document| &document.name)
            .filter(|name| {
                name.contains(padded.as_str())
                    || name.contains(unpadded.as_str())
                    || name.starts_with(searched_key.as_str())
            })
            .take(self.max_suggestions)
            .cloned()
            .collect();

        let available_sample = if suggestions.is_empty() {
            self.sample(documents)
        } else {
            Vec::new()
        };

        MatchOutcome {
            matched_document: None,
            searched_key,
            suggestions,
            available_sample,
        }
    }

    fn names_match(&self, name: &str, wanted: &str) -> bool {
        match name.strip_prefix(wanted) {
            Some("") => true,
            Some(rest) => rest.starts_with(self.separator),
            None => false,
        }
    }

    fn sample(&self, documents: &[SourceDocument]) -> Vec<String> {
        documents
            .iter()
            .take(self.max_suggestions)
            .map(|document| document.name.clone())
            .collect()
    }
}

impl Default for RecordMatcher {
    fn default() -> Self {
        Self::from_options(&ProcessingOptions::default())
    }
}
