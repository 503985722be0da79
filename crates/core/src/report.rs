//! Plain-text and JSON renderings of batch and verification reports.

use crate::verify::{VerificationReport, VerifyStatus};
use crate::{BatchReport, Classification, RecordReport};
use std::fmt;

const NO_FILE_KEYS_PER_LINE: usize = 10;

pub fn to_json<T: serde::Serialize>(report: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

pub fn render_batch(report: &BatchReport) -> String {
    BatchText(report).to_string()
}

pub fn render_verification(report: &VerificationReport) -> String {
    VerificationText(report).to_string()
}

struct BatchText<'a>(&'a BatchReport);

impl fmt::Display for BatchText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let summary = &report.summary;

        writeln!(f, "EXTRACTION REPORT")?;
        writeln!(f, "generated: {}", report.generated_at.to_rfc3339())?;
        writeln!(f, "documents loaded: {}", report.documents_loaded)?;
        writeln!(f)?;
        writeln!(f, "processed: {}", summary.processed)?;
        writeln!(f, "skipped (already complete): {}", summary.skipped)?;
        writeln!(f, "success: {}", summary.success)?;
        writeln!(f, "review: {}", summary.review)?;
        writeln!(f, "partial: {}", summary.partial)?;
        writeln!(f, "error: {}", summary.error)?;
        writeln!(f, "no file: {}", summary.no_file)?;
        writeln!(f, "success rate: {:.1}%", summary.success_rate())?;
        writeln!(f, "data rate: {:.1}%", summary.data_rate())?;
        if summary.cancelled {
            writeln!(f, "batch was cancelled before the end")?;
        }

        section(f, report, Classification::Review, "NEEDS REVIEW")?;
        section(f, report, Classification::Partial, "PARTIAL")?;
        section(f, report, Classification::Error, "ERROR")?;
        no_file_section(f, report)
    }
}

fn of_class(
    report: &BatchReport,
    classification: Classification,
) -> impl Iterator<Item = &RecordReport> {
    report
        .records
        .iter()
        .filter(move |record| record.classification == classification)
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn section(
    f: &mut fmt::Formatter<'_>,
    report: &BatchReport,
    classification: Classification,
    title: &str,
) -> fmt::Result {
    let records: Vec<&RecordReport> = of_class(report, classification).collect();
    if records.is_empty() {
        return Ok(());
    }

    writeln!(f, "\n== {title} ({}) ==", records.len())?;
    for record in records {
        writeln!(
            f,
            "\n[row {}] {} -> {}",
            record.row_index + 1,
            record.resolution,
            record.file_name.as_deref().unwrap_or("-")
        )?;
        writeln!(
            f,
            "  name: {}  id: {}",
            record.name.as_deref().unwrap_or("-"),
            record.id.as_deref().unwrap_or("-")
        )?;
        writeln!(
            f,
            "  method: {}  confidence: {}  page: {}  via: {}",
            record.method.as_deref().unwrap_or("-"),
            or_dash(record.confidence),
            or_dash(record.page_index.map(|page| page + 1)),
            or_dash(record.located_via)
        )?;
        for issue in &record.issues {
            writeln!(f, "  issue: {issue}")?;
        }
        if let Some(excerpt) = &record.excerpt {
            writeln!(f, "  text:\n    {}", excerpt.replace('\n', "\n    "))?;
        }
    }
    Ok(())
}

fn no_file_section(f: &mut fmt::Formatter<'_>, report: &BatchReport) -> fmt::Result {
    let no_file: Vec<&RecordReport> = of_class(report, Classification::NoFile).collect();
    if no_file.is_empty() {
        return Ok(());
    }

    writeln!(f, "\n== NO FILE ({}) ==", no_file.len())?;
    for keys in no_file.chunks(NO_FILE_KEYS_PER_LINE) {
        let line = keys
            .iter()
            .map(|record| record.resolution.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "{line}")?;
    }
    for record in no_file {
        if !record.suggestions.is_empty() {
            writeln!(
                f,
                "  {} did you mean: {}",
                record.resolution,
                record.suggestions.join(", ")
            )?;
        } else if !record.available_sample.is_empty() {
            writeln!(
                f,
                "  {} available: {}",
                record.resolution,
                record.available_sample.join(", ")
            )?;
        }
    }
    Ok(())
}

struct VerificationText<'a>(&'a VerificationReport);

impl fmt::Display for VerificationText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let summary = &report.summary;

        writeln!(f, "VERIFICATION REPORT")?;
        writeln!(f, "generated: {}", report.generated_at.to_rfc3339())?;
        writeln!(f, "documents loaded: {}", report.documents_loaded)?;
        writeln!(f)?;
        writeln!(f, "checked: {}", summary.checked)?;
        writeln!(f, "match: {}", summary.matched)?;
        writeln!(f, "mismatch: {}", summary.mismatched)?;
        writeln!(f, "no file: {}", summary.no_file)?;
        if summary.cancelled {
            writeln!(f, "verification was cancelled before the end")?;
        }

        for status in [VerifyStatus::Mismatch, VerifyStatus::NoFile] {
            let entries: Vec<_> = report
                .entries
                .iter()
                .filter(|entry| entry.status == status)
                .collect();
            if entries.is_empty() {
                continue;
            }

            writeln!(f, "\n== {} ({}) ==", status.label(), entries.len())?;
            for entry in entries {
                writeln!(
                    f,
                    "[row {}] {} -> {}",
                    entry.row_index + 1,
                    entry.resolution,
                    entry.file_name.as_deref().unwrap_or("-")
                )?;
                for difference in &entry.differences {
                    writeln!(f, "  {difference}")?;
                }
                if !entry.suggestions.is_empty() {
                    writeln!(f, "  did you mean: {}", entry.suggestions.join(", "))?;
                }
            }
        }
        Ok(())
    }
}
