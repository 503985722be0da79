//! Beneficiary name and identification extraction.
//!
//! [`extract`] runs an ordered cascade of independent strategies over the
//! text of an operative clause and returns the first structurally valid
//! candidate. Each strategy owns its confidence policy:
//!
//! | method            | text       | confidence                     |
//! |-------------------|------------|--------------------------------|
//! | `anchor_span`     | raw        | high                           |
//! | `anchor_nit`      | raw        | high                           |
//! | `anchor_cedula`   | raw        | high                           |
//! | `anchor_flexible` | raw        | medium                         |
//! | `legacy_plural`   | normalized | medium                         |
//! | `legacy_singular` | normalized | high, medium if plural present |
//! | `legacy_flexible` | normalized | high, medium if plural present |
//! | `adjacent_marker` | raw        | medium                         |
//! | `separate`        | raw        | low, or a single field         |
//!
//! When that pass yields no complete pair, the anchor rule is retried on the
//! normalized text (`anchor_normalized`, high), which recovers lowercase or
//! keyword-garbled OCR output.
//!
//! The legacy honorific rules only run when the beneficiary anchor is absent,
//! so they never outrank an anchor-based rule.

use crate::error::RecordIssue;
use crate::normalize::{collapse_whitespace, digits_only, is_connective, normalize, title_case};
use crate::{Confidence, ExtractionResult};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Texts shorter than this produce too many false positives to try.
pub const MIN_TEXT_CHARS: usize = 30;

const MIN_ID_DIGITS: usize = 6;
const MAX_ID_DIGITS: usize = 12;
const MAX_NAME_TOKENS: usize = 12;

/// Organization suffixes, compared with dots removed.
const ORGANIZATION_SUFFIXES: [&str; 6] = ["SA", "SAS", "ESP", "LTDA", "SCA", "SENC"];

const ANCHOR_PREFIX: &str = r"\b(?i:a\s+favor\s+de(?:l|\s+la|\s+el)?)\s+(?:(?i:(?:la\s+|el\s+)?(?:se[ñn]or[ea]?s?|snor[ea]?s?|sefior[ea]?s?))\s+)?";
const UPPER_NAME: &str = r"([A-ZÁÉÍÓÚÑÜ][A-ZÁÉÍÓÚÑÜ\s.,&]+?)";
const NUMBER_MARK: &str = r"(?i:n[o°º*]?\.?\s*|n[uú]mero\s*)?";
const RAW_ID: &str = r"(\d[\d.\s,:-]{5,15})";
const NORMALIZED_ID: &str = r"(\d[\d.\s]{5,14})";

/// `a favor de`, also as `a favor del`; shared with the locator so both agree
/// on which pages carry a beneficiary.
pub(crate) static BENEFICIARY_ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\ba\s+favor\s+de(?:l\b|\b)").expect("valid regex"));

static ANCHOR_LEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\ba\s+favor\s+de(?:l\b|\s+(?:la|el)\b)?").expect("valid regex")
});

static HONORIFIC_LEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:la|el)\s+)?(?:se[ñn]or[ea]?s?|snor[ea]?s?|sefior[ea]?s?|sra?\.)\s+")
        .expect("valid regex")
});

static ID_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:nit|c[eé]dula)\b").expect("valid regex"));

static ID_AFTER_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\D{0,40}?(\d[\d.,\s:-]{5,15})").expect("valid regex"));

static REPRESENTATIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)representad").expect("valid regex"));

static HONORIFIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)se[ñn]or|snor|sefior").expect("valid regex"));

static IDENTIFIED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)identificad").expect("valid regex"));

static CEDULA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)c[eé]dula").expect("valid regex"));

static NIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bnit\b").expect("valid regex"));

static PLURAL_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bSENORES\b").expect("valid regex"));

static ABBREVIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\p{L}\.)+[,;]?$").expect("valid regex"));

static IDENTIFIED_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&[r"(?i)[\s,]*(?:", &one_substitution("identificad"), r").*$"].concat())
        .expect("valid regex")
});

static HONORIFIC_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:la|el)\s+)?(?:se[ñn]or[ea]?s?|snor[ea]?s?|sefior[ea]?s?|sra?\.?)\s+")
        .expect("valid regex")
});

static MARKER_TOKENS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:se[ñn]or(?:a|es|as)?|snor(?:a|es|as)?|identificad[oa]s?|c[eé]dula|ciudadan[ií]a|num|propietari[oa]s?|representante|autorizad[oa]s?)\b",
    )
    .expect("valid regex")
});

static CON_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+con(?:\s+(?:el|la))?\s*$").expect("valid regex"));

static ANCHOR_NIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        &[
            ANCHOR_PREFIX,
            UPPER_NAME,
            r"\s*,?\s*",
            &identified_infix(),
            r"(?i:con\s+)?(?i:el\s+)?(?i:nit)[.\s:]*",
            NUMBER_MARK,
            RAW_ID,
        ]
        .concat(),
    )
    .expect("valid regex")
});

static ANCHOR_CEDULA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        &[
            ANCHOR_PREFIX,
            UPPER_NAME,
            r"\s*,?\s*",
            &identified_infix(),
            r"(?i:con\s+)?(?i:la\s+)?(?i:c[eé]dula)\s+(?i:de\s+ciudadan[ií]a\s+)?",
            NUMBER_MARK,
            RAW_ID,
        ]
        .concat(),
    )
    .expect("valid regex")
});

static ANCHOR_FLEXIBLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        &[
            ANCHOR_PREFIX,
            r"([A-ZÁÉÍÓÚÑÜ][^\s,]*(?:\s+[A-ZÁÉÍÓÚÑÜ&][^\s,]*)*)",
            r"(?s:.{0,80}?)(?i:nit|c[eé]dula)[.\s:]*(?i:de\s+ciudadan[ií]a\s+)?",
            NUMBER_MARK,
            RAW_ID,
        ]
        .concat(),
    )
    .expect("valid regex")
});

static ANCHOR_NORMALIZED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        &[
            r"\ba\s+favor\s+de(?:l|\s+la|\s+el)?\s+(?:SENOR(?:ES)?\s+)?([a-z][a-z\s.,&]+?)\s*,?\s*",
            r"(?:IDENTIFICADO\s+|(?i:",
            &one_substitution("identificad"),
            r")[a-z]*\s+)?(?:con\s+)?(?:el\s+|la\s+)?(?:CEDULA|nit)[.\s]*(?:de\s+CIUDADANIA\s+)?(?:NUM\s*)?",
            NORMALIZED_ID,
        ]
        .concat(),
    )
    .expect("valid regex")
});

static LEGACY_PLURAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        &[
            r"\bSENORES\s+([a-z][a-z\s]+?)\s*,?\s*IDENTIFICADO\s+con\s+CEDULA\s+de\s+CIUDADANIA\s+NUM\s*",
            NORMALIZED_ID,
        ]
        .concat(),
    )
    .expect("valid regex")
});

static LEGACY_SINGULAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        &[
            r"\bSENOR\s+([a-z][a-z\s]+?)\s*,?\s*IDENTIFICADO\s+con\s+CEDULA\s+de\s+CIUDADANIA\s+NUM\s*",
            NORMALIZED_ID,
        ]
        .concat(),
    )
    .expect("valid regex")
});

static LEGACY_FLEXIBLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        &[
            r"\bSENOR(?:ES)?\s+([a-z][a-z\s]+?)\s*,?\s*IDENTIFICADO.*?NUM\s*",
            NORMALIZED_ID,
        ]
        .concat(),
    )
    .expect("valid regex")
});

static ADJACENT_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        &[
            r"([A-ZÁÉÍÓÚÑÜ]{2,}(?:\s+[A-ZÁÉÍÓÚÑÜ.&]{2,}){1,6})\s*,?\s*",
            &identified_infix(),
            r"(?i:con\s+)?(?i:el\s+|la\s+)?(?i:c[eé]dula|nit)[.\s:]*(?i:de\s+ciudadan[ií]a\s+)?",
            NUMBER_MARK,
            RAW_ID,
        ]
        .concat(),
    )
    .expect("valid regex")
});

static SEPARATE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?i:a\s+favor\s+de\s+(?:(?:el|la)\s+)?(?:se[ñn]or[ea]?\s+)?)([A-ZÁÉÍÓÚÑÜ][A-ZÁÉÍÓÚÑÜ\s]+?)(?:\s*,|\s+(?i:identificad|con\s+c[eé]dula|con\s+nit))",
    )
    .expect("valid regex")
});

static SEPARATE_CEDULA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)c[eé]dula\s+(?:de\s+ciudadan[ií]a\s+)?(?:n[o°º]?\.?\s*|n[uú]mero\s*)(\d[\d.\s,-]{5,15})",
    )
    .expect("valid regex")
});

static SEPARATE_NIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bnit\b\s*[.:]?\s*(\d[\d.\s,-]{5,15})").expect("valid regex")
});

static SEPARATE_ANCHOR_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\ba\s+favor\s+de.*?(?:\bn[o°º]\.?\s*|\bnit\s*)(\d[\d.\s,-]{5,15})")
        .expect("valid regex")
});

/// `(?:.bc|a.c|ab.)` for `abc`: the word with any single character misread.
fn one_substitution(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    let variants = (0..chars.len())
        .map(|wildcard| {
            chars
                .iter()
                .enumerate()
                .map(|(index, c)| {
                    if index == wildcard {
                        ".".to_string()
                    } else {
                        regex::escape(&c.to_string())
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>();
    format!("(?:{})", variants.join("|"))
}

/// Optional, possibly OCR-garbled `identificado/a` between a name and its
/// identification clause.
fn identified_infix() -> String {
    [
        r"(?:(?i:",
        &one_substitution("identificad"),
        r")[\p{L}@]*\s+)?",
    ]
    .concat()
}

struct Context<'t> {
    raw: &'t str,
    normalized: String,
    has_anchor: bool,
    has_normalized_anchor: bool,
    has_keywords: bool,
    plural: bool,
}

impl<'t> Context<'t> {
    fn new(text: &'t str) -> Self {
        let raw = before_representative(text);
        let normalized = before_representative(&normalize(text)).to_string();
        let has_keywords = HONORIFIC_RE.is_match(raw)
            || IDENTIFIED_RE.is_match(raw)
            || CEDULA_RE.is_match(raw)
            || NIT_RE.is_match(raw);

        Self {
            raw,
            has_anchor: BENEFICIARY_ANCHOR_RE.is_match(raw),
            has_normalized_anchor: BENEFICIARY_ANCHOR_RE.is_match(&normalized),
            plural: PLURAL_TOKEN_RE.is_match(&normalized),
            normalized,
            has_keywords,
        }
    }
}

/// Drops everything from the legal representative onwards, so the
/// representative is never captured instead of the beneficiary.
fn before_representative(text: &str) -> &str {
    match REPRESENTATIVE_RE.find(text) {
        Some(found) if found.start() > 50 => &text[..found.start()],
        _ => text,
    }
}

struct Strategy {
    method: &'static str,
    applies: fn(&Context<'_>) -> bool,
    run: fn(&Context<'_>, &'static str) -> Option<ExtractionResult>,
}

static CASCADE: [Strategy; 9] = [
    Strategy {
        method: "anchor_span",
        applies: |ctx| ctx.has_anchor,
        run: anchor_span,
    },
    Strategy {
        method: "anchor_nit",
        applies: |ctx| ctx.has_anchor,
        run: anchor_nit,
    },
    Strategy {
        method: "anchor_cedula",
        applies: |ctx| ctx.has_anchor,
        run: anchor_cedula,
    },
    Strategy {
        method: "anchor_flexible",
        applies: |ctx| ctx.has_anchor,
        run: anchor_flexible,
    },
    Strategy {
        method: "legacy_plural",
        applies: legacy_applies,
        run: legacy_plural,
    },
    Strategy {
        method: "legacy_singular",
        applies: legacy_applies,
        run: legacy_singular,
    },
    Strategy {
        method: "legacy_flexible",
        applies: legacy_applies,
        run: legacy_flexible,
    },
    Strategy {
        method: "adjacent_marker",
        applies: |ctx| ctx.has_keywords,
        run: adjacent_marker,
    },
    Strategy {
        method: "separate",
        applies: |_| true,
        run: separate,
    },
];

static NORMALIZED_PASS: Strategy = Strategy {
    method: "anchor_normalized",
    applies: |ctx| ctx.has_normalized_anchor,
    run: anchor_normalized,
};

fn legacy_applies(ctx: &Context<'_>) -> bool {
    !ctx.has_anchor && !ctx.has_normalized_anchor && ctx.has_keywords
}

/// Extracts the beneficiary name and identification from clause text.
pub fn extract(text: &str) -> ExtractionResult {
    extract_with_min_chars(text, MIN_TEXT_CHARS)
}

pub fn extract_with_min_chars(text: &str, min_chars: usize) -> ExtractionResult {
    if text.trim().chars().count() < min_chars {
        return ExtractionResult::empty();
    }

    let ctx = Context::new(text);
    let raw = CASCADE
        .iter()
        .filter(|strategy| (strategy.applies)(&ctx))
        .find_map(|strategy| (strategy.run)(&ctx, strategy.method))
        .unwrap_or_default();
    if raw.is_complete() || !(NORMALIZED_PASS.applies)(&ctx) {
        return raw;
    }

    (NORMALIZED_PASS.run)(&ctx, NORMALIZED_PASS.method).unwrap_or(raw)
}

/// First-page pass used when no operative clause could be located: the
/// looser honorific rules, always capped at low confidence.
pub fn extract_fallback(text: &str) -> ExtractionResult {
    extract_fallback_with_min_chars(text, MIN_TEXT_CHARS)
}

pub fn extract_fallback_with_min_chars(text: &str, min_chars: usize) -> ExtractionResult {
    if text.trim().chars().count() < min_chars {
        return ExtractionResult::empty();
    }

    let ctx = Context::new(text);
    let has_markers = HONORIFIC_RE.is_match(ctx.raw)
        || HONORIFIC_RE.is_match(&ctx.normalized)
        || IDENTIFIED_RE.is_match(ctx.raw);
    if !has_markers {
        return ExtractionResult::empty();
    }

    CASCADE
        .iter()
        .filter(|strategy| {
            strategy.method.starts_with("legacy_")
                || matches!(strategy.method, "adjacent_marker" | "separate")
        })
        .find_map(|strategy| (strategy.run)(&ctx, strategy.method))
        .map(|result| {
            let method = format!("fallback_{}", result.method.as_deref().unwrap_or("unknown"));
            result.capped_at(Confidence::Low).with_method(method)
        })
        .unwrap_or_default()
}

/// Why nothing could be extracted from `text`, for reports.
pub fn diagnose_failure(text: &str) -> String {
    let trimmed = text.trim();
    let length = trimmed.chars().count();
    if length == 0 {
        "no text could be read from the document".to_string()
    } else if length < 100 {
        format!("only {length} characters were read")
    } else if !HONORIFIC_RE.is_match(trimmed) && !IDENTIFIED_RE.is_match(trimmed) {
        "neither an honorific nor an identified marker was found".to_string()
    } else if !CEDULA_RE.is_match(trimmed) && !NIT_RE.is_match(trimmed) {
        "no cédula or NIT marker was found".to_string()
    } else {
        "keywords were found but no complete pattern matched".to_string()
    }
}

fn anchor_span(ctx: &Context<'_>, method: &'static str) -> Option<ExtractionResult> {
    let anchor = ANCHOR_LEAD_RE.find(ctx.raw)?;
    let after = &ctx.raw[anchor.end()..];
    let marker = ID_MARKER_RE.find(after)?;

    let span = &after[..marker.start()];
    let span = match HONORIFIC_LEAD_RE.find(span) {
        Some(lead) => &span[lead.end()..],
        None => span,
    };
    let name = capitalized_run(span);
    let id = ID_AFTER_MARKER_RE
        .captures(&after[marker.end()..])?
        .get(1)?
        .as_str();

    accept(method, &name, id, Confidence::High, false)
}

fn anchor_nit(ctx: &Context<'_>, method: &'static str) -> Option<ExtractionResult> {
    capture_pair(&ANCHOR_NIT_RE, ctx.raw)
        .and_then(|(name, id)| accept(method, name, id, Confidence::High, false))
}

fn anchor_cedula(ctx: &Context<'_>, method: &'static str) -> Option<ExtractionResult> {
    capture_pair(&ANCHOR_CEDULA_RE, ctx.raw)
        .and_then(|(name, id)| accept(method, name, id, Confidence::High, false))
}

fn anchor_flexible(ctx: &Context<'_>, method: &'static str) -> Option<ExtractionResult> {
    capture_pair(&ANCHOR_FLEXIBLE_RE, ctx.raw)
        .and_then(|(name, id)| accept(method, name, id, Confidence::Medium, false))
}

fn anchor_normalized(ctx: &Context<'_>, method: &'static str) -> Option<ExtractionResult> {
    capture_pair(&ANCHOR_NORMALIZED_RE, &ctx.normalized)
        .and_then(|(name, id)| accept(method, name, id, Confidence::High, true))
}

fn legacy_plural(ctx: &Context<'_>, method: &'static str) -> Option<ExtractionResult> {
    capture_pair(&LEGACY_PLURAL_RE, &ctx.normalized)
        .and_then(|(name, id)| accept(method, name, id, Confidence::Medium, true))
}

fn legacy_singular(ctx: &Context<'_>, method: &'static str) -> Option<ExtractionResult> {
    capture_pair(&LEGACY_SINGULAR_RE, &ctx.normalized)
        .and_then(|(name, id)| accept(method, name, id, legacy_confidence(ctx), true))
}

fn legacy_flexible(ctx: &Context<'_>, method: &'static str) -> Option<ExtractionResult> {
    capture_pair(&LEGACY_FLEXIBLE_RE, &ctx.normalized)
        .and_then(|(name, id)| accept(method, name, id, legacy_confidence(ctx), true))
}

/// A plural honorific anywhere in the text makes a singular match ambiguous.
fn legacy_confidence(ctx: &Context<'_>) -> Confidence {
    if ctx.plural {
        Confidence::Medium
    } else {
        Confidence::High
    }
}

fn adjacent_marker(ctx: &Context<'_>, method: &'static str) -> Option<ExtractionResult> {
    capture_pair(&ADJACENT_MARKER_RE, ctx.raw)
        .and_then(|(name, id)| accept(method, name, id, Confidence::Medium, false))
}

fn separate(ctx: &Context<'_>, method: &'static str) -> Option<ExtractionResult> {
    let name = SEPARATE_NAME_RE
        .captures(ctx.raw)
        .and_then(|captures| captures.get(1))
        .and_then(|found| valid_name(method, found.as_str(), false));

    let id = [&*SEPARATE_CEDULA_RE, &*SEPARATE_NIT_RE]
        .into_iter()
        .find_map(|pattern| capture_id(pattern, ctx.raw))
        .or_else(|| {
            if ctx.has_anchor {
                capture_id(&SEPARATE_ANCHOR_NUMBER_RE, ctx.raw)
            } else {
                None
            }
        });

    match (name, id) {
        (Some(name), Some(id)) => Some(ExtractionResult::complete(name, id, Confidence::Low, method)),
        (Some(name), None) => Some(ExtractionResult::from_fields(
            Some(name),
            None,
            Confidence::Low,
            "partial_name",
        )),
        (None, Some(id)) => Some(ExtractionResult::from_fields(
            None,
            Some(id),
            Confidence::Low,
            "partial_id",
        )),
        (None, None) => None,
    }
}

fn capture_pair<'h>(pattern: &Regex, text: &'h str) -> Option<(&'h str, &'h str)> {
    let captures = pattern.captures(text)?;
    Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

fn capture_id(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|found| clean_id(found.as_str()))
}

/// Post-processes and validates both fields of a candidate; `None` sends the
/// cascade on to the next strategy.
fn accept(
    method: &'static str,
    raw_name: &str,
    raw_id: &str,
    confidence: Confidence,
    from_normalized: bool,
) -> Option<ExtractionResult> {
    let name = valid_name(method, raw_name, from_normalized)?;
    let Some(id) = clean_id(raw_id) else {
        let issue = RecordIssue::FieldInvalid {
            field: "id",
            strategy: method,
        };
        debug!(%issue, raw_id, "candidate discarded");
        return None;
    };
    Some(ExtractionResult::complete(name, id, confidence, method))
}

fn valid_name(method: &'static str, raw_name: &str, from_normalized: bool) -> Option<String> {
    let name = if from_normalized {
        clean_name(&raw_name.to_uppercase())
    } else {
        clean_name(raw_name)
    };
    match name.filter(|name| is_valid_name(name)) {
        Some(name) => Some(name),
        None => {
            let issue = RecordIssue::FieldInvalid {
                field: "name",
                strategy: method,
            };
            debug!(%issue, raw_name, "candidate discarded");
            None
        }
    }
}

/// Digits of an identifier, when there are between 6 and 12 of them.
pub fn clean_id(raw: &str) -> Option<String> {
    let digits = digits_only(raw);
    (MIN_ID_DIGITS..=MAX_ID_DIGITS)
        .contains(&digits.len())
        .then_some(digits)
}

/// At least two tokens longer than one character, or a long single-token
/// organization name.
pub fn is_valid_name(name: &str) -> bool {
    let length = name.chars().count();
    if length < 5 {
        return false;
    }
    let tokens = name.split_whitespace().count();
    let words = name
        .split_whitespace()
        .filter(|word| word.chars().count() > 1)
        .count();
    tokens <= MAX_NAME_TOKENS && (words >= 2 || length >= 15)
}

pub fn is_organization(name: &str) -> bool {
    name.split_whitespace().any(|token| {
        let bare: String = token
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_uppercase();
        ORGANIZATION_SUFFIXES.contains(&bare.as_str())
    })
}

/// Strips honorifics, markers and punctuation from a captured name; upper-case
/// person names come back title-cased, organizations keep their case.
pub fn clean_name(raw: &str) -> Option<String> {
    let name = collapse_whitespace(raw);
    let name = IDENTIFIED_TAIL_RE.replace(&name, "");
    let name = HONORIFIC_PREFIX_RE.replace(name.trim(), "");
    let name = MARKER_TOKENS_RE.replace_all(&name, " ");
    let name = collapse_whitespace(&name);
    let name = CON_TAIL_RE.replace(&name, "");

    let name = name
        .trim_start_matches(|c: char| ",.:;/\\|".contains(c) || c.is_whitespace())
        .trim_end_matches(|c: char| ",:;/\\|".contains(c) || c.is_whitespace());
    let name = strip_trailing_period(name);

    if name.chars().count() < 3 {
        return None;
    }

    let shouting = name.chars().any(char::is_alphabetic) && !name.chars().any(char::is_lowercase);
    if shouting && !is_organization(name) {
        Some(title_case(name))
    } else {
        Some(name.to_string())
    }
}

/// Keeps the period closing an abbreviation such as `S.A.`.
fn strip_trailing_period(name: &str) -> &str {
    let last = name.split_whitespace().last().unwrap_or_default();
    if ABBREVIATION_RE.is_match(last) {
        name
    } else {
        name.trim_end_matches(|c: char| c == '.' || c.is_whitespace())
    }
}

/// Longest leading run of capitalized tokens, which sheds OCR garbage that
/// follows a legitimate name. Lowercase connectives survive when another
/// capitalized token follows them; a token ending in a comma closes the run.
fn capitalized_run(span: &str) -> String {
    let tokens: Vec<&str> = span.split_whitespace().collect();
    let mut kept: Vec<&str> = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        let next = tokens.get(index + 1).copied();
        let accepted = is_capitalized(token)
            || ABBREVIATION_RE.is_match(token)
            || (!kept.is_empty() && is_connective(token) && next.is_some_and(is_capitalized));
        if !accepted {
            break;
        }
        kept.push(token);

        let closes = token.ends_with(',') && !next.is_some_and(|next| ABBREVIATION_RE.is_match(next));
        if closes {
            break;
        }
    }

    kept.join(" ")
}

fn is_capitalized(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}
