//! Canonical form of page text used for pattern matching.
//!
//! The output is lowercase except for a handful of canonical upper-case
//! tokens (`SENOR`, `SENORES`, `IDENTIFICADO`, `CEDULA`, `CIUDADANIA`, `NUM`)
//! that the legacy extraction patterns anchor on. It is never shown to users.

use regex::Regex;
use std::sync::LazyLock;

static OCR_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/\\|¡!¿?]+").expect("valid regex"));

static COLONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[:;]+\s*").expect("valid regex"));

static PLURAL_HONORIFIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:(?:las|los)\s+)?(?:sen|sn|sefi|seh)or(?:as|es)\b").expect("valid regex")
});

static SINGULAR_HONORIFIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:sen|sn|sefi|seh)ora?\b").expect("valid regex")
});

static IDENTIFIED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"identificad(?:[ao]s?|@)").expect("valid regex"));

static CEDULA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"cedula").expect("valid regex"));

static CITIZENSHIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ciudadania").expect("valid regex"));

static NUMBER_SIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bn(?:o\.|[°º*]\.?)\s*").expect("valid regex"));

static BARE_NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bno\s+(\d)").expect("valid regex"));

static NUMBER_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnum(?:ero)?\b\.?\s*").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Lowercase connectives kept lowercase when title-casing a name.
const CONNECTIVES: [&str; 7] = ["de", "del", "la", "las", "los", "el", "y"];

/// Normalizes raw OCR or embedded text. Pure and idempotent.
pub fn normalize(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let lowered = strip_diacritics(&spaced.to_lowercase());

    let text = OCR_NOISE_RE.replace_all(&lowered, " ");
    let text = COLONS_RE.replace_all(&text, " ");
    let text = PLURAL_HONORIFIC_RE.replace_all(&text, "SENORES");
    let text = SINGULAR_HONORIFIC_RE.replace_all(&text, "SENOR");
    let text = IDENTIFIED_RE.replace_all(&text, "IDENTIFICADO");
    let text = CEDULA_RE.replace_all(&text, "CEDULA");
    let text = CITIZENSHIP_RE.replace_all(&text, "CIUDADANIA");
    let text = NUMBER_SIGN_RE.replace_all(&text, "NUM ");
    let text = BARE_NO_RE.replace_all(&text, "NUM $1");
    let text = NUMBER_WORD_RE.replace_all(&text, "NUM ");
    let text = restore_thousands_points(&text);

    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Maps accented vowels and `ñ` (either case) to their base letter.
pub fn strip_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'Á' | 'À' | 'Â' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ô' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'Ñ' => 'N',
            other => other,
        })
        .collect()
}

/// `12,345` -> `12.345`. Document numbers never use a decimal comma, so a
/// comma between a digit and three digits is a thousands separator.
fn restore_thousands_points(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(index, &c)| {
            let grouped = c == ','
                && index > 0
                && chars[index - 1].is_ascii_digit()
                && chars.len() > index + 3
                && chars[index + 1..=index + 3].iter().all(char::is_ascii_digit);
            if grouped {
                '.'
            } else {
                c
            }
        })
        .collect()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// `MARÍA DE LA CRUZ` -> `María de la Cruz`.
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .enumerate()
        .map(|(index, word)| {
            let lower = word.to_lowercase();
            if index > 0 && CONNECTIVES.contains(&lower.as_str()) {
                return lower;
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_connective(word: &str) -> bool {
    CONNECTIVES.contains(&word.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_keywords_and_accents() {
        let normalized = normalize(
            "La Señora MARÍA PÉREZ, identificada con cédula de ciudadanía No. 12,345,678",
        );
        assert_eq!(
            normalized,
            "la SENOR maria perez, IDENTIFICADO con CEDULA de CIUDADANIA NUM 12.345.678"
        );
    }

    #[test]
    fn folds_plural_honorifics_and_ocr_misreadings() {
        assert_eq!(normalize("los señores ANA y LUIS"), "SENORES ana y luis");
        assert_eq!(normalize("las senoras X"), "SENORES x");
        assert_eq!(normalize("el snor JUAN"), "el SENOR juan");
        assert_eq!(normalize("la sefiora ANA"), "la SENOR ana");
    }

    #[test]
    fn number_markers_fold_without_touching_words() {
        assert_eq!(normalize("N° 123456"), "NUM 123456");
        assert_eq!(normalize("Nº.123456"), "NUM 123456");
        assert_eq!(normalize("número: 98765"), "NUM 98765");
        assert_eq!(normalize("no 4455667"), "NUM 4455667");
        assert_eq!(normalize("nombre notificado"), "nombre notificado");
    }

    #[test]
    fn strips_control_characters_and_noise() {
        assert_eq!(
            normalize("RESUELVE:\u{000c}\r\n\tArtículo | primero ¡ ya!"),
            "resuelve articulo primero ya"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "La Señora MARÍA PÉREZ, identificada con cédula de ciudadanía No. 12,345,678",
            "A FAVOR DE LOS SEÑORES ANA Y LUIS, identificados con C.C. Nº 1,234,567,890",
            "nit: 816.002.019-9; número 55 | SNORA Ruiz ¿?",
            "R E S U E L V E : a favor de la empresa S.A. E.S.P.",
            "no. 1,2345 y 9,876,543,210",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn title_case_keeps_connectives_lowercase() {
        assert_eq!(title_case("MARÍA DE LA CRUZ"), "María de la Cruz");
        assert_eq!(title_case("DE LA TORRE JUAN"), "De la Torre Juan");
        assert_eq!(title_case("luis  y   ana"), "Luis y Ana");
    }

    #[test]
    fn digits_only_drops_separators() {
        assert_eq!(digits_only("816.002.019-9"), "8160020199");
    }
}
