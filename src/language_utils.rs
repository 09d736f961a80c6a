use anyhow::{Result, anyhow};
use isolang::Language;

// Language utilities for language tags
//
// Target languages are configured as BCP 47 style tags (`es`, `pt-BR`,
// `zh_Hant`). Only the primary subtag is validated against ISO 639-1 and
// ISO 639-2; region and script subtags are carried along as written.

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Primary language subtag of a tag, lowercased (`pt-BR` -> `pt`)
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Region or script part of a tag, if any (`pt-BR` -> `BR`)
pub fn subtag_suffix(tag: &str) -> Option<&str> {
    tag.trim()
        .split_once(['-', '_'])
        .map(|(_, rest)| rest)
        .filter(|rest| !rest.is_empty())
}

fn lookup(primary: &str) -> Option<Language> {
    match primary.len() {
        2 => Language::from_639_1(primary),
        3 => {
            let part2t = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(b, _)| *b == primary)
                .map(|(_, t)| *t)
                .unwrap_or(primary);
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Validate a language tag by its primary subtag
pub fn validate_language_code(tag: &str) -> Result<()> {
    lookup(&primary_subtag(tag))
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", tag))
}

/// Whether a string is a valid language tag; used to recognise per-language file names
pub fn is_language_code(tag: &str) -> bool {
    validate_language_code(tag).is_ok()
}

/// Normalize a language tag to its ISO 639-2/T (3-letter) primary code
pub fn normalize_to_part2t(tag: &str) -> Result<String> {
    lookup(&primary_subtag(tag))
        .map(|lang| lang.to_639_3().to_string())
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", tag))
}

/// Check if two tags name the same language and region
pub fn language_codes_match(tag1: &str, tag2: &str) -> bool {
    let (Ok(primary1), Ok(primary2)) = (normalize_to_part2t(tag1), normalize_to_part2t(tag2)) else {
        return false;
    };
    let suffix1 = subtag_suffix(tag1).map(str::to_lowercase);
    let suffix2 = subtag_suffix(tag2).map(str::to_lowercase);
    primary1 == primary2 && suffix1 == suffix2
}

/// English name of the language of a tag
pub fn get_language_name(tag: &str) -> Result<String> {
    let lang = lookup(&primary_subtag(tag)).ok_or_else(|| anyhow!("Failed to get language from code: {}", tag))?;
    Ok(lang.to_name().to_string())
}

/// Human-readable name for prompts and trailers; unknown tags are shown as written
pub fn display_name(tag: &str) -> String {
    match (get_language_name(tag), subtag_suffix(tag)) {
        (Ok(name), Some(suffix)) => format!("{} ({})", name, suffix),
        (Ok(name), None) => name,
        (Err(_), _) => tag.trim().to_string(),
    }
}
