/*!
 * Tests for language tag utilities
 */

use speranto::language_utils::{
    display_name, get_language_name, is_language_code, language_codes_match, normalize_to_part2t, primary_subtag,
    subtag_suffix,
};

#[test]
fn test_normalize_to_part2t_should_accept_all_code_forms() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fra").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");
    assert_eq!(normalize_to_part2t("pt-BR").unwrap(), "por");
    assert!(normalize_to_part2t("invalid").is_err());
}

#[test]
fn test_subtags_should_split_on_dash_and_underscore() {
    assert_eq!(primary_subtag("PT-br"), "pt");
    assert_eq!(subtag_suffix("pt-BR"), Some("BR"));
    assert_eq!(subtag_suffix("zh_Hant"), Some("Hant"));
    assert_eq!(subtag_suffix("es"), None);
}

#[test]
fn test_is_language_code_should_recognise_language_named_files() {
    assert!(is_language_code("es"));
    assert!(is_language_code("pt-BR"));
    assert!(!is_language_code("index"));
    assert!(!is_language_code("messages"));
}

#[test]
fn test_language_names_should_be_english() {
    assert_eq!(get_language_name("de").unwrap(), "German");
    assert_eq!(display_name("es"), "Spanish");
    assert_eq!(display_name("pt-BR"), "Portuguese (BR)");
}

#[test]
fn test_language_codes_match_should_ignore_region_case() {
    assert!(language_codes_match("pt-BR", "por_br"));
    assert!(!language_codes_match("pt", "pt-BR"));
    assert!(!language_codes_match("xx", "xx"));
}
