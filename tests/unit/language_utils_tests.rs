/*!
 * Tests for locale validation
 */

use isolang::Language;
use vtranslate::language_utils::{language_name, language_of, same_language, validate_locale};
use vtranslate::ValidationError;

#[test]
fn test_language_of_withCommonLocales_shouldResolveLanguage() {
    assert_eq!(language_of("en-US"), Some(Language::Eng));
    assert_eq!(language_of("ja-JP"), Some(Language::Jpn));
    assert_eq!(language_of("pt-BR"), Some(Language::Por));
    assert_eq!(language_of(" de-DE "), Some(Language::Deu));
}

#[test]
fn test_language_of_withMalformedLocales_shouldReturnNone() {
    assert_eq!(language_of("english"), None);
    assert_eq!(language_of("en_US"), None);
    assert_eq!(language_of("en-"), None);
    assert_eq!(language_of(""), None);
}

#[test]
fn test_validate_locale_shouldNameTheField() {
    let err = validate_locale("sourceLocale", "xx").unwrap_err();
    assert_eq!(
        err,
        ValidationError::InvalidLocale {
            field: "sourceLocale",
            value: "xx".into()
        }
    );
    assert!(err.to_string().starts_with("sourceLocale 'xx'"));
}

#[test]
fn test_same_language_and_names_shouldIgnoreRegion() {
    assert!(same_language("es-ES", "es-MX"));
    assert!(!same_language("es-ES", "pt-PT"));
    assert_eq!(language_name("fr-CA"), Some("French"));
}
