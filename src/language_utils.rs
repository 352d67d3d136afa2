/*!
 * Locale utilities for the `xx-YY` locales the translation service expects.
 *
 * A locale is a primary language subtag (ISO 639-1, or ISO 639-3 where no
 * two-letter code exists) followed by one or more region/script subtags,
 * e.g. `en-US`, `zh-Hans-CN`, `fil-PH`.
 */

use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ValidationError;

/// Primary language subtag followed by at least one subtag
static LOCALE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<lang>[A-Za-z]{2,3})(?:-[A-Za-z0-9]{2,8})+$").expect("locale pattern is valid")
});

/// Resolve the primary language subtag of a locale
pub fn language_of(locale: &str) -> Option<Language> {
    let captures = LOCALE_PATTERN.captures(locale.trim())?;
    let code = captures.name("lang")?.as_str().to_lowercase();
    match code.len() {
        2 => Language::from_639_1(&code),
        _ => Language::from_639_3(&code),
    }
}

/// Validate a locale field, reporting which field was wrong
pub fn validate_locale(field: &'static str, locale: &str) -> Result<(), ValidationError> {
    if locale.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }

    if language_of(locale).is_none() {
        return Err(ValidationError::InvalidLocale {
            field,
            value: locale.to_string(),
        });
    }

    Ok(())
}

/// Check if two locales share the same primary language
pub fn same_language(locale1: &str, locale2: &str) -> bool {
    match (language_of(locale1), language_of(locale2)) {
        (Some(l1), Some(l2)) => l1 == l2,
        _ => false,
    }
}

/// English name of a locale's language, e.g. "Japanese" for `ja-JP`
pub fn language_name(locale: &str) -> Option<&'static str> {
    language_of(locale).map(|lang| lang.to_name())
}
