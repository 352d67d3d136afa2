/*!
 * Job operations against the service.
 *
 * - `submission`: create a translation and drive it and its first iteration
 *   to a terminal state
 * - `iteration`: create follow-up iterations and read existing ones
 * - `registry`: list, get and delete translations
 *
 * Everything here is a free async function over a shared `Transport`;
 * `VideoTranslationClient` bundles them with configuration.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{TransportError, ValidationError};

pub mod iteration;
pub mod registry;
pub mod submission;

/// Ids are embedded in request paths verbatim, so only unreserved URL characters are allowed
static RESOURCE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._~-]{1,256}$").expect("resource id pattern is valid"));

pub(crate) fn validate_id(id: &str) -> Result<(), ValidationError> {
    if RESOURCE_ID.is_match(id) && id != "." && id != ".." {
        Ok(())
    } else {
        Err(ValidationError::InvalidId(id.to_string()))
    }
}

/// `validate_id` for operations that report `TransportError`
pub(crate) fn checked_id(id: &str) -> Result<&str, TransportError> {
    validate_id(id).map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
    Ok(id)
}

pub(crate) const TRANSLATIONS_PATH: &str = "translations";

pub(crate) fn translation_path(translation_id: &str) -> String {
    format!("{}/{}", TRANSLATIONS_PATH, translation_id)
}

pub(crate) fn iterations_path(translation_id: &str) -> String {
    format!("{}/{}/iterations", TRANSLATIONS_PATH, translation_id)
}

pub(crate) fn iteration_path(translation_id: &str, iteration_id: &str) -> String {
    format!("{}/{}/iterations/{}", TRANSLATIONS_PATH, translation_id, iteration_id)
}
