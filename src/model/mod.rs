/*!
 * Typed representations of the remote service's resources.
 *
 * - `status`: the shared four-state lifecycle and the `JobResource` trait
 * - `translation`: translations, their input and list summaries
 * - `iteration`: iterations, WebVTT inputs and results
 *
 * The client never writes status fields; these types are snapshots of
 * server-owned state.
 */

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ValidationError;

pub mod iteration;
pub mod status;
pub mod translation;

pub use iteration::{Iteration, IterationInput, IterationResult, WebvttFile, WebvttFileKind};
pub use status::{JobResource, ResourceStatus};
pub use translation::{
    Translation, TranslationInput, TranslationSummary, VoiceKind, DEFAULT_SUBTITLE_MAX_CHAR_COUNT,
};

/// Opaque continuation token for paged listings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a listing; the caller drives pagination
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<PageToken>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.next_page_token.is_some()
    }
}

/// Page payload as sent by the service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageWire<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default)]
    pub next_link: Option<String>,
}

impl<T> From<PageWire<T>> for Page<T> {
    fn from(wire: PageWire<T>) -> Self {
        Self {
            items: wire.value,
            next_page_token: wire.next_link.filter(|l| !l.is_empty()).map(PageToken),
        }
    }
}

/// Input file URLs must be absolute http(s) URLs the service can fetch
pub(crate) fn validate_file_url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => Ok(()),
        _ => Err(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}
