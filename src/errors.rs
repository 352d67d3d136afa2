/*!
 * Error types for the vtranslate client.
 *
 * Every public operation returns one of these `thiserror` enums so callers get
 * a readable message plus enough structure (status code, service error code,
 * resource id) to drive their own retry decisions.
 */

use std::fmt::Debug;
use std::time::Duration;

use thiserror::Error;

use crate::model::{Iteration, Translation};

/// Local input validation failures, raised before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required string field was empty or blank
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field
        field: &'static str,
    },

    /// A locale that is not of the form `xx-YY` or has an unknown language subtag
    #[error("{field} '{value}' is not a valid locale (expected e.g. 'en-US')")]
    InvalidLocale {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        value: String,
    },

    /// Speaker count below one
    #[error("speakerCount must be at least 1, got {0}")]
    SpeakerCount(u32),

    /// Subtitle segment length outside the documented bounds
    #[error("subtitleMaxCharCountPerSegment must be within {min}..={max}, got {value}")]
    SubtitleMaxCharCount {
        /// Requested value
        value: u32,
        /// Lower bound
        min: u32,
        /// Upper bound
        max: u32,
    },

    /// A WebVTT file kind outside the three supported kinds
    #[error("unknown WebVTT file kind '{0}': expected MetadataJson, SourceLocaleSubtitle or TargetLocaleSubtitle")]
    UnknownWebvttFileKind(String),

    /// A voice kind outside the two supported kinds
    #[error("unknown voice kind '{0}': expected PlatformVoice or PersonalVoice")]
    UnknownVoiceKind(String),

    /// A file URL that is not an absolute http(s) URL
    #[error("{field} '{value}' is not an absolute http(s) URL")]
    InvalidUrl {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        value: String,
    },

    /// A resource id that cannot be embedded in a request path
    #[error("'{0}' is not a valid resource id")]
    InvalidId(String),
}

/// Credential and token failures
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    /// No credential provider was configured
    #[error("no credential provider configured")]
    NoProvider,

    /// Every provider in the credential chain failed
    #[error("no credential provider produced a token: {}", .attempts.join("; "))]
    ChainExhausted {
        /// One message per failed provider, in chain order
        attempts: Vec<String>,
    },

    /// A single provider failed to produce a token
    #[error("credential provider '{provider}' failed: {message}")]
    Credential {
        /// Provider name
        provider: String,
        /// Failure description
        message: String,
    },

    /// The service rejected a freshly refreshed token
    #[error("request rejected with 401 after token refresh: {message}")]
    Rejected {
        /// Message decoded from the second 401
        message: String,
    },
}

/// Errors produced by the authenticated transport
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The addressed resource does not exist (404)
    #[error("resource not found: {path}: {message}")]
    NotFound {
        /// Request path that was not found
        path: String,
        /// Service error code, if the body carried one
        service_error_code: Option<String>,
        /// Message from the service
        message: String,
    },

    /// The service throttled the request (429)
    #[error("rate limited by service: {message}")]
    RateLimited {
        /// Delay requested through `Retry-After`, if any
        retry_after: Option<Duration>,
        /// Message from the service
        message: String,
    },

    /// Any other non-2xx response
    #[error("service responded with {status_code}{}: {message}", .service_error_code.as_ref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Service {
        /// HTTP status code
        status_code: u16,
        /// Service error code, if the body carried one
        service_error_code: Option<String>,
        /// Message from the service
        message: String,
    },

    /// The request never produced a response (DNS, connect, timeout, reset)
    #[error("network failure: {0}")]
    Network(String),

    /// Authentication could not be completed
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// A 2xx response whose body did not match the expected shape
    #[error("failed to decode service response: {0}")]
    Decode(String),

    /// The request could not be built (bad path, foreign next link)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// HTTP status code of the failed response, if there was one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::Service { status_code, .. } => Some(*status_code),
            Self::Auth(AuthError::Rejected { .. }) => Some(401),
            _ => None,
        }
    }

    /// Service error code decoded from the error body, if any
    pub fn service_error_code(&self) -> Option<&str> {
        match self {
            Self::NotFound { service_error_code, .. }
            | Self::Service { service_error_code, .. } => service_error_code.as_deref(),
            _ => None,
        }
    }

    /// Whether this is a 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether a later identical request may succeed.
    ///
    /// Network failures, 408, 429 and 5xx are transient; everything else,
    /// including authentication failures, is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited { .. } => true,
            Self::Service { status_code, .. } => *status_code == 408 || *status_code >= 500,
            _ => false,
        }
    }

    /// Delay requested by the service before retrying
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Why a wait for a terminal state ended without one.
///
/// `T` is the polled resource; the last snapshot observed is attached where
/// one exists so callers can inspect partial state.
#[derive(Error, Debug)]
pub enum WaitError<T: Debug> {
    /// The maximum wait duration or poll count was exceeded
    #[error("gave up after {polls} polls over {elapsed:?} without reaching a terminal state")]
    Timeout {
        /// Time spent waiting
        elapsed: Duration,
        /// Number of fetches issued
        polls: u32,
        /// Last successfully fetched resource
        last: Option<Box<T>>,
    },

    /// The caller cancelled the wait. The remote job keeps running.
    #[error("wait cancelled after {polls} polls; the remote job was not cancelled")]
    Cancelled {
        /// Number of fetches issued
        polls: u32,
        /// Last successfully fetched resource
        last: Option<Box<T>>,
    },

    /// A fatal error, or transient errors beyond the retry budget
    #[error("service rejected the status request: {source}")]
    ServiceRejected {
        /// The error that ended the wait
        #[source]
        source: TransportError,
        /// Last successfully fetched resource
        last: Option<Box<T>>,
    },
}

impl<T: Debug> WaitError<T> {
    /// Last resource snapshot observed before the wait ended
    pub fn last_snapshot(&self) -> Option<&T> {
        match self {
            Self::Timeout { last, .. }
            | Self::Cancelled { last, .. }
            | Self::ServiceRejected { last, .. } => last.as_deref(),
        }
    }

    /// Whether the wait ended because of cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Whether the wait ended because of a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors from submitting a translation and waiting for its first iteration
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// Input rejected locally; nothing was sent
    #[error("invalid translation input: {0}")]
    Validation(#[from] ValidationError),

    /// Creating the translation or looking up its first iteration failed
    #[error("translation request failed: {0}")]
    Transport(#[from] TransportError),

    /// Waiting for the translation ended without a terminal state
    #[error("waiting for translation {translation_id} failed: {source}")]
    TranslationWait {
        /// Id of the translation that was being awaited
        translation_id: String,
        /// Why the wait ended
        #[source]
        source: WaitError<Translation>,
    },

    /// Waiting for the first iteration ended without a terminal state
    #[error("waiting for iteration {iteration_id} of translation {translation_id} failed: {source}")]
    IterationWait {
        /// Parent translation id
        translation_id: String,
        /// Id of the iteration that was being awaited
        iteration_id: String,
        /// Why the wait ended
        #[source]
        source: WaitError<Iteration>,
    },

    /// The translation reached `Failed`; its first iteration was not awaited
    #[error("translation {} failed: {}", .translation.id, .translation.failure_reason.as_deref().unwrap_or("no reason given"))]
    TranslationFailed {
        /// Final translation snapshot
        translation: Box<Translation>,
    },

    /// The first iteration reached `Failed`
    #[error("iteration {} of translation {} failed: {}", .iteration.id, .translation.id, .iteration.failure_reason.as_deref().unwrap_or("no reason given"))]
    IterationFailed {
        /// Final translation snapshot
        translation: Box<Translation>,
        /// Final iteration snapshot
        iteration: Box<Iteration>,
    },

    /// The service created the translation without a first iteration
    #[error("translation {0} was created without an iteration")]
    MissingFirstIteration(String),
}

impl SubmissionError {
    /// Id of the translation involved, when one was created
    pub fn translation_id(&self) -> Option<&str> {
        match self {
            Self::TranslationWait { translation_id, .. }
            | Self::IterationWait { translation_id, .. }
            | Self::MissingFirstIteration(translation_id) => Some(translation_id),
            Self::TranslationFailed { translation } | Self::IterationFailed { translation, .. } => {
                Some(&translation.id)
            }
            _ => None,
        }
    }
}

/// Errors from creating a follow-up iteration and waiting for it
#[derive(Error, Debug)]
pub enum IterationError {
    /// Input rejected locally; nothing was sent
    #[error("invalid iteration input: {0}")]
    Validation(#[from] ValidationError),

    /// The creation request failed (including `NotFound` for the translation)
    #[error("iteration request failed: {0}")]
    Transport(#[from] TransportError),

    /// Waiting for the iteration ended without a terminal state
    #[error("waiting for iteration {iteration_id} failed: {source}")]
    Wait {
        /// Id of the iteration that was being awaited
        iteration_id: String,
        /// Why the wait ended
        #[source]
        source: WaitError<Iteration>,
    },

    /// The iteration reached `Failed`
    #[error("iteration {} failed: {}", .iteration.id, .iteration.failure_reason.as_deref().unwrap_or("no reason given"))]
    Failed {
        /// Final iteration snapshot
        iteration: Box<Iteration>,
    },
}

/// Errors from the object storage collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The blob does not exist
    #[error("blob '{blob}' does not exist in container '{container}'")]
    BlobNotFound {
        /// Container name
        container: String,
        /// Blob name
        blob: String,
    },

    /// The blob reference is malformed
    #[error("invalid blob reference: {0}")]
    InvalidReference(String),

    /// Any backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A field has an unusable value
    #[error("invalid configuration value for {field}: {message}")]
    Invalid {
        /// Dotted field path
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}
