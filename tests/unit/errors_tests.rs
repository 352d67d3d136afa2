/*!
 * Tests for error classification and messages
 */

use std::time::Duration;

use vtranslate::{AuthError, SubmissionError, TransportError, ValidationError, WaitError};

fn service(status_code: u16) -> TransportError {
    TransportError::Service {
        status_code,
        service_error_code: Some("Code".to_string()),
        message: "message".to_string(),
    }
}

#[test]
fn test_is_transient_shouldCoverNetworkThrottlingAndServerErrors() {
    assert!(TransportError::Network("reset".into()).is_transient());
    assert!(TransportError::RateLimited { retry_after: None, message: String::new() }.is_transient());
    assert!(service(408).is_transient());
    assert!(service(500).is_transient());
    assert!(service(503).is_transient());

    assert!(!service(400).is_transient());
    assert!(!service(409).is_transient());
    assert!(!TransportError::NotFound { path: "/x".into(), service_error_code: None, message: String::new() }.is_transient());
    assert!(!TransportError::Auth(AuthError::Rejected { message: String::new() }).is_transient());
    assert!(!TransportError::Decode("bad".into()).is_transient());
}

#[test]
fn test_service_error_display_shouldIncludeStatusAndCode() {
    let message = service(409).to_string();
    assert!(message.contains("409"));
    assert!(message.contains("(Code)"));

    let without_code = TransportError::Service {
        status_code: 502,
        service_error_code: None,
        message: "Bad Gateway".into(),
    };
    assert_eq!(without_code.to_string(), "service responded with 502: Bad Gateway");
}

#[test]
fn test_wait_error_shouldExposeLastSnapshot() {
    let err: WaitError<u32> = WaitError::Timeout {
        elapsed: Duration::from_secs(10),
        polls: 3,
        last: Some(Box::new(7)),
    };
    assert!(err.is_timeout());
    assert_eq!(err.last_snapshot(), Some(&7));

    let err: WaitError<u32> = WaitError::ServiceRejected {
        source: service(400),
        last: None,
    };
    assert!(err.last_snapshot().is_none());
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_submission_error_fromValidation_shouldHaveNoTranslationId() {
    let err: SubmissionError = ValidationError::SpeakerCount(0).into();
    assert!(err.translation_id().is_none());
    assert!(err.to_string().contains("speakerCount"));

    let err = SubmissionError::MissingFirstIteration("t-1".into());
    assert_eq!(err.translation_id(), Some("t-1"));
}

#[test]
fn test_chain_exhausted_shouldListEveryAttempt() {
    let err = AuthError::ChainExhausted {
        attempts: vec!["environment: not set".into(), "azure-cli: not signed in".into()],
    };
    assert_eq!(
        err.to_string(),
        "no credential provider produced a token: environment: not set; azure-cli: not signed in"
    );
}
