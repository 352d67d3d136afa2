/*!
 * Integration tests for submitting translations against the fake service
 */

use futures::future::join_all;
use std::time::Duration;
use tokio_test::assert_ok;

use vtranslate::transport::Method;
use vtranslate::{
    CancellationToken, MockServiceConfig, PollPolicy, ResourceStatus, SubmissionError, TranslationInput,
    TransportError, ValidationError, VoiceKind, WaitError,
};

use crate::common::{mock_client, sample_input};

fn gets(mock: &vtranslate::MockService) -> usize {
    mock.requests().iter().filter(|r| r.method == Method::GET).count()
}

/// Translation NotStarted, Running, Succeeded over 3 polls; iteration done after 2
#[tokio::test(start_paused = true)]
async fn test_submit_withThreeTranslationPollsAndTwoIterationPolls_shouldMakeFiveStatusRequests() {
    let (client, mock) = mock_client(MockServiceConfig {
        translation_polls: 3,
        iteration_polls: 2,
        ..Default::default()
    })
    .await;

    let input = TranslationInput::new("https://x/video.mp4", "en-US", "ja-JP", VoiceKind::PlatformVoice);
    let (translation, iteration) = assert_ok!(client.submit(input).await);

    assert_eq!(translation.status, ResourceStatus::Succeeded);
    assert_eq!(translation.input.video_file_url, "https://x/video.mp4");
    assert_eq!(iteration.status, ResourceStatus::Succeeded);
    assert!(!iteration.translated_video_url().unwrap_or_default().is_empty());

    assert_eq!(mock.count(Method::POST, "/translations"), 1);
    assert_eq!(mock.count(Method::GET, &format!("/translations/{}", translation.id)), 3);
    assert_eq!(mock.count(Method::GET, &format!("/iterations/{}", iteration.id)), 2);
    assert_eq!(gets(&mock), 5);
}

#[tokio::test(start_paused = true)]
async fn test_submit_shouldSendOneCreationWithOperationIdAndDefaults() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    assert_ok!(client.submit(sample_input()).await);

    let creations: Vec<_> = mock.requests().into_iter().filter(|r| r.method == Method::POST).collect();
    assert_eq!(creations.len(), 1);
    let creation = &creations[0];
    assert!(creation.operation_id.as_deref().is_some_and(|id| !id.is_empty()));
    assert!(creation.query.as_deref().unwrap_or_default().contains("api-version=2024-05-20-preview"));
    let input = &creation.body.as_ref().expect("creation has a body")["input"];
    assert_eq!(input["subtitleMaxCharCountPerSegment"], 32);
    assert_eq!(input["sourceLocale"], "en-US");
}

#[tokio::test(start_paused = true)]
async fn test_submit_withInvalidInput_shouldFailWithoutRequests() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;

    let err = client.submit(sample_input().speaker_count(0)).await.unwrap_err();
    assert!(matches!(err, SubmissionError::Validation(ValidationError::SpeakerCount(0))));

    let mut input = sample_input();
    input.target_locale = String::new();
    let err = client.submit(input).await.unwrap_err();
    assert!(matches!(err, SubmissionError::Validation(ValidationError::Empty { field: "targetLocale" })));

    let err = client.submit(sample_input().subtitle_max_char_count_per_segment(129)).await.unwrap_err();
    assert!(matches!(err, SubmissionError::Validation(ValidationError::SubtitleMaxCharCount { .. })));

    assert_eq!(mock.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_submit_withFailedTranslation_shouldNotWaitForIteration() {
    let (client, mock) = mock_client(MockServiceConfig {
        translation_outcome: ResourceStatus::Failed,
        ..Default::default()
    })
    .await;

    let err = client.submit(sample_input()).await.unwrap_err();
    match &err {
        SubmissionError::TranslationFailed { translation } => {
            assert_eq!(translation.status, ResourceStatus::Failed);
            assert_eq!(translation.failure_reason.as_deref(), Some("Mock failure"));
        }
        other => panic!("expected TranslationFailed, got {other:?}"),
    }
    assert_eq!(err.translation_id(), Some("translation-1"));
    assert_eq!(mock.count(Method::GET, "/iterations/iteration-1"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_submit_withFailedIteration_shouldReturnBothResources() {
    let (client, _mock) = mock_client(MockServiceConfig {
        iteration_outcome: ResourceStatus::Failed,
        ..Default::default()
    })
    .await;

    match client.submit(sample_input()).await.unwrap_err() {
        SubmissionError::IterationFailed { translation, iteration } => {
            assert_eq!(translation.status, ResourceStatus::Succeeded);
            assert_eq!(iteration.status, ResourceStatus::Failed);
            assert!(iteration.result.is_none());
            assert!(iteration.failure_reason.is_some());
        }
        other => panic!("expected IterationFailed, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_submit_withoutEmbeddedIteration_shouldFindItInListing() {
    let (client, mock) = mock_client(MockServiceConfig {
        embed_first_iteration: false,
        ..Default::default()
    })
    .await;

    let (translation, iteration) = assert_ok!(client.submit(sample_input()).await);
    assert_eq!(iteration.id, "iteration-1");
    assert_eq!(mock.count(Method::GET, &format!("/translations/{}/iterations", translation.id)), 1);
    assert_eq!(gets(&mock), 6);
}

#[tokio::test(start_paused = true)]
async fn test_submit_withSlowTranslation_shouldTimeOutWithLastSnapshot() {
    let (client, mock) = mock_client(MockServiceConfig {
        translation_polls: 1000,
        ..Default::default()
    })
    .await;
    let client = client.with_policy(PollPolicy::fixed(Duration::from_secs(1), Duration::from_secs(3600)).with_max_polls(4));

    match client.submit(sample_input()).await.unwrap_err() {
        SubmissionError::TranslationWait { translation_id, source } => {
            assert_eq!(translation_id, "translation-1");
            assert!(source.is_timeout());
            assert_eq!(source.last_snapshot().map(|t| t.status), Some(ResourceStatus::Running));
        }
        other => panic!("expected TranslationWait, got {other:?}"),
    }
    assert_eq!(gets(&mock), 4);
}

#[tokio::test(start_paused = true)]
async fn test_submit_whenCancelled_shouldStopWaitingAndLeaveJobRunning() {
    let (client, mock) = mock_client(MockServiceConfig {
        translation_polls: 1000,
        ..Default::default()
    })
    .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(3500)).await;
        trigger.cancel();
    });

    let err = client.submit_with_cancel(sample_input(), &cancel).await.unwrap_err();
    match err {
        SubmissionError::TranslationWait { source, .. } => {
            assert!(source.is_cancelled());
            assert!(source.last_snapshot().is_some());
        }
        other => panic!("expected cancelled wait, got {other:?}"),
    }
    assert!(mock.contains("translation-1"));
    assert_eq!(mock.count(Method::DELETE, "/translations/translation-1"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_submit_withTransientPollFailures_shouldRetryAndSucceed() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    mock.fail_next_on(Method::GET, 503, Some("ServiceUnavailable"));
    mock.fail_next_on(Method::GET, 500, None);

    assert_ok!(client.submit(sample_input()).await);
    assert_eq!(gets(&mock), 7);
}

#[tokio::test(start_paused = true)]
async fn test_submit_withClientErrorDuringPoll_shouldAbortImmediately() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    mock.fail_next_on(Method::GET, 400, Some("InvalidRequest"));

    match client.submit(sample_input()).await.unwrap_err() {
        SubmissionError::TranslationWait {
            source: WaitError::ServiceRejected { source, .. },
            ..
        } => {
            assert_eq!(source.status_code(), Some(400));
            assert_eq!(source.service_error_code(), Some("InvalidRequest"));
        }
        other => panic!("expected ServiceRejected, got {other:?}"),
    }
    assert_eq!(gets(&mock), 1);
}

#[tokio::test(start_paused = true)]
async fn test_submit_withDroppedCreation_shouldNotRetryCreation() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    mock.drop_next_connection();

    let err = client.submit(sample_input()).await.unwrap_err();
    assert!(matches!(err, SubmissionError::Transport(TransportError::Network(_))));
    assert_eq!(mock.request_count(), 1);
    assert!(!mock.contains("translation-1"));
}

#[tokio::test(start_paused = true)]
async fn test_submit_concurrentJobs_shouldProgressIndependently() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;

    let jobs = (0..4).map(|_| {
        let client = client.clone();
        tokio::spawn(async move { client.submit(sample_input()).await })
    });
    let results = join_all(jobs).await;

    let mut ids: Vec<String> = results
        .into_iter()
        .map(|joined| joined.expect("task should not panic").expect("submission should succeed").0.id)
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert_eq!(mock.count(Method::POST, "/translations"), 4);
    assert_eq!(gets(&mock), 4 * 5);
}
