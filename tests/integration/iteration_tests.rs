/*!
 * Integration tests for follow-up iterations
 */

use tokio_test::assert_ok;

use vtranslate::transport::Method;
use vtranslate::{
    IterationError, IterationInput, MockServiceConfig, ResourceStatus, TransportError, ValidationError,
    WebvttFileKind,
};

use crate::common::{mock_client, sample_input};

#[tokio::test(start_paused = true)]
async fn test_create_iteration_withWebvtt_shouldSucceedAndBecomeLatest() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    let translation_id = mock.seed_translation(&sample_input(), ResourceStatus::Succeeded);

    let iteration = assert_ok!(
        client
            .create_iteration_with_webvtt(&translation_id, "TargetLocaleSubtitle", "https://x/fixed.vtt", Some(true))
            .await
    );

    assert_eq!(iteration.status, ResourceStatus::Succeeded);
    assert!(!iteration.is_initial());
    let webvtt = iteration.input.as_ref().and_then(|i| i.webvtt_file.as_ref()).expect("input echoed");
    assert_eq!(webvtt.kind, WebvttFileKind::TargetLocaleSubtitle);
    assert_eq!(mock.count(Method::GET, &format!("/iterations/{}", iteration.id)), 3);

    let translation = assert_ok!(client.get(&translation_id).await);
    assert_eq!(translation.iterations.len(), 2);
    assert_eq!(translation.latest_succeeded().map(|it| it.id.as_str()), Some(iteration.id.as_str()));
}

#[tokio::test(start_paused = true)]
async fn test_create_iteration_withUnknownKind_shouldFailWithoutRequests() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    let translation_id = mock.seed_translation(&sample_input(), ResourceStatus::Succeeded);

    let err = client
        .create_iteration_with_webvtt(&translation_id, "Subtitles", "https://x/fixed.vtt", None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IterationError::Validation(ValidationError::UnknownWebvttFileKind(ref kind)) if kind == "Subtitles"
    ));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_iteration_withoutWebvtt_shouldFailWithoutRequests() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    let translation_id = mock.seed_translation(&sample_input(), ResourceStatus::Succeeded);

    let err = client
        .create_iteration(&translation_id, IterationInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IterationError::Validation(ValidationError::Empty { field: "webvttFile" })));

    let err = client
        .create_iteration("bad/id", IterationInput::with_webvtt(WebvttFileKind::MetadataJson, "https://x/m.vtt"))
        .await
        .unwrap_err();
    assert!(matches!(err, IterationError::Validation(ValidationError::InvalidId(_))));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_iteration_forMissingTranslation_shouldSurfaceNotFound() {
    let (client, _mock) = mock_client(MockServiceConfig::default()).await;

    let input = IterationInput::with_webvtt(WebvttFileKind::SourceLocaleSubtitle, "https://x/source.vtt");
    match client.create_iteration("translation-404", input).await.unwrap_err() {
        IterationError::Transport(TransportError::NotFound { service_error_code, .. }) => {
            assert_eq!(service_error_code.as_deref(), Some("TranslationNotFound"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_create_iteration_withFailingService_shouldReturnFailed() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    let translation_id = mock.seed_translation(&sample_input(), ResourceStatus::Succeeded);
    mock.set_config(MockServiceConfig {
        iteration_outcome: ResourceStatus::Failed,
        ..Default::default()
    });

    let input = IterationInput::with_webvtt(WebvttFileKind::MetadataJson, "https://x/metadata.vtt");
    match client.create_iteration(&translation_id, input).await.unwrap_err() {
        IterationError::Failed { iteration } => {
            assert_eq!(iteration.status, ResourceStatus::Failed);
            assert!(iteration.result.is_none());
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_get_and_list_iterations_shouldReflectServiceState() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    let translation_id = mock.seed_translation(&sample_input(), ResourceStatus::Succeeded);

    let page = assert_ok!(client.list_iterations(&translation_id, None).await);
    assert_eq!(page.items.len(), 1);
    assert!(!page.has_more());
    let first = &page.items[0];
    assert!(first.is_initial());

    let fetched = assert_ok!(client.get_iteration(&translation_id, &first.id).await);
    assert_eq!(fetched.id, first.id);
    assert!(fetched.translated_video_url().is_some());

    let err = client.get_iteration(&translation_id, "iteration-999").await.unwrap_err();
    assert!(err.is_not_found());
}
