/*!
 * Integration tests for listing, fetching and deleting translations
 */

use std::collections::HashSet;
use tokio_test::assert_ok;

use vtranslate::transport::Method;
use vtranslate::{MockServiceConfig, ResourceStatus, TransportError};

use crate::common::{mock_client, sample_input, TEST_ENDPOINT};

#[tokio::test]
async fn test_list_withPageSize_shouldPageThroughEveryTranslation() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    let seeded: HashSet<String> = mock.seed_translations(25).into_iter().collect();

    let mut seen = HashSet::new();
    let mut page_sizes = Vec::new();
    let mut page = assert_ok!(client.list_with_page_size(None, 10).await);
    loop {
        page_sizes.push(page.items.len());
        seen.extend(page.items.iter().map(|s| s.id.clone()));
        let Some(token) = page.next_page_token.clone() else { break };
        assert!(token.as_str().starts_with(TEST_ENDPOINT));
        page = assert_ok!(client.list(Some(&token)).await);
    }

    assert_eq!(page_sizes, vec![10, 10, 5]);
    assert_eq!(seen, seeded);
    assert!(mock.requests().iter().all(|r| r.query.as_deref().unwrap_or_default().contains("api-version=")));
}

#[tokio::test]
async fn test_list_withNoTranslations_shouldReturnLastEmptyPage() {
    let (client, _mock) = mock_client(MockServiceConfig::default()).await;
    let page = assert_ok!(client.list(None).await);
    assert!(page.items.is_empty());
    assert!(!page.has_more());
}

#[tokio::test]
async fn test_list_summaries_shouldCarryLocalesAndStatus() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    mock.seed_translation(&sample_input(), ResourceStatus::Failed);

    let page = assert_ok!(client.list(None).await);
    let summary = &page.items[0];
    assert_eq!(summary.status, ResourceStatus::Failed);
    assert_eq!(summary.source_locale, "en-US");
    assert_eq!(summary.target_locale, "ja-JP");
}

#[tokio::test]
async fn test_get_withUnknownId_shouldReturnNotFound() {
    let (client, _mock) = mock_client(MockServiceConfig::default()).await;
    let err = client.get("translation-missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn test_get_withInvalidId_shouldNotSendRequest() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    let err = client.get("../secrets").await.unwrap_err();
    assert!(matches!(err, TransportError::InvalidRequest(_)));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_delete_twice_shouldSucceedBothTimes() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    let id = mock.seed_translation(&sample_input(), ResourceStatus::Succeeded);

    assert_ok!(client.delete(&id).await);
    assert_ok!(client.delete(&id).await);
    assert_eq!(mock.count(Method::DELETE, &format!("/translations/{id}")), 2);
    assert!(client.get(&id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_delete_withServerError_shouldPropagate() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    let id = mock.seed_translation(&sample_input(), ResourceStatus::Succeeded);
    mock.fail_next_on(Method::DELETE, 500, None);

    let err = client.delete(&id).await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert!(mock.contains(&id));
}

#[tokio::test]
async fn test_get_whenThrottled_shouldExposeRetryAfter() {
    let (client, mock) = mock_client(MockServiceConfig::default()).await;
    let id = mock.seed_translation(&sample_input(), ResourceStatus::Succeeded);
    mock.throttle_next(3);

    let err = client.get(&id).await.unwrap_err();
    assert!(matches!(err, TransportError::RateLimited { .. }));
    assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(3)));
    assert!(err.is_transient());
}
