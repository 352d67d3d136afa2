/*!
 * Common test utilities for the vtranslate test suite
 */

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vtranslate::errors::AuthError;
use vtranslate::transport::AccessToken;
use vtranslate::{
    Config, CredentialChain, CredentialProvider, MockService, MockServiceConfig, PollPolicy, StaticTokenCredential,
    TranslationInput, VideoTranslationClient, VoiceKind,
};

/// Endpoint every test client talks to; the fake service ignores the host
pub const TEST_ENDPOINT: &str = "https://mock.cognitiveservices.azure.com/videotranslation";

/// Route library logs to the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A valid English to Japanese input
pub fn sample_input() -> TranslationInput {
    TranslationInput::new(
        "https://storage.example.com/videos/demo.mp4",
        "en-US",
        "ja-JP",
        VoiceKind::PlatformVoice,
    )
}

/// One poll per second, an hour at most, three transient retries
pub fn fast_policy() -> PollPolicy {
    PollPolicy::fixed(Duration::from_secs(1), Duration::from_secs(3600))
        .with_transient_retries(3, Duration::from_millis(100))
}

/// Client wired to a fresh fake service with a static token
pub async fn mock_client(config: MockServiceConfig) -> (VideoTranslationClient, Arc<MockService>) {
    mock_client_with(config, CredentialChain::new().with(StaticTokenCredential::new("test-token"))).await
}

/// Client wired to a fresh fake service with the given credentials
pub async fn mock_client_with(
    config: MockServiceConfig,
    credentials: CredentialChain,
) -> (VideoTranslationClient, Arc<MockService>) {
    init_logging();
    let mock = Arc::new(MockService::new(config));
    let client = VideoTranslationClient::builder(Config::new(TEST_ENDPOINT))
        .credentials(credentials)
        .backend(mock.clone())
        .poll_policy(fast_policy())
        .build()
        .await
        .expect("client should build against the fake service");
    (client, mock)
}

/// Hands out "token-1", "token-2", ... after an optional delay and counts calls
#[derive(Debug, Default)]
pub struct CountingCredential {
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingCredential {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for CountingCredential {
    fn name(&self) -> &str {
        "counting"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken, AuthError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(AccessToken::new(format!("token-{n}"), Utc::now() + chrono::Duration::hours(1)))
    }
}

/// Provider that never yields a token
#[derive(Debug)]
pub struct UnavailableCredential;

#[async_trait]
impl CredentialProvider for UnavailableCredential {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken, AuthError> {
        Err(AuthError::Credential {
            provider: "unavailable".to_string(),
            message: "not signed in".to_string(),
        })
    }
}
