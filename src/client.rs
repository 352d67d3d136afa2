/*!
 * Client facade bundling transport, poll policy and submission defaults.
 *
 * ```no_run
 * # async fn demo() -> anyhow::Result<()> {
 * use vtranslate::{Config, TranslationInput, VideoTranslationClient, VoiceKind};
 *
 * let config = Config::load(None)?;
 * let client = VideoTranslationClient::builder(config).build().await?;
 * let input = TranslationInput::new("https://example.com/video.mp4", "en-US", "ja-JP", VoiceKind::PlatformVoice);
 * let (translation, iteration) = client.submit(input).await?;
 * println!("{}: {:?}", translation.id, iteration.translated_video_url());
 * # Ok(())
 * # }
 * ```
 */

use anyhow::{Context, Result};
use log::debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app_config::{Config, SubmissionDefaults};
use crate::errors::{IterationError, SubmissionError, TransportError};
use crate::jobs::{iteration, registry, submission};
use crate::model::{Iteration, IterationInput, Page, PageToken, Translation, TranslationInput, TranslationSummary};
use crate::polling::PollPolicy;
use crate::transport::{CredentialChain, HttpBackend, ReqwestBackend, TokenCache, Transport};

/// Entry point for all job operations.
///
/// Cheap to clone; clones share one transport and token cache, so
/// independent jobs can be driven concurrently from separate tasks.
#[derive(Debug, Clone)]
pub struct VideoTranslationClient {
    transport: Arc<Transport>,
    policy: PollPolicy,
    defaults: SubmissionDefaults,
}

impl VideoTranslationClient {
    /// Start building a client from configuration
    pub fn builder(config: Config) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Build with the default credential chain and HTTP backend
    pub async fn from_config(config: Config) -> Result<Self> {
        Self::builder(config).build().await
    }

    /// Assemble a client from parts
    pub fn from_transport(transport: Arc<Transport>, policy: PollPolicy, defaults: SubmissionDefaults) -> Self {
        Self {
            transport,
            policy,
            defaults,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn defaults(&self) -> &SubmissionDefaults {
        &self.defaults
    }

    /// Submit a translation and wait for it and its first iteration
    pub async fn submit(&self, input: TranslationInput) -> Result<(Translation, Iteration), SubmissionError> {
        self.submit_with_cancel(input, &CancellationToken::new()).await
    }

    /// `submit`, abandoning the wait when `cancel` fires
    pub async fn submit_with_cancel(
        &self,
        input: TranslationInput,
        cancel: &CancellationToken,
    ) -> Result<(Translation, Iteration), SubmissionError> {
        submission::submit(&self.transport, input, &self.defaults, &self.policy, cancel).await
    }

    /// Create a follow-up iteration and wait for it
    pub async fn create_iteration(&self, translation_id: &str, input: IterationInput) -> Result<Iteration, IterationError> {
        self.create_iteration_with_cancel(translation_id, input, &CancellationToken::new())
            .await
    }

    /// `create_iteration`, abandoning the wait when `cancel` fires
    pub async fn create_iteration_with_cancel(
        &self,
        translation_id: &str,
        input: IterationInput,
        cancel: &CancellationToken,
    ) -> Result<Iteration, IterationError> {
        iteration::create_iteration(&self.transport, translation_id, input, &self.policy, cancel).await
    }

    /// Create a follow-up iteration from an untyped WebVTT kind
    pub async fn create_iteration_with_webvtt(
        &self,
        translation_id: &str,
        webvtt_file_kind: &str,
        webvtt_file_url: &str,
        export_subtitle_in_video: Option<bool>,
    ) -> Result<Iteration, IterationError> {
        iteration::create_iteration_with_webvtt(
            &self.transport,
            translation_id,
            webvtt_file_kind,
            webvtt_file_url,
            export_subtitle_in_video,
            &self.policy,
            &CancellationToken::new(),
        )
        .await
    }

    pub async fn get_iteration(&self, translation_id: &str, iteration_id: &str) -> Result<Iteration, TransportError> {
        iteration::get_iteration(&self.transport, translation_id, iteration_id).await
    }

    pub async fn list_iterations(
        &self,
        translation_id: &str,
        page_token: Option<&PageToken>,
    ) -> Result<Page<Iteration>, TransportError> {
        iteration::list_iterations(&self.transport, translation_id, page_token).await
    }

    /// One page of translations; pass the previous page's token to continue
    pub async fn list(&self, page_token: Option<&PageToken>) -> Result<Page<TranslationSummary>, TransportError> {
        registry::list(&self.transport, page_token, None).await
    }

    /// `list` with an explicit page size for the first page
    pub async fn list_with_page_size(
        &self,
        page_token: Option<&PageToken>,
        page_size: u32,
    ) -> Result<Page<TranslationSummary>, TransportError> {
        registry::list(&self.transport, page_token, Some(page_size)).await
    }

    pub async fn get(&self, translation_id: &str) -> Result<Translation, TransportError> {
        registry::get(&self.transport, translation_id).await
    }

    /// Delete a translation; deleting a missing one succeeds
    pub async fn delete(&self, translation_id: &str) -> Result<(), TransportError> {
        registry::delete(&self.transport, translation_id).await
    }
}

/// Builder resolving credentials and the HTTP backend
#[derive(Debug)]
pub struct ClientBuilder {
    config: Config,
    credentials: Option<CredentialChain>,
    backend: Option<Arc<dyn HttpBackend>>,
    policy: Option<PollPolicy>,
}

impl ClientBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            credentials: None,
            backend: None,
            policy: None,
        }
    }

    /// Credential providers to probe, in order (default: environment, Azure CLI)
    pub fn credentials(mut self, chain: CredentialChain) -> Self {
        self.credentials = Some(chain);
        self
    }

    /// HTTP backend to use instead of `reqwest`
    pub fn backend(mut self, backend: Arc<dyn HttpBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Poll policy to use instead of the configured one
    pub fn poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Validate the configuration, resolve credentials and assemble the client
    pub async fn build(self) -> Result<VideoTranslationClient> {
        self.config.validate().context("Invalid client configuration")?;

        let chain = self.credentials.unwrap_or_else(CredentialChain::default_chain);
        let (provider, token) = chain
            .resolve(&self.config.token_scope)
            .await
            .context("Failed to obtain an access token")?;
        let tokens = TokenCache::with_token(provider, self.config.token_scope.clone(), token);

        let backend: Arc<dyn HttpBackend> = match self.backend {
            Some(backend) => backend,
            None => Arc::new(ReqwestBackend::new(self.config.request_timeout())?),
        };

        let transport = Transport::new(backend, &self.config.endpoint, self.config.api_version.clone(), tokens)?;
        debug!(
            "Client ready for {} (api-version {})",
            transport.endpoint(),
            transport.api_version()
        );

        let policy = self.policy.unwrap_or_else(|| self.config.poll_policy());
        Ok(VideoTranslationClient::from_transport(
            Arc::new(transport),
            policy,
            self.config.defaults,
        ))
    }
}
