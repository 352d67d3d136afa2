/*!
 * Bearer-token credentials and the shared token cache.
 *
 * Credential providers:
 * - `StaticTokenCredential`: a token handed in by the caller
 * - `EnvironmentCredential`: a token read from an environment variable
 * - `AzureCliCredential`: a token minted by `az account get-access-token`
 *
 * A `CredentialChain` probes providers in order once, at client
 * construction; the winner backs a `TokenCache` for the life of the client.
 */

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::AuthError;

/// Environment variable read by `EnvironmentCredential::new`
pub const ACCESS_TOKEN_ENV_VAR: &str = "VIDEO_TRANSLATION_ACCESS_TOKEN";

/// Tokens this close to expiry are refreshed before use
const DEFAULT_EXPIRY_SKEW_SECS: i64 = 120;

/// Lifetime assumed for tokens whose expiry is unknown
const ASSUMED_TOKEN_LIFETIME_SECS: i64 = 60 * 60;

/// A bearer token and its expiry
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// The raw token value
    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token expires within `skew` from now
    pub fn expires_within(&self, skew: chrono::Duration) -> bool {
        Utc::now() + skew >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of bearer tokens for a scope
#[async_trait]
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Short name used in logs and error messages
    fn name(&self) -> &str;

    /// Obtain a fresh token for `scope`
    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError>;
}

/// A caller-supplied token; refreshing returns the same value
#[derive(Debug, Clone)]
pub struct StaticTokenCredential {
    token: AccessToken,
}

impl StaticTokenCredential {
    /// Token assumed valid for an hour from now
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token, Utc::now() + chrono::Duration::seconds(ASSUMED_TOKEN_LIFETIME_SECS)),
        }
    }

    pub fn with_expiry(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: AccessToken::new(token, expires_at),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenCredential {
    fn name(&self) -> &str {
        "static"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken, AuthError> {
        Ok(self.token.clone())
    }
}

/// Token read from an environment variable at every refresh
#[derive(Debug, Clone)]
pub struct EnvironmentCredential {
    variable: String,
}

impl EnvironmentCredential {
    pub fn new() -> Self {
        Self::from_variable(ACCESS_TOKEN_ENV_VAR)
    }

    pub fn from_variable(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

impl Default for EnvironmentCredential {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialProvider for EnvironmentCredential {
    fn name(&self) -> &str {
        "environment"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken, AuthError> {
        match std::env::var(&self.variable) {
            Ok(value) if !value.trim().is_empty() => Ok(AccessToken::new(
                value.trim(),
                Utc::now() + chrono::Duration::seconds(ASSUMED_TOKEN_LIFETIME_SECS),
            )),
            _ => Err(AuthError::Credential {
                provider: self.name().to_string(),
                message: format!("{} is not set", self.variable),
            }),
        }
    }
}

/// Token minted by the Azure CLI for the signed-in account
#[derive(Debug, Clone)]
pub struct AzureCliCredential {
    program: String,
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self {
            program: "az".to_string(),
        }
    }

    /// Use a different executable, e.g. a full path to `az`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn failure(&self, message: impl Into<String>) -> AuthError {
        AuthError::Credential {
            provider: self.name().to_string(),
            message: message.into(),
        }
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

/// `az account get-access-token --output json` payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Unix seconds; newer CLI versions only
    #[serde(default, rename = "expires_on")]
    expires_on: Option<i64>,
    /// Local time, e.g. "2025-01-01 10:00:00.000000"
    #[serde(default)]
    expires_on_local: Option<String>,
}

impl CliToken {
    fn expiry(&self) -> DateTime<Utc> {
        if let Some(ts) = self.expires_on.and_then(|secs| Utc.timestamp_opt(secs, 0).single()) {
            return ts;
        }
        self.expires_on_local
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
            .and_then(|naive| Local.from_local_datetime(&naive).single())
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(ASSUMED_TOKEN_LIFETIME_SECS))
    }
}

/// Parse CLI output; `expiresOn` is the CLI's local-time field
fn parse_cli_token(stdout: &str) -> Result<AccessToken, String> {
    let mut value: serde_json::Value = serde_json::from_str(stdout).map_err(|e| e.to_string())?;
    if let Some(obj) = value.as_object_mut() {
        if let Some(local) = obj.remove("expiresOn") {
            obj.insert("expiresOnLocal".to_string(), local);
        }
    }
    let token: CliToken = serde_json::from_value(value).map_err(|e| e.to_string())?;
    if token.access_token.is_empty() {
        return Err("empty accessToken".to_string());
    }
    Ok(AccessToken::new(token.access_token.clone(), token.expiry()))
}

#[async_trait]
impl CredentialProvider for AzureCliCredential {
    fn name(&self) -> &str {
        "azure-cli"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        debug!("Requesting token for {} from {}", scope, self.program);
        let output = tokio::process::Command::new(&self.program)
            .args(["account", "get-access-token", "--scope", scope, "--output", "json"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.failure(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!("{} exited with {}: {}", self.program, output.status, stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_cli_token(&stdout).map_err(|e| self.failure(format!("unexpected CLI output: {}", e)))
    }
}

/// Ordered list of credential providers, probed first to last
#[derive(Debug, Clone, Default)]
pub struct CredentialChain {
    providers: Vec<Arc<dyn CredentialProvider>>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment variable first, then the Azure CLI
    pub fn default_chain() -> Self {
        Self::new()
            .with(EnvironmentCredential::new())
            .with(AzureCliCredential::new())
    }

    pub fn with(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn with_shared(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Probe providers in order and keep the first that yields a token
    pub async fn resolve(&self, scope: &str) -> Result<(Arc<dyn CredentialProvider>, AccessToken), AuthError> {
        if self.providers.is_empty() {
            return Err(AuthError::NoProvider);
        }

        let mut attempts = Vec::new();
        for provider in &self.providers {
            match provider.get_token(scope).await {
                Ok(token) => {
                    info!("Using {} credentials", provider.name());
                    return Ok((provider.clone(), token));
                }
                Err(e) => {
                    debug!("Credential provider {} unavailable: {}", provider.name(), e);
                    attempts.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        Err(AuthError::ChainExhausted { attempts })
    }
}

/// Shared bearer-token cache.
///
/// Reads are concurrent. Refreshes go through a single async gate; a caller
/// that queued behind another refresh reuses the token it produced.
#[derive(Debug)]
pub struct TokenCache {
    provider: Arc<dyn CredentialProvider>,
    scope: String,
    current: RwLock<Option<AccessToken>>,
    refresh_gate: tokio::sync::Mutex<()>,
    refreshes: AtomicU64,
    skew: chrono::Duration,
}

impl TokenCache {
    /// Empty cache; the first `token()` call fetches
    pub fn new(provider: Arc<dyn CredentialProvider>, scope: impl Into<String>) -> Self {
        Self {
            provider,
            scope: scope.into(),
            current: RwLock::new(None),
            refresh_gate: tokio::sync::Mutex::new(()),
            refreshes: AtomicU64::new(0),
            skew: chrono::Duration::seconds(DEFAULT_EXPIRY_SKEW_SECS),
        }
    }

    /// Cache primed with a token already obtained from `provider`
    pub fn with_token(provider: Arc<dyn CredentialProvider>, scope: impl Into<String>, token: AccessToken) -> Self {
        let cache = Self::new(provider, scope);
        *cache.current.write() = Some(token);
        cache
    }

    pub fn with_skew(mut self, skew: chrono::Duration) -> Self {
        self.skew = skew;
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Number of times the provider was asked for a token through this cache
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// A usable token, refreshing only if none is cached or it is near expiry
    pub async fn token(&self) -> Result<AccessToken, AuthError> {
        if let Some(token) = self.usable(None) {
            return Ok(token);
        }
        self.refresh(None).await
    }

    /// Replace a token the service rejected.
    ///
    /// If another caller already replaced `rejected` while this one waited on
    /// the gate, its token is returned without asking the provider again.
    pub async fn refresh(&self, rejected: Option<&str>) -> Result<AccessToken, AuthError> {
        let _gate = self.refresh_gate.lock().await;

        if let Some(token) = self.usable(rejected) {
            if rejected.is_some() {
                debug!("Token already refreshed by a concurrent request");
            }
            return Ok(token);
        }

        let fresh = self.provider.get_token(&self.scope).await.inspect_err(|e| {
            warn!("Token refresh via {} failed: {}", self.provider.name(), e);
        })?;
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        debug!("Obtained token from {} (expires {})", self.provider.name(), fresh.expires_at());
        *self.current.write() = Some(fresh.clone());
        Ok(fresh)
    }

    /// Cached token unless missing, near expiry or equal to `rejected`
    fn usable(&self, rejected: Option<&str>) -> Option<AccessToken> {
        let guard = self.current.read();
        let token = guard.as_ref()?;
        if token.expires_within(self.skew) || rejected == Some(token.secret()) {
            return None;
        }
        Some(token.clone())
    }
}
