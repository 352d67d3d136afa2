/*!
 * Authenticated transport to the video translation service.
 *
 * - `Transport`: builds URLs, attaches bearer tokens, retries once on 401
 *   and decodes service errors into `TransportError`
 * - `HttpBackend`: the seam between the transport and an HTTP stack
 * - `http`: the production `reqwest` backend
 * - `auth`: credential providers and the token cache
 * - `mock`: an in-memory fake of the service for tests and offline use
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

pub use reqwest::Method;

use crate::errors::{AuthError, TransportError};

pub mod auth;
pub mod http;
pub mod mock;

pub use auth::{
    AccessToken, AzureCliCredential, CredentialChain, CredentialProvider, EnvironmentCredential,
    StaticTokenCredential, TokenCache,
};
pub use http::ReqwestBackend;
pub use mock::{MockService, MockServiceConfig, RecordedRequest};

/// Query parameter every request carries
pub const API_VERSION_PARAM: &str = "api-version";

/// Header that makes creation requests traceable and idempotent
pub const OPERATION_ID_HEADER: &str = "Operation-Id";

/// Longest `Retry-After` delay accepted from the service
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60 * 60);

/// Longest service error text kept in an error message
const MAX_ERROR_TEXT_LEN: usize = 512;

/// A fully resolved outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A raw response as returned by a backend
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Executes HTTP requests; implemented by `ReqwestBackend` and `MockService`
#[async_trait]
pub trait HttpBackend: Send + Sync + Debug {
    /// Send one request. Only failures to obtain a response are errors;
    /// non-2xx responses are returned as values.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// A successful (2xx) service response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    /// Decode the body into `T`
    pub fn json<T: DeserializeOwned>(self) -> Result<T, TransportError> {
        let body = self
            .body
            .ok_or_else(|| TransportError::Decode(format!("empty body in {} response", self.status)))?;
        serde_json::from_value(body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Authenticated client for the service's REST surface
#[derive(Debug)]
pub struct Transport {
    backend: Arc<dyn HttpBackend>,
    endpoint: Url,
    api_version: String,
    tokens: TokenCache,
}

impl Transport {
    /// Create a transport rooted at `endpoint`
    pub fn new(
        backend: Arc<dyn HttpBackend>,
        endpoint: &str,
        api_version: impl Into<String>,
        tokens: TokenCache,
    ) -> Result<Self, TransportError> {
        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| TransportError::InvalidRequest(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.host_str().is_none() {
            return Err(TransportError::InvalidRequest(format!(
                "endpoint '{}' must be an http(s) URL",
                endpoint
            )));
        }

        Ok(Self {
            backend,
            endpoint,
            api_version: api_version.into(),
            tokens,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    /// Send a request to `path`, relative to the endpoint
    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse, TransportError> {
        let url = self.build_url(path)?;
        self.execute(method, url, body, &[]).await
    }

    /// Send a creation request, tagged with a fresh `Operation-Id`
    pub async fn create(&self, path: &str, body: &Value) -> Result<ApiResponse, TransportError> {
        let url = self.build_url(path)?;
        let operation_id = Uuid::new_v4().to_string();
        debug!("POST {} (operation {})", url.path(), operation_id);
        self.execute(Method::POST, url, Some(body), &[(OPERATION_ID_HEADER, operation_id)])
            .await
    }

    /// Send a request to a service-provided link (e.g. a `nextLink`).
    ///
    /// Absolute links must share the endpoint's origin; the bearer token is
    /// never sent anywhere else. Relative links resolve against the endpoint.
    pub async fn send_to_link(&self, method: Method, link: &str) -> Result<ApiResponse, TransportError> {
        let url = match Url::parse(link) {
            Ok(url) => {
                if url.origin() != self.endpoint.origin() {
                    return Err(TransportError::InvalidRequest(format!(
                        "refusing to follow link to foreign origin: {}",
                        url.origin().ascii_serialization()
                    )));
                }
                self.with_api_version(url)
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => self.build_url(link)?,
            Err(e) => return Err(TransportError::InvalidRequest(format!("invalid link '{}': {}", link, e))),
        };
        self.execute(method, url, None, &[]).await
    }

    /// GET `path` and decode the body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.send(Method::GET, path, None).await?.json()
    }

    /// Resolve `path` (which may carry a query) against the endpoint
    pub fn build_url(&self, path: &str) -> Result<Url, TransportError> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        let joined = format!("{}/{}", base, path.trim_start_matches('/'));
        let url = Url::parse(&joined)
            .map_err(|e| TransportError::InvalidRequest(format!("invalid request path '{}': {}", path, e)))?;
        Ok(self.with_api_version(url))
    }

    fn with_api_version(&self, mut url: Url) -> Url {
        if !url.query_pairs().any(|(k, _)| k == API_VERSION_PARAM) {
            url.query_pairs_mut().append_pair(API_VERSION_PARAM, &self.api_version);
        }
        url
    }

    /// Execute with a cached token, refreshing and retrying once on 401
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        extra_headers: &[(&str, String)],
    ) -> Result<ApiResponse, TransportError> {
        let token = self.tokens.token().await?;
        let request = Self::request(method, url, body, extra_headers, &token);
        let path = request.url.path().to_string();

        let response = self.backend.execute(request.clone()).await?;
        if response.status != 401 {
            return Self::into_result(&path, response);
        }

        warn!("{} {} returned 401, refreshing token", request.method, path);
        let fresh = self.tokens.refresh(Some(token.secret())).await?;
        let retry = Self::request(request.method, request.url, body, extra_headers, &fresh);
        let response = self.backend.execute(retry).await?;
        if response.status == 401 {
            let (_, message) = decode_error_body(&response);
            return Err(AuthError::Rejected { message }.into());
        }
        Self::into_result(&path, response)
    }

    fn request(
        method: Method,
        url: Url,
        body: Option<&Value>,
        extra_headers: &[(&str, String)],
        token: &AccessToken,
    ) -> HttpRequest {
        let mut headers = vec![
            ("Authorization".to_string(), format!("Bearer {}", token.secret())),
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), format!("vtranslate/{}", env!("CARGO_PKG_VERSION"))),
        ];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        headers.extend(extra_headers.iter().map(|(k, v)| (k.to_string(), v.clone())));

        HttpRequest {
            method,
            url,
            headers,
            body: body.cloned(),
        }
    }

    fn into_result(path: &str, response: HttpResponse) -> Result<ApiResponse, TransportError> {
        if response.is_success() {
            let body = if response.body.trim().is_empty() {
                None
            } else {
                Some(
                    serde_json::from_str(&response.body)
                        .map_err(|e| TransportError::Decode(format!("{} from {}", e, path)))?,
                )
            };
            return Ok(ApiResponse {
                status: response.status,
                body,
            });
        }

        let (service_error_code, message) = decode_error_body(&response);
        debug!("{} failed with {}: {}", path, response.status, message);
        Err(match response.status {
            404 => TransportError::NotFound {
                path: path.to_string(),
                service_error_code,
                message,
            },
            429 => TransportError::RateLimited {
                retry_after: response.header("Retry-After").and_then(parse_retry_after),
                message,
            },
            status_code => TransportError::Service {
                status_code,
                service_error_code,
                message,
            },
        })
    }
}

/// Service error code and message of a failed response
fn decode_error_body(response: &HttpResponse) -> (Option<String>, String) {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&response.body) {
        let message = envelope
            .error
            .message
            .unwrap_or_else(|| default_reason(response.status));
        return (envelope.error.code, message);
    }

    let text = response.body.trim();
    if text.is_empty() {
        (None, default_reason(response.status))
    } else {
        (None, truncate(text, MAX_ERROR_TEXT_LEN))
    }
}

fn default_reason(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("unexpected status")
        .to_string()
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// `Retry-After` as delay-seconds or an HTTP date, capped at `MAX_RETRY_AFTER`
fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    let delay = match value.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => {
            let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
            (at - Utc::now()).to_std().ok()?
        }
    };
    Some(delay.min(MAX_RETRY_AFTER))
}
