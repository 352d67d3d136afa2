/*!
 * In-memory fake of the video translation service.
 *
 * `MockService` implements `HttpBackend`, so a real `Transport` drives it
 * end to end. Every resource advances one status step per GET of that
 * resource:
 * - poll 1 reports `NotStarted`
 * - later polls report `Running`
 * - poll `n` (the configured count) and later report the configured outcome
 *
 * Faults can be scripted per request: error statuses, dropped connections
 * and rejected tokens. Every request is recorded for assertions.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use url::Url;

use super::{HttpBackend, HttpRequest, HttpResponse, Method, API_VERSION_PARAM, OPERATION_ID_HEADER};
use crate::errors::TransportError;
use crate::model::{ResourceStatus, TranslationInput, VoiceKind};

/// Behaviour of newly created resources
#[derive(Debug, Clone)]
pub struct MockServiceConfig {
    /// GETs of a translation until it reports its outcome
    pub translation_polls: u32,
    /// GETs of an iteration until it reports its outcome
    pub iteration_polls: u32,
    pub translation_outcome: ResourceStatus,
    pub iteration_outcome: ResourceStatus,
    /// Whether the creation response lists the first iteration
    pub embed_first_iteration: bool,
    /// Page size when the request does not ask for one
    pub default_page_size: usize,
}

impl Default for MockServiceConfig {
    fn default() -> Self {
        Self {
            translation_polls: 2,
            iteration_polls: 3,
            translation_outcome: ResourceStatus::Succeeded,
            iteration_outcome: ResourceStatus::Succeeded,
            embed_first_iteration: true,
            default_page_size: 10,
        }
    }
}

/// A request as received by the fake service
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub operation_id: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
enum Fault {
    Status {
        status: u16,
        code: Option<String>,
        retry_after: Option<u64>,
    },
    Disconnect,
}

#[derive(Debug)]
struct ScriptedFault {
    method: Option<Method>,
    fault: Fault,
}

#[derive(Debug, Clone)]
struct StoredIteration {
    id: String,
    input: Option<Value>,
    polls: u32,
    target_polls: u32,
    outcome: ResourceStatus,
    created: DateTime<Utc>,
}

impl StoredIteration {
    fn status(&self) -> ResourceStatus {
        status_at(self.polls, self.target_polls, self.outcome)
    }

    fn render(&self, translation_id: &str) -> Value {
        let status = self.status();
        let mut obj = Map::new();
        obj.insert("id".into(), json!(self.id));
        obj.insert("status".into(), json!(status.as_str()));
        obj.insert("createdDateTime".into(), json!(self.created.to_rfc3339()));
        obj.insert("lastActionDateTime".into(), json!(Utc::now().to_rfc3339()));
        if let Some(input) = &self.input {
            obj.insert("input".into(), input.clone());
        }
        match status {
            ResourceStatus::Succeeded => {
                let base = format!("https://mock.blob.core.windows.net/output/{}/{}", translation_id, self.id);
                obj.insert(
                    "result".into(),
                    json!({
                        "translatedVideoFileUrl": format!("{base}/translated.mp4"),
                        "sourceLocaleSubtitleWebvttFileUrl": format!("{base}/source.vtt"),
                        "targetLocaleSubtitleWebvttFileUrl": format!("{base}/target.vtt"),
                        "metadataJsonWebvttFileUrl": format!("{base}/metadata.vtt"),
                    }),
                );
            }
            ResourceStatus::Failed => {
                obj.insert("failureReason".into(), json!("Mock failure"));
            }
            _ => {}
        }
        Value::Object(obj)
    }
}

#[derive(Debug, Clone)]
struct StoredTranslation {
    id: String,
    input: Value,
    display_name: Option<String>,
    description: Option<String>,
    polls: u32,
    target_polls: u32,
    outcome: ResourceStatus,
    created: DateTime<Utc>,
    iterations: Vec<StoredIteration>,
}

impl StoredTranslation {
    fn status(&self) -> ResourceStatus {
        status_at(self.polls, self.target_polls, self.outcome)
    }

    fn render(&self) -> Value {
        let status = self.status();
        let mut obj = Map::new();
        obj.insert("id".into(), json!(self.id));
        obj.insert("status".into(), json!(status.as_str()));
        obj.insert("input".into(), self.input.clone());
        obj.insert("createdDateTime".into(), json!(self.created.to_rfc3339()));
        obj.insert("lastActionDateTime".into(), json!(Utc::now().to_rfc3339()));
        if let Some(name) = &self.display_name {
            obj.insert("displayName".into(), json!(name));
        }
        if let Some(description) = &self.description {
            obj.insert("description".into(), json!(description));
        }
        if status.is_failed() {
            obj.insert("failureReason".into(), json!("Mock failure"));
        }
        let iterations: Vec<Value> = self.iterations.iter().map(|it| it.render(&self.id)).collect();
        if let Some(latest) = self.iterations.iter().rev().find(|it| it.status().is_succeeded()) {
            obj.insert("latestSucceededIteration".into(), latest.render(&self.id));
        }
        obj.insert("iterations".into(), Value::Array(iterations));
        Value::Object(obj)
    }
}

#[derive(Debug, Default)]
struct MockState {
    config: MockServiceConfig,
    translations: Vec<StoredTranslation>,
    next_translation: u64,
    next_iteration: u64,
    faults: VecDeque<ScriptedFault>,
    rejected_auth_remaining: u32,
    requests: Vec<RecordedRequest>,
}

impl MockState {
    fn next_translation_id(&mut self) -> String {
        self.next_translation += 1;
        format!("translation-{}", self.next_translation)
    }

    fn new_iteration(&mut self, input: Option<Value>) -> StoredIteration {
        self.next_iteration += 1;
        StoredIteration {
            id: format!("iteration-{}", self.next_iteration),
            input,
            polls: 0,
            target_polls: self.config.iteration_polls,
            outcome: self.config.iteration_outcome,
            created: Utc::now(),
        }
    }

    fn translation_mut(&mut self, id: &str) -> Option<&mut StoredTranslation> {
        self.translations.iter_mut().find(|t| t.id == id)
    }

    fn take_fault(&mut self, method: &Method) -> Option<Fault> {
        let index = self
            .faults
            .iter()
            .position(|f| f.method.as_ref().is_none_or(|m| m == method))?;
        self.faults.remove(index).map(|f| f.fault)
    }
}

/// Scripted in-memory implementation of the translation REST API
#[derive(Debug, Default)]
pub struct MockService {
    state: Mutex<MockState>,
}

impl MockService {
    pub fn new(config: MockServiceConfig) -> Self {
        Self {
            state: Mutex::new(MockState {
                config,
                ..Default::default()
            }),
        }
    }

    /// Change the behaviour of resources created from now on
    pub fn set_config(&self, config: MockServiceConfig) {
        self.state.lock().config = config;
    }

    /// Answer the next request with `status` and an optional service error code
    pub fn fail_next(&self, status: u16, code: Option<&str>) {
        self.push_fault(None, Fault::Status {
            status,
            code: code.map(str::to_string),
            retry_after: None,
        });
    }

    /// Answer the next request with `method` with `status`
    pub fn fail_next_on(&self, method: Method, status: u16, code: Option<&str>) {
        self.push_fault(Some(method), Fault::Status {
            status,
            code: code.map(str::to_string),
            retry_after: None,
        });
    }

    /// Answer the next request with 429 and a `Retry-After` of `seconds`
    pub fn throttle_next(&self, seconds: u64) {
        self.push_fault(None, Fault::Status {
            status: 429,
            code: Some("TooManyRequests".to_string()),
            retry_after: Some(seconds),
        });
    }

    /// Fail the next request before any response is produced
    pub fn drop_next_connection(&self) {
        self.push_fault(None, Fault::Disconnect);
    }

    /// Answer the next `count` requests with 401
    pub fn reject_next_auth(&self, count: u32) {
        self.state.lock().rejected_auth_remaining += count;
    }

    fn push_fault(&self, method: Option<Method>, fault: Fault) {
        self.state.lock().faults.push_back(ScriptedFault { method, fault });
    }

    /// Insert a translation that already reports `outcome`; returns its id
    pub fn seed_translation(&self, input: &TranslationInput, outcome: ResourceStatus) -> String {
        let mut state = self.state.lock();
        let id = state.next_translation_id();
        let mut first = state.new_iteration(None);
        first.target_polls = 0;
        first.outcome = outcome;
        let input = serde_json::to_value(input).unwrap_or(Value::Null);
        state.translations.push(StoredTranslation {
            id: id.clone(),
            input,
            display_name: None,
            description: None,
            polls: 0,
            target_polls: 0,
            outcome,
            created: Utc::now(),
            iterations: vec![first],
        });
        id
    }

    /// Insert `count` succeeded translations with a default input
    pub fn seed_translations(&self, count: usize) -> Vec<String> {
        let input = TranslationInput::new("https://mock.example.com/video.mp4", "en-US", "ja-JP", VoiceKind::PlatformVoice);
        (0..count)
            .map(|_| self.seed_translation(&input, ResourceStatus::Succeeded))
            .collect()
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Requests with `method` whose path ends with `path_suffix`
    pub fn count(&self, method: Method, path_suffix: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path.ends_with(path_suffix))
            .count()
    }

    /// GETs served for a translation so far
    pub fn translation_polls(&self, translation_id: &str) -> Option<u32> {
        let state = self.state.lock();
        state.translations.iter().find(|t| t.id == translation_id).map(|t| t.polls)
    }

    pub fn contains(&self, translation_id: &str) -> bool {
        self.state.lock().translations.iter().any(|t| t.id == translation_id)
    }

    fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.state.lock();

        let body = request.body.clone();
        state.requests.push(RecordedRequest {
            method: request.method.clone(),
            path: request.url.path().to_string(),
            query: request.url.query().map(str::to_string),
            authorization: request.header("Authorization").map(str::to_string),
            operation_id: request.header(OPERATION_ID_HEADER).map(str::to_string),
            body: body.clone(),
        });

        let bearer = request.header("Authorization").is_some_and(|v| v.starts_with("Bearer "));
        if !bearer {
            return Ok(error(401, "Unauthorized", "Access token is missing"));
        }
        if state.rejected_auth_remaining > 0 {
            state.rejected_auth_remaining -= 1;
            return Ok(error(401, "Unauthorized", "Access token is invalid or expired"));
        }

        if let Some(fault) = state.take_fault(&request.method) {
            return match fault {
                Fault::Disconnect => Err(TransportError::Network("connection reset by peer".to_string())),
                Fault::Status { status, code, retry_after } => {
                    let mut response = error(status, code.as_deref().unwrap_or("InjectedFault"), "Injected failure");
                    if let Some(secs) = retry_after {
                        response = response.with_header("Retry-After", secs.to_string());
                    }
                    Ok(response)
                }
            };
        }

        if !request.url.query_pairs().any(|(k, v)| k == API_VERSION_PARAM && !v.is_empty()) {
            return Ok(error(400, "MissingApiVersion", "The api-version query parameter is required"));
        }

        let segments: Vec<&str> = request
            .url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let Some(root) = segments.iter().position(|s| *s == "translations") else {
            return Ok(error(404, "NotFound", "Unknown route"));
        };

        match (request.method.as_str(), &segments[root + 1..]) {
            ("GET", []) => Ok(list_translations(&state, &request.url)),
            ("POST", []) => Ok(create_translation(&mut state, request, body)),
            ("GET", [id]) => Ok(get_translation(&mut state, id)),
            ("DELETE", [id]) => Ok(delete_translation(&mut state, id)),
            ("GET", [id, "iterations"]) => Ok(list_iterations(&state, id, &request.url)),
            ("POST", [id, "iterations"]) => Ok(create_iteration(&mut state, request, id, body)),
            ("GET", [id, "iterations", iteration_id]) => Ok(get_iteration(&mut state, id, iteration_id)),
            _ => Ok(error(405, "MethodNotAllowed", "Unsupported route")),
        }
    }
}

#[async_trait]
impl HttpBackend for MockService {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.handle(&request)
    }
}

fn status_at(polls: u32, target: u32, outcome: ResourceStatus) -> ResourceStatus {
    if polls >= target {
        outcome
    } else if polls <= 1 {
        ResourceStatus::NotStarted
    } else {
        ResourceStatus::Running
    }
}

fn error(status: u16, code: &str, message: &str) -> HttpResponse {
    HttpResponse::new(status, json!({"error": {"code": code, "message": message}}).to_string())
        .with_header("Content-Type", "application/json")
}

fn ok(status: u16, body: Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string()).with_header("Content-Type", "application/json")
}

fn not_found(what: &str, id: &str) -> HttpResponse {
    error(404, &format!("{what}NotFound"), &format!("{what} '{id}' does not exist"))
}

fn require_operation_id(request: &HttpRequest) -> Option<HttpResponse> {
    match request.header(OPERATION_ID_HEADER) {
        Some(id) if !id.is_empty() => None,
        _ => Some(error(400, "MissingOperationId", "Creation requests require an Operation-Id header")),
    }
}

fn paging(url: &Url, default_size: usize) -> (usize, usize) {
    let mut skip = 0;
    let mut size = default_size;
    for (k, v) in url.query_pairs() {
        match k.as_ref() {
            "skip" => skip = v.parse().unwrap_or(0),
            "maxpagesize" => size = v.parse().unwrap_or(default_size).max(1),
            _ => {}
        }
    }
    (skip, size)
}

fn page(url: &Url, items: Vec<Value>, total: usize, skip: usize, size: usize) -> HttpResponse {
    let mut body = json!({ "value": items });
    if skip + size < total {
        let api_version = url
            .query_pairs()
            .find(|(k, _)| k == API_VERSION_PARAM)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        let mut next = url.clone();
        next.query_pairs_mut()
            .clear()
            .append_pair(API_VERSION_PARAM, &api_version)
            .append_pair("skip", &(skip + size).to_string())
            .append_pair("maxpagesize", &size.to_string());
        body["nextLink"] = json!(next.as_str());
    }
    ok(200, body)
}

fn list_translations(state: &MockState, url: &Url) -> HttpResponse {
    let (skip, size) = paging(url, state.config.default_page_size);
    let items = state
        .translations
        .iter()
        .skip(skip)
        .take(size)
        .map(StoredTranslation::render)
        .collect();
    page(url, items, state.translations.len(), skip, size)
}

fn create_translation(state: &mut MockState, request: &HttpRequest, body: Option<Value>) -> HttpResponse {
    if let Some(rejection) = require_operation_id(request) {
        return rejection;
    }
    let Some(body) = body else {
        return error(400, "InvalidRequest", "Request body is required");
    };
    let Some(input) = body.get("input").filter(|v| v.is_object()).cloned() else {
        return error(400, "InvalidRequest", "input is required");
    };
    if serde_json::from_value::<TranslationInput>(input.clone()).is_err() {
        return error(400, "InvalidRequest", "input is malformed");
    }

    let id = state.next_translation_id();
    let first = state.new_iteration(None);
    let translation = StoredTranslation {
        id,
        input,
        display_name: body.get("displayName").and_then(Value::as_str).map(str::to_string),
        description: body.get("description").and_then(Value::as_str).map(str::to_string),
        polls: 0,
        target_polls: state.config.translation_polls,
        outcome: state.config.translation_outcome,
        created: Utc::now(),
        iterations: vec![first],
    };

    let mut rendered = translation.render();
    if !state.config.embed_first_iteration {
        rendered["iterations"] = json!([]);
    }
    state.translations.push(translation);
    ok(201, rendered)
}

fn get_translation(state: &mut MockState, id: &str) -> HttpResponse {
    match state.translation_mut(id) {
        Some(translation) => {
            translation.polls += 1;
            ok(200, translation.render())
        }
        None => not_found("Translation", id),
    }
}

fn delete_translation(state: &mut MockState, id: &str) -> HttpResponse {
    let before = state.translations.len();
    state.translations.retain(|t| t.id != id);
    if state.translations.len() == before {
        not_found("Translation", id)
    } else {
        HttpResponse::new(204, "")
    }
}

fn list_iterations(state: &MockState, id: &str, url: &Url) -> HttpResponse {
    let Some(translation) = state.translations.iter().find(|t| t.id == id) else {
        return not_found("Translation", id);
    };
    let (skip, size) = paging(url, state.config.default_page_size);
    let items = translation
        .iterations
        .iter()
        .skip(skip)
        .take(size)
        .map(|it| it.render(id))
        .collect();
    page(url, items, translation.iterations.len(), skip, size)
}

fn create_iteration(state: &mut MockState, request: &HttpRequest, id: &str, body: Option<Value>) -> HttpResponse {
    if let Some(rejection) = require_operation_id(request) {
        return rejection;
    }
    if !state.translations.iter().any(|t| t.id == id) {
        return not_found("Translation", id);
    }
    let input = body.and_then(|b| b.get("input").cloned());
    let webvtt_ok = input
        .as_ref()
        .and_then(|i| i.get("webvttFile"))
        .and_then(|f| f.get("kind"))
        .and_then(Value::as_str)
        .is_some_and(|k| matches!(k, "MetadataJson" | "SourceLocaleSubtitle" | "TargetLocaleSubtitle"));
    if !webvtt_ok {
        return error(400, "InvalidRequest", "input.webvttFile with a valid kind is required");
    }

    let iteration = state.new_iteration(input);
    let rendered = iteration.render(id);
    if let Some(translation) = state.translation_mut(id) {
        translation.iterations.push(iteration);
    }
    ok(201, rendered)
}

fn get_iteration(state: &mut MockState, id: &str, iteration_id: &str) -> HttpResponse {
    let Some(translation) = state.translation_mut(id) else {
        return not_found("Translation", id);
    };
    match translation.iterations.iter_mut().find(|it| it.id == iteration_id) {
        Some(iteration) => {
            iteration.polls += 1;
            let rendered = iteration.render(id);
            ok(200, rendered)
        }
        None => not_found("Iteration", iteration_id),
    }
}
