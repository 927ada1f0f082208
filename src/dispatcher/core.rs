//! Dispatcher core: the per-request path.
//!
//! Routing, validation and synthesis all read shared, immutable state; the
//! only allocations per request are the outcome itself and the validation
//! errors it carries.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::unnecessary_to_owned)]

use super::request::MockRequest;
use crate::config::MockConfig;
use crate::mock::{select_response, MockOptions, MockSynthesizer};
use crate::router::{MatchOutcome, RouteMatch, Router};
use crate::spec::{
    find_media, is_json_media_type, media_type_matches, BodySpec, Definition, Operation,
    ParameterLocation,
};
use crate::validator::{
    coerce_form, coerce_parameter, query_object, ErrorLocation, SchemaValidator,
    ValidationContext, ValidationError, ValidationResult,
};
use http::Method;
use serde::Serialize;
use serde_json::{json, Value};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage for requests and responses. Names are `Arc<str>` so
/// repeated names clone in O(1).
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Header parameters OpenAPI says to ignore; they are described elsewhere.
const RESERVED_HEADER_PARAMS: [&str; 3] = ["accept", "content-type", "authorization"];

/// Status, headers and JSON body produced by a handler or the synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MockResponse {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// `null` means no body
    pub body: Value,
}

impl MockResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with a `content-type` header
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Error response in the `{"err": ...}` shape
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "err": message }))
    }

    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self::new(status, HeaderVec::new(), Value::Null)
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Body as wire text: JSON for JSON media types, raw text for string
    /// bodies of other types, `None` when there is no body.
    #[must_use]
    pub fn body_text(&self) -> Option<String> {
        let json = self.get_header("content-type").is_none_or(is_json_media_type);
        match &self.body {
            Value::Null => None,
            Value::String(s) if !json => Some(s.clone()),
            body => Some(body.to_string()),
        }
    }
}

/// Result of dispatching one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Handled(MockResponse),
    ValidationFailed(Vec<ValidationError>),
    NotFound,
    MethodNotAllowed(Vec<Method>),
}

impl Outcome {
    /// Status code the transport should send.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Outcome::Handled(response) => response.status,
            Outcome::ValidationFailed(_) => 400,
            Outcome::NotFound => 404,
            Outcome::MethodNotAllowed(_) => 405,
        }
    }

    /// Wire response for this outcome.
    #[must_use]
    pub fn into_response(self) -> MockResponse {
        match self {
            Outcome::Handled(response) => response,
            Outcome::ValidationFailed(errors) => MockResponse::json(400, json!({ "err": errors })),
            Outcome::NotFound => MockResponse::error(404, "not found"),
            Outcome::MethodNotAllowed(allowed) => {
                let mut response = MockResponse::error(405, "method not allowed");
                let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                response.set_header("allow", allow);
                response
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no operation with id '{0}' in the definition")]
    UnknownOperation(String),
}

/// A real implementation for an operation, used instead of a mock.
pub type Handler = Arc<dyn Fn(&MockRequest, &RouteMatch) -> MockResponse + Send + Sync>;

/// Routes, validates and answers requests for one definition.
///
/// Built once and then only read; share it behind an `Arc` across threads.
#[derive(Clone)]
pub struct Dispatcher {
    definition: Arc<Definition>,
    config: MockConfig,
    router: Router,
    validator: SchemaValidator,
    synthesizer: MockSynthesizer,
    handlers: HashMap<String, Handler>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("operations", &self.definition.operations().len())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(definition: Arc<Definition>, config: MockConfig) -> Self {
        let router = Router::new(&definition, &config.api_root);
        info!(
            title = %definition.title(),
            operations = definition.operations().len(),
            validate_requests = config.validate_requests,
            api_root = %router.api_root(),
            "Dispatcher ready"
        );
        Self {
            validator: SchemaValidator::new(Arc::clone(&definition)),
            synthesizer: MockSynthesizer::new(Arc::clone(&definition)),
            router,
            config,
            definition,
            handlers: HashMap::new(),
        }
    }

    /// Serve `operation_id` with `handler` instead of a mock. A second
    /// registration for the same id replaces the first.
    pub fn register_handler<F>(&mut self, operation_id: &str, handler: F) -> Result<(), DispatchError>
    where
        F: Fn(&MockRequest, &RouteMatch) -> MockResponse + Send + Sync + 'static,
    {
        if self.definition.operation(operation_id).is_none() {
            return Err(DispatchError::UnknownOperation(operation_id.to_string()));
        }
        if self.handlers.insert(operation_id.to_string(), Arc::new(handler)).is_some() {
            warn!(operation_id = %operation_id, "Replaced existing handler");
        }
        info!(
            operation_id = %operation_id,
            total_handlers = self.handlers.len(),
            "Handler registered"
        );
        Ok(())
    }

    #[must_use]
    pub fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    #[must_use]
    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    #[must_use]
    pub fn synthesizer(&self) -> &MockSynthesizer {
        &self.synthesizer
    }

    /// Route, validate and answer one request.
    #[must_use]
    pub fn handle(&self, req: &MockRequest) -> Outcome {
        let start = Instant::now();
        let route = match self.router.route(&req.method, &req.path) {
            MatchOutcome::Matched(route) => route,
            MatchOutcome::NotFound => return Outcome::NotFound,
            MatchOutcome::MethodNotAllowed { allowed } => return Outcome::MethodNotAllowed(allowed),
        };

        if self.config.validate_requests {
            let errors = self.validate_request(req, &route);
            if !errors.is_empty() {
                warn!(
                    request_id = %req.request_id,
                    operation_id = %route.operation.id,
                    error_count = errors.len(),
                    first_error = %errors[0],
                    "Request validation failed"
                );
                return Outcome::ValidationFailed(errors);
            }
        }

        let response = match self.handlers.get(&route.operation.id) {
            Some(handler) => run_handler(handler, req, &route),
            None => {
                let options = MockOptions {
                    media_type: accepted_media_type(req, &route.operation),
                    ..MockOptions::default()
                };
                self.synthesizer.generate_with(&route.operation, &options)
            }
        };
        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            operation_id = %route.operation.id,
            status = response.status,
            duration_us = start.elapsed().as_micros() as u64,
            "Request handled"
        );
        Outcome::Handled(response)
    }

    /// Check every declared parameter and the body of `req` against the
    /// matched operation. All problems are collected before returning.
    #[must_use]
    pub fn validate_request(&self, req: &MockRequest, route: &RouteMatch) -> ValidationResult {
        let operation = &route.operation;
        let schemas = self.definition.schemas();
        let query = req.query_pairs();
        let cookies = req.cookies();
        let mut errors = Vec::new();

        for param in &operation.parameters {
            let name = param.name.as_str();
            let value = match param.location {
                ParameterLocation::Path => route
                    .get_path_param(name)
                    .map(|raw| coerce_parameter(param, &[raw], schemas)),
                ParameterLocation::Query => {
                    let raw: Vec<&str> = query
                        .iter()
                        .filter(|(k, _)| k == name)
                        .map(|(_, v)| v.as_str())
                        .collect();
                    if raw.is_empty() {
                        query_object(param, &query, schemas)
                    } else {
                        Some(coerce_parameter(param, &raw, schemas))
                    }
                }
                ParameterLocation::Header => {
                    if RESERVED_HEADER_PARAMS.iter().any(|h| name.eq_ignore_ascii_case(h)) {
                        continue;
                    }
                    let raw = req.header_values(name);
                    (!raw.is_empty()).then(|| coerce_parameter(param, &raw, schemas))
                }
                ParameterLocation::Cookie => cookies
                    .iter()
                    .rfind(|(k, _)| k.as_ref() == name)
                    .map(|(_, v)| coerce_parameter(param, &[v.as_str()], schemas)),
            };
            let location = ErrorLocation::from(param.location);
            match (value, param.schema) {
                (None, _) if param.required || param.location == ParameterLocation::Path => {
                    errors.push(ValidationError::new(
                        location,
                        name,
                        format!("missing required {} parameter", param.location),
                    ));
                }
                (Some(value), Some(schema)) => errors.extend(self.validator.validate(
                    &value,
                    schema,
                    &ValidationContext::parameter(location, name),
                )),
                _ => {}
            }
        }

        if let Some(body) = &operation.request_body {
            self.validate_body(req, body, &mut errors);
        }
        debug!(
            request_id = %req.request_id,
            operation_id = %operation.id,
            parameters = operation.parameters.len(),
            errors = errors.len(),
            "Request validated"
        );
        errors
    }

    fn validate_body(&self, req: &MockRequest, body: &BodySpec, errors: &mut ValidationResult) {
        let Some(raw) = req.body.as_deref().filter(|b| !b.is_empty()) else {
            if body.required {
                errors.push(ValidationError::new(
                    ErrorLocation::Body,
                    "/",
                    "missing required request body",
                ));
            }
            return;
        };
        let content_type = req.content_type().unwrap_or("application/json");
        let Some((media_type, media)) = find_media(&body.content, content_type) else {
            debug!(
                request_id = %req.request_id,
                content_type = %content_type,
                "Body media type not declared, skipping body validation"
            );
            return;
        };
        let Some(schema) = media.schema else {
            return;
        };

        let value = if is_json_media_type(content_type) {
            match serde_json::from_str::<Value>(raw) {
                Ok(value) => value,
                Err(err) => {
                    errors.push(ValidationError::new(
                        ErrorLocation::Body,
                        "/",
                        format!("body is not valid JSON: {err}"),
                    ));
                    return;
                }
            }
        } else if media_type_matches("application/x-www-form-urlencoded", content_type) {
            coerce_form(raw, schema, self.definition.schemas())
        } else {
            debug!(
                request_id = %req.request_id,
                media_type = %media_type,
                "Body is neither JSON nor form data, skipping schema check"
            );
            return;
        };
        errors.extend(
            self.validator
                .validate(&value, schema, &ValidationContext::request_body()),
        );
    }
}

fn run_handler(handler: &Handler, req: &MockRequest, route: &RouteMatch) -> MockResponse {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(req, route))) {
        Ok(response) => response,
        Err(panic) => {
            let panic_message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(
                request_id = %req.request_id,
                operation_id = %route.operation.id,
                panic_message = %panic_message,
                "Handler panicked"
            );
            MockResponse::error(500, &format!("handler panicked: {panic_message}"))
        }
    }
}

/// First media range of the `Accept` header (by `q`, then order) that names a
/// media type declared by the response the mock would serve.
fn accepted_media_type(req: &MockRequest, operation: &Operation) -> Option<String> {
    let accept = req.get_header("accept")?;
    let (_, spec) = select_response(operation, None)?;
    let mut ranges: Vec<(&str, f32)> = accept
        .split(',')
        .filter_map(|range| {
            let mut parts = range.split(';');
            let media = parts.next()?.trim();
            let q = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            (!media.is_empty() && q > 0.0).then_some((media, q))
        })
        .collect();
    ranges.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranges.into_iter().find_map(|(range, _)| {
        if range == "*/*" {
            return None;
        }
        spec.content
            .keys()
            .find(|declared| media_type_matches(range, declared))
            .cloned()
    })
}
