use super::value::{header_text, ValueGenerator};
use crate::dispatcher::{HeaderVec, MockResponse};
use crate::spec::{find_media, Definition, MediaTypeSpec, Operation, ResponseSpec, SchemaId, StatusPattern};
use crate::validator::SchemaValidator;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Caller preferences for one mock response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockOptions {
    /// Status to serve: exact response, then its class, then `default`
    pub code: Option<u16>,
    /// Named entry of the media type's `examples`
    pub example: Option<String>,
    /// Media type to serve when the chosen response declares it
    pub media_type: Option<String>,
}

impl MockOptions {
    #[must_use]
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub fn with_example(mut self, name: impl Into<String>) -> Self {
        self.example = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// Builds mock responses for operations of one [`Definition`].
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    definition: Arc<Definition>,
    validator: SchemaValidator,
}

impl MockSynthesizer {
    #[must_use]
    pub fn new(definition: Arc<Definition>) -> Self {
        let validator = SchemaValidator::new(Arc::clone(&definition));
        Self { definition, validator }
    }

    #[must_use]
    pub fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    #[must_use]
    pub fn generate(&self, operation: &Operation) -> MockResponse {
        self.generate_with(operation, &MockOptions::default())
    }

    #[must_use]
    pub fn generate_with(&self, operation: &Operation, options: &MockOptions) -> MockResponse {
        let Some((status, spec)) = select_response(operation, options.code) else {
            debug!(operation_id = %operation.id, "No responses declared, serving empty 200");
            return MockResponse::empty(200);
        };

        let mut headers = HeaderVec::new();
        for (name, header) in &spec.headers {
            if name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            let value = match (&header.example, header.schema) {
                (Some(example), _) => example.clone(),
                (None, Some(schema)) => self.mock_value(schema, name),
                (None, None) => Value::Null,
            };
            headers.push((Arc::from(name.to_ascii_lowercase()), header_text(&value)));
        }

        let mut response = MockResponse::new(status, headers, Value::Null);
        if let Some((media_type, media)) = select_media(spec, options.media_type.as_deref()) {
            response.body = self.body(media, options.example.as_deref());
            // a wildcard entry is served as the requested type
            let content_type = if media_type.contains('*') {
                options.media_type.as_deref().unwrap_or("application/json")
            } else {
                media_type
            };
            response.set_header("content-type", content_type.to_string());
        }
        debug!(
            operation_id = %operation.id,
            status = status,
            response = %spec.status,
            content_type = response.get_header("content-type").unwrap_or(""),
            "Mock response generated"
        );
        response
    }

    /// Generate a value for one schema of the definition.
    #[must_use]
    pub fn mock_value(&self, schema: SchemaId, hint: &str) -> Value {
        ValueGenerator::new(self.definition.schemas())
            .with_validator(&self.validator)
            .generate(schema, hint)
    }

    fn body(&self, media: &MediaTypeSpec, example: Option<&str>) -> Value {
        if let Some(named) = example.and_then(|name| media.examples.get(name)) {
            return named.clone();
        }
        if let Some(example) = &media.example {
            return example.clone();
        }
        if let Some(first) = media.examples.values().next() {
            return first.clone();
        }
        media
            .schema
            .map_or(Value::Null, |schema| self.mock_value(schema, ""))
    }
}

/// The response a mock serves for `operation`, with the concrete status.
///
/// With a requested `code`: the exact response, then its class, then
/// `default`. Otherwise the lowest success response carrying an example, the
/// lowest exact status, `default` (as 200), then the first class pattern.
#[must_use]
pub fn select_response(operation: &Operation, code: Option<u16>) -> Option<(u16, &ResponseSpec)> {
    if let Some(code) = code {
        match operation.response_for_status(code) {
            Some(spec) => return Some((code, spec)),
            None => debug!(
                operation_id = %operation.id,
                code = code,
                "Requested status not declared, using default selection"
            ),
        }
    }

    let with_example = operation
        .responses
        .iter()
        .filter(|r| r.status.is_success())
        .filter(|r| select_media(r, None).is_some_and(|(_, m)| m.has_example()))
        .min_by_key(|r| (r.status.representative_status(), !matches!(r.status, StatusPattern::Exact(_))));
    let lowest_exact = || {
        operation
            .responses
            .iter()
            .filter(|r| matches!(r.status, StatusPattern::Exact(_)))
            .min_by_key(|r| r.status.representative_status())
    };
    let spec = with_example
        .or_else(lowest_exact)
        .or_else(|| operation.response(StatusPattern::Default))
        .or_else(|| {
            operation
                .responses
                .iter()
                .find(|r| matches!(r.status, StatusPattern::Class(_)))
        })?;
    Some((spec.status.representative_status(), spec))
}

/// Requested media type when declared, otherwise the preferred one.
fn select_media<'r>(spec: &'r ResponseSpec, requested: Option<&str>) -> Option<(&'r str, &'r MediaTypeSpec)> {
    if let Some(found) = requested.and_then(|wanted| find_media(&spec.content, wanted)) {
        return Some(found);
    }
    let preferred = spec.preferred_media_type()?;
    spec.content.get_key_value(preferred).map(|(k, v)| (k.as_str(), v))
}
