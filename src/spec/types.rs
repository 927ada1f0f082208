use super::schema::{SchemaId, SchemaTable};
use http::Method;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }

    /// Style used when the document does not name one.
    #[must_use]
    pub fn default_style(self) -> ParameterStyle {
        match self {
            ParameterLocation::Query | ParameterLocation::Cookie => ParameterStyle::Form,
            ParameterLocation::Path | ParameterLocation::Header => ParameterStyle::Simple,
        }
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterStyle {
    Matrix,
    Label,
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl ParameterStyle {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "matrix" => Some(ParameterStyle::Matrix),
            "label" => Some(ParameterStyle::Label),
            "form" => Some(ParameterStyle::Form),
            "simple" => Some(ParameterStyle::Simple),
            "spaceDelimited" => Some(ParameterStyle::SpaceDelimited),
            "pipeDelimited" => Some(ParameterStyle::PipeDelimited),
            "deepObject" => Some(ParameterStyle::DeepObject),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParameterStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParameterStyle::Matrix => "matrix",
            ParameterStyle::Label => "label",
            ParameterStyle::Form => "form",
            ParameterStyle::Simple => "simple",
            ParameterStyle::SpaceDelimited => "spaceDelimited",
            ParameterStyle::PipeDelimited => "pipeDelimited",
            ParameterStyle::DeepObject => "deepObject",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Option<SchemaId>,
    pub style: ParameterStyle,
    pub explode: bool,
    /// Media type when the parameter is described with `content` (e.g. JSON in a query string)
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MediaTypeSpec {
    pub schema: Option<SchemaId>,
    pub example: Option<Value>,
    /// Named examples in document order
    pub examples: IndexMap<String, Value>,
}

impl MediaTypeSpec {
    #[must_use]
    pub fn has_example(&self) -> bool {
        self.example.is_some() || !self.examples.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BodySpec {
    pub required: bool,
    pub content: IndexMap<String, MediaTypeSpec>,
}

/// Key of an entry in an operation's `responses` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusPattern {
    Exact(u16),
    /// `2XX` style range, holding the leading digit
    Class(u8),
    Default,
}

impl StatusPattern {
    pub fn parse(key: &str) -> Option<Self> {
        if key.eq_ignore_ascii_case("default") {
            return Some(StatusPattern::Default);
        }
        let bytes = key.as_bytes();
        if bytes.len() == 3 && bytes[1..].eq_ignore_ascii_case(b"xx") {
            return match bytes[0] {
                d @ b'1'..=b'5' => Some(StatusPattern::Class(d - b'0')),
                _ => None,
            };
        }
        match key.parse::<u16>() {
            Ok(code) if (100..=599).contains(&code) => Some(StatusPattern::Exact(code)),
            _ => None,
        }
    }

    #[must_use]
    pub fn matches(self, status: u16) -> bool {
        match self {
            StatusPattern::Exact(code) => code == status,
            StatusPattern::Class(class) => status / 100 == u16::from(class),
            StatusPattern::Default => true,
        }
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        match self {
            StatusPattern::Exact(code) => (200..300).contains(&code),
            StatusPattern::Class(class) => class == 2,
            StatusPattern::Default => false,
        }
    }

    /// Concrete status code served for this pattern.
    #[must_use]
    pub fn representative_status(self) -> u16 {
        match self {
            StatusPattern::Exact(code) => code,
            StatusPattern::Class(class) => u16::from(class) * 100,
            StatusPattern::Default => 200,
        }
    }
}

impl std::fmt::Display for StatusPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusPattern::Exact(code) => write!(f, "{code}"),
            StatusPattern::Class(class) => write!(f, "{class}XX"),
            StatusPattern::Default => f.write_str("default"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeaderSpec {
    pub required: bool,
    pub schema: Option<SchemaId>,
    pub example: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ResponseSpec {
    pub status: StatusPattern,
    pub description: String,
    pub headers: IndexMap<String, HeaderSpec>,
    pub content: IndexMap<String, MediaTypeSpec>,
}

impl ResponseSpec {
    /// Media type preferred for mock bodies: JSON first, then `+json`, then
    /// whatever the document lists first.
    #[must_use]
    pub fn preferred_media_type(&self) -> Option<&str> {
        self.content
            .keys()
            .find(|k| k.as_str() == "application/json")
            .or_else(|| self.content.keys().find(|k| is_json_media_type(k)))
            .or_else(|| self.content.keys().next())
            .map(String::as_str)
    }
}

/// Security requirement object: scheme name to scopes.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone)]
pub struct Operation {
    pub id: String,
    pub method: Method,
    pub path_template: String,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    pub parameters: Vec<ParameterSpec>,
    pub request_body: Option<BodySpec>,
    /// Responses in document order
    pub responses: Vec<ResponseSpec>,
    pub security: Vec<SecurityRequirement>,
}

impl Operation {
    #[must_use]
    pub fn parameter(&self, name: &str, location: ParameterLocation) -> Option<&ParameterSpec> {
        self.parameters
            .iter()
            .find(|p| p.location == location && p.name == name)
    }

    #[must_use]
    pub fn response(&self, pattern: StatusPattern) -> Option<&ResponseSpec> {
        self.responses.iter().find(|r| r.status == pattern)
    }

    /// Response declared for a concrete status: exact code, then class, then `default`.
    #[must_use]
    pub fn response_for_status(&self, status: u16) -> Option<&ResponseSpec> {
        self.responses
            .iter()
            .find(|r| r.status == StatusPattern::Exact(status))
            .or_else(|| {
                self.responses.iter().find(|r| {
                    matches!(r.status, StatusPattern::Class(_)) && r.status.matches(status)
                })
            })
            .or_else(|| self.response(StatusPattern::Default))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerUrl {
    pub url: String,
    pub description: Option<String>,
}

/// Normalized, fully resolved OpenAPI definition.
///
/// Built once by [`Definition::load`](crate::spec::Definition::load) and
/// read-only afterwards; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Definition {
    pub(crate) title: String,
    pub(crate) version: String,
    pub(crate) source_version: String,
    pub(crate) operations: Vec<Arc<Operation>>,
    pub(crate) servers: Vec<ServerUrl>,
    pub(crate) schemas: SchemaTable,
    pub(crate) security: Vec<SecurityRequirement>,
    pub(crate) security_schemes: IndexMap<String, Value>,
    pub(crate) document: Value,
}

impl Definition {
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// `swagger`/`openapi` version string of the document as it was supplied.
    #[must_use]
    pub fn source_version(&self) -> &str {
        &self.source_version
    }

    #[must_use]
    pub fn operations(&self) -> &[Arc<Operation>] {
        &self.operations
    }

    #[must_use]
    pub fn operation(&self, id: &str) -> Option<&Arc<Operation>> {
        self.operations.iter().find(|op| op.id == id)
    }

    #[must_use]
    pub fn servers(&self) -> &[ServerUrl] {
        &self.servers
    }

    #[must_use]
    pub fn schemas(&self) -> &SchemaTable {
        &self.schemas
    }

    #[must_use]
    pub fn security(&self) -> &[SecurityRequirement] {
        &self.security
    }

    #[must_use]
    pub fn security_schemes(&self) -> &IndexMap<String, Value> {
        &self.security_schemes
    }

    /// The normalized OpenAPI 3 document, for introspection endpoints.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Path component of the first server URL (`/api/v1`), empty for `/`.
    #[must_use]
    pub fn base_path(&self) -> String {
        let Some(server) = self.servers.first() else {
            return String::new();
        };
        url::Url::parse(&server.url)
            .or_else(|_| url::Url::parse(&format!("http://dummy{}", server.url)))
            .map(|u| {
                let p = u.path().trim_end_matches('/');
                if p == "/" || p.is_empty() {
                    String::new()
                } else {
                    p.to_string()
                }
            })
            .unwrap_or_default()
    }
}

/// `application/json`, `application/problem+json`, `text/json`, ...
#[must_use]
pub fn is_json_media_type(media_type: &str) -> bool {
    let essence = essence(media_type);
    essence == "application/json" || essence == "text/json" || essence.ends_with("+json")
}

/// Whether a concrete media type is covered by a declared one. Parameters
/// (`; charset=utf-8`) are ignored and `*/*`, `application/*` wildcards honoured.
#[must_use]
pub fn media_type_matches(declared: &str, actual: &str) -> bool {
    let declared = essence(declared);
    let actual = essence(actual);
    if declared == actual || declared == "*/*" {
        return true;
    }
    match declared.strip_suffix("/*") {
        Some(family) => actual.split('/').next() == Some(family),
        None => false,
    }
}

/// Declared media type entry covering `actual`: exact essence first, then wildcards.
#[must_use]
pub fn find_media<'c>(
    content: &'c IndexMap<String, MediaTypeSpec>,
    actual: &str,
) -> Option<(&'c str, &'c MediaTypeSpec)> {
    let wanted = essence(actual);
    content
        .iter()
        .find(|(declared, _)| essence(declared) == wanted)
        .or_else(|| {
            content
                .iter()
                .find(|(declared, _)| media_type_matches(declared, actual))
        })
        .map(|(k, v)| (k.as_str(), v))
}

fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
