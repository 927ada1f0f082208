use serde::Serialize;
use std::fmt;

/// Where a validation problem was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
    ResponseStatus,
    ResponseHeader,
    ResponseBody,
}

impl ErrorLocation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorLocation::Path => "path",
            ErrorLocation::Query => "query",
            ErrorLocation::Header => "header",
            ErrorLocation::Cookie => "cookie",
            ErrorLocation::Body => "body",
            ErrorLocation::ResponseStatus => "responseStatus",
            ErrorLocation::ResponseHeader => "responseHeader",
            ErrorLocation::ResponseBody => "responseBody",
        }
    }
}

impl From<crate::spec::ParameterLocation> for ErrorLocation {
    fn from(location: crate::spec::ParameterLocation) -> Self {
        use crate::spec::ParameterLocation;
        match location {
            ParameterLocation::Path => ErrorLocation::Path,
            ParameterLocation::Query => ErrorLocation::Query,
            ParameterLocation::Header => ErrorLocation::Header,
            ParameterLocation::Cookie => ErrorLocation::Cookie,
        }
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the exchange a value belongs to.
///
/// `readOnly` properties are not required in requests and `writeOnly`
/// properties are not required in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Request,
    Response,
}

/// One problem found while validating a request or response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub location: ErrorLocation,
    /// Parameter name, or JSON pointer into the body (`/items/0/name`)
    pub parameter_or_path: String,
    pub message: String,
    /// Keyword path inside the schema (`/properties/name/maxLength`)
    pub schema_path: String,
}

impl ValidationError {
    pub fn new(
        location: ErrorLocation,
        parameter_or_path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            location,
            parameter_or_path: parameter_or_path.into(),
            message: message.into(),
            schema_path: String::new(),
        }
    }

    #[must_use]
    pub fn with_schema_path(mut self, schema_path: impl Into<String>) -> Self {
        self.schema_path = schema_path.into();
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': {}", self.location, self.parameter_or_path, self.message)
    }
}

/// Every problem found, in the order found. Empty means valid.
pub type ValidationResult = Vec<ValidationError>;

/// How errors from one [`SchemaValidator::validate`](super::SchemaValidator::validate)
/// call are labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationContext {
    pub location: ErrorLocation,
    /// Parameter or header name; empty for bodies
    pub target: String,
    pub direction: Direction,
}

impl ValidationContext {
    pub fn parameter(location: ErrorLocation, name: impl Into<String>) -> Self {
        Self {
            location,
            target: name.into(),
            direction: Direction::Request,
        }
    }

    #[must_use]
    pub fn request_body() -> Self {
        Self {
            location: ErrorLocation::Body,
            target: String::new(),
            direction: Direction::Request,
        }
    }

    #[must_use]
    pub fn response_body() -> Self {
        Self {
            location: ErrorLocation::ResponseBody,
            target: String::new(),
            direction: Direction::Response,
        }
    }

    pub fn response_header(name: impl Into<String>) -> Self {
        Self {
            location: ErrorLocation::ResponseHeader,
            target: name.into(),
            direction: Direction::Response,
        }
    }

    /// Label for an error at `pointer` inside the validated value.
    pub(crate) fn label(&self, pointer: &str) -> String {
        match (self.target.is_empty(), pointer.is_empty()) {
            (true, true) => "/".to_string(),
            (true, false) => pointer.to_string(),
            (false, true) => self.target.clone(),
            (false, false) => format!("{}{}", self.target, pointer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let err = ValidationError::new(ErrorLocation::Body, "/name", "too long")
            .with_schema_path("/properties/name/maxLength");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["location"], "body");
        assert_eq!(json["parameterOrPath"], "/name");
        assert_eq!(json["schemaPath"], "/properties/name/maxLength");
        assert_eq!(
            serde_json::to_value(ErrorLocation::ResponseBody).unwrap(),
            "responseBody"
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(ValidationContext::request_body().label(""), "/");
        assert_eq!(ValidationContext::request_body().label("/a/0"), "/a/0");
        let ctx = ValidationContext::parameter(ErrorLocation::Query, "filter");
        assert_eq!(ctx.label(""), "filter");
        assert_eq!(ctx.label("/status"), "filter/status");
    }
}
