use super::params::{coerce_scalar, effective_type};
use super::schema::SchemaValidator;
use super::types::{ErrorLocation, ValidationContext, ValidationError, ValidationResult};
use crate::dispatcher::MockResponse;
use crate::spec::{find_media, is_json_media_type, Operation};

impl SchemaValidator {
    /// Check a response (real or mocked) against what `operation` declares:
    /// the status, required headers and header schemas, and the body schema
    /// of the media type named by its `content-type`.
    #[must_use]
    pub fn validate_response(&self, operation: &Operation, response: &MockResponse) -> ValidationResult {
        let mut errors = Vec::new();
        if operation.responses.is_empty() {
            return errors;
        }
        let Some(spec) = operation.response_for_status(response.status) else {
            errors.push(ValidationError::new(
                ErrorLocation::ResponseStatus,
                response.status.to_string(),
                format!("status {} is not declared by {}", response.status, operation.id),
            ));
            return errors;
        };

        let schemas = self.definition().schemas();
        for (name, header) in &spec.headers {
            // content-type is described by `content`, not by headers
            if name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            match response.get_header(name) {
                None if header.required => errors.push(ValidationError::new(
                    ErrorLocation::ResponseHeader,
                    name.as_str(),
                    "missing required header",
                )),
                None => {}
                Some(raw) => {
                    if let Some(schema) = header.schema {
                        let value = coerce_scalar(raw, effective_type(schemas, schema, 0));
                        errors.extend(self.validate(
                            &value,
                            schema,
                            &ValidationContext::response_header(name.as_str()),
                        ));
                    }
                }
            }
        }

        if spec.content.is_empty() || response.body.is_null() {
            return errors;
        }
        let content_type = response.get_header("content-type").unwrap_or("application/json");
        let Some((media_type, media)) = find_media(&spec.content, content_type) else {
            errors.push(ValidationError::new(
                ErrorLocation::ResponseHeader,
                "content-type",
                format!("media type '{content_type}' is not declared for status {}", response.status),
            ));
            return errors;
        };
        if let (Some(schema), true) = (media.schema, is_json_media_type(media_type)) {
            errors.extend(self.validate(&response.body, schema, &ValidationContext::response_body()));
        }
        errors
    }
}
