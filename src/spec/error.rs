use std::fmt;
use thiserror::Error;
use tracing::error;

/// Category of a fatal problem found while loading a definition document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionErrorKind {
    /// The document does not have the shape of an OpenAPI 2 or 3 document.
    MalformedDocument,
    /// A `$ref` points outside the document or at nothing.
    UnresolvableRef,
    /// Two operations declare the same `operationId`.
    DuplicateOperationId,
}

impl fmt::Display for DefinitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DefinitionErrorKind::MalformedDocument => "MalformedDocument",
            DefinitionErrorKind::UnresolvableRef => "UnresolvableRef",
            DefinitionErrorKind::DuplicateOperationId => "DuplicateOperationId",
        };
        f.write_str(s)
    }
}

/// Fatal load-time error. A server must not start when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{kind}] {location}: {message}")]
pub struct DefinitionError {
    pub kind: DefinitionErrorKind,
    /// JSON pointer or `METHOD /path` locating the problem
    pub location: String,
    pub message: String,
}

impl DefinitionError {
    pub fn new(
        kind: DefinitionErrorKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn malformed(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DefinitionErrorKind::MalformedDocument, location, message)
    }

    pub fn unresolvable(location: impl Into<String>, reference: &str) -> Self {
        Self::new(
            DefinitionErrorKind::UnresolvableRef,
            location,
            format!("cannot resolve reference '{reference}'"),
        )
    }
}

/// Log every collected issue and fail with the first one.
///
/// Loading keeps going after the first problem so the operator sees every
/// broken reference in a single run.
pub(crate) fn fail_if_issues(issues: Vec<DefinitionError>) -> Result<(), DefinitionError> {
    let Some(first) = issues.first().cloned() else {
        return Ok(());
    };
    error!(
        issue_count = issues.len(),
        "OpenAPI definition rejected, fix the document before starting the server"
    );
    for issue in &issues {
        error!(
            kind = %issue.kind,
            location = %issue.location,
            message = %issue.message,
            "Definition issue"
        );
    }
    Err(first)
}
