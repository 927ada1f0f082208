use super::types::Definition;
use anyhow::Context;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Serialization of a definition document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file extension; anything but `.json` is read as YAML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Load and compile a Swagger 2.0 / OpenAPI 3 document from a local file.
///
/// # Errors
///
/// Fails when the file cannot be read, does not parse as YAML/JSON, or is
/// rejected by [`Definition::load`].
pub fn load_definition(path: impl AsRef<Path>) -> anyhow::Result<Definition> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read OpenAPI document {}", path.display()))?;
    debug!(path = %path.display(), bytes = content.len(), "Loading OpenAPI document");
    load_definition_str(&content, DocumentFormat::from_path(path))
        .with_context(|| format!("invalid OpenAPI document {}", path.display()))
}

/// Compile a definition from document text.
///
/// # Errors
///
/// Fails when the text does not parse or the document is rejected by
/// [`Definition::load`].
pub fn load_definition_str(content: &str, format: DocumentFormat) -> anyhow::Result<Definition> {
    let value: Value = match format {
        DocumentFormat::Yaml => {
            serde_yaml::from_str(content).context("document is not valid YAML")?
        }
        DocumentFormat::Json => {
            serde_json::from_str(content).context("document is not valid JSON")?
        }
    };
    Ok(Definition::load(value)?)
}
