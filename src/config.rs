//! # Configuration
//!
//! [`MockConfig`] is read once at construction time and handed to the
//! [`Dispatcher`](crate::dispatcher::Dispatcher). It can come from a YAML or
//! JSON file, from environment variables, or be built directly.
//!
//! ## Environment Variables
//!
//! - `BRRTMOCK_VALIDATE_REQUESTS`: `true`/`false` (also `1`/`0`, `yes`/`no`).
//!   Default `true`.
//! - `BRRTMOCK_API_ROOT`: path prefix every request must carry, e.g. `/api/v1`.
//!   Default `/`.
//!
//! ## File format
//!
//! ```yaml
//! validate_requests: false
//! api_root: /api/v1
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_VALIDATE_REQUESTS: &str = "BRRTMOCK_VALIDATE_REQUESTS";
pub const ENV_API_ROOT: &str = "BRRTMOCK_API_ROOT";

/// Behaviour switches of the mock engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// When false, matched requests skip validation and go straight to the
    /// handler or the mock synthesizer.
    pub validate_requests: bool,
    /// Prefix stripped from request paths before routing
    pub api_root: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            validate_requests: true,
            api_root: "/".to_string(),
        }
    }
}

impl MockConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let validate_requests = lookup(ENV_VALIDATE_REQUESTS)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(defaults.validate_requests);
        let api_root = lookup(ENV_API_ROOT)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.api_root);
        Self {
            validate_requests,
            api_root,
        }
    }

    /// Parse YAML (or JSON, which YAML accepts). Missing keys keep their defaults.
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse mock configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mock configuration: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid mock configuration: {}", path.display()))
    }

    #[must_use]
    pub fn with_validation(mut self, validate_requests: bool) -> Self {
        self.validate_requests = validate_requests;
        self
    }

    #[must_use]
    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into();
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
