//! Router core module - hot path for request routing.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use crate::spec::{Definition, Operation};
use http::Method;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::radix::RadixTree;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because they come from the route tree built at
/// startup; values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A request path resolved to one operation.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub operation: Arc<Operation>,
    /// The template that matched, e.g. `/pets/{petId}`
    pub template: Arc<str>,
    /// Percent-decoded path parameters in template order
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different path depths (e.g., `/org/{id}/team/{team_id}/user/{id}`),
    /// returns the last occurrence (the user id, not the org id).
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to a HashMap.
    /// Note: This allocates - use get_path_param() in hot paths instead
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Result of routing one request.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Matched(RouteMatch),
    /// No template fits the path
    NotFound,
    /// Templates fit the path but none declares the method
    MethodNotAllowed { allowed: Vec<Method> },
}

/// One row of [`Router::route_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: Method,
    pub template: String,
    pub operation_id: String,
}

/// Maps `(method, path)` to the operation that handles it.
///
/// Built once from a [`Definition`] and read-only afterwards, so a single
/// router can be shared across threads.
#[derive(Debug, Clone)]
pub struct Router {
    tree: RadixTree,
    /// Normalized API root without trailing slash; empty for `/`
    api_root: String,
    table: Vec<RouteEntry>,
}

impl Router {
    /// Build the routing tree for every operation of `definition`.
    ///
    /// `api_root` (`/`, `/api/v1`, ...) is stripped from request paths before
    /// matching; paths outside it never match.
    #[must_use]
    pub fn new(definition: &Definition, api_root: &str) -> Self {
        let api_root = normalize_root(api_root);
        let mut tree = RadixTree::default();
        let mut table = Vec::with_capacity(definition.operations().len());

        for op in definition.operations() {
            table.push(RouteEntry {
                method: op.method.clone(),
                template: op.path_template.clone(),
                operation_id: op.id.clone(),
            });
            tree.insert(Arc::clone(op));
        }

        let routes_summary: Vec<String> = table
            .iter()
            .take(10)
            .map(|r| format!("{} {}{}", r.method, api_root, r.template))
            .collect();
        info!(
            routes_count = table.len(),
            api_root = %api_root,
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Self {
            tree,
            api_root,
            table,
        }
    }

    /// Resolve a request to an operation.
    ///
    /// `path` is the raw request path; a query string, if still attached, is
    /// ignored. Segments are percent-decoded before matching.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> MatchOutcome {
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();

        let path = path.split_once('?').map_or(path, |(p, _)| p);
        let Some(relative) = self.strip_root(path) else {
            warn!(
                method = %method,
                path = %path,
                api_root = %self.api_root,
                "Path outside API root"
            );
            return MatchOutcome::NotFound;
        };

        let segments: SmallVec<[Cow<'_, str>; 8]> = relative
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::decode(s).unwrap_or(Cow::Borrowed(s)))
            .collect();
        let candidates = self.tree.candidates(&segments);
        let match_duration = match_start.elapsed();

        if let Some((candidate, op)) = candidates
            .iter()
            .find_map(|c| c.terminal.operation(method).map(|op| (c, op)))
        {
            if match_duration > Duration::from_millis(1) {
                warn!(
                    method = %method,
                    path = %path,
                    operation_id = %op.id,
                    route_pattern = %candidate.terminal.template,
                    duration_us = match_duration.as_micros(),
                    "Slow route matching detected"
                );
            } else {
                info!(
                    method = %method,
                    path = %path,
                    operation_id = %op.id,
                    route_pattern = %candidate.terminal.template,
                    path_params = ?candidate.path_params,
                    duration_us = match_duration.as_micros(),
                    "Route matched"
                );
            }
            return MatchOutcome::Matched(RouteMatch {
                operation: Arc::clone(op),
                template: Arc::clone(&candidate.terminal.template),
                path_params: candidate.path_params.clone(),
            });
        }

        if candidates.is_empty() {
            warn!(
                method = %method,
                path = %path,
                duration_us = match_duration.as_micros(),
                "No route matched"
            );
            return MatchOutcome::NotFound;
        }

        let mut terminals: Vec<_> = candidates.iter().map(|c| c.terminal).collect();
        terminals.sort_by_key(|t| t.order);
        let mut allowed: Vec<Method> = Vec::new();
        for op in terminals.iter().flat_map(|t| t.operations.iter()) {
            if !allowed.contains(&op.method) {
                allowed.push(op.method.clone());
            }
        }
        warn!(
            method = %method,
            path = %path,
            allowed = ?allowed,
            duration_us = match_duration.as_micros(),
            "Method not allowed"
        );
        MatchOutcome::MethodNotAllowed { allowed }
    }

    /// `(method, template, operation id)` for every operation, in document order.
    #[must_use]
    pub fn route_table(&self) -> &[RouteEntry] {
        &self.table
    }

    #[must_use]
    pub fn api_root(&self) -> &str {
        if self.api_root.is_empty() {
            "/"
        } else {
            &self.api_root
        }
    }

    fn strip_root<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.api_root.is_empty() {
            return Some(path);
        }
        let rest = path.strip_prefix(self.api_root.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }
}

/// `api/v1/` → `/api/v1`, `/` → ``.
fn normalize_root(api_root: &str) -> String {
    let trimmed = api_root.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
