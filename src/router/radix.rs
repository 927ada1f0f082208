//! Radix tree over path template segments.
//!
//! Templates are split on `/` and inserted one segment per level. Each node
//! keeps three kinds of children:
//!
//! - literal children (`pets`), matched exactly
//! - capture children (`{petId}`), matching any non-empty segment
//! - pattern children (`{name}.json`, `v{major}`), matched by an anchored regex
//!
//! Unlike a first-match tree, [`RadixTree::candidates`] walks every branch that
//! fits the request and returns all terminal templates. The caller ranks them,
//! which is what makes `/pets/mine` beat `/pets/{petId}` regardless of
//! declaration order.

use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::warn;

use super::core::ParamVec;
use crate::spec::Operation;

/// Operations declared on one template, in document order.
#[derive(Debug, Clone)]
pub(crate) struct Terminal {
    pub(crate) template: Arc<str>,
    /// Declaration index of the template, for tie-breaking
    pub(crate) order: usize,
    pub(crate) operations: Vec<Arc<Operation>>,
}

impl Terminal {
    pub(crate) fn operation(&self, method: &Method) -> Option<&Arc<Operation>> {
        self.operations.iter().find(|op| op.method == *method)
    }
}

/// Mixed literal/capture segment compiled to a regex.
#[derive(Debug, Clone)]
struct SegmentPattern {
    source: String,
    regex: Regex,
    names: Vec<Arc<str>>,
}

#[derive(Debug, Clone, Default)]
struct RadixNode {
    /// Literal text of the segment; empty for capture and pattern nodes
    segment: String,
    param_name: Option<Arc<str>>,
    pattern: Option<SegmentPattern>,
    terminal: Option<Terminal>,
    children: Vec<RadixNode>,
    param_children: Vec<RadixNode>,
    pattern_children: Vec<RadixNode>,
}

enum TemplateSegment<'t> {
    Literal(&'t str),
    Capture(&'t str),
    Pattern(&'t str),
}

fn classify(segment: &str) -> TemplateSegment<'_> {
    if let Some(name) = segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .filter(|n| !n.contains(['{', '}']))
    {
        TemplateSegment::Capture(name)
    } else if segment.contains('{') {
        TemplateSegment::Pattern(segment)
    } else {
        TemplateSegment::Literal(segment)
    }
}

/// `{name}.json` → `^(.+?)\.json$`, captures in template order.
fn compile_pattern(segment: &str) -> Result<SegmentPattern, regex::Error> {
    let mut regex = String::with_capacity(segment.len() + 8);
    let mut names = Vec::new();
    regex.push('^');
    let mut rest = segment;
    while let Some(open) = rest.find('{') {
        regex.push_str(&regex::escape(&rest[..open]));
        let after = &rest[open + 1..];
        let close = after.find('}').unwrap_or(after.len());
        names.push(Arc::from(&after[..close]));
        regex.push_str("(.+?)");
        rest = after.get(close + 1..).unwrap_or("");
    }
    regex.push_str(&regex::escape(rest));
    regex.push('$');
    Ok(SegmentPattern {
        source: segment.to_string(),
        regex: Regex::new(&regex)?,
        names,
    })
}

impl RadixNode {
    fn insert(&mut self, segments: &[&str], template: &Arc<str>, order: usize, op: Arc<Operation>) {
        let Some((&segment, remaining)) = segments.split_first() else {
            let terminal = self.terminal.get_or_insert_with(|| Terminal {
                template: Arc::clone(template),
                order,
                operations: Vec::new(),
            });
            terminal.operations.push(op);
            return;
        };

        match classify(segment) {
            TemplateSegment::Capture(name) => {
                let child = match self
                    .param_children
                    .iter()
                    .position(|c| c.param_name.as_deref() == Some(name))
                {
                    Some(i) => &mut self.param_children[i],
                    None => {
                        self.param_children.push(RadixNode {
                            param_name: Some(Arc::from(name)),
                            ..Default::default()
                        });
                        let last = self.param_children.len() - 1;
                        &mut self.param_children[last]
                    }
                };
                child.insert(remaining, template, order, op);
            }
            TemplateSegment::Pattern(source) => {
                let existing = self
                    .pattern_children
                    .iter()
                    .position(|c| c.pattern.as_ref().is_some_and(|p| p.source == source));
                let child = match existing {
                    Some(i) => &mut self.pattern_children[i],
                    None => match compile_pattern(source) {
                        Ok(pattern) => {
                            self.pattern_children.push(RadixNode {
                                pattern: Some(pattern),
                                ..Default::default()
                            });
                            let last = self.pattern_children.len() - 1;
                            &mut self.pattern_children[last]
                        }
                        Err(err) => {
                            warn!(segment = %source, template = %template, error = %err,
                                "Path segment pattern rejected, matching it literally");
                            return self.insert_literal(source, remaining, template, order, op);
                        }
                    },
                };
                child.insert(remaining, template, order, op);
            }
            TemplateSegment::Literal(literal) => {
                self.insert_literal(literal, remaining, template, order, op);
            }
        }
    }

    fn insert_literal(
        &mut self,
        literal: &str,
        remaining: &[&str],
        template: &Arc<str>,
        order: usize,
        op: Arc<Operation>,
    ) {
        let child = match self.children.iter().position(|c| c.segment == literal) {
            Some(i) => &mut self.children[i],
            None => {
                self.children.push(RadixNode {
                    segment: literal.to_string(),
                    ..Default::default()
                });
                let last = self.children.len() - 1;
                &mut self.children[last]
            }
        };
        child.insert(remaining, template, order, op);
    }

    /// Depth-first walk collecting every terminal reachable by `segments`.
    fn collect<'n>(
        &'n self,
        segments: &[Cow<'_, str>],
        state: &mut Walk,
        out: &mut Vec<Candidate<'n>>,
    ) {
        let Some((segment, remaining)) = segments.split_first() else {
            if let Some(terminal) = &self.terminal {
                out.push(Candidate {
                    terminal,
                    path_params: state.params.clone(),
                    literals: state.literals,
                    patterns: state.patterns,
                });
            }
            return;
        };

        for child in self.children.iter().filter(|c| c.segment == segment.as_ref()) {
            state.literals += 1;
            child.collect(remaining, state, out);
            state.literals -= 1;
        }

        for child in &self.pattern_children {
            let Some(pattern) = &child.pattern else {
                continue;
            };
            let Some(caps) = pattern.regex.captures(segment) else {
                continue;
            };
            let mark = state.params.len();
            for (i, name) in pattern.names.iter().enumerate() {
                let value = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
                state.params.push((Arc::clone(name), value.to_string()));
            }
            state.patterns += 1;
            child.collect(remaining, state, out);
            state.patterns -= 1;
            state.params.truncate(mark);
        }

        for child in &self.param_children {
            let Some(name) = &child.param_name else {
                continue;
            };
            state.params.push((Arc::clone(name), segment.to_string()));
            child.collect(remaining, state, out);
            // backtrack
            state.params.pop();
        }
    }
}

#[derive(Default)]
struct Walk {
    params: ParamVec,
    literals: usize,
    patterns: usize,
}

/// A template that fits the request path, with the parameters it binds.
#[derive(Debug, Clone)]
pub(crate) struct Candidate<'n> {
    pub(crate) terminal: &'n Terminal,
    pub(crate) path_params: ParamVec,
    literals: usize,
    patterns: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RadixTree {
    root: RadixNode,
    inserted: usize,
}

impl RadixTree {
    /// Add an operation under its path template.
    pub(crate) fn insert(&mut self, op: Arc<Operation>) {
        let template: Arc<str> = Arc::from(op.path_template.as_str());
        let segments: SmallVec<[&str; 8]> = template.split('/').filter(|s| !s.is_empty()).collect();
        let order = self.inserted;
        self.inserted += 1;
        self.root.insert(&segments, &template, order, op);
    }

    /// Every template matching the already split and decoded request
    /// segments, best first: most literal segments, then most pattern
    /// segments, then earliest declared.
    pub(crate) fn candidates(&self, segments: &[Cow<'_, str>]) -> Vec<Candidate<'_>> {
        let mut out = Vec::new();
        self.root.collect(segments, &mut Walk::default(), &mut out);
        out.sort_by_key(|c| (Reverse(c.literals), Reverse(c.patterns), c.terminal.order));
        out
    }
}
