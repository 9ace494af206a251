//! # Route Matcher
//!
//! A radix-trie matcher over path segments, indexed by HTTP method. Patterns
//! are made of literal segments (`users`), single-segment parameters
//! (`:id`), and a wildcard tail (`**` or `**:rest`) that consumes the rest
//! of the path. On ambiguous paths, literal segments win over parameters and
//! parameters win over wildcards, with deeper matches preferred.
//!
//! Lookups normalise the path the same way insertions normalise patterns:
//! query strings and fragments are stripped and a trailing slash is ignored
//! (`/a` and `/a/` are the same route; the root `/` is the one exception).

#![warn(missing_docs)]

use crate::error::HttpError;
use crate::types::HttpMethod;
use ahash::AHashMap;

/// The result of a [`RouteTrie::lookup`].
#[derive(Debug)]
pub enum RouteMatch<'t, T> {
    /// A route matched; `params` holds the captured path parameters.
    Found {
        /// The payload registered for the matched pattern.
        payload: &'t T,
        /// Captured parameters, in pattern order.
        params: Vec<(String, String)>,
    },
    /// The path is known but not under this method.
    ///
    /// Translated upstream into a 405 response with an `Allow` header
    /// listing `allowed`.
    MethodNotAllowed {
        /// Methods for which this path does have a route.
        allowed: Vec<HttpMethod>,
    },
    /// Nothing matched.
    Miss,
}

struct Leaf<T> {
    payload: T,
    param_names: Vec<String>,
}

struct WildLeaf<T> {
    payload: T,
    param_names: Vec<String>,
    rest_name: Option<String>,
}

struct Node<T> {
    statics: AHashMap<String, Node<T>>,
    dynamic: Option<Box<Node<T>>>,
    wildcard: Option<WildLeaf<T>>,
    leaf: Option<Leaf<T>>,
}

impl<T> Node<T> {
    fn new() -> Self {
        Self {
            statics: AHashMap::new(),
            dynamic: None,
            wildcard: None,
            leaf: None,
        }
    }
}

enum Matched<'t, T> {
    Exact(&'t Leaf<T>),
    Wild(&'t WildLeaf<T>, String),
}

/// A per-method radix trie of route patterns.
///
/// One trie per exact method plus a wildcard-method bucket consulted when
/// the exact method has no match.
pub struct RouteTrie<T> {
    methods: AHashMap<HttpMethod, Node<T>>,
    any: Node<T>,
}

impl<T> RouteTrie<T> {
    /// Creates an empty trie.
    pub fn new() -> Self {
        Self {
            methods: AHashMap::new(),
            any: Node::new(),
        }
    }

    /// Registers `payload` for a pattern under a method, or under the
    /// wildcard-method bucket when `method` is `None`.
    ///
    /// A later insertion of the same `(method, pattern)` replaces the
    /// earlier one. Fails synchronously on an invalid pattern.
    pub fn insert(
        &mut self,
        method: Option<HttpMethod>,
        pattern: &str,
        payload: T,
    ) -> Result<(), HttpError> {
        let segments = parse_pattern(pattern)?;

        let mut node = match method {
            Some(method) => self.methods.entry(method).or_insert_with(Node::new),
            None => &mut self.any,
        };

        let mut param_names = Vec::new();
        for (index, segment) in segments.iter().enumerate() {
            match segment {
                PatternSegment::Static(name) => {
                    node = node
                        .statics
                        .entry(name.clone())
                        .or_insert_with(Node::new);
                }
                PatternSegment::Param(name) => {
                    param_names.push(name.clone());
                    node = node
                        .dynamic
                        .get_or_insert_with(|| Box::new(Node::new()))
                        .as_mut();
                }
                PatternSegment::Wildcard(rest_name) => {
                    if index + 1 != segments.len() {
                        return Err(HttpError::internal(format!(
                            "Invalid route pattern '{}': wildcard must be the last segment",
                            pattern
                        )));
                    }
                    node.wildcard = Some(WildLeaf {
                        payload,
                        param_names,
                        rest_name: rest_name.clone(),
                    });
                    return Ok(());
                }
            }
        }

        node.leaf = Some(Leaf {
            payload,
            param_names,
        });
        Ok(())
    }

    /// Matches `(method, path)` against the registered patterns.
    ///
    /// Never fails: the result is a match, a method-not-allowed marker, or a
    /// miss. Query strings, fragments, and a trailing slash on `path` are
    /// ignored.
    pub fn lookup(&self, method: HttpMethod, path: &str) -> RouteMatch<'_, T> {
        let normalized = normalize_path(path);
        let segments: Vec<&str> = split_segments(&normalized);

        if let Some(node) = self.methods.get(&method) {
            let mut values = Vec::new();
            if let Some(matched) = match_node(node, &segments, &mut values) {
                return found(matched, values);
            }
        }

        let mut values = Vec::new();
        if let Some(matched) = match_node(&self.any, &segments, &mut values) {
            return found(matched, values);
        }

        let mut allowed: Vec<HttpMethod> = Vec::new();
        for (candidate, node) in &self.methods {
            if *candidate == method {
                continue;
            }
            let mut scratch = Vec::new();
            if match_node(node, &segments, &mut scratch).is_some() {
                allowed.push(*candidate);
            }
        }
        if !allowed.is_empty() {
            allowed.sort_by_key(|m| m.as_str());
            return RouteMatch::MethodNotAllowed { allowed };
        }

        RouteMatch::Miss
    }

    /// Visits every registered payload mutably.
    ///
    /// Used by plugins that rewrite handlers in place.
    pub fn for_each_payload_mut<F: FnMut(&mut T)>(&mut self, mut visit: F) {
        for node in self.methods.values_mut() {
            visit_node(node, &mut visit);
        }
        visit_node(&mut self.any, &mut visit);
    }
}

impl<T> Default for RouteTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn visit_node<T, F: FnMut(&mut T)>(node: &mut Node<T>, visit: &mut F) {
    if let Some(leaf) = &mut node.leaf {
        visit(&mut leaf.payload);
    }
    if let Some(wild) = &mut node.wildcard {
        visit(&mut wild.payload);
    }
    if let Some(dynamic) = &mut node.dynamic {
        visit_node(dynamic, visit);
    }
    for child in node.statics.values_mut() {
        visit_node(child, visit);
    }
}

fn found<'t, T>(matched: Matched<'t, T>, values: Vec<String>) -> RouteMatch<'t, T> {
    match matched {
        Matched::Exact(leaf) => RouteMatch::Found {
            payload: &leaf.payload,
            params: zip_params(&leaf.param_names, values, None),
        },
        Matched::Wild(leaf, rest) => RouteMatch::Found {
            payload: &leaf.payload,
            params: zip_params(
                &leaf.param_names,
                values,
                leaf.rest_name.as_deref().map(|name| (name, rest)),
            ),
        },
    }
}

fn zip_params(
    names: &[String],
    values: Vec<String>,
    rest: Option<(&str, String)>,
) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = names
        .iter()
        .cloned()
        .zip(values.into_iter())
        .collect();
    if let Some((name, value)) = rest {
        params.push((name.to_string(), value));
    }
    params
}

fn match_node<'t, T>(
    node: &'t Node<T>,
    segments: &[&str],
    values: &mut Vec<String>,
) -> Option<Matched<'t, T>> {
    if segments.is_empty() {
        if let Some(leaf) = &node.leaf {
            return Some(Matched::Exact(leaf));
        }
        // A wildcard tail also matches an empty remainder.
        if let Some(wild) = &node.wildcard {
            return Some(Matched::Wild(wild, String::new()));
        }
        return None;
    }

    if let Some(child) = node.statics.get(segments[0]) {
        if let Some(matched) = match_node(child, &segments[1..], values) {
            return Some(matched);
        }
    }

    if let Some(child) = &node.dynamic {
        values.push(segments[0].to_string());
        if let Some(matched) = match_node(child, &segments[1..], values) {
            return Some(matched);
        }
        values.pop();
    }

    if let Some(wild) = &node.wildcard {
        return Some(Matched::Wild(wild, segments.join("/")));
    }

    None
}

enum PatternSegment {
    Static(String),
    Param(String),
    Wildcard(Option<String>),
}

fn parse_pattern(pattern: &str) -> Result<Vec<PatternSegment>, HttpError> {
    if !pattern.starts_with('/') {
        return Err(HttpError::internal(format!(
            "Invalid route pattern '{}': must start with '/'",
            pattern
        )));
    }

    let normalized = normalize_path(pattern);
    let mut segments = Vec::new();
    for raw in split_segments(&normalized) {
        if raw == "**" {
            segments.push(PatternSegment::Wildcard(None));
        } else if let Some(name) = raw.strip_prefix("**:") {
            if name.is_empty() {
                return Err(HttpError::internal(format!(
                    "Invalid route pattern '{}': wildcard capture is missing a name",
                    pattern
                )));
            }
            segments.push(PatternSegment::Wildcard(Some(name.to_string())));
        } else if let Some(name) = raw.strip_prefix(':') {
            if name.is_empty() {
                return Err(HttpError::internal(format!(
                    "Invalid route pattern '{}': parameter segment is missing a name",
                    pattern
                )));
            }
            segments.push(PatternSegment::Param(name.to_string()));
        } else {
            segments.push(PatternSegment::Static(raw.to_string()));
        }
    }
    Ok(segments)
}

/// Strips the query string and fragment from `path` and drops a trailing
/// slash (the root `/` is kept as-is).
pub(crate) fn normalize_path(path: &str) -> String {
    let without_query = path
        .split(['?', '#'])
        .next()
        .unwrap_or(path);
    if without_query.len() > 1 && without_query.ends_with('/') {
        without_query.trim_end_matches('/').to_string()
    } else {
        without_query.to_string()
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Matches a single standalone pattern against a path, returning the
/// captured parameters on success.
///
/// Used for middleware route predicates, which share the route grammar but
/// are not stored in the trie.
pub(crate) fn match_pattern(pattern: &str, path: &str) -> Option<Vec<(String, String)>> {
    let segments = parse_pattern(pattern).ok()?;
    let normalized = normalize_path(path);
    let parts: Vec<&str> = split_segments(&normalized);

    let mut params = Vec::new();
    let mut index = 0;
    for segment in &segments {
        match segment {
            PatternSegment::Static(name) => {
                if parts.get(index) != Some(&name.as_str()) {
                    return None;
                }
                index += 1;
            }
            PatternSegment::Param(name) => {
                let value = parts.get(index)?;
                params.push((name.clone(), value.to_string()));
                index += 1;
            }
            PatternSegment::Wildcard(rest_name) => {
                if let Some(name) = rest_name {
                    params.push((name.clone(), parts[index..].join("/")));
                }
                return Some(params);
            }
        }
    }

    if index == parts.len() { Some(params) } else { None }
}
