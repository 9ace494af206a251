#![warn(missing_docs)]
use crate::types::HttpMethod;
use ahash::AHashMap;
use serde_json::Value;

/// Dynamic route parameters captured from the URL.
///
/// # Example
/// ```
/// use trellis::event::context::RouteParams;
///
/// let mut params = RouteParams::new();
/// params.insert("id".to_string(), "42".to_string());
/// assert_eq!(params.get("id"), Some("42"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteParams {
    inner: AHashMap<String, String>,
}

impl RouteParams {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the captured value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).map(|s| s.as_str())
    }

    /// Inserts a captured parameter.
    pub fn insert(&mut self, name: String, value: String) {
        self.inner.insert(name, value);
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of captured parameters.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<(String, String)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

/// Introspection record for the route a request resolved to.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    /// The route's method, `None` for wildcard-method routes.
    pub method: Option<HttpMethod>,
    /// The registered pattern.
    pub pattern: String,
    /// Opaque metadata attached at registration, returned verbatim.
    pub meta: Option<Value>,
}

/// Credentials accepted by the basic-auth primitive.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    /// The authenticated user name.
    pub username: String,
    /// The realm the credentials were checked against, if one was set.
    pub realm: Option<String>,
}

/// The per-request context bag.
///
/// Reserved, typed slots for the values the framework itself populates
/// (path captures, matched route, mount base, client address, basic-auth
/// identity), plus an untyped keyed area middleware and handlers share
/// freely.
///
/// # Example
/// ```
/// use trellis::event::context::EventContext;
///
/// let mut context = EventContext::new();
/// context.set("user_id", serde_json::json!("12345"));
/// assert_eq!(context.get("user_id"), Some(&serde_json::json!("12345")));
/// ```
#[derive(Debug, Default)]
pub struct EventContext {
    /// Path parameters captured by the matched route.
    pub params: RouteParams,
    /// Parameters captured by middleware route predicates.
    pub middleware_params: RouteParams,
    /// The route this request resolved to, for introspection.
    pub matched_route: Option<MatchedRoute>,
    /// Base path stripped by a mounted sub-app, when delegation happened.
    pub mount_base: Option<String>,
    /// Address of the connected client, when the transport knows it.
    pub client_address: Option<String>,
    /// Identity established by the basic-auth primitive.
    pub basic_auth: Option<BasicAuth>,
    data: AHashMap<String, Value>,
}

impl EventContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under `key` in the untyped area.
    pub fn set<K: Into<String>>(&mut self, key: K, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }
}
