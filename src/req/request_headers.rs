#![warn(missing_docs)]
use hyper::HeaderMap;
use hyper::header::{HeaderName, HeaderValue};

/// Case-insensitive view over the incoming request headers.
///
/// Wraps a hyper [`HeaderMap`], so reads are case-insensitive while the
/// original casing is preserved for anything re-emitted downstream.
///
/// # Example
/// ```
/// use trellis::req::request_headers::RequestHeaders;
///
/// let mut headers = RequestHeaders::new();
/// headers.insert("Content-Type", "application/json");
/// assert!(headers.has("content-type"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    inner: HeaderMap,
}

impl RequestHeaders {
    /// Creates an empty header collection.
    pub fn new() -> Self {
        Self {
            inner: HeaderMap::new(),
        }
    }

    /// Returns the first value for `name`, if present and valid UTF-8.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns all values for `name`.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.inner
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Returns true when a header named `name` is present.
    pub fn has(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Iterates over `(name, value)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
    }

    /// Inserts a header, replacing any existing values for the same name.
    ///
    /// Invalid names or values are dropped silently; request construction
    /// is not the place to fail a whole request over one bad header.
    pub fn insert<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_ref().as_bytes()),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.inner.insert(name, value);
        }
    }

    /// Appends a header value, keeping existing ones.
    pub fn append<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_ref().as_bytes()),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.inner.append(name, value);
        }
    }

    /// Declared `content-length`, when present and well-formed.
    pub fn content_length(&self) -> Option<u64> {
        self.get("content-length").and_then(|v| v.parse().ok())
    }

    /// The declared content type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }

    /// True when the declared content type is JSON (`application/json` or
    /// any `+json` subtype).
    pub fn is_json(&self) -> bool {
        match self.parsed_content_type() {
            Some(mime) => {
                mime.type_() == mime::APPLICATION
                    && (mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON))
            }
            None => false,
        }
    }

    /// True when the declared content type is
    /// `application/x-www-form-urlencoded`.
    pub fn is_form(&self) -> bool {
        match self.parsed_content_type() {
            Some(mime) => {
                mime.type_() == mime::APPLICATION && mime.subtype() == "x-www-form-urlencoded"
            }
            None => false,
        }
    }

    fn parsed_content_type(&self) -> Option<mime::Mime> {
        self.content_type().and_then(|value| value.parse().ok())
    }

    /// Borrows the underlying map.
    pub fn as_map(&self) -> &HeaderMap {
        &self.inner
    }
}

impl From<HeaderMap> for RequestHeaders {
    fn from(inner: HeaderMap) -> Self {
        Self { inner }
    }
}
