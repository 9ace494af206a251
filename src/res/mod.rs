//! # Response Scratch Module
//!
//! The per-request response scratch: the mutable staging area middleware and
//! handlers write status and headers into before the projector assembles the
//! final [`Response`](crate::response::Response). The header map is
//! allocated lazily, so requests that never touch it pay nothing.

#![warn(missing_docs)]

use hyper::HeaderMap;
use hyper::header::{HeaderName, HeaderValue};

/// Mutable response staging carried on every event.
///
/// `status` starts unset; the projector interprets an unset status as 200
/// unless the handler value dictates otherwise.
///
/// # Example
/// ```
/// use trellis::res::ResponseScratch;
///
/// let mut res = ResponseScratch::new();
/// res.set_status(201);
/// res.set_header("x-request-id", "abc-123");
/// assert_eq!(res.status(), Some(201));
/// ```
#[derive(Debug, Default)]
pub struct ResponseScratch {
    status: Option<u16>,
    status_text: Option<String>,
    headers: Option<HeaderMap>,
}

impl ResponseScratch {
    /// Creates an empty scratch.
    pub fn new() -> Self {
        Self::default()
    }

    /// The staged status code, if any was set.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Stages a status code for the final response.
    pub fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    /// The staged reason phrase, if any.
    pub fn status_text(&self) -> Option<&str> {
        self.status_text.as_deref()
    }

    /// Stages a reason phrase.
    pub fn set_status_text<T: Into<String>>(&mut self, status_text: T) {
        self.status_text = Some(status_text.into());
    }

    /// Borrows the staged headers, if the map was ever touched.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.headers.as_ref()
    }

    /// Mutable access to the staged headers, allocating the map on first use.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.headers.get_or_insert_with(HeaderMap::new)
    }

    /// Sets a header, replacing existing values for the name.
    pub fn set_header<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_ref().as_bytes()),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.headers_mut().insert(name, value);
        }
    }

    /// Appends a header value, preserving existing ones.
    ///
    /// `set-cookie` is the usual customer; it is the one response header
    /// that legitimately appears multiple times.
    pub fn append_header<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_ref().as_bytes()),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.headers_mut().append(name, value);
        }
    }

    /// Removes every value for a header name.
    pub fn remove_header(&mut self, name: &str) {
        if let Some(headers) = &mut self.headers {
            headers.remove(name);
        }
    }

    /// Returns the first staged value for `name`.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_ref()
            .and_then(|h| h.get(name))
            .and_then(|v| v.to_str().ok())
    }

    /// Takes the staged headers out of the scratch, leaving it empty.
    ///
    /// The projector drains the scratch exactly once per request, so a
    /// mounted sub-app's projection does not double-merge into the parent's.
    pub(crate) fn take_headers(&mut self) -> Option<HeaderMap> {
        self.headers.take()
    }
}
