//! # HTTP Request Module
//!
//! This module provides the [`RequestHandle`], the neutral view of an
//! incoming HTTP message that every [`Event`](crate::event::Event) carries:
//! method, request target, case-insensitive headers, and a request body that
//! is read **at most once**. Body accessors (`text`, `bytes`, `json`,
//! `form_data`) drain the body on first use and serve every later call from
//! the cache, so middleware and handlers can both look at the body without
//! coordinating.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use trellis::req::RequestHandle;
//! use trellis::types::HttpMethod;
//!
//! # async fn example(mut req: RequestHandle) {
//! if req.method() == HttpMethod::POST {
//!     let body: serde_json::Value = req.json().await.unwrap();
//!     println!("payload: {}", body);
//! }
//! # }
//! ```

#![warn(missing_docs)]

/// Case-insensitive request header access.
pub mod request_headers;

pub(crate) mod body;

use crate::error::HttpError;
use crate::types::{ByteStream, HttpMethod};
use ahash::AHashMap;
use body::BodyState;
use bytes::Bytes;
use request_headers::RequestHeaders;
use serde_json::Value;

/// The immutable-ish handle onto the incoming HTTP message.
///
/// The handle owns the request body; reading it is a `&mut` operation that
/// caches the raw bytes so the body is only ever pulled from the wire once.
pub struct RequestHandle {
    method: HttpMethod,
    target: String,
    headers: RequestHeaders,
    pub(crate) body: BodyState,
}

impl RequestHandle {
    /// Creates a synthetic request, used for in-process dispatch and tests.
    pub fn new(
        method: HttpMethod,
        target: impl Into<String>,
        headers: RequestHeaders,
        body: Option<Bytes>,
    ) -> Self {
        Self {
            method,
            target: target.into(),
            headers,
            body: match body {
                Some(bytes) if !bytes.is_empty() => BodyState::Buffered(bytes),
                _ => BodyState::Empty,
            },
        }
    }

    /// Creates a request whose body arrives as a byte stream.
    pub fn from_stream(
        method: HttpMethod,
        target: impl Into<String>,
        headers: RequestHeaders,
        body: ByteStream,
    ) -> Self {
        Self {
            method,
            target: target.into(),
            headers,
            body: BodyState::Streaming(body),
        }
    }

    /// The request method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The request target as received (path plus optional query string).
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The path component of the target, without query or fragment.
    pub fn path(&self) -> &str {
        self.target
            .split(['?', '#'])
            .next()
            .unwrap_or(&self.target)
    }

    /// The raw query string, without the leading `?`.
    pub fn query_string(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, query)| query)
    }

    /// Rewrites the request target. Used when a mounted sub-app strips its
    /// base path before delegation.
    pub(crate) fn set_target(&mut self, target: String) {
        self.target = target;
    }

    /// The request headers.
    pub fn headers(&self) -> &RequestHeaders {
        &self.headers
    }

    /// Mutable access to the request headers (middleware may annotate).
    pub fn headers_mut(&mut self) -> &mut RequestHeaders {
        &mut self.headers
    }

    /// Reads the raw body bytes.
    ///
    /// The first call drains the body (buffer or stream) and caches it;
    /// later calls return the cached bytes. Fails once the body has been
    /// locked by JSON validation.
    pub async fn bytes(&mut self) -> Result<Bytes, HttpError> {
        self.body.read_bytes().await
    }

    /// Reads the body as UTF-8 text.
    pub async fn text(&mut self) -> Result<String, HttpError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| HttpError::bad_request(format!("Body is not valid UTF-8: {}", e)))
    }

    /// Parses the body as a JSON value.
    ///
    /// A body locked by JSON validation returns the validated value.
    pub async fn json_value(&mut self) -> Result<Value, HttpError> {
        if let BodyState::JsonLocked(value) = &self.body {
            return Ok(value.clone());
        }
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| HttpError::bad_request(format!("Invalid JSON body: {}", e)))
    }

    /// Deserialises the JSON body into `T`.
    ///
    /// # Example
    /// ```no_run
    /// # use trellis::req::RequestHandle;
    /// # use serde::Deserialize;
    /// #[derive(Deserialize)]
    /// struct Login { username: String, password: String }
    ///
    /// # async fn handler(mut req: RequestHandle) {
    /// let login: Login = req.json().await.unwrap();
    /// # }
    /// ```
    pub async fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T, HttpError> {
        let value = self.json_value().await?;
        serde_json::from_value(value)
            .map_err(|e| HttpError::bad_request(format!("Invalid JSON body: {}", e)))
    }

    /// Parses the body as `application/x-www-form-urlencoded` form data.
    pub async fn form_data(&mut self) -> Result<AHashMap<String, String>, HttpError> {
        let bytes = self.bytes().await?;
        Ok(body::parse_form_data(&bytes))
    }

    /// True when the body has not been pulled yet.
    pub fn body_unread(&self) -> bool {
        self.body.is_unread()
    }

    /// Replaces the body state, returning the previous one.
    ///
    /// The body-size guard uses this to substitute a re-chained stream after
    /// peeking, so handler reads still see every byte.
    pub(crate) fn swap_body(&mut self, body: BodyState) -> BodyState {
        std::mem::replace(&mut self.body, body)
    }
}

impl std::fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("method", &self.method)
            .field("target", &self.target)
            .field("headers", &self.headers)
            .finish()
    }
}
