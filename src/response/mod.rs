//! # Response Module
//!
//! This module provides the two halves of the response story:
//!
//! - [`Reply`], the value a handler resolves to. Handlers return whatever
//!   shape is natural — text, bytes, JSON, a stream, a full [`Response`],
//!   or one of the engine sentinels — and the projector normalises it.
//! - [`Response`], the concrete HTTP response: status, headers, body, and
//!   (for upgrade handlers) an attached WebSocket hook table.
//!
//! ## Basic Usage
//!
//! ```rust
//! use trellis::response::Reply;
//!
//! let text = Reply::text("Hello, World!");
//! let json = Reply::json(&serde_json::json!({ "ok": true })).unwrap();
//! ```

#![warn(missing_docs)]

pub(crate) mod projector;

use crate::error::HttpError;
use crate::types::ByteStream;
use crate::websocket::WebSocketHooks;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::HeaderMap;
use hyper::body::Frame;
use hyper::header::{HeaderName, HeaderValue};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// A streaming reply with the blob-style metadata the projector consumes.
pub struct StreamReply {
    /// The body chunks.
    pub stream: ByteStream,
    /// Content type of the stream, when known.
    pub content_type: Option<String>,
    /// Total size in bytes, when known; emitted as `content-length`.
    pub size: Option<u64>,
    /// File name, when the stream represents a file; emitted as
    /// `content-disposition`.
    pub filename: Option<String>,
}

/// The value a handler resolves to.
///
/// Every variant corresponds to a row of the projector's dispatch table;
/// `Handled` and `NotFound` are the engine sentinels.
pub enum Reply {
    /// No body; projected with `content-length: 0`.
    None,
    /// A plain-text body; content type defaults to `text/plain`.
    Text(String),
    /// An HTML body; content type defaults to `text/html`.
    Html(String),
    /// A raw byte body with `content-length` set.
    Bytes(Bytes),
    /// A JSON body, encoded with `application/json;charset=UTF-8`.
    Json(Value),
    /// A big integer, serialised as its decimal string with the JSON
    /// content type.
    BigInt(i128),
    /// A streaming body with optional blob metadata.
    Stream(StreamReply),
    /// A fully formed response, passed through with scratch headers merged.
    Response(Response),
    /// Sentinel: a middleware already produced the final response.
    Handled,
    /// Sentinel: the router found no matching route.
    NotFound,
}

impl Reply {
    /// A plain-text reply.
    pub fn text<T: Into<String>>(text: T) -> Self {
        Reply::Text(text.into())
    }

    /// An HTML reply.
    pub fn html<T: Into<String>>(html: T) -> Self {
        Reply::Html(html.into())
    }

    /// A JSON reply from any serialisable value.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, HttpError> {
        Ok(Reply::Json(serde_json::to_value(value)?))
    }

    /// A raw byte reply.
    pub fn bytes<T: Into<Bytes>>(bytes: T) -> Self {
        Reply::Bytes(bytes.into())
    }

    /// A streaming reply without blob metadata.
    pub fn stream(stream: ByteStream) -> Self {
        Reply::Stream(StreamReply {
            stream,
            content_type: None,
            size: None,
            filename: None,
        })
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<Bytes> for Reply {
    fn from(bytes: Bytes) -> Self {
        Reply::Bytes(bytes)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::None
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::None => write!(f, "Reply::None"),
            Reply::Text(text) => f.debug_tuple("Reply::Text").field(text).finish(),
            Reply::Html(html) => f.debug_tuple("Reply::Html").field(html).finish(),
            Reply::Bytes(bytes) => write!(f, "Reply::Bytes({} bytes)", bytes.len()),
            Reply::Json(value) => f.debug_tuple("Reply::Json").field(value).finish(),
            Reply::BigInt(value) => f.debug_tuple("Reply::BigInt").field(value).finish(),
            Reply::Stream(_) => write!(f, "Reply::Stream(<stream>)"),
            Reply::Response(response) => f.debug_tuple("Reply::Response").field(response).finish(),
            Reply::Handled => write!(f, "Reply::Handled"),
            Reply::NotFound => write!(f, "Reply::NotFound"),
        }
    }
}

/// The body of a concrete [`Response`].
pub enum ResponseBody {
    /// No body.
    Empty,
    /// A fully buffered body.
    Full(Bytes),
    /// A streaming body, sent with chunked transfer encoding.
    Stream(ByteStream),
}

/// A concrete HTTP response.
pub struct Response {
    /// The status code.
    pub status: u16,
    /// Optional reason phrase (carried for introspection; HTTP/2 drops it).
    pub status_text: Option<String>,
    /// The response headers. `set-cookie` may appear multiple times.
    pub headers: HeaderMap,
    /// The response body.
    pub body: ResponseBody,
    /// WebSocket hook table attached by an upgrade handler; a transport
    /// adapter that recognises it performs the actual upgrade.
    pub websocket: Option<Arc<WebSocketHooks>>,
}

impl Response {
    /// Creates an empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            status_text: None,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
            websocket: None,
        }
    }

    /// Sets a header, replacing existing values.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets the body to buffered bytes.
    pub fn with_body<T: Into<Bytes>>(mut self, body: T) -> Self {
        self.body = ResponseBody::Full(body.into());
        self
    }

    /// Sets a header in place, replacing existing values.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
    }

    /// Returns the first header value for `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns every header value for `name`.
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Collects the body into bytes, draining a streaming body.
    pub async fn body_bytes(&mut self) -> Bytes {
        match &mut self.body {
            ResponseBody::Empty => Bytes::new(),
            ResponseBody::Full(bytes) => bytes.clone(),
            ResponseBody::Stream(stream) => {
                let mut collected: Vec<u8> = Vec::new();
                while let Some(chunk) = stream.next().await {
                    if let Ok(chunk) = chunk {
                        collected.extend_from_slice(&chunk);
                    }
                }
                let bytes = Bytes::from(collected);
                self.body = ResponseBody::Full(bytes.clone());
                bytes
            }
        }
    }

    /// Collects the body and decodes it as UTF-8 text.
    pub async fn body_text(&mut self) -> String {
        let bytes = self.body_bytes().await;
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Collects the body and parses it as JSON.
    pub async fn body_json(&mut self) -> Result<Value, HttpError> {
        let bytes = self.body_bytes().await;
        serde_json::from_slice(&bytes)
            .map_err(|e| HttpError::internal(format!("Response body is not JSON: {}", e)))
    }

    /// Converts into a hyper response for the serving layer.
    pub fn into_hyper(self) -> hyper::Response<BoxBody<Bytes, std::io::Error>> {
        let body = match self.body {
            ResponseBody::Empty => Full::new(Bytes::new())
                .map_err(|never| match never {})
                .boxed(),
            ResponseBody::Full(bytes) => {
                Full::new(bytes).map_err(|never| match never {}).boxed()
            }
            ResponseBody::Stream(stream) => {
                BodyExt::boxed(StreamBody::new(stream.map(|result| result.map(Frame::data))))
            }
        };

        let mut response = hyper::Response::new(body);
        *response.status_mut() = hyper::StatusCode::from_u16(self.status)
            .unwrap_or(hyper::StatusCode::INTERNAL_SERVER_ERROR);
        response.headers_mut().extend(self.headers);
        response
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = match &self.body {
            ResponseBody::Empty => "<empty>".to_string(),
            ResponseBody::Full(bytes) => format!("{} bytes", bytes.len()),
            ResponseBody::Stream(_) => "<stream>".to_string(),
        };
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &body)
            .finish()
    }
}
