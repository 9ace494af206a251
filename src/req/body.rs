#![warn(missing_docs)]
use crate::error::HttpError;
use crate::types::ByteStream;
use ahash::AHashMap;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;

/// The state of an incoming request body.
///
/// A body starts unread (`Buffered` for in-process requests, `Streaming`
/// for network requests) and is read **at most once**: the first accessor
/// drains it into `Cached`, and every later accessor is served from the
/// cache. Enabling JSON validation moves the body into `JsonLocked`, after
/// which the raw accessors fail fast so validation cannot be bypassed.
pub(crate) enum BodyState {
    /// No body.
    Empty,
    /// Unread, fully buffered bytes.
    Buffered(Bytes),
    /// Unread byte stream.
    Streaming(ByteStream),
    /// Raw bytes already read and cached.
    Cached(Bytes),
    /// Body consumed by JSON validation; only the validated value remains.
    JsonLocked(Value),
}

impl BodyState {
    /// Drains the body into the cache (when needed) and returns the raw
    /// bytes. Fails when the body was locked by JSON validation.
    pub(crate) async fn read_bytes(&mut self) -> Result<Bytes, HttpError> {
        match self {
            BodyState::Empty => Ok(Bytes::new()),
            BodyState::Cached(bytes) => Ok(bytes.clone()),
            BodyState::Buffered(bytes) => {
                let bytes = bytes.clone();
                *self = BodyState::Cached(bytes.clone());
                Ok(bytes)
            }
            BodyState::Streaming(stream) => {
                let mut collected: Vec<u8> = Vec::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(HttpError::from_unhandled)?;
                    collected.extend_from_slice(&chunk);
                }
                let bytes = Bytes::from(collected);
                *self = BodyState::Cached(bytes.clone());
                Ok(bytes)
            }
            BodyState::JsonLocked(_) => Err(HttpError::bad_request(
                "Body already consumed by JSON validation",
            )),
        }
    }

    /// True when the body has not been pulled yet.
    pub(crate) fn is_unread(&self) -> bool {
        matches!(
            self,
            BodyState::Empty | BodyState::Buffered(_) | BodyState::Streaming(_)
        )
    }
}

/// Parses an `application/x-www-form-urlencoded` body into a map.
///
/// Duplicate field names resolve to the last value, matching the common
/// form-submission behaviour.
pub(crate) fn parse_form_data(bytes: &Bytes) -> AHashMap<String, String> {
    url::form_urlencoded::parse(bytes)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}
