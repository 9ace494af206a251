#![warn(missing_docs)]
use crate::error::HttpError;
use crate::event::Event;
use crate::req::body::BodyState;
use crate::router::chain::MiddlewareEntry;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use std::sync::Arc;

/// Middleware for limiting the maximum allowed size of the HTTP request body.
///
/// Requests whose body exceeds the configured limit are rejected with a
/// `413 Payload Too Large` response carrying a JSON error body. The check
/// prefers the declared `content-length`; bodies arriving chunked are
/// probed through [`is_body_size_within`], which never consumes bytes the
/// handler will still want to read.
///
/// # Arguments
///
/// * `limit` - An optional maximum size in bytes for the request body. If
///   `None` is provided, the default limit is 1 MB (1,048,576 bytes).
///
/// # Example
///
/// ```rust
/// use trellis::app::App;
/// use trellis::middlewares::body_limit::body_limit;
///
/// // Limit request bodies to 2 MB
/// let mut app = App::new();
/// app.use_entry(body_limit(Some(2 * 1024 * 1024)));
/// ```
pub fn body_limit(limit: Option<u64>) -> Arc<MiddlewareEntry> {
    let limit = limit.unwrap_or(DEFAULT_BODY_LIMIT);
    crate::middlewares::middleware(move |mut event: Event| async move {
        match is_body_size_within(&mut event, limit).await {
            Ok(true) => (event, Ok(None)),
            Ok(false) => {
                let error = HttpError::payload_too_large(format!(
                    "Request body exceeded the configured limit of {} bytes",
                    limit
                ))
                .with_data(serde_json::json!({ "limit": limit }));
                (event, Err(error))
            }
            Err(error) => (event, Err(error)),
        }
    })
}

const DEFAULT_BODY_LIMIT: u64 = 1024 * 1024;

/// Checks whether the request body fits within `limit` bytes without
/// consuming it.
///
/// A declared `content-length` (and no chunked transfer encoding) is
/// compared directly. Otherwise the body stream is pulled up to
/// `limit + 1` bytes: an overshoot answers `false` immediately, and either
/// way the pulled chunks are re-chained in front of the remainder so later
/// handler reads still see every byte.
pub async fn is_body_size_within(event: &mut Event, limit: u64) -> Result<bool, HttpError> {
    let chunked = event
        .req
        .headers()
        .get("transfer-encoding")
        .map(|value| value.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false);

    if !chunked {
        if let Some(declared) = event.req.headers().content_length() {
            return Ok(declared <= limit);
        }
    }

    match event.req.swap_body(BodyState::Empty) {
        BodyState::Empty => Ok(true),
        BodyState::Buffered(bytes) => {
            let within = bytes.len() as u64 <= limit;
            event.req.swap_body(BodyState::Buffered(bytes));
            Ok(within)
        }
        BodyState::Cached(bytes) => {
            let within = bytes.len() as u64 <= limit;
            event.req.swap_body(BodyState::Cached(bytes));
            Ok(within)
        }
        BodyState::JsonLocked(value) => {
            // Already validated and cached; the raw body is gone, so the
            // declared length is all there is to check.
            event.req.swap_body(BodyState::JsonLocked(value));
            Ok(true)
        }
        BodyState::Streaming(mut inner) => {
            let mut pulled: Vec<Bytes> = Vec::new();
            let mut total: u64 = 0;
            let mut exceeded = false;

            while total <= limit {
                match inner.next().await {
                    Some(Ok(chunk)) => {
                        total += chunk.len() as u64;
                        pulled.push(chunk);
                        if total > limit {
                            exceeded = true;
                            break;
                        }
                    }
                    Some(Err(error)) => {
                        event.req.swap_body(BodyState::Streaming(inner));
                        return Err(HttpError::from_unhandled(error));
                    }
                    None => {
                        // Clean close within the limit: the whole body is in
                        // hand, so leave it buffered for the handler.
                        let collected: Vec<u8> =
                            pulled.iter().flat_map(|b| b.iter().copied()).collect();
                        event
                            .req
                            .swap_body(BodyState::Buffered(Bytes::from(collected)));
                        return Ok(true);
                    }
                }
            }

            let replay = stream::iter(pulled.into_iter().map(Ok)).chain(inner);
            event
                .req
                .swap_body(BodyState::Streaming(Box::pin(replay)));
            Ok(!exceeded)
        }
    }
}
