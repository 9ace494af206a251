//! Response projection: normalising an arbitrary handler value (or error)
//! into a concrete [`Response`].
//!
//! The dispatch order is fixed: sentinels first, then errors, then a
//! pass-through for full responses, then the value-shape table. Scratch
//! headers staged on the event are merged into whatever comes out —
//! `set-cookie` is appended (it is multi-valued), every other name is
//! overridden by the scratch.

use crate::app::App;
use crate::error::HttpError;
use crate::event::Event;
use crate::response::{Reply, Response, ResponseBody};
use crate::types::{HandlerResult, HttpMethod};
use hyper::header::{
    CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HeaderValue, SET_COOKIE,
};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Statuses that must never carry a body.
const NULL_BODY_STATUSES: [u16; 6] = [100, 101, 102, 204, 205, 304];

const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";
const TEXT_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";
const HTML_CONTENT_TYPE: &str = "text/html;charset=UTF-8";

/// Projects a handler outcome into the final response for the request.
pub(crate) async fn project(
    app: &Arc<App>,
    event: Event,
    outcome: HandlerResult,
) -> (Event, Response) {
    project_outcome(app, event, outcome, false).await
}

fn project_outcome<'a>(
    app: &'a Arc<App>,
    mut event: Event,
    outcome: HandlerResult,
    nested: bool,
) -> Pin<Box<dyn Future<Output = (Event, Response)> + Send + 'a>> {
    Box::pin(async move {
        match outcome {
            Ok(Reply::Handled) => {
                // A middleware already wrote the final response into the
                // scratch; emit it as-is with an empty body.
                let status = event.res.status().unwrap_or(200);
                let response = Response::new(status);
                finalize(event, response, None)
            }
            Ok(Reply::NotFound) => {
                let message = match event.url() {
                    Ok(url) => {
                        format!("Cannot find any route matching [{}] {}", event.method(), url)
                    }
                    Err(_) => format!(
                        "Cannot find any route matching [{}] {}",
                        event.method(),
                        event.path()
                    ),
                };
                let error = HttpError::not_found(message).with_status_text("Not Found");
                project_error(app, event, error, nested).await
            }
            Err(error) => project_error(app, event, error, nested).await,
            Ok(Reply::Response(mut response)) => {
                // Pass-through: merge scratch headers into the handler's
                // response, then enforce the null-body rule.
                merge_scratch(&mut event, &mut response.headers);
                apply_null_body_rule(event.method(), &mut response);
                (event, response)
            }
            Ok(value) => {
                let status = event.res.status().unwrap_or(200);
                let mut response = Response::new(status);
                response.status_text = event.res.status_text().map(|s| s.to_string());

                let default_content_type = match value {
                    Reply::None => {
                        response
                            .headers
                            .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
                        None
                    }
                    Reply::Text(text) => {
                        response.body = ResponseBody::Full(text.into());
                        Some(TEXT_CONTENT_TYPE)
                    }
                    Reply::Html(html) => {
                        response.body = ResponseBody::Full(html.into());
                        Some(HTML_CONTENT_TYPE)
                    }
                    Reply::Bytes(bytes) => {
                        if let Ok(len) = HeaderValue::from_str(&bytes.len().to_string()) {
                            response.headers.insert(CONTENT_LENGTH, len);
                        }
                        response.body = ResponseBody::Full(bytes);
                        None
                    }
                    Reply::Json(json_value) => {
                        match serde_json::to_vec(&json_value) {
                            Ok(encoded) => response.body = ResponseBody::Full(encoded.into()),
                            Err(error) => {
                                return project_error(
                                    app,
                                    event,
                                    HttpError::from_unhandled(error),
                                    nested,
                                )
                                .await;
                            }
                        }
                        Some(JSON_CONTENT_TYPE)
                    }
                    Reply::BigInt(value) => {
                        response.body = ResponseBody::Full(value.to_string().into());
                        Some(JSON_CONTENT_TYPE)
                    }
                    Reply::Stream(stream_reply) => {
                        if let Some(size) = stream_reply.size {
                            if let Ok(len) = HeaderValue::from_str(&size.to_string()) {
                                response.headers.insert(CONTENT_LENGTH, len);
                            }
                        }
                        if let Some(filename) = &stream_reply.filename {
                            let disposition = format!(
                                "filename=\"{}\"; filename*=UTF-8''{}",
                                filename,
                                urlencoding::encode(filename)
                            );
                            if let Ok(value) = HeaderValue::from_str(&disposition) {
                                response.headers.insert(CONTENT_DISPOSITION, value);
                            }
                        }
                        if let Some(content_type) = &stream_reply.content_type {
                            if let Ok(value) = HeaderValue::from_str(content_type) {
                                response.headers.insert(CONTENT_TYPE, value);
                            }
                        }
                        response.body = ResponseBody::Stream(stream_reply.stream);
                        None
                    }
                    // Handled above.
                    Reply::Handled | Reply::NotFound | Reply::Response(_) => None,
                };

                finalize(event, response, default_content_type)
            }
        }
    })
}

async fn project_error(
    app: &Arc<App>,
    mut event: Event,
    mut error: HttpError,
    nested: bool,
) -> (Event, Response) {
    // The user hook runs once per request; a nested projection (its own
    // return value being re-projected) must not re-enter it.
    if !nested {
        if let Some(hook) = app.on_error_hook() {
            let (hook_event, outcome) = hook(error, event).await;
            event = hook_event;
            match outcome {
                Ok(reply) => return project_outcome(app, event, Ok(reply), true).await,
                Err(unchanged) => error = unchanged,
            }
        }
    }

    if error.unhandled && !app.is_silent() {
        tracing::error!(
            status = error.status,
            message = %error.message,
            cause_chain = ?error.cause_chain(),
            "unhandled error while processing request"
        );
    }

    let mut body = error.to_json();
    if app.is_debug() {
        body["stack"] = json!(error.cause_chain());
    }

    let mut response = Response::new(error.status);
    response.status_text = error.status_text.clone();
    if let Some(headers) = &error.headers {
        response.headers.extend(headers.clone());
    }
    match serde_json::to_vec(&body) {
        Ok(encoded) => response.body = ResponseBody::Full(encoded.into()),
        Err(_) => response.body = ResponseBody::Full(bytes::Bytes::from_static(b"{}")),
    }

    finalize(event, response, Some(JSON_CONTENT_TYPE))
}

fn finalize(
    mut event: Event,
    mut response: Response,
    default_content_type: Option<&str>,
) -> (Event, Response) {
    merge_scratch(&mut event, &mut response.headers);

    if let Some(content_type) = default_content_type {
        if !response.headers.contains_key(CONTENT_TYPE) {
            if let Ok(value) = HeaderValue::from_str(content_type) {
                response.headers.insert(CONTENT_TYPE, value);
            }
        }
    }

    apply_null_body_rule(event.method(), &mut response);
    (event, response)
}

/// Copies the event's staged headers into the outgoing header map.
///
/// `set-cookie` values are appended — equal values are not deduplicated —
/// and every other scratch header replaces the response's value for that
/// name.
fn merge_scratch(event: &mut Event, headers: &mut hyper::HeaderMap) {
    if let Some(scratch) = event.res.take_headers() {
        let mut last_name = None;
        for (name, value) in scratch {
            let name = name.or(last_name.clone());
            if let Some(name) = name {
                if name == SET_COOKIE {
                    headers.append(name.clone(), value);
                } else {
                    headers.insert(name.clone(), value);
                }
                last_name = Some(name);
            }
        }
    }
}

fn apply_null_body_rule(method: HttpMethod, response: &mut Response) {
    if method == HttpMethod::HEAD || NULL_BODY_STATUSES.contains(&response.status) {
        response.body = ResponseBody::Empty;
    }
}
