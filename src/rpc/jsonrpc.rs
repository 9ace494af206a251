//! # JSON-RPC 2.0 Dispatcher
//!
//! Validates, routes, and executes JSON-RPC 2.0 requests — single or batch
//! — over the engine. The method map is a *closed namespace*: lookups are
//! explicit key-presence checks on a plain hash map, so method names like
//! `__proto__` or `constructor` resolve only when explicitly registered,
//! and the reserved `rpc.` prefix is always rejected.
//!
//! Notifications (requests without an `id` member) never produce a
//! response object; a batch consisting solely of notifications answers
//! with an empty HTTP 202.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use trellis::app::App;
//! use trellis::rpc::jsonrpc::RpcRouter;
//! use serde_json::{Value, json};
//!
//! let mut rpc = RpcRouter::new();
//! rpc.method("echo", |call, event| async move {
//!     let first = call
//!         .params
//!         .as_ref()
//!         .and_then(|p| p.get(0))
//!         .cloned()
//!         .unwrap_or(Value::Null);
//!     (event, Ok(first))
//! });
//!
//! let mut app = App::new();
//! app.post("/rpc", rpc.into_handler()).unwrap();
//! ```

#![warn(missing_docs)]

use crate::error::HttpError;
use crate::event::Event;
use crate::response::{Reply, Response};
use crate::types::{Handler, Step, box_step};
use ahash::AHashMap;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Parse error: invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist or is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

/// One validated call out of a request or batch.
#[derive(Debug, Clone)]
pub struct RpcCall {
    /// The method name.
    pub method: String,
    /// The `params` member, when present (array or object).
    pub params: Option<Value>,
    /// The `id` member. `None` means the member was absent — a
    /// notification; `Some(Value::Null)` is a regular request with a null
    /// id.
    pub id: Option<Value>,
}

impl RpcCall {
    /// True when the call is a notification and must not be answered.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

type RpcFuture = Pin<Box<dyn Future<Output = (Event, Result<Value, HttpError>)> + Send>>;

/// A registered JSON-RPC method handler.
pub type RpcHandler = Arc<dyn Fn(RpcCall, Event) -> RpcFuture + Send + Sync>;

/// A JSON-RPC 2.0 method router.
pub struct RpcRouter {
    methods: AHashMap<String, RpcHandler>,
}

impl RpcRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self {
            methods: AHashMap::new(),
        }
    }

    /// Registers a method handler.
    ///
    /// The handler receives the validated call and the event, and resolves
    /// to the result value or an error (mapped onto JSON-RPC error codes
    /// by status).
    pub fn method<F, Fut>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(RpcCall, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = (Event, Result<Value, HttpError>)> + Send + 'static,
    {
        self.methods.insert(
            name.to_string(),
            Arc::new(move |call, event| Box::pin(handler(call, event))),
        );
        self
    }

    /// True when `name` was explicitly registered.
    ///
    /// This is the only lookup the dispatcher performs: the namespace is
    /// closed, nothing is inherited.
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Dispatches a parsed payload (single request or batch).
    ///
    /// Resolves to the response body, or `None` when nothing must be
    /// answered (all notifications).
    pub async fn dispatch(&self, payload: Value, event: Event) -> (Event, Option<Value>) {
        match payload {
            Value::Array(items) => {
                if items.is_empty() {
                    let error = error_object(Value::Null, INVALID_REQUEST, "Invalid Request", None);
                    return (event, Some(error));
                }

                let mut responses = Vec::new();
                let mut event = event;
                for item in items {
                    let (next_event, response) = self.dispatch_one(item, event).await;
                    event = next_event;
                    if let Some(response) = response {
                        responses.push(response);
                    }
                }

                if responses.is_empty() {
                    (event, None)
                } else {
                    (event, Some(Value::Array(responses)))
                }
            }
            Value::Object(_) => self.dispatch_one(payload, event).await,
            _ => {
                let error = error_object(Value::Null, PARSE_ERROR, "Parse error", None);
                (event, Some(error))
            }
        }
    }

    async fn dispatch_one(&self, item: Value, event: Event) -> (Event, Option<Value>) {
        let call = match validate_call(&item) {
            Ok(call) => call,
            Err(response) => return (event, Some(response)),
        };

        // Reserved namespace and unknown methods share the same error; the
        // lookup is an explicit key-presence check, nothing is inherited.
        let reserved = call.method.starts_with("rpc.");
        let handler = match self.methods.get(&call.method) {
            Some(handler) if !reserved => Arc::clone(handler),
            _ => {
                if call.is_notification() {
                    return (event, None);
                }
                let id = call.id.clone().unwrap_or(Value::Null);
                return (
                    event,
                    Some(error_object(id, METHOD_NOT_FOUND, "Method not found", None)),
                );
            }
        };

        let notification = call.is_notification();
        let id = call.id.clone().unwrap_or(Value::Null);
        let (event, outcome) = handler(call, event).await;

        if notification {
            // Notifications swallow results and errors alike.
            return (event, None);
        }

        match outcome {
            Ok(result) => (event, Some(result_object(id, result))),
            Err(error) => {
                let (code, message, data) = map_error(&error);
                (event, Some(error_object(id, code, &message, data)))
            }
        }
    }

    /// Turns the router into an HTTP route handler.
    ///
    /// Only POST is accepted; malformed JSON answers with a parse-error
    /// object, and an all-notification batch answers 202 with an empty
    /// body.
    pub fn into_handler(self) -> Handler {
        let router = Arc::new(self);
        Arc::new(move |event| {
            let router = Arc::clone(&router);
            box_step(async move { dispatch_http(&router, event).await })
        })
    }
}

impl Default for RpcRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a full HTTP request through a router: method check, body parse,
/// dispatch, and response shaping. Shared by the JSON-RPC and MCP
/// handlers.
pub(crate) async fn dispatch_http(router: &RpcRouter, mut event: Event) -> Step {
    if event.method() != crate::types::HttpMethod::POST {
        let error = HttpError::method_not_allowed(
            "JSON-RPC requests must use POST",
            &["POST"],
        );
        return (event, Err(error));
    }

    let bytes = match event.req.bytes().await {
        Ok(bytes) => bytes,
        Err(error) => return (event, Err(error)),
    };

    let payload: Value = match serde_json::from_slice(&bytes) {
        Ok(payload) => payload,
        Err(_) => {
            let body = error_object(Value::Null, PARSE_ERROR, "Parse error", None);
            return (event, Ok(Reply::Json(body)));
        }
    };

    let (event, body) = router.dispatch(payload, event).await;
    match body {
        Some(body) => (event, Ok(Reply::Json(body))),
        None => (event, Ok(Reply::Response(Response::new(202)))),
    }
}

fn validate_call(item: &Value) -> Result<RpcCall, Value> {
    let Some(object) = item.as_object() else {
        return Err(error_object(
            Value::Null,
            INVALID_REQUEST,
            "Invalid Request",
            None,
        ));
    };

    // Salvage the id for the error response when its type is acceptable.
    let id = object.get("id").cloned();
    let id_valid = match &id {
        None | Some(Value::Null) | Some(Value::String(_)) => true,
        Some(Value::Number(number)) => number.as_i64().is_some() || number.as_u64().is_some(),
        Some(_) => false,
    };
    let error_id = if id_valid {
        id.clone().unwrap_or(Value::Null)
    } else {
        Value::Null
    };

    if object.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(error_object(
            error_id,
            INVALID_REQUEST,
            "Invalid Request",
            None,
        ));
    }

    let Some(method) = object.get("method").and_then(Value::as_str) else {
        return Err(error_object(
            error_id,
            INVALID_REQUEST,
            "Invalid Request",
            None,
        ));
    };

    let params = object.get("params").cloned();
    match &params {
        None | Some(Value::Array(_)) | Some(Value::Object(_)) => {}
        Some(_) => {
            return Err(error_object(
                error_id,
                INVALID_REQUEST,
                "Invalid Request",
                None,
            ));
        }
    }

    if !id_valid {
        return Err(error_object(
            Value::Null,
            INVALID_REQUEST,
            "Invalid Request",
            None,
        ));
    }

    Ok(RpcCall {
        method: method.to_string(),
        params,
        id,
    })
}

/// Maps an [`HttpError`] onto `(code, message, data)`.
///
/// Statuses 400/422 mean bad parameters; the well-known 4xx statuses get
/// their dedicated codes from the custom server-error range; everything
/// else in the 3xx/4xx space collapses to -32000 and 5xx (and unhandled
/// failures) to the internal error code.
fn map_error(error: &HttpError) -> (i64, String, Option<Value>) {
    if error.unhandled {
        return (
            INTERNAL_ERROR,
            String::from("Internal error"),
            Some(Value::String(error.message.clone())),
        );
    }

    let code = match error.status {
        400 | 422 => INVALID_PARAMS,
        401 => -32001,
        403 => -32003,
        404 => -32004,
        408 => -32008,
        409 => -32009,
        429 => -32029,
        500..=599 => INTERNAL_ERROR,
        _ => -32000,
    };

    (code, error.message.clone(), error.data.clone())
}

fn result_object(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

fn error_object(id: Value, code: i64, message: &str, data: Option<Value>) -> Value {
    let mut error = json!({
        "code": code,
        "message": message,
    });
    if let Some(data) = data {
        error["data"] = data;
    }
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": error,
    })
}
