//! # Validation Module
//!
//! Drives any "standard schema" — a value exposing
//! `validate(&data) -> Result<value, issues>` — against the request body,
//! query string, headers, or route parameters. The engine is agnostic to
//! the schema library behind the contract; plain closures work too.
//!
//! Body validation is lazy and single-shot: the JSON body is parsed once,
//! the schema runs once, and the body is then *locked* — raw accessors
//! fail fast so validation cannot be bypassed by re-reading the bytes.
//!
//! Failures surface as a 400 with statusText `Validation failed` and the
//! issue list under `data.issues`.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use trellis::validate::{Issue, schema_fn, validated_json};
//! # use trellis::event::Event;
//! use serde_json::Value;
//!
//! # async fn handler(mut event: Event) {
//! let schema = schema_fn(|data: &Value| {
//!     match data.get("name").and_then(Value::as_str) {
//!         Some(name) if name.len() >= 3 => Ok(data.clone()),
//!         _ => Err(vec![Issue::at("name must be at least 3 characters", "name")]),
//!     }
//! });
//! let body = validated_json(&mut event, &schema).await;
//! # }
//! ```

#![warn(missing_docs)]

use crate::error::HttpError;
use crate::event::Event;
use crate::req::body::BodyState;
use serde_json::{Map, Value, json};

/// A single validation problem.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Issue {
    /// Human-readable description of the problem.
    pub message: String,
    /// Where in the input the problem lies, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Issue {
    /// Creates an issue without a path.
    pub fn new<M: Into<String>>(message: M) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    /// Creates an issue anchored to a path within the input.
    pub fn at<M: Into<String>, P: Into<String>>(message: M, path: P) -> Self {
        Self {
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl From<String> for Issue {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for Issue {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// The standard schema contract.
///
/// `validate` returns the (possibly coerced) value on success or the list
/// of issues on failure. Implementations must be synchronous; validation
/// runs inline on the request path.
pub trait Schema: Send + Sync {
    /// Validates `data`, returning the accepted value or the issues.
    fn validate(&self, data: &Value) -> Result<Value, Vec<Issue>>;
}

/// Wraps a closure as a [`Schema`].
pub fn schema_fn<F, I>(func: F) -> impl Schema
where
    F: Fn(&Value) -> Result<Value, Vec<I>> + Send + Sync,
    I: Into<Issue>,
{
    FnSchema(func, std::marker::PhantomData)
}

struct FnSchema<F, I>(F, std::marker::PhantomData<fn() -> I>);

impl<F, I> Schema for FnSchema<F, I>
where
    F: Fn(&Value) -> Result<Value, Vec<I>> + Send + Sync,
    I: Into<Issue>,
{
    fn validate(&self, data: &Value) -> Result<Value, Vec<Issue>> {
        (self.0)(data).map_err(|issues| issues.into_iter().map(Into::into).collect())
    }
}

/// Wraps a pure boolean predicate as a [`Schema`].
///
/// `true` passes the input through unchanged; `false` fails with a single
/// generic issue.
pub fn predicate_schema<F>(func: F) -> impl Schema
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    Predicate(func)
}

struct Predicate<F>(F);

impl<F> Schema for Predicate<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn validate(&self, data: &Value) -> Result<Value, Vec<Issue>> {
        if (self.0)(data) {
            Ok(data.clone())
        } else {
            Err(vec![Issue::new("Validation failed")])
        }
    }
}

/// Validates the JSON request body against a schema, lazily.
///
/// The body is parsed only when this is called. On success the validated
/// value is cached and the body is locked; on failure the request fails
/// with the 400 validation shape. Calling again returns the cached value
/// without re-running the schema.
pub async fn validated_json<S: Schema + ?Sized>(
    event: &mut Event,
    schema: &S,
) -> Result<Value, HttpError> {
    if let BodyState::JsonLocked(value) = &event.req.body {
        return Ok(value.clone());
    }

    let parsed = event.req.json_value().await?;
    let validated = run_schema(schema, &parsed)?;
    event.req.swap_body(BodyState::JsonLocked(validated.clone()));
    Ok(validated)
}

/// Validates the query parameters against a schema, synchronously.
pub fn validated_query<S: Schema + ?Sized>(event: &Event, schema: &S) -> Result<Value, HttpError> {
    let mut object = Map::new();
    for (name, value) in event.query_params() {
        object.insert(name, Value::String(value));
    }
    run_schema(schema, &Value::Object(object))
}

/// Validates the request headers against a schema, synchronously.
pub fn validated_headers<S: Schema + ?Sized>(
    event: &Event,
    schema: &S,
) -> Result<Value, HttpError> {
    let mut object = Map::new();
    for (name, value) in event.req.headers().entries() {
        object.insert(name.to_string(), Value::String(value.to_string()));
    }
    run_schema(schema, &Value::Object(object))
}

/// Validates the captured route parameters against a schema.
pub fn validated_params<S: Schema + ?Sized>(event: &Event, schema: &S) -> Result<Value, HttpError> {
    let mut object = Map::new();
    for (name, value) in event.context.params.iter() {
        object.insert(name.to_string(), Value::String(value.to_string()));
    }
    run_schema(schema, &Value::Object(object))
}

/// Like [`validated_json`], with a callback that may rewrite the failure.
pub async fn validated_json_with<S, E>(
    event: &mut Event,
    schema: &S,
    on_error: E,
) -> Result<Value, HttpError>
where
    S: Schema + ?Sized,
    E: FnOnce(HttpError) -> HttpError,
{
    validated_json(event, schema).await.map_err(on_error)
}

fn run_schema<S: Schema + ?Sized>(schema: &S, data: &Value) -> Result<Value, HttpError> {
    schema
        .validate(data)
        .map_err(|issues| HttpError::validation(json!(issues)))
}
