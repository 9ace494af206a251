//! # Middlewares Module
//!
//! Constructors for middleware entries — plain ("run and continue") and
//! wrapping (full `next()` semantics) — plus the built-in request-body size
//! guard.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use trellis::app::App;
//! use trellis::middlewares::{middleware, wrap};
//!
//! let mut app = App::new();
//!
//! // Plain middleware: continue with Ok(None), short-circuit with a reply.
//! app.use_entry(middleware(|mut event| async move {
//!     if event.req.headers().get("authorization").is_none() {
//!         let error = trellis::error::HttpError::unauthorized("Missing authorization header");
//!         return (event, Err(error));
//!     }
//!     event.context.set("authenticated", serde_json::json!(true));
//!     (event, Ok(None))
//! }));
//!
//! // Wrapping middleware: work before and after `next()`.
//! app.use_entry(wrap(|event, next| async move {
//!     let (mut event, outcome) = next.run(event).await;
//!     event.res.set_header("x-powered-by", "trellis");
//!     (event, outcome)
//! }));
//! ```

#![warn(missing_docs)]

/// Request-body size guard middleware.
pub mod body_limit;

use crate::error::HttpError;
use crate::event::Event;
use crate::response::Reply;
use crate::router::chain::{MiddlewareEntry, MiddlewareKind, Next};
use crate::types::{HttpMethod, MiddlewarePredicate, Step};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Matching constraints and metadata for a middleware registration.
///
/// All constraints default to "always run".
#[derive(Default)]
pub struct MiddlewareOptions {
    /// Run only when the request path matches this route pattern; captures
    /// land in `context.middleware_params`.
    pub route: Option<String>,
    /// Run only for this method.
    pub method: Option<HttpMethod>,
    /// Run only when this predicate holds for the event.
    pub predicate: Option<MiddlewarePredicate>,
    /// Opaque metadata, never interpreted by the engine.
    pub meta: Option<Value>,
}

/// Builds an unconstrained plain middleware entry.
pub fn middleware<F, Fut>(func: F) -> Arc<MiddlewareEntry>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (Event, Result<Option<Reply>, HttpError>)> + Send + 'static,
{
    middleware_with(MiddlewareOptions::default(), func)
}

/// Builds a plain middleware entry with matching constraints.
pub fn middleware_with<F, Fut>(options: MiddlewareOptions, func: F) -> Arc<MiddlewareEntry>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (Event, Result<Option<Reply>, HttpError>)> + Send + 'static,
{
    let kind = MiddlewareKind::Plain(Arc::new(move |event| Box::pin(func(event))));
    entry_with(kind, options)
}

/// Builds an unconstrained wrapping middleware entry.
pub fn wrap<F, Fut>(func: F) -> Arc<MiddlewareEntry>
where
    F: Fn(Event, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Step> + Send + 'static,
{
    wrap_with(MiddlewareOptions::default(), func)
}

/// Builds a wrapping middleware entry with matching constraints.
pub fn wrap_with<F, Fut>(options: MiddlewareOptions, func: F) -> Arc<MiddlewareEntry>
where
    F: Fn(Event, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Step> + Send + 'static,
{
    let kind = MiddlewareKind::Wrap(Arc::new(move |event, next| Box::pin(func(event, next))));
    entry_with(kind, options)
}

fn entry_with(kind: MiddlewareKind, options: MiddlewareOptions) -> Arc<MiddlewareEntry> {
    let mut entry = MiddlewareEntry::new(kind);
    entry.route = options.route;
    entry.method = options.method;
    entry.predicate = options.predicate;
    entry.meta = options.meta;
    Arc::new(entry)
}
