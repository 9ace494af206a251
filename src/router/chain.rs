//! # Middleware Chain Runner
//!
//! Executes an ordered middleware sequence in front of a terminal handler.
//! Middleware come in two registration flavours:
//!
//! - **plain** middleware run and continue: resolving to `Ok(None)` passes
//!   control onward, `Ok(Some(reply))` short-circuits the chain.
//! - **wrapping** middleware receive the [`Next`] continuation and may do
//!   work before and after awaiting it; whatever they resolve to becomes
//!   the response value.
//!
//! Within a request, middleware run strictly in registration order and
//! `next()` is a suspension point: code after the await observes every
//! context mutation made further down the chain.

#![warn(missing_docs)]

use crate::event::Event;
use crate::router::matcher::match_pattern;
use crate::types::{
    Handler, HandlerFuture, HttpMethod, MiddlewareFn, MiddlewarePredicate, Step, WrapFn, box_step,
};
use serde_json::Value;
use std::sync::Arc;
use std::sync::Once;

/// The executable part of a middleware record.
pub enum MiddlewareKind {
    /// Run-and-continue middleware.
    Plain(MiddlewareFn),
    /// Middleware with full `next()` semantics.
    Wrap(WrapFn),
}

/// A registered middleware with its matching constraints.
///
/// A middleware only runs when all of its constraints hold: `route` is
/// matched against the request path with the route-pattern grammar,
/// `method` against the request method, and `predicate` against the whole
/// event. Non-matching middleware is skipped silently.
pub struct MiddlewareEntry {
    /// What to execute.
    pub kind: MiddlewareKind,
    /// Optional route pattern constraint.
    pub route: Option<String>,
    /// Optional method constraint.
    pub method: Option<HttpMethod>,
    /// Optional free-form predicate.
    pub predicate: Option<MiddlewarePredicate>,
    /// Opaque metadata, never interpreted by the engine.
    pub meta: Option<Value>,
    /// Set once the tracing plugin has wrapped this entry, so a second
    /// plugin registration does not double-wrap it.
    pub traced: bool,
}

impl MiddlewareEntry {
    /// Creates an unconstrained entry.
    pub fn new(kind: MiddlewareKind) -> Self {
        Self {
            kind,
            route: None,
            method: None,
            predicate: None,
            meta: None,
            traced: false,
        }
    }

    /// Evaluates the matching constraints, capturing route-pattern
    /// parameters into `context.middleware_params` on success.
    fn matches(&self, event: &mut Event) -> bool {
        if let Some(method) = self.method {
            if method != event.method() {
                return false;
            }
        }
        if let Some(route) = &self.route {
            match match_pattern(route, event.path()) {
                Some(params) => {
                    for (name, value) in params {
                        event.context.middleware_params.insert(name, value);
                    }
                }
                None => return false,
            }
        }
        if let Some(predicate) = &self.predicate {
            if !predicate(event) {
                return false;
            }
        }
        true
    }
}

static PLAIN_MIDDLEWARE_WARNING: Once = Once::new();

/// The continuation handed to wrapping middleware.
///
/// Calling [`Next::run`] executes the remainder of the chain (and finally
/// the terminal handler) and resolves to its `(event, value)` pair. A
/// wrapping middleware that never calls it short-circuits the chain with
/// its own value.
pub struct Next {
    entries: Vec<Arc<MiddlewareEntry>>,
    position: usize,
    terminal: Handler,
}

impl Next {
    /// Builds the continuation for `entries` in front of `terminal`.
    pub fn new(entries: Vec<Arc<MiddlewareEntry>>, terminal: Handler) -> Self {
        Self {
            entries,
            position: 0,
            terminal,
        }
    }

    /// Runs the rest of the chain.
    pub fn run(mut self, mut event: Event) -> HandlerFuture {
        box_step(async move {
            while self.position < self.entries.len() {
                let entry = Arc::clone(&self.entries[self.position]);
                self.position += 1;

                if !entry.matches(&mut event) {
                    continue;
                }

                match &entry.kind {
                    MiddlewareKind::Plain(middleware) => {
                        let (next_event, outcome) = middleware(event).await;
                        event = next_event;
                        match outcome {
                            Ok(Some(reply)) => return (event, Ok(reply)),
                            Ok(None) => {
                                PLAIN_MIDDLEWARE_WARNING.call_once(|| {
                                    tracing::warn!(
                                        "middleware resolved without a value; continuing to the next handler"
                                    );
                                });
                            }
                            Err(error) => return (event, Err(error)),
                        }
                    }
                    MiddlewareKind::Wrap(middleware) => {
                        return middleware(event, self).await;
                    }
                }
            }

            (self.terminal)(event).await
        })
    }
}

/// Runs `entries` in front of `terminal` for `event`.
pub(crate) async fn run_chain(
    entries: Vec<Arc<MiddlewareEntry>>,
    terminal: Handler,
    event: Event,
) -> Step {
    Next::new(entries, terminal).run(event).await
}
